//! Timetable change-detection server.
//!
//! Fetches a class timetable, compares it against the last stored snapshot,
//! notifies about added, removed and modified classes, and serves the stored
//! timetable over HTTP.

pub mod cache;
pub mod config;
pub mod diff;
pub mod domain;
pub mod feed;
pub mod history;
pub mod notify;
pub mod refresh;
pub mod store;
pub mod web;

//! Web layer for the timetable server.
//!
//! Serves the stored timetable and triggers refreshes over HTTP.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, TimetableService};

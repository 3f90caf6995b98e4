//! Domain types for the timetable watcher.
//!
//! Classes enter the system as loosely typed feed records and are validated
//! into [`ClassItem`]s before anything else sees them. Code that receives a
//! [`Snapshot`] can trust every class in it to be well formed.

mod class_item;
mod error;
mod snapshot;

pub use class_item::{ClassField, ClassItem, ClassKey, FieldValue, RawClassItem};
pub use error::DataIntegrityError;
pub use snapshot::{AuthRef, Snapshot};

//! Change detection between timetable snapshots.
//!
//! Everything here is pure: no I/O, no clocks. The cache coordinator calls
//! [`diff`] inside its critical section; [`apply`] replays a change set and
//! is how change sets are checked against their base.

mod apply;
mod change;
mod detect;

pub use apply::apply;
pub use change::{Change, ChangeKind, ChangeSet, ChangeSummary, ChangeType, FieldDelta};
pub use detect::diff;

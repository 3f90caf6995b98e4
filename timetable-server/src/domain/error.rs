//! Domain error types.
//!
//! These errors represent malformed or inconsistent timetable data. They are
//! distinct from fetch and storage errors: a `DataIntegrityError` means the
//! data itself cannot be trusted, so a refresh carrying it must not be saved.

use chrono::NaiveTime;

use super::ClassKey;

/// Timetable data failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataIntegrityError {
    /// A required field was absent or blank
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field was present but could not be interpreted
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Class ends at or before it starts
    #[error("class ends at {end} which is not after its start {start}")]
    InvalidTimeWindow { start: NaiveTime, end: NaiveTime },

    /// Two classes in one snapshot share an identity key
    #[error("duplicate class key {0}")]
    DuplicateKey(ClassKey),

    /// A change set does not fit the snapshot it is applied to
    #[error("change for {key} is inconsistent: {reason}")]
    Inconsistent { key: ClassKey, reason: &'static str },

    /// A field value has the wrong type for the field it is assigned to
    #[error("value for field {0} has the wrong type")]
    FieldType(&'static str),

    /// A record from the feed failed validation
    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<DataIntegrityError>,
    },
}

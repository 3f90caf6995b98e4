//! Timetable snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::class_item::{ClassItem, RawClassItem};
use super::error::DataIntegrityError;

/// Opaque reference to the session a snapshot was fetched with.
///
/// Never contains the credential itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthRef(String);

impl AuthRef {
    pub fn new(reference: impl Into<String>) -> Self {
        AuthRef(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthRef({})", self.0)
    }
}

/// The timetable as captured at one point in time.
///
/// Snapshots are immutable: fields are private and there are no mutating
/// methods. A newer timetable is a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    classes: Vec<ClassItem>,
    taken_at: DateTime<Utc>,
    auth_ref: Option<AuthRef>,
}

impl Snapshot {
    /// Create a snapshot from already validated classes.
    ///
    /// Duplicate keys are not rejected here; change detection reports them.
    pub fn new(
        classes: Vec<ClassItem>,
        taken_at: DateTime<Utc>,
        auth_ref: Option<AuthRef>,
    ) -> Self {
        Self {
            classes,
            taken_at,
            auth_ref,
        }
    }

    /// Validate feed records and build a snapshot from them.
    ///
    /// The first malformed record aborts the whole snapshot. Records are
    /// never dropped individually.
    pub fn from_raw(
        records: Vec<RawClassItem>,
        taken_at: DateTime<Utc>,
        auth_ref: Option<AuthRef>,
    ) -> Result<Self, DataIntegrityError> {
        let classes = records
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                ClassItem::try_from(raw).map_err(|e| DataIntegrityError::Record {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(classes, taken_at, auth_ref))
    }

    /// Classes in feed order.
    pub fn classes(&self) -> &[ClassItem] {
        &self.classes
    }

    /// When the snapshot was captured.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn auth_ref(&self) -> Option<&AuthRef> {
        self.auth_ref.as_ref()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

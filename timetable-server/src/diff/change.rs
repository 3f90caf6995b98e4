//! Change and change set types.

use serde::Serialize;

use crate::domain::{ClassField, ClassItem, ClassKey, DataIntegrityError, FieldValue};

/// Old and new value of one changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDelta {
    pub field: ClassField,
    pub old: Option<FieldValue>,
    pub new: Option<FieldValue>,
}

/// What happened to a class between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeKind {
    /// Class appears only in the newer snapshot
    Added { item: ClassItem },

    /// Class appears only in the older snapshot
    Removed { item: ClassItem },

    /// Class is in both, with at least one differing field
    Modified { deltas: Vec<FieldDelta> },
}

/// The kind of a change without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
        }
    }
}

impl ChangeKind {
    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangeKind::Added { .. } => ChangeType::Added,
            ChangeKind::Removed { .. } => ChangeType::Removed,
            ChangeKind::Modified { .. } => ChangeType::Modified,
        }
    }

    pub fn label(&self) -> &'static str {
        self.change_type().as_str()
    }
}

/// A single detected change, keyed by class identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub key: ClassKey,

    /// Subject of the class, for display. Taken from the newer snapshot
    /// when the class exists there.
    pub subject: String,

    #[serde(flatten)]
    pub kind: ChangeKind,
}

/// Counts of each change kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

/// The full difference between two snapshots.
///
/// Changes are ordered by key and no key appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    changes: Vec<Change>,
    initial: bool,
}

impl ChangeSet {
    /// Build a change set, sorting by key.
    ///
    /// Fails if two changes reference the same key.
    pub fn new(mut changes: Vec<Change>) -> Result<Self, DataIntegrityError> {
        changes.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(pair) = changes.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(DataIntegrityError::DuplicateKey(pair[0].key.clone()));
        }
        Ok(Self {
            changes,
            initial: false,
        })
    }

    /// The empty change set produced when there is no previous snapshot.
    pub fn initial() -> Self {
        Self {
            changes: Vec::new(),
            initial: true,
        }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// True when this diff populated an empty store.
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Keys of the changes of one type, in key order.
    pub fn keys_of(&self, change_type: ChangeType) -> Vec<&ClassKey> {
        self.changes
            .iter()
            .filter(|c| c.kind.change_type() == change_type)
            .map(|c| &c.key)
            .collect()
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for change in &self.changes {
            match change.kind.change_type() {
                ChangeType::Added => summary.added += 1,
                ChangeType::Removed => summary.removed += 1,
                ChangeType::Modified => summary.modified += 1,
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modified(key: &str) -> Change {
        Change {
            key: ClassKey::explicit(key).unwrap(),
            subject: "Subject".into(),
            kind: ChangeKind::Modified {
                deltas: vec![FieldDelta {
                    field: ClassField::Room,
                    old: Some(FieldValue::Text("A1".into())),
                    new: Some(FieldValue::Text("A2".into())),
                }],
            },
        }
    }

    #[test]
    fn new_sorts_by_key() {
        let set = ChangeSet::new(vec![modified("K3"), modified("K1"), modified("K2")]).unwrap();
        let keys: Vec<_> = set.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["K1", "K2", "K3"]);
        assert!(set.has_changes());
        assert!(!set.is_initial());
    }

    #[test]
    fn keys_of_filters_by_type() {
        let mut removed = modified("K2");
        removed.kind = ChangeKind::Removed {
            item: ClassItem {
                key: ClassKey::explicit("K2").unwrap(),
                course: "CS101".into(),
                section: None,
                subject: "Subject".into(),
                instructor: None,
                room: None,
                day: chrono::Weekday::Mon,
                start: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                status: None,
            },
        };
        let set = ChangeSet::new(vec![modified("K3"), removed, modified("K1")]).unwrap();

        let k1 = ClassKey::explicit("K1").unwrap();
        let k2 = ClassKey::explicit("K2").unwrap();
        let k3 = ClassKey::explicit("K3").unwrap();
        assert_eq!(set.keys_of(ChangeType::Modified), vec![&k1, &k3]);
        assert_eq!(set.keys_of(ChangeType::Removed), vec![&k2]);
        assert!(set.keys_of(ChangeType::Added).is_empty());
        assert_eq!(set.iter().nth(1).unwrap().kind.label(), "removed");
    }

    #[test]
    fn new_rejects_duplicate_keys() {
        let err = ChangeSet::new(vec![modified("K1"), modified("K2"), modified("K1")])
            .unwrap_err();
        assert_eq!(
            err,
            DataIntegrityError::DuplicateKey(ClassKey::explicit("K1").unwrap())
        );
    }

    #[test]
    fn initial_is_empty() {
        let set = ChangeSet::initial();
        assert!(!set.has_changes());
        assert!(set.is_initial());
        assert_eq!(set.summary(), ChangeSummary::default());
    }

    #[test]
    fn serializes_flat_change() {
        let json = serde_json::to_value(modified("CS101-Mon-0900")).unwrap();
        assert_eq!(json["key"], "CS101-Mon-0900");
        assert_eq!(json["kind"], "modified");
        assert_eq!(json["deltas"][0]["field"], "room");
        assert_eq!(json["deltas"][0]["old"], "A1");
        assert_eq!(json["deltas"][0]["new"], "A2");
    }
}

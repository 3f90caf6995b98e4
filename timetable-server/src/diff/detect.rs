//! Snapshot comparison.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{ClassField, ClassItem, ClassKey, DataIntegrityError, Snapshot};

use super::change::{Change, ChangeKind, ChangeSet, FieldDelta};

/// Compare two snapshots.
///
/// With no previous snapshot the result is an empty, `initial` change set:
/// the first population of the store never produces notifications. The
/// current snapshot is still checked for duplicate keys in that case.
///
/// Classes are matched by key. A class present in both snapshots yields a
/// `Modified` change only when at least one compared field differs.
pub fn diff(
    previous: Option<&Snapshot>,
    current: &Snapshot,
) -> Result<ChangeSet, DataIntegrityError> {
    let current_index = index_by_key(current)?;

    let Some(previous) = previous else {
        debug!(classes = current.len(), "no previous snapshot, suppressing changes");
        return Ok(ChangeSet::initial());
    };
    let previous_index = index_by_key(previous)?;

    let mut changes = Vec::new();

    for (key, item) in &current_index {
        match previous_index.get(key) {
            None => changes.push(Change {
                key: (*key).clone(),
                subject: item.subject.clone(),
                kind: ChangeKind::Added {
                    item: (*item).clone(),
                },
            }),
            Some(old) => {
                let deltas = field_deltas(old, item);
                if !deltas.is_empty() {
                    changes.push(Change {
                        key: (*key).clone(),
                        subject: item.subject.clone(),
                        kind: ChangeKind::Modified { deltas },
                    });
                }
            }
        }
    }

    for (key, item) in &previous_index {
        if !current_index.contains_key(key) {
            changes.push(Change {
                key: (*key).clone(),
                subject: item.subject.clone(),
                kind: ChangeKind::Removed {
                    item: (*item).clone(),
                },
            });
        }
    }

    ChangeSet::new(changes)
}

fn index_by_key(
    snapshot: &Snapshot,
) -> Result<BTreeMap<&ClassKey, &ClassItem>, DataIntegrityError> {
    let mut index = BTreeMap::new();
    for item in snapshot.classes() {
        if index.insert(&item.key, item).is_some() {
            return Err(DataIntegrityError::DuplicateKey(item.key.clone()));
        }
    }
    Ok(index)
}

fn field_deltas(old: &ClassItem, new: &ClassItem) -> Vec<FieldDelta> {
    ClassField::ALL
        .into_iter()
        .filter_map(|field| {
            let before = old.field(field);
            let after = new.field(field);
            (before != after).then_some(FieldDelta {
                field,
                old: before,
                new: after,
            })
        })
        .collect()
}

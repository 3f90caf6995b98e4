//! Replaying a change set onto the classes it was computed from.

use std::collections::BTreeMap;

use crate::domain::{ClassItem, ClassKey, DataIntegrityError};

use super::change::{ChangeKind, ChangeSet};

/// Apply `changes` to `previous`, returning the resulting classes ordered by key.
///
/// Every change must fit its base: added keys must be new, removed and
/// modified keys must exist, and each delta's old value must match.
pub fn apply(
    previous: &[ClassItem],
    changes: &ChangeSet,
) -> Result<Vec<ClassItem>, DataIntegrityError> {
    let mut items: BTreeMap<ClassKey, ClassItem> = BTreeMap::new();
    for item in previous {
        if items.insert(item.key.clone(), item.clone()).is_some() {
            return Err(DataIntegrityError::DuplicateKey(item.key.clone()));
        }
    }

    for change in changes {
        let inconsistent = |reason| DataIntegrityError::Inconsistent {
            key: change.key.clone(),
            reason,
        };

        match &change.kind {
            ChangeKind::Added { item } => {
                if items.insert(change.key.clone(), item.clone()).is_some() {
                    return Err(inconsistent("added class already exists"));
                }
            }
            ChangeKind::Removed { .. } => {
                items
                    .remove(&change.key)
                    .ok_or_else(|| inconsistent("removed class does not exist"))?;
            }
            ChangeKind::Modified { deltas } => {
                let item = items
                    .get_mut(&change.key)
                    .ok_or_else(|| inconsistent("modified class does not exist"))?;
                for delta in deltas {
                    if item.field(delta.field) != delta.old {
                        return Err(inconsistent("old value does not match"));
                    }
                    item.set_field(delta.field, delta.new.clone())?;
                }
            }
        }
    }

    Ok(items.into_values().collect())
}

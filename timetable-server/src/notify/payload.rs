//! Notification payloads built from changes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::diff::{Change, ChangeKind, FieldDelta};
use crate::domain::{ClassItem, ClassKey, FieldValue};

/// Everything a delivery channel needs to announce one change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub key: ClassKey,
    pub kind: &'static str,
    pub subject: String,
    pub title: String,
    pub body: String,
    pub deltas: Vec<FieldDelta>,
    pub detected_at: DateTime<Utc>,
}

impl NotificationPayload {
    pub fn from_change(change: &Change, detected_at: DateTime<Utc>) -> Self {
        let subject = &change.subject;
        let (title, body, deltas) = match &change.kind {
            ChangeKind::Added { item } => (
                format!("New class: {subject}"),
                format!("{subject} is now scheduled {}", describe_slot(item)),
                Vec::new(),
            ),
            ChangeKind::Removed { item } => (
                format!("Class removed: {subject}"),
                format!("{subject} {} is no longer scheduled", describe_slot(item)),
                Vec::new(),
            ),
            ChangeKind::Modified { deltas } => (
                format!("Schedule change: {subject}"),
                deltas
                    .iter()
                    .map(describe_delta)
                    .collect::<Vec<_>>()
                    .join("; "),
                deltas.clone(),
            ),
        };

        Self {
            key: change.key.clone(),
            kind: change.kind.label(),
            subject: subject.clone(),
            title,
            body,
            deltas,
            detected_at,
        }
    }
}

/// "on Mon 09:00-10:00 in A1"
fn describe_slot(item: &ClassItem) -> String {
    let mut slot = format!(
        "on {} {}-{}",
        item.day,
        item.start.format("%H:%M"),
        item.end.format("%H:%M")
    );
    if let Some(room) = &item.room {
        slot.push_str(" in ");
        slot.push_str(room);
    }
    slot
}

/// "room: A1 → A2"
fn describe_delta(delta: &FieldDelta) -> String {
    format!(
        "{}: {} → {}",
        delta.field,
        display_value(delta.old.as_ref()),
        display_value(delta.new.as_ref())
    )
}

fn display_value(value: Option<&FieldValue>) -> String {
    value.map_or_else(|| "none".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClassField;
    use chrono::{NaiveTime, Weekday};

    fn item() -> ClassItem {
        ClassItem {
            key: ClassKey::explicit("CS101-Mon-0900").unwrap(),
            course: "CS101".into(),
            section: None,
            subject: "Intro to Computing".into(),
            instructor: None,
            room: Some("A1".into()),
            day: Weekday::Mon,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status: None,
        }
    }

    #[test]
    fn modified_payload_lists_deltas() {
        let change = Change {
            key: item().key,
            subject: "Intro to Computing".into(),
            kind: ChangeKind::Modified {
                deltas: vec![
                    FieldDelta {
                        field: ClassField::Room,
                        old: Some(FieldValue::Text("A1".into())),
                        new: Some(FieldValue::Text("A2".into())),
                    },
                    FieldDelta {
                        field: ClassField::Status,
                        old: None,
                        new: Some(FieldValue::Text("moved".into())),
                    },
                ],
            },
        };

        let payload = NotificationPayload::from_change(&change, Utc::now());
        assert_eq!(payload.kind, "modified");
        assert_eq!(payload.title, "Schedule change: Intro to Computing");
        assert_eq!(payload.body, "room: A1 → A2; status: none → moved");
        assert_eq!(payload.deltas.len(), 2);
    }

    #[test]
    fn added_payload_describes_slot() {
        let change = Change {
            key: item().key,
            subject: "Intro to Computing".into(),
            kind: ChangeKind::Added { item: item() },
        };

        let payload = NotificationPayload::from_change(&change, Utc::now());
        assert_eq!(payload.title, "New class: Intro to Computing");
        assert_eq!(
            payload.body,
            "Intro to Computing is now scheduled on Mon 09:00-10:00 in A1"
        );
        assert!(payload.deltas.is_empty());
    }

    #[test]
    fn removed_payload_without_room() {
        let mut removed = item();
        removed.room = None;
        let change = Change {
            key: removed.key.clone(),
            subject: removed.subject.clone(),
            kind: ChangeKind::Removed { item: removed },
        };

        let payload = NotificationPayload::from_change(&change, Utc::now());
        assert_eq!(
            payload.body,
            "Intro to Computing on Mon 09:00-10:00 is no longer scheduled"
        );
    }
}

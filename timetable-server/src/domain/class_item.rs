//! Scheduled class types and the feed record they are validated from.

use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, de};

use super::error::DataIntegrityError;

/// Stable identity of a scheduled class across fetches.
///
/// Either an id supplied by the feed, or a composite of course, section,
/// day and start slot. Keys order lexically, which is the order change sets
/// and notifications use.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveTime, Weekday};
/// use timetable_server::domain::ClassKey;
///
/// let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
/// let key = ClassKey::composite("CS101", None, Weekday::Mon, start);
/// assert_eq!(key.as_str(), "CS101-Mon-0900");
///
/// // Blank ids are rejected
/// assert!(ClassKey::explicit("  ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassKey(String);

impl ClassKey {
    /// Use a feed-provided id as the key.
    pub fn explicit(id: &str) -> Result<Self, DataIntegrityError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DataIntegrityError::MissingField("id"));
        }
        Ok(ClassKey(id.to_string()))
    }

    /// Build a composite key from the parts that identify a timetable slot.
    ///
    /// `-` separates the parts, so any `-` or `\` inside the course or
    /// section is backslash-escaped to keep distinct slots distinct.
    pub fn composite(
        course: &str,
        section: Option<&str>,
        day: Weekday,
        start: NaiveTime,
    ) -> Self {
        let slot = start.format("%H%M");
        let course = escape_key_part(course);
        match section.map(escape_key_part) {
            Some(section) => ClassKey(format!("{course}-{section}-{day}-{slot}")),
            None => ClassKey(format!("{course}-{day}-{slot}")),
        }
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn escape_key_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        if matches!(c, '-' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Debug for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassKey({})", self.0)
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fields of a class compared during change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassField {
    Course,
    Section,
    Subject,
    Instructor,
    Room,
    Day,
    Start,
    End,
    Status,
}

impl ClassField {
    /// Every compared field, in the order deltas are reported.
    pub const ALL: [ClassField; 9] = [
        ClassField::Course,
        ClassField::Section,
        ClassField::Subject,
        ClassField::Instructor,
        ClassField::Room,
        ClassField::Day,
        ClassField::Start,
        ClassField::End,
        ClassField::Status,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassField::Course => "course",
            ClassField::Section => "section",
            ClassField::Subject => "subject",
            ClassField::Instructor => "instructor",
            ClassField::Room => "room",
            ClassField::Day => "day",
            ClassField::Start => "start",
            ClassField::End => "end",
            ClassField::Status => "status",
        }
    }
}

impl fmt::Display for ClassField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value of a single class field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Day(Weekday),
    #[serde(serialize_with = "serialize_hhmm")]
    Time(NaiveTime),
}

fn serialize_hhmm<S: serde::Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&time.format("%H:%M"))
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Day(day) => write!(f, "{day}"),
            FieldValue::Time(time) => write!(f, "{}", time.format("%H:%M")),
        }
    }
}

/// A single scheduled class session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassItem {
    /// Identity across fetches
    pub key: ClassKey,

    /// Course code (e.g., "CS101")
    pub course: String,

    /// Section or group within the course
    pub section: Option<String>,

    /// Human-readable subject name
    pub subject: String,

    pub instructor: Option<String>,

    /// Room or location
    pub room: Option<String>,

    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,

    /// Free-form status flag from the feed (e.g., "cancelled", "moved")
    pub status: Option<String>,
}

impl ClassItem {
    /// Read a compared field. `None` means the field is absent.
    pub fn field(&self, field: ClassField) -> Option<FieldValue> {
        match field {
            ClassField::Course => Some(FieldValue::Text(self.course.clone())),
            ClassField::Section => self.section.clone().map(FieldValue::Text),
            ClassField::Subject => Some(FieldValue::Text(self.subject.clone())),
            ClassField::Instructor => self.instructor.clone().map(FieldValue::Text),
            ClassField::Room => self.room.clone().map(FieldValue::Text),
            ClassField::Day => Some(FieldValue::Day(self.day)),
            ClassField::Start => Some(FieldValue::Time(self.start)),
            ClassField::End => Some(FieldValue::Time(self.end)),
            ClassField::Status => self.status.clone().map(FieldValue::Text),
        }
    }

    /// Overwrite a compared field.
    ///
    /// Fails if the value has the wrong type for the field, or if a
    /// required field would become absent.
    pub fn set_field(
        &mut self,
        field: ClassField,
        value: Option<FieldValue>,
    ) -> Result<(), DataIntegrityError> {
        match (field, value) {
            (ClassField::Course, Some(FieldValue::Text(v))) => self.course = v,
            (ClassField::Section, Some(FieldValue::Text(v))) => self.section = Some(v),
            (ClassField::Section, None) => self.section = None,
            (ClassField::Subject, Some(FieldValue::Text(v))) => self.subject = v,
            (ClassField::Instructor, Some(FieldValue::Text(v))) => self.instructor = Some(v),
            (ClassField::Instructor, None) => self.instructor = None,
            (ClassField::Room, Some(FieldValue::Text(v))) => self.room = Some(v),
            (ClassField::Room, None) => self.room = None,
            (ClassField::Day, Some(FieldValue::Day(v))) => self.day = v,
            (ClassField::Start, Some(FieldValue::Time(v))) => self.start = v,
            (ClassField::End, Some(FieldValue::Time(v))) => self.end = v,
            (ClassField::Status, Some(FieldValue::Text(v))) => self.status = Some(v),
            (ClassField::Status, None) => self.status = None,
            (field, None) => return Err(DataIntegrityError::MissingField(field.name())),
            (field, Some(_)) => return Err(DataIntegrityError::FieldType(field.name())),
        }
        Ok(())
    }

    /// Length of the class in minutes.
    pub fn duration_mins(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether the status flag marks the class as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.to_ascii_lowercase().contains("cancel"))
    }
}

/// A class record as returned by the timetable feed.
///
/// Every field is optional text; numbers are accepted and rendered as text.
/// Conversion into [`ClassItem`] performs all presence and format checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClassItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,

    #[serde(default, alias = "code", deserialize_with = "lenient_text")]
    pub course: Option<String>,

    #[serde(default, alias = "group", deserialize_with = "lenient_text")]
    pub section: Option<String>,

    #[serde(default, alias = "name", deserialize_with = "lenient_text")]
    pub subject: Option<String>,

    #[serde(default, alias = "teacher", deserialize_with = "lenient_text")]
    pub instructor: Option<String>,

    #[serde(default, alias = "location", deserialize_with = "lenient_text")]
    pub room: Option<String>,

    #[serde(default, alias = "dayOfWeek", deserialize_with = "lenient_text")]
    pub day: Option<String>,

    #[serde(default, alias = "startTime", deserialize_with = "lenient_text")]
    pub start: Option<String>,

    #[serde(default, alias = "endTime", deserialize_with = "lenient_text")]
    pub end: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

/// Accept strings, numbers and booleans as text; blank strings become `None`.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(non_blank(&s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected text, found {other}"))),
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, DataIntegrityError> {
    value
        .as_deref()
        .and_then(non_blank)
        .ok_or(DataIntegrityError::MissingField(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(non_blank)
}

fn parse_day(value: &str) -> Result<Weekday, DataIntegrityError> {
    value
        .parse::<Weekday>()
        .map_err(|_| DataIntegrityError::InvalidField {
            field: "day",
            value: value.to_string(),
            reason: "not a day of the week",
        })
}

/// Parse "HH:MM" or "HH:MM:SS".
fn parse_time(value: &str, field: &'static str) -> Result<NaiveTime, DataIntegrityError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| DataIntegrityError::InvalidField {
            field,
            value: value.to_string(),
            reason: "expected HH:MM",
        })
}

impl TryFrom<RawClassItem> for ClassItem {
    type Error = DataIntegrityError;

    fn try_from(raw: RawClassItem) -> Result<Self, Self::Error> {
        let course = required(raw.course, "course")?;
        let subject = required(raw.subject, "subject")?;
        let day = parse_day(&required(raw.day, "day")?)?;
        let start = parse_time(&required(raw.start, "start")?, "start")?;
        let end = parse_time(&required(raw.end, "end")?, "end")?;
        if end <= start {
            return Err(DataIntegrityError::InvalidTimeWindow { start, end });
        }

        let section = optional(raw.section);
        let key = match optional(raw.id) {
            Some(id) => ClassKey::explicit(&id)?,
            None => ClassKey::composite(&course, section.as_deref(), day, start),
        };

        Ok(ClassItem {
            key,
            course,
            section,
            subject,
            instructor: optional(raw.instructor),
            room: optional(raw.room),
            day,
            start,
            end,
            status: optional(raw.status),
        })
    }
}

//! Planner tasks, as issued by the backend

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// How long a task lasts when the backend did not tell
pub const DEFAULT_DURATION_MINUTES: u32 = 60;


/// An opaque task identifier, unique within a [`TaskCollection`]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    content: String,
}
impl TaskId {
    /// Generate a random TaskId.
    pub fn random() -> Self {
        let random = uuid::Uuid::new_v4().to_hyphenated().to_string();
        Self { content: random }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}
impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self { content: s }
    }
}
impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self { content: s.to_string() }
    }
}
impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.content)
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<TaskId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(TaskId{ content: s })
    }
}



/// The day the backend planned a task for.
///
/// The backend sends `"today"`, `"tomorrow"`, `"unscheduled"`, or nothing at all.
/// Anything that is neither today nor tomorrow lands in the inbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlanDay {
    Today,
    Tomorrow,
    Unscheduled,
}

impl Default for PlanDay {
    fn default() -> Self {
        PlanDay::Unscheduled
    }
}

impl PlanDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanDay::Today => "today",
            PlanDay::Tomorrow => "tomorrow",
            PlanDay::Unscheduled => "unscheduled",
        }
    }
}

impl Serialize for PlanDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
impl<'de> Deserialize<'de> for PlanDay {
    fn deserialize<D>(deserializer: D) -> Result<PlanDay, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `null` is accepted as well, and unknown values are not an error
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("today") => PlanDay::Today,
            Some("tomorrow") => PlanDay::Tomorrow,
            _ => PlanDay::Unscheduled,
        })
    }
}



/// Date-times without an offset the backend may send, read as UTC
const NAIVE_DUE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a due date the way the backend writes them: RFC 3339, or a local date-time without offset (taken as UTC)
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NAIVE_DUE_DATE_FORMATS.iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    // A single odd date must not make the whole snapshot unreadable
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let parsed = parse_due_date(&raw);
        if parsed.is_none() {
            log::warn!("Ignoring unreadable due date {:?}", raw);
        }
        parsed
    }))
}



/// A task, as it was in the last snapshot the backend sent.
///
/// Tasks are value snapshots: the client never edits them, it only replaces the whole collection
/// (or drops a task when it is optimistically deleted).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    #[serde(default)]
    title: String,
    /// `None` means unscheduled
    #[serde(default, deserialize_with = "deserialize_due_date")]
    due_date: Option<DateTime<Utc>>,
    /// In minutes
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    plan_day: PlanDay,
    #[serde(default)]
    needs_clarification: bool,
    #[serde(default)]
    pending_questions: Vec<String>,
    /// Whether this task comes from an ingested calendar, rather than from the backend own storage
    #[serde(default)]
    is_external: bool,
    /// The calendar event the backend created for this task, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calendar_event_id: Option<String>,
}


impl Task {
    /// Create a brand new unscheduled task, with a random ID
    pub fn new(title: String) -> Self {
        Self::new_with_parameters(TaskId::random(), title, None, None, PlanDay::Unscheduled, Vec::new(), false)
    }

    /// Create a new Task instance.
    ///
    /// `needs_clarification` is set whenever `pending_questions` is not empty.
    pub fn new_with_parameters(id: TaskId, title: String,
                               due_date: Option<DateTime<Utc>>, duration: Option<u32>,
                               plan_day: PlanDay, pending_questions: Vec<String>,
                               is_external: bool,
                            ) -> Self
    {
        Self {
            id,
            title,
            due_date,
            duration,
            plan_day,
            needs_clarification: pending_questions.is_empty() == false,
            pending_questions,
            is_external,
            calendar_event_id: None,
        }
    }

    pub fn with_calendar_event_id(mut self, event_id: String) -> Self {
        self.calendar_event_id = Some(event_id);
        self
    }

    pub fn id(&self) -> &TaskId                   { &self.id          }
    pub fn title(&self) -> &str                   { &self.title       }
    pub fn due_date(&self) -> Option<&DateTime<Utc>> { self.due_date.as_ref() }
    pub fn plan_day(&self) -> PlanDay             { self.plan_day     }
    pub fn needs_clarification(&self) -> bool     { self.needs_clarification }
    pub fn pending_questions(&self) -> &[String]  { &self.pending_questions }
    pub fn is_external(&self) -> bool             { self.is_external  }
    pub fn calendar_event_id(&self) -> Option<&str> { self.calendar_event_id.as_deref() }

    /// The duration, in minutes, defaulting to [`DEFAULT_DURATION_MINUTES`]
    pub fn duration(&self) -> u32 {
        self.duration.unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    /// Only the first pending question is ever shown to the user
    pub fn first_question(&self) -> Option<&str> {
        self.pending_questions.first().map(|q| q.as_str())
    }

    /// When this task ends (for display only), or `None` for unscheduled tasks
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.due_date.map(|start| start + Duration::minutes(i64::from(self.duration())))
    }
}


/// The tasks the client knows about, in the order the backend sent them.
///
/// IDs are unique, but the collection is not sorted.
pub type TaskCollection = Vec<Task>;


/// The body of a `GET /demo_state` reply
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: TaskCollection,
}

//! Sorting tasks into the day buckets the user sees

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::task::{PlanDay, Task};

/// The tasks, as they should be shown
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Buckets {
    /// Tasks waiting for an answer from the user, in collection order
    pub clarify: Vec<Task>,
    pub today: Vec<Task>,
    pub tomorrow: Vec<Task>,
    /// Everything else
    pub inbox: Vec<Task>,
}

impl Buckets {
    /// Whether there is nothing at all to show
    pub fn is_empty(&self) -> bool {
        self.clarify.is_empty() && self.today.is_empty() && self.tomorrow.is_empty() && self.inbox.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clarify.len() + self.today.len() + self.tomorrow.len() + self.inbox.len()
    }
}

/// What the presenter needs on top of the buckets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderFlags {
    pub show_clarify_section: bool,
    pub has_synced: bool,
    /// Set when every bucket is empty, and the inbox should display this instead
    pub inbox_placeholder: Option<InboxPlaceholder>,
}

/// The text shown in an empty inbox
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboxPlaceholder {
    /// No full sync ever completed
    PromptToSync,
    /// Synced, and nothing left to do
    AllClear,
}

impl Display for InboxPlaceholder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InboxPlaceholder::PromptToSync => write!(f, "Run a full sync to load your calendar and tasks"),
            InboxPlaceholder::AllClear => write!(f, "All clear! Nothing left to plan"),
        }
    }
}


/// Split tasks into buckets.
///
/// Tasks that need clarification go to `clarify`, whatever their plan day.
/// The others are sorted by due date (dated tasks first, earliest first, ties keep their collection order)
/// and dispatched by plan day.
pub fn classify(tasks: &[Task]) -> Buckets {
    let (clarify, mut other): (Vec<Task>, Vec<Task>) = tasks.iter()
        .cloned()
        .partition(|t| t.needs_clarification());

    // sort_by is stable
    other.sort_by(compare_due_dates);

    let mut buckets = Buckets { clarify, ..Buckets::default() };
    for task in other {
        match task.plan_day() {
            PlanDay::Today => buckets.today.push(task),
            PlanDay::Tomorrow => buckets.tomorrow.push(task),
            PlanDay::Unscheduled => buckets.inbox.push(task),
        }
    }
    buckets
}

/// Compute the flags that go along with some buckets
pub fn render_flags(buckets: &Buckets, has_synced: bool) -> RenderFlags {
    let inbox_placeholder = if buckets.is_empty() {
        Some(if has_synced { InboxPlaceholder::AllClear } else { InboxPlaceholder::PromptToSync })
    } else {
        None
    };

    RenderFlags {
        show_clarify_section: buckets.clarify.is_empty() == false,
        has_synced,
        inbox_placeholder,
    }
}

fn compare_due_dates(a: &Task, b: &Task) -> Ordering {
    match (a.due_date(), b.due_date()) {
        (Some(da), Some(db)) => da.cmp(db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

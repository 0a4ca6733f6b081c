//! What presenters display, derived from tasks and buckets.
//!
//! Presenters should not need to look at [`Task`]s directly: view models already carry the formatted texts.

use std::fmt::Display;

use chrono::TimeZone;

use crate::classifier::{Buckets, RenderFlags};
use crate::task::{Task, TaskId};

/// How a single task is displayed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    /// e.g. `09:00 - 10:00`, or `None` for unscheduled tasks
    pub time_label: Option<String>,
    /// The question to ask the user, for tasks that need clarification
    pub question: Option<String>,
    pub is_external: bool,
    /// A calendar event has been created for this task
    pub is_scheduled: bool,
}

impl TaskView {
    pub fn new<Tz>(task: &Task, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let time_label = match (task.due_date(), task.end_date()) {
            (Some(start), Some(end)) => Some(format!("{} - {}",
                start.with_timezone(tz).format("%H:%M"),
                end.with_timezone(tz).format("%H:%M"))),
            _ => None,
        };

        Self {
            id: task.id().clone(),
            title: task.title().to_string(),
            time_label,
            question: if task.needs_clarification() { task.first_question().map(String::from) } else { None },
            is_external: task.is_external(),
            is_scheduled: task.calendar_event_id().is_some(),
        }
    }
}


/// A titled list of tasks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionView {
    pub title: &'static str,
    pub visible: bool,
    pub tasks: Vec<TaskView>,
    /// Shown instead of tasks when there are none
    pub placeholder: Option<String>,
}

/// Everything there is to draw
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardView {
    pub clarify: SectionView,
    pub today: SectionView,
    pub tomorrow: SectionView,
    pub inbox: SectionView,
}

impl BoardView {
    pub fn new<Tz>(buckets: &Buckets, flags: RenderFlags, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let views = |tasks: &[Task]| -> Vec<TaskView> {
            tasks.iter().map(|t| TaskView::new(t, tz)).collect()
        };

        Self {
            clarify: SectionView {
                title: "Needs your input",
                visible: flags.show_clarify_section,
                tasks: views(&buckets.clarify),
                placeholder: None,
            },
            today: SectionView {
                title: "Today",
                visible: true,
                tasks: views(&buckets.today),
                placeholder: None,
            },
            tomorrow: SectionView {
                title: "Tomorrow",
                visible: true,
                tasks: views(&buckets.tomorrow),
                placeholder: None,
            },
            inbox: SectionView {
                title: "Inbox",
                visible: true,
                tasks: views(&buckets.inbox),
                placeholder: flags.inbox_placeholder.map(|p| p.to_string()),
            },
        }
    }

    /// Sections in display order
    pub fn sections(&self) -> [&SectionView; 4] {
        [&self.clarify, &self.today, &self.tomorrow, &self.inbox]
    }
}

//! Reminder query predicates.
//!
//! Predicates are plain values: building one performs no I/O. A store
//! evaluates them with [`ReminderPredicate::matches`] or translates them into
//! its native query form.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::model::{Calendar, Reminder};

/// A query over reminder items.
///
/// `calendar_ids` of `None` means every reminder calendar in the store.
/// Date bounds are half-open: `start <= date < end`. When any bound is set,
/// items without the relevant date never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderPredicate {
    /// Every reminder, complete or not.
    All { calendar_ids: Option<Vec<String>> },
    /// Incomplete reminders, optionally bounded by due date.
    Incomplete {
        due_start: Option<NaiveDateTime>,
        due_end: Option<NaiveDateTime>,
        calendar_ids: Option<Vec<String>>,
    },
    /// Completed reminders, optionally bounded by completion date.
    Completed {
        completion_start: Option<DateTime<Utc>>,
        completion_end: Option<DateTime<Utc>>,
        calendar_ids: Option<Vec<String>>,
    },
}

fn calendar_ids(calendars: Option<&[Calendar]>) -> Option<Vec<String>> {
    calendars.map(|cals| cals.iter().map(|c| c.identifier.clone()).collect())
}

fn within<T: PartialOrd>(value: Option<T>, start: Option<T>, end: Option<T>) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    start.is_none_or(|s| value >= s) && end.is_none_or(|e| value < e)
}

impl ReminderPredicate {
    /// All reminders in `calendars` (or every reminder calendar).
    pub fn reminders(calendars: Option<&[Calendar]>) -> Self {
        ReminderPredicate::All {
            calendar_ids: calendar_ids(calendars),
        }
    }

    /// Incomplete reminders due within `[due_start, due_end)`.
    pub fn incomplete(
        due_start: Option<NaiveDateTime>,
        due_end: Option<NaiveDateTime>,
        calendars: Option<&[Calendar]>,
    ) -> Self {
        ReminderPredicate::Incomplete {
            due_start,
            due_end,
            calendar_ids: calendar_ids(calendars),
        }
    }

    /// Completed reminders finished within `[completion_start, completion_end)`.
    pub fn completed(
        completion_start: Option<DateTime<Utc>>,
        completion_end: Option<DateTime<Utc>>,
        calendars: Option<&[Calendar]>,
    ) -> Self {
        ReminderPredicate::Completed {
            completion_start,
            completion_end,
            calendar_ids: calendar_ids(calendars),
        }
    }

    /// Calendar restriction of this predicate.
    pub fn calendar_ids(&self) -> Option<&[String]> {
        match self {
            ReminderPredicate::All { calendar_ids }
            | ReminderPredicate::Incomplete { calendar_ids, .. }
            | ReminderPredicate::Completed { calendar_ids, .. } => calendar_ids.as_deref(),
        }
    }

    /// Whether `reminder` satisfies this predicate.
    pub fn matches(&self, reminder: &Reminder) -> bool {
        if let Some(ids) = self.calendar_ids()
            && !ids.iter().any(|id| *id == reminder.calendar_id)
        {
            return false;
        }

        match self {
            ReminderPredicate::All { .. } => true,
            ReminderPredicate::Incomplete {
                due_start, due_end, ..
            } => !reminder.is_completed && within(reminder.due_date(), *due_start, *due_end),
            ReminderPredicate::Completed {
                completion_start,
                completion_end,
                ..
            } => {
                reminder.is_completed
                    && within(reminder.completion_date, *completion_start, *completion_end)
            }
        }
    }
}

//! Domain types mirrored from the platform reminders store.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The account a calendar belongs to (iCloud, local, Exchange, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Store identifier of the source.
    pub identifier: String,
    /// Display title of the source.
    pub title: String,
}

/// A named reminder list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Store identifier of the calendar.
    pub identifier: String,
    /// Display title of the list.
    pub title: String,
    /// Owning account.
    pub source: Source,
}

/// Data for creating a new reminder calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCalendar {
    /// Title of the list.
    pub title: String,
    /// Source to create the list in.
    pub source: Source,
}

/// Calendar date components, as attached to reminders.
///
/// A value without `hour` describes an all-day date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComponents {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
}

impl DateComponents {
    /// All-day components for the given date.
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: None,
            minute: None,
        }
    }

    /// Components with a time of day.
    pub fn date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: Some(hour),
            minute: Some(minute),
        }
    }

    /// Resolve to a floating date-time. Date-only components resolve to midnight.
    ///
    /// Returns `None` when the components do not name a valid date.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        date.and_hms_opt(self.hour.unwrap_or(0), self.minute.unwrap_or(0), 0)
    }
}

/// Reminder priority, carried as the platform's ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPriority {
    #[default]
    None,
    High,
    Medium,
    Low,
}

impl ReminderPriority {
    /// Platform ordinal: 0 none, 1 high, 5 medium, 9 low.
    pub fn ordinal(self) -> u8 {
        match self {
            ReminderPriority::None => 0,
            ReminderPriority::High => 1,
            ReminderPriority::Medium => 5,
            ReminderPriority::Low => 9,
        }
    }
}

impl fmt::Display for ReminderPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReminderPriority::None => "none",
            ReminderPriority::High => "high",
            ReminderPriority::Medium => "medium",
            ReminderPriority::Low => "low",
        };
        f.write_str(s)
    }
}

/// A single reminder item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Store identifier of the item.
    pub identifier: String,
    /// Identifier of the owning calendar.
    pub calendar_id: String,
    pub title: String,
    pub start_date_components: Option<DateComponents>,
    pub due_date_components: Option<DateComponents>,
    pub priority: ReminderPriority,
    pub notes: Option<String>,
    pub is_completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
}

impl Reminder {
    /// Due date resolved to a floating date-time, if set and valid.
    pub fn due_date(&self) -> Option<NaiveDateTime> {
        self.due_date_components.as_ref().and_then(DateComponents::to_naive)
    }
}

/// Data for creating a new reminder in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub calendar_id: String,
    pub start_date_components: Option<DateComponents>,
    pub due_date_components: Option<DateComponents>,
    pub priority: ReminderPriority,
    pub notes: Option<String>,
}

/// A non-reminder calendar item (an event) as seen through an item lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventItem {
    pub identifier: String,
    pub calendar_id: String,
    pub title: String,
}

/// Result of looking up a calendar item by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarItem {
    Reminder(Reminder),
    Event(EventItem),
}

impl CalendarItem {
    /// The reminder, if this item is one.
    pub fn into_reminder(self) -> Option<Reminder> {
        match self {
            CalendarItem::Reminder(reminder) => Some(reminder),
            CalendarItem::Event(_) => None,
        }
    }
}

/// Raw permission state reported by the platform store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformAuthorization {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
}

/// Binary authorization status exposed by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
}

impl From<PlatformAuthorization> for AuthorizationStatus {
    fn from(platform: PlatformAuthorization) -> Self {
        match platform {
            PlatformAuthorization::Authorized => AuthorizationStatus::Authorized,
            PlatformAuthorization::NotDetermined
            | PlatformAuthorization::Restricted
            | PlatformAuthorization::Denied => AuthorizationStatus::Denied,
        }
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationStatus::Authorized => f.write_str("authorized"),
            AuthorizationStatus::Denied => f.write_str("denied"),
        }
    }
}

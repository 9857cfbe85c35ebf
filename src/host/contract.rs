//! Versioned host command/event envelopes for the reminders bridge.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DateComponents, ReminderPriority};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Command set understood by the reminders host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "authorization.status")]
    AuthorizationStatus,
    #[serde(rename = "authorization.request")]
    AuthorizationRequest,
    #[serde(rename = "store.begin")]
    StoreBegin,
    #[serde(rename = "store.reset")]
    StoreReset,
    #[serde(rename = "store.commit")]
    StoreCommit,
    #[serde(rename = "calendars.fetch")]
    CalendarsFetch,
    #[serde(rename = "calendars.create")]
    CalendarsCreate,
    #[serde(rename = "calendars.remove")]
    CalendarsRemove,
    #[serde(rename = "reminders.fetch")]
    RemindersFetch,
    #[serde(rename = "reminders.create")]
    RemindersCreate,
    #[serde(rename = "reminders.remove")]
    RemindersRemove,
    #[serde(rename = "reminders.set_completed")]
    RemindersSetCompleted,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationStatus => "authorization.status",
            Self::AuthorizationRequest => "authorization.request",
            Self::StoreBegin => "store.begin",
            Self::StoreReset => "store.reset",
            Self::StoreCommit => "store.commit",
            Self::CalendarsFetch => "calendars.fetch",
            Self::CalendarsCreate => "calendars.create",
            Self::CalendarsRemove => "calendars.remove",
            Self::RemindersFetch => "reminders.fetch",
            Self::RemindersCreate => "reminders.create",
            Self::RemindersRemove => "reminders.remove",
            Self::RemindersSetCompleted => "reminders.set_completed",
        }
    }
}

/// A versioned command envelope from frontend -> host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), String> {
        if self.v != EVENT_VERSION {
            return Err(format!(
                "unsupported contract version {}; expected {}",
                self.v, EVENT_VERSION
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err("request_id cannot be empty".to_owned());
        }
        Ok(())
    }
}

/// A versioned response envelope from host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned event envelope from host -> frontend, carrying a delegate
/// notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            event: event.into(),
            payload,
        }
    }
}

// ─── Payloads ─────────────────────────────────────────────────────────────────

/// Payload of commands addressed at one entity.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifierPayload {
    pub identifier: String,
}

/// Payload of `calendars.create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCalendarPayload {
    pub title: String,
}

/// Payload of `reminders.create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderPayload {
    pub title: String,
    pub calendar_id: String,
    #[serde(default)]
    pub start_date_components: Option<DateComponents>,
    #[serde(default)]
    pub due_date_components: Option<DateComponents>,
    #[serde(default)]
    pub priority: Option<ReminderPriority>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload of `reminders.set_completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetCompletedPayload {
    pub identifier: String,
    pub completed: bool,
}

/// Which reminders `reminders.fetch` returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFilter {
    #[default]
    All,
    Incomplete {
        #[serde(default)]
        due_start: Option<NaiveDateTime>,
        #[serde(default)]
        due_end: Option<NaiveDateTime>,
    },
    Completed {
        #[serde(default)]
        completion_start: Option<DateTime<Utc>>,
        #[serde(default)]
        completion_end: Option<DateTime<Utc>>,
    },
}

/// Payload of `reminders.fetch`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FetchRemindersPayload {
    /// Restrict to these calendars; all reminder calendars when absent.
    pub calendar_ids: Option<Vec<String>>,
    pub filter: FetchFilter,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn command_names_serialize_to_wire_names() {
        for name in [
            CommandName::AuthorizationRequest,
            CommandName::StoreCommit,
            CommandName::RemindersSetCompleted,
        ] {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn envelope_validation() {
        let mut env = CommandEnvelope::new("r1", CommandName::CalendarsFetch, serde_json::json!({}));
        assert!(env.validate().is_ok());

        env.v = 99;
        assert!(env.validate().unwrap_err().contains("unsupported"));

        env.v = EVENT_VERSION;
        env.request_id = "  ".to_owned();
        assert!(env.validate().is_err());
    }

    #[test]
    fn missing_payload_defaults_to_null() {
        let env: CommandEnvelope =
            serde_json::from_str(r#"{"v":1,"request_id":"r1","command":"store.begin"}"#).unwrap();
        assert_eq!(env.command, CommandName::StoreBegin);
        assert!(env.payload.is_null());
    }

    #[test]
    fn fetch_payload_parses_filters() {
        let payload: FetchRemindersPayload = serde_json::from_value(serde_json::json!({
            "calendar_ids": ["cal-1"],
            "filter": { "kind": "incomplete", "due_end": "2026-03-08T00:00:00" }
        }))
        .unwrap();
        assert_eq!(payload.calendar_ids, Some(vec!["cal-1".to_owned()]));
        assert!(matches!(
            payload.filter,
            FetchFilter::Incomplete {
                due_start: None,
                due_end: Some(_)
            }
        ));

        let empty: FetchRemindersPayload = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty.filter, FetchFilter::All);
    }

    #[test]
    fn create_reminder_payload_accepts_priority_names() {
        let payload: CreateReminderPayload = serde_json::from_value(serde_json::json!({
            "title": "Buy milk",
            "calendar_id": "cal-1",
            "priority": "high",
            "due_date_components": { "year": 2026, "month": 3, "day": 1 }
        }))
        .unwrap();
        assert_eq!(payload.priority, Some(ReminderPriority::High));
        assert_eq!(
            payload.due_date_components,
            Some(DateComponents::date(2026, 3, 1))
        );
    }
}

//! Routes host commands to the reminders facade.
//!
//! Each command is forwarded to the matching [`ReminderFacade`] operation and
//! its completion is awaited through a oneshot channel. Delegate
//! notifications are collected by [`EventForwarder`] and drained by the
//! bridge after every command.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

use super::contract::{
    CommandEnvelope, CommandName, CreateCalendarPayload, CreateReminderPayload, EventEnvelope,
    FetchFilter, FetchRemindersPayload, IdentifierPayload, ResponseEnvelope, SetCompletedPayload,
};
use crate::delegate::ReminderFacadeDelegate;
use crate::error::{EntityKind, StoreError};
use crate::facade::{Completion, ReminderFacade, ReminderOptions};
use crate::model::{AuthorizationStatus, Calendar, Reminder};
use crate::predicate::ReminderPredicate;

/// Delegate that turns facade notifications into [`EventEnvelope`]s.
pub struct EventForwarder {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

impl EventForwarder {
    /// Create a forwarder and the receiver its events arrive on.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn emit(&self, event: &str, payload: Value) {
        if self.tx.send(EventEnvelope::new(event, payload)).is_err() {
            tracing::debug!(event, "event receiver gone; dropping event");
        }
    }
}

fn result_payload<T: serde::Serialize>(result: &Result<T, StoreError>) -> Value {
    match result {
        Ok(value) => json!({ "ok": true, "value": value }),
        Err(e) => json!({ "ok": false, "error": e.to_string() }),
    }
}

impl ReminderFacadeDelegate for EventForwarder {
    fn authorization_status_did_change(
        &self,
        _facade: &ReminderFacade,
        status: AuthorizationStatus,
    ) {
        self.emit("authorization.changed", json!({ "status": status }));
    }

    fn did_authorize(&self, _facade: &ReminderFacade) {
        self.emit("authorization.authorized", Value::Null);
    }

    fn did_deny(&self, _facade: &ReminderFacade) {
        self.emit("authorization.denied", Value::Null);
    }

    fn did_create_calendar(&self, _facade: &ReminderFacade, result: &Result<Calendar, StoreError>) {
        self.emit("calendar.created", result_payload(result));
    }

    fn did_remove_calendar(
        &self,
        _facade: &ReminderFacade,
        identifier: &str,
        result: &Result<(), StoreError>,
    ) {
        let mut payload = result_payload(result);
        payload["identifier"] = json!(identifier);
        self.emit("calendar.removed", payload);
    }

    fn did_create_reminder(&self, _facade: &ReminderFacade, result: &Result<Reminder, StoreError>) {
        self.emit("reminder.created", result_payload(result));
    }

    fn did_remove_reminder(
        &self,
        _facade: &ReminderFacade,
        identifier: &str,
        result: &Result<(), StoreError>,
    ) {
        let mut payload = result_payload(result);
        payload["identifier"] = json!(identifier);
        self.emit("reminder.removed", payload);
    }

    fn did_update_reminder(&self, _facade: &ReminderFacade, result: &Result<Reminder, StoreError>) {
        self.emit("reminder.updated", result_payload(result));
    }
}

fn parse_payload<T: DeserializeOwned + Default>(payload: &Value) -> Result<T, String> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload.clone()).map_err(|e| format!("invalid payload: {e}"))
}

fn parse_required<T: DeserializeOwned>(payload: &Value) -> Result<T, String> {
    serde_json::from_value(payload.clone()).map_err(|e| format!("invalid payload: {e}"))
}

fn waiter<T: Send + 'static>() -> (Completion<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    let completion: Completion<T> = Box::new(move |value| {
        let _ = tx.send(value);
    });
    (completion, rx)
}

async fn wait<T>(rx: oneshot::Receiver<T>) -> Result<T, String> {
    rx.await
        .map_err(|_| "facade dropped the completion without answering".to_owned())
}

async fn find_calendar(facade: &ReminderFacade, identifier: &str) -> Result<Calendar, String> {
    let (done, rx) = waiter();
    facade.fetch_calendars_for_reminders(Some(done));
    let calendars = wait(rx).await?.map_err(|e| e.to_string())?;
    calendars
        .into_iter()
        .find(|c| c.identifier == identifier)
        .ok_or_else(|| StoreError::not_found(EntityKind::Calendar, identifier).to_string())
}

/// Execute one command and build its response.
pub async fn handle_command(
    facade: &ReminderFacade,
    envelope: &CommandEnvelope,
) -> ResponseEnvelope {
    if let Err(e) = envelope.validate() {
        return ResponseEnvelope::error(envelope.request_id.clone(), e);
    }
    tracing::debug!(
        command = envelope.command.as_str(),
        request_id = %envelope.request_id,
        "handling command"
    );

    match dispatch(facade, envelope.command, &envelope.payload).await {
        Ok(payload) => ResponseEnvelope::ok(envelope.request_id.clone(), payload),
        Err(message) => ResponseEnvelope::error(envelope.request_id.clone(), message),
    }
}

async fn dispatch(
    facade: &ReminderFacade,
    command: CommandName,
    payload: &Value,
) -> Result<Value, String> {
    match command {
        CommandName::AuthorizationStatus => {
            Ok(json!({ "status": facade.authorization_status_for_reminders() }))
        }
        CommandName::AuthorizationRequest => {
            let (done, rx) = waiter();
            facade.request_authorization_for_reminders(Some(done));
            let status = wait(rx).await?;
            Ok(json!({ "status": status }))
        }
        CommandName::StoreBegin => {
            facade.begin();
            Ok(json!({ "auto_commit": facade.is_auto_commit() }))
        }
        CommandName::StoreReset => {
            facade.reset();
            Ok(json!({ "auto_commit": facade.is_auto_commit() }))
        }
        CommandName::StoreCommit => {
            let (done, rx) = waiter();
            facade.commit(Some(done));
            wait(rx).await?.map_err(|e| e.to_string())?;
            Ok(json!({ "auto_commit": facade.is_auto_commit() }))
        }
        CommandName::CalendarsFetch => {
            let (done, rx) = waiter();
            facade.fetch_calendars_for_reminders(Some(done));
            let calendars = wait(rx).await?.map_err(|e| e.to_string())?;
            Ok(json!({ "calendars": calendars }))
        }
        CommandName::CalendarsCreate => {
            let req: CreateCalendarPayload = parse_required(payload)?;
            let (done, rx) = waiter();
            facade.create_calendar_for_reminders(&req.title, Some(done));
            let calendar = wait(rx).await?.map_err(|e| e.to_string())?;
            Ok(json!({ "calendar": calendar }))
        }
        CommandName::CalendarsRemove => {
            let req: IdentifierPayload = parse_required(payload)?;
            let (done, rx) = waiter();
            facade.remove_calendar(&req.identifier, Some(done));
            wait(rx).await?.map_err(|e| e.to_string())?;
            Ok(json!({ "removed": req.identifier }))
        }
        CommandName::RemindersFetch => {
            let req: FetchRemindersPayload = parse_payload(payload)?;
            let calendar_ids = req.calendar_ids;
            let predicate = match req.filter {
                FetchFilter::All => ReminderPredicate::All { calendar_ids },
                FetchFilter::Incomplete { due_start, due_end } => ReminderPredicate::Incomplete {
                    due_start,
                    due_end,
                    calendar_ids,
                },
                FetchFilter::Completed {
                    completion_start,
                    completion_end,
                } => ReminderPredicate::Completed {
                    completion_start,
                    completion_end,
                    calendar_ids,
                },
            };
            let (done, rx) = waiter();
            facade.fetch_reminders(predicate, Some(done));
            let reminders = wait(rx).await?;
            Ok(json!({ "reminders": reminders }))
        }
        CommandName::RemindersCreate => {
            let req: CreateReminderPayload = parse_required(payload)?;
            let calendar = find_calendar(facade, &req.calendar_id).await?;
            let options = ReminderOptions {
                start_date_components: req.start_date_components,
                due_date_components: req.due_date_components,
                priority: req.priority,
                notes: req.notes,
            };
            let (done, rx) = waiter();
            facade.create_reminder(&req.title, &calendar, options, Some(done));
            let reminder = wait(rx).await?.map_err(|e| e.to_string())?;
            Ok(json!({ "reminder": reminder }))
        }
        CommandName::RemindersRemove => {
            let req: IdentifierPayload = parse_required(payload)?;
            let (done, rx) = waiter();
            facade.remove_reminder(&req.identifier, Some(done));
            wait(rx).await?.map_err(|e| e.to_string())?;
            Ok(json!({ "removed": req.identifier }))
        }
        CommandName::RemindersSetCompleted => {
            let req: SetCompletedPayload = parse_required(payload)?;
            let (done, rx) = waiter();
            facade.set_reminder_completed(&req.identifier, req.completed, Some(done));
            let reminder = wait(rx).await?.map_err(|e| e.to_string())?;
            Ok(json!({ "reminder": reminder }))
        }
    }
}

//! In-process [`ReminderStore`].
//!
//! Keeps a working copy that every read and write sees, and a committed
//! snapshot that only moves forward on a committing write or an explicit
//! [`commit`](ReminderStore::commit). Writes made with `commit = false`
//! stay staged in the working copy until then.
//!
//! Failure injection ([`InMemoryReminderStore::fail_next`]) lets callers
//! exercise the error paths of the layers above.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::ReminderStore;
use crate::config::StoreConfig;
use crate::error::{EntityKind, StoreError};
use crate::model::{
    Calendar, CalendarItem, EventItem, NewCalendar, NewReminder, PlatformAuthorization, Reminder,
    Source,
};
use crate::predicate::ReminderPredicate;

/// Store operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    RequestAccess,
    Calendars,
    Reminders,
    SaveCalendar,
    RemoveCalendar,
    SaveReminder,
    RemoveReminder,
    SetCompleted,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    calendars: Vec<Calendar>,
    reminders: Vec<Reminder>,
    events: Vec<EventItem>,
}

#[derive(Debug)]
struct Inner {
    working: Snapshot,
    committed: Snapshot,
    dirty: bool,
    commit_count: usize,
    default_calendar_id: Option<String>,
    authorization: PlatformAuthorization,
    grant_on_request: bool,
    failures: HashMap<StoreOperation, String>,
}

impl Inner {
    fn take_failure(&mut self, op: StoreOperation) -> Result<(), StoreError> {
        match self.failures.remove(&op) {
            Some(message) => Err(StoreError::Backend(message)),
            None => Ok(()),
        }
    }

    fn persist(&mut self, commit: bool) {
        if commit {
            self.committed = self.working.clone();
            self.dirty = false;
        } else {
            self.dirty = true;
        }
    }
}

/// An in-memory reminders store.
pub struct InMemoryReminderStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryReminderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReminderStore {
    /// An empty store whose authorization has not been determined yet.
    ///
    /// Access requests are granted unless [`set_access_response`] says otherwise.
    ///
    /// [`set_access_response`]: Self::set_access_response
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                working: Snapshot::default(),
                committed: Snapshot::default(),
                dirty: false,
                commit_count: 0,
                default_calendar_id: None,
                authorization: PlatformAuthorization::NotDetermined,
                grant_on_request: true,
                failures: HashMap::new(),
            }),
        }
    }

    /// A store seeded with one local default reminders calendar titled `title`.
    pub fn with_default_calendar(title: &str) -> Self {
        Self::with_default_calendar_in(title, "On My Device")
    }

    /// Build a store from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        if config.seed_default_calendar {
            Self::with_default_calendar_in(
                &config.default_calendar_title,
                &config.default_source_title,
            )
        } else {
            Self::new()
        }
    }

    fn with_default_calendar_in(title: &str, source_title: &str) -> Self {
        let store = Self::new();
        let calendar = Calendar {
            identifier: Uuid::new_v4().to_string(),
            title: title.to_owned(),
            source: Source {
                identifier: "local".to_owned(),
                title: source_title.to_owned(),
            },
        };
        store.seed_calendar(calendar.clone());
        if let Ok(mut inner) = store.lock() {
            inner.default_calendar_id = Some(calendar.identifier);
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("reminders store lock poisoned".to_owned()))
    }

    /// Insert a calendar as already committed state.
    pub fn seed_calendar(&self, calendar: Calendar) {
        if let Ok(mut inner) = self.lock() {
            inner.working.calendars.push(calendar.clone());
            inner.committed.calendars.push(calendar);
        }
    }

    /// Insert a reminder as already committed state.
    pub fn seed_reminder(&self, reminder: Reminder) {
        if let Ok(mut inner) = self.lock() {
            inner.working.reminders.push(reminder.clone());
            inner.committed.reminders.push(reminder);
        }
    }

    /// Insert an event item as already committed state.
    pub fn seed_event(&self, event: EventItem) {
        if let Ok(mut inner) = self.lock() {
            inner.working.events.push(event.clone());
            inner.committed.events.push(event);
        }
    }

    /// Set which calendar new calendars take their source from.
    pub fn set_default_calendar(&self, identifier: Option<&str>) {
        if let Ok(mut inner) = self.lock() {
            inner.default_calendar_id = identifier.map(str::to_owned);
        }
    }

    /// Set the permission state reported before any access request.
    pub fn set_authorization(&self, authorization: PlatformAuthorization) {
        if let Ok(mut inner) = self.lock() {
            inner.authorization = authorization;
        }
    }

    /// Choose how the simulated user answers access requests.
    pub fn set_access_response(&self, grant: bool) {
        if let Ok(mut inner) = self.lock() {
            inner.grant_on_request = grant;
        }
    }

    /// Make the next call of `op` fail with [`StoreError::Backend`] carrying `message`.
    pub fn fail_next(&self, op: StoreOperation, message: &str) {
        if let Ok(mut inner) = self.lock() {
            inner.failures.insert(op, message.to_owned());
        }
    }

    /// Number of explicit [`commit`](ReminderStore::commit) calls that succeeded.
    pub fn commit_count(&self) -> usize {
        self.lock().map(|inner| inner.commit_count).unwrap_or(0)
    }

    /// Calendars in the committed snapshot.
    pub fn committed_calendars(&self) -> Vec<Calendar> {
        self.lock()
            .map(|inner| inner.committed.calendars.clone())
            .unwrap_or_default()
    }

    /// Reminders in the committed snapshot.
    pub fn committed_reminders(&self) -> Vec<Reminder> {
        self.lock()
            .map(|inner| inner.committed.reminders.clone())
            .unwrap_or_default()
    }
}

impl ReminderStore for InMemoryReminderStore {
    fn authorization_status(&self) -> PlatformAuthorization {
        self.lock()
            .map(|inner| inner.authorization)
            .unwrap_or(PlatformAuthorization::Denied)
    }

    fn request_access(&self) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::RequestAccess)?;
        let granted = inner.grant_on_request;
        inner.authorization = if granted {
            PlatformAuthorization::Authorized
        } else {
            PlatformAuthorization::Denied
        };
        Ok(granted)
    }

    fn calendars(&self) -> Result<Vec<Calendar>, StoreError> {
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::Calendars)?;
        Ok(inner.working.calendars.clone())
    }

    fn calendar(&self, identifier: &str) -> Result<Option<Calendar>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .working
            .calendars
            .iter()
            .find(|c| c.identifier == identifier)
            .cloned())
    }

    fn default_reminders_calendar(&self) -> Result<Option<Calendar>, StoreError> {
        let inner = self.lock()?;
        let Some(ref id) = inner.default_calendar_id else {
            return Ok(None);
        };
        Ok(inner
            .working
            .calendars
            .iter()
            .find(|c| c.identifier == *id)
            .cloned())
    }

    fn reminders_matching(
        &self,
        predicate: &ReminderPredicate,
    ) -> Result<Vec<Reminder>, StoreError> {
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::Reminders)?;
        Ok(inner
            .working
            .reminders
            .iter()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect())
    }

    fn calendar_item(&self, identifier: &str) -> Result<Option<CalendarItem>, StoreError> {
        let inner = self.lock()?;
        if let Some(reminder) = inner
            .working
            .reminders
            .iter()
            .find(|r| r.identifier == identifier)
        {
            return Ok(Some(CalendarItem::Reminder(reminder.clone())));
        }
        Ok(inner
            .working
            .events
            .iter()
            .find(|e| e.identifier == identifier)
            .cloned()
            .map(CalendarItem::Event))
    }

    fn save_calendar(&self, calendar: &NewCalendar, commit: bool) -> Result<Calendar, StoreError> {
        if calendar.title.trim().is_empty() {
            return Err(StoreError::InvalidInput(
                "calendar title must not be empty".to_owned(),
            ));
        }
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::SaveCalendar)?;

        let saved = Calendar {
            identifier: Uuid::new_v4().to_string(),
            title: calendar.title.clone(),
            source: calendar.source.clone(),
        };
        inner.working.calendars.push(saved.clone());
        inner.persist(commit);
        Ok(saved)
    }

    fn remove_calendar(&self, identifier: &str, commit: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::RemoveCalendar)?;

        let pos = inner
            .working
            .calendars
            .iter()
            .position(|c| c.identifier == identifier)
            .ok_or_else(|| StoreError::not_found(EntityKind::Calendar, identifier))?;
        inner.working.calendars.remove(pos);
        inner.working.reminders.retain(|r| r.calendar_id != identifier);
        inner.working.events.retain(|e| e.calendar_id != identifier);
        if inner.default_calendar_id.as_deref() == Some(identifier) {
            inner.default_calendar_id = None;
        }
        inner.persist(commit);
        Ok(())
    }

    fn save_reminder(&self, reminder: &NewReminder, commit: bool) -> Result<Reminder, StoreError> {
        if reminder.title.trim().is_empty() {
            return Err(StoreError::InvalidInput(
                "reminder title must not be empty".to_owned(),
            ));
        }
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::SaveReminder)?;

        if !inner
            .working
            .calendars
            .iter()
            .any(|c| c.identifier == reminder.calendar_id)
        {
            return Err(StoreError::not_found(
                EntityKind::Calendar,
                reminder.calendar_id.clone(),
            ));
        }

        let saved = Reminder {
            identifier: Uuid::new_v4().to_string(),
            calendar_id: reminder.calendar_id.clone(),
            title: reminder.title.clone(),
            start_date_components: reminder.start_date_components,
            due_date_components: reminder.due_date_components,
            priority: reminder.priority,
            notes: reminder.notes.clone(),
            is_completed: false,
            completion_date: None,
        };
        inner.working.reminders.push(saved.clone());
        inner.persist(commit);
        Ok(saved)
    }

    fn remove_reminder(&self, identifier: &str, commit: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::RemoveReminder)?;

        let pos = inner
            .working
            .reminders
            .iter()
            .position(|r| r.identifier == identifier)
            .ok_or_else(|| StoreError::not_found(EntityKind::Reminder, identifier))?;
        inner.working.reminders.remove(pos);
        inner.persist(commit);
        Ok(())
    }

    fn set_reminder_completed(
        &self,
        identifier: &str,
        completed: bool,
        commit: bool,
    ) -> Result<Reminder, StoreError> {
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::SetCompleted)?;

        let reminder = inner
            .working
            .reminders
            .iter_mut()
            .find(|r| r.identifier == identifier)
            .ok_or_else(|| StoreError::not_found(EntityKind::Reminder, identifier))?;
        reminder.is_completed = completed;
        reminder.completion_date = completed.then(Utc::now);
        let updated = reminder.clone();
        inner.persist(commit);
        Ok(updated)
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.take_failure(StoreOperation::Commit)?;
        inner.persist(true);
        inner.commit_count += 1;
        Ok(())
    }

    fn has_uncommitted_changes(&self) -> bool {
        self.lock().map(|inner| inner.dirty).unwrap_or(false)
    }
}

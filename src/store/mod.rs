//! The platform reminders store seam.
//!
//! [`ReminderStore`] abstracts over the platform's calendar/reminder
//! database. The production implementation is registered by the host
//! application through [`ffi_bridge`]; [`memory`] provides an in-process
//! store used by tests, the stdio host, and platforms without a native store.
//!
//! All methods are synchronous. The facade calls them from its store queue
//! (access requests from the blocking pool),
//! never from the main queue.

pub mod ffi_bridge;
pub mod memory;

use crate::error::StoreError;
use crate::model::{
    Calendar, CalendarItem, NewCalendar, NewReminder, PlatformAuthorization, Reminder,
};
use crate::predicate::ReminderPredicate;

pub use ffi_bridge::{
    UnregisteredReminderStore, global_reminder_store, register_reminder_store,
    registered_reminder_store,
};
pub use memory::{InMemoryReminderStore, StoreOperation};

/// Abstraction over the platform calendar/reminder store.
///
/// Mutating methods take `commit`: when `false` the change is staged and
/// only persisted by a later [`commit`](ReminderStore::commit).
pub trait ReminderStore: Send + Sync {
    /// Current permission state for reminder data.
    fn authorization_status(&self) -> PlatformAuthorization;

    /// Ask the user for access to reminders. Blocks until they answer.
    ///
    /// Returns `Ok(true)` when access was granted.
    fn request_access(&self) -> Result<bool, StoreError>;

    /// All calendars that hold reminders, in store order.
    fn calendars(&self) -> Result<Vec<Calendar>, StoreError>;

    /// Look up a reminder calendar by identifier.
    fn calendar(&self, identifier: &str) -> Result<Option<Calendar>, StoreError>;

    /// The user's default list for new reminders, if any.
    fn default_reminders_calendar(&self) -> Result<Option<Calendar>, StoreError>;

    /// Reminders satisfying `predicate`.
    fn reminders_matching(&self, predicate: &ReminderPredicate)
    -> Result<Vec<Reminder>, StoreError>;

    /// Look up any calendar item (reminder or event) by identifier.
    fn calendar_item(&self, identifier: &str) -> Result<Option<CalendarItem>, StoreError>;

    /// Save a new calendar and return the stored record.
    fn save_calendar(&self, calendar: &NewCalendar, commit: bool) -> Result<Calendar, StoreError>;

    /// Remove a calendar and the reminders it holds.
    fn remove_calendar(&self, identifier: &str, commit: bool) -> Result<(), StoreError>;

    /// Save a new reminder and return the stored record.
    fn save_reminder(&self, reminder: &NewReminder, commit: bool) -> Result<Reminder, StoreError>;

    /// Remove a reminder.
    fn remove_reminder(&self, identifier: &str, commit: bool) -> Result<(), StoreError>;

    /// Mark a reminder as completed or not completed.
    fn set_reminder_completed(
        &self,
        identifier: &str,
        completed: bool,
        commit: bool,
    ) -> Result<Reminder, StoreError>;

    /// Persist every staged change.
    fn commit(&self) -> Result<(), StoreError>;

    /// Whether staged changes are waiting for a commit.
    fn has_uncommitted_changes(&self) -> bool;
}

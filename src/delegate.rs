//! Delegate notifications from the reminders facade.

use crate::error::StoreError;
use crate::facade::ReminderFacade;
use crate::model::{AuthorizationStatus, Calendar, Reminder};

/// Observer of facade results.
///
/// Every hook is optional; the defaults do nothing. Hooks run on the main
/// queue, after the completion callback of the operation that caused them.
/// The facade holds its delegate weakly.
pub trait ReminderFacadeDelegate: Send + Sync {
    /// An authorization request finished with `status`.
    fn authorization_status_did_change(
        &self,
        _facade: &ReminderFacade,
        _status: AuthorizationStatus,
    ) {
    }

    /// Access to reminders was granted.
    fn did_authorize(&self, _facade: &ReminderFacade) {}

    /// Access to reminders was denied.
    fn did_deny(&self, _facade: &ReminderFacade) {}

    fn did_create_calendar(&self, _facade: &ReminderFacade, _result: &Result<Calendar, StoreError>) {
    }

    fn did_remove_calendar(
        &self,
        _facade: &ReminderFacade,
        _identifier: &str,
        _result: &Result<(), StoreError>,
    ) {
    }

    fn did_create_reminder(&self, _facade: &ReminderFacade, _result: &Result<Reminder, StoreError>) {
    }

    fn did_remove_reminder(
        &self,
        _facade: &ReminderFacade,
        _identifier: &str,
        _result: &Result<(), StoreError>,
    ) {
    }

    /// A reminder's completion state changed.
    fn did_update_reminder(&self, _facade: &ReminderFacade, _result: &Result<Reminder, StoreError>) {
    }
}

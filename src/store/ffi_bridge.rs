//! Process-wide registration of the platform reminders store.
//!
//! On macOS the host application registers an EventKit-backed
//! [`ReminderStore`] at startup via [`register_reminder_store`]. Until then
//! [`global_reminder_store`] hands out [`UnregisteredReminderStore`], whose
//! operations all fail with [`StoreError::PermissionDenied`] and a
//! diagnostic message instead of panicking.

use std::sync::{Arc, OnceLock, RwLock};

use super::ReminderStore;
use crate::error::StoreError;
use crate::model::{
    Calendar, CalendarItem, NewCalendar, NewReminder, PlatformAuthorization, Reminder,
};
use crate::predicate::ReminderPredicate;

const NOT_INITIALIZED: &str = "Reminders store not initialized. \
     The app must be running on macOS with Reminders permission granted.";

fn not_initialized() -> StoreError {
    StoreError::PermissionDenied(NOT_INITIALIZED.to_owned())
}

/// A placeholder [`ReminderStore`] used before the host registers a real one.
pub struct UnregisteredReminderStore;

impl ReminderStore for UnregisteredReminderStore {
    fn authorization_status(&self) -> PlatformAuthorization {
        PlatformAuthorization::Denied
    }

    fn request_access(&self) -> Result<bool, StoreError> {
        Err(not_initialized())
    }

    fn calendars(&self) -> Result<Vec<Calendar>, StoreError> {
        Err(not_initialized())
    }

    fn calendar(&self, _identifier: &str) -> Result<Option<Calendar>, StoreError> {
        Err(not_initialized())
    }

    fn default_reminders_calendar(&self) -> Result<Option<Calendar>, StoreError> {
        Err(not_initialized())
    }

    fn reminders_matching(
        &self,
        _predicate: &ReminderPredicate,
    ) -> Result<Vec<Reminder>, StoreError> {
        Err(not_initialized())
    }

    fn calendar_item(&self, _identifier: &str) -> Result<Option<CalendarItem>, StoreError> {
        Err(not_initialized())
    }

    fn save_calendar(
        &self,
        _calendar: &NewCalendar,
        _commit: bool,
    ) -> Result<Calendar, StoreError> {
        Err(not_initialized())
    }

    fn remove_calendar(&self, _identifier: &str, _commit: bool) -> Result<(), StoreError> {
        Err(not_initialized())
    }

    fn save_reminder(
        &self,
        _reminder: &NewReminder,
        _commit: bool,
    ) -> Result<Reminder, StoreError> {
        Err(not_initialized())
    }

    fn remove_reminder(&self, _identifier: &str, _commit: bool) -> Result<(), StoreError> {
        Err(not_initialized())
    }

    fn set_reminder_completed(
        &self,
        _identifier: &str,
        _completed: bool,
        _commit: bool,
    ) -> Result<Reminder, StoreError> {
        Err(not_initialized())
    }

    fn commit(&self) -> Result<(), StoreError> {
        Err(not_initialized())
    }

    fn has_uncommitted_changes(&self) -> bool {
        false
    }
}

fn registry() -> &'static RwLock<Option<Arc<dyn ReminderStore>>> {
    static REGISTRY: OnceLock<RwLock<Option<Arc<dyn ReminderStore>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(None))
}

/// Install the platform store for the rest of the process.
///
/// A later registration replaces the earlier one; facades already built keep
/// the store they were constructed with.
pub fn register_reminder_store(store: Arc<dyn ReminderStore>) {
    match registry().write() {
        Ok(mut slot) => {
            *slot = Some(store);
            tracing::info!("platform reminders store registered");
        }
        Err(_) => tracing::error!("reminders store registry lock poisoned; registration dropped"),
    }
}

/// The registered platform store, if any.
pub fn registered_reminder_store() -> Option<Arc<dyn ReminderStore>> {
    registry().read().ok().and_then(|slot| slot.clone())
}

/// Returns the registered platform store, or [`UnregisteredReminderStore`].
pub fn global_reminder_store() -> Arc<dyn ReminderStore> {
    registered_reminder_store().unwrap_or_else(|| Arc::new(UnregisteredReminderStore))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::model::ReminderPriority;
    use crate::store::InMemoryReminderStore;

    #[test]
    fn unregistered_store_denies_reads() {
        let store = UnregisteredReminderStore;
        assert_eq!(store.authorization_status(), PlatformAuthorization::Denied);
        let err = store.calendars().unwrap_err();
        assert!(err.to_string().contains("not initialized"), "got: {err}");
        assert!(store.request_access().is_err());
        assert!(
            store
                .reminders_matching(&ReminderPredicate::reminders(None))
                .is_err()
        );
    }

    #[test]
    fn unregistered_store_denies_writes() {
        let store = UnregisteredReminderStore;
        let new = NewReminder {
            title: "Test".to_owned(),
            calendar_id: "cal".to_owned(),
            start_date_components: None,
            due_date_components: None,
            priority: ReminderPriority::None,
            notes: None,
        };
        assert!(matches!(
            store.save_reminder(&new, true),
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(store.remove_calendar("cal", true).is_err());
        assert!(store.commit().is_err());
        assert!(!store.has_uncommitted_changes());
    }

    #[test]
    fn registered_store_is_returned_globally() {
        register_reminder_store(Arc::new(InMemoryReminderStore::with_default_calendar(
            "Reminders",
        )));
        assert!(registered_reminder_store().is_some());
        let store = global_reminder_store();
        let calendars = store.calendars().unwrap();
        assert_eq!(calendars.len(), 1);
        assert_eq!(calendars[0].title, "Reminders");
    }
}

//! The reminders store facade.
//!
//! [`ReminderFacade`] wraps one [`ReminderStore`] and republishes every
//! result on the main queue. Nothing blocks the caller. Results reach the
//! optional completion first, then the delegate.
//!
//! Store calls run on one serial store queue, in submission order. Access
//! requests wait on the user, so they run on the blocking pool instead.
//!
//! # Auto-commit
//!
//! Mutations persist immediately unless [`begin`](ReminderFacade::begin)
//! was called, in which case they are staged until
//! [`commit`](ReminderFacade::commit). The flag is sampled when an operation
//! is submitted, and a commit runs after every store call submitted before
//! it. This is not a transaction: there is no isolation and no rollback.
//!
//! # Lifetime
//!
//! Queued work holds a [`Weak`] reference to the facade. If the last
//! [`Arc`] is dropped before a job or its delivery runs, that step does
//! nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ReminderConfig;
use crate::delegate::ReminderFacadeDelegate;
use crate::dispatch::{Dispatcher, SerialQueue};
use crate::error::{EntityKind, Result, StoreError};
use crate::model::{
    AuthorizationStatus, Calendar, DateComponents, NewCalendar, NewReminder, Reminder,
    ReminderPriority,
};
use crate::predicate::ReminderPredicate;
use crate::store::ReminderStore;

/// One-shot result callback. Always invoked on the main queue.
pub type Completion<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Opaque handle to a pending fetch, usable with
/// [`cancel_fetch_request`](ReminderFacade::cancel_fetch_request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchToken(Uuid);

impl FetchToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for FetchToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Optional fields of a new reminder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderOptions {
    pub start_date_components: Option<DateComponents>,
    pub due_date_components: Option<DateComponents>,
    /// Defaults to [`ReminderPriority::None`].
    pub priority: Option<ReminderPriority>,
    pub notes: Option<String>,
}

/// Facade over the platform reminders store.
pub struct ReminderFacade {
    me: Weak<ReminderFacade>,
    store: Arc<dyn ReminderStore>,
    dispatcher: Dispatcher,
    auto_commit: AtomicBool,
    delegate: RwLock<Option<Weak<dyn ReminderFacadeDelegate>>>,
    pending_fetches: Mutex<HashMap<FetchToken, CancellationToken>>,
}

impl std::fmt::Debug for ReminderFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderFacade")
            .field("auto_commit", &self.is_auto_commit())
            .field("main_queue", self.dispatcher.main())
            .finish_non_exhaustive()
    }
}

impl ReminderFacade {
    /// Create a facade over `store` using `dispatcher` for its queues.
    pub fn new(store: Arc<dyn ReminderStore>, dispatcher: Dispatcher) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            store,
            dispatcher,
            auto_commit: AtomicBool::new(true),
            delegate: RwLock::new(None),
            pending_fetches: Mutex::new(HashMap::new()),
        })
    }

    /// Create a facade on the ambient tokio runtime, with a main queue named
    /// per `config`.
    ///
    /// # Errors
    ///
    /// Fails outside a tokio runtime or when the main queue thread cannot start.
    pub fn from_config(
        store: Arc<dyn ReminderStore>,
        config: &ReminderConfig,
    ) -> Result<Arc<Self>> {
        let dispatcher = Dispatcher::from_current(&config.dispatch.main_queue_name)?;
        Ok(Self::new(store, dispatcher))
    }

    /// The queue completions and delegate hooks run on.
    pub fn main_queue(&self) -> &SerialQueue {
        self.dispatcher.main()
    }

    // ─── Delegate ─────────────────────────────────────────────────────────────

    /// Install `delegate`, typically `Arc::downgrade(&delegate)`.
    ///
    /// Hooks stop firing once the last strong reference is dropped.
    pub fn set_delegate(&self, delegate: Weak<dyn ReminderFacadeDelegate>) {
        match self.delegate.write() {
            Ok(mut slot) => *slot = Some(delegate),
            Err(_) => warn!("delegate lock poisoned; delegate not installed"),
        }
    }

    /// Remove the delegate.
    pub fn clear_delegate(&self) {
        if let Ok(mut slot) = self.delegate.write() {
            *slot = None;
        }
    }

    fn delegate(&self) -> Option<Arc<dyn ReminderFacadeDelegate>> {
        self.delegate
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().and_then(Weak::upgrade))
    }

    // ─── Dispatch helpers ─────────────────────────────────────────────────────

    fn on_worker(&self, op: &'static str, job: impl FnOnce(&ReminderFacade) + Send + 'static) {
        let weak = self.me.clone();
        self.dispatcher.spawn_worker(move || match weak.upgrade() {
            Some(facade) => job(&facade),
            None => debug!(op, "facade dropped before worker job ran"),
        });
    }

    fn on_store(&self, op: &'static str, job: impl FnOnce(&ReminderFacade) + Send + 'static) {
        let weak = self.me.clone();
        let submitted = self.dispatcher.spawn_store_job(move || match weak.upgrade() {
            Some(facade) => job(&facade),
            None => debug!(op, "facade dropped before store job ran"),
        });
        if !submitted {
            warn!(
                op,
                queue = self.dispatcher.store().name(),
                "store queue closed; job dropped"
            );
        }
    }

    fn on_main(&self, op: &'static str, job: impl FnOnce(&ReminderFacade) + Send + 'static) {
        let weak = self.me.clone();
        let submitted = self.dispatcher.main().submit(move || match weak.upgrade() {
            Some(facade) => job(&facade),
            None => debug!(op, "facade dropped before delivery"),
        });
        if !submitted {
            warn!(
                op,
                queue = self.dispatcher.main().name(),
                "main queue closed; result dropped"
            );
        }
    }

    // ─── Authorization ────────────────────────────────────────────────────────

    /// Current authorization for reminder data. Synchronous, no side effects.
    pub fn authorization_status_for_reminders(&self) -> AuthorizationStatus {
        self.store.authorization_status().into()
    }

    /// Ask for access to reminders.
    ///
    /// Delivers the status to `completion`, then calls the delegate's
    /// `authorization_status_did_change` and exactly one of `did_authorize`
    /// or `did_deny`. A store failure counts as a denial.
    pub fn request_authorization_for_reminders(
        &self,
        completion: Option<Completion<AuthorizationStatus>>,
    ) {
        self.on_worker("request_authorization", move |facade| {
            let status = match facade.store.request_access() {
                Ok(true) => AuthorizationStatus::Authorized,
                Ok(false) => AuthorizationStatus::Denied,
                Err(e) => {
                    warn!(error = %e, "reminders access request failed");
                    AuthorizationStatus::Denied
                }
            };
            info!(%status, "reminders authorization resolved");

            facade.on_main("request_authorization", move |facade| {
                if let Some(completion) = completion {
                    completion(status);
                }
                if let Some(delegate) = facade.delegate() {
                    delegate.authorization_status_did_change(facade, status);
                    match status {
                        AuthorizationStatus::Authorized => delegate.did_authorize(facade),
                        AuthorizationStatus::Denied => delegate.did_deny(facade),
                    }
                }
            });
        });
    }

    // ─── Auto-commit ──────────────────────────────────────────────────────────

    /// Stage subsequent mutations until [`commit`](Self::commit).
    pub fn begin(&self) {
        self.auto_commit.store(false, Ordering::SeqCst);
        debug!("auto-commit disabled");
    }

    /// Return to persisting each mutation immediately.
    ///
    /// Already staged changes stay staged until the next commit.
    pub fn reset(&self) {
        self.auto_commit.store(true, Ordering::SeqCst);
        debug!("auto-commit restored");
    }

    /// Whether mutations currently persist immediately.
    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit.load(Ordering::SeqCst)
    }

    /// Restore auto-commit and persist every staged change.
    ///
    /// `completion` always fires: `Ok(())` on success, otherwise the store's
    /// error.
    pub fn commit(&self, completion: Option<Completion<std::result::Result<(), StoreError>>>) {
        self.reset();
        self.on_store("commit", move |facade| {
            let result = facade.store.commit();
            if let Err(ref e) = result {
                warn!(error = %e, "reminders store commit failed");
            }
            facade.on_main("commit", move |_| {
                if let Some(completion) = completion {
                    completion(result);
                }
            });
        });
    }

    // ─── Predicates ───────────────────────────────────────────────────────────

    /// Predicate for every reminder in `calendars` (all reminder calendars if `None`).
    pub fn predicate_for_reminders(&self, calendars: Option<&[Calendar]>) -> ReminderPredicate {
        ReminderPredicate::reminders(calendars)
    }

    /// Predicate for incomplete reminders due within `[due_start, due_end)`.
    pub fn predicate_for_incomplete_reminders(
        &self,
        due_start: Option<NaiveDateTime>,
        due_end: Option<NaiveDateTime>,
        calendars: Option<&[Calendar]>,
    ) -> ReminderPredicate {
        ReminderPredicate::incomplete(due_start, due_end, calendars)
    }

    /// Predicate for reminders completed within `[completion_start, completion_end)`.
    pub fn predicate_for_completed_reminders(
        &self,
        completion_start: Option<DateTime<Utc>>,
        completion_end: Option<DateTime<Utc>>,
        calendars: Option<&[Calendar]>,
    ) -> ReminderPredicate {
        ReminderPredicate::completed(completion_start, completion_end, calendars)
    }

    // ─── Fetch ────────────────────────────────────────────────────────────────

    /// Fetch every reminder calendar, sorted by title (case-sensitive, ascending).
    pub fn fetch_calendars_for_reminders(
        &self,
        completion: Option<Completion<std::result::Result<Vec<Calendar>, StoreError>>>,
    ) {
        self.on_store("fetch_calendars", move |facade| {
            let result = facade.store.calendars().map(|mut calendars| {
                calendars.sort_by(|a, b| a.title.cmp(&b.title));
                calendars
            });
            if let Err(ref e) = result {
                warn!(error = %e, "failed to fetch reminder calendars");
            }
            facade.on_main("fetch_calendars", move |_| {
                if let Some(completion) = completion {
                    completion(result);
                }
            });
        });
    }

    /// Fetch reminders matching `predicate`.
    ///
    /// `completion` receives an empty list when nothing matches or the store
    /// fails. It never fires if the returned token is cancelled first.
    pub fn fetch_reminders(
        &self,
        predicate: ReminderPredicate,
        completion: Option<Completion<Vec<Reminder>>>,
    ) -> FetchToken {
        let token = FetchToken::new();
        let cancel = CancellationToken::new();
        match self.pending_fetches.lock() {
            Ok(mut pending) => {
                pending.insert(token, cancel.clone());
            }
            Err(_) => warn!(%token, "pending fetch lock poisoned; fetch cannot be cancelled"),
        }

        self.on_store("fetch_reminders", move |facade| {
            if cancel.is_cancelled() {
                debug!(%token, "fetch cancelled before it ran");
                return;
            }
            let reminders = facade
                .store
                .reminders_matching(&predicate)
                .unwrap_or_else(|e| {
                    warn!(%token, error = %e, "reminder fetch failed; delivering empty result");
                    Vec::new()
                });

            facade.on_main("fetch_reminders", move |facade| {
                if !facade.finish_fetch(token) {
                    debug!(%token, "fetch cancelled before delivery");
                    return;
                }
                if let Some(completion) = completion {
                    completion(reminders);
                }
            });
        });
        token
    }

    /// Fetch every reminder in `calendars` (all reminder calendars if `None`).
    pub fn fetch_reminders_in_calendars(
        &self,
        calendars: Option<&[Calendar]>,
        completion: Option<Completion<Vec<Reminder>>>,
    ) -> FetchToken {
        self.fetch_reminders(self.predicate_for_reminders(calendars), completion)
    }

    /// Fetch incomplete reminders due within `[due_start, due_end)`.
    pub fn fetch_incomplete_reminders(
        &self,
        due_start: Option<NaiveDateTime>,
        due_end: Option<NaiveDateTime>,
        calendars: Option<&[Calendar]>,
        completion: Option<Completion<Vec<Reminder>>>,
    ) -> FetchToken {
        let predicate = self.predicate_for_incomplete_reminders(due_start, due_end, calendars);
        self.fetch_reminders(predicate, completion)
    }

    /// Fetch reminders completed within `[completion_start, completion_end)`.
    pub fn fetch_completed_reminders(
        &self,
        completion_start: Option<DateTime<Utc>>,
        completion_end: Option<DateTime<Utc>>,
        calendars: Option<&[Calendar]>,
        completion: Option<Completion<Vec<Reminder>>>,
    ) -> FetchToken {
        let predicate =
            self.predicate_for_completed_reminders(completion_start, completion_end, calendars);
        self.fetch_reminders(predicate, completion)
    }

    /// Cancel a pending fetch. No-op if it already delivered or is unknown.
    pub fn cancel_fetch_request(&self, token: FetchToken) {
        let cancel = self
            .pending_fetches
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&token));
        match cancel {
            Some(cancel) => {
                cancel.cancel();
                debug!(%token, "fetch cancelled");
            }
            None => debug!(%token, "cancel for a fetch that is no longer pending"),
        }
    }

    /// Drop the pending entry for `token`. Returns `false` if it was cancelled.
    fn finish_fetch(&self, token: FetchToken) -> bool {
        self.pending_fetches
            .lock()
            .map(|mut pending| pending.remove(&token).is_some())
            .unwrap_or(true)
    }

    // ─── Calendars ────────────────────────────────────────────────────────────

    /// Create a reminder calendar titled `title` in the source of the
    /// store's default reminders calendar.
    pub fn create_calendar_for_reminders(
        &self,
        title: &str,
        completion: Option<Completion<std::result::Result<Calendar, StoreError>>>,
    ) {
        let title = title.to_owned();
        let commit = self.is_auto_commit();
        self.on_store("create_calendar", move |facade| {
            let result = facade
                .store
                .default_reminders_calendar()
                .and_then(|default| default.ok_or(StoreError::NoDefaultSource))
                .and_then(|default| {
                    let calendar = NewCalendar {
                        title,
                        source: default.source,
                    };
                    facade.store.save_calendar(&calendar, commit)
                });
            match result {
                Ok(ref calendar) => {
                    info!(identifier = %calendar.identifier, commit, "reminder calendar created")
                }
                Err(ref e) => warn!(error = %e, "failed to create reminder calendar"),
            }

            facade.on_main("create_calendar", move |facade| {
                let delegate = facade.delegate();
                if let Some(completion) = completion {
                    completion(result.clone());
                }
                if let Some(delegate) = delegate {
                    delegate.did_create_calendar(facade, &result);
                }
            });
        });
    }

    /// Remove the reminder calendar with `identifier`.
    ///
    /// An unknown identifier yields [`StoreError::NotFound`], delivered like
    /// any other result.
    pub fn remove_calendar(
        &self,
        identifier: &str,
        completion: Option<Completion<std::result::Result<(), StoreError>>>,
    ) {
        let identifier = identifier.to_owned();
        let commit = self.is_auto_commit();
        self.on_store("remove_calendar", move |facade| {
            let result = facade.store.calendar(&identifier).and_then(|found| match found {
                Some(_) => facade.store.remove_calendar(&identifier, commit),
                None => Err(StoreError::not_found(EntityKind::Calendar, identifier.clone())),
            });
            match result {
                Ok(()) => info!(identifier = %identifier, commit, "reminder calendar removed"),
                Err(ref e) => warn!(identifier = %identifier, error = %e, "failed to remove reminder calendar"),
            }

            facade.on_main("remove_calendar", move |facade| {
                let delegate = facade.delegate();
                if let Some(completion) = completion {
                    completion(result.clone());
                }
                if let Some(delegate) = delegate {
                    delegate.did_remove_calendar(facade, &identifier, &result);
                }
            });
        });
    }

    // ─── Reminders ────────────────────────────────────────────────────────────

    /// Create a reminder titled `title` in `calendar`.
    pub fn create_reminder(
        &self,
        title: &str,
        calendar: &Calendar,
        options: ReminderOptions,
        completion: Option<Completion<std::result::Result<Reminder, StoreError>>>,
    ) {
        let reminder = NewReminder {
            title: title.to_owned(),
            calendar_id: calendar.identifier.clone(),
            start_date_components: options.start_date_components,
            due_date_components: options.due_date_components,
            priority: options.priority.unwrap_or_default(),
            notes: options.notes,
        };
        let commit = self.is_auto_commit();
        self.on_store("create_reminder", move |facade| {
            let result = facade.store.save_reminder(&reminder, commit);
            match result {
                Ok(ref saved) => info!(
                    identifier = %saved.identifier,
                    priority = %saved.priority,
                    commit,
                    "reminder created"
                ),
                Err(ref e) => warn!(error = %e, "failed to create reminder"),
            }

            facade.on_main("create_reminder", move |facade| {
                let delegate = facade.delegate();
                if let Some(completion) = completion {
                    completion(result.clone());
                }
                if let Some(delegate) = delegate {
                    delegate.did_create_reminder(facade, &result);
                }
            });
        });
    }

    /// Remove the reminder with `identifier`.
    ///
    /// The identifier must resolve to a reminder; unknown identifiers and
    /// non-reminder items yield [`StoreError::NotFound`].
    pub fn remove_reminder(
        &self,
        identifier: &str,
        completion: Option<Completion<std::result::Result<(), StoreError>>>,
    ) {
        let identifier = identifier.to_owned();
        let commit = self.is_auto_commit();
        self.on_store("remove_reminder", move |facade| {
            let result = facade
                .store
                .calendar_item(&identifier)
                .and_then(|item| match item.and_then(|i| i.into_reminder()) {
                    Some(_) => facade.store.remove_reminder(&identifier, commit),
                    None => Err(StoreError::not_found(EntityKind::Reminder, identifier.clone())),
                });
            match result {
                Ok(()) => info!(identifier = %identifier, commit, "reminder removed"),
                Err(ref e) => warn!(identifier = %identifier, error = %e, "failed to remove reminder"),
            }

            facade.on_main("remove_reminder", move |facade| {
                let delegate = facade.delegate();
                if let Some(completion) = completion {
                    completion(result.clone());
                }
                if let Some(delegate) = delegate {
                    delegate.did_remove_reminder(facade, &identifier, &result);
                }
            });
        });
    }

    /// Mark the reminder with `identifier` as completed or not completed.
    pub fn set_reminder_completed(
        &self,
        identifier: &str,
        completed: bool,
        completion: Option<Completion<std::result::Result<Reminder, StoreError>>>,
    ) {
        let identifier = identifier.to_owned();
        let commit = self.is_auto_commit();
        self.on_store("set_reminder_completed", move |facade| {
            let result = facade
                .store
                .set_reminder_completed(&identifier, completed, commit);
            if let Err(ref e) = result {
                warn!(identifier = %identifier, error = %e, "failed to update reminder");
            }

            facade.on_main("set_reminder_completed", move |facade| {
                let delegate = facade.delegate();
                if let Some(completion) = completion {
                    completion(result.clone());
                }
                if let Some(delegate) = delegate {
                    delegate.did_update_reminder(facade, &result);
                }
            });
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::store::{InMemoryReminderStore, StoreOperation};
    use std::time::Duration;
    use tokio::sync::oneshot;

    const WAIT: Duration = Duration::from_secs(5);

    fn completion<T: Send + 'static>() -> (Completion<T>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let completion: Completion<T> = Box::new(move |value| {
            let _ = tx.send(value);
        });
        (completion, rx)
    }

    async fn recv<T>(rx: oneshot::Receiver<T>) -> T {
        tokio::time::timeout(WAIT, rx)
            .await
            .expect("timed out waiting for completion")
            .expect("completion dropped")
    }

    /// Wait until every job queued on `queue` so far has run.
    async fn drain(queue: &SerialQueue) {
        let (tx, rx) = oneshot::channel();
        queue.submit(move || {
            let _ = tx.send(());
        });
        recv(rx).await;
    }

    fn setup(name: &str) -> (Arc<InMemoryReminderStore>, Arc<ReminderFacade>) {
        let store = Arc::new(InMemoryReminderStore::with_default_calendar("Reminders"));
        let dispatcher = Dispatcher::from_current(name).unwrap();
        let facade = ReminderFacade::new(store.clone(), dispatcher);
        (store, facade)
    }

    #[tokio::test]
    async fn completions_run_on_the_main_queue() {
        let (_store, facade) = setup("facade-main-thread");
        let main = facade.main_queue().clone();
        let (tx, rx) = oneshot::channel();
        facade.fetch_calendars_for_reminders(Some(Box::new(move |_| {
            let _ = tx.send(main.is_current());
        })));
        assert!(recv(rx).await);
    }

    #[tokio::test]
    async fn calendars_are_sorted_by_title() {
        let (store, facade) = setup("facade-sort");
        let source = store.default_reminders_calendar().unwrap().unwrap().source;
        for title in ["zebra", "Apple", "mango", "Banana"] {
            store.seed_calendar(Calendar {
                identifier: format!("cal-{title}"),
                title: title.to_owned(),
                source: source.clone(),
            });
        }

        let (done, rx) = completion();
        facade.fetch_calendars_for_reminders(Some(done));
        let titles: Vec<String> = recv(rx).await.unwrap().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, ["Apple", "Banana", "Reminders", "mango", "zebra"]);
    }

    #[tokio::test]
    async fn calendar_fetch_failure_is_delivered() {
        let (store, facade) = setup("facade-cal-fail");
        store.fail_next(StoreOperation::Calendars, "offline");
        let (done, rx) = completion();
        facade.fetch_calendars_for_reminders(Some(done));
        assert_eq!(recv(rx).await, Err(StoreError::Backend("offline".to_owned())));
    }

    #[tokio::test]
    async fn failed_reminder_fetch_yields_empty_list() {
        let (store, facade) = setup("facade-fetch-fail");
        store.fail_next(StoreOperation::Reminders, "offline");
        let (done, rx) = completion();
        facade.fetch_reminders_in_calendars(None, Some(done));
        assert!(recv(rx).await.is_empty());
    }

    #[tokio::test]
    async fn begin_defers_commit_until_commit_is_called() {
        let (store, facade) = setup("facade-begin");
        facade.begin();
        assert!(!facade.is_auto_commit());

        let (done, rx) = completion();
        facade.create_calendar_for_reminders("Groceries", Some(done));
        let created = recv(rx).await.unwrap();

        assert_eq!(store.commit_count(), 0);
        assert!(store.has_uncommitted_changes());
        assert!(!store.committed_calendars().contains(&created));

        let (done, rx) = completion();
        facade.commit(Some(done));
        assert!(facade.is_auto_commit());
        recv(rx).await.unwrap();

        assert_eq!(store.commit_count(), 1);
        assert!(store.committed_calendars().contains(&created));
    }

    #[tokio::test]
    async fn reset_restores_auto_commit_without_committing() {
        let (store, facade) = setup("facade-reset");
        facade.begin();
        facade.reset();
        assert!(facade.is_auto_commit());

        let (done, rx) = completion();
        facade.create_calendar_for_reminders("Errands", Some(done));
        let created = recv(rx).await.unwrap();
        assert!(store.committed_calendars().contains(&created));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn commit_failure_reaches_completion() {
        let (store, facade) = setup("facade-commit-fail");
        store.fail_next(StoreOperation::Commit, "quota exceeded");
        let (done, rx) = completion();
        facade.commit(Some(done));
        let err = recv(rx).await.unwrap_err();
        assert_eq!(err, StoreError::Backend("quota exceeded".to_owned()));
        assert!(facade.is_auto_commit());
    }

    #[tokio::test]
    async fn create_calendar_without_default_source_fails() {
        let (store, facade) = setup("facade-no-source");
        store.set_default_calendar(None);
        let (done, rx) = completion();
        facade.create_calendar_for_reminders("Orphan", Some(done));
        assert_eq!(recv(rx).await, Err(StoreError::NoDefaultSource));
    }

    #[tokio::test]
    async fn new_calendar_takes_default_source() {
        let (store, facade) = setup("facade-source");
        let default = store.default_reminders_calendar().unwrap().unwrap();
        let (done, rx) = completion();
        facade.create_calendar_for_reminders("Work", Some(done));
        let created = recv(rx).await.unwrap();
        assert_eq!(created.title, "Work");
        assert_eq!(created.source, default.source);
    }

    #[tokio::test]
    async fn remove_unknown_calendar_reports_identifier() {
        let (_store, facade) = setup("facade-remove-missing");
        let main = facade.main_queue().clone();
        let (tx, rx) = oneshot::channel();
        facade.remove_calendar(
            "nonexistent-id",
            Some(Box::new(move |result| {
                let _ = tx.send((result, main.is_current()));
            })),
        );
        let (result, on_main) = recv(rx).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("nonexistent-id"));
        assert_eq!(err.domain(), Some(crate::error::NOT_FOUND_DOMAIN));
        assert!(on_main);
    }

    #[tokio::test]
    async fn remove_reminder_rejects_event_items() {
        let (store, facade) = setup("facade-remove-event");
        let cal = store.default_reminders_calendar().unwrap().unwrap();
        store.seed_event(crate::model::EventItem {
            identifier: "evt-1".to_owned(),
            calendar_id: cal.identifier,
            title: "Standup".to_owned(),
        });
        let (done, rx) = completion();
        facade.remove_reminder("evt-1", Some(done));
        assert!(matches!(
            recv(rx).await,
            Err(StoreError::NotFound {
                kind: EntityKind::Reminder,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn created_reminder_defaults_to_no_priority() {
        let (store, facade) = setup("facade-default-priority");
        let cal = store.default_reminders_calendar().unwrap().unwrap();
        let (done, rx) = completion();
        facade.create_reminder("Call mum", &cal, ReminderOptions::default(), Some(done));
        let created = recv(rx).await.unwrap();
        assert_eq!(created.priority, ReminderPriority::None);
        assert_eq!(created.priority.ordinal(), 0);
    }

    #[tokio::test]
    async fn cancelled_fetch_never_completes() {
        let (_store, facade) = setup("facade-cancel");
        let main = facade.main_queue().clone();

        // Hold the main queue so delivery cannot run before the cancel.
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        main.submit(move || {
            let _ = release_rx.recv_timeout(WAIT);
        });

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let token = facade.fetch_reminders_in_calendars(
            None,
            Some(Box::new(move |_| flag.store(true, Ordering::SeqCst))),
        );
        facade.cancel_fetch_request(token);
        release_tx.send(()).unwrap();

        // Give the worker time to finish, then flush the queue.
        tokio::time::sleep(Duration::from_millis(50)).await;
        drain(&main).await;
        assert!(!fired.load(Ordering::SeqCst));

        // Cancelling again, or after the fact, is harmless.
        facade.cancel_fetch_request(token);
    }

    #[tokio::test]
    async fn cancel_after_delivery_is_a_noop() {
        let (_store, facade) = setup("facade-cancel-late");
        let (done, rx) = completion();
        let token = facade.fetch_reminders_in_calendars(None, Some(done));
        assert!(recv(rx).await.is_empty());
        facade.cancel_fetch_request(token);
        assert!(facade.pending_fetches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_facade_skips_pending_delivery() {
        let (_store, facade) = setup("facade-dropped");
        let main = facade.main_queue().clone();

        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        main.submit(move || {
            let _ = release_rx.recv_timeout(WAIT);
        });

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        facade.fetch_calendars_for_reminders(Some(Box::new(move |_| {
            flag.store(true, Ordering::SeqCst)
        })));

        let weak = Arc::downgrade(&facade);
        drop(facade);
        while weak.strong_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        release_tx.send(()).unwrap();
        drain(&main).await;

        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn delegate_is_held_weakly() {
        struct Counter(AtomicBool);
        impl ReminderFacadeDelegate for Counter {
            fn did_create_calendar(
                &self,
                _facade: &ReminderFacade,
                _result: &std::result::Result<Calendar, StoreError>,
            ) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let (_store, facade) = setup("facade-weak-delegate");
        let delegate = Arc::new(Counter(AtomicBool::new(false)));
        let weak = Arc::downgrade(&delegate);
        facade.set_delegate(weak);
        assert_eq!(Arc::strong_count(&delegate), 1);

        let (done, rx) = completion();
        facade.create_calendar_for_reminders("Seen", Some(done));
        recv(rx).await.unwrap();
        drain(facade.main_queue()).await;
        assert!(delegate.0.load(Ordering::SeqCst));

        drop(delegate);
        let (done, rx) = completion();
        facade.create_calendar_for_reminders("Unseen", Some(done));
        assert!(recv(rx).await.is_ok());
    }

    #[tokio::test]
    async fn trait_object_delegate_can_be_installed() {
        struct Flag(AtomicBool);
        impl ReminderFacadeDelegate for Flag {
            fn did_update_reminder(
                &self,
                _facade: &ReminderFacade,
                _result: &std::result::Result<Reminder, StoreError>,
            ) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let (_store, facade) = setup("facade-dyn-delegate");
        let flag = Arc::new(Flag(AtomicBool::new(false)));
        let delegate: Arc<dyn ReminderFacadeDelegate> = flag.clone();
        facade.set_delegate(Arc::downgrade(&delegate));

        let (done, rx) = completion();
        facade.set_reminder_completed("missing", true, Some(done));
        assert!(recv(rx).await.is_err());
        drain(facade.main_queue()).await;
        assert!(flag.0.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn authorization_status_folds_platform_states() {
        use crate::model::PlatformAuthorization;

        let (store, facade) = setup("facade-auth-status");
        for (platform, expected) in [
            (PlatformAuthorization::NotDetermined, AuthorizationStatus::Denied),
            (PlatformAuthorization::Restricted, AuthorizationStatus::Denied),
            (PlatformAuthorization::Denied, AuthorizationStatus::Denied),
            (PlatformAuthorization::Authorized, AuthorizationStatus::Authorized),
        ] {
            store.set_authorization(platform);
            assert_eq!(facade.authorization_status_for_reminders(), expected);
        }
    }

    #[tokio::test]
    async fn fetch_in_calendars_only_returns_their_reminders() {
        let (store, facade) = setup("facade-fetch-calendars");
        let home = store.default_reminders_calendar().unwrap().unwrap();
        let work = Calendar {
            identifier: "cal-work".to_owned(),
            title: "Work".to_owned(),
            source: home.source.clone(),
        };
        store.seed_calendar(work.clone());
        for (id, calendar) in [("r-1", &home), ("r-2", &work), ("r-3", &work)] {
            store.seed_reminder(Reminder {
                identifier: id.to_owned(),
                calendar_id: calendar.identifier.clone(),
                title: format!("Task {id}"),
                start_date_components: None,
                due_date_components: None,
                priority: ReminderPriority::Low,
                notes: None,
                is_completed: false,
                completion_date: None,
            });
        }

        let (done, rx) = completion();
        facade.fetch_reminders_in_calendars(Some(std::slice::from_ref(&work)), Some(done));
        let mut ids: Vec<String> = recv(rx).await.into_iter().map(|r| r.identifier).collect();
        ids.sort();
        assert_eq!(ids, ["r-2", "r-3"]);

        let (done, rx) = completion();
        facade.fetch_reminders_in_calendars(None, Some(done));
        assert_eq!(recv(rx).await.len(), 3);
    }

    #[tokio::test]
    async fn fetch_without_completion_clears_its_token() {
        let (_store, facade) = setup("facade-fetch-no-completion");
        let token = facade.fetch_reminders_in_calendars(None, None);

        // The store queue is FIFO, so a later fetch finishing means the first
        // one has delivered too.
        let (done, rx) = completion();
        facade.fetch_calendars_for_reminders(Some(done));
        recv(rx).await.unwrap();
        drain(facade.main_queue()).await;

        assert!(!facade.pending_fetches.lock().unwrap().contains_key(&token));
        facade.fetch_calendars_for_reminders(None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn store_calls_reach_the_store_in_submission_order() {
        let (store, facade) = setup("facade-store-order");
        let calendar = store.default_reminders_calendar().unwrap().unwrap();

        facade.create_reminder("First", &calendar, ReminderOptions::default(), None);
        let (done, rx) = completion();
        facade.fetch_reminders_in_calendars(None, Some(done));
        let titles: Vec<String> = recv(rx).await.into_iter().map(|r| r.title).collect();
        assert_eq!(titles, ["First"]);
        assert!(facade.dispatcher.store().name().ends_with("-store"));
    }
}

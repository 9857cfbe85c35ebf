//! fae-reminders: a facade over the platform reminders store.
//!
//! The crate wraps a [`ReminderStore`] (EventKit on macOS, registered by the
//! host app; an in-memory store elsewhere) and exposes authorization,
//! predicate construction, asynchronous fetch, and create/remove operations
//! for reminder calendars and reminders.
//!
//! # Architecture
//!
//! - **Store seam**: [`store::ReminderStore`] with the in-memory and
//!   unregistered implementations
//! - **Dispatch**: store calls run on tokio's blocking pool; results are
//!   delivered on a single named main-queue thread ([`dispatch`])
//! - **Facade**: [`ReminderFacade`] forwards results to completion callbacks
//!   and an optional weakly-held [`ReminderFacadeDelegate`]
//! - **Host**: a newline-delimited JSON bridge over stdin/stdout ([`host`])

pub mod config;
pub mod delegate;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod host;
pub mod model;
pub mod predicate;
pub mod store;

pub use config::ReminderConfig;
pub use delegate::ReminderFacadeDelegate;
pub use dispatch::{Dispatcher, SerialQueue};
pub use error::{ReminderError, Result, StoreError};
pub use facade::{Completion, FetchToken, ReminderFacade, ReminderOptions};
pub use model::{AuthorizationStatus, Calendar, DateComponents, Reminder, ReminderPriority};
pub use predicate::ReminderPredicate;
pub use store::{InMemoryReminderStore, ReminderStore};

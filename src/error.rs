//! Error types for the reminders facade.

use std::fmt;

/// Error domain attached to locally synthesized "not found" errors.
pub const NOT_FOUND_DOMAIN: &str = "com.saorsalabs.fae.reminders";

/// Error code attached to locally synthesized "not found" errors.
pub const NOT_FOUND_CODE: i32 = 404;

/// Kind of entity a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A reminder calendar (list).
    Calendar,
    /// A reminder item.
    Reminder,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Calendar => f.write_str("calendar"),
            EntityKind::Reminder => f.write_str("reminder"),
        }
    }
}

/// Error reported by a [`ReminderStore`] operation or synthesized by the facade.
///
/// Delivered to both the completion callback and the delegate, so it is
/// `Clone`.
///
/// [`ReminderStore`]: crate::store::ReminderStore
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No entity with the given identifier exists.
    #[error("{kind} with identifier {identifier:?} was not found")]
    NotFound {
        /// What was being looked up.
        kind: EntityKind,
        /// The identifier that failed to resolve.
        identifier: String,
    },

    /// Reminders permission not granted, or the store is not initialized.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The store has no default reminders calendar to take a source from.
    #[error("no default reminders calendar is configured")]
    NoDefaultSource,

    /// Invalid input supplied by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected error from the underlying store, forwarded verbatim.
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Build the "not found" error for a missing entity.
    pub fn not_found(kind: EntityKind, identifier: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            identifier: identifier.into(),
        }
    }

    /// Error domain, for errors synthesized by this crate.
    pub fn domain(&self) -> Option<&'static str> {
        match self {
            StoreError::NotFound { .. } => Some(NOT_FOUND_DOMAIN),
            _ => None,
        }
    }

    /// Error code, for errors synthesized by this crate.
    pub fn code(&self) -> Option<i32> {
        match self {
            StoreError::NotFound { .. } => Some(NOT_FOUND_CODE),
            _ => None,
        }
    }
}

/// Top-level error type for configuration, I/O and host plumbing.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Dispatch (runtime or queue thread) error.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Host protocol error.
    #[error("host error: {0}")]
    Host(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ReminderError>;

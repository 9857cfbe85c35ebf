//! Queues the facade runs work on.
//!
//! Store calls go to a serial store queue, so reads, mutations and commits
//! reach the store in submission order. Access requests, which block on the
//! user, go to tokio's blocking pool instead, reached through a captured
//! [`Handle`] so callers on any thread can submit work. Results are delivered
//! on the main queue; every completion callback and delegate notification
//! runs there, one at a time, in submission order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::ThreadId;

use crossbeam_channel::Sender;
use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::error::{ReminderError, Result};

/// Default name of the main queue thread.
pub const DEFAULT_MAIN_QUEUE_NAME: &str = "fae-reminders-main";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A FIFO job queue drained by one dedicated, named thread.
///
/// Cloning is cheap. The backing thread exits once every clone is dropped
/// and the queued jobs have run.
#[derive(Clone)]
pub struct SerialQueue {
    tx: Sender<Job>,
    thread_id: ThreadId,
    name: Arc<str>,
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SerialQueue {
    /// Start a queue on a new thread called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let thread_name = name.to_owned();
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                for job in rx.iter() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!(queue = %thread_name, "queued job panicked");
                    }
                }
                debug!(queue = %thread_name, "queue closed");
            })?;

        Ok(Self {
            tx,
            thread_id: handle.thread().id(),
            name: Arc::from(name),
        })
    }

    /// Queue `job` for execution on this queue's thread.
    ///
    /// Returns `false` if the queue thread is gone.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }

    /// Whether the calling thread is this queue's thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Thread name of the queue.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Routes store work to the store queue or worker pool and results to the
/// main queue.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    runtime: Handle,
    store: SerialQueue,
    main: SerialQueue,
}

impl Dispatcher {
    /// Build a dispatcher from an explicit runtime handle and queues.
    pub fn new(runtime: Handle, store: SerialQueue, main: SerialQueue) -> Self {
        Self {
            runtime,
            store,
            main,
        }
    }

    /// Build a dispatcher on the ambient tokio runtime, with a fresh main
    /// queue thread called `main_queue_name` and a store queue thread called
    /// `<main_queue_name>-store`.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Dispatch`] when called outside a tokio
    /// runtime, or an I/O error if a queue thread cannot start.
    pub fn from_current(main_queue_name: &str) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ReminderError::Dispatch(format!("no tokio runtime for the worker pool: {e}"))
        })?;
        let store = SerialQueue::spawn(&format!("{main_queue_name}-store"))?;
        Ok(Self::new(runtime, store, SerialQueue::spawn(main_queue_name)?))
    }

    /// Run `job` on the worker pool, concurrently with everything else.
    pub fn spawn_worker(&self, job: impl FnOnce() + Send + 'static) {
        // Fire and forget; results come back through the main queue.
        drop(self.runtime.spawn_blocking(job));
    }

    /// Run `job` on the store queue, after every store job submitted before it.
    ///
    /// Returns `false` if the store queue thread is gone.
    pub fn spawn_store_job(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.store.submit(job)
    }

    /// The queue store calls run on.
    pub fn store(&self) -> &SerialQueue {
        &self.store
    }

    /// The main queue results are delivered on.
    pub fn main(&self) -> &SerialQueue {
        &self.main
    }
}

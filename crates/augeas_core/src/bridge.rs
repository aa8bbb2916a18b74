//! Asynchronous persistence bridge.
//!
//! Saving can take long enough to stall a host event loop, so the host may
//! hand a session to the bridge instead of calling [`Augeas::save`]. The
//! session moves to a worker thread, the blocking save runs there, and the
//! session comes back to the host through a completion queue together with
//! the result. Callbacks run only on the thread that drives the queue with
//! [`PersistBridge::run_pending`] or [`PersistBridge::run_until_idle`].
//!
//! ```text
//! submit() ──> Queued ──> Running ──> Completing ──> Idle
//!   host        worker      worker      queue         host (callback)
//! ```
//!
//! While an item is in flight the session is owned by the bridge, so no
//! other operation can reach the handle until the callback returns it.

use crate::engine::Engine;
use crate::error::{AugError, AugResult};
use crate::session::Augeas;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Name given to worker threads.
pub const WORKER_NAME: &str = "augeas-save";

/// How often [`PersistBridge::run_until_idle`] re-checks the in-flight count.
const IDLE_POLL: Duration = Duration::from_millis(50);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Callback receiving the session back together with the save result.
pub type SaveCallback<E> = Box<dyn FnOnce(Augeas<E>, AugResult<()>) + Send>;

/// State of one save work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SaveState {
    /// No work pending; the callback has run.
    Idle = 0,
    /// Submitted, waiting for the worker to pick it up.
    Queued = 1,
    /// The worker is saving.
    Running = 2,
    /// Saved; waiting for the host to run the callback.
    Completing = 3,
}

impl SaveState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SaveState::Queued,
            2 => SaveState::Running,
            3 => SaveState::Completing,
            _ => SaveState::Idle,
        }
    }

    /// Returns true while the item has not been delivered.
    pub fn is_pending(self) -> bool {
        self != SaveState::Idle
    }
}

/// Handle on a submitted save.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    id: u64,
    state: Arc<AtomicU8>,
}

impl SaveTicket {
    /// Identifier of the work item.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state of the work item.
    pub fn state(&self) -> SaveState {
        SaveState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// A save could not be submitted. The session is handed back untouched.
pub struct SubmitError<E: Engine> {
    /// The session that was to be saved.
    pub session: Augeas<E>,
    /// Why the worker could not be started.
    pub error: io::Error,
}

impl<E: Engine> fmt::Debug for SubmitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> fmt::Display for SubmitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot start save worker: {}", self.error)
    }
}

impl<E: Engine> std::error::Error for SubmitError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

struct Completion<E: Engine> {
    id: u64,
    session: Augeas<E>,
    result: AugResult<()>,
}

struct Pending<E: Engine> {
    state: Arc<AtomicU8>,
    callback: SaveCallback<E>,
}

/// Completion queue shared by every session of one host event loop.
pub struct PersistBridge<E: Engine + 'static> {
    sender: Sender<Completion<E>>,
    receiver: Receiver<Completion<E>>,
    pending: Mutex<HashMap<u64, Pending<E>>>,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
}

impl<E: Engine + 'static> Default for PersistBridge<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine + 'static> PersistBridge<E> {
    /// Creates an empty bridge.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Number of submitted saves whose callback has not run yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Moves `session` to a worker thread and saves it there.
    ///
    /// `callback` runs later on the thread that calls
    /// [`PersistBridge::run_pending`], receiving the session back with the
    /// save result. Returns immediately.
    pub fn submit<F>(&self, session: Augeas<E>, callback: F) -> Result<SaveTicket, SubmitError<E>>
    where
        F: FnOnce(Augeas<E>, AugResult<()>) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(AtomicU8::new(SaveState::Queued as u8));

        // The session reaches the worker only once it is known to be running.
        let (handoff, inbox) = crossbeam_channel::bounded::<Augeas<E>>(1);
        let sender = self.sender.clone();
        let worker_state = Arc::clone(&state);
        let spawned = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let Ok(mut session) = inbox.recv() else {
                    return;
                };
                worker_state.store(SaveState::Running as u8, Ordering::Release);
                debug!("Save {id} running");
                // The completion must be posted even if the engine panics,
                // or the item would stay in flight forever.
                let result = panic::catch_unwind(AssertUnwindSafe(|| session.save()))
                    .unwrap_or_else(|payload| {
                        Err(AugError::SavePanicked {
                            message: panic_message(payload.as_ref()),
                        })
                    });
                worker_state.store(SaveState::Completing as u8, Ordering::Release);
                debug!("Save {id} finished, ok={}", result.is_ok());
                // A dropped bridge drops the session with the completion.
                let _ = sender.send(Completion {
                    id,
                    session,
                    result,
                });
            });

        if let Err(error) = spawned {
            return Err(SubmitError { session, error });
        }

        self.pending.lock().insert(
            id,
            Pending {
                state: Arc::clone(&state),
                callback: Box::new(callback),
            },
        );
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        if let Err(returned) = handoff.send(session) {
            self.pending.lock().remove(&id);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(SubmitError {
                session: returned.into_inner(),
                error: io::Error::other("save worker exited before start"),
            });
        }

        debug!("Save {id} queued");
        Ok(SaveTicket { id, state })
    }

    /// Runs the callbacks of every save that has finished, without blocking.
    ///
    /// Returns the number of callbacks run. A panicking callback propagates
    /// after its item has been retired.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(completion) = self.receiver.try_recv() {
            self.dispatch(completion);
            ran += 1;
        }
        ran
    }

    /// Runs callbacks until no save is in flight.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = self.run_pending();
        while self.in_flight() > 0 {
            match self.receiver.recv_timeout(IDLE_POLL) {
                Ok(completion) => {
                    self.dispatch(completion);
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        ran
    }

    fn dispatch(&self, completion: Completion<E>) {
        let Completion {
            id,
            session,
            result,
        } = completion;
        let entry = self.pending.lock().remove(&id);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(Pending { state, callback }) = entry {
            state.store(SaveState::Idle as u8, Ordering::Release);
            debug!("Save {id} delivered");
            callback(session, result);
        }
    }
}

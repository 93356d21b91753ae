//! Ownership slot for the running engine.
//!
//! At most one engine runs per `EngineHandle`. The slot moves through
//! `Stopped -> Starting -> Running -> Stopped`, and every transition swaps
//! the whole state under one lock, so readers observe either a complete
//! `EngineSession` or nothing at all.

use crate::dispatcher::EventDispatcher;
use crate::frontend::InputContextId;
use crate::instance::InstanceId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;

/// Panel state published by the event thread for host threads.
///
/// `empty` is refreshed after every frontend command. `host_callback` is the
/// sequence number of the host callback the event thread is currently
/// inside, 0 when none.
#[derive(Debug)]
pub struct PanelStatus {
    empty: AtomicBool,
    host_callback: AtomicU64,
    next_callback: AtomicU64,
}

impl PanelStatus {
    pub fn new() -> Self {
        Self {
            empty: AtomicBool::new(true),
            host_callback: AtomicU64::new(0),
            next_callback: AtomicU64::new(1),
        }
    }

    /// Panel state as of the last completed frontend command.
    pub fn is_empty(&self) -> bool {
        self.empty.load(Ordering::Acquire)
    }

    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::Release);
    }

    /// Mark the event thread as inside a host callback.
    pub fn enter_host_callback(&self) -> u64 {
        let seq = self.next_callback.fetch_add(1, Ordering::Relaxed);
        self.host_callback.store(seq, Ordering::Release);
        seq
    }

    pub fn leave_host_callback(&self) {
        self.host_callback.store(0, Ordering::Release);
    }

    /// The host callback in progress, if any.
    pub fn host_callback(&self) -> Option<u64> {
        match self.host_callback.load(Ordering::Acquire) {
            0 => None,
            seq => Some(seq),
        }
    }
}

impl Default for PanelStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a host call needs to reach the running engine.
pub struct EngineSession<E> {
    /// The run that owns the engine state.
    pub instance: InstanceId,
    /// Entry point onto the event thread of `instance`.
    pub dispatcher: Arc<EventDispatcher<E>>,
    /// Name of the frontend addon inside `instance`.
    pub frontend: String,
    /// The input context created at startup.
    pub input_context: InputContextId,
    /// Thread running `instance`'s event loop.
    pub event_thread: ThreadId,
    /// Panel state shared with host threads.
    pub panel: Arc<PanelStatus>,
}

enum Slot<E> {
    Stopped,
    Starting {
        instance: InstanceId,
        dispatcher: Option<Arc<EventDispatcher<E>>>,
        exit_requested: bool,
    },
    Running(Arc<EngineSession<E>>),
}

/// Returned when a second engine is started on the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyRunning;

/// What a shutdown request found in the slot.
pub enum ShutdownRequest<E> {
    /// Nothing to stop.
    NotRunning,
    /// The run is still starting; startup will stop it once its dispatcher
    /// is attached.
    Deferred,
    /// Schedule the exit on this dispatcher.
    Dispatch(Arc<EventDispatcher<E>>),
}

pub struct EngineHandle<E> {
    slot: Mutex<Slot<E>>,
    next_instance: AtomicU64,
}

impl<E: 'static> EngineHandle<E> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Stopped),
            next_instance: AtomicU64::new(1),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot<E>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the handle for a new run.
    ///
    /// Fails without touching anything if a run is starting or running.
    pub fn claim(&self) -> Result<InstanceId, AlreadyRunning> {
        let mut slot = self.slot();
        if !matches!(*slot, Slot::Stopped) {
            return Err(AlreadyRunning);
        }
        let instance = InstanceId::new(self.next_instance.fetch_add(1, Ordering::Relaxed));
        *slot = Slot::Starting {
            instance,
            dispatcher: None,
            exit_requested: false,
        };
        Ok(instance)
    }

    /// Record the attached dispatcher of a starting run.
    ///
    /// Returns true if a shutdown was requested before the dispatcher
    /// existed; the caller must then schedule the exit itself.
    pub fn bind_dispatcher(&self, instance: InstanceId, dispatcher: Arc<EventDispatcher<E>>) -> bool {
        let mut slot = self.slot();
        match &mut *slot {
            Slot::Starting {
                instance: current,
                dispatcher: bound,
                exit_requested,
            } if *current == instance => {
                *bound = Some(dispatcher);
                std::mem::take(exit_requested)
            }
            _ => false,
        }
    }

    /// Make a fully wired session visible to host calls.
    ///
    /// Ignored unless `session.instance` is the run currently starting.
    pub fn publish(&self, session: EngineSession<E>) -> bool {
        let mut slot = self.slot();
        let starting =
            matches!(&*slot, Slot::Starting { instance, .. } if *instance == session.instance);
        if starting {
            *slot = Slot::Running(Arc::new(session));
        }
        starting
    }

    /// The running session, if any.
    pub fn session(&self) -> Option<Arc<EngineSession<E>>> {
        match &*self.slot() {
            Slot::Running(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Find out how to stop the current run.
    pub fn request_shutdown(&self) -> ShutdownRequest<E> {
        let mut slot = self.slot();
        match &mut *slot {
            Slot::Stopped => ShutdownRequest::NotRunning,
            Slot::Starting {
                dispatcher: Some(dispatcher),
                ..
            } => ShutdownRequest::Dispatch(dispatcher.clone()),
            Slot::Starting {
                dispatcher: None,
                exit_requested,
                ..
            } => {
                *exit_requested = true;
                ShutdownRequest::Deferred
            }
            Slot::Running(session) => ShutdownRequest::Dispatch(session.dispatcher.clone()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.slot(), Slot::Running(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(*self.slot(), Slot::Stopped)
    }

    /// Return to `Stopped` if the slot still belongs to `instance`.
    pub fn reset(&self, instance: InstanceId) -> bool {
        let mut slot = self.slot();
        let owned = match &*slot {
            Slot::Stopped => false,
            Slot::Starting { instance: current, .. } => *current == instance,
            Slot::Running(session) => session.instance == instance,
        };
        if owned {
            *slot = Slot::Stopped;
        }
        owned
    }
}

impl<E: 'static> Default for EngineHandle<E> {
    fn default() -> Self {
        Self::new()
    }
}

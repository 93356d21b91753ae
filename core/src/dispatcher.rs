//! Cross-thread work submission onto the engine's event thread.
//!
//! The `EventLoop` belongs to the `Instance` and is drained by
//! `Instance::exec` on the thread that runs the engine. An
//! `EventDispatcher` is the only handle other threads get: it can enqueue
//! work items, nothing else. Items from one thread run in the order they
//! were scheduled; items that cannot be delivered (detached dispatcher,
//! loop already gone) are dropped without running.

use crate::engine::EngineError;
use crate::instance::Instance;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

/// A deferred action executed exactly once on the engine's event thread.
pub type WorkItem<E> = Box<dyn FnOnce(&mut Instance<E>) -> Result<(), EngineError> + Send>;

pub(crate) enum LoopEvent<E> {
    Work(WorkItem<E>),
    Exit(i32),
}

/// The receiving end of the engine's event queue.
pub struct EventLoop<E> {
    tx: Sender<LoopEvent<E>>,
    rx: Receiver<LoopEvent<E>>,
}

impl<E> EventLoop<E> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> Sender<LoopEvent<E>> {
        self.tx.clone()
    }

    /// Block until the next event arrives.
    pub(crate) fn next_event(&self) -> Option<LoopEvent<E>> {
        self.rx.recv().ok()
    }

    /// Handle that can stop the loop from any thread.
    pub fn exit_handle(&self) -> ExitHandle<E> {
        ExitHandle { tx: self.sender() }
    }
}

impl<E> Default for EventLoop<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests the event loop to stop with an exit code.
///
/// Used by engines that decide to terminate on their own.
pub struct ExitHandle<E> {
    tx: Sender<LoopEvent<E>>,
}

impl<E> ExitHandle<E> {
    /// Returns false if the loop is already gone.
    pub fn exit(&self, code: i32) -> bool {
        self.tx.send(LoopEvent::Exit(code)).is_ok()
    }
}

impl<E> Clone for ExitHandle<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Thread-safe entry point for work that must run on the event thread.
pub struct EventDispatcher<E> {
    target: Mutex<Option<Sender<LoopEvent<E>>>>,
}

impl<E: 'static> EventDispatcher<E> {
    /// A dispatcher that is not attached to any loop yet.
    pub fn new() -> Self {
        Self {
            target: Mutex::new(None),
        }
    }

    /// Bind this dispatcher to `event_loop`, replacing any previous binding.
    pub fn attach(&self, event_loop: &EventLoop<E>) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = Some(event_loop.sender());
    }

    /// Unbind from the loop. Later `schedule` calls drop their items.
    pub fn detach(&self) {
        self.target.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_attached(&self) -> bool {
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Queue `work` for the event thread and return immediately.
    ///
    /// Returns whether the item was queued.
    pub fn schedule<F>(&self, work: F) -> bool
    where
        F: FnOnce(&mut Instance<E>) -> Result<(), EngineError> + Send + 'static,
    {
        let target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = target.as_ref() else {
            tracing::debug!("dispatcher detached, dropping work item");
            return false;
        };
        if tx.send(LoopEvent::Work(Box::new(work))).is_err() {
            tracing::debug!("event loop gone, dropping work item");
            return false;
        }
        true
    }
}

impl<E: 'static> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

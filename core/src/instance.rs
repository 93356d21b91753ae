//! The engine instance and its blocking run loop.
//!
//! An `Instance` owns the engine together with the event loop that feeds it
//! work. It is created, run and dropped on one thread; everything else
//! reaches it through an `EventDispatcher`.

use crate::dispatcher::{EventLoop, ExitHandle, LoopEvent};
use crate::engine::{Engine, EngineError, EngineFactory};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Identity of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) u64);

impl InstanceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How `Instance::exec` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The loop was asked to exit with this code.
    NormalExit(i32),
    /// A work item signalled `EngineError::QuietQuit`.
    QuietExit,
    /// A work item failed or panicked.
    Failure(String),
}

pub struct Instance<E> {
    id: InstanceId,
    engine: E,
    event_loop: EventLoop<E>,
    pending_exit: Option<i32>,
}

impl<E: Engine> Instance<E> {
    pub fn new(id: InstanceId, engine: E) -> Self {
        Self {
            id,
            engine,
            event_loop: EventLoop::new(),
            pending_exit: None,
        }
    }

    /// Build the engine through `factory` and wrap it.
    pub fn create<F>(factory: &F, id: InstanceId, args: &[String]) -> Result<Self, EngineError>
    where
        F: EngineFactory<Engine = E>,
    {
        Ok(Self::new(id, factory.create(args)?))
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn event_loop(&self) -> &EventLoop<E> {
        &self.event_loop
    }

    pub fn exit_handle(&self) -> ExitHandle<E> {
        self.event_loop.exit_handle()
    }

    pub fn register_default_loader(&mut self) -> Result<(), EngineError> {
        self.engine.register_default_loader()
    }

    /// Ask `exec` to return once the current work item finishes.
    pub fn exit(&mut self) {
        self.pending_exit = Some(0);
    }

    /// Run the event loop on the calling thread until exit is requested, a
    /// work item fails, or a work item panics.
    pub fn exec(&mut self) -> RunOutcome {
        tracing::debug!(instance = %self.id, "event loop running");
        self.pending_exit = None;

        let outcome = loop {
            if let Some(code) = self.pending_exit.take() {
                break RunOutcome::NormalExit(code);
            }
            let Some(event) = self.event_loop.next_event() else {
                break RunOutcome::NormalExit(0);
            };
            let work = match event {
                LoopEvent::Exit(code) => break RunOutcome::NormalExit(code),
                LoopEvent::Work(work) => work,
            };
            match panic::catch_unwind(AssertUnwindSafe(|| work(self))) {
                Ok(Ok(())) => {}
                Ok(Err(EngineError::QuietQuit)) => break RunOutcome::QuietExit,
                Ok(Err(err)) => break RunOutcome::Failure(err.to_string()),
                Err(payload) => break RunOutcome::Failure(panic_message(payload.as_ref())),
            }
        };

        tracing::debug!(instance = %self.id, ?outcome, "event loop stopped");
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "work item panicked".to_string()
    }
}

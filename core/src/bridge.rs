//! Lifecycle control and the guarded host operations.
//!
//! `Bridge` is the context object a host embeds: it owns the engine
//! factory, the configuration and the `EngineHandle`. `startup` blocks the
//! calling thread for the whole engine run; every other operation may be
//! called from any thread and only ever reaches the engine through the
//! dispatcher of the running session.

use crate::config::BridgeConfig;
use crate::dispatcher::EventDispatcher;
use crate::engine::{Engine, EngineError, EngineFactory};
use crate::env::{AppPaths, EngineEnvironment};
use crate::frontend::{FrontendAddon, InputContextId};
use crate::handle::{EngineHandle, EngineSession, PanelStatus, ShutdownRequest};
use crate::instance::{Instance, InstanceId, RunOutcome};
use crate::key::Key;
use crate::notification::{wire_callbacks, HostNotifier};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long a panel query waits between checks on the event thread.
const PANEL_POLL: Duration = Duration::from_millis(10);

/// Result of one `startup` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStatus {
    /// The engine ran and exited with this code (0 for a clean or quiet exit).
    Exited(i32),
    /// The engine failed; details went to the log.
    Failed,
    /// Another run already owns the handle.
    AlreadyRunning,
}

impl StartupStatus {
    /// The status code reported to the host.
    pub fn code(&self) -> i32 {
        match self {
            StartupStatus::Exited(code) => *code,
            StartupStatus::Failed => 1,
            StartupStatus::AlreadyRunning => 2,
        }
    }
}

pub struct Bridge<F: EngineFactory> {
    factory: F,
    config: BridgeConfig,
    handle: Arc<EngineHandle<F::Engine>>,
}

impl<F: EngineFactory> Bridge<F> {
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, BridgeConfig::default())
    }

    pub fn with_config(factory: F, config: BridgeConfig) -> Self {
        Self {
            factory,
            config,
            handle: Arc::new(EngineHandle::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Whether a fully wired engine is running.
    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Start the engine and run it on the calling thread until it exits.
    ///
    /// `notifier` receives every candidate, commit, preedit and aux event
    /// until this call returns.
    pub fn startup(&self, paths: &AppPaths, notifier: Arc<dyn HostNotifier>) -> StartupStatus {
        let id = match self.handle.claim() {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!("fcitx already running");
                return StartupStatus::AlreadyRunning;
            }
        };
        tracing::info!(instance = %id, "startupFcitx");

        EngineEnvironment::derive(paths, &self.config).apply();

        let mut instance = match self.construct(id) {
            Ok(instance) => instance,
            Err(err) => {
                tracing::error!(error = %err, "fcitx failed to start");
                self.reset(id);
                return StartupStatus::Failed;
            }
        };

        let dispatcher = Arc::new(EventDispatcher::new());
        dispatcher.attach(instance.event_loop());
        dispatcher.schedule(self.wiring(id, dispatcher.clone(), notifier));
        if self.handle.bind_dispatcher(id, dispatcher.clone()) {
            tracing::info!("shutdown requested during startup");
            dispatcher.schedule(exit_work(dispatcher.clone()));
        }

        let outcome = instance.exec();
        dispatcher.detach();
        self.reset(id);

        match outcome {
            RunOutcome::NormalExit(code) => {
                tracing::info!(code, "fcitx exited");
                StartupStatus::Exited(code)
            }
            RunOutcome::QuietExit => {
                tracing::info!("fcitx quit quietly");
                StartupStatus::Exited(0)
            }
            RunOutcome::Failure(message) => {
                tracing::error!(error = %message, "fcitx exited with exception");
                StartupStatus::Failed
            }
        }
    }

    fn construct(&self, id: InstanceId) -> Result<Instance<F::Engine>, EngineError> {
        let mut instance = Instance::create(&self.factory, id, &[])?;
        instance.register_default_loader()?;
        Ok(instance)
    }

    fn reset(&self, id: InstanceId) {
        if self.handle.reset(id) {
            tracing::debug!(instance = %id, "engine handle reset");
        }
    }

    /// First work item of a run: configure the input method group, hook
    /// the host up to the frontend and publish the session.
    fn wiring(
        &self,
        id: InstanceId,
        dispatcher: Arc<EventDispatcher<F::Engine>>,
        notifier: Arc<dyn HostNotifier>,
    ) -> impl FnOnce(&mut Instance<F::Engine>) -> Result<(), EngineError> + Send + 'static {
        let config = self.config.clone();
        let handle = self.handle.clone();
        let panel = Arc::new(PanelStatus::new());
        let notifier: Arc<dyn HostNotifier> = Arc::new(TrackedNotifier {
            inner: notifier,
            panel: panel.clone(),
        });

        move |instance| {
            let engine = instance.engine_mut();
            let mut group = engine.current_group();
            group.reset_to(&config.input_method);
            engine.set_group(group)?;

            let frontend = engine
                .frontend(&config.frontend_addon)
                .ok_or_else(|| EngineError::AddonNotFound(config.frontend_addon.clone()))?;
            wire_callbacks(frontend, notifier);
            let input_context = frontend.create_input_context(&config.program_name)?;
            panel.set_empty(frontend.is_input_panel_empty(input_context));

            let published = handle.publish(EngineSession {
                instance: id,
                dispatcher,
                frontend: config.frontend_addon,
                input_context,
                event_thread: thread::current().id(),
                panel,
            });
            if published {
                tracing::info!(ic = %input_context, "fcitx running");
            }
            Ok(())
        }
    }

    /// Stop the running engine. Returns immediately; `startup` returns once
    /// the engine has actually stopped.
    pub fn shutdown(&self) {
        match self.handle.request_shutdown() {
            ShutdownRequest::NotRunning => tracing::warn!("fcitx is not running"),
            ShutdownRequest::Deferred => tracing::info!("shutting down fcitx once started"),
            ShutdownRequest::Dispatch(dispatcher) => {
                tracing::info!("shutting down fcitx");
                dispatcher.schedule(exit_work(dispatcher.clone()));
            }
        }
    }

    fn live_session(&self) -> Option<Arc<EngineSession<F::Engine>>> {
        let session = self.handle.session();
        if session.is_none() {
            tracing::warn!("fcitx is not running");
        }
        session
    }

    /// Send a key given as a textual descriptor such as `"Control+a"`.
    pub fn send_key(&self, descriptor: &str) {
        let Some(session) = self.live_session() else {
            return;
        };
        match Key::parse(descriptor) {
            Ok(key) => schedule_key(&session, key),
            Err(err) => tracing::warn!(descriptor, error = %err, "dropping key"),
        }
    }

    /// Send a single character.
    pub fn send_key_char(&self, c: char) {
        let Some(session) = self.live_session() else {
            return;
        };
        schedule_key(&session, Key::from_char(c));
    }

    /// Send a single UTF-16 code unit as delivered by the host.
    pub fn send_key_utf16(&self, unit: u16) {
        let Some(session) = self.live_session() else {
            return;
        };
        match Key::from_utf16(unit) {
            Ok(key) => schedule_key(&session, key),
            Err(err) => tracing::warn!(error = %err, "dropping key"),
        }
    }

    pub fn select_candidate(&self, index: i32) {
        let Some(session) = self.live_session() else {
            return;
        };
        tracing::info!("select candidate #{}", index);
        let Ok(index) = usize::try_from(index) else {
            tracing::warn!(index, "negative candidate index");
            return;
        };
        on_frontend(&session, move |frontend, ic| frontend.select_candidate(ic, index));
    }

    pub fn reset_input_panel(&self) {
        let Some(session) = self.live_session() else {
            return;
        };
        on_frontend(&session, |frontend, ic| frontend.reset_input_panel(ic));
    }

    /// Whether the input panel has nothing to show.
    ///
    /// Runs the query on the event thread and waits for the answer, so it
    /// reflects every command this thread issued before. While the event
    /// thread sits inside one host callback for a whole poll period, the
    /// answer comes from the state after the last completed command instead,
    /// so a host that blocks its callback on the querying thread cannot
    /// deadlock. Answers `true` when the engine is not running or stops
    /// before answering, and when called from the event thread itself.
    pub fn is_input_panel_empty(&self) -> bool {
        let Some(session) = self.live_session() else {
            return true;
        };
        if thread::current().id() == session.event_thread {
            tracing::warn!("input panel queried from the event thread");
            return true;
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let frontend = session.frontend.clone();
        let ic = session.input_context;
        let panel = session.panel.clone();
        let queued = session.dispatcher.schedule(move |instance| {
            let empty = instance
                .engine_mut()
                .frontend(&frontend)
                .map_or(true, |frontend| frontend.is_input_panel_empty(ic));
            panel.set_empty(empty);
            let _ = tx.send(empty);
            Ok(())
        });
        if !queued {
            return true;
        }

        let mut blocked_in = None;
        loop {
            match rx.recv_timeout(PANEL_POLL) {
                Ok(empty) => return empty,
                Err(RecvTimeoutError::Disconnected) => return true,
                Err(RecvTimeoutError::Timeout) => {
                    let callback = session.panel.host_callback();
                    if callback.is_some() && callback == blocked_in {
                        tracing::debug!("event thread blocked in a host callback, using last panel state");
                        return session.panel.is_empty();
                    }
                    blocked_in = callback;
                }
            }
        }
    }
}

/// Marks the event thread as busy in the host while a notification is
/// being delivered.
struct TrackedNotifier {
    inner: Arc<dyn HostNotifier>,
    panel: Arc<PanelStatus>,
}

impl HostNotifier for TrackedNotifier {
    fn on_event(&self, kind: i32, args: &[String]) {
        self.panel.enter_host_callback();
        self.inner.on_event(kind, args);
        self.panel.leave_host_callback();
    }
}

fn exit_work<E: Engine>(
    dispatcher: Arc<EventDispatcher<E>>,
) -> impl FnOnce(&mut Instance<E>) -> Result<(), EngineError> + Send + 'static {
    move |instance| {
        dispatcher.detach();
        instance.exit();
        Ok(())
    }
}

fn schedule_key<E: Engine>(session: &EngineSession<E>, key: Key) {
    on_frontend(session, move |frontend, ic| {
        let handled = frontend.key_event(ic, &key, false)?;
        tracing::trace!(%key, handled, "key delivered");
        Ok(())
    });
}

/// Schedule `action` against the session's frontend and input context.
fn on_frontend<E, A>(session: &EngineSession<E>, action: A)
where
    E: Engine,
    A: FnOnce(&mut dyn FrontendAddon, InputContextId) -> Result<(), EngineError> + Send + 'static,
{
    let frontend = session.frontend.clone();
    let ic = session.input_context;
    let panel = session.panel.clone();
    session.dispatcher.schedule(move |instance| {
        match instance.engine_mut().frontend(&frontend) {
            Some(addon) => {
                let result = action(&mut *addon, ic);
                panel.set_empty(addon.is_input_panel_empty(ic));
                result
            }
            None => {
                tracing::warn!(addon = %frontend, "frontend addon missing, dropping command");
                Ok(())
            }
        }
    });
}

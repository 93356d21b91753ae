//! fcitx-bridge-core
//!
//! Lifecycle, thread dispatch and callback marshaling for an input method
//! engine embedded in a host application. The engine runs its own event
//! loop on the thread that called `Bridge::startup`; host calls from any
//! other thread are turned into work items and queued onto that loop.
//!
//! Public API:
//! - `Bridge` - Startup, shutdown and the guarded input operations
//! - `Engine` / `EngineFactory` - What an embedded engine must provide
//! - `FrontendAddon` - The addon the bridge drives for key and panel calls
//! - `HostNotifier` - Where candidate, commit, preedit and aux events go
//! - `EventDispatcher` - Cross-thread work submission
//! - `EngineHandle` - The single-run ownership slot
//! - `LogRelay` - stdout/stderr capture into the host log
//! - `BridgeConfig` - Configuration and defaults

pub mod config;
pub use config::{BridgeConfig, ConfigError};

pub mod engine;
pub use engine::{Engine, EngineError, EngineFactory, InputMethodGroup};

pub mod key;
pub use key::{Key, KeyParseError, KeyStates, KeySym, NamedKey};

pub mod frontend;
pub use frontend::{
    CandidateListCallback, CommitStringCallback, FrontendAddon, InputContextId,
    InputPanelAuxCallback, PreeditCallback,
};

pub mod notification;
pub use notification::{notify, wire_callbacks, HostNotifier, NotificationEvent};

pub mod dispatcher;
pub use dispatcher::{EventDispatcher, EventLoop, ExitHandle, WorkItem};

pub mod instance;
pub use instance::{Instance, InstanceId, RunOutcome};

pub mod handle;
pub use handle::{AlreadyRunning, EngineHandle, EngineSession, PanelStatus, ShutdownRequest};

pub mod env;
pub use env::{AppPaths, EngineEnvironment};

pub mod log_relay;
pub use log_relay::{LogRelay, LogSink, TracingSink};

pub mod bridge;
pub use bridge::{Bridge, StartupStatus};

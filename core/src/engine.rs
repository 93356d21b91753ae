//! Interface of the embedded input method engine.
//!
//! The bridge never looks inside the engine. It needs three things from it:
//! a way to build an instance (`EngineFactory`), instance-level setup
//! (`Engine`: addon loader, input method group, addon lookup) and the
//! bridge-facing frontend addon (`crate::frontend::FrontendAddon`).
//!
//! Engines are created on the thread that calls `Bridge::startup` and never
//! leave it, so neither trait requires `Send` of the engine itself.

use crate::frontend::FrontendAddon;
use thiserror::Error;

/// Errors raised by the engine or by work executed on its event thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine asked to stop without reporting a failure.
    #[error("engine requested a quiet quit")]
    QuietQuit,

    /// A named addon is not loaded.
    #[error("addon `{0}` is not loaded")]
    AddonNotFound(String),

    /// An argument handed to the engine was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other engine failure.
    #[error("{0}")]
    Failed(String),
}

impl EngineError {
    /// Whether this error is the quiet termination signal.
    pub fn is_quiet(&self) -> bool {
        matches!(self, EngineError::QuietQuit)
    }
}

/// An input method group: the ordered list of input methods the engine
/// cycles through plus the one activated by default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputMethodGroup {
    pub name: String,
    pub input_methods: Vec<String>,
    pub default_input_method: String,
}

impl InputMethodGroup {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            input_methods: Vec::new(),
            default_input_method: String::new(),
        }
    }

    /// Drop every input method and install `input_method` as the only one.
    ///
    /// The default input method is cleared so the engine falls back to the
    /// first entry of the list.
    pub fn reset_to(&mut self, input_method: &str) {
        self.input_methods.clear();
        self.input_methods.push(input_method.to_string());
        self.default_input_method.clear();
    }
}

/// Instance-level engine operations used while wiring the bridge.
pub trait Engine: 'static {
    /// Register the loader that discovers addons from the configured
    /// addon directories.
    fn register_default_loader(&mut self) -> Result<(), EngineError>;

    /// The group currently selected by the input method manager.
    fn current_group(&self) -> InputMethodGroup;

    /// Replace the current group.
    fn set_group(&mut self, group: InputMethodGroup) -> Result<(), EngineError>;

    /// Look up a loaded frontend addon by name.
    fn frontend(&mut self, name: &str) -> Option<&mut dyn FrontendAddon>;
}

/// Builds engine instances.
///
/// Shared between threads by the bridge, so it must be `Send + Sync`; the
/// engines it produces stay on the thread that asked for them.
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: Engine;

    /// Construct an engine with the given command line arguments.
    fn create(&self, args: &[String]) -> Result<Self::Engine, EngineError>;
}

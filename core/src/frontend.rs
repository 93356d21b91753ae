//! The bridge-facing frontend addon.
//!
//! The addon lives inside the engine instance and is only ever touched from
//! the engine's event thread. Callbacks it fires receive borrowed payloads
//! that are valid for the duration of the call only.

use crate::engine::EngineError;
use crate::key::Key;
use std::fmt;

/// Fired with the full candidate list of the focused input context.
pub type CandidateListCallback = Box<dyn FnMut(&[String])>;

/// Fired with text to commit to the client.
pub type CommitStringCallback = Box<dyn FnMut(&str)>;

/// Fired with the current preedit and the client-visible preedit.
pub type PreeditCallback = Box<dyn FnMut(&str, &str)>;

/// Fired with the auxiliary text shown above and below the panel.
pub type InputPanelAuxCallback = Box<dyn FnMut(&str, &str)>;

/// Opaque identifier of an input context inside the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputContextId([u8; 16]);

impl InputContextId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for InputContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for InputContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputContextId({})", self)
    }
}

/// Operations the bridge performs on the frontend addon.
pub trait FrontendAddon {
    fn set_candidate_list_callback(&mut self, callback: CandidateListCallback);

    fn set_commit_string_callback(&mut self, callback: CommitStringCallback);

    fn set_preedit_callback(&mut self, callback: PreeditCallback);

    fn set_input_panel_aux_callback(&mut self, callback: InputPanelAuxCallback);

    /// Create an input context on behalf of `program`.
    fn create_input_context(&mut self, program: &str) -> Result<InputContextId, EngineError>;

    /// Deliver a key to an input context. Returns whether it was consumed.
    fn key_event(
        &mut self,
        ic: InputContextId,
        key: &Key,
        is_release: bool,
    ) -> Result<bool, EngineError>;

    fn select_candidate(&mut self, ic: InputContextId, index: usize) -> Result<(), EngineError>;

    /// Side-effect free query of the input panel of `ic`.
    fn is_input_panel_empty(&self, ic: InputContextId) -> bool;

    fn reset_input_panel(&mut self, ic: InputContextId) -> Result<(), EngineError>;
}

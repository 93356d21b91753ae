//! fcitx-tableime
//!
//! A small table-driven input method engine that plugs into
//! `fcitx-bridge-core`. It exists so the bridge can be driven end to end
//! without a native engine: the frontend addon keeps a typed code per input
//! context, looks phrases up in a code table and reports preedit, candidates,
//! aux text and commits through the bridge's callbacks.
//!
//! Public API:
//! - `TableEngineFactory` - Builds engines for `Bridge::new`
//! - `TableEngine` - Instance-level engine (group, loader, addon lookup)
//! - `TableFrontend` - The bridge-facing addon
//! - `Table` - Code table, built-in or loaded from `table.toml`
//! - `TableConfig` - Page size, selection keys, table file

pub mod table;
pub use table::{Table, TableEntry};

pub mod config;
pub use config::TableConfig;

pub mod input_buffer;
pub use input_buffer::InputBuffer;

pub mod candidate;
pub use candidate::CandidateList;

pub mod frontend;
pub use frontend::TableFrontend;

pub mod engine;
pub use engine::{TableEngine, TableEngineFactory, FRONTEND_ADDON};

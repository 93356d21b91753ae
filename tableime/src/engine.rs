//! The table engine and its factory.

use crate::config::TableConfig;
use crate::frontend::TableFrontend;
use crate::table::Table;
use fcitx_bridge_core::env::LIBIME_MODEL_DIRS;
use fcitx_bridge_core::{Engine, EngineError, EngineFactory, FrontendAddon, InputMethodGroup};
use std::path::PathBuf;
use std::sync::Arc;

/// Name the frontend addon is registered under.
pub const FRONTEND_ADDON: &str = "androidfrontend";

pub struct TableEngine {
    config: TableConfig,
    model_dirs: Vec<PathBuf>,
    group: InputMethodGroup,
    frontend: Option<TableFrontend>,
}

impl TableEngine {
    pub fn new(config: TableConfig, model_dirs: Vec<PathBuf>) -> Self {
        let mut group = InputMethodGroup::new("Default");
        group.input_methods = vec!["keyboard-us".to_string()];
        group.default_input_method = "keyboard-us".to_string();
        Self {
            config,
            model_dirs,
            group,
            frontend: None,
        }
    }

    /// The active input method: the group default, else its first entry.
    pub fn active_input_method(&self) -> Option<&str> {
        if !self.group.default_input_method.is_empty() {
            return Some(self.group.default_input_method.as_str());
        }
        self.group.input_methods.first().map(String::as_str)
    }

    fn load_table(&self) -> Table {
        for dir in &self.model_dirs {
            let path = dir.join(&self.config.table_file);
            if !path.is_file() {
                continue;
            }
            match Table::load_toml(&path) {
                Ok(table) => {
                    tracing::info!(path = %path.display(), entries = table.len(), "table loaded");
                    return table;
                }
                Err(err) => tracing::warn!(path = %path.display(), "skipping table: {:#}", err),
            }
        }
        tracing::info!("using built-in table");
        Table::builtin()
    }
}

impl Engine for TableEngine {
    fn register_default_loader(&mut self) -> Result<(), EngineError> {
        let table = Arc::new(self.load_table());
        self.frontend = Some(TableFrontend::new(table, self.config.clone()));
        Ok(())
    }

    fn current_group(&self) -> InputMethodGroup {
        self.group.clone()
    }

    fn set_group(&mut self, group: InputMethodGroup) -> Result<(), EngineError> {
        // keyboard-us is the plain passthrough layout every group may carry
        if let Some(unknown) = group
            .input_methods
            .iter()
            .find(|im| *im != "keyboard-us" && !self.config.provides(im))
        {
            return Err(EngineError::InvalidArgument(format!(
                "unknown input method `{}`",
                unknown
            )));
        }
        tracing::debug!(group = %group.name, input_methods = ?group.input_methods, "group set");
        self.group = group;
        Ok(())
    }

    fn frontend(&mut self, name: &str) -> Option<&mut dyn FrontendAddon> {
        if name != FRONTEND_ADDON {
            return None;
        }
        self.frontend.as_mut().map(|f| f as &mut dyn FrontendAddon)
    }
}

/// Builds table engines that look for their table in the language model
/// directories exported to the process environment.
#[derive(Debug, Clone, Default)]
pub struct TableEngineFactory {
    config: TableConfig,
}

impl TableEngineFactory {
    pub fn new(config: TableConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }
}

fn model_dirs_from_env() -> Vec<PathBuf> {
    std::env::var_os(LIBIME_MODEL_DIRS)
        .map(|dirs| std::env::split_paths(&dirs).collect())
        .unwrap_or_default()
}

impl EngineFactory for TableEngineFactory {
    type Engine = TableEngine;

    fn create(&self, args: &[String]) -> Result<TableEngine, EngineError> {
        if let Some(arg) = args.first() {
            return Err(EngineError::InvalidArgument(format!("unexpected argument `{}`", arg)));
        }
        let dirs = model_dirs_from_env();
        tracing::debug!(dirs = ?dirs, "creating table engine");
        Ok(TableEngine::new(self.config.clone(), dirs))
    }
}

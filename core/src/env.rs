//! Process environment consumed by the embedded engine.
//!
//! The engine resolves its data, config, addon and language model
//! locations from environment variables while it is being constructed, so
//! they are derived from the host's directories and applied before the
//! instance exists.

use crate::config::BridgeConfig;
use std::path::{Path, PathBuf};

/// Directories handed over by the host at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Read-only application data (bundled tables, addon configs).
    pub app_data: PathBuf,
    /// Native library directory holding addon shared objects.
    pub app_lib: PathBuf,
    /// Writable external data directory (user config and state).
    pub ext_data: PathBuf,
}

impl AppPaths {
    pub fn new<A, B, C>(app_data: A, app_lib: B, ext_data: C) -> Self
    where
        A: Into<PathBuf>,
        B: Into<PathBuf>,
        C: Into<PathBuf>,
    {
        Self {
            app_data: app_data.into(),
            app_lib: app_lib.into(),
            ext_data: ext_data.into(),
        }
    }
}

pub const SKIP_FCITX_PATH: &str = "SKIP_FCITX_PATH";
pub const HOME: &str = "HOME";
pub const XDG_DATA_DIRS: &str = "XDG_DATA_DIRS";
pub const XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";
pub const XDG_DATA_HOME: &str = "XDG_DATA_HOME";
pub const FCITX_ADDON_DIRS: &str = "FCITX_ADDON_DIRS";
pub const LIBIME_MODEL_DIRS: &str = "LIBIME_MODEL_DIRS";
pub const LIBIME_INSTALL_PKGDATADIR: &str = "LIBIME_INSTALL_PKGDATADIR";

/// The full set of variables for one startup, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEnvironment {
    vars: Vec<(&'static str, String)>,
}

impl EngineEnvironment {
    pub fn derive(paths: &AppPaths, config: &BridgeConfig) -> Self {
        let ext = path_string(&paths.ext_data);
        let libime = path_string(&paths.app_data.join(&config.libime_subdir));

        let vars = vec![
            (SKIP_FCITX_PATH, "true".to_string()),
            (HOME, ext.clone()),
            (XDG_DATA_DIRS, path_string(&paths.app_data)),
            (XDG_CONFIG_HOME, ext.clone()),
            (XDG_DATA_HOME, ext),
            (FCITX_ADDON_DIRS, path_string(&paths.app_lib)),
            (LIBIME_MODEL_DIRS, libime.clone()),
            (LIBIME_INSTALL_PKGDATADIR, libime),
        ];
        Self { vars }
    }

    pub fn vars(&self) -> &[(&'static str, String)] {
        &self.vars
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Export every variable into the process environment.
    pub fn apply(&self) {
        for (name, value) in &self.vars {
            std::env::set_var(name, value);
        }
        tracing::debug!(count = self.vars.len(), "engine environment applied");
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

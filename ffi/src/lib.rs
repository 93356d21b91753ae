//! fcitx-bridge-ffi
//!
//! C ABI over a process-wide `Bridge` running the table engine. A host loads
//! the library, calls `fcitx_bridge_on_load` once, runs
//! `fcitx_bridge_startup` on a dedicated thread (it blocks until the engine
//! exits) and drives the engine from any other thread.
//!
//! Every export catches panics; a panic is logged and reported as the
//! export's failure value.
//!
//! Public API:
//! - `fcitx_bridge_on_load` - Logging setup, returns `FCITX_BRIDGE_ABI_VERSION`
//! - `fcitx_bridge_startup` / `fcitx_bridge_shutdown` - Engine lifecycle
//! - `fcitx_bridge_send_key_string` / `fcitx_bridge_send_key_char` - Key input
//! - `fcitx_bridge_select_candidate` - Candidate selection
//! - `fcitx_bridge_is_input_panel_empty` / `fcitx_bridge_reset_input_panel`

pub mod host;
pub use host::{CHostLog, CHostNotifier, HostEventFn, HostLogFn};

pub mod logging;

use anyhow::Context;
use fcitx_bridge_core::{AppPaths, Bridge, HostNotifier, StartupStatus};
use fcitx_tableime::TableEngineFactory;
use std::ffi::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

/// Bumped whenever an export changes signature or meaning.
pub const FCITX_BRIDGE_ABI_VERSION: i32 = 1;

static BRIDGE: OnceLock<Bridge<TableEngineFactory>> = OnceLock::new();

fn bridge() -> &'static Bridge<TableEngineFactory> {
    BRIDGE.get_or_init(|| Bridge::new(TableEngineFactory::default()))
}

fn guarded<T>(export: &str, on_panic: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        tracing::error!("panic in {}", export);
        on_panic
    })
}

/// Set up logging. `log` receives `(tag, line)` pairs; when given, the
/// process's stdout and stderr are relayed to it as well.
#[no_mangle]
pub extern "C" fn fcitx_bridge_on_load(log: Option<HostLogFn>) -> i32 {
    guarded("fcitx_bridge_on_load", -1, || {
        logging::init(log, bridge().config());
        FCITX_BRIDGE_ABI_VERSION
    })
}

unsafe fn startup_args(
    app_data: *const c_char,
    app_lib: *const c_char,
    ext_data: *const c_char,
) -> anyhow::Result<AppPaths> {
    let app_data = host::path_arg(app_data).context("app data directory is missing")?;
    let app_lib = host::path_arg(app_lib).context("app library directory is missing")?;
    let ext_data = host::path_arg(ext_data).context("external data directory is missing")?;
    Ok(AppPaths::new(app_data, app_lib, ext_data))
}

/// Start the engine and run it on the calling thread until it exits.
///
/// Returns the engine's exit code, 1 on failure (including missing
/// arguments) and 2 when an engine is already running.
///
/// # Safety
/// The path arguments must be null or NUL-terminated strings. `notify` may
/// be called from the engine thread until this function returns.
#[no_mangle]
pub unsafe extern "C" fn fcitx_bridge_startup(
    app_data: *const c_char,
    app_lib: *const c_char,
    ext_data: *const c_char,
    notify: Option<HostEventFn>,
) -> i32 {
    guarded("fcitx_bridge_startup", StartupStatus::Failed.code(), || {
        let paths = match startup_args(app_data, app_lib, ext_data) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::error!("cannot start fcitx: {:#}", err);
                return StartupStatus::Failed.code();
            }
        };
        let Some(notify) = notify else {
            tracing::error!("cannot start fcitx: no notification callback");
            return StartupStatus::Failed.code();
        };
        let notifier: Arc<dyn HostNotifier> = Arc::new(CHostNotifier::new(notify));
        bridge().startup(&paths, notifier).code()
    })
}

#[no_mangle]
pub extern "C" fn fcitx_bridge_shutdown() {
    guarded("fcitx_bridge_shutdown", (), || bridge().shutdown())
}

/// Send a key descriptor such as `"a"`, `"BackSpace"` or `"Control+space"`.
///
/// # Safety
/// `key` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fcitx_bridge_send_key_string(key: *const c_char) {
    guarded("fcitx_bridge_send_key_string", (), || {
        match host::borrow_str(key) {
            Some(key) => bridge().send_key(key),
            None => tracing::warn!("ignoring key: null or not UTF-8"),
        }
    })
}

/// Send one UTF-16 code unit.
#[no_mangle]
pub extern "C" fn fcitx_bridge_send_key_char(unit: u16) {
    guarded("fcitx_bridge_send_key_char", (), || {
        bridge().send_key_utf16(unit)
    })
}

#[no_mangle]
pub extern "C" fn fcitx_bridge_select_candidate(index: i32) {
    guarded("fcitx_bridge_select_candidate", (), || {
        bridge().select_candidate(index)
    })
}

/// True when nothing is being composed, or no engine is running.
#[no_mangle]
pub extern "C" fn fcitx_bridge_is_input_panel_empty() -> bool {
    guarded("fcitx_bridge_is_input_panel_empty", true, || {
        bridge().is_input_panel_empty()
    })
}

#[no_mangle]
pub extern "C" fn fcitx_bridge_reset_input_panel() {
    guarded("fcitx_bridge_reset_input_panel", (), || {
        bridge().reset_input_panel()
    })
}

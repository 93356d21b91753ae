// core/tests/startup_environment.rs
//
// Environment applied by startup. Kept alone in its own test binary because
// the process environment is shared by every test in a binary.

mod common;

use common::*;
use fcitx_bridge_core::env::{
    FCITX_ADDON_DIRS, HOME, LIBIME_INSTALL_PKGDATADIR, LIBIME_MODEL_DIRS, SKIP_FCITX_PATH,
    XDG_CONFIG_HOME, XDG_DATA_DIRS, XDG_DATA_HOME,
};
use fcitx_bridge_core::Bridge;
use std::sync::Arc;

#[test]
fn test_startup_exports_engine_environment() {
    let bridge = Arc::new(Bridge::new(MockFactory::default()));
    let (notifier, _events) = recording_notifier();
    let engine = spawn_engine(&bridge, notifier);
    wait_until(|| bridge.is_running());

    let expected = [
        (SKIP_FCITX_PATH, "true"),
        (HOME, "/data/ext"),
        (XDG_DATA_DIRS, "/data/app"),
        (XDG_CONFIG_HOME, "/data/ext"),
        (XDG_DATA_HOME, "/data/ext"),
        (FCITX_ADDON_DIRS, "/data/app/lib"),
        (LIBIME_MODEL_DIRS, "/data/app/fcitx5/libime"),
        (LIBIME_INSTALL_PKGDATADIR, "/data/app/fcitx5/libime"),
    ];
    for (name, value) in expected {
        assert_eq!(std::env::var(name).as_deref(), Ok(value), "{}", name);
    }

    bridge.shutdown();
    assert_eq!(engine.join().unwrap().code(), 0);
}

// tableime/tests/table_bridge.rs
//
// End-to-end run of the table engine behind the bridge.
//
// The startup environment is process-wide, so both runs live in one test
// and execute one after the other.

use fcitx_bridge_core::notification::{KIND_CANDIDATE_LIST, KIND_COMMIT_STRING, KIND_PREEDIT};
use fcitx_bridge_core::{AppPaths, Bridge, HostNotifier, StartupStatus};
use fcitx_tableime::{TableConfig, TableEngineFactory};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

type Events = Arc<Mutex<Vec<(i32, Vec<String>)>>>;

fn recording_notifier() -> (Arc<dyn HostNotifier>, Events) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let notifier: Arc<dyn HostNotifier> = Arc::new(move |kind: i32, args: &[String]| {
        sink.lock().unwrap().push((kind, args.to_vec()));
    });
    (notifier, events)
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "fcitx_tableime_bridge_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn wait_until<F: Fn() -> bool>(cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

fn of_kind(events: &Events, kind: i32) -> Vec<Vec<String>> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|(k, _)| *k == kind)
        .map(|(_, args)| args.clone())
        .collect()
}

#[test]
fn test_typing_through_the_bridge() {
    let data = scratch_dir("data");
    let ext = scratch_dir("ext");
    let model_dir = data.join("fcitx5/libime");
    std::fs::create_dir_all(&model_dir).unwrap();
    std::fs::write(
        model_dir.join("table.toml"),
        r#"
        [[entry]]
        code = "ma"
        text = "妈"
        weight = 5

        [[entry]]
        code = "ma"
        text = "马"
        weight = 9

        [[entry]]
        code = "mama"
        text = "妈妈"
        weight = 7
        "#,
    )
    .unwrap();

    let bridge = Arc::new(Bridge::new(TableEngineFactory::new(TableConfig::default())));
    let (notifier, events) = recording_notifier();
    let paths = AppPaths::new(data.clone(), data.join("lib"), ext.clone());

    let engine = {
        let bridge = bridge.clone();
        thread::spawn(move || bridge.startup(&paths, notifier))
    };
    wait_until(|| bridge.is_running() || engine.is_finished());
    assert!(bridge.is_running());

    bridge.send_key("m");
    bridge.send_key_char('a');
    assert!(!bridge.is_input_panel_empty());
    assert_eq!(
        of_kind(&events, KIND_CANDIDATE_LIST).last().unwrap(),
        &vec!["马".to_string(), "妈".to_string(), "妈妈".to_string()]
    );
    assert_eq!(
        of_kind(&events, KIND_PREEDIT).last().unwrap(),
        &vec!["ma".to_string(), "马".to_string()]
    );

    bridge.select_candidate(2);
    assert!(bridge.is_input_panel_empty());
    assert_eq!(of_kind(&events, KIND_COMMIT_STRING), vec![vec!["妈妈".to_string()]]);

    bridge.send_key_utf16(u16::from(b'm'));
    bridge.reset_input_panel();
    assert!(bridge.is_input_panel_empty());
    assert_eq!(of_kind(&events, KIND_COMMIT_STRING).len(), 1);

    bridge.shutdown();
    assert_eq!(engine.join().unwrap(), StartupStatus::Exited(0));

    // Second run without a table file falls back to the built-in table.
    let empty = scratch_dir("empty");
    let (notifier, events) = recording_notifier();
    let paths = AppPaths::new(empty.clone(), empty.join("lib"), ext.clone());
    let engine = {
        let bridge = bridge.clone();
        thread::spawn(move || bridge.startup(&paths, notifier))
    };
    wait_until(|| bridge.is_running() || engine.is_finished());

    for c in "nihao".chars() {
        bridge.send_key_char(c);
    }
    bridge.send_key("space");
    assert!(bridge.is_input_panel_empty());
    assert_eq!(of_kind(&events, KIND_COMMIT_STRING), vec![vec!["你好".to_string()]]);

    bridge.shutdown();
    assert_eq!(engine.join().unwrap().code(), 0);

    for dir in [data, ext, empty] {
        let _ = std::fs::remove_dir_all(dir);
    }
}

// core/tests/common/mod.rs
//
// Mock engine shared by the bridge integration tests.
//
// The mock frontend keeps a single preedit buffer. Printable
// keys append to it and publish a preedit plus a three-entry candidate list;
// selecting a candidate commits it; Escape quits the engine quietly and
// BackSpace on an empty buffer fails the engine.

#![allow(dead_code)]

use fcitx_bridge_core::{
    AppPaths, Bridge, CandidateListCallback, CommitStringCallback, Engine, EngineError,
    EngineFactory, FrontendAddon, HostNotifier, InputContextId, InputMethodGroup,
    InputPanelAuxCallback, Key, KeySym, NamedKey, PreeditCallback, StartupStatus,
};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const FRONTEND: &str = "androidfrontend";

/// Calls observed by the mock, in execution order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Notifications observed by the host, in delivery order.
pub type EventLog = Arc<Mutex<Vec<(i32, Vec<String>)>>>;

#[derive(Default)]
pub struct MockFrontend {
    calls: CallLog,
    next_ic: u8,
    buffer: String,
    candidates: Vec<String>,
    on_candidates: Option<CandidateListCallback>,
    on_commit: Option<CommitStringCallback>,
    on_preedit: Option<PreeditCallback>,
    on_aux: Option<InputPanelAuxCallback>,
}

impl MockFrontend {
    fn publish(&mut self) {
        self.candidates = if self.buffer.is_empty() {
            Vec::new()
        } else {
            (1..=3).map(|i| format!("{}{}", self.buffer, i)).collect()
        };
        if let Some(cb) = self.on_preedit.as_mut() {
            cb(self.buffer.as_str(), self.buffer.as_str());
        }
        if let Some(cb) = self.on_candidates.as_mut() {
            cb(self.candidates.as_slice());
        }
    }
}

impl FrontendAddon for MockFrontend {
    fn set_candidate_list_callback(&mut self, callback: CandidateListCallback) {
        self.on_candidates = Some(callback);
    }

    fn set_commit_string_callback(&mut self, callback: CommitStringCallback) {
        self.on_commit = Some(callback);
    }

    fn set_preedit_callback(&mut self, callback: PreeditCallback) {
        self.on_preedit = Some(callback);
    }

    fn set_input_panel_aux_callback(&mut self, callback: InputPanelAuxCallback) {
        self.on_aux = Some(callback);
    }

    fn create_input_context(&mut self, program: &str) -> Result<InputContextId, EngineError> {
        self.calls.lock().unwrap().push(format!("create_ic {}", program));
        self.next_ic += 1;
        Ok(InputContextId::from_bytes([self.next_ic; 16]))
    }

    fn key_event(
        &mut self,
        _ic: InputContextId,
        key: &Key,
        _is_release: bool,
    ) -> Result<bool, EngineError> {
        self.calls.lock().unwrap().push(format!("key {}", key));
        match key.sym {
            KeySym::Char(c) => {
                self.buffer.push(c);
                self.publish();
                if let Some(cb) = self.on_aux.as_mut() {
                    cb(self.buffer.as_str(), "");
                }
                Ok(true)
            }
            KeySym::Named(NamedKey::Escape) => Err(EngineError::QuietQuit),
            KeySym::Named(NamedKey::BackSpace) if self.buffer.is_empty() => {
                Err(EngineError::Failed("nothing to delete".to_string()))
            }
            KeySym::Named(NamedKey::BackSpace) => {
                self.buffer.pop();
                self.publish();
                Ok(true)
            }
            KeySym::Named(_) => Ok(false),
        }
    }

    fn select_candidate(&mut self, _ic: InputContextId, index: usize) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(format!("select {}", index));
        let Some(text) = self.candidates.get(index).cloned() else {
            return Ok(());
        };
        self.buffer.clear();
        if let Some(cb) = self.on_commit.as_mut() {
            cb(text.as_str());
        }
        self.publish();
        Ok(())
    }

    fn is_input_panel_empty(&self, _ic: InputContextId) -> bool {
        self.buffer.is_empty()
    }

    fn reset_input_panel(&mut self, _ic: InputContextId) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push("reset".to_string());
        self.buffer.clear();
        self.publish();
        Ok(())
    }
}

pub struct MockEngine {
    calls: CallLog,
    group: InputMethodGroup,
    frontend: Option<MockFrontend>,
}

impl Engine for MockEngine {
    fn register_default_loader(&mut self) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push("register_default_loader".to_string());
        Ok(())
    }

    fn current_group(&self) -> InputMethodGroup {
        self.group.clone()
    }

    fn set_group(&mut self, group: InputMethodGroup) -> Result<(), EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_group {}", group.input_methods.join(",")));
        self.group = group;
        Ok(())
    }

    fn frontend(&mut self, name: &str) -> Option<&mut dyn FrontendAddon> {
        if name != FRONTEND {
            return None;
        }
        self.frontend.as_mut().map(|f| f as &mut dyn FrontendAddon)
    }
}

#[derive(Default)]
pub struct MockFactory {
    pub calls: CallLog,
    /// Build engines without the frontend addon.
    pub without_frontend: bool,
    /// Refuse to build engines at all.
    pub refuse: bool,
    /// Block `create` until this receiver yields.
    pub gate: Mutex<Option<Receiver<()>>>,
}

impl MockFactory {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl EngineFactory for MockFactory {
    type Engine = MockEngine;

    fn create(&self, args: &[String]) -> Result<MockEngine, EngineError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if self.refuse {
            return Err(EngineError::Failed("no engine for you".to_string()));
        }
        self.calls.lock().unwrap().push(format!("create {}", args.len()));

        let mut group = InputMethodGroup::new("Default");
        group.input_methods = vec!["keyboard-us".to_string()];
        group.default_input_method = "keyboard-us".to_string();

        let frontend = (!self.without_frontend).then(|| MockFrontend {
            calls: self.calls.clone(),
            ..MockFrontend::default()
        });
        Ok(MockEngine {
            calls: self.calls.clone(),
            group,
            frontend,
        })
    }
}

pub fn android_paths() -> AppPaths {
    AppPaths::new("/data/app", "/data/app/lib", "/data/ext")
}

pub fn recording_notifier() -> (Arc<dyn HostNotifier>, EventLog) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let notifier: Arc<dyn HostNotifier> = Arc::new(move |kind: i32, args: &[String]| {
        sink.lock().unwrap().push((kind, args.to_vec()));
    });
    (notifier, events)
}

/// Run `startup` on a dedicated engine thread.
pub fn spawn_engine(
    bridge: &Arc<Bridge<MockFactory>>,
    notifier: Arc<dyn HostNotifier>,
) -> JoinHandle<StartupStatus> {
    let bridge = bridge.clone();
    thread::Builder::new()
        .name("engine".to_string())
        .spawn(move || bridge.startup(&android_paths(), notifier))
        .unwrap()
}

/// Poll `cond` until it holds; panics after five seconds.
pub fn wait_until<F: Fn() -> bool>(cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

//! Callback marshaling from the frontend addon to the host.
//!
//! The addon fires its callbacks on the engine's event thread with borrowed
//! payloads. Each registered closure copies the payload into an owned
//! `NotificationEvent` and hands it to the host before returning, so the
//! host always observes the panel state of the moment the event fired.

use crate::frontend::FrontendAddon;
use std::sync::Arc;

/// Kind discriminants understood by the host.
pub const KIND_CANDIDATE_LIST: i32 = 0;
pub const KIND_COMMIT_STRING: i32 = 1;
pub const KIND_PREEDIT: i32 = 2;
pub const KIND_AUX_TEXT: i32 = 3;

/// An outbound engine notification with an owned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    CandidateList(Vec<String>),
    CommitString(String),
    Preedit { preedit: String, client_preedit: String },
    AuxText { up: String, down: String },
}

impl NotificationEvent {
    /// Host-side discriminant of this event.
    pub fn kind(&self) -> i32 {
        match self {
            NotificationEvent::CandidateList(_) => KIND_CANDIDATE_LIST,
            NotificationEvent::CommitString(_) => KIND_COMMIT_STRING,
            NotificationEvent::Preedit { .. } => KIND_PREEDIT,
            NotificationEvent::AuxText { .. } => KIND_AUX_TEXT,
        }
    }

    /// Payload as the host's argument array, primary value first.
    pub fn into_args(self) -> Vec<String> {
        match self {
            NotificationEvent::CandidateList(list) => list,
            NotificationEvent::CommitString(text) => vec![text],
            NotificationEvent::Preedit {
                preedit,
                client_preedit,
            } => vec![preedit, client_preedit],
            NotificationEvent::AuxText { up, down } => vec![up, down],
        }
    }
}

/// The host's single notification entry point.
///
/// Called on the engine's event thread. Implementations may block briefly
/// (e.g. to hop onto a UI thread); the engine waits for them.
pub trait HostNotifier: Send + Sync {
    fn on_event(&self, kind: i32, args: &[String]);
}

impl<F> HostNotifier for F
where
    F: Fn(i32, &[String]) + Send + Sync,
{
    fn on_event(&self, kind: i32, args: &[String]) {
        self(kind, args)
    }
}

/// Deliver one event to the host.
pub fn notify(notifier: &dyn HostNotifier, event: NotificationEvent) {
    let kind = event.kind();
    let args = event.into_args();
    tracing::trace!(kind, argc = args.len(), "notifying host");
    notifier.on_event(kind, &args);
}

/// Register the four notification callbacks on `frontend`, all forwarding
/// to `notifier`.
pub fn wire_callbacks(frontend: &mut dyn FrontendAddon, notifier: Arc<dyn HostNotifier>) {
    let host = notifier.clone();
    frontend.set_candidate_list_callback(Box::new(move |candidates: &[String]| {
        notify(&*host, NotificationEvent::CandidateList(candidates.to_vec()));
    }));

    let host = notifier.clone();
    frontend.set_commit_string_callback(Box::new(move |text: &str| {
        notify(&*host, NotificationEvent::CommitString(text.to_owned()));
    }));

    let host = notifier.clone();
    frontend.set_preedit_callback(Box::new(move |preedit: &str, client_preedit: &str| {
        notify(
            &*host,
            NotificationEvent::Preedit {
                preedit: preedit.to_owned(),
                client_preedit: client_preedit.to_owned(),
            },
        );
    }));

    let host = notifier;
    frontend.set_input_panel_aux_callback(Box::new(move |up: &str, down: &str| {
        notify(
            &*host,
            NotificationEvent::AuxText {
                up: up.to_owned(),
                down: down.to_owned(),
            },
        );
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::frontend::{
        CandidateListCallback, CommitStringCallback, InputContextId, InputPanelAuxCallback,
        PreeditCallback,
    };
    use crate::key::Key;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CallbackSlots {
        candidates: Option<CandidateListCallback>,
        commit: Option<CommitStringCallback>,
        preedit: Option<PreeditCallback>,
        aux: Option<InputPanelAuxCallback>,
    }

    impl FrontendAddon for CallbackSlots {
        fn set_candidate_list_callback(&mut self, callback: CandidateListCallback) {
            self.candidates = Some(callback);
        }
        fn set_commit_string_callback(&mut self, callback: CommitStringCallback) {
            self.commit = Some(callback);
        }
        fn set_preedit_callback(&mut self, callback: PreeditCallback) {
            self.preedit = Some(callback);
        }
        fn set_input_panel_aux_callback(&mut self, callback: InputPanelAuxCallback) {
            self.aux = Some(callback);
        }
        fn create_input_context(&mut self, _program: &str) -> Result<InputContextId, EngineError> {
            Ok(InputContextId::default())
        }
        fn key_event(&mut self, _: InputContextId, _: &Key, _: bool) -> Result<bool, EngineError> {
            Ok(false)
        }
        fn select_candidate(&mut self, _: InputContextId, _: usize) -> Result<(), EngineError> {
            Ok(())
        }
        fn is_input_panel_empty(&self, _: InputContextId) -> bool {
            true
        }
        fn reset_input_panel(&mut self, _: InputContextId) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn recording_notifier() -> (Arc<dyn HostNotifier>, Arc<Mutex<Vec<(i32, Vec<String>)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let notifier: Arc<dyn HostNotifier> = Arc::new(move |kind: i32, args: &[String]| {
            sink.lock().unwrap().push((kind, args.to_vec()));
        });
        (notifier, seen)
    }

    #[test]
    fn test_event_encoding() {
        let list = NotificationEvent::CandidateList(vec!["你".into(), "拟".into(), "尼".into()]);
        assert_eq!(list.kind(), 0);
        assert_eq!(list.into_args(), vec!["你", "拟", "尼"]);

        let commit = NotificationEvent::CommitString("你好".into());
        assert_eq!(commit.kind(), 1);
        assert_eq!(commit.into_args(), vec!["你好"]);

        let preedit = NotificationEvent::Preedit {
            preedit: "ni hao".into(),
            client_preedit: "nihao".into(),
        };
        assert_eq!(preedit.kind(), 2);
        assert_eq!(preedit.into_args(), vec!["ni hao", "nihao"]);

        let aux = NotificationEvent::AuxText {
            up: "above".into(),
            down: "below".into(),
        };
        assert_eq!(aux.kind(), 3);
        assert_eq!(aux.into_args(), vec!["above", "below"]);
    }

    #[test]
    fn test_empty_candidate_list_is_forwarded() {
        let (notifier, seen) = recording_notifier();
        notify(&*notifier, NotificationEvent::CandidateList(Vec::new()));
        assert_eq!(seen.lock().unwrap().as_slice(), &[(0, Vec::<String>::new())]);
    }

    #[test]
    fn test_wired_callbacks_copy_payloads_before_returning() {
        let (notifier, seen) = recording_notifier();
        let mut frontend = CallbackSlots::default();
        wire_callbacks(&mut frontend, notifier);

        {
            // Payload buffers die right after each call.
            let candidates = vec!["一".to_string(), "二".to_string()];
            (frontend.candidates.as_mut().unwrap())(candidates.as_slice());
            let commit = String::from("一二");
            (frontend.commit.as_mut().unwrap())(&commit);
        }
        (frontend.preedit.as_mut().unwrap())("yi er", "yier");
        (frontend.aux.as_mut().unwrap())("", "1/2");

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[
                (0, vec!["一".to_string(), "二".to_string()]),
                (1, vec!["一二".to_string()]),
                (2, vec!["yi er".to_string(), "yier".to_string()]),
                (3, vec!["".to_string(), "1/2".to_string()]),
            ]
        );
    }
}

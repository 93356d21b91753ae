//! Frontend addon of the table engine.
//!
//! Keeps a composition per input context and reports every change of the
//! focused composition through the registered callbacks: preedit first, then
//! the full candidate list, then the aux text (typed code above, page
//! indicator below). Commits are reported before the cleared panel.

use crate::candidate::CandidateList;
use crate::config::TableConfig;
use crate::input_buffer::InputBuffer;
use crate::table::Table;
use ahash::AHashMap;
use fcitx_bridge_core::{
    CandidateListCallback, CommitStringCallback, EngineError, FrontendAddon, InputContextId,
    InputPanelAuxCallback, Key, KeySym, NamedKey, PreeditCallback,
};
use std::sync::Arc;

#[derive(Debug)]
struct Composition {
    program: String,
    buffer: InputBuffer,
    candidates: CandidateList,
}

#[derive(Default)]
struct Callbacks {
    candidate_list: Option<CandidateListCallback>,
    commit_string: Option<CommitStringCallback>,
    preedit: Option<PreeditCallback>,
    aux: Option<InputPanelAuxCallback>,
}

pub struct TableFrontend {
    table: Arc<Table>,
    config: TableConfig,
    contexts: AHashMap<InputContextId, Composition>,
    next_context: u64,
    callbacks: Callbacks,
}

impl TableFrontend {
    pub fn new(table: Arc<Table>, config: TableConfig) -> Self {
        Self {
            table,
            config,
            contexts: AHashMap::new(),
            next_context: 0,
            callbacks: Callbacks::default(),
        }
    }

    /// Program the input context was created for.
    pub fn program(&self, ic: InputContextId) -> Option<&str> {
        self.contexts.get(&ic).map(|c| c.program.as_str())
    }

    /// Current typed code of `ic`.
    pub fn input_text(&self, ic: InputContextId) -> Option<&str> {
        self.contexts.get(&ic).map(|c| c.buffer.text())
    }

    fn composition(&mut self, ic: InputContextId) -> Result<&mut Composition, EngineError> {
        self.contexts
            .get_mut(&ic)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown input context {}", ic)))
    }

    fn commit(&mut self, text: &str) {
        tracing::debug!(text, "commit");
        if let Some(cb) = self.callbacks.commit_string.as_mut() {
            cb(text);
        }
    }

    /// Recompute candidates of `ic` from its buffer and report the panel.
    fn refresh(&mut self, ic: InputContextId) -> Result<(), EngineError> {
        let table = self.table.clone();
        let composition = self.composition(ic)?;
        composition
            .candidates
            .set_candidates(table.lookup(composition.buffer.text()));
        self.report(ic)
    }

    fn report(&mut self, ic: InputContextId) -> Result<(), EngineError> {
        let composition = self
            .contexts
            .get(&ic)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown input context {}", ic)))?;
        let code = composition.buffer.text().to_string();
        let client = composition
            .candidates
            .highlighted()
            .and_then(|i| composition.candidates.get(i))
            .unwrap_or(code.as_str())
            .to_string();
        let candidates = composition.candidates.all().to_vec();
        let pages = composition.candidates.num_pages();
        let page = if pages > 1 {
            format!("{}/{}", composition.candidates.current_page() + 1, pages)
        } else {
            String::new()
        };

        if let Some(cb) = self.callbacks.preedit.as_mut() {
            cb(code.as_str(), client.as_str());
        }
        if let Some(cb) = self.callbacks.candidate_list.as_mut() {
            cb(candidates.as_slice());
        }
        if let Some(cb) = self.callbacks.aux.as_mut() {
            cb(code.as_str(), page.as_str());
        }
        Ok(())
    }

    /// Commit the candidate with global `index` and clear the composition.
    fn commit_candidate(&mut self, ic: InputContextId, index: usize) -> Result<bool, EngineError> {
        let composition = self.composition(ic)?;
        let Some(text) = composition.candidates.get(index).map(str::to_string) else {
            tracing::debug!(index, "no such candidate");
            return Ok(false);
        };
        composition.buffer.clear();
        composition.candidates.clear();
        self.commit(&text);
        self.report(ic)?;
        Ok(true)
    }

    /// Commit whatever is composed: the highlighted candidate, or the raw
    /// code if nothing matches.
    fn commit_composition(&mut self, ic: InputContextId) -> Result<(), EngineError> {
        let composition = self.composition(ic)?;
        if composition.buffer.is_empty() {
            return Ok(());
        }
        let text = composition
            .candidates
            .highlighted()
            .and_then(|i| composition.candidates.get(i))
            .unwrap_or(composition.buffer.text())
            .to_string();
        composition.buffer.clear();
        composition.candidates.clear();
        self.commit(&text);
        self.report(ic)
    }

    fn edit(&mut self, ic: InputContextId, key: &Key) -> Result<bool, EngineError> {
        let composition = self.composition(ic)?;
        let composing = !composition.buffer.is_empty();

        let KeySym::Named(named) = key.sym else {
            return Ok(false);
        };
        let changed = match named {
            NamedKey::BackSpace if composing => composition.buffer.delete_before(),
            NamedKey::Delete if composing => composition.buffer.delete_after(),
            NamedKey::Left if composing => composition.buffer.move_left(),
            NamedKey::Right if composing => composition.buffer.move_right(),
            NamedKey::Home if composing => composition.buffer.move_to_start(),
            NamedKey::End if composing => composition.buffer.move_to_end(),
            NamedKey::Escape if composing => {
                composition.buffer.clear();
                true
            }
            NamedKey::Up if composing => {
                composition.candidates.cursor_up();
                return self.report(ic).map(|_| true);
            }
            NamedKey::Down if composing => {
                composition.candidates.cursor_down();
                return self.report(ic).map(|_| true);
            }
            NamedKey::PageUp if composing => {
                composition.candidates.page_up();
                return self.report(ic).map(|_| true);
            }
            NamedKey::PageDown if composing => {
                composition.candidates.page_down();
                return self.report(ic).map(|_| true);
            }
            NamedKey::Return if composing => {
                let code = composition.buffer.text().to_string();
                composition.buffer.clear();
                composition.candidates.clear();
                self.commit(&code);
                return self.report(ic).map(|_| true);
            }
            _ => return Ok(false),
        };
        if changed {
            self.refresh(ic)?;
        }
        Ok(true)
    }

    fn type_char(&mut self, ic: InputContextId, c: char) -> Result<bool, EngineError> {
        let max_len = self.config.max_code_length;
        let selection = self.config.selection_key_index(c);
        let composition = self.composition(ic)?;

        if !composition.buffer.is_empty() {
            if let Some(nth) = selection {
                return match composition.candidates.page_index(nth) {
                    Some(index) => self.commit_candidate(ic, index),
                    None => Ok(true),
                };
            }
            if c == ' ' {
                self.commit_composition(ic)?;
                return Ok(true);
            }
        }

        if c.is_ascii_lowercase() {
            if composition.buffer.char_len() >= max_len {
                tracing::debug!(max_len, "code too long, key ignored");
                return Ok(true);
            }
            composition.buffer.insert_char(c);
            self.refresh(ic)?;
            return Ok(true);
        }

        if composition.buffer.is_empty() {
            // Nothing composed: let the client handle the key.
            return Ok(false);
        }
        // Punctuation and the like end the composition and go out as well.
        self.commit_composition(ic)?;
        self.commit(&c.to_string());
        Ok(true)
    }
}

impl FrontendAddon for TableFrontend {
    fn set_candidate_list_callback(&mut self, callback: CandidateListCallback) {
        self.callbacks.candidate_list = Some(callback);
    }

    fn set_commit_string_callback(&mut self, callback: CommitStringCallback) {
        self.callbacks.commit_string = Some(callback);
    }

    fn set_preedit_callback(&mut self, callback: PreeditCallback) {
        self.callbacks.preedit = Some(callback);
    }

    fn set_input_panel_aux_callback(&mut self, callback: InputPanelAuxCallback) {
        self.callbacks.aux = Some(callback);
    }

    fn create_input_context(&mut self, program: &str) -> Result<InputContextId, EngineError> {
        self.next_context += 1;
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(b"tableime");
        bytes[8..].copy_from_slice(&self.next_context.to_be_bytes());
        let ic = InputContextId::from_bytes(bytes);

        self.contexts.insert(
            ic,
            Composition {
                program: program.to_string(),
                buffer: InputBuffer::new(),
                candidates: CandidateList::with_page_size(self.config.page_size),
            },
        );
        tracing::debug!(%ic, program, "input context created");
        Ok(ic)
    }

    fn key_event(
        &mut self,
        ic: InputContextId,
        key: &Key,
        is_release: bool,
    ) -> Result<bool, EngineError> {
        if is_release || key.has_command_modifier() {
            // Still reject unknown contexts.
            self.composition(ic)?;
            return Ok(false);
        }
        match key.sym {
            KeySym::Char(c) => self.type_char(ic, c),
            KeySym::Named(_) => self.edit(ic, key),
        }
    }

    fn select_candidate(&mut self, ic: InputContextId, index: usize) -> Result<(), EngineError> {
        self.commit_candidate(ic, index).map(|_| ())
    }

    fn is_input_panel_empty(&self, ic: InputContextId) -> bool {
        self.contexts
            .get(&ic)
            .map_or(true, |c| c.buffer.is_empty() && c.candidates.is_empty())
    }

    fn reset_input_panel(&mut self, ic: InputContextId) -> Result<(), EngineError> {
        let composition = self.composition(ic)?;
        composition.buffer.clear();
        composition.candidates.clear();
        self.report(ic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<(&'static str, Vec<String>)>>>;

    fn frontend() -> (TableFrontend, InputContextId, Seen) {
        let mut frontend = TableFrontend::new(Arc::new(Table::builtin()), TableConfig::default());
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        frontend.set_candidate_list_callback(Box::new(move |list: &[String]| {
            s.lock().unwrap().push(("candidates", list.to_vec()));
        }));
        let s = seen.clone();
        frontend.set_commit_string_callback(Box::new(move |text: &str| {
            s.lock().unwrap().push(("commit", vec![text.to_string()]));
        }));
        let s = seen.clone();
        frontend.set_preedit_callback(Box::new(move |a: &str, b: &str| {
            s.lock().unwrap().push(("preedit", vec![a.to_string(), b.to_string()]));
        }));
        let s = seen.clone();
        frontend.set_input_panel_aux_callback(Box::new(move |a: &str, b: &str| {
            s.lock().unwrap().push(("aux", vec![a.to_string(), b.to_string()]));
        }));

        let ic = frontend.create_input_context("test").unwrap();
        (frontend, ic, seen)
    }

    fn type_keys(frontend: &mut TableFrontend, ic: InputContextId, keys: &[&str]) {
        for k in keys {
            frontend.key_event(ic, &Key::parse(k).unwrap(), false).unwrap();
        }
    }

    fn commits(seen: &Seen) -> Vec<String> {
        seen.lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == "commit")
            .map(|(_, args)| args[0].clone())
            .collect()
    }

    #[test]
    fn test_typing_reports_panel() {
        let (mut frontend, ic, seen) = frontend();
        type_keys(&mut frontend, ic, &["n", "i"]);

        let seen = seen.lock().unwrap();
        let last = &seen[seen.len() - 3..];
        assert_eq!(last[0], ("preedit", vec!["ni".to_string(), "你".to_string()]));
        assert_eq!(last[1].0, "candidates");
        assert_eq!(&last[1].1[..2], &["你", "尼"]);
        assert_eq!(last[2], ("aux", vec!["ni".to_string(), String::new()]));
        assert!(!frontend.is_input_panel_empty(ic));
    }

    #[test]
    fn test_select_by_index_commits() {
        let (mut frontend, ic, seen) = frontend();
        type_keys(&mut frontend, ic, &["h", "a", "o"]);
        frontend.select_candidate(ic, 1).unwrap();

        assert_eq!(commits(&seen), vec!["号"]);
        assert!(frontend.is_input_panel_empty(ic));
        assert_eq!(frontend.input_text(ic), Some(""));
    }

    #[test]
    fn test_out_of_range_selection_is_ignored() {
        let (mut frontend, ic, seen) = frontend();
        type_keys(&mut frontend, ic, &["w", "o"]);
        frontend.select_candidate(ic, 50).unwrap();
        assert!(commits(&seen).is_empty());
        assert!(!frontend.is_input_panel_empty(ic));
    }

    #[test]
    fn test_selection_keys_address_current_page() {
        let (mut frontend, ic, seen) = frontend();
        type_keys(&mut frontend, ic, &["s", "h", "i", "Page_Down"]);
        {
            let seen = seen.lock().unwrap();
            let (_, aux) = seen.last().unwrap();
            assert_eq!(aux[1], "2/2");
        }
        type_keys(&mut frontend, ic, &["2"]);
        assert_eq!(commits(&seen), vec!["式"]);
    }

    #[test]
    fn test_space_commits_highlight_and_return_commits_code() {
        let (mut frontend, ic, seen) = frontend();
        type_keys(&mut frontend, ic, &["n", "i", "h", "a", "o", "space"]);
        type_keys(&mut frontend, ic, &["x", "y", "Return"]);
        assert_eq!(commits(&seen), vec!["你好", "xy"]);
    }

    #[test]
    fn test_punctuation_ends_composition() {
        let (mut frontend, ic, seen) = frontend();
        type_keys(&mut frontend, ic, &["d", "e", "comma"]);
        assert_eq!(commits(&seen), vec!["的", ","]);
        assert!(frontend.is_input_panel_empty(ic));
    }

    #[test]
    fn test_unhandled_keys() {
        let (mut frontend, ic, _seen) = frontend();
        let comma = Key::parse("comma").unwrap();
        assert!(!frontend.key_event(ic, &comma, false).unwrap());
        let backspace = Key::parse("BackSpace").unwrap();
        assert!(!frontend.key_event(ic, &backspace, false).unwrap());
        let ctrl_a = Key::parse("Control+a").unwrap();
        assert!(!frontend.key_event(ic, &ctrl_a, false).unwrap());
        let a = Key::parse("a").unwrap();
        assert!(!frontend.key_event(ic, &a, true).unwrap());
        assert!(frontend.is_input_panel_empty(ic));
    }

    #[test]
    fn test_editing_and_reset() {
        let (mut frontend, ic, seen) = frontend();
        type_keys(&mut frontend, ic, &["n", "x", "BackSpace", "i"]);
        assert_eq!(frontend.input_text(ic), Some("ni"));

        frontend.reset_input_panel(ic).unwrap();
        assert!(frontend.is_input_panel_empty(ic));
        let seen = seen.lock().unwrap();
        assert_eq!(seen[seen.len() - 2], ("candidates", Vec::new()));
    }

    #[test]
    fn test_unknown_input_context() {
        let (mut frontend, _ic, _seen) = frontend();
        let stranger = InputContextId::from_bytes([0xff; 16]);
        assert!(frontend.is_input_panel_empty(stranger));
        assert!(matches!(
            frontend.select_candidate(stranger, 0),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(frontend.reset_input_panel(stranger).is_err());
    }

    #[test]
    fn test_contexts_are_independent() {
        let (mut frontend, first, _seen) = frontend();
        let second = frontend.create_input_context("other").unwrap();
        assert_ne!(first, second);
        assert_eq!(frontend.program(second), Some("other"));

        type_keys(&mut frontend, first, &["w", "o"]);
        assert!(!frontend.is_input_panel_empty(first));
        assert!(frontend.is_input_panel_empty(second));
    }
}

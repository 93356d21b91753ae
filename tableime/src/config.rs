use serde::{Deserialize, Serialize};
use std::path::Path;

/// Behaviour of the table input method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    /// Candidates per page. Selection keys address the current page.
    pub page_size: usize,

    /// Keys selecting candidates on the current page, first key first.
    pub select_keys: String,

    /// Table file looked up in the language model directory.
    pub table_file: String,

    /// Longest code accepted into the input buffer.
    pub max_code_length: usize,

    /// Input methods this engine provides.
    pub input_methods: Vec<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            select_keys: "12345".to_string(),
            table_file: "table.toml".to_string(),
            max_code_length: 16,
            input_methods: vec!["pinyin".to_string(), "table".to_string()],
        }
    }
}

impl TableConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Index on the current page selected by `ch`, if it is a selection key.
    pub fn selection_key_index(&self, ch: char) -> Option<usize> {
        self.select_keys.chars().position(|c| c == ch)
    }

    pub fn provides(&self, input_method: &str) -> bool {
        self.input_methods.iter().any(|im| im == input_method)
    }
}

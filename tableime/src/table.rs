//! Code table mapping typed key sequences to phrases.
//!
//! Codes and phrases are NFC-normalized on insert, so a table written with
//! decomposed characters matches the same input as a precomposed one.
//!
//! Table files are TOML:
//!
//! ```toml
//! [[entry]]
//! code = "ni"
//! text = "你"
//! weight = 90
//! ```

use ahash::AHashMap;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// One phrase reachable by a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub code: String,
    pub text: String,
    #[serde(default)]
    pub weight: u32,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct TableFile {
    #[serde(default)]
    entry: Vec<TableEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    // code -> entries, kept sorted by descending weight
    by_code: AHashMap<String, Vec<TableEntry>>,
    codes: Vec<String>,
}

fn normalize(s: &str) -> String {
    s.nfc().collect::<String>().trim().to_string()
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small pinyin table used when no table file is installed.
    pub fn builtin() -> Self {
        const ENTRIES: &[(&str, &str, u32)] = &[
            ("ni", "你", 90),
            ("ni", "尼", 40),
            ("ni", "拟", 30),
            ("ni", "泥", 20),
            ("hao", "好", 90),
            ("hao", "号", 50),
            ("hao", "毫", 20),
            ("nihao", "你好", 100),
            ("zhong", "中", 90),
            ("zhong", "种", 50),
            ("zhong", "重", 40),
            ("guo", "国", 90),
            ("guo", "过", 60),
            ("zhongguo", "中国", 100),
            ("wo", "我", 90),
            ("wo", "握", 20),
            ("ai", "爱", 90),
            ("ai", "矮", 20),
            ("woaini", "我爱你", 100),
            ("shi", "是", 90),
            ("shi", "时", 70),
            ("shi", "事", 60),
            ("shi", "十", 50),
            ("shi", "市", 40),
            ("shi", "使", 30),
            ("shi", "式", 20),
            ("jie", "界", 60),
            ("jie", "姐", 50),
            ("shijie", "世界", 100),
            ("de", "的", 95),
            ("de", "得", 60),
            ("men", "们", 80),
            ("women", "我们", 100),
        ];

        let mut table = Self::new();
        for (code, text, weight) in ENTRIES {
            table.insert(code, text, *weight);
        }
        table
    }

    /// Load a table from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading table {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing table {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let file: TableFile = toml::from_str(content)?;
        let mut table = Self::new();
        for entry in file.entry {
            table.insert(&entry.code, &entry.text, entry.weight);
        }
        Ok(table)
    }

    /// Add a phrase. Entries with an empty code or text are ignored, and a
    /// repeated phrase keeps the higher weight.
    pub fn insert(&mut self, code: &str, text: &str, weight: u32) {
        let code = normalize(code);
        let text = normalize(text);
        if code.is_empty() || text.is_empty() {
            return;
        }

        let entries = self.by_code.entry(code.clone()).or_insert_with(|| {
            let at = self.codes.binary_search(&code).unwrap_or_else(|i| i);
            self.codes.insert(at, code.clone());
            Vec::new()
        });
        match entries.iter_mut().find(|e| e.text == text) {
            Some(existing) => existing.weight = existing.weight.max(weight),
            None => entries.push(TableEntry { code, text, weight }),
        }
        entries.sort_by(|a, b| b.weight.cmp(&a.weight));
    }

    pub fn len(&self) -> usize {
        self.by_code.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Whether some code starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let prefix = normalize(prefix);
        let at = self.codes.partition_point(|c| c.as_str() < prefix.as_str());
        self.codes.get(at).is_some_and(|c| c.starts_with(&prefix))
    }

    /// Phrases for `input`: exact matches by weight, then completions of
    /// longer codes by weight. Each phrase appears once.
    pub fn lookup(&self, input: &str) -> Vec<String> {
        let input = normalize(input);
        if input.is_empty() {
            return Vec::new();
        }

        let mut out: Vec<String> = self
            .by_code
            .get(&input)
            .map(|entries| entries.iter().map(|e| e.text.clone()).collect())
            .unwrap_or_default();

        let start = self.codes.partition_point(|c| c.as_str() <= input.as_str());
        let mut completions: Vec<&TableEntry> = self.codes[start..]
            .iter()
            .take_while(|c| c.starts_with(&input))
            .filter_map(|c| self.by_code.get(c))
            .flatten()
            .collect();
        completions.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.code.len().cmp(&b.code.len())));

        for entry in completions {
            if !out.contains(&entry.text) {
                out.push(entry.text.clone());
            }
        }
        out
    }
}

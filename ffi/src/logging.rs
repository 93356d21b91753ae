//! Process-wide logging setup for embedded use.
//!
//! With a host log function, `tracing` output goes to the host under the
//! bridge tag and the process's stdout/stderr are relayed under the engine
//! tag. Without one, `tracing` writes to stderr and nothing is relayed.

use crate::host::{CHostLog, HostLogFn};
use fcitx_bridge_core::{BridgeConfig, LogRelay};
use std::io;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

static RELAY: OnceLock<Option<LogRelay>> = OnceLock::new();

/// Install logging once; later calls are no-ops.
pub fn init(log: Option<HostLogFn>, config: &BridgeConfig) {
    RELAY.get_or_init(|| install(log, config));
}

pub fn is_relaying() -> bool {
    matches!(RELAY.get(), Some(Some(relay)) if !relay.is_finished())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn install(log: Option<HostLogFn>, config: &BridgeConfig) -> Option<LogRelay> {
    let Some(log) = log else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(io::stderr)
            .try_init();
        return None;
    };

    let sink = CHostLog::new(log);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_writer(HostWriter::new(sink, &config.bridge_log_tag))
        .try_init();
    relay_stdio(sink, &config.engine_log_tag)
}

#[cfg(unix)]
fn relay_stdio(sink: CHostLog, tag: &str) -> Option<LogRelay> {
    match LogRelay::capture_stdio(tag, sink) {
        Ok(relay) => Some(relay),
        Err(err) => {
            tracing::warn!(error = %err, "cannot relay stdout/stderr");
            None
        }
    }
}

#[cfg(not(unix))]
fn relay_stdio(_sink: CHostLog, _tag: &str) -> Option<LogRelay> {
    None
}

/// `MakeWriter` that hands each formatted event to the host as one line.
#[derive(Clone)]
pub struct HostWriter {
    sink: CHostLog,
    tag: Arc<str>,
}

impl HostWriter {
    pub fn new(sink: CHostLog, tag: &str) -> Self {
        Self {
            sink,
            tag: Arc::from(tag),
        }
    }
}

impl<'a> MakeWriter<'a> for HostWriter {
    type Writer = HostLine;

    fn make_writer(&'a self) -> HostLine {
        HostLine {
            sink: self.sink,
            tag: self.tag.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one event; sent when dropped.
pub struct HostLine {
    sink: CHostLog,
    tag: Arc<str>,
    buf: Vec<u8>,
}

impl io::Write for HostLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for HostLine {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let text = text.trim_end();
        if !text.is_empty() {
            self.sink.log(&self.tag, text);
        }
    }
}

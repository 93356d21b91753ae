use anyhow::{anyhow, Context};
use clap::Parser;
use fcitx_bridge_core::notification::{
    KIND_AUX_TEXT, KIND_CANDIDATE_LIST, KIND_COMMIT_STRING, KIND_PREEDIT,
};
use fcitx_bridge_core::{AppPaths, Bridge, BridgeConfig, HostNotifier, Key};
use fcitx_tableime::{TableConfig, TableEngineFactory};
use serde::Serialize;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Run the table engine behind the bridge and type into it from stdin.
///
/// Each line is either a command (`:select N`, `:reset`, `:empty`, `:quit`)
/// or whitespace separated keys. A key is a descriptor such as `BackSpace`
/// or `Control+a`; any other word is typed character by character.
/// Notifications are printed to stdout as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "fcitx-tableime", version)]
struct Args {
    /// Application data directory (holds fcitx5/libime/table.toml).
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Addon library directory. Defaults to <data-dir>/lib.
    #[arg(long)]
    lib_dir: Option<PathBuf>,

    /// Writable directory for user config and state.
    #[arg(long, default_value = ".")]
    ext_dir: PathBuf,

    /// Bridge configuration (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Table engine configuration (TOML).
    #[arg(long)]
    table_config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Notification<'a> {
    kind: &'static str,
    args: &'a [String],
}

fn kind_name(kind: i32) -> &'static str {
    match kind {
        KIND_CANDIDATE_LIST => "candidates",
        KIND_COMMIT_STRING => "commit",
        KIND_PREEDIT => "preedit",
        KIND_AUX_TEXT => "aux",
        _ => "unknown",
    }
}

fn print_notification(kind: i32, args: &[String]) {
    let line = Notification {
        kind: kind_name(kind),
        args,
    };
    match serde_json::to_string(&line) {
        Ok(json) => println!("{}", json),
        Err(err) => tracing::error!(error = %err, "cannot encode notification"),
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn send_keys(bridge: &Bridge<TableEngineFactory>, line: &str) {
    for word in line.split_whitespace() {
        if Key::parse(word).is_ok() {
            bridge.send_key(word);
        } else {
            word.chars().for_each(|c| bridge.send_key_char(c));
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    let config = match &args.config {
        Some(path) => BridgeConfig::load_toml(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    let table_config = match &args.table_config {
        Some(path) => TableConfig::load_toml(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TableConfig::default(),
    };

    let lib_dir = args
        .lib_dir
        .clone()
        .unwrap_or_else(|| args.data_dir.join("lib"));
    let paths = AppPaths::new(args.data_dir.clone(), lib_dir, args.ext_dir.clone());

    let bridge = Arc::new(Bridge::with_config(
        TableEngineFactory::new(table_config),
        config,
    ));
    let notifier: Arc<dyn HostNotifier> = Arc::new(print_notification);

    let engine = {
        let bridge = bridge.clone();
        thread::Builder::new()
            .name("fcitx-engine".to_string())
            .spawn(move || bridge.startup(&paths, notifier))
            .context("spawning engine thread")?
    };

    while !bridge.is_running() {
        if engine.is_finished() {
            let status = engine
                .join()
                .map_err(|_| anyhow!("engine thread panicked"))?;
            anyhow::bail!("engine stopped during startup (status {})", status.code());
        }
        thread::sleep(Duration::from_millis(5));
    }
    eprintln!("Ready. Type keys, or :select N, :reset, :empty, :quit");

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        let mut words = line.split_whitespace();
        match words.next() {
            None => continue,
            Some(":quit") => break,
            Some(":reset") => bridge.reset_input_panel(),
            Some(":empty") => println!(
                "{}",
                serde_json::json!({ "empty": bridge.is_input_panel_empty() })
            ),
            Some(":select") => match words.next().map(str::parse::<i32>) {
                Some(Ok(index)) => bridge.select_candidate(index),
                _ => eprintln!("usage: :select N"),
            },
            Some(_) => send_keys(&bridge, line),
        }
        if !bridge.is_running() {
            break;
        }
    }

    bridge.shutdown();
    let status = engine
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?;
    tracing::info!(code = status.code(), "engine stopped");
    if status.code() != 0 {
        std::process::exit(status.code());
    }
    Ok(())
}

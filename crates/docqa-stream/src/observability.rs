//! Process-wide tracing setup for binaries and examples built on this crate.
//!
//! Environment variables:
//! - `DOCQA_OBSERVABILITY_ENABLED`: enable/disable flag (default enabled).
//! - `DOCQA_LOG_LEVEL`: level or filter directive; falls back to `RUST_LOG`, then `info`.
//! - `DOCQA_JSON_LOG_PATH`: write JSONL logs to this file instead of compact console output.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const ENABLED_ENV: &str = "DOCQA_OBSERVABILITY_ENABLED";
const LEVEL_ENV: &str = "DOCQA_LOG_LEVEL";
const JSON_PATH_ENV: &str = "DOCQA_JSON_LOG_PATH";
const DEFAULT_LOG_FILE: &str = "docqa.logs.jsonl";

/// Where log lines go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact human-readable lines on stderr.
    Console,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservabilitySettings {
    pub enabled: bool,
    /// `EnvFilter` directive, when one was configured.
    pub filter: Option<String>,
    pub output: LogOutput,
}

impl ObservabilitySettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup(ENABLED_ENV)
            .map(|value| parse_bool(&value).unwrap_or(true))
            .unwrap_or(true);
        let filter = lookup(LEVEL_ENV).filter(|value| !value.trim().is_empty());
        let output = match lookup(JSON_PATH_ENV).filter(|value| !value.trim().is_empty()) {
            Some(path) => LogOutput::JsonFile(PathBuf::from(path)),
            None => LogOutput::Console,
        };
        Self {
            enabled,
            filter,
            output,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(filter) = self.filter.as_deref()
            && let Ok(filter) = EnvFilter::try_new(filter)
        {
            return filter;
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Installs the global subscriber once per process using [`ObservabilitySettings::from_env`].
pub fn init_observability() {
    INIT.get_or_init(|| install(&ObservabilitySettings::from_env()));
}

fn install(settings: &ObservabilitySettings) {
    if !settings.enabled {
        return;
    }
    let filter = settings.env_filter();
    match &settings.output {
        LogOutput::JsonFile(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let _ = std::fs::create_dir_all(dir);
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_LOG_FILE);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(tracing_appender::rolling::never(dir, file_name));
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init();
        }
        LogOutput::Console => {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init();
        }
    }
}

use crate::errors::ConfigError;

/// Environment variable overriding [`StreamConfig::max_line_bytes`].
///
/// `0`, `off` or `none` disables the limit.
pub const MAX_LINE_BYTES_ENV: &str = "DOCQA_STREAM_MAX_LINE_BYTES";

const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Per-session stream settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Largest accepted line, newline excluded. `None` means unbounded.
    pub max_line_bytes: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: Some(DEFAULT_MAX_LINE_BYTES),
        }
    }
}

impl StreamConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_LINE_BYTES_ENV) {
            config.max_line_bytes = parse_line_limit(MAX_LINE_BYTES_ENV, &raw)?;
        }
        Ok(config)
    }

    /// Overrides the line limit.
    pub fn max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = Some(limit);
        self
    }

    /// Removes the line limit.
    pub fn unbounded_lines(mut self) -> Self {
        self.max_line_bytes = None;
        self
    }
}

pub(crate) fn parse_line_limit(key: &str, raw: &str) -> Result<Option<usize>, ConfigError> {
    let value = raw.trim();
    match value.to_ascii_lowercase().as_str() {
        "" => Ok(Some(DEFAULT_MAX_LINE_BYTES)),
        "0" | "off" | "none" => Ok(None),
        _ => value
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                reason: format!("{value:?}: {e}"),
            }),
    }
}

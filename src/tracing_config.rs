//! Process-wide tracing setup.
//!
//! The engine only emits events; this module decides where they go. Two
//! variables drive it:
//!
//! - `TG_LOG`: an `EnvFilter` directive list (falls back to `RUST_LOG`);
//!   nothing is installed when neither is set.
//! - `TG_LOG_FORMAT`: `text`, `tree` or `json`.
//!
//! Useful targets are `tg_core::inhabit` (derived rules, stale memo
//! entries, contradictions), `tg_core::application` (each reduction step)
//! and `typegraph::query`, which carries one start/end pair per public query
//! and is meant to be read as JSON:
//!
//! ```bash
//! TG_LOG=typegraph::query=trace TG_LOG_FORMAT=json cargo test
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Output shape of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// Indented span tree, for following one solver run by eye.
    Tree,
    /// One object per line, for query traces.
    Json,
}

impl LogFormat {
    /// Unrecognised values fall back to text.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tree" => LogFormat::Tree,
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// What [`init_tracing`] would install, resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub directives: String,
    pub format: LogFormat,
}

impl TracingConfig {
    /// `None` when logging was not asked for.
    pub fn from_vars(
        tg_log: Option<&str>,
        rust_log: Option<&str>,
        format: Option<&str>,
    ) -> Option<Self> {
        let directives = tg_log.or(rust_log)?;
        Some(TracingConfig {
            directives: directives.to_string(),
            format: format.map(LogFormat::parse).unwrap_or_default(),
        })
    }

    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok();
        let (tg_log, rust_log, format) = (var("TG_LOG"), var("RUST_LOG"), var("TG_LOG_FORMAT"));
        TracingConfig::from_vars(tg_log.as_deref(), rust_log.as_deref(), format.as_deref())
    }

    /// Install as the global subscriber, writing to stderr. Returns `false`
    /// if another subscriber got there first.
    pub fn install(&self) -> bool {
        let filter = EnvFilter::builder().parse_lossy(&self.directives);
        match self.format {
            LogFormat::Text => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .is_ok(),
            LogFormat::Tree => Registry::default()
                .with(filter)
                .with(
                    tracing_tree::HierarchicalLayer::default()
                        .with_indent_amount(2)
                        .with_indent_lines(true)
                        .with_targets(true),
                )
                .try_init()
                .is_ok(),
            LogFormat::Json => Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .is_ok(),
        }
    }
}

/// Install the subscriber described by the environment, if any. Safe to call
/// from every test; only the first call installs anything.
pub fn init_tracing() {
    let Some(config) = TracingConfig::from_env() else {
        return;
    };
    if !config.install() {
        tracing::debug!(format = ?config.format, "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, TracingConfig};

    #[test]
    fn formats_parse_leniently() {
        assert_eq!(LogFormat::parse("tree"), LogFormat::Tree);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("fancy"), LogFormat::Text);
    }

    #[test]
    fn engine_variable_wins_over_rust_log() {
        assert_eq!(TracingConfig::from_vars(None, None, Some("json")), None);

        let config = TracingConfig::from_vars(
            Some("tg_core::inhabit=debug"),
            Some("warn"),
            Some("tree"),
        )
        .expect("TG_LOG is set");
        assert_eq!(config.directives, "tg_core::inhabit=debug");
        assert_eq!(config.format, LogFormat::Tree);

        let fallback = TracingConfig::from_vars(None, Some("warn"), None).expect("RUST_LOG is set");
        assert_eq!(fallback.directives, "warn");
        assert_eq!(fallback.format, LogFormat::Text);
    }
}

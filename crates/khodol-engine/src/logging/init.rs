use std::sync::Once;

/// Variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "KHODOL_LOG_LEVEL";

/// Filter applied when neither variable is set.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "khodol_engine=debug,wgpu_core=warn") and wins over the environment.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(
            config.env_filter,
            std::env::var(LOG_ENV).ok(),
            std::env::var("RUST_LOG").ok(),
        );

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        // A logger installed by the host (tests, embedding app) keeps precedence.
        if builder.try_init().is_ok() {
            log::debug!("logging initialized ({filter})");
        }
    });
}

/// explicit > `KHODOL_LOG_LEVEL` > `RUST_LOG` > [`DEFAULT_FILTER`]; blank
/// values count as unset.
fn resolve_filter(explicit: Option<String>, khodol: Option<String>, rust_log: Option<String>) -> String {
    [explicit, khodol, rust_log]
        .into_iter()
        .flatten()
        .find(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

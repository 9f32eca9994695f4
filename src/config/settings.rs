use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Default collector API prefix
pub const DEFAULT_API_PREFIX: &str = "https://app.getlibretto.com/api";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where events go and how failures are logged
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Base URL; events are posted to `{api_prefix}/event`
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Full event URL, overrides `api_prefix` when set
    #[serde(default)]
    pub url: Option<String>,
    /// Log every dispatch failure, bypassing the status policy
    #[serde(default)]
    pub debug: bool,
}

impl ReportingConfig {
    /// URL for the named collector API
    pub fn endpoint(&self, api_name: &str) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("{}/{}", self.api_prefix.trim_end_matches('/'), api_name),
        }
    }

    /// URL events are posted to
    pub fn event_url(&self) -> String {
        self.endpoint("event")
    }
}

/// Concurrency and backpressure limits for event dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Maximum concurrent sends
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Maximum sends waiting for a slot before new ones are rejected
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

fn default_concurrency_limit() -> usize {
    25
}

fn default_max_pending() -> usize {
    1000
}

fn default_request_timeout_ms() -> u64 {
    30_000 // 30 seconds
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("reporting.api_prefix", DEFAULT_API_PREFIX)?
            .set_default("reporting.debug", false)?
            .set_default("dispatch.concurrency_limit", 25)?
            .set_default("dispatch.max_pending", 1000)?
            .set_default("dispatch.request_timeout_ms", 30_000)?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // PROMPTLINE_REPORTING__URL, PROMPTLINE_REPORTING__DEBUG, PROMPTLINE_DISPATCH__MAX_PENDING, ...
            .add_source(
                Environment::with_prefix("PROMPTLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            url: None,
            debug: false,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            max_pending: default_max_pending(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

mod settings;

pub use settings::{DispatchConfig, LoggingConfig, ReportingConfig, Settings, DEFAULT_API_PREFIX};

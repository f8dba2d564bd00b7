//! Application configuration.
//!
//! Settings are organized into TOML sections with serde defaults, so a
//! missing file or a partial file always yields a usable configuration.

mod settings;

pub use settings::{
    ConfigError, EngineSettings, MonitorSettings, PathSettings, ServiceSettings, Settings,
    VideoSettings,
};

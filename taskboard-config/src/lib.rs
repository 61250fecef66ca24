//! Taskboard configuration management using Figment
//!
//! Configuration for the board synchronization engine is assembled from
//! layered sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults ([`SyncConfig::default`])
//! 2. An optional configuration file (TOML, YAML or JSON, by extension)
//! 3. Environment variables prefixed with `TASKBOARD_`, where `__` separates
//!    nested keys (`TASKBOARD_DRAG__MIN_DISTANCE_PX=8`)
//!
//! # Quick Start
//!
//! ```no_run
//! use taskboard_config::ConfigProvider;
//!
//! let config = ConfigProvider::new().with_file("taskboard.toml").load()?;
//! assert!(config.reconciler.max_buffered_events > 0);
//! # Ok::<(), taskboard_config::ConfigError>(())
//! ```
//!
//! ## Example TOML Configuration
//!
//! ```toml
//! [drag]
//! min_distance_px = 6.0
//!
//! [reconciler]
//! resolved_history_limit = 512
//! max_buffered_events = 16
//!
//! [logging]
//! filter = "taskboard_sync=debug"
//! ```

pub mod error;
pub mod provider;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use provider::{ConfigFormat, ConfigProvider, ENV_PREFIX};
pub use types::{DragConfig, LoggingConfig, ReconcilerConfig, SyncConfig};

/// Load configuration from defaults and environment only
pub fn load_configuration() -> ConfigResult<SyncConfig> {
    ConfigProvider::new().load()
}

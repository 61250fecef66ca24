//! Configuration types for the board synchronization engine

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use taskboard_common::{init_tracing, LoggingInitError};

/// Top-level configuration for one board session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    pub drag: DragConfig,
    pub reconciler: ReconcilerConfig,
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Reject values the engine cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.drag.min_distance_px.is_finite() || self.drag.min_distance_px < 0.0 {
            return Err(ConfigError::invalid_value(
                "drag.min_distance_px",
                format!("expected a non-negative distance, got {}", self.drag.min_distance_px),
            ));
        }
        if self.reconciler.max_buffered_events == 0 {
            return Err(ConfigError::invalid_value(
                "reconciler.max_buffered_events",
                "at least one remote event must be bufferable",
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.filter", "must not be empty"));
        }
        Ok(())
    }
}

/// Drag gesture thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Pointer travel (in pixels) below which a drop is treated as a click
    pub min_distance_px: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            min_distance_px: 4.0,
        }
    }
}

/// Bounds for the mutation reconciler's bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// How many resolved client mutation ids are remembered for echo suppression
    pub resolved_history_limit: usize,
    /// How many remote events may wait behind one task's pending mutation
    pub max_buffered_events: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            resolved_history_limit: 256,
            max_buffered_events: 32,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing-subscriber `EnvFilter` directive string
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber with this filter
    pub fn install(&self) -> Result<(), LoggingInitError> {
        init_tracing(&self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.drag.min_distance_px, 4.0);
        assert_eq!(config.reconciler.resolved_history_limit, 256);
        assert_eq!(config.reconciler.max_buffered_events, 32);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_negative_distance_rejected() {
        let mut config = SyncConfig::default();
        config.drag.min_distance_px = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "drag.min_distance_px"
        ));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let mut config = SyncConfig::default();
        config.reconciler.max_buffered_events = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"drag": {"min_distance_px": 10.0}}"#).unwrap();
        assert_eq!(config.drag.min_distance_px, 10.0);
        assert_eq!(config.reconciler, ReconcilerConfig::default());
    }
}

//! Simulator configuration.
//!
//! Loaded from TOML. Every section is optional and falls back to the
//! defaults below:
//!
//! ```toml
//! tool_length_offset = 25.0
//! frame_rate = 30
//! object_path = "scans/bust.stl"
//!
//! [limits.x]
//! min = 0.0
//! max = 100.0
//!
//! [scan]
//! radius = 30.0
//! period_secs = 12.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::kinematics::TOOL_LENGTH_OFFSET;
use crate::machine::MachineLimits;
use crate::scan::ScanPath;

/// Top-level simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Gimbal centre to tool tip, machine units
    pub tool_length_offset: f64,
    /// Target frames per second for the render loop
    pub frame_rate: u32,
    /// Optional STL of the scanned object placed on the bed
    pub object_path: Option<PathBuf>,
    pub limits: MachineLimits,
    pub scan: ScanPath,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tool_length_offset: TOOL_LENGTH_OFFSET,
            frame_rate: 30,
            object_path: None,
            limits: MachineLimits::default(),
            scan: ScanPath::default(),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded simulator config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tool_length_offset.is_finite() && self.tool_length_offset > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "tool_length_offset",
                reason: format!("must be positive, got {}", self.tool_length_offset),
            });
        }
        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "frame_rate",
                reason: "must be at least 1".to_string(),
            });
        }
        self.limits.validate()?;
        self.scan.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{Axis, AxisLimit};
    use std::io::Write;

    #[test]
    fn test_empty_toml_is_default() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = SimConfig::from_toml_str(
            r#"
            tool_length_offset = 40.0

            [limits.a]
            min = -30.0
            max = 30.0

            [scan]
            radius = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.tool_length_offset, 40.0);
        assert_eq!(config.limits.get(Axis::A), AxisLimit::new(-30.0, 30.0));
        assert_eq!(config.limits.get(Axis::B), AxisLimit::new(-180.0, 180.0));
        assert_eq!(config.scan.radius, 10.0);
        assert_eq!(config.scan.period_secs, 12.0);
    }

    #[test]
    fn test_rejects_bad_limits() {
        let err = SimConfig::from_toml_str(
            r#"
            [limits.x]
            min = 10.0
            max = 0.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLimit { axis: Axis::X, .. }));
    }

    #[test]
    fn test_rejects_zero_tool_length() {
        let err = SimConfig::from_toml_str("tool_length_offset = 0.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "tool_length_offset",
                ..
            }
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SimConfig::default();
        config.object_path = Some(PathBuf::from("scan.stl"));
        let text = config.to_toml_string().unwrap();
        assert_eq!(SimConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "frame_rate = 60").unwrap();
        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.frame_rate, 60);

        let missing = SimConfig::load("/nonexistent/gantry.toml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}

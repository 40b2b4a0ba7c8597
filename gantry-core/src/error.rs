//! Error types for the simulator core.
//!
//! Kinematics is total over real inputs and never fails; errors only come
//! from loading configuration or meshes and from misdirected controller calls.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::machine::Axis;

/// Errors raised while loading or validating a [`crate::config::SimConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized.
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An axis limit pair is unusable.
    #[error("Invalid limit on {axis}: min {min} must be finite and below max {max}")]
    InvalidLimit { axis: Axis, min: f64, max: f64 },

    /// A scalar setting is out of its domain.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Errors raised while parsing STL meshes.
#[derive(Error, Debug)]
pub enum StlError {
    #[error("File too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("Unexpected end of file after {parsed} of {expected} triangles")]
    Truncated { parsed: usize, expected: usize },

    #[error("Failed to parse ASCII STL: {0}")]
    Ascii(String),

    #[error("Failed to read STL {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors returned by [`crate::simulator::Simulator`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// TCP-space writes only exist for the linear axes.
    #[error("Axis {0} is rotary and has no TCP-space coordinate")]
    NotLinear(Axis),
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;

/// Machine state and axis limits for the 5-axis gantry
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;

/// One of the five machine axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
    /// Gimbal tilt, degrees
    A,
    /// Gimbal rotation about the vertical, degrees
    B,
}

impl Axis {
    pub const ALL: [Axis; 5] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B];
    pub const LINEAR: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::A => "A",
            Axis::B => "B",
        }
    }

    pub fn is_linear(self) -> bool {
        matches!(self, Axis::X | Axis::Y | Axis::Z)
    }

    /// Component index into a 3D vector, for linear axes only
    pub fn vector_index(self) -> Option<usize> {
        match self {
            Axis::X => Some(0),
            Axis::Y => Some(1),
            Axis::Z => Some(2),
            Axis::A | Axis::B => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            "a" => Ok(Axis::A),
            "b" => Ok(Axis::B),
            other => Err(format!("unknown axis '{other}'")),
        }
    }
}

/// Closed `[min, max]` range for one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimit {
    pub min: f64,
    pub max: f64,
}

impl AxisLimit {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Saturate `value` into the range. NaN saturates to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Per-axis limits, shared by every write path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineLimits {
    pub x: AxisLimit,
    pub y: AxisLimit,
    pub z: AxisLimit,
    pub a: AxisLimit,
    pub b: AxisLimit,
}

impl MachineLimits {
    pub fn get(&self, axis: Axis) -> AxisLimit {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::A => self.a,
            Axis::B => self.b,
        }
    }

    pub fn clamp(&self, axis: Axis, value: f64) -> f64 {
        self.get(axis).clamp(value)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for axis in Axis::ALL {
            let AxisLimit { min, max } = self.get(axis);
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(ConfigError::InvalidLimit { axis, min, max });
            }
        }
        Ok(())
    }
}

impl Default for MachineLimits {
    fn default() -> Self {
        Self {
            x: AxisLimit::new(0.0, 100.0),
            y: AxisLimit::new(0.0, 100.0),
            z: AxisLimit::new(0.0, 100.0),
            a: AxisLimit::new(-45.0, 45.0),
            b: AxisLimit::new(-180.0, 180.0),
        }
    }
}

/// Raw motor-space coordinates. Axes are stored independently; any coupling
/// between them comes from [`crate::kinematics::Kinematics`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MachineState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
}

/// A single axis write, routed through [`MachineState::apply`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisUpdate {
    pub axis: Axis,
    pub value: f64,
}

impl AxisUpdate {
    pub fn new(axis: Axis, value: f64) -> Self {
        Self { axis, value }
    }
}

impl MachineState {
    pub const fn new(x: f64, y: f64, z: f64, a: f64, b: f64) -> Self {
        Self { x, y, z, a, b }
    }

    /// All axes at zero
    pub const fn home() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::A => self.a,
            Axis::B => self.b,
        }
    }

    pub(crate) fn set_raw(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
            Axis::A => self.a = value,
            Axis::B => self.b = value,
        }
    }

    /// Clamp `update` against `limits` and store it. Returns the stored value.
    pub fn apply(&mut self, update: AxisUpdate, limits: &MachineLimits) -> f64 {
        let stored = limits.clamp(update.axis, update.value);
        if stored != update.value {
            debug!(axis = %update.axis, requested = update.value, stored, "axis write clamped");
        }
        trace!(axis = %update.axis, value = stored, "axis write");
        self.set_raw(update.axis, stored);
        stored
    }

    /// Copy of this state with every axis clamped into `limits`
    pub fn clamped(&self, limits: &MachineLimits) -> Self {
        let mut out = *self;
        for axis in Axis::ALL {
            out.set_raw(axis, limits.clamp(axis, self.get(axis)));
        }
        out
    }

    pub fn within(&self, limits: &MachineLimits) -> bool {
        Axis::ALL
            .iter()
            .all(|&axis| limits.get(axis).contains(self.get(axis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_parse() {
        assert_eq!("x".parse::<Axis>(), Ok(Axis::X));
        assert_eq!(" B ".parse::<Axis>(), Ok(Axis::B));
        assert!("w".parse::<Axis>().is_err());
    }

    #[test]
    fn test_clamp_saturates() {
        let limit = AxisLimit::new(-45.0, 45.0);
        assert_eq!(limit.clamp(90.0), 45.0);
        assert_eq!(limit.clamp(-90.0), -45.0);
        assert_eq!(limit.clamp(12.5), 12.5);
        assert_eq!(limit.clamp(f64::NAN), -45.0);
    }

    #[test]
    fn test_apply_clamps_and_stores() {
        let limits = MachineLimits::default();
        let mut state = MachineState::home();

        let stored = state.apply(AxisUpdate::new(Axis::X, 150.0), &limits);
        assert_eq!(stored, 100.0);
        assert_eq!(state.x, 100.0);

        state.apply(AxisUpdate::new(Axis::B, -200.0), &limits);
        assert_eq!(state.b, -180.0);
        assert!(state.within(&limits));
    }

    #[test]
    fn test_axes_are_independent() {
        let limits = MachineLimits::default();
        let mut state = MachineState::new(10.0, 20.0, 30.0, 5.0, 6.0);
        state.apply(AxisUpdate::new(Axis::A, -10.0), &limits);
        assert_eq!(state, MachineState::new(10.0, 20.0, 30.0, -10.0, 6.0));
    }

    #[test]
    fn test_validate_rejects_inverted_limit() {
        let mut limits = MachineLimits::default();
        limits.z = AxisLimit::new(10.0, 10.0);
        assert!(matches!(
            limits.validate(),
            Err(ConfigError::InvalidLimit { axis: Axis::Z, .. })
        ));
        assert!(MachineLimits::default().validate().is_ok());
    }
}

//! Auto-scan demo: a canned orbit around the scan target.
//!
//! [`ScanPath`] turns elapsed time into a machine state. [`ScanSession`]
//! decides whether a computed frame may still be written: stopping bumps the
//! generation, so a frame computed before the stop can never apply after it.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::machine::MachineState;

/// Parametric orbit: circle in XY, sinusoidal Z and tilt, heading locked on
/// the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPath {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// Seconds per full orbit
    pub period_secs: f64,
    pub base_z: f64,
    pub z_amplitude: f64,
    /// Z oscillations per orbit
    pub z_cycles: f64,
    /// Degrees
    pub base_tilt: f64,
    /// Degrees
    pub tilt_amplitude: f64,
    /// Tilt oscillations per orbit
    pub tilt_cycles: f64,
}

impl Default for ScanPath {
    fn default() -> Self {
        Self {
            center_x: 50.0,
            center_y: 50.0,
            radius: 30.0,
            period_secs: 12.0,
            base_z: 40.0,
            z_amplitude: 10.0,
            z_cycles: 3.0,
            base_tilt: 25.0,
            tilt_amplitude: 10.0,
            tilt_cycles: 2.0,
        }
    }
}

impl ScanPath {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.period_secs.is_finite() && self.period_secs > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "scan.period_secs",
                reason: format!("must be positive, got {}", self.period_secs),
            });
        }
        if !(self.radius.is_finite() && self.radius >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "scan.radius",
                reason: format!("must be non-negative, got {}", self.radius),
            });
        }
        Ok(())
    }

    /// Orbit angle in radians after `t_secs`
    pub fn phase(&self, t_secs: f64) -> f64 {
        TAU * t_secs / self.period_secs
    }

    /// Machine state at `t_secs` into the orbit. Unclamped; the caller writes
    /// it through the limit-checked path.
    pub fn sample(&self, t_secs: f64) -> MachineState {
        let theta = self.phase(t_secs);
        let x = self.center_x + self.radius * theta.cos();
        let y = self.center_y + self.radius * theta.sin();
        let z = self.base_z + self.z_amplitude * (self.z_cycles * theta).sin();
        let a = self.base_tilt + self.tilt_amplitude * (self.tilt_cycles * theta).sin();
        let b = heading_toward(x, y, self.center_x, self.center_y);
        MachineState::new(x, y, z, a, b)
    }
}

/// B angle, in degrees, that leans a positively tilted tool from `(x, y)`
/// toward `(tx, ty)`.
///
/// Under `Rz(-b) * Rx(a)` the tilt leans along `(sin b, cos b)`, so the
/// heading is a compass bearing measured from +Y toward +X.
pub fn heading_toward(x: f64, y: f64, tx: f64, ty: f64) -> f64 {
    (tx - x).atan2(ty - y).to_degrees()
}

/// A scan state tagged with the session generation that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanFrame {
    pub generation: u64,
    pub elapsed_secs: f64,
    pub state: MachineState,
}

/// Run/stop bookkeeping for the auto-scan loop
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    active: bool,
    generation: u64,
    started_at: f64,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin a new orbit at `now_secs`. Restarting discards frames from the
    /// previous run.
    pub fn start(&mut self, now_secs: f64) -> u64 {
        self.generation += 1;
        self.active = true;
        self.started_at = now_secs;
        debug!(generation = self.generation, "scan session started");
        self.generation
    }

    /// Halt immediately. Always invalidates outstanding frames.
    pub fn stop(&mut self) {
        if self.active {
            debug!(generation = self.generation, "scan session stopped");
        }
        self.active = false;
        self.generation += 1;
    }

    /// Compute the frame for `now_secs`, or `None` when not scanning
    pub fn frame(&self, path: &ScanPath, now_secs: f64) -> Option<ScanFrame> {
        if !self.active {
            return None;
        }
        let elapsed_secs = (now_secs - self.started_at).max(0.0);
        Some(ScanFrame {
            generation: self.generation,
            elapsed_secs,
            state: path.sample(elapsed_secs),
        })
    }

    /// Whether `frame` may still be written
    pub fn accepts(&self, frame: &ScanFrame) -> bool {
        self.active && frame.generation == self.generation
    }
}

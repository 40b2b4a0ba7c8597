//! Application controller owning the machine state.
//!
//! Manual edits and auto-scan frames both go through [`Simulator::write`],
//! the one place that clamps. Any manual edit stops the scan before writing,
//! so the operator always wins over the frame callback.

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, trace};

use crate::config::SimConfig;
use crate::error::{ConfigError, Result, SimError};
use crate::kinematics::{Kinematics, Pose, TcpSolution};
use crate::machine::{Axis, AxisUpdate, MachineLimits, MachineState};
use crate::readout::Readout;
use crate::scan::{ScanFrame, ScanPath, ScanSession};

/// Who is writing to the machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    Manual,
    Scan,
}

pub struct Simulator {
    state: MachineState,
    limits: MachineLimits,
    kinematics: Kinematics,
    scan_path: ScanPath,
    scan: ScanSession,
}

impl Simulator {
    pub fn new(config: &SimConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: MachineState::home().clamped(&config.limits),
            limits: config.limits,
            kinematics: Kinematics::new(config.tool_length_offset),
            scan_path: config.scan,
            scan: ScanSession::new(),
        })
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn limits(&self) -> &MachineLimits {
        &self.limits
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    pub fn scan_path(&self) -> &ScanPath {
        &self.scan_path
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.is_active()
    }

    fn write(&mut self, source: UpdateSource, update: AxisUpdate) -> f64 {
        if source == UpdateSource::Manual && self.scan.is_active() {
            info!(axis = %update.axis, "manual edit halts auto-scan");
            self.scan.stop();
        }
        self.state.apply(update, &self.limits)
    }

    /// Manual motor-space write. Returns the stored (clamped) value.
    pub fn set_axis(&mut self, axis: Axis, value: f64) -> f64 {
        self.write(UpdateSource::Manual, AxisUpdate::new(axis, value))
    }

    /// Manual write from user text. Malformed text is ignored and leaves the
    /// state and the scan untouched.
    pub fn set_axis_text(&mut self, axis: Axis, text: &str) -> Option<f64> {
        let value = parse_number(text)?;
        Some(self.set_axis(axis, value))
    }

    pub fn jog_axis(&mut self, axis: Axis, delta: f64) -> f64 {
        let target = self.state.get(axis) + delta;
        self.set_axis(axis, target)
    }

    /// Move every axis to zero (clamped)
    pub fn home(&mut self) {
        for axis in Axis::ALL {
            self.set_axis(axis, 0.0);
        }
    }

    /// Manual TCP-space write: back-solve the motor coordinate that puts the
    /// home-relative TCP at `target` on a linear axis.
    ///
    /// When the limit clamp kicks in, `realized` differs from `requested`.
    pub fn set_tcp(&mut self, axis: Axis, target: f64) -> Result<TcpSolution> {
        let solution = self
            .kinematics
            .solve_motor(axis, target, &self.state, &self.limits)
            .ok_or(SimError::NotLinear(axis))?;
        self.write(UpdateSource::Manual, AxisUpdate::new(axis, solution.motor));
        if solution.clamped {
            debug!(
                axis = %axis,
                requested = solution.requested,
                realized = solution.realized,
                "TCP target limited by axis travel"
            );
        }
        Ok(solution)
    }

    /// Like [`Simulator::set_tcp`], from user text. `Ok(None)` for malformed
    /// text.
    pub fn set_tcp_text(&mut self, axis: Axis, text: &str) -> Result<Option<TcpSolution>> {
        if !axis.is_linear() {
            return Err(SimError::NotLinear(axis));
        }
        match parse_number(text) {
            Some(value) => self.set_tcp(axis, value).map(Some),
            None => Ok(None),
        }
    }

    pub fn jog_tcp(&mut self, axis: Axis, delta: f64) -> Result<TcpSolution> {
        let index = axis.vector_index().ok_or(SimError::NotLinear(axis))?;
        let current = self.pose().translation()[index];
        self.set_tcp(axis, current + delta)
    }

    pub fn start_scan(&mut self, now_secs: f64) {
        let generation = self.scan.start(now_secs);
        info!(generation, "auto-scan started");
    }

    pub fn stop_scan(&mut self) {
        if self.scan.is_active() {
            info!("auto-scan stopped");
        }
        self.scan.stop();
    }

    pub fn toggle_scan(&mut self, now_secs: f64) {
        if self.scan.is_active() {
            self.stop_scan();
        } else {
            self.start_scan(now_secs);
        }
    }

    /// Compute the scan frame for `now_secs` without applying it
    pub fn scan_frame(&self, now_secs: f64) -> Option<ScanFrame> {
        self.scan.frame(&self.scan_path, now_secs)
    }

    /// Write a scan frame unless the scan was stopped or restarted since it
    /// was computed. Returns whether it was applied.
    pub fn apply_scan_frame(&mut self, frame: &ScanFrame) -> bool {
        if !self.scan.accepts(frame) {
            trace!(generation = frame.generation, "discarding stale scan frame");
            return false;
        }
        for axis in Axis::ALL {
            self.write(UpdateSource::Scan, AxisUpdate::new(axis, frame.state.get(axis)));
        }
        true
    }

    /// Per-frame callback. Returns whether the scan moved the machine.
    pub fn tick(&mut self, now_secs: f64) -> bool {
        match self.scan_frame(now_secs) {
            Some(frame) => self.apply_scan_frame(&frame),
            None => false,
        }
    }

    pub fn pose(&self) -> Pose {
        self.kinematics.forward(&self.state)
    }

    pub fn tool_offset(&self) -> Vector3<f64> {
        self.kinematics.tool_offset(self.state.a, self.state.b)
    }

    pub fn tcp(&self) -> Point3<f64> {
        self.kinematics.absolute_tcp(&self.state)
    }

    pub fn readout(&self) -> Readout {
        Readout::new(
            &self.state,
            &self.pose(),
            &self.tool_offset(),
            self.is_scanning(),
        )
    }
}

fn parse_number(text: &str) -> Option<f64> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            debug!(input = text, "ignoring malformed numeric input");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> Simulator {
        Simulator::new(&SimConfig::default()).unwrap()
    }

    #[test]
    fn test_set_axis_clamps() {
        let mut sim = simulator();
        assert_eq!(sim.set_axis(Axis::A, 60.0), 45.0);
        assert_eq!(sim.set_axis(Axis::Z, -5.0), 0.0);
        assert_eq!(sim.state().a, 45.0);
    }

    #[test]
    fn test_malformed_text_is_ignored() {
        let mut sim = simulator();
        sim.set_axis(Axis::X, 42.0);
        assert_eq!(sim.set_axis_text(Axis::X, "4x2"), None);
        assert_eq!(sim.set_axis_text(Axis::X, ""), None);
        assert_eq!(sim.set_axis_text(Axis::X, "NaN"), None);
        assert_eq!(sim.state().x, 42.0);
        assert_eq!(sim.set_axis_text(Axis::X, " 12.5 "), Some(12.5));
    }

    #[test]
    fn test_malformed_text_keeps_scan_running() {
        let mut sim = simulator();
        sim.start_scan(0.0);
        sim.set_axis_text(Axis::X, "abc");
        assert!(sim.is_scanning());
    }

    #[test]
    fn test_manual_edit_stops_scan() {
        let mut sim = simulator();
        sim.start_scan(0.0);
        assert!(sim.tick(0.5));
        sim.set_axis(Axis::Z, 5.0);
        assert!(!sim.is_scanning());
        assert!(!sim.tick(1.0));
        assert_eq!(sim.state().z, 5.0);
    }

    #[test]
    fn test_set_tcp_reaches_target() {
        let mut sim = simulator();
        sim.set_axis(Axis::X, 50.0);
        sim.set_axis(Axis::A, 30.0);
        sim.set_axis(Axis::B, 90.0);
        let solution = sim.set_tcp(Axis::X, 60.0).unwrap();
        assert!(!solution.clamped);
        assert!((sim.pose().translation().x - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_tcp_rotary_rejected() {
        let mut sim = simulator();
        assert_eq!(sim.set_tcp(Axis::B, 1.0), Err(SimError::NotLinear(Axis::B)));
        assert!(sim.set_tcp_text(Axis::A, "1").is_err());
    }

    #[test]
    fn test_jog_tcp() {
        let mut sim = simulator();
        sim.set_axis(Axis::Y, 50.0);
        sim.set_axis(Axis::A, 20.0);
        let before = sim.pose().translation().y;
        sim.jog_tcp(Axis::Y, 5.0).unwrap();
        assert!((sim.pose().translation().y - (before + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_home() {
        let mut sim = simulator();
        sim.set_axis(Axis::X, 10.0);
        sim.set_axis(Axis::B, 10.0);
        sim.home();
        assert_eq!(*sim.state(), MachineState::home());
    }

    #[test]
    fn test_scan_writes_are_clamped() {
        let config = SimConfig {
            scan: ScanPath {
                radius: 80.0,
                ..ScanPath::default()
            },
            ..SimConfig::default()
        };
        let mut sim = Simulator::new(&config).unwrap();
        sim.start_scan(0.0);
        for step in 0..50 {
            sim.tick(step as f64 * 0.25);
            assert!(sim.state().within(sim.limits()));
        }
    }
}

/// Forward-kinematics readout panel values
use std::fmt;

use nalgebra::Vector3;

use crate::kinematics::{clean_value, Pose};
use crate::machine::{Axis, MachineState};

/// Display-ready snapshot: every derived number has been through
/// [`clean_value`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readout {
    pub state: MachineState,
    /// Home-relative pose, row-major
    pub pose: [[f64; 4]; 4],
    /// Home-relative TCP position (the pose translation)
    pub tcp: [f64; 3],
    /// TCP displacement caused by gimbal rotation alone
    pub offset: [f64; 3],
    pub scanning: bool,
}

impl Readout {
    pub fn new(state: &MachineState, pose: &Pose, offset: &Vector3<f64>, scanning: bool) -> Self {
        let cleaned = pose.cleaned();
        let t = cleaned.translation();
        Self {
            state: *state,
            pose: cleaned.rows(),
            tcp: [t.x, t.y, t.z],
            offset: [
                clean_value(offset.x),
                clean_value(offset.y),
                clean_value(offset.z),
            ],
            scanning,
        }
    }

    /// Panel text, one entry per line
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(9);
        let axes = Axis::ALL
            .iter()
            .map(|&axis| format!("{}:{:>8.2}", axis, self.state.get(axis)))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(axes);
        lines.push(format!(
            "TCP  X:{:>8.2}  Y:{:>8.2}  Z:{:>8.2}",
            self.tcp[0], self.tcp[1], self.tcp[2]
        ));
        lines.push(format!(
            "OFS  X:{:>8.2}  Y:{:>8.2}  Z:{:>8.2}",
            self.offset[0], self.offset[1], self.offset[2]
        ));
        lines.push("Pose:".to_string());
        for row in &self.pose {
            lines.push(format!(
                "  [{:>8.2} {:>8.2} {:>8.2} {:>8.2}]",
                row[0], row[1], row[2], row[3]
            ));
        }
        lines.push(if self.scanning {
            "AUTO-SCAN".to_string()
        } else {
            "MANUAL".to_string()
        });
        lines
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

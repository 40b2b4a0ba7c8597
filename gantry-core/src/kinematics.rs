//! Forward kinematics and TCP offset for the X/Y/Z + A/B gimbal gantry.
//!
//! Machine frame: Z is vertical, the tool hangs `tool_length` below the
//! gimbal centre along the gimbal's local -Z. Poses are reported relative to
//! the home pose (all axes zero), so home reads as the origin.
//!
//! Everything here is pure: identical input gives identical output, and no
//! function has an error path.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::machine::{Axis, MachineLimits, MachineState};
use crate::transform::{GimbalRotation, Transform};

/// Default distance from the gimbal centre to the tool tip, machine units
pub const TOOL_LENGTH_OFFSET: f64 = 25.0;

/// Magnitudes below this are shown as exactly zero
pub const DISPLAY_EPSILON: f64 = 0.001;

/// Decimal places kept for display
pub const DISPLAY_DECIMALS: i32 = 2;

/// Normalize a value for display: snap float noise to zero, round to two
/// decimals, and never return negative zero.
pub fn clean_value(value: f64) -> f64 {
    if value.abs() < DISPLAY_EPSILON {
        return 0.0;
    }
    let scale = 10f64.powi(DISPLAY_DECIMALS);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Tool-centre-point pose relative to home.
///
/// The rotation block is the absolute gimbal rotation (home rotation is the
/// identity), the translation column is the displacement from the home TCP.
/// Storage is column-major, matching nalgebra.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub matrix: Matrix4<f64>,
}

impl Pose {
    pub fn translation(&self) -> Vector3<f64> {
        Transform::translation_of(&self.matrix)
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// The 16 matrix entries in column-major order
    pub fn to_column_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.matrix.as_slice());
        out
    }

    /// Copy with every entry passed through [`clean_value`]
    pub fn cleaned(&self) -> Pose {
        Pose {
            matrix: self.matrix.map(clean_value),
        }
    }

    /// Row-major view, convenient for printing
    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = self.matrix[(r, c)];
            }
        }
        rows
    }
}

/// Result of back-solving a TCP-space target to a motor coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TcpSolution {
    pub axis: Axis,
    /// TCP coordinate the caller asked for
    pub requested: f64,
    /// Motor coordinate after clamping
    pub motor: f64,
    /// TCP coordinate actually reached, `motor + offset`
    pub realized: f64,
    /// Whether the limit clamp moved the motor coordinate
    pub clamped: bool,
}

/// Gantry kinematic model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub tool_length: f64,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self::new(TOOL_LENGTH_OFFSET)
    }
}

impl Kinematics {
    pub fn new(tool_length: f64) -> Self {
        Self { tool_length }
    }

    /// Tool tip in the gimbal's local frame
    pub fn tool_vector(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -self.tool_length)
    }

    /// `T(x, y, z) * Rb * Ra * Tool` in absolute machine space
    pub fn raw_transform(&self, state: &MachineState) -> Matrix4<f64> {
        let t = Transform::translation_matrix(state.x, state.y, state.z);
        let gimbal = GimbalRotation::new(state.a, state.b).matrix();
        let tool = Transform::translation_matrix(0.0, 0.0, -self.tool_length);
        t * gimbal * tool
    }

    pub fn home_transform(&self) -> Matrix4<f64> {
        self.raw_transform(&MachineState::home())
    }

    /// TCP pose relative to home.
    ///
    /// The translation equals `raw.t - home.t`. It is assembled as
    /// `(x, y, z) + tool_offset(a, b)`, which is the same quantity but exact
    /// when both angles are zero.
    pub fn forward(&self, state: &MachineState) -> Pose {
        let mut matrix = self.raw_transform(state);
        let translation =
            Vector3::new(state.x, state.y, state.z) + self.tool_offset(state.a, state.b);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Pose { matrix }
    }

    /// How far the TCP sits from the raw motor position because of gimbal
    /// rotation: `(Rb * Ra - I) * tool`. Zero at `a = b = 0`.
    ///
    /// Uses the same rotation as [`Kinematics::forward`], so a TCP write
    /// through [`Kinematics::solve_motor`] lands exactly on its target.
    pub fn tool_offset(&self, a: f64, b: f64) -> Vector3<f64> {
        let tool = self.tool_vector();
        GimbalRotation::new(a, b).rotation() * tool - tool
    }

    /// TCP position in absolute machine space (not home-relative)
    pub fn absolute_tcp(&self, state: &MachineState) -> Point3<f64> {
        Point3::from(Transform::translation_of(&self.raw_transform(state)))
    }

    /// Motor coordinate on a linear `axis` that puts the home-relative TCP at
    /// `target`, clamped to `limits`. Rotary axes have no TCP coordinate and
    /// return `None`.
    ///
    /// Translation and rotation are decoupled, so this is a direct solve.
    pub fn solve_motor(
        &self,
        axis: Axis,
        target: f64,
        state: &MachineState,
        limits: &MachineLimits,
    ) -> Option<TcpSolution> {
        let index = axis.vector_index()?;
        let offset = self.tool_offset(state.a, state.b)[index];
        let unclamped = target - offset;
        let motor = limits.clamp(axis, unclamped);
        Some(TcpSolution {
            axis,
            requested: target,
            motor,
            realized: motor + offset,
            clamped: motor != unclamped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) {
        assert!(
            (a - b).abs() <= 1e-9,
            "expected {:.9}, got {:.9} (|diff|={:.3e})",
            b,
            a,
            (a - b).abs()
        );
    }

    #[test]
    fn test_home_reads_as_origin() {
        let kin = Kinematics::default();
        let pose = kin.forward(&MachineState::home()).cleaned();
        assert_eq!(pose.translation(), Vector3::zeros());
        assert_eq!(pose.rotation(), Matrix3::identity());
    }

    #[test]
    fn test_zero_angles_translation_is_position() {
        let kin = Kinematics::default();
        let state = MachineState::new(50.0, 50.0, 10.0, 0.0, 0.0);
        let pose = kin.forward(&state);
        assert_eq!(pose.translation(), Vector3::new(50.0, 50.0, 10.0));
        assert_eq!(kin.tool_offset(0.0, 0.0), Vector3::zeros());
        assert_eq!(kin.absolute_tcp(&state), Point3::new(50.0, 50.0, -15.0));
    }

    #[test]
    fn test_forward_matches_raw_minus_home() {
        let kin = Kinematics::default();
        let state = MachineState::new(12.0, 34.0, 56.0, 17.0, -73.0);
        let raw = Transform::translation_of(&kin.raw_transform(&state));
        let home = Transform::translation_of(&kin.home_transform());
        let pose = kin.forward(&state);
        assert!((pose.translation() - (raw - home)).norm() < 1e-9);
    }

    #[test]
    fn test_tilt_offset() {
        let kin = Kinematics::new(25.0);
        let offset = kin.tool_offset(45.0, 0.0);
        let s = 25.0 * 45f64.to_radians().sin();
        let c = 25.0 * (1.0 - 45f64.to_radians().cos());
        approx_eq(offset.x, 0.0);
        approx_eq(offset.y, s);
        approx_eq(offset.z, c);
        assert_eq!(clean_value(offset.y), 17.68);
        assert_eq!(clean_value(offset.z), 7.32);
    }

    #[test]
    fn test_b_rotates_tilt_direction() {
        // Tilt leans the tip toward +Y; B = 90 swings that lean to +X
        let kin = Kinematics::new(25.0);
        let offset = kin.tool_offset(45.0, 90.0);
        approx_eq(offset.x, 25.0 * 45f64.to_radians().sin());
        approx_eq(offset.y, 0.0);
    }

    #[test]
    fn test_b_alone_has_no_offset() {
        let kin = Kinematics::default();
        let offset = kin.tool_offset(0.0, 135.0);
        assert!(offset.norm() < 1e-12);
    }

    #[test]
    fn test_angles_are_not_wrapped() {
        let kin = Kinematics::default();
        let wrapped = kin.forward(&MachineState::new(0.0, 0.0, 0.0, 10.0, 180.0));
        let unwrapped = kin.forward(&MachineState::new(0.0, 0.0, 0.0, 10.0, 540.0));
        // Same physical orientation, but the input is taken verbatim
        assert!((wrapped.matrix - unwrapped.matrix).norm() < 1e-9);
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value(1.2e-16), 0.0);
        assert_eq!(clean_value(-0.0009), 0.0);
        assert_eq!(clean_value(-0.004), 0.0);
        assert!(clean_value(-0.004).is_sign_positive());
        assert_eq!(clean_value(17.677669), 17.68);
        assert_eq!(clean_value(-3.14159), -3.14);
    }

    #[test]
    fn test_column_major_export() {
        let kin = Kinematics::default();
        let pose = kin.forward(&MachineState::new(1.0, 2.0, 3.0, 0.0, 0.0));
        let flat = pose.to_column_major();
        assert_eq!(&flat[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(flat[15], 1.0);
    }

    #[test]
    fn test_solve_motor_reaches_target() {
        let kin = Kinematics::default();
        let limits = MachineLimits::default();
        let state = MachineState::new(50.0, 50.0, 50.0, 30.0, 45.0);
        let solution = kin.solve_motor(Axis::Y, 40.0, &state, &limits).unwrap();
        assert!(!solution.clamped);
        approx_eq(solution.realized, 40.0);

        let mut moved = state;
        moved.y = solution.motor;
        approx_eq(kin.forward(&moved).translation().y, 40.0);
    }

    #[test]
    fn test_solve_motor_reports_clamping() {
        let kin = Kinematics::default();
        let limits = MachineLimits::default();
        let state = MachineState::new(50.0, 50.0, 50.0, 45.0, 0.0);
        // offset.y is ~17.68, so y = 5 needs a negative motor coordinate
        let solution = kin.solve_motor(Axis::Y, 5.0, &state, &limits).unwrap();
        assert!(solution.clamped);
        assert_eq!(solution.motor, 0.0);
        approx_eq(solution.realized, 25.0 * 45f64.to_radians().sin());
    }

    #[test]
    fn test_solve_motor_rejects_rotary() {
        let kin = Kinematics::default();
        let limits = MachineLimits::default();
        assert!(kin
            .solve_motor(Axis::A, 1.0, &MachineState::home(), &limits)
            .is_none());
    }
}

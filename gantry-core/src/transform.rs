/// Homogeneous transform builders and the gimbal rotation convention
use nalgebra::{Matrix4, Rotation3, Vector3};

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Gimbal orientation in operator degrees.
///
/// B turns about the vertical (Z) axis and is negated so that increasing B
/// turns left, A tilts about the gimbal's local X axis. B is applied outside
/// A: `R = Rz(-b) * Rx(a)`. Angles are never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GimbalRotation {
    pub a: f64,
    pub b: f64,
}

impl GimbalRotation {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    pub fn rb(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), -deg_to_rad(self.b))
    }

    pub fn ra(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::x_axis(), deg_to_rad(self.a))
    }

    /// Combined rotation, B outer and A inner
    pub fn rotation(&self) -> Rotation3<f64> {
        self.rb() * self.ra()
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        self.rb().to_homogeneous() * self.ra().to_homogeneous()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a translation matrix
    pub fn translation_matrix(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f64, sy: f64, sz: f64) -> Matrix4<f64> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Translation column of a homogeneous matrix
    pub fn translation_of(m: &Matrix4<f64>) -> Vector3<f64> {
        Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
    }
}

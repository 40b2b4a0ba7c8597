//! Scene description consumed by the renderers.
//!
//! Everything is modelled in machine units, then pushed through a uniform
//! [`SceneLayout`] into render space. The gimbal and tool use the same
//! transform as [`Kinematics::raw_transform`], so the drawn tool tip always
//! lands on the TCP marker.

use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::Mesh;
use crate::kinematics::Kinematics;
use crate::machine::{Axis, MachineLimits, MachineState};
use crate::mapping::map_range;
use crate::transform::{GimbalRotation, Transform};

/// What a node represents; renderers pick shading from this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Bed,
    Frame,
    Carriage,
    Gimbal,
    Tool,
    Tcp,
    Object,
}

/// A mesh already placed in render space
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: &'static str,
    pub kind: NodeKind,
    pub mesh: Mesh,
}

/// Uniform machine-to-render mapping. X and Y travel are centred on the
/// origin; render Z = 0 is the bed surface, which sits one tool length below
/// the lowest gimbal position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLayout {
    pub limits: MachineLimits,
    pub floor: f64,
    pub scale: f64,
}

impl SceneLayout {
    /// Fit the larger of the X/Y travels into `render_extent` render units
    pub fn new(limits: MachineLimits, tool_length: f64, render_extent: f64) -> Self {
        let travel = limits.x.span().max(limits.y.span());
        Self {
            limits,
            floor: limits.z.min - tool_length,
            scale: render_extent / travel,
        }
    }

    /// Render-space coordinate for a machine-space value on a linear axis
    pub fn map_axis(&self, axis: Axis, value: f64) -> f64 {
        let limit = self.limits.get(axis);
        match axis {
            Axis::Z => map_range(
                value,
                self.floor,
                limit.max,
                0.0,
                (limit.max - self.floor) * self.scale,
            ),
            _ => {
                let half = limit.span() * self.scale / 2.0;
                map_range(value, limit.min, limit.max, -half, half)
            }
        }
    }

    pub fn map_point(&self, p: &Point3<f64>) -> Point3<f32> {
        Point3::new(
            self.map_axis(Axis::X, p.x) as f32,
            self.map_axis(Axis::Y, p.y) as f32,
            self.map_axis(Axis::Z, p.z) as f32,
        )
    }

    /// The same mapping as [`SceneLayout::map_point`], as a matrix
    pub fn matrix(&self) -> Matrix4<f64> {
        Transform::translation_matrix(
            self.map_axis(Axis::X, 0.0),
            self.map_axis(Axis::Y, 0.0),
            self.map_axis(Axis::Z, 0.0),
        ) * Transform::scale_matrix(self.scale, self.scale, self.scale)
    }

    /// Centre of the working envelope, a good camera target
    pub fn center(&self) -> Point3<f32> {
        let mid = |axis: Axis| {
            let l = self.limits.get(axis);
            (l.min + l.max) / 2.0
        };
        let mid_z = (self.floor + self.limits.z.max) / 2.0;
        self.map_point(&Point3::new(mid(Axis::X), mid(Axis::Y), mid_z))
    }
}

/// Place `mesh` on the bed at `(cx, cy)`, scaled so its larger horizontal
/// extent is `size` machine units. Output is in machine space.
pub fn place_object(mesh: &Mesh, cx: f64, cy: f64, floor: f64, size: f64) -> Mesh {
    let Some(bounds) = mesh.bounds() else {
        return Mesh::new();
    };
    let extent = bounds.size();
    let footprint = extent.x.max(extent.y).max(f32::EPSILON) as f64;
    let s = size / footprint;
    let center = bounds.center();

    let fit = Transform::translation_matrix(cx, cy, floor)
        * Transform::scale_matrix(s, s, s)
        * Transform::translation_matrix(
            -center.x as f64,
            -center.y as f64,
            -bounds.min.z as f64,
        );
    mesh.transformed(&fit.cast::<f32>())
}

const BEAM: f64 = 6.0;
const CARRIAGE: f64 = 12.0;
const GIMBAL: f64 = 8.0;
const TOOL_WIDTH: f64 = 2.0;
const TCP_MARKER: f64 = 3.0;
const BED_THICKNESS: f64 = 4.0;
const CLEARANCE: f64 = 10.0;

/// Every mesh of the machine for one state
#[derive(Debug, Clone)]
pub struct GantryScene {
    pub nodes: Vec<SceneNode>,
}

impl GantryScene {
    /// `object` is in machine space (see [`place_object`])
    pub fn build(
        state: &MachineState,
        kinematics: &Kinematics,
        layout: &SceneLayout,
        object: Option<&Mesh>,
    ) -> Self {
        let limits = &layout.limits;
        let to_render = layout.matrix();
        let mut nodes = Vec::with_capacity(8);
        let mut push = |name, kind, mesh: Mesh, model: Matrix4<f64>| {
            let matrix = (to_render * model).cast::<f32>();
            nodes.push(SceneNode {
                name,
                kind,
                mesh: mesh.transformed(&matrix),
            });
        };

        let cx = (limits.x.min + limits.x.max) / 2.0;
        let cy = (limits.y.min + limits.y.max) / 2.0;
        let bridge_z = limits.z.max + CLEARANCE;

        push(
            "bed",
            NodeKind::Bed,
            cuboid(
                limits.x.span() + 2.0 * CLEARANCE,
                limits.y.span() + 2.0 * CLEARANCE,
                BED_THICKNESS,
            ),
            Transform::translation_matrix(cx, cy, layout.floor - BED_THICKNESS / 2.0),
        );

        // Bridge rides Y, spans all of X
        push(
            "bridge",
            NodeKind::Frame,
            cuboid(limits.x.span() + 2.0 * CLEARANCE, BEAM, BEAM),
            Transform::translation_matrix(cx, state.y, bridge_z),
        );

        push(
            "carriage",
            NodeKind::Carriage,
            cuboid(CARRIAGE, CARRIAGE, CARRIAGE),
            Transform::translation_matrix(state.x, state.y, bridge_z),
        );

        let ram_length = (bridge_z - state.z).max(BEAM);
        push(
            "z_ram",
            NodeKind::Frame,
            cuboid(BEAM / 2.0, BEAM / 2.0, ram_length),
            Transform::translation_matrix(state.x, state.y, state.z + ram_length / 2.0),
        );

        let mount = Transform::translation_matrix(state.x, state.y, state.z)
            * GimbalRotation::new(state.a, state.b).matrix();
        push("gimbal", NodeKind::Gimbal, cuboid(GIMBAL, GIMBAL, GIMBAL), mount);

        let length = kinematics.tool_length;
        push(
            "tool",
            NodeKind::Tool,
            cuboid(TOOL_WIDTH, TOOL_WIDTH, length),
            mount * Transform::translation_matrix(0.0, 0.0, -length / 2.0),
        );

        let tcp = kinematics.absolute_tcp(state);
        push(
            "tcp",
            NodeKind::Tcp,
            cuboid(TCP_MARKER, TCP_MARKER, TCP_MARKER),
            Transform::translation_matrix(tcp.x, tcp.y, tcp.z),
        );

        if let Some(object) = object {
            push("object", NodeKind::Object, object.clone(), Matrix4::identity());
        }

        Self { nodes }
    }

    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.name == name)
    }
}

fn cuboid(w: f64, d: f64, h: f64) -> Mesh {
    Mesh::cuboid(w as f32, d as f32, h as f32)
}

/// Stand-in scan object when no STL is configured: a stepped block
pub fn default_object() -> Mesh {
    let mut mesh = Mesh::cuboid(1.0, 1.0, 0.5);
    let lift = Vector3::new(0.0f32, 0.0, 0.25);
    mesh = mesh.transformed(&Matrix4::new_translation(&lift));
    let top = Mesh::cuboid(0.5, 0.5, 0.5)
        .transformed(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, 0.75)));
    mesh.append(top);
    mesh
}

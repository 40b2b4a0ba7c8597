/// Gantry Core Library - kinematics and state for the 5-axis gantry simulator
///
/// Holds the machine state and its limits, the forward kinematics / TCP offset
/// math, the auto-scan orbit, and the scene description the front ends draw.

pub mod config;
pub mod error;
pub mod geometry;
pub mod kinematics;
pub mod machine;
pub mod mapping;
pub mod projection;
pub mod readout;
pub mod scan;
pub mod scene;
pub mod simulator;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use config::SimConfig;
pub use error::{ConfigError, Result, SimError, StlError};
pub use geometry::{Mesh, Triangle, Vertex};
pub use kinematics::{clean_value, Kinematics, Pose, TcpSolution, TOOL_LENGTH_OFFSET};
pub use machine::{Axis, AxisLimit, AxisUpdate, MachineLimits, MachineState};
pub use mapping::map_range;
pub use projection::{Camera, ProjectionMode};
pub use readout::Readout;
pub use scan::{ScanFrame, ScanPath, ScanSession};
pub use scene::{GantryScene, NodeKind, SceneLayout, SceneNode};
pub use simulator::{Simulator, UpdateSource};
pub use transform::{GimbalRotation, Transform};

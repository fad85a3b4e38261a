//! Rig documents and the skeletal model of a Shadowplay puppet.
//!
//! A rig arrives as a JSON document (`RigDoc-1.3`), is validated
//! exhaustively by [`load_rig`], and becomes a [`RigGraph`]: the joint tree,
//! the IK chains defined over it, and a cached world transform per joint.
//!
//! ```text
//! JSON ──► RigDocument ──► load_rig ──► RigGraph ──► joint_world_transform
//!                              │
//!                              └──► InvalidRigSchema (nothing constructed)
//! ```

pub mod constraint;
pub mod error;
pub mod graph;
pub mod pose;
pub mod schema;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use constraint::ConeLimit;
pub use error::{InvalidRigSchema, RigError};
pub use graph::{Chain, Joint, RigGraph, SolverKind, SolverParams, load_rig};
pub use pose::Pose;
pub use schema::{ChainSpec, ConstraintSpec, JointSpec, RigDocument, parse_file, parse_str};

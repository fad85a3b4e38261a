//! Error types for rig loading.

use std::path::PathBuf;

/// A rig document violated a load-time invariant.
///
/// Fatal for that asset: the rig is rejected and no partial [`RigGraph`]
/// exists. Each variant names the violated invariant.
///
/// [`RigGraph`]: crate::RigGraph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidRigSchema {
    /// The document is not valid JSON or does not match the schema shape.
    #[error("malformed rig document: {0}")]
    Malformed(String),

    #[error("unsupported rig document version: {0}")]
    UnsupportedVersion(String),

    #[error("rig has no joints")]
    Empty,

    #[error("duplicate joint name: {0}")]
    DuplicateJoint(String),

    #[error("joint {joint} references unknown parent {parent}")]
    UnknownParent { joint: String, parent: String },

    /// The parent references form a cycle through this joint.
    #[error("cyclic joint hierarchy through {joint}")]
    CyclicHierarchy { joint: String },

    #[error("no root joint found")]
    NoRoot,

    #[error("multiple root joints: {first} and {second}")]
    MultipleRoots { first: String, second: String },

    #[error("joint {joint} has invalid {field}")]
    InvalidTransform { joint: String, field: &'static str },

    #[error("joint {joint} constraint soft={soft_deg} hard={hard_deg} outside 0 <= soft <= hard <= 180")]
    ConstraintOutOfRange {
        joint: String,
        soft_deg: f32,
        hard_deg: f32,
    },

    #[error("duplicate chain name: {0}")]
    DuplicateChain(String),

    #[error("chain {chain} references unknown joint {joint}")]
    UnknownChainJoint { chain: String, joint: String },

    #[error("chain {chain} has {len} joints (need at least 2)")]
    ChainTooShort { chain: String, len: usize },

    /// Consecutive chain joints must be parent and child.
    #[error("chain {chain}: {child} is not a child of {parent}")]
    DisjointChain {
        chain: String,
        parent: String,
        child: String,
    },

    #[error("joint {joint} is in both chain {first} and chain {second}")]
    OverlappingChains {
        joint: String,
        first: String,
        second: String,
    },

    #[error("two-bone chain {chain} has {len} joints (need exactly 3)")]
    TwoBoneArity { chain: String, len: usize },

    #[error("chain {chain} has invalid solver parameters: {message}")]
    InvalidSolverParams { chain: String, message: String },
}

/// Errors from loading a rig file.
#[derive(Debug, thiserror::Error)]
pub enum RigError {
    /// Failed to read the rig file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] InvalidRigSchema),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! `RigDoc-1.3` JSON rig documents.
//!
//! These types mirror the document shape one-to-one. They carry names, not
//! ids; [`load_rig`](crate::load_rig) resolves names and validates the
//! result before any [`RigGraph`] exists.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constraint::ConeLimit;
use crate::error::{InvalidRigSchema, RigError};
use crate::graph::{RigGraph, SolverKind, load_rig};

/// Document format version written by current tooling.
pub const FORMAT_VERSION: &str = "1.3";

/// Major version this loader accepts.
pub const SUPPORTED_MAJOR: &str = "1";

fn default_version() -> String {
    FORMAT_VERSION.to_owned()
}

const fn default_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// A complete rig document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RigDocument {
    /// Format version, `"1.x"`.
    #[serde(default = "default_version")]
    pub version: String,
    pub name: String,
    pub joints: Vec<JointSpec>,
    #[serde(default)]
    pub chains: Vec<ChainSpec>,
}

/// One joint entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JointSpec {
    pub name: String,
    /// Parent joint name. Exactly one joint per rig has none.
    #[serde(default)]
    pub parent: Option<String>,
    /// Offset from the parent joint, in the parent's frame.
    #[serde(default)]
    pub translation: [f32; 3],
    /// Rest rotation as `[x, y, z, w]`. Normalized on load.
    #[serde(default = "default_rotation")]
    pub rotation: [f32; 4],
    #[serde(default)]
    pub constraint: Option<ConstraintSpec>,
}

/// Angular limits as written in a document.
pub type ConstraintSpec = ConeLimit;

/// One IK chain entry. Joints are listed root to end-effector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSpec {
    pub name: String,
    pub joints: Vec<String>,
    pub solver: SolverKind,
    #[serde(default)]
    pub damping: Option<f32>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub angular_clamp_deg: Option<f32>,
    /// Bend-plane hint for two-bone chains.
    #[serde(default)]
    pub pole: Option<[f32; 3]>,
}

impl RigDocument {
    /// Deserialize a document without validating it.
    pub fn from_json(json: &str) -> Result<Self, InvalidRigSchema> {
        serde_json::from_str(json).map_err(|e| InvalidRigSchema::Malformed(e.to_string()))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, InvalidRigSchema> {
        serde_json::to_string_pretty(self).map_err(|e| InvalidRigSchema::Malformed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse and validate a rig document from a JSON string.
pub fn parse_str(json: &str) -> Result<RigGraph, InvalidRigSchema> {
    load_rig(&RigDocument::from_json(json)?)
}

/// Parse and validate a rig document from disk.
pub fn parse_file(path: impl AsRef<Path>) -> Result<RigGraph, RigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| RigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_str(&content)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Rig documents shared by tests.

use shadowplay_rig::{RigGraph, parse_str};

/// A pelvis plus a four-bone arm, each joint bent 30 degrees about z.
pub const ARM_RIG: &str = r#"{
    "version": "1.3",
    "name": "arm",
    "joints": [
        { "name": "pelvis" },
        { "name": "shoulder", "parent": "pelvis", "translation": [0.0, 1.0, 0.0],
          "rotation": [0.0, 0.0, 0.25881904, 0.9659258] },
        { "name": "elbow", "parent": "shoulder", "translation": [1.0, 0.0, 0.0],
          "rotation": [0.0, 0.0, 0.25881904, 0.9659258] },
        { "name": "wrist", "parent": "elbow", "translation": [1.0, 0.0, 0.0],
          "rotation": [0.0, 0.0, 0.25881904, 0.9659258] },
        { "name": "hand", "parent": "wrist", "translation": [1.0, 0.0, 0.0],
          "rotation": [0.0, 0.0, 0.25881904, 0.9659258] },
        { "name": "tip", "parent": "hand", "translation": [1.0, 0.0, 0.0] }
    ],
    "chains": [
        { "name": "arm",
          "joints": ["shoulder", "elbow", "wrist", "hand", "tip"], "solver": "fabrik" }
    ]
}"#;

/// A shadow puppet with one chain per solver kind: a two-bone spine from
/// the pelvis, a FABRIK arm and a CCD finger.
pub const PUPPET_RIG: &str = r#"{
    "version": "1.3",
    "name": "puppet",
    "joints": [
        { "name": "pelvis" },
        { "name": "chest", "parent": "pelvis", "translation": [0.0, 0.6, 0.0],
          "rotation": [0.0, 0.0, 0.1, 0.99498744] },
        { "name": "head", "parent": "chest", "translation": [0.0, 0.4, 0.0] },
        { "name": "shoulder_l", "parent": "chest", "translation": [-0.2, 0.3, 0.0],
          "rotation": [0.0, 0.0, 0.25881904, 0.9659258] },
        { "name": "elbow_l", "parent": "shoulder_l", "translation": [0.5, 0.0, 0.0],
          "rotation": [0.0, 0.0, 0.25881904, 0.9659258],
          "constraint": { "soft_deg": 90.0, "hard_deg": 150.0 } },
        { "name": "wrist_l", "parent": "elbow_l", "translation": [0.5, 0.0, 0.0],
          "rotation": [0.0, 0.0, 0.25881904, 0.9659258] },
        { "name": "hand_l", "parent": "wrist_l", "translation": [0.3, 0.0, 0.0] },
        { "name": "shoulder_r", "parent": "chest", "translation": [0.2, 0.3, 0.0] },
        { "name": "finger_base", "parent": "shoulder_r", "translation": [0.4, 0.0, 0.0],
          "rotation": [0.0, 0.0, -0.17364818, 0.9848077] },
        { "name": "finger_mid", "parent": "finger_base", "translation": [0.15, 0.0, 0.0],
          "rotation": [0.0, 0.0, -0.17364818, 0.9848077],
          "constraint": { "soft_deg": 60.0, "hard_deg": 110.0 } },
        { "name": "finger_tip", "parent": "finger_mid", "translation": [0.1, 0.0, 0.0] }
    ],
    "chains": [
        { "name": "spine", "joints": ["pelvis", "chest", "head"], "solver": "two_bone",
          "pole": [0.0, 0.5, 1.0] },
        { "name": "arm_l",
          "joints": ["shoulder_l", "elbow_l", "wrist_l", "hand_l"], "solver": "fabrik" },
        { "name": "finger_r",
          "joints": ["finger_base", "finger_mid", "finger_tip"], "solver": "ccd" }
    ]
}"#;

/// Three joints whose parents form a loop.
pub const CYCLIC_RIG: &str = r#"{
    "name": "loop",
    "joints": [
        { "name": "root" },
        { "name": "a", "parent": "c" },
        { "name": "b", "parent": "a" },
        { "name": "c", "parent": "b" }
    ]
}"#;

/// [`ARM_RIG`] loaded. Panics if the fixture is broken.
pub fn arm_rig() -> RigGraph {
    parse_str(ARM_RIG).unwrap_or_else(|e| panic!("ARM_RIG fixture: {e}"))
}

/// [`PUPPET_RIG`] loaded. Panics if the fixture is broken.
pub fn puppet_rig() -> RigGraph {
    parse_str(PUPPET_RIG).unwrap_or_else(|e| panic!("PUPPET_RIG fixture: {e}"))
}

/// The cyclic rig document text.
pub const fn cyclic_document() -> &'static str {
    CYCLIC_RIG
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

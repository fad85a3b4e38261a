//! The validated joint tree and its IK chains.
//!
//! [`load_rig`] is the only constructor. Every invariant is checked before
//! the graph is assembled, so a [`RigGraph`] value is always acyclic,
//! single-rooted and has well-formed chains. After construction the only
//! mutation is [`RigGraph::commit_pose`].

use std::collections::{HashMap, HashSet};

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use shadowplay_core::math::{quat_from_xyzw, vec3_from_array};
use shadowplay_core::types::{ChainId, JointId};

use crate::constraint::ConeLimit;
use crate::error::InvalidRigSchema;
use crate::pose::Pose;
use crate::schema::{ChainSpec, JointSpec, RigDocument, SUPPORTED_MAJOR};

// ---------------------------------------------------------------------------
// Solver selection
// ---------------------------------------------------------------------------

/// Which IK algorithm solves a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Forward/backward reaching. Arms and rods.
    Fabrik,
    /// Cyclic coordinate descent. Fingers, and the FABRIK fallback.
    Ccd,
    /// Closed-form law-of-cosines solve for exactly three joints.
    TwoBone,
}

/// Per-chain solver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    /// Fraction of the end-effector correction withheld each FABRIK iteration.
    pub damping: f32,
    pub max_iterations: u32,
    /// Largest rotation CCD applies to one joint in one iteration.
    pub angular_clamp_deg: f32,
}

impl SolverParams {
    pub const FABRIK: Self = Self {
        damping: 0.12,
        max_iterations: 12,
        angular_clamp_deg: 15.0,
    };

    pub const CCD: Self = Self {
        damping: 0.0,
        max_iterations: 12,
        angular_clamp_deg: 15.0,
    };

    pub const TWO_BONE: Self = Self {
        damping: 0.0,
        max_iterations: 1,
        angular_clamp_deg: 180.0,
    };

    /// Default parameters for a solver kind.
    #[must_use]
    pub const fn defaults_for(kind: SolverKind) -> Self {
        match kind {
            SolverKind::Fabrik => Self::FABRIK,
            SolverKind::Ccd => Self::CCD,
            SolverKind::TwoBone => Self::TWO_BONE,
        }
    }

    /// Check parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.damping.is_finite() && (0.0..1.0).contains(&self.damping)) {
            return Err(format!("damping {} outside [0, 1)", self.damping));
        }
        if !(1..=256).contains(&self.max_iterations) {
            return Err(format!(
                "max_iterations {} outside [1, 256]",
                self.max_iterations
            ));
        }
        if !(self.angular_clamp_deg.is_finite()
            && self.angular_clamp_deg > 0.0
            && self.angular_clamp_deg <= 180.0)
        {
            return Err(format!(
                "angular_clamp_deg {} outside (0, 180]",
                self.angular_clamp_deg
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Joint / Chain
// ---------------------------------------------------------------------------

/// One joint of a rig.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub id: JointId,
    pub name: String,
    /// `None` only for the root.
    pub parent: Option<JointId>,
    /// Offset from the parent joint, in the parent's frame.
    pub translation: Vector3<f32>,
    pub rest_rotation: UnitQuaternion<f32>,
    pub constraint: Option<ConeLimit>,
}

/// An ordered run of parent-to-child joints solved as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: ChainId,
    pub name: String,
    /// Root first, end-effector last.
    pub joints: Vec<JointId>,
    pub solver: SolverKind,
    pub params: SolverParams,
    pub pole: Option<Vector3<f32>>,
}

impl Chain {
    pub fn root(&self) -> JointId {
        self.joints[0]
    }

    pub fn end_effector(&self) -> JointId {
        self.joints[self.joints.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RigGraph
// ---------------------------------------------------------------------------

/// A validated rig: joint tree, IK chains and cached world transforms.
#[derive(Debug, Clone)]
pub struct RigGraph {
    name: String,
    joints: Vec<Joint>,
    chains: Vec<Chain>,
    joint_names: HashMap<String, JointId>,
    /// Parents always precede children.
    order: Vec<JointId>,
    rest: Pose,
    pose: Pose,
    world: Vec<Isometry3<f32>>,
}

impl RigGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id.index())
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joint_names.get(name).and_then(|id| self.joint(*id))
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id.index())
    }

    pub fn chain_by_name(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// The unique joint without a parent.
    pub fn root(&self) -> JointId {
        self.order[0]
    }

    /// Joints in topological order, root first.
    pub fn topological_order(&self) -> &[JointId] {
        &self.order
    }

    /// Rotations the rig was authored with.
    pub const fn rest_pose(&self) -> &Pose {
        &self.rest
    }

    /// Rotations from the most recent commit (the rest pose before any).
    pub const fn current_pose(&self) -> &Pose {
        &self.pose
    }

    /// World transform of a joint under the current pose.
    pub fn joint_world_transform(&self, id: JointId) -> Option<Isometry3<f32>> {
        self.world.get(id.index()).copied()
    }

    /// World position of a joint under the current pose.
    pub fn world_position(&self, id: JointId) -> Option<Point3<f32>> {
        self.joint_world_transform(id)
            .map(|iso| Point3::from(iso.translation.vector))
    }

    /// World transform of a joint's parent frame (identity for the root).
    pub fn parent_world_transform(&self, id: JointId) -> Option<Isometry3<f32>> {
        let joint = self.joint(id)?;
        Some(match joint.parent {
            Some(parent) => self.world[parent.index()],
            None => Isometry3::identity(),
        })
    }

    /// Mean world position of all joints. Used as the puppet's shadow anchor.
    #[allow(clippy::cast_precision_loss)]
    pub fn world_centroid(&self) -> Point3<f32> {
        let sum = self
            .world
            .iter()
            .fold(Vector3::zeros(), |acc, iso| acc + iso.translation.vector);
        Point3::from(sum / self.world.len() as f32)
    }

    /// Replace the local rotations and rebuild the world cache.
    ///
    /// `pose` must cover every joint of this rig.
    pub fn commit_pose(&mut self, pose: &Pose) {
        debug_assert_eq!(pose.len(), self.joints.len(), "pose does not match rig");
        self.pose = pose.clone();
        self.rebuild_world();
    }

    fn rebuild_world(&mut self) {
        for &id in &self.order {
            let joint = &self.joints[id.index()];
            let rotation = self.pose.get(id).copied().unwrap_or(joint.rest_rotation);
            let local = Isometry3::from_parts(Translation3::from(joint.translation), rotation);
            self.world[id.index()] = match joint.parent {
                Some(parent) => self.world[parent.index()] * local,
                None => local,
            };
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Validate a rig document and build its graph.
///
/// Checks run in a fixed order and the first violation is returned. Nothing
/// is constructed unless every check passes.
pub fn load_rig(doc: &RigDocument) -> Result<RigGraph, InvalidRigSchema> {
    check_version(&doc.version)?;
    if doc.joints.is_empty() {
        return Err(InvalidRigSchema::Empty);
    }

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(doc.joints.len());
    for (i, spec) in doc.joints.iter().enumerate() {
        if index.insert(spec.name.as_str(), i).is_some() {
            return Err(InvalidRigSchema::DuplicateJoint(spec.name.clone()));
        }
    }

    let parents = doc
        .joints
        .iter()
        .map(|spec| match &spec.parent {
            None => Ok(None),
            Some(parent) => index.get(parent.as_str()).map(|p| Some(*p)).ok_or_else(|| {
                InvalidRigSchema::UnknownParent {
                    joint: spec.name.clone(),
                    parent: parent.clone(),
                }
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(i) = find_cycle(&parents) {
        return Err(InvalidRigSchema::CyclicHierarchy {
            joint: doc.joints[i].name.clone(),
        });
    }

    let mut roots = parents.iter().enumerate().filter(|(_, p)| p.is_none());
    let root = match (roots.next(), roots.next()) {
        (None, _) => return Err(InvalidRigSchema::NoRoot),
        (Some((first, _)), Some((second, _))) => {
            return Err(InvalidRigSchema::MultipleRoots {
                first: doc.joints[first].name.clone(),
                second: doc.joints[second].name.clone(),
            });
        }
        (Some((root, _)), None) => root,
    };

    let mut joints = Vec::with_capacity(doc.joints.len());
    for (i, spec) in doc.joints.iter().enumerate() {
        let translation =
            vec3_from_array(spec.translation).ok_or_else(|| InvalidRigSchema::InvalidTransform {
                joint: spec.name.clone(),
                field: "translation",
            })?;
        let rest_rotation =
            quat_from_xyzw(spec.rotation).ok_or_else(|| InvalidRigSchema::InvalidTransform {
                joint: spec.name.clone(),
                field: "rotation",
            })?;
        if let Some(limit) = spec.constraint.filter(|l| !l.is_valid()) {
            return Err(InvalidRigSchema::ConstraintOutOfRange {
                joint: spec.name.clone(),
                soft_deg: limit.soft_deg,
                hard_deg: limit.hard_deg,
            });
        }
        joints.push(Joint {
            id: JointId::from_index(i),
            name: spec.name.clone(),
            parent: parents[i].map(JointId::from_index),
            translation,
            rest_rotation,
            constraint: spec.constraint,
        });
    }

    let chains = build_chains(&doc.chains, &index, &parents, &doc.joints)?;
    let order = topological_order(root, &parents);

    let rest = Pose::new(joints.iter().map(|j| j.rest_rotation).collect());
    let joint_names = joints.iter().map(|j| (j.name.clone(), j.id)).collect();
    let mut graph = RigGraph {
        name: doc.name.clone(),
        world: vec![Isometry3::identity(); joints.len()],
        joints,
        chains,
        joint_names,
        order,
        pose: rest.clone(),
        rest,
    };
    graph.rebuild_world();

    tracing::info!(
        rig = %graph.name,
        joints = graph.joints.len(),
        chains = graph.chains.len(),
        "rig loaded"
    );
    Ok(graph)
}

fn check_version(version: &str) -> Result<(), InvalidRigSchema> {
    let major = version.split('.').next().unwrap_or_default();
    if major == SUPPORTED_MAJOR {
        Ok(())
    } else {
        Err(InvalidRigSchema::UnsupportedVersion(version.to_owned()))
    }
}

/// Index of a joint on a parent cycle, if any.
fn find_cycle(parents: &[Option<usize>]) -> Option<usize> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parents.len()];
    let mut path = Vec::new();
    for start in 0..parents.len() {
        let mut current = Some(start);
        while let Some(i) = current {
            match state[i] {
                UNSEEN => {
                    state[i] = ON_PATH;
                    path.push(i);
                    current = parents[i];
                }
                ON_PATH => return Some(i),
                _ => break,
            }
        }
        for i in path.drain(..) {
            state[i] = DONE;
        }
    }
    None
}

/// Breadth-first order from the root; siblings in document order.
fn topological_order(root: usize, parents: &[Option<usize>]) -> Vec<JointId> {
    let mut children = vec![Vec::new(); parents.len()];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(child);
        }
    }
    let mut order = Vec::with_capacity(parents.len());
    order.push(root);
    let mut head = 0;
    while head < order.len() {
        let current = order[head];
        order.extend_from_slice(&children[current]);
        head += 1;
    }
    order.into_iter().map(JointId::from_index).collect()
}

fn build_chains(
    specs: &[ChainSpec],
    index: &HashMap<&str, usize>,
    parents: &[Option<usize>],
    joint_specs: &[JointSpec],
) -> Result<Vec<Chain>, InvalidRigSchema> {
    let mut names = HashSet::with_capacity(specs.len());
    let mut owner: Vec<Option<usize>> = vec![None; parents.len()];
    let mut chains = Vec::with_capacity(specs.len());

    for (c, spec) in specs.iter().enumerate() {
        if !names.insert(spec.name.as_str()) {
            return Err(InvalidRigSchema::DuplicateChain(spec.name.clone()));
        }
        if spec.solver == SolverKind::TwoBone && spec.joints.len() != 3 {
            return Err(InvalidRigSchema::TwoBoneArity {
                chain: spec.name.clone(),
                len: spec.joints.len(),
            });
        }
        if spec.joints.len() < 2 {
            return Err(InvalidRigSchema::ChainTooShort {
                chain: spec.name.clone(),
                len: spec.joints.len(),
            });
        }

        let mut members = Vec::with_capacity(spec.joints.len());
        for name in &spec.joints {
            let i = index
                .get(name.as_str())
                .copied()
                .ok_or_else(|| InvalidRigSchema::UnknownChainJoint {
                    chain: spec.name.clone(),
                    joint: name.clone(),
                })?;
            members.push(i);
        }

        for pair in members.windows(2) {
            if parents[pair[1]] != Some(pair[0]) {
                return Err(InvalidRigSchema::DisjointChain {
                    chain: spec.name.clone(),
                    parent: joint_specs[pair[0]].name.clone(),
                    child: joint_specs[pair[1]].name.clone(),
                });
            }
        }

        for &i in &members {
            if let Some(other) = owner[i] {
                return Err(InvalidRigSchema::OverlappingChains {
                    joint: joint_specs[i].name.clone(),
                    first: specs[other].name.clone(),
                    second: spec.name.clone(),
                });
            }
            owner[i] = Some(c);
        }

        let defaults = SolverParams::defaults_for(spec.solver);
        let params = SolverParams {
            damping: spec.damping.unwrap_or(defaults.damping),
            max_iterations: spec.max_iterations.unwrap_or(defaults.max_iterations),
            angular_clamp_deg: spec.angular_clamp_deg.unwrap_or(defaults.angular_clamp_deg),
        };
        params
            .validate()
            .map_err(|message| InvalidRigSchema::InvalidSolverParams {
                chain: spec.name.clone(),
                message,
            })?;

        let pole = match spec.pole {
            None => None,
            Some(raw) => Some(vec3_from_array(raw).ok_or_else(|| {
                InvalidRigSchema::InvalidSolverParams {
                    chain: spec.name.clone(),
                    message: "pole is not finite".to_owned(),
                }
            })?),
        };

        chains.push(Chain {
            id: ChainId::from_index(c),
            name: spec.name.clone(),
            joints: members.into_iter().map(JointId::from_index).collect(),
            solver: spec.solver,
            params,
            pole,
        });
    }
    Ok(chains)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

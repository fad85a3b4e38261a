//! Recoverable per-tick conditions.
//!
//! Unlike errors, conditions never abort anything: the tick that produced
//! them still commits a pose. The safe-mode controller counts them to decide
//! whether the session should degrade.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ChainId, PuppetId};

/// Tick phase during which the CPU budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BudgetPhase {
    Solving,
    /// Waiting on the parallel solve join.
    SolveJoin,
    Blending,
    Lighting,
}

/// Reduced-fidelity operating level chosen by the safe-mode controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegradationLevel {
    /// Lower shadow tier, interference and bloom off.
    ReducedShadows,
    /// Flat silhouette shadows only.
    SilhouetteOnly,
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReducedShadows => f.write_str("reduced-shadows"),
            Self::SilhouetteOnly => f.write_str("silhouette-only"),
        }
    }
}

/// A condition reported by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TickCondition {
    /// No solver converged for the chain; its prior rotations were held.
    DivergentIk {
        puppet: PuppetId,
        chain: ChainId,
        iterations: u32,
    },
    /// The tick overran its CPU budget and committed a truncated result.
    FrameBudgetExceeded {
        phase: BudgetPhase,
        elapsed: Duration,
        budget: Duration,
    },
    /// The session switched to a reduced-fidelity mode.
    SustainedDegradation { level: DegradationLevel },
}

impl TickCondition {
    #[must_use]
    pub const fn is_divergent_ik(&self) -> bool {
        matches!(self, Self::DivergentIk { .. })
    }

    #[must_use]
    pub const fn is_budget_exceeded(&self) -> bool {
        matches!(self, Self::FrameBudgetExceeded { .. })
    }
}

impl fmt::Display for TickCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivergentIk {
                puppet,
                chain,
                iterations,
            } => write!(
                f,
                "DivergentIK: {chain} on {puppet} held after {iterations} iterations"
            ),
            Self::FrameBudgetExceeded {
                phase,
                elapsed,
                budget,
            } => write!(
                f,
                "FrameBudgetExceeded: {elapsed:?} > {budget:?} during {phase:?}"
            ),
            Self::SustainedDegradation { level } => write!(f, "SustainedDegradation: {level}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

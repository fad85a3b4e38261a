//! Session-wide degradation policy.
//!
//! [`SafeModeController`] wraps the [`TickScheduler`] and counts the
//! conditions each tick raises over a rolling window. When a threshold is
//! crossed the session drops to a lower-fidelity shadow tier; when the
//! window runs clean it recovers. Transitions are at least one window apart
//! and take effect on the following tick.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use shadowplay_core::condition::{DegradationLevel, TickCondition};
use shadowplay_lighting::ShadowTier;

use crate::config::SafeModeConfig;
use crate::scheduler::{TickInput, TickOutput, TickScheduler};

// ---------------------------------------------------------------------------
// SafeModeState
// ---------------------------------------------------------------------------

/// Operating level of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SafeModeState {
    #[default]
    Normal,
    Degraded(DegradationLevel),
}

impl SafeModeState {
    /// Shadow tier the lighting stage runs at.
    pub const fn tier(self) -> ShadowTier {
        match self {
            Self::Normal => ShadowTier::Full,
            Self::Degraded(DegradationLevel::ReducedShadows) => ShadowTier::Reduced,
            Self::Degraded(DegradationLevel::SilhouetteOnly) => ShadowTier::Silhouette,
        }
    }

    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

impl fmt::Display for SafeModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Degraded(level) => write!(f, "degraded({level})"),
        }
    }
}

// ---------------------------------------------------------------------------
// SignalWindow
// ---------------------------------------------------------------------------

/// Condition counts over the last `capacity` ticks.
#[derive(Debug, Clone)]
pub struct SignalWindow {
    capacity: usize,
    /// (divergent IK count, budget exceeded) per tick, oldest first.
    ticks: VecDeque<(u32, bool)>,
    divergent: u32,
    budget: u32,
}

impl SignalWindow {
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1) as usize;
        Self {
            capacity,
            ticks: VecDeque::with_capacity(capacity),
            divergent: 0,
            budget: 0,
        }
    }

    /// Record one tick's conditions, evicting the oldest tick when full.
    pub fn push(&mut self, signals: &[TickCondition]) {
        let divergent = u32::try_from(signals.iter().filter(|s| s.is_divergent_ik()).count())
            .unwrap_or(u32::MAX);
        let budget = signals.iter().any(TickCondition::is_budget_exceeded);

        if self.ticks.len() == self.capacity {
            if let Some((old_divergent, old_budget)) = self.ticks.pop_front() {
                self.divergent -= old_divergent;
                self.budget -= u32::from(old_budget);
            }
        }
        self.ticks.push_back((divergent, budget));
        self.divergent = self.divergent.saturating_add(divergent);
        self.budget += u32::from(budget);
    }

    /// `DivergentIK` conditions in the window.
    pub const fn divergent_count(&self) -> u32 {
        self.divergent
    }

    /// Ticks in the window that exceeded the budget.
    pub const fn budget_count(&self) -> u32 {
        self.budget
    }

    /// No conditions anywhere in the window.
    pub const fn is_clear(&self) -> bool {
        self.divergent == 0 && self.budget == 0
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SafeModeController
// ---------------------------------------------------------------------------

/// Runs ticks and moves the session between [`SafeModeState`]s.
#[derive(Debug)]
pub struct SafeModeController {
    scheduler: TickScheduler,
    config: SafeModeConfig,
    window: SignalWindow,
    state: SafeModeState,
    /// Ticks since the last transition. Starts at the window length so the
    /// first degradation is not delayed.
    ticks_in_state: u32,
    transitions: u32,
}

impl SafeModeController {
    pub fn new(scheduler: TickScheduler, config: SafeModeConfig) -> Self {
        Self {
            scheduler,
            window: SignalWindow::new(config.window),
            ticks_in_state: config.window,
            config,
            state: SafeModeState::Normal,
            transitions: 0,
        }
    }

    /// Run one tick under the current state, then evaluate the policy.
    ///
    /// A transition decided here applies from the next tick. Entering or
    /// deepening degradation appends a `SustainedDegradation` condition to
    /// this tick's output.
    pub fn tick(&mut self, input: &TickInput) -> TickOutput {
        let mut output = self.scheduler.tick(input, self.state);
        if let Some(condition) = self.observe(&output.signals) {
            output.signals.push(condition);
        }
        output
    }

    fn observe(&mut self, signals: &[TickCondition]) -> Option<TickCondition> {
        if !self.config.enabled {
            return None;
        }
        self.window.push(signals);
        self.ticks_in_state = self.ticks_in_state.saturating_add(1);

        let breached = self.window.divergent_count() >= self.config.divergent_ik_threshold
            || self.window.budget_count() >= self.config.budget_threshold;
        let settled = self.ticks_in_state >= self.config.window;
        if !settled {
            return None;
        }

        let next = match self.state {
            SafeModeState::Normal if breached => {
                SafeModeState::Degraded(DegradationLevel::ReducedShadows)
            }
            SafeModeState::Degraded(DegradationLevel::ReducedShadows) if breached => {
                SafeModeState::Degraded(DegradationLevel::SilhouetteOnly)
            }
            SafeModeState::Degraded(_) if self.window.is_clear() => SafeModeState::Normal,
            _ => return None,
        };

        tracing::info!(
            from = %self.state,
            to = %next,
            divergent_ik = self.window.divergent_count(),
            budget_exceeded = self.window.budget_count(),
            "safe mode transition"
        );
        self.state = next;
        self.ticks_in_state = 0;
        self.transitions += 1;
        match next {
            SafeModeState::Degraded(level) => Some(TickCondition::SustainedDegradation { level }),
            SafeModeState::Normal => None,
        }
    }

    pub const fn state(&self) -> SafeModeState {
        self.state
    }

    /// Number of transitions so far.
    pub const fn transitions(&self) -> u32 {
        self.transitions
    }

    pub const fn window(&self) -> &SignalWindow {
        &self.window
    }

    pub const fn config(&self) -> &SafeModeConfig {
        &self.config
    }

    pub const fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub const fn scheduler_mut(&mut self) -> &mut TickScheduler {
        &mut self.scheduler
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

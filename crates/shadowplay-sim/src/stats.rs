//! Session diagnostics.
//!
//! [`Diagnostics`] accumulates counters across ticks: solves, divergences,
//! fallbacks, budget overruns, CPU time and safe-mode transitions. It
//! serializes to JSON for the command-line runner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use shadowplay_core::condition::TickCondition;

use crate::safe_mode::SafeModeState;
use crate::scheduler::TickOutput;

#[allow(clippy::cast_possible_truncation)]
const fn micros(d: Duration) -> u64 {
    d.as_micros() as u64
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Cumulative counters for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Committed ticks.
    pub ticks: u64,
    /// IK ticks with at least one targeted chain. IK ticks without targets
    /// are not counted.
    pub ik_ticks: u64,
    /// Chains solved, excluding chains held after a budget overrun.
    pub chain_solves: u64,
    /// Chains held because the budget ran out before their turn.
    pub chains_skipped: u64,
    pub ccd_fallbacks: u64,
    pub divergent_ik_total: u64,
    pub frame_budget_exceeded_total: u64,
    pub sustained_degradation_total: u64,
    /// Safe-mode state changes in either direction.
    pub safe_mode_transitions: u64,
    pub total_cpu_time_us: u64,
    pub last_cpu_time_us: u64,
    pub max_cpu_time_us: u64,
    /// State after the last tick.
    pub safe_mode: SafeModeState,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            ik_ticks: 0,
            chain_solves: 0,
            chains_skipped: 0,
            ccd_fallbacks: 0,
            divergent_ik_total: 0,
            frame_budget_exceeded_total: 0,
            sustained_degradation_total: 0,
            safe_mode_transitions: 0,
            total_cpu_time_us: 0,
            last_cpu_time_us: 0,
            max_cpu_time_us: 0,
            safe_mode: SafeModeState::Normal,
        }
    }

    /// Fold one tick's output into the counters.
    pub fn record(&mut self, output: &TickOutput, state: SafeModeState) {
        self.ticks += 1;
        if !output.chains.is_empty() {
            self.ik_ticks += 1;
        }
        for chain in &output.chains {
            if chain.skipped {
                self.chains_skipped += 1;
            } else {
                self.chain_solves += 1;
            }
            if chain.fell_back_to_ccd {
                self.ccd_fallbacks += 1;
            }
        }
        for signal in &output.signals {
            match signal {
                TickCondition::DivergentIk { .. } => self.divergent_ik_total += 1,
                TickCondition::FrameBudgetExceeded { .. } => self.frame_budget_exceeded_total += 1,
                TickCondition::SustainedDegradation { .. } => self.sustained_degradation_total += 1,
            }
        }
        let cpu = micros(output.cpu_time);
        self.total_cpu_time_us = self.total_cpu_time_us.saturating_add(cpu);
        self.last_cpu_time_us = cpu;
        self.max_cpu_time_us = self.max_cpu_time_us.max(cpu);
        if state != self.safe_mode {
            self.safe_mode_transitions += 1;
        }
        self.safe_mode = state;
    }

    /// Mean CPU time per tick in microseconds.
    pub fn mean_cpu_time_us(&self) -> Option<f64> {
        if self.ticks == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.total_cpu_time_us as f64 / self.ticks as f64)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

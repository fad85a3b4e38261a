//! The assembled engine.

use shadowplay_core::types::PuppetId;
use shadowplay_rig::RigGraph;

use crate::safe_mode::{SafeModeController, SafeModeState};
use crate::scheduler::{TickInput, TickOutput, TickScheduler};
use crate::stats::Diagnostics;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A tick scheduler under safe-mode control, with running diagnostics.
///
/// Built by [`EngineBuilder`](crate::EngineBuilder). One engine is one
/// session; its state is owned exclusively and never shared.
#[derive(Debug)]
pub struct Engine {
    controller: SafeModeController,
    diagnostics: Diagnostics,
}

impl Engine {
    pub const fn new(controller: SafeModeController) -> Self {
        Self {
            controller,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Run one tick and record it in the diagnostics.
    pub fn tick(&mut self, input: &TickInput) -> TickOutput {
        let output = self.controller.tick(input);
        self.diagnostics.record(&output, self.controller.state());
        output
    }

    /// Register another puppet mid-session.
    pub fn add_puppet(&mut self, rig: RigGraph) -> PuppetId {
        self.controller.scheduler_mut().add_puppet(rig)
    }

    pub fn rig(&self, puppet: PuppetId) -> Option<&RigGraph> {
        self.controller.scheduler().rig(puppet)
    }

    pub fn puppet_count(&self) -> usize {
        self.controller.scheduler().puppet_count()
    }

    /// Safe-mode state the next tick will run under.
    pub const fn state(&self) -> SafeModeState {
        self.controller.state()
    }

    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub const fn controller(&self) -> &SafeModeController {
        &self.controller
    }

    pub const fn scheduler(&self) -> &TickScheduler {
        self.controller.scheduler()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

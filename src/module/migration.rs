use super::{select_best_location, ModuleOutcome, ModuleParameters};
use crate::agent::CellAgent;
use crate::context::{CellEvent, StepContext};
use anyhow::Result;
use cellsim_common::CellState;
use log::trace;

/// Moves the cell one patch outward-or-toward-glucose after it has crawled
/// the width of a patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub ticker: u64,
    rate: f64,
}

impl Migration {
    pub fn new(params: &ModuleParameters) -> Self {
        Migration { ticker: 0, rate: params.migration_rate }
    }

    /// Ticks needed to cross one patch at MIGRATION_RATE (um per tick).
    pub fn duration(&self, patch_size: f64) -> u64 {
        (patch_size / self.rate).round() as u64
    }

    pub fn step(&mut self, agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        let duration = self.duration(ctx.geometry().size);
        if self.ticker < duration {
            self.ticker += 1;
            return Ok(ModuleOutcome::Continue);
        }

        match select_best_location(agent, ctx, agent.volume(), false) {
            None => {
                trace!("cell {} has nowhere to migrate", agent.id());
                agent.set_state(CellState::Quiescent)?;
            }
            Some(to) => {
                let from = agent.location();
                ctx.grid.relocate(agent.id(), from, to);
                agent.core.location = to;
                ctx.emit(CellEvent::Migrated { id: agent.id(), from, to });
                agent.set_state(CellState::Undefined)?;
            }
        }
        Ok(ModuleOutcome::Continue)
    }
}

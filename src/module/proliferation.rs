use super::{select_best_location, ModuleOutcome, ModuleParameters};
use crate::agent::CellAgent;
use crate::context::StepContext;
use crate::division;
use anyhow::Result;
use cellsim_common::CellState;
use log::trace;

/// Grows the cell to twice its critical volume, waits out DNA synthesis and
/// then splits it into a free neighboring site.
#[derive(Debug, Clone, PartialEq)]
pub struct Proliferation {
    pub ticker: u64,
    pub synthesis_duration: u64,
}

impl Proliferation {
    pub fn new(params: &ModuleParameters) -> Self {
        Proliferation { ticker: 0, synthesis_duration: params.synthesis_duration }
    }

    pub fn step(&mut self, agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        let here = agent.location();
        let geometry = ctx.geometry();
        let height = (ctx.grid.total_volume(here) + agent.volume()) / geometry.area();
        if height > agent.core.critical_height {
            trace!("cell {} is too crowded to proliferate ({:.2} um)", agent.id(), height);
            agent.set_state(CellState::Quiescent)?;
            return Ok(ModuleOutcome::Continue);
        }

        let daughter_volume = agent.volume() * 0.5;
        let Some(site) = select_best_location(agent, ctx, daughter_volume, true) else {
            trace!("cell {} found no free site for a daughter", agent.id());
            agent.set_state(CellState::Quiescent)?;
            return Ok(ModuleOutcome::Continue);
        };

        if agent.volume() >= 2.0 * agent.core.critical_volume {
            if self.ticker > self.synthesis_duration {
                division::divide(agent, site, ctx)?;
            } else {
                self.ticker += 1;
            }
        }
        Ok(ModuleOutcome::Continue)
    }
}

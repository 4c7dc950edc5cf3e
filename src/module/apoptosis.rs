use super::{ModuleOutcome, ModuleParameters};
use crate::agent::CellAgent;
use crate::context::StepContext;
use anyhow::Result;
use cellsim_common::CellState;
use log::trace;
use rand::seq::IndexedRandom;

/// Programmed death: the cell lingers for DEATH_DURATION ticks, then frees its
/// space and nudges one quiescent neighbor back into the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Apoptosis {
    pub ticker: u64,
    pub duration: u64,
}

impl Apoptosis {
    pub fn new(params: &ModuleParameters) -> Self {
        Apoptosis { ticker: 0, duration: params.death_duration }
    }

    pub fn step(&mut self, agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        if self.ticker < self.duration {
            self.ticker += 1;
            return Ok(ModuleOutcome::Continue);
        }

        let quiescent: Vec<_> = ctx
            .grid
            .agents_around(agent.location())
            .into_iter()
            .filter(|id| *id != agent.id())
            .filter(|id| {
                ctx.grid.get(*id).is_some_and(|other| other.state() == CellState::Quiescent && !other.held)
            })
            .collect();
        if let Some(&id) = quiescent.choose(ctx.rng) {
            if let Some(neighbor) = ctx.grid.get_mut(id) {
                neighbor.set_state(CellState::Proliferative)?;
                trace!("cell {} frees space for quiescent neighbor {}", agent.id(), id);
            }
        }
        Ok(ModuleOutcome::Remove)
    }
}

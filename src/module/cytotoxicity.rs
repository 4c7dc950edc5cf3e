use super::{ModuleOutcome, ModuleParameters};
use crate::agent::CellAgent;
use crate::binding;
use crate::context::{CellEvent, StepContext};
use anyhow::Result;
use cellsim_common::CellState;
use log::{debug, trace};
use rand::Rng;

/// An effector's engagement with its bound target.
///
/// Cytotoxic engagements spend one unit of granzyme to drive the target into
/// apoptosis; stimulatory ones only hold it. Both release the target after a
/// sampled contact time and send the effector back to UNDEFINED.
#[derive(Debug, Clone, PartialEq)]
pub struct Engagement {
    pub ticker: u64,
    /// Contact time, drawn on the first step.
    pub delay: Option<u64>,
    pub cytotoxic: bool,
    killed: bool,
    bound_time: u64,
    bound_range: u64,
}

impl Engagement {
    pub fn new(params: &ModuleParameters, cytotoxic: bool) -> Self {
        Engagement {
            ticker: 0,
            delay: None,
            cytotoxic,
            killed: false,
            bound_time: params.bound_time,
            bound_range: params.bound_range,
        }
    }

    fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let spread = self.bound_range as f64 * (2.0 * rng.random::<f64>() - 1.0);
        (self.bound_time as f64 + spread).round().max(0.0) as u64
    }

    pub fn step(&mut self, agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        let delay = match self.delay {
            Some(d) => d,
            None => {
                let d = self.sample_delay(ctx.rng);
                self.delay = Some(d);
                d
            }
        };

        let me = agent.id();
        let target_id = match binding::engaged_target(agent, ctx.grid) {
            Ok(Some(target)) => target,
            Ok(None) => {
                debug!("effector {} lost its engagement before the contact ended", me);
                agent.set_state(CellState::Undefined)?;
                return Ok(ModuleOutcome::Continue);
            }
            Err(stale) => {
                debug!("{}; releasing", stale);
                binding::unbind(agent, ctx.grid)?;
                agent.set_state(CellState::Undefined)?;
                return Ok(ModuleOutcome::Continue);
            }
        };
        let target_dead = ctx.grid.get(target_id).is_some_and(|t| t.state().is_terminal());
        if target_dead && !self.killed {
            debug!("effector {} lets go of {} which died during the contact", me, target_id);
            binding::unbind(agent, ctx.grid)?;
            agent.set_state(CellState::Undefined)?;
            return Ok(ModuleOutcome::Continue);
        }

        if self.cytotoxic && !self.killed {
            let armed = agent.processes.inflammation.as_mut().is_some_and(|i| i.consume_granzyme());
            if armed {
                if let Some(target) = ctx.grid.get_mut(target_id) {
                    target.set_state(CellState::Apoptotic)?;
                }
                self.killed = true;
                trace!("effector {} killed {}", me, target_id);
                ctx.emit(CellEvent::Killed { effector: me, target: target_id });
            }
        }

        if self.ticker >= delay {
            binding::unbind(agent, ctx.grid)?;
            agent.set_state(CellState::Undefined)?;
        } else {
            self.ticker += 1;
        }
        Ok(ModuleOutcome::Continue)
    }
}

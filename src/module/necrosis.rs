use super::{ModuleOutcome, ModuleParameters};
use crate::agent::CellAgent;
use crate::context::StepContext;
use anyhow::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Necrosis {
    pub ticker: u64,
    pub duration: u64,
}

impl Necrosis {
    pub fn new(params: &ModuleParameters) -> Self {
        Necrosis { ticker: 0, duration: params.necrosis_duration }
    }

    pub fn step(&mut self, _agent: &mut CellAgent, _ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        if self.ticker < self.duration {
            self.ticker += 1;
            return Ok(ModuleOutcome::Continue);
        }
        Ok(ModuleOutcome::Remove)
    }
}

//! Timed behavior modules: bounded actions installed with a state.
//!
//! A module is a ticker plus a duration. It acts on its agent only through the
//! `&mut CellAgent` handed to `step`, and is dropped when the state changes or
//! the agent is removed.

mod apoptosis;
mod cytotoxicity;
mod migration;
mod necrosis;
mod proliferation;

pub use apoptosis::Apoptosis;
pub use cytotoxicity::Engagement;
pub use migration::Migration;
pub use necrosis::Necrosis;
pub use proliferation::Proliferation;

use crate::agent::CellAgent;
use crate::context::StepContext;
use crate::env::{Field, Lattice, Location};
use anyhow::Result;
use cellsim_common::{CellError, CellState, Parameters};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleParameters {
    pub death_duration: u64,
    pub necrosis_duration: u64,
    pub migration_rate: f64,
    pub accuracy: f64,
    pub affinity: f64,
    pub synthesis_duration: u64,
    pub bound_time: u64,
    pub bound_range: u64,
}

impl ModuleParameters {
    pub fn from_parameters(params: &Parameters) -> Result<Self, CellError> {
        Ok(ModuleParameters {
            death_duration: params.get_count("apoptosis/DEATH_DURATION")?,
            necrosis_duration: params.get_count("necrosis/NECROSIS_DURATION")?,
            migration_rate: params.get_positive("migration/MIGRATION_RATE")?,
            accuracy: params.get_fraction("migration/ACCURACY")?,
            affinity: params.get_fraction("migration/AFFINITY")?,
            synthesis_duration: params.get_count("proliferation/SYNTHESIS_DURATION")?,
            bound_time: params.get_count("cytotoxicity/BOUND_TIME")?,
            bound_range: params.get_count("cytotoxicity/BOUND_RANGE")?,
        })
    }
}

/// What the scheduler should do with the agent after its module stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOutcome {
    Continue,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Module {
    Apoptosis(Apoptosis),
    Necrosis(Necrosis),
    Migration(Migration),
    Proliferation(Proliferation),
    Cytotoxicity(Engagement),
    Stimulation(Engagement),
}

impl Module {
    /// The module installed on entering `state`, if any.
    pub fn for_state(state: CellState, params: &ModuleParameters) -> Option<Module> {
        match state {
            CellState::Apoptotic => Some(Module::Apoptosis(Apoptosis::new(params))),
            CellState::Necrotic => Some(Module::Necrosis(Necrosis::new(params))),
            CellState::Migratory => Some(Module::Migration(Migration::new(params))),
            CellState::Proliferative => Some(Module::Proliferation(Proliferation::new(params))),
            CellState::Cytotoxic => Some(Module::Cytotoxicity(Engagement::new(params, true))),
            CellState::Stimulatory => Some(Module::Stimulation(Engagement::new(params, false))),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Module::Apoptosis(_) => "apoptosis",
            Module::Necrosis(_) => "necrosis",
            Module::Migration(_) => "migration",
            Module::Proliferation(_) => "proliferation",
            Module::Cytotoxicity(_) => "cytotoxicity",
            Module::Stimulation(_) => "stimulation",
        }
    }

    pub fn ticker(&self) -> u64 {
        match self {
            Module::Apoptosis(m) => m.ticker,
            Module::Necrosis(m) => m.ticker,
            Module::Migration(m) => m.ticker,
            Module::Proliferation(m) => m.ticker,
            Module::Cytotoxicity(m) | Module::Stimulation(m) => m.ticker,
        }
    }

    pub fn step(&mut self, agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        match self {
            Module::Apoptosis(m) => m.step(agent, ctx),
            Module::Necrosis(m) => m.step(agent, ctx),
            Module::Migration(m) => m.step(agent, ctx),
            Module::Proliferation(m) => m.step(agent, ctx),
            Module::Cytotoxicity(m) | Module::Stimulation(m) => m.step(agent, ctx),
        }
    }
}

/// Picks the best site that can take `volume` more cells' worth of space.
///
/// Sites are scored by `AFFINITY * distance + (1 - AFFINITY) * (ACCURACY *
/// glucose / max_glucose + (1 - ACCURACY) * U)`, where the distance term
/// favors moving outward. Ties resolve uniformly at random.
pub fn select_best_location(
    agent: &CellAgent,
    ctx: &mut StepContext<'_>,
    volume: f64,
    include_own: bool,
) -> Option<Location> {
    let here = agent.location();
    let mut sites = ctx.grid.neighbors(here);
    if include_own {
        sites.push(here);
    }
    let max_height = agent.core.critical_height;
    let mut free: Vec<Location> = sites
        .into_iter()
        .filter(|site| {
            // The stepping agent is checked out, so its own patch must count it explicitly.
            let extra = if *site == here { agent.volume() } else { 0.0 };
            ctx.grid.fits(*site, volume, extra, max_height)
        })
        .collect();
    if free.is_empty() {
        return None;
    }
    free.shuffle(ctx.rng);

    let max_glucose = ctx.lattice.max_value(Field::Glucose, &free);
    let params = &agent.module_params;
    let r_self = here.radius() as f64;
    let mut best: Option<(f64, Location)> = None;
    for site in free {
        let distance = (r_self - site.radius() as f64 + 1.0) / 2.0;
        let glucose = if max_glucose > 0.0 {
            ctx.lattice.average_value(Field::Glucose, site) / max_glucose
        } else {
            0.0
        };
        let noise: f64 = ctx.rng.random();
        let score = params.affinity * distance
            + (1.0 - params.affinity) * (params.accuracy * glucose + (1.0 - params.accuracy) * noise);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, site));
        }
    }
    best.map(|(_, site)| site)
}

//! Cell division: daughter creation and proportional redistribution.

use crate::agent::CellAgent;
use crate::container::CellContainer;
use crate::context::{CellEvent, StepContext};
use crate::env::{AgentId, Location};
use anyhow::{Context, Result};
use cellsim_common::{CellState, CellVariant};
use log::trace;
use rand::Rng;

/// Range of the daughter's share of volume, energy and every process pool.
pub const SPLIT_RANGE: std::ops::Range<f64> = 0.45..0.55;

/// Splits `parent` and places the daughter at `site`.
///
/// The daughter inherits the parent's sampled parameters and receives a
/// fraction `f ~ U(0.45, 0.55)` of volume, energy and every process pool; the
/// parent keeps `1 - f`. Both cells leave division UNDEFINED.
pub fn divide(parent: &mut CellAgent, site: Location, ctx: &mut StepContext<'_>) -> Result<AgentId> {
    let fraction = ctx.rng.random_range(SPLIT_RANGE);
    let id = ctx.grid.next_id();

    let cycle = parent.current_cycle();
    parent.cycles.push(cycle);
    parent.last_division_age = parent.age;
    if parent.variant != CellVariant::CancerStem {
        parent.divisions = parent.divisions.saturating_sub(1);
    }

    let total_volume = parent.volume();
    let total_energy = parent.core.energy;
    let container = CellContainer {
        id,
        parent: Some(parent.id()),
        state: CellState::Undefined,
        volume: total_volume * fraction,
        cycles: Vec::new(),
        ..CellContainer::from_agent(parent)
    };
    let mut daughter = container
        .convert(ctx.factory, site, ctx.rng, Some(&parent.parameters))
        .with_context(|| format!("building daughter of cell {}", parent.id()))?;
    daughter.last_division_age = parent.age;

    parent.core.set_volume(total_volume * (1.0 - fraction))?;
    parent.core.energy = total_energy * (1.0 - fraction);
    daughter.core.energy = total_energy * fraction;
    daughter.processes = parent.processes.split(fraction);
    if let (Some(mine), Some(theirs)) = (parent.effector.as_ref(), daughter.effector.as_mut()) {
        theirs.cars = mine.cars;
        theirs.self_receptors = mine.self_receptors;
    }

    parent.set_state(CellState::Undefined)?;
    trace!("cell {} divided into {} at {:?} (f = {:.3})", parent.id(), id, site, fraction);
    ctx.grid.add(daughter);
    ctx.emit(CellEvent::Divided { parent: parent.id(), daughter: id });
    Ok(id)
}

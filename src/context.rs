use crate::agent::factory::CellFactory;
use crate::env::{AgentId, LatticeTransaction, Location, PatchGeometry, PatchGrid};
use cellsim_common::CellState;
use rand::rngs::StdRng;

/// Discrete events emitted while agents step; the simulation folds them into snapshot counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellEvent {
    Divided { parent: AgentId, daughter: AgentId },
    Removed { id: AgentId, state: CellState },
    Killed { effector: AgentId, target: AgentId },
    Migrated { id: AgentId, from: Location, to: Location },
}

/// Everything an agent may touch during its own tick.
///
/// The lattice is a staged transaction; the random source and event sink are
/// injected here instead of living in globals.
pub struct StepContext<'a> {
    pub tick: u64,
    pub grid: &'a mut PatchGrid,
    pub lattice: LatticeTransaction<'a>,
    pub rng: &'a mut StdRng,
    pub events: &'a mut Vec<CellEvent>,
    pub factory: &'a CellFactory,
}

impl StepContext<'_> {
    pub fn geometry(&self) -> PatchGeometry {
        *self.grid.geometry()
    }

    pub fn emit(&mut self, event: CellEvent) {
        self.events.push(event);
    }
}

use crate::agent::factory::CellFactory;
use crate::agent::CellAgent;
use crate::binding;
use crate::context::{CellEvent, StepContext};
use crate::env::{AgentId, LatticeTransaction, PatchGeometry, PatchGrid, PatchLattice};
use crate::module::ModuleOutcome;
use anyhow::{Context, Result};
use cellsim_common::{CellRecord, CellState, EventCounts, SimulationConfig, Snapshot};
use log::{debug, error, info, trace};
use rand::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;

/// One replicate of the agent-based simulation.
pub struct CellSimulation {
    /// The simulation configuration, including initial conditions and parameters.
    config: SimulationConfig,
    /// Index of this replicate; offsets the base seed.
    replicate: u32,
    grid: PatchGrid,
    lattice: PatchLattice,
    factory: CellFactory,
    /// Single random source for placement, scheduling and every agent draw.
    rng: StdRng,
    tick: u64,
    /// Events since the last snapshot.
    events: EventCounts,
    /// Stores collected simulation data snapshots at record intervals.
    recorded_snapshots: Vec<Snapshot>,
}

impl CellSimulation {
    /// Builds the environment and places the initial populations.
    ///
    /// Every configuration error surfaces here, before the first tick.
    pub fn new(config: SimulationConfig, replicate: u32) -> Result<Self> {
        let seed = config.initial_conditions.seed.wrapping_add(replicate as u64);
        let mut rng = StdRng::seed_from_u64(seed);

        let factory = CellFactory::from_config(&config).context("building cell populations")?;
        let geometry = PatchGeometry::from_config(&config.grid);
        let lattice = PatchLattice::new(geometry, &config.environment).context("building molecule lattice")?;
        let mut grid = PatchGrid::new(geometry).with_max_agents(config.grid.max_agents_per_patch);
        factory.populate(&mut grid, &mut rng)?;
        debug!("Replicate {} seeded with {} ({} agents).", replicate, seed, grid.len());

        Ok(CellSimulation {
            config,
            replicate,
            grid,
            lattice,
            factory,
            rng,
            tick: 0,
            events: EventCounts::default(),
            recorded_snapshots: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &PatchGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut PatchGrid {
        &mut self.grid
    }

    pub fn lattice(&self) -> &PatchLattice {
        &self.lattice
    }

    pub fn lattice_mut(&mut self) -> &mut PatchLattice {
        &mut self.lattice
    }

    pub fn factory(&self) -> &CellFactory {
        &self.factory
    }

    pub fn current_cell_count(&self) -> usize {
        self.grid.len()
    }

    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    /// Advances every live agent by one tick in a freshly shuffled order, then
    /// relaxes the lattice toward its sources.
    pub fn step(&mut self) -> Result<()> {
        self.tick += 1;
        let mut order = self.grid.ids();
        order.shuffle(&mut self.rng);
        for id in order {
            self.step_agent(id)?;
        }
        self.lattice.relax();
        Ok(())
    }

    /// Steps one agent inside its own lattice transaction.
    fn step_agent(&mut self, id: AgentId) -> Result<()> {
        // Agents removed earlier in the tick are skipped.
        let Some(mut agent) = self.grid.take(id) else {
            return Ok(());
        };
        let tick = self.tick;
        let mut events = Vec::new();
        let (outcome, writes) = {
            let mut ctx = StepContext {
                tick,
                grid: &mut self.grid,
                lattice: LatticeTransaction::new(&self.lattice),
                rng: &mut self.rng,
                events: &mut events,
                factory: &self.factory,
            };
            let outcome = agent.step(&mut ctx);
            (outcome, ctx.lattice.into_writes())
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Cell {} failed at tick {}: {:#}", id, tick, e);
                self.grid.restore(agent);
                return Err(e.context(format!("cell {} at tick {}", id, tick)));
            }
        };
        self.lattice.apply(writes);

        match outcome {
            ModuleOutcome::Continue => self.grid.restore(agent),
            ModuleOutcome::Remove => {
                let state = agent.state();
                binding::unbind(&mut agent, &mut self.grid)?;
                self.grid.release(id, agent.location());
                trace!("cell {} removed as {}", id, state);
                events.push(CellEvent::Removed { id, state });
            }
        }
        for event in events {
            self.count(event);
        }
        Ok(())
    }

    fn count(&mut self, event: CellEvent) {
        match event {
            CellEvent::Divided { .. } => self.events.divisions += 1,
            CellEvent::Removed { state: CellState::Necrotic, .. } => self.events.necrotic_removals += 1,
            CellEvent::Removed { .. } => self.events.apoptotic_removals += 1,
            CellEvent::Killed { .. } => self.events.kills += 1,
            CellEvent::Migrated { .. } => self.events.migrations += 1,
        }
    }

    pub fn cell_records(&self) -> Vec<CellRecord> {
        self.grid.agents().map(record_of).collect()
    }

    /// Records a snapshot of the current tick and resets the event counters.
    pub fn record_snapshot(&mut self) -> Result<()> {
        let mut state_counts = BTreeMap::new();
        let mut population_counts = vec![0u32; self.factory.templates().len()];
        for agent in self.grid.agents() {
            *state_counts.entry(agent.state()).or_insert(0) += 1;
            if let Some(count) = population_counts.get_mut(agent.population) {
                *count += 1;
            }
        }
        let cells = if self.config.output.cells_in_snapshot { Some(self.cell_records()) } else { None };
        let snapshot = Snapshot {
            replicate: self.replicate,
            tick: self.tick,
            total_cell_count: self.grid.len() as u32,
            state_counts,
            population_counts,
            events: std::mem::take(&mut self.events),
            cells,
        };
        debug!("Snapshot at tick {}: {:?}", snapshot.tick, snapshot.state_counts);
        self.recorded_snapshots.push(snapshot);
        Ok(())
    }

    /// Runs every configured tick, recording at the configured interval.
    pub fn run(&mut self) -> Result<()> {
        let total_ticks = self.config.timing.total_ticks;
        let interval = self.config.timing.record_interval_ticks.max(1);
        let start_time = Instant::now();

        self.record_snapshot()?;
        for _ in 0..total_ticks {
            self.step()?;
            let is_record_tick = self.tick % interval == 0;
            let is_last_tick = self.tick == total_ticks;
            if is_record_tick || is_last_tick {
                self.record_snapshot()?;
                info!(
                    "Replicate {} | Tick [{}/{}] | Cells: {} | Elapsed: {:.2} s",
                    self.replicate,
                    self.tick,
                    total_ticks,
                    self.current_cell_count(),
                    start_time.elapsed().as_secs_f64()
                );
            }
        }
        Ok(())
    }

    /// Consumes the simulation, returning its snapshots and final cell table.
    pub fn into_results(self) -> (Vec<Snapshot>, Vec<CellRecord>) {
        let cells = self.cell_records();
        (self.recorded_snapshots, cells)
    }
}

fn record_of(agent: &CellAgent) -> CellRecord {
    let loc = agent.location();
    CellRecord {
        id: agent.id().0,
        parent: agent.parent.map(|p| p.0),
        population: agent.population,
        state: agent.state(),
        location: (loc.x, loc.y),
        volume: agent.volume(),
        energy: agent.core.energy,
        age: agent.age,
        divisions: agent.divisions,
        cycles: agent.cycles.clone(),
    }
}

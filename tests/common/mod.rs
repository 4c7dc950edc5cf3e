//! Shared fixtures: a small grid, its lattice and a factory for hand-placed agents.
#![allow(dead_code)]

use cellsim_common::{CellState, Parameters, SimulationConfig};
use cellsim_engine::agent::CellAgent;
use cellsim_engine::env::{AgentId, LatticeTransaction, Location, PatchGeometry, PatchGrid, PatchLattice};
use cellsim_engine::{CellContainer, CellEvent, CellFactory, StepContext};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const TUMOR: usize = 0;
pub const KILLERS: usize = 1;
pub const HELPERS: usize = 2;
pub const STEM: usize = 3;
pub const RANDOM: usize = 4;
pub const SYNNOTCH: usize = 5;

pub fn config(max_agents_per_patch: usize) -> SimulationConfig {
    let text = format!(
        r#"
        [timing]
        total_ticks = 10

        [grid]
        radius = 3
        max_agents_per_patch = {}

        [environment]
        glucose = {{ initial = 0.005, relaxation_rate = 0.05 }}
        oxygen = {{ initial = 100.0, relaxation_rate = 0.5 }}
        tgfa = {{ initial = 0.0 }}
        il2 = {{ initial = 0.0 }}

        [initial_conditions]
        seed = 17

        [[populations]]
        name = "tumor"
        class = "cancer"
        init = 0

        [[populations]]
        name = "killers"
        class = "cart_cd8"
        init = 0

        [[populations]]
        name = "helpers"
        class = "cart_cd4"
        init = 0

        [[populations]]
        name = "stem"
        class = "cancer_stem"
        init = 0

        [[populations]]
        name = "noise"
        class = "random"
        init = 0

        [[populations]]
        name = "gated"
        class = "cart_synnotch"
        init = 0

        [output]
        base_filename = "unused"
        "#,
        max_agents_per_patch
    );
    SimulationConfig::from_toml_str(&text).expect("fixture config parses")
}

pub struct World {
    pub grid: PatchGrid,
    pub lattice: PatchLattice,
    pub rng: StdRng,
    pub factory: CellFactory,
    pub events: Vec<CellEvent>,
    pub tick: u64,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self::with_capacity(seed, 6)
    }

    pub fn with_capacity(seed: u64, max_agents_per_patch: usize) -> Self {
        let config = config(max_agents_per_patch);
        let geometry = PatchGeometry::from_config(&config.grid);
        World {
            grid: PatchGrid::new(geometry).with_max_agents(max_agents_per_patch),
            lattice: PatchLattice::new(geometry, &config.environment).expect("lattice"),
            rng: StdRng::seed_from_u64(seed),
            factory: CellFactory::from_config(&config).expect("factory"),
            events: Vec::new(),
            tick: 0,
        }
    }

    /// Builds an agent without placing it on the grid.
    pub fn make(
        &mut self,
        population: usize,
        location: Location,
        state: CellState,
        tweak: impl FnOnce(&mut Parameters),
    ) -> CellAgent {
        let mut params = Parameters::with_defaults();
        tweak(&mut params);
        let id = self.grid.next_id();
        let mut container = CellContainer::seed(id, population, &params).expect("container");
        container.state = state;
        container
            .convert(&self.factory, location, &mut self.rng, Some(&params))
            .expect("agent builds")
    }

    /// Builds an agent and places it on the grid.
    pub fn spawn(
        &mut self,
        population: usize,
        location: Location,
        state: CellState,
        tweak: impl FnOnce(&mut Parameters),
    ) -> AgentId {
        let agent = self.make(population, location, state, tweak);
        let id = agent.id();
        self.grid.add(agent);
        id
    }

    /// Runs `f` against a free-standing agent with a committed lattice transaction.
    pub fn run<T>(&mut self, agent: &mut CellAgent, f: impl FnOnce(&mut CellAgent, &mut StepContext<'_>) -> T) -> T {
        self.tick += 1;
        let (out, writes) = {
            let mut ctx = StepContext {
                tick: self.tick,
                grid: &mut self.grid,
                lattice: LatticeTransaction::new(&self.lattice),
                rng: &mut self.rng,
                events: &mut self.events,
                factory: &self.factory,
            };
            let out = f(agent, &mut ctx);
            (out, ctx.lattice.into_writes())
        };
        self.lattice.apply(writes);
        out
    }

    /// Checks a placed agent out, runs `f` on it and checks it back in.
    pub fn with_agent<T>(&mut self, id: AgentId, f: impl FnOnce(&mut CellAgent, &mut StepContext<'_>) -> T) -> T {
        let mut agent = self.grid.take(id).expect("agent is on the grid");
        let out = self.run(&mut agent, f);
        self.grid.restore(agent);
        out
    }

    pub fn agent(&self, id: AgentId) -> &CellAgent {
        self.grid.get(id).expect("agent is on the grid")
    }
}

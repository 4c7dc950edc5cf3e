//! Cell behavior engine for an agent-based simulation of tissue, cancer and
//! engineered immune cells on a patch lattice.

pub mod agent;
pub mod binding;
pub mod container;
pub mod context;
pub mod division;
pub mod env;
pub mod module;
pub mod process;
pub mod series;
pub mod simulation;

pub use agent::factory::CellFactory;
pub use agent::CellAgent;
pub use container::CellContainer;
pub use context::{CellEvent, StepContext};
pub use series::{run_series, ReplicateResult};
pub use simulation::CellSimulation;

pub mod config;
pub mod error;
pub mod parameters;
pub mod snapshot;
pub mod state;

// Re-export key types for easier use by dependent crates
pub use config::{
    CellVariant, EnvironmentConfig, FieldConfig, GridConfig, InitialConditions, OutputConfig,
    PopulationConfig, ProcessVersions, SimulationConfig, TimingConfig,
};
pub use error::CellError;
pub use parameters::{ParameterSpec, Parameters, DEFAULT_PARAMETERS};
pub use snapshot::{CellRecord, EventCounts, Snapshot};
pub use state::{BindingFlag, CellState};

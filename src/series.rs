//! Independent replicate runs, executed in parallel.

use crate::simulation::CellSimulation;
use anyhow::{Context, Result};
use cellsim_common::{CellRecord, SimulationConfig, Snapshot};
use log::info;
use rayon::prelude::*;

/// Output of one replicate.
#[derive(Debug, Clone)]
pub struct ReplicateResult {
    pub replicate: u32,
    pub snapshots: Vec<Snapshot>,
    pub cells: Vec<CellRecord>,
}

/// Runs `replicates` simulations with seeds `seed + replicate` on the rayon pool.
///
/// Each replicate is strictly sequential inside; results come back in replicate order.
pub fn run_series(config: &SimulationConfig) -> Result<Vec<ReplicateResult>> {
    let replicates = config.initial_conditions.replicates;
    info!("Running {} replicate(s) on {} Rayon threads.", replicates, rayon::current_num_threads());
    (0..replicates)
        .into_par_iter()
        .map(|replicate| {
            let mut sim = CellSimulation::new(config.clone(), replicate)
                .with_context(|| format!("initializing replicate {}", replicate))?;
            sim.run().with_context(|| format!("running replicate {}", replicate))?;
            let (snapshots, cells) = sim.into_results();
            Ok(ReplicateResult { replicate, snapshots, cells })
        })
        .collect()
}

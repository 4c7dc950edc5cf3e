use crate::state::CellState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-cell record written into snapshots and the final cell table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: u32,
    pub parent: Option<u32>,
    pub population: usize,
    pub state: CellState,
    pub location: (i32, i32),
    pub volume: f64,
    pub energy: f64,
    pub age: u64,
    pub divisions: u32,
    pub cycles: Vec<u64>,
}

/// Counters of discrete events accumulated since the previous snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub divisions: u32,
    pub apoptotic_removals: u32,
    pub necrotic_removals: u32,
    pub kills: u32,
    pub migrations: u32,
}

/// A snapshot of the simulation state and metrics at a specific tick.
#[derive(Debug, Clone, Serialize, Deserialize)] // Derive traits for easy saving/loading
pub struct Snapshot {
    /// Replicate index this snapshot belongs to.
    pub replicate: u32,
    /// The simulation tick at which the snapshot was taken.
    pub tick: u64,
    /// The total number of live agents.
    pub total_cell_count: u32,
    /// Number of agents in each state; states with no agents are omitted.
    pub state_counts: BTreeMap<CellState, u32>,
    /// Number of agents in each population, indexed like the config populations.
    pub population_counts: Vec<u32>,
    /// Events since the previous snapshot.
    pub events: EventCounts,
    #[serde(skip_serializing_if = "Option::is_none")] // Don't write "cells": null
    pub cells: Option<Vec<CellRecord>>,
}

impl Snapshot {
    pub fn count(&self, state: CellState) -> u32 {
        self.state_counts.get(&state).copied().unwrap_or(0)
    }
}

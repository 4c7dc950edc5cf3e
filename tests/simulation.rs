use cellsim_common::{CellState, SimulationConfig};
use cellsim_engine::{run_series, CellSimulation};

const CONFIG: &str = r#"
    [timing]
    total_ticks = 30
    record_interval_ticks = 10

    [grid]
    radius = 4

    [environment]
    glucose = { initial = 0.005, relaxation_rate = 0.05 }
    oxygen = { initial = 100.0, relaxation_rate = 0.5 }
    tgfa = { initial = 0.0 }
    il2 = { initial = 0.0 }

    [initial_conditions]
    seed = 7
    replicates = 2

    [[populations]]
    name = "tumor"
    class = "cancer"
    init = 12
    [populations.parameters]
    CAR_ANTIGENS = 5000.0

    [[populations]]
    name = "killers"
    class = "cart_cd8"
    init = 4

    [[populations]]
    name = "helpers"
    class = "cart_cd4"
    init = 2

    [output]
    base_filename = "unused"
    cells_in_snapshot = true
"#;

fn config() -> SimulationConfig {
    SimulationConfig::from_toml_str(CONFIG).expect("test config parses")
}

#[test]
fn initial_populations_are_placed_from_the_center() {
    let sim = CellSimulation::new(config(), 0).unwrap();
    assert_eq!(sim.current_cell_count(), 18);
    let max_radius = sim.grid().agents().map(|a| a.location().radius()).max().unwrap();
    // Three default-sized cells fill a patch; the center and first ring hold 27.
    assert!(max_radius <= 1, "cells spread to radius {}", max_radius);
    assert!(sim.grid().agents().all(|a| a.state() == CellState::Undefined));
}

#[test]
fn snapshots_cover_every_record_tick() {
    let mut sim = CellSimulation::new(config(), 0).unwrap();
    sim.run().unwrap();
    let ticks: Vec<u64> = sim.recorded_snapshots().iter().map(|s| s.tick).collect();
    assert_eq!(ticks, vec![0, 10, 20, 30]);

    for snapshot in sim.recorded_snapshots() {
        let by_state: u32 = snapshot.state_counts.values().sum();
        let by_population: u32 = snapshot.population_counts.iter().sum();
        assert_eq!(by_state, snapshot.total_cell_count, "tick {}", snapshot.tick);
        assert_eq!(by_population, snapshot.total_cell_count, "tick {}", snapshot.tick);
        let cells = snapshot.cells.as_ref().expect("cells requested");
        assert_eq!(cells.len() as u32, snapshot.total_cell_count);
    }
    assert_eq!(sim.tick(), 30);
}

#[test]
fn live_agents_keep_positive_volume_and_registered_locations() {
    let mut sim = CellSimulation::new(config(), 1).unwrap();
    for _ in 0..30 {
        sim.step().unwrap();
        for agent in sim.grid().agents() {
            assert!(agent.volume() > 0.0, "cell {} has volume {}", agent.id(), agent.volume());
            assert!(sim.grid().is_registered(agent.id(), agent.location()));
        }
    }
}

#[test]
fn same_seed_same_history() {
    let run = |replicate| {
        let mut sim = CellSimulation::new(config(), replicate).unwrap();
        sim.run().unwrap();
        let (snapshots, cells) = sim.into_results();
        (serde_json::to_string(&snapshots).unwrap(), serde_json::to_string(&cells).unwrap())
    };
    assert_eq!(run(0), run(0));
}

#[test]
fn series_returns_replicates_in_order() {
    let results = run_series(&config()).unwrap();
    assert_eq!(results.iter().map(|r| r.replicate).collect::<Vec<_>>(), vec![0, 1]);
    for result in &results {
        let last = result.snapshots.last().expect("snapshots recorded");
        assert_eq!(last.tick, 30);
        assert_eq!(last.total_cell_count as usize, result.cells.len());
    }
}

#[test]
fn unknown_class_is_rejected_at_load() {
    let broken = CONFIG.replace("class = \"cart_cd4\"", "class = \"macrophage\"");
    assert!(SimulationConfig::from_toml_str(&broken).is_err());
}

#[test]
fn inflammation_on_tissue_is_a_configuration_error() {
    let broken = CONFIG.replace(
        "CAR_ANTIGENS = 5000.0",
        "CAR_ANTIGENS = 5000.0\n    [populations.processes]\n    inflammation = \"cd8\"",
    );
    let config = SimulationConfig::from_toml_str(&broken).unwrap();
    let err = CellSimulation::new(config, 0).err().expect("tumor cells cannot carry inflammation");
    assert!(format!("{:#}", err).contains("inflammation"), "{:#}", err);
}

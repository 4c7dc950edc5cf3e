mod common;

use cellsim_common::{CellError, CellState};
use cellsim_engine::agent::transition;
use cellsim_engine::env::Location;
use cellsim_engine::module::ModuleOutcome;
use common::{World, KILLERS, RANDOM, STEM, TUMOR};

#[test]
fn apoptotic_state_is_absorbing() {
    let mut world = World::new(1);
    let id = world.spawn(TUMOR, Location::CENTER, CellState::Undefined, |p| {
        p.insert("apoptosis/DEATH_DURATION", 30.0);
    });
    world.with_agent(id, |agent, _| agent.set_state(CellState::Apoptotic)).unwrap();

    for target in [CellState::Proliferative, CellState::Quiescent, CellState::Necrotic, CellState::Undefined] {
        world.with_agent(id, |agent, _| agent.set_state(target)).unwrap();
        assert_eq!(world.agent(id).state(), CellState::Apoptotic, "assignment of {} escaped", target);
    }

    let mut removed = false;
    for tick in 0..40 {
        let mut agent = world.grid.take(id).unwrap();
        agent.core.migratory = true;
        let outcome = world.run(&mut agent, |a, ctx| a.step(ctx)).unwrap();
        assert_eq!(agent.state(), CellState::Apoptotic, "left apoptosis at tick {}", tick);
        if outcome == ModuleOutcome::Remove {
            removed = true;
            break;
        }
        world.grid.restore(agent);
    }
    assert!(removed, "apoptosis never completed");
}

#[test]
fn tissue_cells_reject_effector_states() {
    let mut world = World::new(2);
    let id = world.spawn(TUMOR, Location::CENTER, CellState::Undefined, |_| {});
    let err = world.with_agent(id, |agent, _| agent.set_state(CellState::Cytotoxic)).unwrap_err();
    assert!(matches!(err, CellError::InvariantViolation(_)), "got {:?}", err);
    assert_eq!(world.agent(id).state(), CellState::Undefined);
}

#[test]
fn energy_deficit_splits_between_necrosis_and_apoptosis() {
    let mut world = World::new(3);
    let trials = 1000;
    let mut necrotic = 0;
    let mut apoptotic = 0;
    for _ in 0..trials {
        let mut agent = world.make(TUMOR, Location::CENTER, CellState::Undefined, |p| {
            p.insert("ENERGY_THRESHOLD", -100.0);
            p.insert("NECROTIC_FRACTION", 0.3);
        });
        agent.core.energy = -50.0;
        world.run(&mut agent, |a, ctx| transition::check_energy(a, ctx)).unwrap();
        match agent.state() {
            CellState::Necrotic => necrotic += 1,
            CellState::Apoptotic => apoptotic += 1,
            other => panic!("unexpected state {}", other),
        }
    }
    let fraction = necrotic as f64 / trials as f64;
    assert!((fraction - 0.3).abs() < 0.05, "necrotic fraction {}", fraction);
    assert_eq!(necrotic + apoptotic, trials);
}

#[test]
fn mild_deficit_makes_tissue_quiescent() {
    let mut world = World::new(4);
    let mut agent = world.make(TUMOR, Location::CENTER, CellState::Proliferative, |_| {});
    agent.core.energy = -0.5;
    world.run(&mut agent, |a, ctx| transition::check_energy(a, ctx)).unwrap();
    assert_eq!(agent.state(), CellState::Quiescent);
    assert!(!transition::needs_resolution(&agent), "starving quiescent cell must not resolve");
    agent.core.energy = 0.2;
    assert!(transition::needs_resolution(&agent));
}

#[test]
fn effector_starves_and_recovers() {
    let mut world = World::new(5);
    let mut agent = world.make(KILLERS, Location::CENTER, CellState::Proliferative, |_| {});
    agent.core.energy = -0.5;
    world.run(&mut agent, |a, ctx| transition::check_energy(a, ctx)).unwrap();
    assert_eq!(agent.state(), CellState::Starved);
    agent.core.energy = 0.5;
    world.run(&mut agent, |a, ctx| transition::check_energy(a, ctx)).unwrap();
    assert_eq!(agent.state(), CellState::Undefined);
}

#[test]
fn resolution_follows_migratory_flag_then_divisions() {
    let mut world = World::new(6);
    let mut migrating = world.make(TUMOR, Location::CENTER, CellState::Undefined, |_| {});
    migrating.core.migratory = true;
    world.run(&mut migrating, |a, ctx| transition::resolve(a, ctx)).unwrap();
    assert_eq!(migrating.state(), CellState::Migratory);

    let mut dividing = world.make(TUMOR, Location::CENTER, CellState::Undefined, |_| {});
    world.run(&mut dividing, |a, ctx| transition::resolve(a, ctx)).unwrap();
    assert_eq!(dividing.state(), CellState::Proliferative);

    for _ in 0..50 {
        let mut spent = world.make(STEM, Location::CENTER, CellState::Undefined, |p| {
            p.insert("DIVISION_POTENTIAL", 0.0);
        });
        world.run(&mut spent, |a, ctx| transition::resolve(a, ctx)).unwrap();
        assert!(
            matches!(spent.state(), CellState::Senescent | CellState::Apoptotic),
            "spent cell went {}",
            spent.state()
        );
    }
}

#[test]
fn random_class_only_reaches_core_states() {
    let mut world = World::new(7);
    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..300 {
        let mut agent = world.make(RANDOM, Location::CENTER, CellState::Undefined, |_| {});
        world.run(&mut agent, |a, ctx| transition::resolve(a, ctx)).unwrap();
        assert!(agent.state().is_core(), "random cell reached {}", agent.state());
        assert_ne!(agent.state(), CellState::Undefined);
        seen.insert(agent.state());
    }
    assert_eq!(seen.len(), 6, "saw {:?}", seen);
}

#[test]
fn lifespan_triggers_apoptosis() {
    let mut world = World::new(8);
    let mut agent = world.make(TUMOR, Location::CENTER, CellState::Quiescent, |p| {
        p.insert("APOPTOSIS_AGE", 5.0);
    });
    agent.age = 5;
    world.run(&mut agent, |a, ctx| a.step(ctx)).unwrap();
    assert_eq!(agent.state(), CellState::Apoptotic);
}

#[test]
fn serialized_form_is_compact_array() {
    let mut world = World::new(9);
    let agent = world.make(TUMOR, Location::new(1, 2), CellState::Quiescent, |_| {});
    let json = agent.to_json();
    let items = json.as_array().expect("array");
    assert_eq!(items.len(), 6);
    assert_eq!(items[1], TUMOR);
    assert_eq!(items[2], CellState::Quiescent.code());
    assert_eq!(items[3], serde_json::json!([1, 2]));
    assert_eq!(items[5], serde_json::json!([]));
}

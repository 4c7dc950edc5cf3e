mod common;

use cellsim_common::CellState;
use cellsim_engine::env::Location;
use cellsim_engine::module::{select_best_location, Module, ModuleOutcome};
use cellsim_engine::CellEvent;
use common::{World, STEM, TUMOR};

fn fast_migration(p: &mut cellsim_common::Parameters) {
    // One tick to cross a 30 um patch.
    p.insert("migration/MIGRATION_RATE", 30.0);
}

#[test]
fn migration_with_full_neighbors_goes_quiescent() {
    let mut world = World::with_capacity(31, 1);
    for loc in world.grid.neighbors(Location::CENTER) {
        world.spawn(TUMOR, loc, CellState::Quiescent, |_| {});
    }
    let mut agent = world.make(TUMOR, Location::CENTER, CellState::Migratory, fast_migration);
    world.grid.add(agent.clone());
    world.grid.take(agent.id());

    let volume = agent.volume();
    let site = world.run(&mut agent, |a, ctx| select_best_location(a, ctx, volume, false));
    assert_eq!(site, None);

    let mut module = agent.module().cloned().expect("migration module");
    for _ in 0..5 {
        if agent.state() != CellState::Migratory {
            break;
        }
        let outcome = world.run(&mut agent, |a, ctx| module.step(a, ctx)).expect("no error");
        assert_eq!(outcome, ModuleOutcome::Continue);
    }
    assert_eq!(agent.state(), CellState::Quiescent);
    assert_eq!(agent.location(), Location::CENTER);
}

#[test]
fn migration_moves_to_a_free_neighbor() {
    let mut world = World::new(32);
    let id = world.spawn(TUMOR, Location::CENTER, CellState::Migratory, fast_migration);
    let mut module = world.agent(id).module().cloned().expect("migration module");
    for _ in 0..5 {
        if world.agent(id).state() != CellState::Migratory {
            break;
        }
        world.with_agent(id, |a, ctx| module.step(a, ctx)).unwrap();
    }
    let agent = world.agent(id);
    assert_eq!(agent.state(), CellState::Undefined);
    assert_eq!(agent.location().radius(), 1, "moved to {:?}", agent.location());
    assert!(world.grid.agents_at(agent.location()).contains(&id));
    assert!(!world.grid.agents_at(Location::CENTER).contains(&id));
    assert!(world.events.iter().any(|e| matches!(e, CellEvent::Migrated { id: moved, .. } if *moved == id)));
}

#[test]
fn division_conserves_volume_energy_and_pools() {
    let mut world = World::new(33);
    let id = world.spawn(TUMOR, Location::CENTER, CellState::Proliferative, |p| {
        p.insert("proliferation/SYNTHESIS_DURATION", 0.0);
    });
    let mut module = world.agent(id).module().cloned().expect("proliferation module");
    world.with_agent(id, |a, _| {
        let grown = a.core.critical_volume * 2.1;
        a.core.set_volume(grown).unwrap();
        a.core.energy = 4.0;
    });

    let before = world.agent(id).clone();
    let mut daughter_id = None;
    for _ in 0..5 {
        world.with_agent(id, |a, ctx| module.step(a, ctx)).unwrap();
        daughter_id = world.events.iter().find_map(|e| match e {
            CellEvent::Divided { parent, daughter } if *parent == id => Some(*daughter),
            _ => None,
        });
        if daughter_id.is_some() {
            break;
        }
    }
    let daughter_id = daughter_id.expect("cell divided");
    let parent = world.agent(id);
    let daughter = world.agent(daughter_id);

    let total = parent.volume() + daughter.volume();
    assert!((total - before.volume()).abs() < 1e-9, "volume {} vs {}", total, before.volume());
    let share = daughter.volume() / before.volume();
    assert!((0.45..0.55).contains(&share), "daughter share {}", share);
    assert!((parent.core.energy + daughter.core.energy - 4.0).abs() < 1e-12);

    for ((domain, name, b), ((_, _, p), (_, _, d))) in before
        .processes
        .pools()
        .into_iter()
        .zip(parent.processes.pools().into_iter().zip(daughter.processes.pools()))
    {
        assert!((b - (p + d)).abs() <= 1e-9 * b.abs().max(1.0), "{} {} not conserved", domain, name);
    }

    assert_eq!(parent.state(), CellState::Undefined);
    assert_eq!(daughter.state(), CellState::Undefined);
    assert_eq!(daughter.parent, Some(id));
    assert_eq!(parent.divisions, before.divisions - 1);
    assert_eq!(daughter.divisions, parent.divisions);
    assert_eq!(parent.cycles.len(), 1);
    assert_eq!(daughter.parameters, parent.parameters);
}

#[test]
fn stem_division_keeps_its_potential() {
    let mut world = World::new(34);
    let id = world.spawn(STEM, Location::CENTER, CellState::Proliferative, |p| {
        p.insert("proliferation/SYNTHESIS_DURATION", 0.0);
    });
    let divisions = world.agent(id).divisions;
    let mut module = world.agent(id).module().cloned().expect("proliferation module");
    world.with_agent(id, |a, _| {
        let grown = a.core.critical_volume * 2.1;
        a.core.set_volume(grown).unwrap();
    });
    for _ in 0..5 {
        if world.agent(id).state() != CellState::Proliferative {
            break;
        }
        world.with_agent(id, |a, ctx| module.step(a, ctx)).unwrap();
    }
    assert_eq!(world.grid.len(), 2);
    assert_eq!(world.agent(id).divisions, divisions);
}

#[test]
fn crowded_cell_stops_proliferating() {
    let mut world = World::new(35);
    let id = world.spawn(TUMOR, Location::CENTER, CellState::Proliferative, |p| {
        p.insert("CELL_HEIGHT", 1.0);
    });
    let mut module = world.agent(id).module().cloned().expect("proliferation module");
    world.with_agent(id, |a, ctx| module.step(a, ctx)).unwrap();
    assert_eq!(world.agent(id).state(), CellState::Quiescent);
}

#[test]
fn apoptosis_frees_space_for_a_quiescent_neighbor() {
    let mut world = World::new(36);
    let neighbor = world.spawn(TUMOR, Location::new(1, 0), CellState::Quiescent, |_| {});
    let dying = world.spawn(TUMOR, Location::CENTER, CellState::Apoptotic, |p| {
        p.insert("apoptosis/DEATH_DURATION", 2.0);
    });
    let mut module = world.agent(dying).module().cloned().expect("apoptosis module");
    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(world.with_agent(dying, |a, ctx| module.step(a, ctx)).unwrap());
    }
    assert_eq!(outcomes, vec![ModuleOutcome::Continue, ModuleOutcome::Continue, ModuleOutcome::Remove]);
    assert_eq!(world.agent(neighbor).state(), CellState::Proliferative);
}

#[test]
fn necrosis_removes_without_promotion() {
    let mut world = World::new(37);
    let neighbor = world.spawn(TUMOR, Location::CENTER, CellState::Quiescent, |_| {});
    let dying = world.spawn(TUMOR, Location::CENTER, CellState::Necrotic, |p| {
        p.insert("necrosis/NECROSIS_DURATION", 0.0);
    });
    let mut module = world.agent(dying).module().cloned().expect("necrosis module");
    assert!(matches!(module, Module::Necrosis(_)));
    let outcome = world.with_agent(dying, |a, ctx| module.step(a, ctx)).unwrap();
    assert_eq!(outcome, ModuleOutcome::Remove);
    assert_eq!(world.agent(neighbor).state(), CellState::Quiescent);
}

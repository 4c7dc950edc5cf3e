//! Per-variant transition functions and the per-tick step protocol.
//!
//! Variants differ only in how they react to an energy deficit and how they
//! leave a neutral state. Both hooks live in a table keyed by [`CellVariant`].

use super::{Capabilities, CellAgent};
use crate::binding::{self, CircuitKind};
use crate::context::StepContext;
use crate::module::ModuleOutcome;
use crate::process::ReceptorSignal;
use anyhow::Result;
use cellsim_common::{CellState, CellVariant};
use log::{debug, trace};
use rand::seq::IndexedRandom;
use rand::Rng;

/// Ticks per day.
pub const DAY: u64 = 1440;
/// Days without stimulation before an effector deactivates.
pub const ACTIVATION_MEMORY_DAYS: u64 = 7;

/// Core states a random-class cell may jump to.
const RANDOM_STATES: [CellState; 6] = [
    CellState::Proliferative,
    CellState::Migratory,
    CellState::Senescent,
    CellState::Apoptotic,
    CellState::Necrotic,
    CellState::Quiescent,
];

type Hook = fn(&mut CellAgent, &mut StepContext<'_>) -> Result<()>;

#[derive(Clone, Copy)]
pub struct Transitions {
    pub energy: Hook,
    pub resolve: Hook,
}

const TISSUE: Transitions = Transitions { energy: tissue_energy, resolve: tissue_resolve };
const HELPER: Transitions = Transitions { energy: effector_energy, resolve: helper_resolve };
const CYTOTOXIC: Transitions = Transitions { energy: effector_energy, resolve: cytotoxic_resolve };
const RANDOM: Transitions = Transitions { energy: tissue_energy, resolve: random_resolve };

pub fn transitions(variant: CellVariant) -> Transitions {
    match variant {
        CellVariant::Tissue | CellVariant::Cancer | CellVariant::CancerStem => TISSUE,
        CellVariant::CartCd4 => HELPER,
        CellVariant::CartCd8 | CellVariant::CartSynnotch => CYTOTOXIC,
        CellVariant::Random => RANDOM,
    }
}

/// One tick of the agent: aging, processes, energy, resolution, module.
pub fn step(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
    let rules = transitions(agent.variant);

    agent.age += 1;
    if agent.age > agent.settings.apoptosis_age && !agent.state().is_terminal() {
        trace!("cell {} reached its lifespan at age {}", agent.id(), agent.age);
        release(agent, ctx)?;
        agent.set_state(CellState::Apoptotic)?;
    }

    let capabilities = agent.capabilities;
    if capabilities.contains(Capabilities::BINDING) {
        effector_bookkeeping(agent);
    }
    if capabilities.contains(Capabilities::SYNNOTCH) {
        step_circuit(agent, ctx)?;
    }

    if capabilities.contains(Capabilities::METABOLIZING) {
        agent.processes.step_metabolism(&mut agent.core, ctx)?;
    }
    check_energy(agent, ctx)?;

    if capabilities.contains(Capabilities::SIGNALING) {
        agent.processes.step_signaling(&mut agent.core, ctx)?;
    }
    if capabilities.contains(Capabilities::QUORUM) {
        step_quorum(agent, ctx)?;
    }
    agent.processes.step_inflammation(&agent.core, ctx)?;
    if agent.processes.step_chemotherapy(&agent.core, ctx) {
        trace!("cell {} killed by chemotherapy", agent.id());
        agent.set_state(CellState::Apoptotic)?;
    }

    if needs_resolution(agent) {
        (rules.resolve)(agent, ctx)?;
    }

    agent.step_module(ctx)
}

/// Applies the variant's energy rule.
pub fn check_energy(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    if agent.state().is_terminal() {
        return Ok(());
    }
    (transitions(agent.variant).energy)(agent, ctx)
}

/// Applies the variant's rule for leaving a neutral state.
pub fn resolve(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    (transitions(agent.variant).resolve)(agent, ctx)
}

/// UNDEFINED and PAUSED always resolve. QUIESCENT resolves once the cell is
/// fed again and no effector holds it.
pub fn needs_resolution(agent: &CellAgent) -> bool {
    match agent.state() {
        CellState::Undefined | CellState::Paused => true,
        CellState::Quiescent => !agent.held && agent.core.energy >= 0.0,
        _ => false,
    }
}

/// Releases any engagement and clears activation.
fn release(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    binding::unbind(agent, ctx.grid)?;
    agent.core.activated = false;
    Ok(())
}

fn tissue_energy(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    let energy = agent.core.energy;
    if energy >= 0.0 {
        return Ok(());
    }
    if energy < agent.settings.energy_threshold {
        let r: f64 = ctx.rng.random();
        if r > agent.settings.necrotic_fraction {
            agent.set_state(CellState::Apoptotic)?;
        } else {
            agent.set_state(CellState::Necrotic)?;
        }
    } else if !matches!(agent.state(), CellState::Quiescent | CellState::Senescent) {
        agent.set_state(CellState::Quiescent)?;
    }
    Ok(())
}

fn effector_energy(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    let energy = agent.core.energy;
    if energy < 0.0 {
        if energy < agent.settings.energy_threshold {
            release(agent, ctx)?;
            agent.set_state(CellState::Apoptotic)?;
        } else if !matches!(
            agent.state(),
            CellState::Anergic | CellState::Senescent | CellState::Exhausted | CellState::Starved
        ) {
            binding::unbind(agent, ctx.grid)?;
            agent.set_state(CellState::Starved)?;
        }
    } else if agent.state() == CellState::Starved {
        agent.set_state(CellState::Undefined)?;
    }
    Ok(())
}

/// Draws `r` and enters `kept` when `r <= fraction`, APOPTOTIC otherwise.
fn fate_draw(agent: &mut CellAgent, ctx: &mut StepContext<'_>, fraction: f64, kept: CellState) -> Result<()> {
    let r: f64 = ctx.rng.random();
    let next = if r > fraction { CellState::Apoptotic } else { kept };
    agent.set_state(next)?;
    Ok(())
}

fn tissue_resolve(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    if agent.core.migratory {
        agent.set_state(CellState::Migratory)?;
    } else if agent.divisions == 0 {
        let fraction = agent.settings.senescent_fraction;
        fate_draw(agent, ctx, fraction, CellState::Senescent)?;
    } else {
        agent.set_state(CellState::Proliferative)?;
    }
    Ok(())
}

fn random_resolve(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    if let Some(&next) = RANDOM_STATES.choose(ctx.rng) {
        agent.set_state(next)?;
    }
    Ok(())
}

fn helper_resolve(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    effector_resolve(agent, ctx, false)
}

fn cytotoxic_resolve(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    effector_resolve(agent, ctx, true)
}

fn effector_resolve(agent: &mut CellAgent, ctx: &mut StepContext<'_>, cytotoxic: bool) -> Result<()> {
    if !agent.capabilities.contains(Capabilities::BINDING) {
        return tissue_resolve(agent, ctx);
    }
    let Some(params) = agent.effector.as_ref().map(|e| e.params) else {
        return tissue_resolve(agent, ctx);
    };

    if agent.divisions == 0 {
        let fraction = agent.settings.senescent_fraction;
        fate_draw(agent, ctx, fraction, CellState::Senescent)?;
        return release(agent, ctx);
    }

    let flag = binding::bind_target(agent, ctx)?;
    let over_stimulated = agent.effector.as_ref().is_some_and(|e| e.bound_antigens > params.max_antigen_binding);

    if flag.has_antigen() && flag.has_self_receptor() {
        fate_draw(agent, ctx, params.anergic_fraction, CellState::Anergic)?;
        release(agent, ctx)?;
    } else if flag.has_antigen() {
        if over_stimulated {
            debug!("effector {} is over-stimulated", agent.id());
            fate_draw(agent, ctx, params.exhausted_fraction, CellState::Exhausted)?;
            release(agent, ctx)?;
        } else {
            if let Some(effector) = agent.effector.as_mut() {
                effector.activation_ticker = 0;
            }
            agent.core.activated = true;
            if cytotoxic {
                agent.set_state(CellState::Cytotoxic)?;
            } else {
                let r: f64 = ctx.rng.random();
                if r > params.stimulatory_fraction {
                    binding::unbind(agent, ctx.grid)?;
                    agent.set_state(CellState::Proliferative)?;
                } else {
                    agent.set_state(CellState::Stimulatory)?;
                }
            }
        }
    } else {
        binding::unbind(agent, ctx.grid)?;
        if agent.core.activated {
            agent.set_state(CellState::Proliferative)?;
        } else {
            let r: f64 = ctx.rng.random();
            if r > params.proliferative_fraction {
                agent.set_state(CellState::Migratory)?;
            } else {
                agent.set_state(CellState::Proliferative)?;
            }
        }
    }
    Ok(())
}

fn effector_bookkeeping(agent: &mut CellAgent) {
    let age = agent.age;
    let Some(effector) = agent.effector.as_mut() else {
        return;
    };
    effector.activation_ticker += 1;
    if age % DAY == 0 {
        effector.bound_antigens = effector.bound_antigens.saturating_sub(1);
    }
    if effector.activation_ticker >= ACTIVATION_MEMORY_DAYS * DAY && agent.core.activated {
        trace!("effector {} deactivates after {} idle ticks", agent.core.id, effector.activation_ticker);
        agent.core.activated = false;
    }
}

/// Steps the synNotch circuit and retunes CAR expression.
fn step_circuit(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    let (me, location, volume) = (agent.id(), agent.location(), agent.volume());
    let Some(effector) = agent.effector.as_mut() else {
        return Ok(());
    };
    let contact_fraction = effector.params.contact_fraction;
    let Some(circuit) = effector.circuit.as_mut() else {
        return Ok(());
    };
    circuit.step(me, location, volume, contact_fraction, ctx)?;
    effector.cars = circuit.update_cars(effector.cars);
    if circuit.is_signaling() {
        match circuit.kind() {
            CircuitKind::Inducible => {
                agent.core.activated = true;
                effector.activation_ticker = 0;
            }
            CircuitKind::Inhibitory => agent.core.activated = false,
            CircuitKind::Combinatorial => {}
        }
    }
    Ok(())
}

/// Occupancy of the effector's receptors as the quorum network sees it.
fn receptor_signal(agent: &CellAgent) -> ReceptorSignal {
    let Some(effector) = agent.effector.as_ref() else {
        return ReceptorSignal::default();
    };
    let circuit = effector.circuit.as_ref();
    ReceptorSignal {
        bound_synnotch: circuit.map_or(0.0, |c| c.bound() as f64),
        engaged: circuit.is_some_and(|c| c.is_signaling()),
        bound_car: f64::from(effector.bound_antigens),
    }
}

/// Steps auxin exchange. A sink's CAR expression replaces the effector's receptor count.
fn step_quorum(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<()> {
    let signal = receptor_signal(agent);
    let was_active = agent.core.activated;
    agent.processes.step_quorum(&mut agent.core, signal, ctx)?;
    let cars = agent.processes.quorum.as_ref().and_then(|q| q.expressed_cars());
    if let Some(effector) = agent.effector.as_mut() {
        if let Some(cars) = cars {
            effector.cars = cars;
        }
        if agent.core.activated && !was_active {
            debug!("effector {} activated by auxin", agent.core.id);
            effector.activation_ticker = 0;
        }
    }
    Ok(())
}

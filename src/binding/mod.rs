//! Stochastic receptor engagement of immune effectors.
//!
//! Binding is a pair of independent exponential waiting-time draws, one for
//! CAR/antigen and one for self receptor/self target. An engagement claims the
//! target through its `bound_by` field and holds it quiescent until release.

pub mod synnotch;

use crate::agent::CellAgent;
use crate::context::StepContext;
use crate::env::{AgentId, PatchGrid};
use anyhow::{anyhow, Result};
use cellsim_common::{BindingFlag, CellError, CellState, Parameters};
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Exp};

pub use synnotch::{BindingEvent, CircuitKind, SynNotchCircuit};

/// Length of one binding window [ticks].
pub const DT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingParameters {
    pub cars: f64,
    pub self_receptors: f64,
    pub search_ability: usize,
    pub car_binding_rate: f64,
    pub self_binding_rate: f64,
    pub contact_fraction: f64,
    pub max_antigen_binding: u32,
    pub exhausted_fraction: f64,
    pub anergic_fraction: f64,
    pub proliferative_fraction: f64,
    pub stimulatory_fraction: f64,
}

impl BindingParameters {
    pub fn from_parameters(params: &Parameters) -> Result<Self, CellError> {
        Ok(BindingParameters {
            cars: params.get_non_negative("binding/CARS")?,
            self_receptors: params.get_non_negative("binding/SELF_RECEPTORS")?,
            search_ability: params.get_count("binding/SEARCH_ABILITY")? as usize,
            car_binding_rate: params.get_non_negative("binding/CAR_BINDING_RATE")?,
            self_binding_rate: params.get_non_negative("binding/SELF_BINDING_RATE")?,
            contact_fraction: params.get_fraction("binding/CONTACT_FRACTION")?,
            max_antigen_binding: params.get_count("binding/MAX_ANTIGEN_BINDING")? as u32,
            exhausted_fraction: params.get_fraction("binding/EXHAUSTED_FRACTION")?,
            anergic_fraction: params.get_fraction("binding/ANERGIC_FRACTION")?,
            proliferative_fraction: params.get_fraction("binding/PROLIFERATIVE_FRACTION")?,
            stimulatory_fraction: params.get_fraction("binding/STIMULATORY_FRACTION")?,
        })
    }
}

/// Receptor and engagement state carried by immune effectors.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectorState {
    pub flag: BindingFlag,
    pub target: Option<AgentId>,
    /// Over-stimulation counter.
    pub bound_antigens: u32,
    /// Ticks since the last stimulation.
    pub activation_ticker: u64,
    pub cars: f64,
    pub self_receptors: f64,
    pub self_receptors_start: f64,
    pub params: BindingParameters,
    pub circuit: Option<SynNotchCircuit>,
}

impl EffectorState {
    pub fn new(params: BindingParameters, circuit: Option<SynNotchCircuit>) -> Self {
        let cars = match &circuit {
            Some(c) => c.initial_cars(params.cars),
            None => params.cars,
        };
        EffectorState {
            flag: BindingFlag::Unbound,
            target: None,
            bound_antigens: 0,
            activation_ticker: 0,
            cars,
            self_receptors: params.self_receptors,
            self_receptors_start: params.self_receptors,
            params,
            circuit,
        }
    }

    /// CAR receptors available for antigen engagement this tick.
    pub fn effective_cars(&self) -> f64 {
        match &self.circuit {
            Some(c) => c.effective_cars(self.cars),
            None => self.cars,
        }
    }
}

/// Probability that at least one engagement happens within one window,
/// `1 - exp(-count * rate_constant * DT)`.
pub fn binding_probability(count: f64, rate_constant: f64) -> f64 {
    let lambda = (count * rate_constant).max(0.0) * DT;
    1.0 - (-lambda).exp()
}

/// Draws an exponential waiting time at `rate` and reports whether it falls inside the window.
pub fn draws_binding<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> Result<bool> {
    if !(rate > 0.0) || !rate.is_finite() {
        return Ok(false);
    }
    let waiting = Exp::new(rate).map_err(|e| anyhow!("invalid binding rate {}: {}", rate, e))?;
    Ok(waiting.sample(rng) <= DT)
}

/// Searches the neighborhood for a target and engages it.
///
/// Returns the resulting flag; the effector's own state is updated in place.
pub fn bind_target(agent: &mut CellAgent, ctx: &mut StepContext<'_>) -> Result<BindingFlag> {
    if agent.effector.as_ref().is_some_and(|e| e.target.is_some()) {
        unbind(agent, ctx.grid)?;
    }
    let me = agent.id();
    let Some(effector) = agent.effector.as_mut() else {
        return Ok(BindingFlag::Unbound);
    };

    let mut candidates: Vec<AgentId> = ctx
        .grid
        .agents_around(agent.core.location)
        .into_iter()
        .filter(|id| *id != me)
        .filter(|id| {
            ctx.grid
                .get(*id)
                .is_some_and(|t| !t.is_effector() && !t.state().is_terminal() && t.bound_by.is_none())
        })
        .collect();
    candidates.sort();
    candidates.dedup();
    candidates.shuffle(ctx.rng);
    candidates.truncate(effector.params.search_ability);

    let cars = effector.effective_cars();
    for id in candidates {
        let Some(target) = ctx.grid.get(id) else { continue };
        let car_rate = target.antigens.car * cars * effector.params.car_binding_rate * effector.params.contact_fraction;
        let self_rate = target.antigens.self_targets
            * effector.self_receptors
            * effector.params.self_binding_rate
            * effector.params.contact_fraction;
        let antigen = draws_binding(car_rate, ctx.rng)?;
        let self_bound = draws_binding(self_rate, ctx.rng)?;
        if !antigen && !self_bound {
            continue;
        }

        let flag = BindingFlag::from_parts(antigen, self_bound);
        effector.flag = flag;
        effector.target = Some(id);
        if antigen {
            effector.bound_antigens += 1;
            let turnover = ctx.rng.random_range(0.95..1.05);
            effector.self_receptors += effector.self_receptors_start * turnover;
        }

        if let Some(target) = ctx.grid.get_mut(id) {
            target.bound_by = Some(me);
            if !target.state().is_terminal() {
                target.set_state(CellState::Quiescent)?;
                target.held = true;
            }
        }
        trace!("effector {} engaged {} ({:?})", me, id, flag);
        return Ok(flag);
    }

    effector.flag = BindingFlag::Unbound;
    Ok(BindingFlag::Unbound)
}

/// The agent an effector is engaged with, checked against the grid.
pub fn engaged_target(agent: &CellAgent, grid: &PatchGrid) -> Result<Option<AgentId>, CellError> {
    let Some(target) = agent.effector.as_ref().and_then(|e| e.target) else {
        return Ok(None);
    };
    if grid.get(target).is_none() {
        return Err(CellError::StaleReference { agent: agent.id().0, target: target.0 });
    }
    Ok(Some(target))
}

/// Releases the effector's engagement on both sides. Calling it again is a no-op.
pub fn unbind(agent: &mut CellAgent, grid: &mut PatchGrid) -> Result<()> {
    let me = agent.id();
    let Some(effector) = agent.effector.as_mut() else {
        return Ok(());
    };
    effector.flag = BindingFlag::Unbound;
    if let Some(target_id) = effector.target.take() {
        match grid.get_mut(target_id) {
            Some(target) if target.bound_by == Some(me) => {
                target.bound_by = None;
                if target.held {
                    target.held = false;
                    if target.state() == CellState::Quiescent {
                        target.set_state(CellState::Undefined)?;
                    }
                }
            }
            Some(_) => {}
            None => debug!("effector {} released target {} that is no longer on the grid", me, target_id),
        }
    }
    if let Some(circuit) = effector.circuit.as_mut() {
        circuit.reset(grid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn probability_is_monotone_in_both_arguments() {
        let counts = [0.0, 1.0, 10.0, 500.0, 1e4];
        let rates = [0.0, 1e-7, 1e-5, 1e-3, 0.1];
        for w in counts.windows(2) {
            for r in rates {
                assert!(binding_probability(w[1], r) >= binding_probability(w[0], r));
            }
        }
        for w in rates.windows(2) {
            for c in counts {
                assert!(binding_probability(c, w[1]) >= binding_probability(c, w[0]));
            }
        }
        assert_eq!(binding_probability(0.0, 1.0), 0.0);
    }

    #[test]
    fn waiting_time_draw_matches_probability() {
        let mut rng = StdRng::seed_from_u64(11);
        let rate = 0.7;
        let trials = 20_000;
        let hits = (0..trials).filter(|_| draws_binding(rate, &mut rng).unwrap()).count();
        let observed = hits as f64 / trials as f64;
        let expected = binding_probability(rate, 1.0);
        assert!((observed - expected).abs() < 0.02, "observed {} expected {}", observed, expected);
    }

    #[test]
    fn zero_rate_never_binds() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(!draws_binding(0.0, &mut rng).unwrap());
        assert!(!draws_binding(f64::NAN, &mut rng).unwrap());
    }
}

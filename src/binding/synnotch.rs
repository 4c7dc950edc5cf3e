//! synNotch receptor circuits that gate or tune CAR expression.

use crate::context::StepContext;
use crate::env::{AgentId, Location, PatchGrid};
use anyhow::{anyhow, Result};
use cellsim_common::{CellError, Parameters};
use log::{debug, trace};
use rand::seq::IndexedRandom;
use rand_distr::{Distribution, Poisson};
use std::collections::VecDeque;
use std::str::FromStr;

/// Minutes of receptor kinetics folded into one tick.
pub const TAU: f64 = 60.0;
const AVOGADRO: f64 = 6.0221415e23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitKind {
    /// CARs are constitutive but only usable while the synNotch signal is on.
    Combinatorial,
    /// synNotch signaling drives CAR expression and activation.
    Inducible,
    /// synNotch signaling represses CAR expression and activation.
    Inhibitory,
}

impl FromStr for CircuitKind {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combinatorial" => Ok(CircuitKind::Combinatorial),
            "inducible" => Ok(CircuitKind::Inducible),
            "inhibitory" => Ok(CircuitKind::Inhibitory),
            other => Err(CellError::configuration(
                "processes.circuit",
                format!("unknown synNotch circuit '{}'", other),
            )),
        }
    }
}

/// Receptors bound at `tick`, retired once the activation delay has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingEvent {
    pub tick: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CircuitParameters {
    k_on: f64,
    k_off: f64,
    k_car_generation: f64,
    k_car_degrade: f64,
    threshold_fraction: f64,
    hill_n: f64,
    activation_delay: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynNotchCircuit {
    kind: CircuitKind,
    params: CircuitParameters,
    synnotchs: u64,
    bound: u64,
    partner: Option<AgentId>,
    history: VecDeque<BindingEvent>,
}

/// Poisson draw that tolerates a zero or degenerate mean.
fn poisson_count(lambda: f64, ctx: &mut StepContext<'_>) -> Result<u64> {
    if !(lambda > 0.0) || !lambda.is_finite() {
        return Ok(0);
    }
    let dist = Poisson::new(lambda).map_err(|e| anyhow!("invalid Poisson mean {}: {}", lambda, e))?;
    let draw: f64 = dist.sample(ctx.rng);
    Ok(draw.max(0.0) as u64)
}

impl SynNotchCircuit {
    pub fn new(kind: CircuitKind, params: &Parameters) -> Result<Self, CellError> {
        let hill_n = params.get_positive("synnotch/HILL_N")?;
        if !(4.4..=8.0).contains(&hill_n) {
            return Err(CellError::configuration("synnotch/HILL_N", format!("must lie in [4.4, 8], got {}", hill_n)));
        }
        Ok(SynNotchCircuit {
            kind,
            params: CircuitParameters {
                k_on: params.get_non_negative("synnotch/K_SYNNOTCH_ON")?,
                k_off: params.get_non_negative("synnotch/K_SYNNOTCH_OFF")?,
                k_car_generation: params.get_non_negative("synnotch/K_CAR_GENERATION")?,
                k_car_degrade: params.get_non_negative("synnotch/K_CAR_DEGRADE")?,
                threshold_fraction: params.get_fraction("synnotch/SYNNOTCH_THRESHOLD")?,
                hill_n,
                activation_delay: params.get_count("synnotch/SYNNOTCH_ACTIVATION_DELAY")?,
            },
            synnotchs: params.get_count("synnotch/SYNNOTCHS")?,
            bound: 0,
            partner: None,
            history: VecDeque::new(),
        })
    }

    pub fn kind(&self) -> CircuitKind {
        self.kind
    }

    pub fn bound(&self) -> u64 {
        self.bound
    }

    pub fn synnotchs(&self) -> u64 {
        self.synnotchs
    }

    pub fn partner(&self) -> Option<AgentId> {
        self.partner
    }

    pub fn history(&self) -> &VecDeque<BindingEvent> {
        &self.history
    }

    /// Bound receptors needed for a signal, `SYNNOTCH_THRESHOLD * SYNNOTCHS`.
    pub fn threshold(&self) -> f64 {
        self.params.threshold_fraction * self.synnotchs as f64
    }

    pub fn is_signaling(&self) -> bool {
        let k = self.threshold();
        k > 0.0 && self.bound as f64 >= k
    }

    /// Hill response `b^n / (K^n + b^n)` of the bound receptor count.
    pub fn hill(&self, bound: f64) -> f64 {
        let k = self.threshold();
        if bound <= 0.0 {
            return 0.0;
        }
        if k <= 0.0 {
            return 1.0;
        }
        let n = self.params.hill_n;
        let bn = bound.powf(n);
        bn / (k.powf(n) + bn)
    }

    /// Inducible circuits start without CARs and build them under signal.
    pub fn initial_cars(&self, constitutive: f64) -> f64 {
        match self.kind {
            CircuitKind::Inducible => 0.0,
            CircuitKind::Combinatorial | CircuitKind::Inhibitory => constitutive,
        }
    }

    pub fn effective_cars(&self, cars: f64) -> f64 {
        match self.kind {
            CircuitKind::Combinatorial if !self.is_signaling() => 0.0,
            _ => cars,
        }
    }

    /// Expression update `cars += (K_gen * response - K_deg * cars) * TAU`.
    pub fn update_cars(&self, cars: f64) -> f64 {
        let response = match self.kind {
            CircuitKind::Combinatorial => return cars,
            CircuitKind::Inducible => self.hill(self.bound as f64),
            CircuitKind::Inhibitory => 1.0 - self.hill(self.bound as f64),
        };
        let next = cars + (self.params.k_car_generation * response - self.params.k_car_degrade * cars) * TAU;
        next.max(0.0)
    }

    /// One tick of receptor kinetics against the partner tissue agent.
    pub fn step(&mut self, me: AgentId, location: Location, volume: f64, contact_fraction: f64, ctx: &mut StepContext<'_>) -> Result<()> {
        let Some(partner_id) = self.partner else {
            self.find_partner(location, ctx);
            return Ok(());
        };
        let Some(available) = ctx.grid.get(partner_id).map(|p| p.antigens.synnotch) else {
            debug!("synNotch partner {} of {} is gone", partner_id, me);
            self.partner = None;
            self.bound = 0;
            self.history.clear();
            return Ok(());
        };

        let unbound = self.synnotchs.saturating_sub(self.bound);
        let lambda_on = self.params.k_on / (volume * AVOGADRO * 1e-15)
            * unbound as f64
            * available
            * contact_fraction
            * TAU;
        let binding = poisson_count(lambda_on, ctx)?.min(unbound).min(available.max(0.0) as u64);
        let lambda_off = self.params.k_off * self.bound as f64 * TAU;
        let unbinding = poisson_count(lambda_off, ctx)?.min(self.bound);

        self.bound = self.bound + binding - unbinding;
        if let Some(partner) = ctx.grid.get_mut(partner_id) {
            partner.antigens.synnotch = (partner.antigens.synnotch - binding as f64 + unbinding as f64).max(0.0);
        }
        if binding > 0 {
            self.history.push_back(BindingEvent { tick: ctx.tick, count: binding });
        }

        // Signal from old engagements has decayed; those receptors are spent.
        let delay = self.params.activation_delay;
        while let Some(event) = self.history.front().copied() {
            if event.tick + delay > ctx.tick {
                break;
            }
            self.history.pop_front();
            self.bound = self.bound.saturating_sub(event.count);
            self.synnotchs = self.synnotchs.saturating_sub(event.count);
        }
        trace!("cell {} synNotch: bound {} of {}", me, self.bound, self.synnotchs);
        Ok(())
    }

    fn find_partner(&mut self, location: Location, ctx: &mut StepContext<'_>) {
        let candidates: Vec<AgentId> = ctx
            .grid
            .agents_around(location)
            .into_iter()
            .filter(|id| {
                ctx.grid
                    .get(*id)
                    .is_some_and(|a| !a.is_effector() && !a.state().is_terminal() && a.antigens.synnotch > 0.0)
            })
            .collect();
        self.partner = candidates.choose(ctx.rng).copied();
    }

    /// Returns bound receptors to the partner and forgets it.
    pub fn reset(&mut self, grid: &mut PatchGrid) {
        if let Some(partner_id) = self.partner.take() {
            if let Some(partner) = grid.get_mut(partner_id) {
                partner.antigens.synnotch += self.bound as f64;
            }
        }
        self.bound = 0;
        self.history.clear();
    }

    #[cfg(test)]
    pub(crate) fn force_bound(&mut self, bound: u64) {
        self.bound = bound;
    }
}

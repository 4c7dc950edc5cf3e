//! Auxin quorum sensing between synNotch-driven sources and CAR-expressing sinks.
//!
//! A source expresses auxin while its synNotch receptors are engaged and leaks
//! it into the patch down the concentration gap. A sink draws auxin from the
//! patch, turns it into CAR expression and builds an activation biomarker from
//! bound CAR. Auxin moves between cell and patch as whole amounts, so whatever
//! one side loses the other gains.

use super::{snap, solver};
use super::{Process, ProcessDomain};
use crate::agent::CellCore;
use crate::context::StepContext;
use crate::env::{Field, Lattice};
use anyhow::Result;
use cellsim_common::{CellError, Parameters};
use log::trace;
use std::str::FromStr;

pub const NUM_COMPONENTS: usize = 3;
pub const AUXIN: usize = 0;
pub const CAR: usize = 1;
pub const ACTIVATION: usize = 2;

pub const NAMES: [&str; NUM_COMPONENTS] = ["internal_auxin", "car_receptors", "activation_biomarker"];

const STEP_DIVIDER: f64 = 3.0;
const STEP_SIZE: f64 = 1.0 / STEP_DIVIDER;
/// Seconds integrated per tick.
const WINDOW: f64 = 60.0;

/// Auxin expressed per engaged synNotch receptor [/s].
const K_AUX_EXPRESS: f64 = 4.18 / 3600.0;
const K_CAR_EXPRESS: f64 = 0.8 / (1e3 * 3600.0);
const K_CAR_DEGRADE: f64 = 0.2 / (1e3 * 3600.0);
const K_ACTIVE_EXPRESS: f64 = 0.8 / (1e3 * 3600.0);
const K_ACTIVE_EXPRESS_ACCELERATED: f64 = 1.0 / (1e3 * 3600.0);
const K_ACTIVE_DEGRADE: f64 = 0.2 / (1e3 * 3600.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumVersion {
    Source,
    Sink,
}

impl FromStr for QuorumVersion {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" => Ok(QuorumVersion::Source),
            "sink" => Ok(QuorumVersion::Sink),
            "simple" => Err(CellError::configuration(
                "processes.quorum",
                "the simple quorum network is not supported; use 'source' or 'sink'",
            )),
            other => Err(CellError::configuration("processes.quorum", format!("unknown quorum version '{}'", other))),
        }
    }
}

/// Receptor occupancy the network reads from the binding layer each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReceptorSignal {
    /// synNotch receptors engaged with a partner.
    pub bound_synnotch: f64,
    /// True once engagement reaches the circuit threshold.
    pub engaged: bool,
    /// CAR engagements counted by the binding layer.
    pub bound_car: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuorumSensing {
    version: QuorumVersion,
    amounts: [f64; NUM_COMPONENTS],
    flow_rate: f64,
    auxin_degrade: f64,
    activation_threshold: f64,
    last_flow: f64,
}

impl QuorumSensing {
    pub fn new(version: QuorumVersion, params: &Parameters) -> Result<Self, CellError> {
        let mut amounts = [0.0; NUM_COMPONENTS];
        if version == QuorumVersion::Sink {
            amounts[CAR] = params.get_non_negative("binding/CARS")?;
        }
        Ok(QuorumSensing {
            version,
            amounts,
            flow_rate: params.get_fraction("quorum/AUX_FLOW_RATE")?,
            auxin_degrade: params.get_non_negative("quorum/K_AUX_DEGRADE")?,
            activation_threshold: params.get_non_negative("quorum/ACTIVATION_THRESHOLD")?,
            last_flow: 0.0,
        })
    }

    pub fn version(&self) -> QuorumVersion {
        self.version
    }

    pub fn auxin(&self) -> f64 {
        self.amounts[AUXIN]
    }

    pub fn activation(&self) -> f64 {
        self.amounts[ACTIVATION]
    }

    /// Auxin moved across the membrane during the last tick, positive into the patch.
    pub fn last_flow(&self) -> f64 {
        self.last_flow
    }

    /// CAR receptor count a sink currently expresses.
    pub fn expressed_cars(&self) -> Option<f64> {
        match self.version {
            QuorumVersion::Sink => Some(self.amounts[CAR].round()),
            QuorumVersion::Source => None,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.version == QuorumVersion::Sink && self.amounts[ACTIVATION] > self.activation_threshold
    }

    /// Loads internal auxin, as a freshly divided or pre-induced cell would carry.
    pub fn set_auxin(&mut self, amount: f64) {
        self.amounts[AUXIN] = amount.max(0.0);
    }

    fn derivatives(&self, signal: ReceptorSignal, y: &[f64]) -> Vec<f64> {
        let mut dydt = vec![0.0; NUM_COMPONENTS];
        match self.version {
            QuorumVersion::Source => {
                let expressing = if signal.engaged { K_AUX_EXPRESS * signal.bound_synnotch } else { 0.0 };
                dydt[AUXIN] = expressing - self.auxin_degrade * y[AUXIN];
            }
            QuorumVersion::Sink => {
                dydt[AUXIN] = -self.auxin_degrade * y[AUXIN];
                dydt[CAR] = K_CAR_EXPRESS * y[AUXIN] - K_CAR_DEGRADE * y[CAR];
                dydt[ACTIVATION] = (K_ACTIVE_EXPRESS + K_ACTIVE_EXPRESS_ACCELERATED) * signal.bound_car
                    - K_ACTIVE_DEGRADE * y[ACTIVATION];
            }
        }
        dydt
    }

    /// Auxin crossing the membrane this tick, positive out of the cell.
    fn membrane_flow(&self, cell_volume: f64, external: f64, location_volume: f64) -> f64 {
        let inside = self.amounts[AUXIN] / cell_volume;
        let outside = external / location_volume;
        match self.version {
            QuorumVersion::Source if inside > outside => {
                (self.flow_rate * (inside - outside) * cell_volume).min(self.amounts[AUXIN])
            }
            QuorumVersion::Sink if outside > inside => -(self.flow_rate * (outside - inside) * cell_volume).min(external),
            _ => 0.0,
        }
    }

    pub fn step(&mut self, cell: &mut CellCore, signal: ReceptorSignal, ctx: &mut StepContext<'_>) -> Result<()> {
        let loc = cell.location;
        let location_volume = ctx.geometry().volume();
        let mut external = ctx.lattice.average_value(Field::Auxin, loc) * location_volume;

        // Sources express before they leak; sinks take up before they convert.
        if self.version == QuorumVersion::Source {
            self.integrate(signal);
        }
        let flow = self.membrane_flow(cell.volume(), external, location_volume);
        self.amounts[AUXIN] = (self.amounts[AUXIN] - flow).max(0.0);
        external += flow;
        self.last_flow = flow;
        if self.version == QuorumVersion::Sink {
            self.integrate(signal);
            if self.is_activated() {
                cell.activated = true;
            }
        }

        ctx.lattice.set_value(Field::Auxin, loc, snap(external / location_volume));
        trace!(
            "cell {} quorum {:?}: auxin {:.3} flow {:.3} activation {:.3}",
            cell.id,
            self.version,
            self.amounts[AUXIN],
            flow,
            self.amounts[ACTIVATION]
        );
        Ok(())
    }

    fn integrate(&mut self, signal: ReceptorSignal) {
        let next = solver::runge_kutta(|_t, y| self.derivatives(signal, y), 0.0, &self.amounts, WINDOW, STEP_SIZE);
        for (slot, value) in self.amounts.iter_mut().zip(next) {
            *slot = value.max(0.0);
        }
    }
}

impl Process for QuorumSensing {
    fn domain(&self) -> ProcessDomain {
        ProcessDomain::QuorumSensing
    }

    fn pools(&self) -> Vec<(&'static str, f64)> {
        NAMES.iter().zip(self.amounts.iter()).map(|(n, v)| (*n, *v)).collect()
    }

    fn split(&mut self, fraction: f64) -> Self {
        let mut daughter = self.clone();
        for (d, p) in daughter.amounts.iter_mut().zip(self.amounts.iter_mut()) {
            *d = *p * fraction;
            *p *= 1.0 - fraction;
        }
        daughter.last_flow = 0.0;
        daughter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(version: QuorumVersion) -> QuorumSensing {
        QuorumSensing::new(version, &Parameters::with_defaults()).unwrap()
    }

    #[test]
    fn simple_network_is_rejected() {
        assert!(matches!("simple".parse::<QuorumVersion>(), Err(CellError::Configuration { .. })));
        assert_eq!(" Sink ".parse::<QuorumVersion>().unwrap(), QuorumVersion::Sink);
    }

    #[test]
    fn idle_source_only_degrades() {
        let mut source = process(QuorumVersion::Source);
        source.amounts[AUXIN] = 100.0;
        source.integrate(ReceptorSignal { bound_synnotch: 500.0, engaged: false, bound_car: 0.0 });
        assert!(source.auxin() < 100.0 && source.auxin() > 99.0, "auxin {}", source.auxin());
        source.integrate(ReceptorSignal { bound_synnotch: 500.0, engaged: true, bound_car: 0.0 });
        assert!(source.auxin() > 100.0, "engaged source must express, got {}", source.auxin());
    }

    #[test]
    fn flow_follows_the_gap_and_never_overdraws() {
        let mut source = process(QuorumVersion::Source);
        source.flow_rate = 1.0;
        source.amounts[AUXIN] = 10.0;
        let flow = source.membrane_flow(2000.0, 0.0, 7830.0);
        assert!((flow - 10.0).abs() < 1e-12, "full rate empties the cell, got {}", flow);
        assert_eq!(source.membrane_flow(2000.0, 1.0e6, 7830.0), 0.0, "sources never take auxin up");

        let sink = process(QuorumVersion::Sink);
        let flow = sink.membrane_flow(2000.0, 50.0, 7830.0);
        assert!(flow < 0.0 && -flow <= 50.0, "sink uptake {}", flow);
    }

    #[test]
    fn only_sinks_express_cars() {
        assert_eq!(process(QuorumVersion::Source).expressed_cars(), None);
        assert_eq!(process(QuorumVersion::Sink).expressed_cars(), Some(50000.0));
    }
}

//! IL-2 receptor kinetics of immune effectors.
//!
//! The network is integrated with fourth-order Runge-Kutta over a 60 minute
//! window. Only the IL-2 in a thin shell around the cell is visible to it, and
//! whatever the cell binds, releases or secretes is returned to the lattice.

use super::metabolism::Il2Feedback;
use super::solver;
use super::{Process, ProcessDomain};
use crate::agent::CellCore;
use crate::context::StepContext;
use crate::env::{Field, Lattice};
use anyhow::Result;
use cellsim_common::{CellError, Parameters};
use log::trace;
use std::f64::consts::PI;
use std::str::FromStr;

pub const NUM_COMPONENTS: usize = 8;
pub const IL2_INT_TOTAL: usize = 0;
pub const IL2_EXT: usize = 1;
pub const IL2R_TOTAL: usize = 2;
pub const IL2RBG: usize = 3;
pub const IL2RBGA: usize = 4;
pub const IL2_IL2RBG: usize = 5;
pub const IL2_IL2RBGA: usize = 6;
pub const GRANZYME: usize = 7;

pub const NAMES: [&str; NUM_COMPONENTS] = [
    "il2_internal_total",
    "il2_external",
    "il2r_total",
    "il2r_two_chain",
    "il2r_three_chain",
    "il2_il2r_two_chain",
    "il2_il2r_three_chain",
    "granzyme",
];

/// Length of the bound IL-2 history [ticks].
pub const HISTORY_LENGTH: usize = 180;

const STEP_DIVIDER: f64 = 3.0;
const STEP_SIZE: f64 = 1.0 / STEP_DIVIDER;
const WINDOW: f64 = 60.0;
const K_CONVERT: f64 = 1e-3 / STEP_DIVIDER;
const K_REC: f64 = 1e-5 / STEP_DIVIDER;
const IL2_BINDING_MIN: f64 = 3.8193e-2;
const IL2_BINDING_MAX: f64 = 3.155;
const IL2_BINDING_OFF_RATE: f64 = 0.015;

const GRANZ_PER_IL2: f64 = 0.005;
const IL2_PROD_RATE_ACTIVE: f64 = 293.27;
const IL2_PROD_RATE_MAX_FEEDBACK: f64 = 16.62;

/// Helper cells secrete IL-2; cytotoxic cells synthesise granzyme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InflammationVersion {
    Cd4,
    Cd8,
}

impl FromStr for InflammationVersion {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cd4" => Ok(InflammationVersion::Cd4),
            "cd8" => Ok(InflammationVersion::Cd8),
            other => Err(CellError::configuration(
                "processes.inflammation",
                format!("unknown inflammation version '{}'", other),
            )),
        }
    }
}

/// Receptor binding rates for one patch volume.
#[derive(Debug, Clone, Copy)]
struct Rates {
    k_on2: f64,
    k_on3: f64,
    k_off: f64,
}

impl Rates {
    fn for_location_volume(location_volume: f64) -> Self {
        Rates {
            k_on2: IL2_BINDING_MIN / location_volume / 60.0 / STEP_DIVIDER,
            k_on3: IL2_BINDING_MAX / location_volume / 60.0 / STEP_DIVIDER,
            k_off: IL2_BINDING_OFF_RATE / 60.0 / STEP_DIVIDER,
        }
    }

    /// Receptor network in which every conversion moves mass between species,
    /// so free plus bound IL-2 and total receptors are conserved.
    fn derivatives(&self, y: &[f64]) -> Vec<f64> {
        let bound = y[IL2_IL2RBG] + y[IL2_IL2RBGA];
        let on2 = self.k_on2 * y[IL2RBG] * y[IL2_EXT];
        let on3 = self.k_on3 * y[IL2RBGA] * y[IL2_EXT];
        let off2 = self.k_off * y[IL2_IL2RBG];
        let off3 = self.k_off * y[IL2_IL2RBGA];
        let convert = K_CONVERT * bound * y[IL2RBG];

        let mut dydt = vec![0.0; NUM_COMPONENTS];
        dydt[IL2_EXT] = off2 + off3 - on2 - on3;
        dydt[IL2RBG] = off2 - on2 - convert + K_REC * (bound + y[IL2RBGA]);
        dydt[IL2RBGA] = off3 - on3 + convert - K_REC * y[IL2RBGA];
        dydt[IL2_IL2RBG] = on2 - off2 - K_REC * y[IL2_IL2RBG];
        dydt[IL2_IL2RBGA] = on3 - off3 - K_REC * y[IL2_IL2RBGA];
        dydt[IL2_INT_TOTAL] = dydt[IL2_IL2RBG] + dydt[IL2_IL2RBGA];
        dydt[IL2R_TOTAL] = dydt[IL2RBG] + dydt[IL2RBGA];
        dydt
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inflammation {
    version: InflammationVersion,
    amounts: [f64; NUM_COMPONENTS],
    history: [f64; HISTORY_LENGTH],
    ticker: u64,
    active_ticker: u64,
    active: bool,
    shell_thickness: f64,
    receptors: f64,
    synthesis_delay: u64,
    last_production: f64,
}

impl Inflammation {
    pub fn new(version: InflammationVersion, params: &Parameters) -> Result<Self, CellError> {
        let receptors = params.get_positive("inflammation/IL2_RECEPTORS")?;
        let (key, delay) = match version {
            InflammationVersion::Cd4 => {
                ("inflammation/IL2_SYNTHESIS_DELAY", params.get_count("inflammation/IL2_SYNTHESIS_DELAY")?)
            }
            InflammationVersion::Cd8 => {
                ("inflammation/GRANZ_SYNTHESIS_DELAY", params.get_count("inflammation/GRANZ_SYNTHESIS_DELAY")?)
            }
        };
        if delay as usize >= HISTORY_LENGTH {
            return Err(CellError::configuration(
                key,
                format!("delay {} must be shorter than the {} tick history", delay, HISTORY_LENGTH),
            ));
        }

        let mut amounts = [0.0; NUM_COMPONENTS];
        amounts[IL2R_TOTAL] = receptors;
        amounts[IL2RBG] = receptors;
        amounts[GRANZYME] = 1.0;

        Ok(Inflammation {
            version,
            amounts,
            history: [0.0; HISTORY_LENGTH],
            ticker: 0,
            active_ticker: 0,
            active: false,
            shell_thickness: params.get_non_negative("inflammation/SHELL_THICKNESS")?,
            receptors,
            synthesis_delay: delay,
            last_production: 0.0,
        })
    }

    pub fn version(&self) -> InflammationVersion {
        self.version
    }

    pub fn amount(&self, index: usize) -> f64 {
        self.amounts[index]
    }

    pub fn receptors(&self) -> f64 {
        self.receptors
    }

    pub fn active_ticker(&self) -> u64 {
        self.active_ticker
    }

    /// IL-2 secreted during the last tick [molecules].
    pub fn last_production(&self) -> f64 {
        self.last_production
    }

    pub fn granzyme(&self) -> f64 {
        self.amounts[GRANZYME]
    }

    /// Uses one unit of granzyme if at least one is available.
    pub fn consume_granzyme(&mut self) -> bool {
        if self.amounts[GRANZYME] >= 1.0 {
            self.amounts[GRANZYME] -= 1.0;
            true
        } else {
            false
        }
    }

    /// Bound IL-2 recorded `delay` ticks before the current tick.
    pub fn prior_bound(&self, delay: u64) -> f64 {
        let len = HISTORY_LENGTH as i64;
        let mut index = (self.ticker as i64 % len) - delay as i64;
        while index < 0 {
            index += len;
        }
        self.history[index as usize]
    }

    pub fn feedback(&self, delay: u64) -> Il2Feedback {
        Il2Feedback {
            prior_bound: self.prior_bound(delay),
            receptors: self.receptors,
            active: self.active,
            active_ticker: self.active_ticker,
        }
    }

    /// Fraction of the patch volume that lies within the shell around the cell.
    pub fn shell_fraction(&self, volume: f64, location_volume: f64) -> f64 {
        let rad_cell = (3.0 / 4.0 / PI * volume).cbrt();
        let rad_shell = rad_cell + self.shell_thickness;
        let vol_shell = volume * ((rad_shell / rad_cell).powi(3) - 1.0);
        (vol_shell / location_volume).min(1.0)
    }

    pub fn step(&mut self, cell: &CellCore, ctx: &mut StepContext<'_>) -> Result<()> {
        let loc = cell.location;
        let location_volume = ctx.geometry().volume();
        let fraction = self.shell_fraction(cell.volume(), location_volume);
        let external = ctx.lattice.average_value(Field::Il2, loc) * location_volume;

        self.active = cell.activated;
        self.active_ticker = if self.active { self.active_ticker + 1 } else { 0 };

        let rates = Rates::for_location_volume(location_volume);
        self.amounts[IL2_EXT] = external * fraction;
        let next = solver::runge_kutta(|_t, y| rates.derivatives(y), 0.0, &self.amounts, WINDOW, STEP_SIZE);
        for (slot, value) in self.amounts.iter_mut().zip(next) {
            *slot = value.max(0.0);
        }

        let delay = self.synthesis_delay;
        let prior = self.prior_bound(delay);
        self.last_production = 0.0;
        match self.version {
            InflammationVersion::Cd4 => {
                self.last_production = IL2_PROD_RATE_MAX_FEEDBACK * (prior / self.receptors);
                if self.active && self.active_ticker >= delay {
                    self.last_production += IL2_PROD_RATE_ACTIVE;
                }
            }
            InflammationVersion::Cd8 => {
                if self.active && self.active_ticker > delay {
                    self.amounts[GRANZYME] += GRANZ_PER_IL2 * (prior / self.receptors);
                }
            }
        }

        // Return the shell's net change plus secretion to the patch.
        let returned = external - (external * fraction - self.amounts[IL2_EXT]) + self.last_production;
        ctx.lattice.set_value(Field::Il2, loc, returned / location_volume);

        self.history[(self.ticker % HISTORY_LENGTH as u64) as usize] = self.amounts[IL2_INT_TOTAL];
        self.ticker += 1;

        trace!(
            "cell {} inflammation: bound {:.2} granzyme {:.3} production {:.2}",
            cell.id,
            self.amounts[IL2_INT_TOTAL],
            self.amounts[GRANZYME],
            self.last_production
        );
        Ok(())
    }
}

impl Process for Inflammation {
    fn domain(&self) -> ProcessDomain {
        ProcessDomain::Inflammation
    }

    fn pools(&self) -> Vec<(&'static str, f64)> {
        NAMES.iter().zip(self.amounts.iter()).map(|(n, v)| (*n, *v)).collect()
    }

    /// Every pool divides proportionally; the bound IL-2 history is inherited.
    fn split(&mut self, fraction: f64) -> Self {
        let mut daughter = self.clone();
        for (d, p) in daughter.amounts.iter_mut().zip(self.amounts.iter_mut()) {
            *d = *p * fraction;
            *p *= 1.0 - fraction;
        }
        daughter.receptors = self.receptors * fraction;
        self.receptors *= 1.0 - fraction;
        daughter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receptor_network_conserves_receptors_and_only_recycles_il2() {
        let rates = Rates::for_location_volume(30.0 * 30.0 * 8.7);
        let mut y = vec![0.0; NUM_COMPONENTS];
        y[IL2_EXT] = 2000.0;
        y[IL2RBG] = 5000.0;
        y[IL2R_TOTAL] = 5000.0;
        let out = solver::runge_kutta(|_t, y| rates.derivatives(y), 0.0, &y, 60.0, STEP_SIZE);
        let il2_before = y[IL2_EXT];
        let il2_after = out[IL2_EXT] + out[IL2_IL2RBG] + out[IL2_IL2RBGA];
        assert!(il2_after <= il2_before + 1e-9, "il2 {} -> {}", il2_before, il2_after);
        assert!(il2_before - il2_after < 0.01 * il2_before, "only recycling removes IL-2");
        let receptors_after = out[IL2RBG] + out[IL2RBGA] + out[IL2_IL2RBG] + out[IL2_IL2RBGA];
        assert!((5000.0 - receptors_after).abs() < 1e-6, "receptors {}", receptors_after);
        assert!(out[IL2_INT_TOTAL] > 0.0, "some IL-2 should bind");
    }

    #[test]
    fn delay_beyond_history_is_rejected() {
        let mut params = Parameters::with_defaults();
        params.insert("inflammation/IL2_SYNTHESIS_DELAY", 180.0);
        assert!(matches!(
            Inflammation::new(InflammationVersion::Cd4, &params),
            Err(CellError::Configuration { .. })
        ));
        assert!(Inflammation::new(InflammationVersion::Cd8, &params).is_ok());
    }

    #[test]
    fn prior_bound_wraps_around_the_history() {
        let params = Parameters::with_defaults();
        let mut inflammation = Inflammation::new(InflammationVersion::Cd8, &params).unwrap();
        inflammation.history[HISTORY_LENGTH - 5] = 42.0;
        inflammation.ticker = 10;
        assert_eq!(inflammation.prior_bound(15), 42.0);
    }

    #[test]
    fn split_is_proportional_for_every_pool() {
        let params = Parameters::with_defaults();
        let mut parent = Inflammation::new(InflammationVersion::Cd4, &params).unwrap();
        parent.amounts[IL2_IL2RBG] = 120.0;
        parent.amounts[GRANZYME] = 3.0;
        let before = parent.pools();
        let daughter = parent.split(0.45);
        for (i, (name, total)) in before.iter().enumerate() {
            let sum = parent.pools()[i].1 + daughter.pools()[i].1;
            assert!((sum - total).abs() < 1e-9, "{} not conserved", name);
        }
        assert!((daughter.granzyme() - 1.35).abs() < 1e-12);
    }

    #[test]
    fn granzyme_is_consumed_one_unit_at_a_time() {
        let params = Parameters::with_defaults();
        let mut inflammation = Inflammation::new(InflammationVersion::Cd8, &params).unwrap();
        assert!(inflammation.consume_granzyme());
        assert!(!inflammation.consume_granzyme(), "0 granzyme left");
    }
}

//! Energy, mass and volume balance driven by glucose and oxygen uptake.
//!
//! Every variant shares the same bookkeeping around a variant-specific core:
//! read external amounts, compute the energy requirement, run the core, then
//! write the uptake back to the lattice and update the cell.

mod cart;
mod complex;
mod medium;
mod random;
mod simple;

use super::{snap, Process, ProcessDomain};
use crate::agent::CellCore;
use crate::context::StepContext;
use crate::env::{Field, Lattice};
use anyhow::Result;
use cellsim_common::{CellError, CellState, Parameters};
use log::trace;
use std::str::FromStr;

/// Energy from glycolysis [fmol ATP/fmol glucose].
pub const ENERGY_FROM_GLYC: f64 = 2.0;
/// Energy from oxidative phosphorylation [fmol ATP/fmol pyruvate].
pub const ENERGY_FROM_OXPHOS: f64 = 15.0;
/// Oxygen consumed per pyruvate [fmol O2/fmol pyruvate].
pub const OXY_PER_PYRU: f64 = 3.0;
/// Pyruvate produced per glucose [fmol pyruvate/fmol glucose].
pub const PYRU_PER_GLUC: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetabolismVersion {
    Random,
    Simple,
    Medium,
    Complex,
    Cart,
}

impl FromStr for MetabolismVersion {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(MetabolismVersion::Random),
            "simple" => Ok(MetabolismVersion::Simple),
            "medium" => Ok(MetabolismVersion::Medium),
            "complex" => Ok(MetabolismVersion::Complex),
            "cart" => Ok(MetabolismVersion::Cart),
            other => Err(CellError::configuration(
                "processes.metabolism",
                format!("unknown metabolism version '{}'", other),
            )),
        }
    }
}

/// Shift of metabolic preference and uptake for immune effectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartShift {
    pub meta_pref_il2: f64,
    pub meta_pref_active: f64,
    pub gluc_uptake_rate_il2: f64,
    pub gluc_uptake_rate_active: f64,
    pub frac_mass_active: f64,
    pub switch_delay: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetabolismParameters {
    pub basal_energy: f64,
    pub proliferation_energy: f64,
    pub migration_energy: f64,
    pub cell_density: f64,
    pub ratio_glucose_biomass: f64,
    pub oxygen_solubility: f64,
    pub average_cell_volume: f64,
    pub metabolic_preference: f64,
    pub conversion_fraction: f64,
    pub minimum_mass_fraction: f64,
    pub ratio_glucose_pyruvate: f64,
    pub lactate_rate: f64,
    pub autophagy_rate: f64,
    pub glucose_uptake_rate: f64,
    pub atp_production_rate: f64,
    pub constant_glucose_uptake_rate: f64,
    pub constant_volume_growth_rate: f64,
    pub cart: Option<CartShift>,
}

impl MetabolismParameters {
    pub fn from_parameters(version: MetabolismVersion, params: &Parameters) -> Result<Self, CellError> {
        let uses_pyruvate = matches!(version, MetabolismVersion::Complex | MetabolismVersion::Cart);
        let gradient_driven = matches!(version, MetabolismVersion::Medium) || uses_pyruvate;
        let fixed_rate = matches!(version, MetabolismVersion::Simple | MetabolismVersion::Medium);

        let cart = if version == MetabolismVersion::Cart {
            Some(CartShift {
                meta_pref_il2: params.get("metabolism/META_PREF_IL2")?,
                meta_pref_active: params.get("metabolism/META_PREF_ACTIVE")?,
                gluc_uptake_rate_il2: params.get("metabolism/GLUC_UPTAKE_RATE_IL2")?,
                gluc_uptake_rate_active: params.get("metabolism/GLUC_UPTAKE_RATE_ACTIVE")?,
                frac_mass_active: params.get("metabolism/FRAC_MASS_ACTIVE")?,
                switch_delay: params.get_count("metabolism/META_SWITCH_DELAY")?,
            })
        } else {
            None
        };

        Ok(MetabolismParameters {
            basal_energy: params.get_non_negative("metabolism/BASAL_ENERGY")?,
            proliferation_energy: params.get_non_negative("metabolism/PROLIFERATION_ENERGY")?,
            migration_energy: params.get_non_negative("metabolism/MIGRATION_ENERGY")?,
            cell_density: params.get_positive("metabolism/CELL_DENSITY")?,
            ratio_glucose_biomass: params.get_positive("metabolism/RATIO_GLUCOSE_BIOMASS")?,
            oxygen_solubility: params.get_non_negative("metabolism/OXYGEN_SOLUBILITY_TISSUE")?,
            average_cell_volume: params.get_positive("CELL_VOLUME")?,
            metabolic_preference: if version == MetabolismVersion::Random {
                0.0
            } else {
                params.get_fraction("metabolism/METABOLIC_PREFERENCE")?
            },
            conversion_fraction: if gradient_driven {
                params.get_fraction("metabolism/CONVERSION_FRACTION")?
            } else {
                0.0
            },
            minimum_mass_fraction: if gradient_driven {
                params.get_fraction("metabolism/MINIMUM_MASS_FRACTION")?
            } else {
                0.0
            },
            ratio_glucose_pyruvate: if uses_pyruvate {
                params.get_fraction("metabolism/RATIO_GLUCOSE_PYRUVATE")?
            } else {
                0.0
            },
            lactate_rate: if uses_pyruvate { params.get_fraction("metabolism/LACTATE_RATE")? } else { 0.0 },
            autophagy_rate: if gradient_driven {
                params.get_non_negative("metabolism/AUTOPHAGY_RATE")?
            } else {
                0.0
            },
            glucose_uptake_rate: if uses_pyruvate {
                params.get_non_negative("metabolism/GLUCOSE_UPTAKE_RATE")?
            } else {
                0.0
            },
            atp_production_rate: if fixed_rate {
                params.get_non_negative("metabolism/ATP_PRODUCTION_RATE")?
            } else {
                0.0
            },
            constant_glucose_uptake_rate: if version == MetabolismVersion::Simple {
                params.get_non_negative("metabolism/CONSTANT_GLUCOSE_UPTAKE_RATE")?
            } else {
                0.0
            },
            constant_volume_growth_rate: if version == MetabolismVersion::Simple {
                params.get_non_negative("metabolism/CONSTANT_VOLUME_GROWTH_RATE")?
            } else {
                0.0
            },
            cart,
        })
    }
}

/// Lagged IL-2 signal and activation status read from the inflammation process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Il2Feedback {
    /// Bound IL-2 recorded `switch_delay` ticks ago [molecules].
    pub prior_bound: f64,
    /// Total IL-2 receptors of the cell [molecules].
    pub receptors: f64,
    pub active: bool,
    pub active_ticker: u64,
}

impl Il2Feedback {
    /// Fraction of receptors that were occupied, guarded against empty receptor pools.
    pub fn occupancy(&self) -> f64 {
        if self.receptors > 0.0 {
            self.prior_bound / self.receptors
        } else {
            0.0
        }
    }
}

/// Working values of one metabolism tick.
#[derive(Debug, Clone)]
pub(crate) struct MetabolicStep {
    pub volume: f64,
    pub mass: f64,
    pub critical_mass: f64,
    pub energy: f64,
    pub energy_cons: f64,
    pub energy_req: f64,
    pub glucose: f64,
    pub pyruvate: f64,
    pub ext_glucose: f64,
    pub ext_oxygen: f64,
    pub proliferating: bool,
    pub location_volume: f64,
    pub area: f64,
    pub perimeter: f64,
}

impl MetabolicStep {
    /// Glucose concentration gradient from outside to inside, zeroed when negligible.
    pub fn glucose_gradient(&self) -> f64 {
        let grad = self.ext_glucose / self.location_volume - self.glucose / self.volume;
        if grad < 1e-10 {
            0.0
        } else {
            grad
        }
    }
}

/// Amounts taken from the environment during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Uptake {
    pub glucose: f64,
    pub oxygen: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metabolism {
    version: MetabolismVersion,
    params: MetabolismParameters,
    glucose: f64,
    pyruvate: f64,
    last_uptake: Uptake,
}

impl Metabolism {
    /// Builds the process with internal glucose at `initial_concentration` times the cell volume.
    pub fn new(version: MetabolismVersion, params: &Parameters, volume: f64) -> Result<Self, CellError> {
        let typed = MetabolismParameters::from_parameters(version, params)?;
        let initial_concentration =
            params.get_non_negative("metabolism/INITIAL_GLUCOSE_CONCENTRATION")?;
        let glucose = initial_concentration * volume;
        let pyruvate = match version {
            MetabolismVersion::Complex | MetabolismVersion::Cart => glucose * PYRU_PER_GLUC,
            _ => 0.0,
        };
        Ok(Metabolism { version, params: typed, glucose, pyruvate, last_uptake: Uptake::default() })
    }

    pub fn version(&self) -> MetabolismVersion {
        self.version
    }

    pub fn parameters(&self) -> &MetabolismParameters {
        &self.params
    }

    /// Internal glucose [fmol].
    pub fn glucose(&self) -> f64 {
        self.glucose
    }

    /// Internal pyruvate [fmol]; always zero for single-pool variants.
    pub fn pyruvate(&self) -> f64 {
        self.pyruvate
    }

    pub fn last_uptake(&self) -> Uptake {
        self.last_uptake
    }

    /// Delay used to look up the lagged IL-2 signal, if this is the effector variant.
    pub fn switch_delay(&self) -> Option<u64> {
        self.params.cart.map(|c| c.switch_delay)
    }

    pub fn step(
        &mut self,
        cell: &mut CellCore,
        feedback: Option<Il2Feedback>,
        ctx: &mut StepContext<'_>,
    ) -> Result<()> {
        let geometry = ctx.geometry();
        let loc = cell.location;
        let volume = cell.volume();

        // Volume fraction of this cell among co-occupants (it is checked out of the grid).
        let total = ctx.grid.total_volume(loc) + volume;
        let f = if total > 0.0 { (volume / total).min(1.0) } else { 1.0 };

        let ext_glucose = ctx.lattice.average_value(Field::Glucose, loc) * geometry.volume();
        let ext_oxygen = ctx.lattice.average_value(Field::Oxygen, loc)
            * geometry.volume()
            * self.params.oxygen_solubility;

        let proliferating = cell.state() == CellState::Proliferative;
        let migrating = cell.state() == CellState::Migratory;
        let energy_cons = volume
            * (self.params.basal_energy
                + if proliferating { self.params.proliferation_energy } else { 0.0 }
                + if migrating { self.params.migration_energy } else { 0.0 });

        let mut step = MetabolicStep {
            volume,
            mass: volume * self.params.cell_density,
            critical_mass: cell.critical_volume * self.params.cell_density,
            energy: cell.energy,
            energy_cons,
            energy_req: energy_cons - cell.energy,
            glucose: self.glucose,
            pyruvate: self.pyruvate,
            ext_glucose,
            ext_oxygen,
            proliferating,
            location_volume: geometry.volume(),
            area: geometry.area() * f,
            perimeter: geometry.perimeter(f),
        };

        let uptake = match self.version {
            MetabolismVersion::Random => random::step(&mut step, &self.params, ctx.rng),
            MetabolismVersion::Simple => simple::step(&mut step, &self.params),
            MetabolismVersion::Medium => medium::step(&mut step, &self.params),
            MetabolismVersion::Complex => complex::step(&mut step, &self.params),
            MetabolismVersion::Cart => cart::step(&mut step, &self.params, &feedback.unwrap_or_default()),
        };

        // Write uptake back to the environment.
        if ext_glucose > 1e-10 {
            ctx.lattice.update_value(Field::Glucose, loc, (1.0 - uptake.glucose / ext_glucose).max(0.0));
        }
        if ext_oxygen > 1e-10 {
            ctx.lattice.update_value(Field::Oxygen, loc, (1.0 - uptake.oxygen / ext_oxygen).max(0.0));
        }

        self.glucose = snap(step.glucose.max(0.0));
        self.pyruvate = snap(step.pyruvate.max(0.0));
        self.last_uptake = uptake;
        cell.energy = snap(step.energy);
        cell.set_volume(step.mass / self.params.cell_density)?;
        cell.doubled = step.mass >= 2.0 * step.critical_mass;

        trace!(
            "cell {} metabolism: energy {:.4} glucose {:.4} volume {:.2}",
            cell.id,
            cell.energy,
            self.glucose,
            cell.volume()
        );
        Ok(())
    }
}

impl Process for Metabolism {
    fn domain(&self) -> ProcessDomain {
        ProcessDomain::Metabolism
    }

    fn pools(&self) -> Vec<(&'static str, f64)> {
        vec![("glucose", self.glucose), ("pyruvate", self.pyruvate)]
    }

    fn split(&mut self, fraction: f64) -> Self {
        let daughter = Metabolism {
            version: self.version,
            params: self.params.clone(),
            glucose: self.glucose * fraction,
            pyruvate: self.pyruvate * fraction,
            last_uptake: Uptake::default(),
        };
        self.glucose *= 1.0 - fraction;
        self.pyruvate *= 1.0 - fraction;
        daughter
    }
}

impl MetabolicStep {
    /// Growth condition shared by the gradient-driven variants.
    pub fn should_grow(&self) -> bool {
        (self.energy >= 0.0 && self.proliferating && self.mass < 2.0 * self.critical_mass)
            || (self.energy >= 0.0 && self.mass < 0.99 * self.critical_mass)
    }

    /// Shrinks the cell through autophagy when starving or oversized, returning the
    /// recovered biomass to internal glucose.
    pub fn autophagy(&mut self, minimum_mass_fraction: f64, params: &MetabolismParameters) {
        if (self.energy < 0.0 && self.mass > minimum_mass_fraction * self.critical_mass)
            || (self.energy >= 0.0 && self.mass > 1.01 * self.critical_mass && !self.proliferating)
        {
            self.mass -= params.autophagy_rate;
            self.glucose += params.autophagy_rate * params.ratio_glucose_biomass;
        }
    }

    /// Oxidative phosphorylation fed directly from internal glucose; returns the
    /// energy produced and the oxygen actually consumed.
    pub fn oxphos_from_glucose(&mut self, oxygen_uptake: f64) -> (f64, f64) {
        let oxy_in_gluc = oxygen_uptake / OXY_PER_PYRU / PYRU_PER_GLUC;
        if self.glucose > oxy_in_gluc {
            self.glucose -= oxy_in_gluc;
            (oxy_in_gluc * ENERGY_FROM_OXPHOS * PYRU_PER_GLUC, oxygen_uptake)
        } else {
            let energy = self.glucose * ENERGY_FROM_OXPHOS * PYRU_PER_GLUC;
            let used = self.glucose * OXY_PER_PYRU * PYRU_PER_GLUC;
            self.glucose = 0.0;
            (energy, used)
        }
    }

    /// Glycolysis of up to `required` internal glucose; returns the glucose consumed.
    pub fn glycolysis(&mut self, required: f64) -> f64 {
        let used = if self.glucose > required { required } else { self.glucose };
        self.glucose -= used;
        used
    }
}

use super::{Process, ProcessDomain};
use crate::agent::CellCore;
use crate::context::StepContext;
use crate::env::{Field, Lattice};
use cellsim_common::{CellError, CellState, Parameters};
use log::debug;
use rand::Rng;

/// Oxygen level at which drug-induced apoptosis is half-maximal.
const OXYGEN_HALF_EFFECT: f64 = 3.0;

/// Gradient-driven drug uptake with first-order clearance.
#[derive(Debug, Clone, PartialEq)]
pub struct Chemotherapy {
    internal: f64,
    threshold: f64,
    uptake_rate: f64,
    removal_rate: f64,
}

impl Chemotherapy {
    pub fn new(params: &Parameters) -> Result<Self, CellError> {
        Ok(Chemotherapy {
            internal: 0.0,
            threshold: params.get_non_negative("chemotherapy/CHEMOTHERAPY_THRESHOLD")?,
            uptake_rate: params.get_non_negative("chemotherapy/UPTAKE")?,
            removal_rate: params.get_non_negative("chemotherapy/REMOVAL")?,
        })
    }

    pub fn internal(&self) -> f64 {
        self.internal
    }

    /// Probability that a drug-loaded proliferating cell apoptoses at oxygen level `oxygen`.
    pub fn kill_probability(oxygen: f64) -> f64 {
        let o2 = oxygen * oxygen;
        o2 / (o2 + OXYGEN_HALF_EFFECT * OXYGEN_HALF_EFFECT)
    }

    /// Returns true when the drug pushes the cell into apoptosis.
    pub fn step(&mut self, cell: &CellCore, ctx: &mut StepContext<'_>) -> bool {
        let geometry = ctx.geometry();
        let loc = cell.location;
        let volume = cell.volume();

        let total = ctx.grid.total_volume(loc) + volume;
        let f = if total > 0.0 { (volume / total).min(1.0) } else { 1.0 };
        let area = geometry.area() * f;
        let surface_area = 2.0 * area + (volume / area) * geometry.perimeter(f);

        let external = ctx.lattice.average_value(Field::Drug, loc) * geometry.volume();
        let mut gradient = external / geometry.volume() - self.internal / volume;
        if gradient < 1e-10 {
            gradient = 0.0;
        }
        let uptake = self.uptake_rate * surface_area * gradient;
        self.internal += uptake;
        if external > 1e-10 {
            ctx.lattice.update_value(Field::Drug, loc, (1.0 - uptake / external).max(0.0));
        }

        let mut apoptose = false;
        if cell.state() == CellState::Proliferative && self.internal > self.threshold {
            let oxygen = ctx.lattice.average_value(Field::Oxygen, loc);
            if ctx.rng.random::<f64>() < Self::kill_probability(oxygen) {
                debug!("cell {} apoptoses under chemotherapy (internal drug {:.4})", cell.id, self.internal);
                apoptose = true;
            }
        }

        self.internal *= (-self.removal_rate).exp();
        apoptose
    }
}

impl Process for Chemotherapy {
    fn domain(&self) -> ProcessDomain {
        ProcessDomain::Chemotherapy
    }

    fn pools(&self) -> Vec<(&'static str, f64)> {
        vec![("drug", self.internal)]
    }

    fn split(&mut self, fraction: f64) -> Self {
        let daughter = Chemotherapy { internal: self.internal * fraction, ..self.clone() };
        self.internal *= 1.0 - fraction;
        daughter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_probability_is_half_at_three() {
        assert!((Chemotherapy::kill_probability(3.0) - 0.5).abs() < 1e-12);
        assert_eq!(Chemotherapy::kill_probability(0.0), 0.0);
        assert!(Chemotherapy::kill_probability(100.0) > 0.99);
    }

    #[test]
    fn split_conserves_drug() {
        let mut parent = Chemotherapy::new(&Parameters::with_defaults()).unwrap();
        parent.internal = 2.0;
        let daughter = parent.split(0.55);
        assert!((parent.internal() + daughter.internal() - 2.0).abs() < 1e-12);
    }
}

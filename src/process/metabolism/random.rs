use super::{MetabolicStep, MetabolismParameters, Uptake, ENERGY_FROM_GLYC};
use rand::rngs::StdRng;
use rand::Rng;

const GLUC_UPTAKE_MIN: f64 = 0.005;
const GLUC_UPTAKE_DELTA: f64 = 0.01;
const OXY_UPTAKE_MIN: f64 = 0.2;
const OXY_UPTAKE_DELTA: f64 = 0.3;
const GLUC_FRAC_MIN: f64 = 0.2;
const GLUC_FRAC_DELTA: f64 = 0.2;

/// Null-model metabolism: uptake fractions and growth are drawn at random.
pub(super) fn step(step: &mut MetabolicStep, params: &MetabolismParameters, rng: &mut StdRng) -> Uptake {
    let glucose_uptake = step.ext_glucose * (rng.random::<f64>() * GLUC_UPTAKE_DELTA + GLUC_UPTAKE_MIN);
    let oxygen_uptake = step.ext_oxygen * (rng.random::<f64>() * OXY_UPTAKE_DELTA + OXY_UPTAKE_MIN);
    step.glucose += glucose_uptake;

    let glycolytic_share = rng.random::<f64>() * GLUC_FRAC_DELTA + GLUC_FRAC_MIN;
    let (oxphos_energy, oxygen_used) = step.oxphos_from_glucose(oxygen_uptake);
    let glycolysis_energy = step.glycolysis(glycolytic_share) * ENERGY_FROM_GLYC;

    step.energy += oxphos_energy + glycolysis_energy;
    step.energy -= step.energy_cons / step.volume * params.average_cell_volume;

    if step.energy >= 0.0 && step.proliferating && step.mass < 2.0 * step.critical_mass {
        let growth = step.glucose * rng.random::<f64>();
        step.mass += growth / params.ratio_glucose_biomass;
        step.glucose -= growth;
    }

    Uptake { glucose: glucose_uptake, oxygen: oxygen_used }
}

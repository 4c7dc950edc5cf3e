use super::{
    MetabolicStep, MetabolismParameters, Uptake, ENERGY_FROM_GLYC, ENERGY_FROM_OXPHOS, OXY_PER_PYRU,
    PYRU_PER_GLUC,
};

/// Rates of one complex-metabolism tick, after any effector shift.
#[derive(Debug, Clone, Copy)]
pub(super) struct ComplexRates {
    pub metabolic_preference: f64,
    pub glucose_uptake_rate: f64,
    pub minimum_mass_fraction: f64,
}

impl ComplexRates {
    pub fn from_parameters(params: &MetabolismParameters) -> Self {
        ComplexRates {
            metabolic_preference: params.metabolic_preference,
            glucose_uptake_rate: params.glucose_uptake_rate,
            minimum_mass_fraction: params.minimum_mass_fraction,
        }
    }
}

pub(super) fn step(step: &mut MetabolicStep, params: &MetabolismParameters) -> Uptake {
    step_with(step, params, ComplexRates::from_parameters(params))
}

/// Glucose and pyruvate pools with surface-area limited uptake, lactate loss and autophagy.
pub(super) fn step_with(step: &mut MetabolicStep, params: &MetabolismParameters, rates: ComplexRates) -> Uptake {
    let surface_area = if step.area > 0.0 {
        2.0 * step.area + (step.volume / step.area) * step.perimeter
    } else {
        0.0
    };
    let glucose_uptake = rates.glucose_uptake_rate * surface_area * step.glucose_gradient();
    step.glucose += glucose_uptake;

    let pref = rates.metabolic_preference;
    let mut gluc_req = pref * step.energy_req / ENERGY_FROM_GLYC;
    let pyru_req = (1.0 - pref) * step.energy_req / ENERGY_FROM_OXPHOS;
    let oxygen_req = pyru_req * OXY_PER_PYRU;
    let mut oxygen_uptake = super::snap(step.ext_oxygen.min(oxygen_req).max(0.0));

    // Oxidative phosphorylation on internal pyruvate.
    let oxy_in_pyru = oxygen_uptake / OXY_PER_PYRU;
    let oxphos_energy = if step.pyruvate > oxy_in_pyru {
        step.pyruvate -= oxy_in_pyru;
        oxy_in_pyru * ENERGY_FROM_OXPHOS
    } else {
        let energy = step.pyruvate * ENERGY_FROM_OXPHOS;
        oxygen_uptake = step.pyruvate * OXY_PER_PYRU;
        step.pyruvate = 0.0;
        energy
    };

    if step.energy <= 0.0 && step.glucose > 0.0 {
        let needed = -(step.energy - step.energy_cons + oxphos_energy) / ENERGY_FROM_GLYC;
        gluc_req = gluc_req.max(needed);
    }

    // Glycolysis feeds the pyruvate pool.
    let glycolysed = step.glycolysis(gluc_req.max(0.0));
    step.pyruvate += glycolysed * PYRU_PER_GLUC;
    let glycolysis_energy = glycolysed * ENERGY_FROM_GLYC;

    step.energy += oxphos_energy + glycolysis_energy;
    step.energy -= step.energy_cons;
    step.energy = super::snap(step.energy);

    if step.should_grow() {
        let ratio = params.ratio_glucose_pyruvate;
        step.mass += params.conversion_fraction
            * (ratio * step.glucose + (1.0 - ratio) * step.pyruvate / PYRU_PER_GLUC)
            / params.ratio_glucose_biomass;
        step.glucose *= 1.0 - params.conversion_fraction * ratio;
        step.pyruvate *= 1.0 - params.conversion_fraction * (1.0 - ratio);
    }
    step.autophagy(rates.minimum_mass_fraction, params);

    // Pyruvate lost to lactate.
    step.pyruvate -= params.lactate_rate * step.pyruvate;

    Uptake { glucose: glucose_uptake, oxygen: oxygen_uptake }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::metabolism::{MetabolismVersion, MetabolismParameters};
    use cellsim_common::Parameters;

    fn fresh_step(ext_glucose: f64, ext_oxygen: f64) -> MetabolicStep {
        let volume = 2250.0;
        let density = 1.3e-6;
        MetabolicStep {
            volume,
            mass: volume * density,
            critical_mass: volume * density,
            energy: 0.0,
            energy_cons: volume * 0.001,
            energy_req: volume * 0.001,
            glucose: 0.005 * volume,
            pyruvate: 0.01 * volume,
            ext_glucose,
            ext_oxygen,
            proliferating: false,
            location_volume: 30.0 * 30.0 * 8.7,
            area: 900.0,
            perimeter: 120.0,
        }
    }

    #[test]
    fn starving_cell_loses_energy_and_mass() {
        let params =
            MetabolismParameters::from_parameters(MetabolismVersion::Complex, &Parameters::with_defaults()).unwrap();
        let mut s = fresh_step(0.0, 0.0);
        s.glucose = 0.0;
        s.pyruvate = 0.0;
        let mass_before = s.mass;
        let uptake = step(&mut s, &params);
        assert_eq!(uptake.glucose, 0.0);
        assert!(s.energy < 0.0, "energy should go negative without substrate");
        assert!(s.mass < mass_before, "autophagy should reduce mass");
    }

    #[test]
    fn fed_cell_takes_up_glucose_and_oxygen() {
        let params =
            MetabolismParameters::from_parameters(MetabolismVersion::Complex, &Parameters::with_defaults()).unwrap();
        let location_volume = 30.0 * 30.0 * 8.7;
        let mut s = fresh_step(0.005 * location_volume, 100.0 * location_volume * 1.3e-3);
        s.glucose = 0.0;
        let uptake = step(&mut s, &params);
        assert!(uptake.glucose > 0.0, "gradient should drive glucose uptake");
        assert!(uptake.oxygen > 0.0, "pyruvate should be oxidised");
        assert!(s.pyruvate >= 0.0 && s.glucose >= 0.0);
    }
}

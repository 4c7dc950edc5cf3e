use super::{
    MetabolicStep, MetabolismParameters, Uptake, ENERGY_FROM_GLYC, ENERGY_FROM_OXPHOS, OXY_PER_PYRU,
    PYRU_PER_GLUC,
};

/// Single-pool metabolism with volume-scaled gradient uptake.
pub(super) fn step(step: &mut MetabolicStep, params: &MetabolismParameters) -> Uptake {
    let pref = params.metabolic_preference;
    // Whole ATP per glucose, truncated.
    let atp_per_glucose =
        (pref * ENERGY_FROM_GLYC + (1.0 - pref) * ENERGY_FROM_OXPHOS * PYRU_PER_GLUC).trunc().max(1.0);
    let glucose_uptake = params.atp_production_rate * step.volume * step.glucose_gradient() / atp_per_glucose;
    step.glucose += glucose_uptake;

    let mut gluc_req_glyc = step.energy_req * pref / ENERGY_FROM_GLYC;
    let gluc_req_oxphos = step.energy_req * (1.0 - pref) / ENERGY_FROM_OXPHOS / PYRU_PER_GLUC;
    let oxygen_req = gluc_req_oxphos * PYRU_PER_GLUC * OXY_PER_PYRU;
    let oxygen_uptake = super::snap(step.ext_oxygen.min(oxygen_req).max(0.0));

    let (oxphos_energy, oxygen_used) = step.oxphos_from_glucose(oxygen_uptake);

    // Divert extra glucose to glycolysis to cover an oxygen-limited deficit.
    if step.energy <= 0.0 && step.glucose > 0.0 {
        let needed = -(step.energy - step.energy_cons + oxphos_energy) / ENERGY_FROM_GLYC;
        gluc_req_glyc = gluc_req_glyc.max(needed);
    }
    let glycolysis_energy = step.glycolysis(gluc_req_glyc.max(0.0)) * ENERGY_FROM_GLYC;

    step.energy += oxphos_energy + glycolysis_energy;
    step.energy -= step.energy_cons;
    step.energy = super::snap(step.energy);

    if step.should_grow() {
        step.mass += params.conversion_fraction * step.glucose / params.ratio_glucose_biomass;
        step.glucose *= 1.0 - params.conversion_fraction;
    }
    step.autophagy(params.minimum_mass_fraction, params);

    Uptake { glucose: glucose_uptake, oxygen: oxygen_used }
}

use super::{
    MetabolicStep, MetabolismParameters, Uptake, ENERGY_FROM_GLYC, ENERGY_FROM_OXPHOS, OXY_PER_PYRU,
    PYRU_PER_GLUC,
};

/// Fixed ATP production split by metabolic preference, with constant volume growth.
pub(super) fn step(step: &mut MetabolicStep, params: &MetabolismParameters) -> Uptake {
    let glucose_uptake = params.constant_glucose_uptake_rate * step.glucose_gradient();
    step.glucose += glucose_uptake;

    let pref = params.metabolic_preference;
    let gluc_req_glyc = params.atp_production_rate * pref / ENERGY_FROM_GLYC;
    let gluc_req_oxphos = params.atp_production_rate * (1.0 - pref) / ENERGY_FROM_OXPHOS / PYRU_PER_GLUC;
    let oxygen_req = gluc_req_oxphos * PYRU_PER_GLUC * OXY_PER_PYRU;
    let oxygen_uptake = super::snap(step.ext_oxygen.min(oxygen_req));

    let (oxphos_energy, oxygen_used) = step.oxphos_from_glucose(oxygen_uptake);
    let glycolysis_energy = step.glycolysis(gluc_req_glyc) * ENERGY_FROM_GLYC;

    step.energy += oxphos_energy + glycolysis_energy;
    step.energy -= step.energy_cons / step.volume * params.average_cell_volume;
    step.energy = super::snap(step.energy);

    let growth_mass = params.cell_density * params.constant_volume_growth_rate;
    let growth_glucose = growth_mass * params.ratio_glucose_biomass;
    if step.energy >= 0.0
        && step.proliferating
        && step.mass < 2.0 * step.critical_mass
        && step.glucose > growth_glucose
    {
        step.mass += growth_mass;
        step.glucose -= growth_glucose;
    }

    Uptake { glucose: glucose_uptake, oxygen: oxygen_used }
}

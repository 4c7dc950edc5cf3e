use super::complex::{self, ComplexRates};
use super::{Il2Feedback, MetabolicStep, MetabolismParameters, Uptake};

/// Complex metabolism whose preference and uptake follow bound IL-2 and activation.
pub(super) fn step(step: &mut MetabolicStep, params: &MetabolismParameters, feedback: &Il2Feedback) -> Uptake {
    let mut rates = ComplexRates::from_parameters(params);
    if let Some(shift) = params.cart {
        let occupancy = feedback.occupancy();
        rates.metabolic_preference += shift.meta_pref_il2 * occupancy;
        rates.glucose_uptake_rate += shift.gluc_uptake_rate_il2 * occupancy;
        if feedback.active && feedback.active_ticker >= shift.switch_delay {
            rates.metabolic_preference += shift.meta_pref_active;
            rates.glucose_uptake_rate += shift.gluc_uptake_rate_active;
            rates.minimum_mass_fraction += shift.frac_mass_active;
        }
    }
    rates.metabolic_preference = rates.metabolic_preference.clamp(0.0, 1.0);
    complex::step_with(step, params, rates)
}

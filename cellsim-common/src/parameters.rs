use crate::error::CellError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Built-in parameter values. Population overrides from the config are merged on top.
///
/// Keys are grouped by the process or module that reads them; cell-level keys carry no prefix.
/// Time is measured in ticks (one tick is one simulated minute), volumes in um^3,
/// amounts in fmol, energy in fmol ATP and mass in ng.
pub const DEFAULT_PARAMETERS: &[(&str, f64)] = &[
    // Cell
    ("CELL_VOLUME", 2250.0),
    ("CELL_HEIGHT", 8.7),
    ("APOPTOSIS_AGE", 120960.0),
    ("DIVISION_POTENTIAL", 50.0),
    ("ENERGY_THRESHOLD", 1.0),
    ("NECROTIC_FRACTION", 0.5),
    ("SENESCENT_FRACTION", 0.5),
    ("CAR_ANTIGENS", 0.0),
    ("SELF_TARGETS", 500.0),
    ("SYNNOTCH_ANTIGENS", 0.0),
    // Modules
    ("apoptosis/DEATH_DURATION", 120.0),
    ("necrosis/NECROSIS_DURATION", 240.0),
    ("migration/MIGRATION_RATE", 0.25),
    ("migration/ACCURACY", 0.8),
    ("migration/AFFINITY", 0.5),
    ("proliferation/SYNTHESIS_DURATION", 580.0),
    ("cytotoxicity/BOUND_TIME", 60.0),
    ("cytotoxicity/BOUND_RANGE", 15.0),
    // Metabolism
    ("metabolism/BASAL_ENERGY", 0.001),
    ("metabolism/PROLIFERATION_ENERGY", 0.001),
    ("metabolism/MIGRATION_ENERGY", 0.00025),
    ("metabolism/CELL_DENSITY", 1.3e-6),
    ("metabolism/RATIO_GLUCOSE_BIOMASS", 1.0e4),
    ("metabolism/OXYGEN_SOLUBILITY_TISSUE", 1.3e-3),
    ("metabolism/METABOLIC_PREFERENCE", 0.3),
    ("metabolism/CONVERSION_FRACTION", 0.25),
    ("metabolism/MINIMUM_MASS_FRACTION", 0.5),
    ("metabolism/RATIO_GLUCOSE_PYRUVATE", 0.5),
    ("metabolism/LACTATE_RATE", 0.1),
    ("metabolism/AUTOPHAGY_RATE", 1.0e-6),
    ("metabolism/GLUCOSE_UPTAKE_RATE", 0.112),
    ("metabolism/ATP_PRODUCTION_RATE", 2.5),
    ("metabolism/CONSTANT_GLUCOSE_UPTAKE_RATE", 100.0),
    ("metabolism/CONSTANT_VOLUME_GROWTH_RATE", 2.0),
    ("metabolism/META_PREF_IL2", 0.05),
    ("metabolism/META_PREF_ACTIVE", 0.2),
    ("metabolism/GLUC_UPTAKE_RATE_IL2", 0.05),
    ("metabolism/GLUC_UPTAKE_RATE_ACTIVE", 0.1),
    ("metabolism/FRAC_MASS_ACTIVE", 0.05),
    ("metabolism/META_SWITCH_DELAY", 30.0),
    ("metabolism/INITIAL_GLUCOSE_CONCENTRATION", 0.005),
    // Signaling
    ("signaling/MIGRATORY_THRESHOLD", 10.0),
    // Inflammation
    ("inflammation/SHELL_THICKNESS", 1.0),
    ("inflammation/IL2_RECEPTORS", 5000.0),
    ("inflammation/IL2_SYNTHESIS_DELAY", 60.0),
    ("inflammation/GRANZ_SYNTHESIS_DELAY", 15.0),
    // Binding
    ("binding/CARS", 50000.0),
    ("binding/SELF_RECEPTORS", 1500.0),
    ("binding/SEARCH_ABILITY", 1.0),
    ("binding/CAR_BINDING_RATE", 2.0e-4),
    ("binding/SELF_BINDING_RATE", 1.0e-6),
    ("binding/CONTACT_FRACTION", 0.1),
    ("binding/MAX_ANTIGEN_BINDING", 10.0),
    ("binding/EXHAUSTED_FRACTION", 0.5),
    ("binding/ANERGIC_FRACTION", 0.5),
    ("binding/PROLIFERATIVE_FRACTION", 0.5),
    ("binding/STIMULATORY_FRACTION", 0.5),
    // synNotch circuit
    ("synnotch/SYNNOTCHS", 1000.0),
    ("synnotch/K_SYNNOTCH_ON", 1.0e5),
    ("synnotch/K_SYNNOTCH_OFF", 1.0e-4),
    ("synnotch/K_CAR_GENERATION", 1.0),
    ("synnotch/K_CAR_DEGRADE", 2.0e-5),
    ("synnotch/SYNNOTCH_THRESHOLD", 0.1),
    ("synnotch/HILL_N", 4.4),
    ("synnotch/SYNNOTCH_ACTIVATION_DELAY", 120.0),
    // Quorum sensing
    ("quorum/AUX_FLOW_RATE", 0.05),
    ("quorum/K_AUX_DEGRADE", 5.56e-6),
    ("quorum/ACTIVATION_THRESHOLD", 1.0),
    // Chemotherapy
    ("chemotherapy/CHEMOTHERAPY_THRESHOLD", 0.5),
    ("chemotherapy/UPTAKE", 0.01),
    ("chemotherapy/REMOVAL", 0.01),
];

/// A population-level parameter: either a fixed value or a normal distribution
/// sampled once per agent.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum ParameterSpec {
    Constant(f64),
    Distribution { mu: f64, sigma: f64 },
}

impl ParameterSpec {
    pub fn mean(&self) -> f64 {
        match *self {
            ParameterSpec::Constant(value) => value,
            ParameterSpec::Distribution { mu, .. } => mu,
        }
    }
}

/// Concrete parameter values of one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    values: BTreeMap<String, f64>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameter set populated with [`DEFAULT_PARAMETERS`].
    pub fn with_defaults() -> Self {
        let mut params = Self::new();
        for (key, value) in DEFAULT_PARAMETERS {
            params.insert(*key, *value);
        }
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Returns a copy of `self` with every value of `overrides` written on top.
    pub fn merged(&self, overrides: &Parameters) -> Parameters {
        let mut out = self.clone();
        for (key, value) in overrides.iter() {
            out.insert(key, value);
        }
        out
    }

    /// Looks up a required, finite value.
    pub fn get(&self, key: &str) -> Result<f64, CellError> {
        match self.values.get(key) {
            None => Err(CellError::configuration(key, "required parameter is missing")),
            Some(value) if !value.is_finite() => {
                Err(CellError::configuration(key, format!("value {} is not finite", value)))
            }
            Some(value) => Ok(*value),
        }
    }

    /// Looks up a value that must be strictly positive.
    pub fn get_positive(&self, key: &str) -> Result<f64, CellError> {
        let value = self.get(key)?;
        if value <= 0.0 {
            return Err(CellError::configuration(key, format!("must be positive, got {}", value)));
        }
        Ok(value)
    }

    /// Looks up a value that must be zero or positive.
    pub fn get_non_negative(&self, key: &str) -> Result<f64, CellError> {
        let value = self.get(key)?;
        if value < 0.0 {
            return Err(CellError::configuration(key, format!("must not be negative, got {}", value)));
        }
        Ok(value)
    }

    /// Looks up a probability in [0, 1].
    pub fn get_fraction(&self, key: &str) -> Result<f64, CellError> {
        let value = self.get(key)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(CellError::configuration(key, format!("must lie in [0, 1], got {}", value)));
        }
        Ok(value)
    }

    /// Looks up a non-negative count or duration, rounded to the nearest integer.
    pub fn get_count(&self, key: &str) -> Result<u64, CellError> {
        let value = self.get_non_negative(key)?;
        Ok(value.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_unique_keys() {
        let params = Parameters::with_defaults();
        assert_eq!(params.iter().count(), DEFAULT_PARAMETERS.len());
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let params = Parameters::new();
        match params.get("metabolism/BASAL_ENERGY") {
            Err(CellError::Configuration { key, .. }) => assert_eq!(key, "metabolism/BASAL_ENERGY"),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn typed_getters_validate_ranges() {
        let mut params = Parameters::new();
        params.insert("A", -1.0);
        params.insert("B", 1.5);
        params.insert("C", f64::NAN);
        params.insert("D", 12.6);
        assert!(params.get_positive("A").is_err());
        assert!(params.get_fraction("B").is_err());
        assert!(params.get("C").is_err());
        assert_eq!(params.get_count("D"), Ok(13));
    }

    #[test]
    fn overrides_win_when_merging() {
        let base = Parameters::with_defaults();
        let mut overrides = Parameters::new();
        overrides.insert("NECROTIC_FRACTION", 0.3);
        let merged = base.merged(&overrides);
        assert_eq!(merged.get("NECROTIC_FRACTION"), Ok(0.3));
        assert_eq!(merged.get("SENESCENT_FRACTION"), Ok(0.5));
    }

    #[test]
    fn spec_deserializes_constants_and_distributions() {
        #[derive(Deserialize)]
        struct Holder {
            values: BTreeMap<String, ParameterSpec>,
        }
        let holder: Holder = toml::from_str(
            r#"
            [values]
            "CELL_VOLUME" = { mu = 2250.0, sigma = 200.0 }
            "NECROTIC_FRACTION" = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(
            holder.values["CELL_VOLUME"],
            ParameterSpec::Distribution { mu: 2250.0, sigma: 200.0 }
        );
        assert_eq!(holder.values["NECROTIC_FRACTION"].mean(), 0.3);
    }
}

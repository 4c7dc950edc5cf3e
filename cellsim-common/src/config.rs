use crate::parameters::ParameterSpec;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// Configuration for the simulation clock
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_ticks: u64,
    #[serde(default = "default_record_interval")]
    pub record_interval_ticks: u64,
}

fn default_record_interval() -> u64 {
    60
}

// Configuration for the patch grid
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    /// Number of patch rings around the center patch.
    #[serde(default = "default_grid_radius")]
    pub radius: u32,
    /// Side length of one square patch (um).
    #[serde(default = "default_patch_size")]
    pub patch_size: f64,
    /// Height of one patch (um).
    #[serde(default = "default_patch_height")]
    pub patch_height: f64,
    /// Upper bound on the number of agents sharing one patch.
    #[serde(default = "default_max_agents_per_patch")]
    pub max_agents_per_patch: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            radius: default_grid_radius(),
            patch_size: default_patch_size(),
            patch_height: default_patch_height(),
            max_agents_per_patch: default_max_agents_per_patch(),
        }
    }
}

fn default_grid_radius() -> u32 {
    10
}

fn default_patch_size() -> f64 {
    30.0
}

fn default_patch_height() -> f64 {
    8.7
}

fn default_max_agents_per_patch() -> usize {
    6
}

/// Initial and source concentration of one molecule field.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct FieldConfig {
    pub initial: f64,
    /// Concentration the field relaxes toward; defaults to `initial`.
    #[serde(default)]
    pub source: Option<f64>,
    /// Fraction of the gap to `source` closed every tick (0 disables replenishment).
    #[serde(default)]
    pub relaxation_rate: f64,
}

impl FieldConfig {
    pub fn constant(initial: f64, relaxation_rate: f64) -> Self {
        FieldConfig { initial, source: None, relaxation_rate }
    }

    pub fn source_value(&self) -> f64 {
        self.source.unwrap_or(self.initial)
    }
}

// Configuration for the molecule lattice, keyed by field name
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EnvironmentConfig {
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldConfig>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("glucose".to_string(), FieldConfig::constant(0.005, 0.05));
        fields.insert("oxygen".to_string(), FieldConfig::constant(100.0, 0.5));
        EnvironmentConfig { fields }
    }
}

// Seeds and replicate count, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    pub seed: u64,
    #[serde(default = "default_replicates")]
    pub replicates: u32,
}

fn default_replicates() -> u32 {
    1
}

/// Cell class of a population; selects the transition function and default processes.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CellVariant {
    Tissue,
    Cancer,
    CancerStem,
    CartCd4,
    CartCd8,
    CartSynnotch,
    Random,
}

impl CellVariant {
    pub fn name(self) -> &'static str {
        match self {
            CellVariant::Tissue => "tissue",
            CellVariant::Cancer => "cancer",
            CellVariant::CancerStem => "cancer_stem",
            CellVariant::CartCd4 => "cart_cd4",
            CellVariant::CartCd8 => "cart_cd8",
            CellVariant::CartSynnotch => "cart_synnotch",
            CellVariant::Random => "random",
        }
    }

    /// Numeric code used by the compact cell serialization.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_effector(self) -> bool {
        matches!(self, CellVariant::CartCd4 | CellVariant::CartCd8 | CellVariant::CartSynnotch)
    }
}

/// Process versions of a population. Unset entries fall back to the class default.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ProcessVersions {
    #[serde(default)]
    pub metabolism: Option<String>,
    #[serde(default)]
    pub signaling: Option<String>,
    #[serde(default)]
    pub inflammation: Option<String>,
    #[serde(default)]
    pub circuit: Option<String>,
    /// Auxin role of the population: "source" or "sink".
    #[serde(default)]
    pub quorum: Option<String>,
    #[serde(default)]
    pub chemotherapy: bool,
}

// One cell population
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    pub name: String,
    pub class: CellVariant,
    /// Number of agents placed at tick 0.
    pub init: u32,
    #[serde(default)]
    pub processes: ProcessVersions,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_stats: bool,
    #[serde(default)]
    pub save_cells: bool,
    #[serde(default)]
    pub cells_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

fn default_true() -> bool {
    true
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub timing: TimingConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    pub initial_conditions: InitialConditions,
    pub populations: Vec<PopulationConfig>,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timing.total_ticks == 0 {
            anyhow::bail!("total_ticks must be greater than 0.");
        }
        if self.timing.record_interval_ticks == 0 {
            anyhow::bail!("record_interval_ticks must be greater than 0.");
        }
        if self.grid.patch_size <= 0.0 || self.grid.patch_height <= 0.0 {
            anyhow::bail!("patch_size and patch_height must be positive.");
        }
        if self.grid.max_agents_per_patch == 0 {
            anyhow::bail!("max_agents_per_patch must be greater than 0.");
        }
        if self.initial_conditions.replicates == 0 {
            anyhow::bail!("replicates must be greater than 0.");
        }
        if self.populations.is_empty() {
            anyhow::bail!("at least one [[populations]] entry is required.");
        }
        for (name, field) in &self.environment.fields {
            if field.initial < 0.0 || field.source_value() < 0.0 {
                anyhow::bail!("environment field '{}' has a negative concentration.", name);
            }
            if !(0.0..=1.0).contains(&field.relaxation_rate) {
                anyhow::bail!("environment field '{}' relaxation_rate must lie in [0, 1].", name);
            }
        }
        for population in &self.populations {
            for (key, spec) in &population.parameters {
                if let ParameterSpec::Distribution { sigma, .. } = spec {
                    if *sigma < 0.0 {
                        anyhow::bail!(
                            "population '{}' parameter '{}' has a negative sigma.",
                            population.name,
                            key
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Total number of agents placed at tick 0 across populations.
    pub fn initial_cell_count(&self) -> u32 {
        self.populations.iter().map(|p| p.init).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [timing]
        total_ticks = 100

        [initial_conditions]
        seed = 7

        [[populations]]
        name = "tumor"
        class = "cancer"
        init = 4
        [populations.parameters]
        "NECROTIC_FRACTION" = 0.3
        "CELL_VOLUME" = { mu = 2250.0, sigma = 100.0 }

        [[populations]]
        name = "killers"
        class = "cart_cd8"
        init = 2

        [output]
        base_filename = "out"
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.timing.record_interval_ticks, 60);
        assert_eq!(config.grid.radius, 10);
        assert_eq!(config.initial_conditions.replicates, 1);
        assert!(config.environment.fields.contains_key("glucose"));
        assert_eq!(config.populations[1].class, CellVariant::CartCd8);
        assert_eq!(config.initial_cell_count(), 6);
        assert!(config.output.save_stats);
    }

    #[test]
    fn unknown_class_is_rejected_at_parse_time() {
        let broken = MINIMAL.replace("\"cart_cd8\"", "\"macrophage\"");
        assert!(SimulationConfig::from_toml_str(&broken).is_err());
    }

    #[test]
    fn zero_ticks_fail_validation() {
        let broken = MINIMAL.replace("total_ticks = 100", "total_ticks = 0");
        let err = SimulationConfig::from_toml_str(&broken).unwrap_err();
        assert!(err.to_string().contains("total_ticks"));
    }

    #[test]
    fn negative_sigma_fails_validation() {
        let broken = MINIMAL.replace("sigma = 100.0", "sigma = -1.0");
        assert!(SimulationConfig::from_toml_str(&broken).is_err());
    }
}

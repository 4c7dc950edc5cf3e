//! Builds agents from population templates.

use super::{Capabilities, CellAgent, CellCore};
use crate::binding::{BindingParameters, CircuitKind, EffectorState, SynNotchCircuit};
use crate::container::CellContainer;
use crate::env::{AgentId, Location, PatchGrid};
use crate::process::{
    Chemotherapy, Inflammation, InflammationVersion, Metabolism, MetabolismVersion, ProcessSet, QuorumSensing,
    QuorumVersion, Signaling, SignalingVersion,
};
use anyhow::{anyhow, Context, Result};
use cellsim_common::{CellError, CellVariant, ParameterSpec, Parameters, PopulationConfig, SimulationConfig};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

/// Resolved process versions of one population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessPlan {
    pub metabolism: Option<MetabolismVersion>,
    pub signaling: Option<SignalingVersion>,
    pub inflammation: Option<InflammationVersion>,
    pub circuit: Option<CircuitKind>,
    pub quorum: Option<QuorumVersion>,
    pub chemotherapy: bool,
}

impl ProcessPlan {
    /// Applies the configured versions over the class defaults.
    pub fn for_population(population: &PopulationConfig) -> Result<Self, CellError> {
        let mut plan = Self::defaults(population.class);
        let versions = &population.processes;
        if let Some(v) = &versions.metabolism {
            plan.metabolism = Some(v.parse()?);
        }
        if let Some(v) = &versions.signaling {
            plan.signaling = Some(v.parse()?);
        }
        if let Some(v) = &versions.inflammation {
            if !population.class.is_effector() {
                return Err(CellError::configuration(
                    "processes.inflammation",
                    format!("{} cells have no inflammation process", population.class.name()),
                ));
            }
            plan.inflammation = Some(v.parse()?);
        }
        if let Some(v) = &versions.circuit {
            if population.class != CellVariant::CartSynnotch {
                return Err(CellError::configuration(
                    "processes.circuit",
                    format!("{} cells carry no synNotch circuit", population.class.name()),
                ));
            }
            plan.circuit = Some(v.parse()?);
        }
        if let Some(v) = &versions.quorum {
            let version: QuorumVersion = v.parse()?;
            let fits = match version {
                QuorumVersion::Source => population.class == CellVariant::CartSynnotch,
                QuorumVersion::Sink => population.class.is_effector(),
            };
            if !fits {
                return Err(CellError::configuration(
                    "processes.quorum",
                    format!("{} cells cannot act as an auxin {:?}", population.class.name(), version),
                ));
            }
            plan.quorum = Some(version);
        }
        plan.chemotherapy = versions.chemotherapy;
        Ok(plan)
    }

    pub fn defaults(class: CellVariant) -> Self {
        let (metabolism, signaling, inflammation, circuit) = match class {
            CellVariant::Tissue | CellVariant::Cancer | CellVariant::CancerStem => {
                (MetabolismVersion::Complex, Some(SignalingVersion::Simple), None, None)
            }
            CellVariant::CartCd4 => (MetabolismVersion::Cart, None, Some(InflammationVersion::Cd4), None),
            CellVariant::CartCd8 => (MetabolismVersion::Cart, None, Some(InflammationVersion::Cd8), None),
            CellVariant::CartSynnotch => (
                MetabolismVersion::Cart,
                None,
                Some(InflammationVersion::Cd8),
                Some(CircuitKind::Combinatorial),
            ),
            CellVariant::Random => (MetabolismVersion::Random, None, None, None),
        };
        ProcessPlan { metabolism: Some(metabolism), signaling, inflammation, circuit, quorum: None, chemotherapy: false }
    }
}

#[derive(Debug, Clone)]
pub struct PopulationTemplate {
    pub name: String,
    pub variant: CellVariant,
    pub init: u32,
    pub plan: ProcessPlan,
    specs: BTreeMap<String, ParameterSpec>,
}

impl PopulationTemplate {
    /// The parameter set an average member of the population would get.
    pub fn mean_parameters(&self) -> Parameters {
        let mut params = Parameters::with_defaults();
        for (key, spec) in &self.specs {
            params.insert(key.clone(), spec.mean());
        }
        params
    }
}

/// Creates agents for every configured population.
#[derive(Debug, Clone)]
pub struct CellFactory {
    templates: Vec<PopulationTemplate>,
}

impl CellFactory {
    /// Resolves every population and checks that an average member can be built.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let mut templates = Vec::with_capacity(config.populations.len());
        for population in &config.populations {
            let plan = ProcessPlan::for_population(population)
                .with_context(|| format!("population '{}'", population.name))?;
            let defaults = Parameters::with_defaults();
            for key in population.parameters.keys() {
                if !defaults.contains(key) {
                    warn!("Population '{}' sets unknown parameter '{}'.", population.name, key);
                }
            }
            debug!("Population '{}' resolved to {:?}.", population.name, plan);
            templates.push(PopulationTemplate {
                name: population.name.clone(),
                variant: population.class,
                init: population.init,
                plan,
                specs: population.parameters.clone(),
            });
        }
        let factory = CellFactory { templates };
        for (index, template) in factory.templates.iter().enumerate() {
            let mean = template.mean_parameters();
            let probe = CellContainer::seed(AgentId(0), index, &mean)
                .map_err(anyhow::Error::from)
                .and_then(|container| factory.build(&container, Location::CENTER, mean))
                .with_context(|| format!("population '{}' cannot be built", template.name))?;
            debug!("Population '{}' probe has capabilities {:?}.", template.name, probe.capabilities);
        }
        Ok(factory)
    }

    pub fn templates(&self) -> &[PopulationTemplate] {
        &self.templates
    }

    pub fn template(&self, population: usize) -> Result<&PopulationTemplate> {
        self.templates.get(population).ok_or_else(|| anyhow!("no population with index {}", population))
    }

    /// Draws one agent's parameters: defaults, overridden by the population's
    /// constants and by normal draws (truncated at zero) for distributions.
    pub fn sample_parameters<R: Rng + ?Sized>(&self, population: usize, rng: &mut R) -> Result<Parameters> {
        let template = self.template(population)?;
        let mut params = Parameters::with_defaults();
        for (key, spec) in &template.specs {
            let value = match *spec {
                ParameterSpec::Constant(value) => value,
                ParameterSpec::Distribution { mu, sigma } => {
                    let normal = Normal::new(mu, sigma)
                        .map_err(|e| anyhow!("parameter '{}' has an invalid distribution: {}", key, e))?;
                    normal.sample(rng).max(0.0)
                }
            };
            params.insert(key.clone(), value);
        }
        Ok(params)
    }

    /// Instantiates an agent from a container at `location` with the given parameters.
    pub fn build(&self, container: &CellContainer, location: Location, parameters: Parameters) -> Result<CellAgent> {
        let template = self.template(container.population)?;
        let plan = template.plan;

        let mut core = CellCore::new(container.id, location, container.state, container.volume)?;
        core.height = container.height;
        core.critical_volume = container.critical_volume;
        core.critical_height = container.critical_height;

        let mut agent = CellAgent::assemble(
            core,
            container.parent,
            container.population,
            template.variant,
            container.age,
            container.divisions,
            container.cycles.clone(),
            parameters,
        )?;

        let volume = agent.volume();
        let params = &agent.parameters;
        let mut capabilities = Capabilities::empty();
        let mut processes = ProcessSet::default();
        if let Some(version) = plan.metabolism {
            processes.metabolism = Some(Metabolism::new(version, params, volume)?);
            capabilities.insert(Capabilities::METABOLIZING);
        }
        if let Some(version) = plan.signaling {
            processes.signaling = Some(Signaling::new(version, params, volume)?);
            capabilities.insert(Capabilities::SIGNALING);
        }
        if let Some(version) = plan.inflammation {
            processes.inflammation = Some(Inflammation::new(version, params)?);
        }
        if let Some(version) = plan.quorum {
            processes.quorum = Some(QuorumSensing::new(version, params)?);
            capabilities.insert(Capabilities::QUORUM);
        }
        if plan.chemotherapy {
            processes.chemotherapy = Some(Chemotherapy::new(params)?);
        }
        if template.variant.is_effector() {
            let circuit = match plan.circuit {
                Some(kind) => {
                    capabilities.insert(Capabilities::SYNNOTCH);
                    Some(SynNotchCircuit::new(kind, params)?)
                }
                None => None,
            };
            agent.effector = Some(EffectorState::new(BindingParameters::from_parameters(params)?, circuit));
            capabilities.insert(Capabilities::BINDING);
        }
        agent.processes = processes;
        agent.capabilities = capabilities;
        Ok(agent)
    }

    /// Places every population's initial agents, filling patches from the center outward.
    pub fn populate<R: Rng + ?Sized>(&self, grid: &mut PatchGrid, rng: &mut R) -> Result<()> {
        let mut sites = grid.geometry().locations();
        sites.shuffle(rng);
        sites.sort_by_key(|loc| loc.radius());

        for (population, template) in self.templates.iter().enumerate() {
            let mut placed = 0;
            for _ in 0..template.init {
                let parameters = self.sample_parameters(population, rng)?;
                let container = CellContainer::seed(grid.next_id(), population, &parameters)?;
                let Some(site) = sites
                    .iter()
                    .copied()
                    .find(|site| grid.fits(*site, container.volume, 0.0, container.critical_height))
                else {
                    warn!(
                        "Grid is full; placed {} of {} '{}' cells.",
                        placed, template.init, template.name
                    );
                    break;
                };
                let agent = container.convert(self, site, rng, Some(&parameters))?;
                grid.add(agent);
                placed += 1;
            }
            info!("Placed {} '{}' cells ({}).", placed, template.name, template.variant.name());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_common::ProcessVersions;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn population(class: CellVariant) -> PopulationConfig {
        PopulationConfig {
            name: "test".to_string(),
            class,
            init: 1,
            processes: ProcessVersions::default(),
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn class_defaults() {
        let plan = ProcessPlan::for_population(&population(CellVariant::CartCd4)).unwrap();
        assert_eq!(plan.metabolism, Some(MetabolismVersion::Cart));
        assert_eq!(plan.inflammation, Some(InflammationVersion::Cd4));
        assert_eq!(plan.signaling, None);
        let plan = ProcessPlan::for_population(&population(CellVariant::Tissue)).unwrap();
        assert_eq!(plan.signaling, Some(SignalingVersion::Simple));
    }

    #[test]
    fn unknown_version_is_a_configuration_error() {
        let mut pop = population(CellVariant::Tissue);
        pop.processes.signaling = Some("huge".to_string());
        assert!(matches!(ProcessPlan::for_population(&pop), Err(CellError::Configuration { .. })));
    }

    #[test]
    fn circuit_requires_synnotch_class() {
        let mut pop = population(CellVariant::CartCd8);
        pop.processes.circuit = Some("inducible".to_string());
        assert!(ProcessPlan::for_population(&pop).is_err());
    }

    #[test]
    fn quorum_roles_follow_the_class() {
        let mut pop = population(CellVariant::CartCd8);
        pop.processes.quorum = Some("sink".to_string());
        assert_eq!(ProcessPlan::for_population(&pop).unwrap().quorum, Some(QuorumVersion::Sink));
        pop.processes.quorum = Some("source".to_string());
        assert!(ProcessPlan::for_population(&pop).is_err(), "sources need a synNotch circuit");
        let mut pop = population(CellVariant::Cancer);
        pop.processes.quorum = Some("sink".to_string());
        assert!(ProcessPlan::for_population(&pop).is_err(), "tissue cells carry no CARs");
        assert_eq!(ProcessPlan::defaults(CellVariant::CartSynnotch).quorum, None);
    }

    #[test]
    fn distributions_are_truncated_at_zero() {
        let mut pop = population(CellVariant::Tissue);
        pop.parameters.insert("NECROTIC_FRACTION".to_string(), ParameterSpec::Distribution { mu: 0.0, sigma: 1.0 });
        let factory = CellFactory {
            templates: vec![PopulationTemplate {
                name: pop.name.clone(),
                variant: pop.class,
                init: 1,
                plan: ProcessPlan::for_population(&pop).unwrap(),
                specs: pop.parameters.clone(),
            }],
        };
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let params = factory.sample_parameters(0, &mut rng).unwrap();
            assert!(params.get("NECROTIC_FRACTION").unwrap() >= 0.0);
        }
    }
}

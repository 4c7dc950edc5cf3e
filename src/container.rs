//! Immutable agent snapshots used to create, split and persist agents.

use crate::agent::factory::CellFactory;
use crate::agent::CellAgent;
use crate::env::{AgentId, Location};
use anyhow::Result;
use cellsim_common::{CellError, CellState, Parameters};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellContainer {
    pub id: AgentId,
    pub parent: Option<AgentId>,
    pub population: usize,
    pub age: u64,
    pub divisions: u32,
    pub state: CellState,
    pub volume: f64,
    pub height: f64,
    pub critical_volume: f64,
    pub critical_height: f64,
    pub cycles: Vec<u64>,
}

impl CellContainer {
    /// Container for a freshly seeded agent in the UNDEFINED state.
    pub fn seed(id: AgentId, population: usize, parameters: &Parameters) -> Result<Self, CellError> {
        let volume = parameters.get_positive("CELL_VOLUME")?;
        let height = parameters.get_positive("CELL_HEIGHT")?;
        Ok(CellContainer {
            id,
            parent: None,
            population,
            age: 0,
            divisions: parameters.get_count("DIVISION_POTENTIAL")? as u32,
            state: CellState::Undefined,
            volume,
            height,
            critical_volume: volume,
            critical_height: height,
            cycles: Vec::new(),
        })
    }

    pub fn from_agent(agent: &CellAgent) -> Self {
        CellContainer {
            id: agent.id(),
            parent: agent.parent,
            population: agent.population,
            age: agent.age,
            divisions: agent.divisions,
            state: agent.state(),
            volume: agent.volume(),
            height: agent.core.height,
            critical_volume: agent.core.critical_volume,
            critical_height: agent.core.critical_height,
            cycles: agent.cycles.clone(),
        }
    }

    /// Instantiates the agent at `location`.
    ///
    /// With `overrides` the agent reuses those parameters exactly; otherwise a
    /// fresh set is drawn from the population's template.
    pub fn convert<R: Rng + ?Sized>(
        &self,
        factory: &CellFactory,
        location: Location,
        rng: &mut R,
        overrides: Option<&Parameters>,
    ) -> Result<CellAgent> {
        let parameters = match overrides {
            Some(params) => params.clone(),
            None => factory.sample_parameters(self.population, rng)?,
        };
        factory.build(self, location, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_common::SimulationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CONFIG: &str = r#"
        [timing]
        total_ticks = 10

        [initial_conditions]
        seed = 1

        [[populations]]
        name = "tumor"
        class = "cancer"
        init = 1

        [output]
        base_filename = "out"
    "#;

    #[test]
    fn convert_then_snapshot_preserves_fields() {
        let config = SimulationConfig::from_toml_str(CONFIG).unwrap();
        let factory = CellFactory::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let container = CellContainer {
            id: AgentId(9),
            parent: Some(AgentId(4)),
            population: 0,
            age: 120,
            divisions: 7,
            state: CellState::Quiescent,
            volume: 1800.0,
            height: 8.0,
            critical_volume: 2000.0,
            critical_height: 9.0,
            cycles: vec![900, 1100],
        };
        let agent = container.convert(&factory, Location::new(1, -1), &mut rng, None).unwrap();
        assert_eq!(agent.location(), Location::new(1, -1));
        assert_eq!(CellContainer::from_agent(&agent), container);
    }

    #[test]
    fn overrides_are_used_verbatim() {
        let config = SimulationConfig::from_toml_str(CONFIG).unwrap();
        let factory = CellFactory::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut params = Parameters::with_defaults();
        params.insert("NECROTIC_FRACTION", 0.125);
        let container = CellContainer::seed(AgentId(1), 0, &params).unwrap();
        let agent = container.convert(&factory, Location::CENTER, &mut rng, Some(&params)).unwrap();
        assert_eq!(agent.settings.necrotic_fraction, 0.125);
    }

    #[test]
    fn illegal_state_for_class_is_rejected() {
        let config = SimulationConfig::from_toml_str(CONFIG).unwrap();
        let factory = CellFactory::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let params = Parameters::with_defaults();
        let mut container = CellContainer::seed(AgentId(1), 0, &params).unwrap();
        container.state = CellState::Cytotoxic;
        let err = container.convert(&factory, Location::CENTER, &mut rng, None).unwrap_err();
        assert!(matches!(err.downcast_ref::<CellError>(), Some(CellError::InvariantViolation(_))));
    }
}

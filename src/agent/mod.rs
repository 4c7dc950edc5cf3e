//! The cell agent: identity, physical state, owned processes and the active module.

pub mod factory;
pub mod transition;

use crate::binding::EffectorState;
use crate::context::StepContext;
use crate::env::{AgentId, Location};
use crate::module::{Module, ModuleOutcome, ModuleParameters};
use crate::process::ProcessSet;
use anyhow::Result;
use cellsim_common::{CellError, CellState, CellVariant, Parameters};
use log::trace;
use serde_json::{json, Value};

/// Behavioral capabilities of an agent, derived from its variant and processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const METABOLIZING: Capabilities = Capabilities(1);
    pub const SIGNALING: Capabilities = Capabilities(1 << 1);
    pub const BINDING: Capabilities = Capabilities(1 << 2);
    pub const SYNNOTCH: Capabilities = Capabilities(1 << 3);
    pub const QUORUM: Capabilities = Capabilities(1 << 4);

    pub fn empty() -> Self {
        Capabilities(0)
    }

    pub fn insert(&mut self, other: Capabilities) {
        self.0 |= other.0;
    }

    pub fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Physical state shared with the processes while they step.
#[derive(Debug, Clone, PartialEq)]
pub struct CellCore {
    pub id: AgentId,
    pub location: Location,
    state: CellState,
    volume: f64,
    pub height: f64,
    pub critical_volume: f64,
    pub critical_height: f64,
    pub energy: f64,
    /// Set by signaling when the fold change calls for migration.
    pub migratory: bool,
    /// Antigen-induced activation of immune effectors.
    pub activated: bool,
    /// Set by metabolism once mass reaches twice the critical mass.
    pub doubled: bool,
}

impl CellCore {
    pub fn new(id: AgentId, location: Location, state: CellState, volume: f64) -> Result<Self, CellError> {
        let mut core = CellCore {
            id,
            location,
            state,
            volume: 1.0,
            height: 0.0,
            critical_volume: volume,
            critical_height: 0.0,
            energy: 0.0,
            migratory: false,
            activated: false,
            doubled: false,
        };
        core.set_volume(volume)?;
        Ok(core)
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<(), CellError> {
        if !(volume > 0.0) || !volume.is_finite() {
            return Err(CellError::invariant(format!("cell {} volume must be positive, got {}", self.id, volume)));
        }
        self.volume = volume;
        Ok(())
    }
}

/// Cell-level thresholds sampled once per agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSettings {
    pub apoptosis_age: u64,
    pub division_potential: u32,
    /// Effective energy threshold, the negated ENERGY_THRESHOLD parameter.
    pub energy_threshold: f64,
    pub necrotic_fraction: f64,
    pub senescent_fraction: f64,
}

impl CellSettings {
    pub fn from_parameters(params: &Parameters) -> Result<Self, CellError> {
        Ok(CellSettings {
            apoptosis_age: params.get_count("APOPTOSIS_AGE")?,
            division_potential: params.get_count("DIVISION_POTENTIAL")? as u32,
            energy_threshold: -params.get("ENERGY_THRESHOLD")?,
            necrotic_fraction: params.get_fraction("NECROTIC_FRACTION")?,
            senescent_fraction: params.get_fraction("SENESCENT_FRACTION")?,
        })
    }
}

/// Ligands displayed by tissue agents for effector receptors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AntigenPools {
    pub car: f64,
    pub self_targets: f64,
    pub synnotch: f64,
}

#[derive(Debug, Clone)]
pub struct CellAgent {
    pub core: CellCore,
    pub parent: Option<AgentId>,
    pub population: usize,
    pub variant: CellVariant,
    pub capabilities: Capabilities,
    pub age: u64,
    pub divisions: u32,
    pub cycles: Vec<u64>,
    pub last_division_age: u64,
    pub parameters: Parameters,
    pub settings: CellSettings,
    pub module_params: ModuleParameters,
    pub processes: ProcessSet,
    module: Option<Module>,
    state_epoch: u64,
    pub effector: Option<EffectorState>,
    /// Effector currently engaged with this agent.
    pub bound_by: Option<AgentId>,
    /// True while an engaging effector holds this agent quiescent.
    pub held: bool,
    pub antigens: AntigenPools,
}

impl CellAgent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        core: CellCore,
        parent: Option<AgentId>,
        population: usize,
        variant: CellVariant,
        age: u64,
        divisions: u32,
        cycles: Vec<u64>,
        parameters: Parameters,
    ) -> Result<Self, CellError> {
        let settings = CellSettings::from_parameters(&parameters)?;
        let module_params = ModuleParameters::from_parameters(&parameters)?;
        let antigens = AntigenPools {
            car: parameters.get_non_negative("CAR_ANTIGENS")?,
            self_targets: parameters.get_non_negative("SELF_TARGETS")?,
            synnotch: parameters.get_non_negative("SYNNOTCH_ANTIGENS")?,
        };
        let state = core.state();
        if !Self::is_legal(variant, state) {
            return Err(CellError::invariant(format!("state {} is not legal for {} cells", state, variant.name())));
        }
        let mut agent = CellAgent {
            core,
            parent,
            population,
            variant,
            capabilities: Capabilities::empty(),
            age,
            divisions,
            cycles,
            last_division_age: age,
            parameters,
            settings,
            module_params,
            processes: ProcessSet::default(),
            module: None,
            state_epoch: 0,
            effector: None,
            bound_by: None,
            held: false,
            antigens,
        };
        agent.module = Module::for_state(state, &agent.module_params);
        Ok(agent)
    }

    pub fn id(&self) -> AgentId {
        self.core.id
    }

    pub fn location(&self) -> Location {
        self.core.location
    }

    pub fn state(&self) -> CellState {
        self.core.state()
    }

    pub fn volume(&self) -> f64 {
        self.core.volume()
    }

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    pub fn is_effector(&self) -> bool {
        self.variant.is_effector()
    }

    pub fn is_legal(variant: CellVariant, state: CellState) -> bool {
        variant.is_effector() || state.is_core()
    }

    /// Changes state and installs the module that belongs to it.
    ///
    /// Terminal states absorb every later assignment.
    pub fn set_state(&mut self, state: CellState) -> Result<(), CellError> {
        let current = self.core.state;
        if current.is_terminal() {
            if state != current {
                trace!("cell {} ignores {} -> {}", self.id(), current, state);
            }
            return Ok(());
        }
        if !Self::is_legal(self.variant, state) {
            return Err(CellError::invariant(format!(
                "cell {} cannot enter {} as a {} cell",
                self.id(),
                state,
                self.variant.name()
            )));
        }
        trace!("cell {} {} -> {}", self.id(), current, state);
        self.core.state = state;
        self.module = Module::for_state(state, &self.module_params);
        self.state_epoch += 1;
        Ok(())
    }

    /// Advances the agent by one tick.
    pub fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        transition::step(self, ctx)
    }

    /// Steps the active module, keeping it unless the step changed state.
    pub(crate) fn step_module(&mut self, ctx: &mut StepContext<'_>) -> Result<ModuleOutcome> {
        let Some(mut module) = self.module.take() else {
            return Ok(ModuleOutcome::Continue);
        };
        let epoch = self.state_epoch;
        let outcome = module.step(self, ctx)?;
        if self.state_epoch == epoch && outcome == ModuleOutcome::Continue {
            self.module = Some(module);
        }
        Ok(outcome)
    }

    /// Ticks elapsed since the last division (or since creation).
    pub fn current_cycle(&self) -> u64 {
        self.age.saturating_sub(self.last_division_age)
    }

    /// Compact array form: `[variant, population, state, [x, y], volume, [cycles...]]`.
    pub fn to_json(&self) -> Value {
        let loc = self.location();
        json!([
            self.variant.code(),
            self.population,
            self.state().code(),
            [loc.x, loc.y],
            self.volume(),
            self.cycles,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_volume_is_an_invariant_violation() {
        let mut core = CellCore::new(AgentId(1), Location::CENTER, CellState::Undefined, 100.0).unwrap();
        assert!(matches!(core.set_volume(0.0), Err(CellError::InvariantViolation(_))));
        assert!(matches!(core.set_volume(f64::NAN), Err(CellError::InvariantViolation(_))));
        assert_eq!(core.volume(), 100.0);
    }

    #[test]
    fn capabilities_combine() {
        let mut caps = Capabilities::empty();
        caps.insert(Capabilities::METABOLIZING);
        caps.insert(Capabilities::BINDING);
        assert!(caps.contains(Capabilities::BINDING));
        assert!(!caps.contains(Capabilities::SYNNOTCH));
    }

    #[test]
    fn negated_energy_threshold() {
        let mut params = Parameters::with_defaults();
        params.insert("ENERGY_THRESHOLD", -100.0);
        assert_eq!(CellSettings::from_parameters(&params).unwrap().energy_threshold, 100.0);
    }
}

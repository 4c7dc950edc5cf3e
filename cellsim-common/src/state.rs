use crate::error::CellError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physiological state of a cell agent.
///
/// The first seven variants are shared by every cell class; the remaining
/// ones are only legal for immune-effector classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellState {
    Undefined,
    Proliferative,
    Migratory,
    Senescent,
    Apoptotic,
    Necrotic,
    Quiescent,
    Cytotoxic,
    Stimulatory,
    Exhausted,
    Anergic,
    Starved,
    Paused,
}

impl CellState {
    pub const ALL: [CellState; 13] = [
        CellState::Undefined,
        CellState::Proliferative,
        CellState::Migratory,
        CellState::Senescent,
        CellState::Apoptotic,
        CellState::Necrotic,
        CellState::Quiescent,
        CellState::Cytotoxic,
        CellState::Stimulatory,
        CellState::Exhausted,
        CellState::Anergic,
        CellState::Starved,
        CellState::Paused,
    ];

    pub const CORE: [CellState; 7] = [
        CellState::Undefined,
        CellState::Proliferative,
        CellState::Migratory,
        CellState::Senescent,
        CellState::Apoptotic,
        CellState::Necrotic,
        CellState::Quiescent,
    ];

    /// Numeric code used by the compact cell serialization.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, CellError> {
        CellState::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| CellError::invariant(format!("unknown cell state code {}", code)))
    }

    pub fn name(self) -> &'static str {
        match self {
            CellState::Undefined => "UNDEFINED",
            CellState::Proliferative => "PROLIFERATIVE",
            CellState::Migratory => "MIGRATORY",
            CellState::Senescent => "SENESCENT",
            CellState::Apoptotic => "APOPTOTIC",
            CellState::Necrotic => "NECROTIC",
            CellState::Quiescent => "QUIESCENT",
            CellState::Cytotoxic => "CYTOTOXIC",
            CellState::Stimulatory => "STIMULATORY",
            CellState::Exhausted => "EXHAUSTED",
            CellState::Anergic => "ANERGIC",
            CellState::Starved => "STARVED",
            CellState::Paused => "PAUSED",
        }
    }

    /// Dying states; the agent is removed once its module finishes.
    pub fn is_terminal(self) -> bool {
        matches!(self, CellState::Apoptotic | CellState::Necrotic)
    }

    pub fn is_core(self) -> bool {
        CellState::CORE.contains(&self)
    }

    /// States from which the per-tick protocol resolves a new outgoing transition.
    pub fn is_resolvable(self) -> bool {
        matches!(self, CellState::Undefined | CellState::Paused | CellState::Quiescent)
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CellState {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        CellState::ALL
            .iter()
            .copied()
            .find(|state| state.name() == upper)
            .ok_or_else(|| CellError::invariant(format!("unknown cell state '{}'", s)))
    }
}

/// Receptor engagement status of an immune-effector agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingFlag {
    #[default]
    Unbound,
    BoundAntigen,
    BoundCellReceptor,
    BoundAntigenCellReceptor,
}

impl BindingFlag {
    pub fn from_parts(antigen: bool, self_receptor: bool) -> Self {
        match (antigen, self_receptor) {
            (false, false) => BindingFlag::Unbound,
            (true, false) => BindingFlag::BoundAntigen,
            (false, true) => BindingFlag::BoundCellReceptor,
            (true, true) => BindingFlag::BoundAntigenCellReceptor,
        }
    }

    pub fn has_antigen(self) -> bool {
        matches!(self, BindingFlag::BoundAntigen | BindingFlag::BoundAntigenCellReceptor)
    }

    pub fn has_self_receptor(self) -> bool {
        matches!(self, BindingFlag::BoundCellReceptor | BindingFlag::BoundAntigenCellReceptor)
    }

    /// Drops the antigen engagement and keeps any self-receptor engagement.
    pub fn without_antigen(self) -> Self {
        BindingFlag::from_parts(false, self.has_self_receptor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_for_every_state() {
        for state in CellState::ALL {
            assert_eq!(CellState::from_code(state.code()), Ok(state));
        }
    }

    #[test]
    fn unknown_code_is_an_invariant_violation() {
        match CellState::from_code(42) {
            Err(CellError::InvariantViolation(msg)) => assert!(msg.contains("42")),
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("quiescent".parse::<CellState>(), Ok(CellState::Quiescent));
        assert!("zombie".parse::<CellState>().is_err());
    }

    #[test]
    fn binding_flag_parts() {
        let both = BindingFlag::from_parts(true, true);
        assert!(both.has_antigen() && both.has_self_receptor());
        assert_eq!(both.without_antigen(), BindingFlag::BoundCellReceptor);
        assert_eq!(BindingFlag::default(), BindingFlag::Unbound);
    }
}

//! Error categories raised by the cell behavior engine.
//!
//! Most call sites return `anyhow::Result`; these variants travel inside the
//! `anyhow::Error` so callers and tests can downcast when the category matters.

use std::error::Error;
use std::fmt;

/// Errors that can occur while building or stepping cell agents.
#[derive(Debug, Clone, PartialEq)]
pub enum CellError {
    /// A required parameter is missing or unusable, or a class/version name is unknown.
    Configuration { key: String, reason: String },
    /// A state or physical quantity left its legal domain.
    InvariantViolation(String),
    /// An agent tried to act on a bound target that is no longer in the grid.
    StaleReference { agent: u32, target: u32 },
}

impl CellError {
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CellError::Configuration { key: key.into(), reason: reason.into() }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        CellError::InvariantViolation(message.into())
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellError::Configuration { key, reason } => {
                write!(f, "Configuration error for '{}': {}", key, reason)
            }
            CellError::InvariantViolation(msg) => write!(f, "Invariant violation: {}", msg),
            CellError::StaleReference { agent, target } => {
                write!(f, "Stale reference: agent {} is bound to removed agent {}", agent, target)
            }
        }
    }
}

impl Error for CellError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_key() {
        let err = CellError::configuration("metabolism/BASAL_ENERGY", "missing");
        assert_eq!(
            err.to_string(),
            "Configuration error for 'metabolism/BASAL_ENERGY': missing"
        );
    }

    #[test]
    fn survives_a_round_trip_through_anyhow() {
        let err: anyhow::Error = CellError::invariant("volume -1").into();
        let back = err.downcast_ref::<CellError>();
        assert_eq!(back, Some(&CellError::InvariantViolation("volume -1".to_string())));
    }
}

//! Per-agent biochemical processes and the shared split contract.

pub mod chemotherapy;
pub mod inflammation;
pub mod metabolism;
pub mod quorum_sensing;
pub mod signaling;
pub mod solver;

use crate::agent::CellCore;
use crate::context::StepContext;
use anyhow::Result;
use std::fmt;

pub use chemotherapy::Chemotherapy;
pub use inflammation::{Inflammation, InflammationVersion};
pub use metabolism::{Metabolism, MetabolismVersion};
pub use quorum_sensing::{QuorumSensing, QuorumVersion, ReceptorSignal};
pub use signaling::{Signaling, SignalingVersion};

/// Accumulators smaller than this are treated as exactly zero.
pub const SNAP_EPSILON: f64 = 1e-10;

pub(crate) fn snap(value: f64) -> f64 {
    if value.abs() < SNAP_EPSILON {
        0.0
    } else {
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessDomain {
    Metabolism,
    Signaling,
    Inflammation,
    QuorumSensing,
    Chemotherapy,
}

impl fmt::Display for ProcessDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessDomain::Metabolism => "metabolism",
            ProcessDomain::Signaling => "signaling",
            ProcessDomain::Inflammation => "inflammation",
            ProcessDomain::QuorumSensing => "quorum_sensing",
            ProcessDomain::Chemotherapy => "chemotherapy",
        };
        f.write_str(name)
    }
}

/// A named vector of internal quantities that divides with its cell.
pub trait Process {
    fn domain(&self) -> ProcessDomain;

    /// Tracked internal pools as `(name, amount)` pairs.
    fn pools(&self) -> Vec<(&'static str, f64)>;

    /// Moves fraction `fraction` of every pool into a new daughter instance;
    /// `self` keeps the remaining `1 - fraction`.
    fn split(&mut self, fraction: f64) -> Self
    where
        Self: Sized;
}

/// Processes owned by one agent, at most one per domain.
#[derive(Debug, Clone, Default)]
pub struct ProcessSet {
    pub metabolism: Option<Metabolism>,
    pub signaling: Option<Signaling>,
    pub inflammation: Option<Inflammation>,
    pub quorum: Option<QuorumSensing>,
    pub chemotherapy: Option<Chemotherapy>,
}

impl ProcessSet {
    pub fn domains(&self) -> Vec<ProcessDomain> {
        let mut out = Vec::new();
        if self.metabolism.is_some() {
            out.push(ProcessDomain::Metabolism);
        }
        if self.signaling.is_some() {
            out.push(ProcessDomain::Signaling);
        }
        if self.inflammation.is_some() {
            out.push(ProcessDomain::Inflammation);
        }
        if self.quorum.is_some() {
            out.push(ProcessDomain::QuorumSensing);
        }
        if self.chemotherapy.is_some() {
            out.push(ProcessDomain::Chemotherapy);
        }
        out
    }

    /// Every tracked pool, keyed by domain and pool name.
    pub fn pools(&self) -> Vec<(ProcessDomain, &'static str, f64)> {
        fn tag<P: Process>(p: &P) -> Vec<(ProcessDomain, &'static str, f64)> {
            p.pools().into_iter().map(|(name, v)| (p.domain(), name, v)).collect()
        }
        let mut out = Vec::new();
        if let Some(p) = &self.metabolism {
            out.extend(tag(p));
        }
        if let Some(p) = &self.signaling {
            out.extend(tag(p));
        }
        if let Some(p) = &self.inflammation {
            out.extend(tag(p));
        }
        if let Some(p) = &self.quorum {
            out.extend(tag(p));
        }
        if let Some(p) = &self.chemotherapy {
            out.extend(tag(p));
        }
        out
    }

    /// Splits every process; the returned set belongs to the daughter.
    pub fn split(&mut self, fraction: f64) -> ProcessSet {
        ProcessSet {
            metabolism: self.metabolism.as_mut().map(|p| p.split(fraction)),
            signaling: self.signaling.as_mut().map(|p| p.split(fraction)),
            inflammation: self.inflammation.as_mut().map(|p| p.split(fraction)),
            quorum: self.quorum.as_mut().map(|p| p.split(fraction)),
            chemotherapy: self.chemotherapy.as_mut().map(|p| p.split(fraction)),
        }
    }

    /// Steps metabolism, feeding it the lagged IL-2 signal when inflammation is present.
    pub fn step_metabolism(&mut self, cell: &mut CellCore, ctx: &mut StepContext<'_>) -> Result<()> {
        let Some(metabolism) = self.metabolism.as_mut() else {
            return Ok(());
        };
        let feedback = match (metabolism.switch_delay(), self.inflammation.as_ref()) {
            (Some(delay), Some(inflammation)) => Some(inflammation.feedback(delay)),
            _ => None,
        };
        metabolism.step(cell, feedback, ctx)
    }

    /// Steps signaling with the current internal glucose.
    pub fn step_signaling(&mut self, cell: &mut CellCore, ctx: &mut StepContext<'_>) -> Result<()> {
        let glucose = self.metabolism.as_ref().map_or(0.0, |m| m.glucose());
        if let Some(signaling) = self.signaling.as_mut() {
            signaling.step(cell, glucose, ctx);
        }
        Ok(())
    }

    pub fn step_inflammation(&mut self, cell: &CellCore, ctx: &mut StepContext<'_>) -> Result<()> {
        if let Some(inflammation) = self.inflammation.as_mut() {
            inflammation.step(cell, ctx)?;
        }
        Ok(())
    }

    pub fn step_quorum(&mut self, cell: &mut CellCore, signal: ReceptorSignal, ctx: &mut StepContext<'_>) -> Result<()> {
        if let Some(quorum) = self.quorum.as_mut() {
            quorum.step(cell, signal, ctx)?;
        }
        Ok(())
    }

    /// Steps the drug process; true when the drug triggers apoptosis.
    pub fn step_chemotherapy(&mut self, cell: &CellCore, ctx: &mut StepContext<'_>) -> bool {
        match self.chemotherapy.as_mut() {
            Some(chemo) => chemo.step(cell, ctx),
            None => false,
        }
    }
}

//! TGFa/EGFR signaling networks that decide between migration and proliferation.
//!
//! Each tick the network is integrated over a 60 minute window with forward
//! Euler. The fold change of active PLCg across the window, compared with the
//! previous tick's fold change, sets the agent's migratory flag.

pub mod complex;
pub mod medium;
pub mod simple;

use super::solver;
use super::{Process, ProcessDomain};
use crate::agent::CellCore;
use crate::context::StepContext;
use crate::env::{Field, Lattice};
use cellsim_common::{CellError, Parameters};
use log::trace;
use std::str::FromStr;

/// Molecules per nM in a cell-sized volume.
pub const MOLEC_TO_NM: f64 = 1355.0;
/// Molecular weight of TGFa [kDa].
pub const TGFA_MW: f64 = 5.5;
/// Euler step [min].
pub const STEP_SIZE: f64 = 1.0;
/// Integration window per tick [min].
pub const WINDOW: f64 = 60.0;

const FOLD_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingVersion {
    Simple,
    Medium,
    Complex,
}

impl SignalingVersion {
    pub fn num_components(self) -> usize {
        match self {
            SignalingVersion::Simple => simple::NUM_COMPONENTS,
            SignalingVersion::Medium => medium::NUM_COMPONENTS,
            SignalingVersion::Complex => complex::NUM_COMPONENTS,
        }
    }

    pub fn names(self) -> &'static [&'static str] {
        match self {
            SignalingVersion::Simple => &simple::NAMES,
            SignalingVersion::Medium => &medium::NAMES,
            SignalingVersion::Complex => &complex::NAMES,
        }
    }

    fn indices(self) -> (usize, usize, usize) {
        match self {
            SignalingVersion::Simple => (simple::G_INT, simple::T_EXT, simple::P_ACTIVE),
            SignalingVersion::Medium => (medium::G_INT, medium::T_EXT, medium::P_ACTIVE),
            SignalingVersion::Complex => (complex::G_INT, complex::T_EXT, complex::P_ACTIVE),
        }
    }

    fn initial(self) -> Vec<f64> {
        match self {
            SignalingVersion::Simple => simple::initial(),
            SignalingVersion::Medium => medium::initial(),
            SignalingVersion::Complex => complex::initial(),
        }
    }

    fn derivatives(self) -> fn(f64, &[f64]) -> Vec<f64> {
        match self {
            SignalingVersion::Simple => simple::derivatives,
            SignalingVersion::Medium => medium::derivatives,
            SignalingVersion::Complex => complex::derivatives,
        }
    }
}

impl FromStr for SignalingVersion {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(SignalingVersion::Simple),
            "medium" => Ok(SignalingVersion::Medium),
            "complex" => Ok(SignalingVersion::Complex),
            other => Err(CellError::configuration(
                "processes.signaling",
                format!("unknown signaling version '{}'", other),
            )),
        }
    }
}

/// Ratio of the larger to the smaller value, guarded near zero.
pub fn fold_change(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    if hi < FOLD_EPSILON {
        return 1.0;
    }
    hi / lo.max(FOLD_EPSILON)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signaling {
    version: SignalingVersion,
    concs: Vec<f64>,
    volume: f64,
    previous_fold: f64,
    current_fold: f64,
    migratory_threshold: f64,
}

impl Signaling {
    pub fn new(version: SignalingVersion, params: &Parameters, volume: f64) -> Result<Self, CellError> {
        Ok(Signaling {
            version,
            concs: version.initial(),
            volume,
            previous_fold: 1.0,
            current_fold: 1.0,
            migratory_threshold: params.get_positive("signaling/MIGRATORY_THRESHOLD")?,
        })
    }

    /// Simple network started at its fixed point for `glucose` [fmol] inside `volume`.
    pub fn simple_at_steady_state(params: &Parameters, volume: f64, glucose: f64) -> Result<Self, CellError> {
        let mut signaling = Signaling::new(SignalingVersion::Simple, params, volume)?;
        signaling.concs = simple::steady_state(glucose / volume * 1e9);
        Ok(signaling)
    }

    pub fn version(&self) -> SignalingVersion {
        self.version
    }

    pub fn concentrations(&self) -> &[f64] {
        &self.concs
    }

    pub fn active_plcg(&self) -> f64 {
        self.concs[self.version.indices().2]
    }

    /// External TGFa the network currently holds, in lattice units.
    pub fn external_tgfa(&self) -> f64 {
        self.concs[self.version.indices().1] * TGFA_MW
    }

    /// Fold change of active PLCg over the last window.
    pub fn fold(&self) -> f64 {
        self.current_fold
    }

    pub fn step(&mut self, cell: &mut CellCore, glucose: f64, ctx: &mut StepContext<'_>) {
        let (g_int, t_ext, p_active) = self.version.indices();
        let loc = cell.location;
        self.volume = cell.volume();

        self.concs[g_int] = glucose / self.volume * 1e9;
        self.concs[t_ext] = ctx.lattice.average_value(Field::Tgfa, loc) / TGFA_MW;

        let pre = self.concs[p_active];
        self.concs = solver::euler(self.version.derivatives(), 0.0, &self.concs, WINDOW, STEP_SIZE);
        let post = self.concs[p_active];

        self.current_fold = fold_change(pre, post);
        let delta = fold_change(self.current_fold, self.previous_fold);
        cell.migratory = delta > self.migratory_threshold;
        self.previous_fold = self.current_fold;

        ctx.lattice.set_value(Field::Tgfa, loc, self.concs[t_ext] * TGFA_MW);
        trace!("cell {} signaling: fold {:.6} migratory {}", cell.id, self.current_fold, cell.migratory);
    }
}

impl Process for Signaling {
    fn domain(&self) -> ProcessDomain {
        ProcessDomain::Signaling
    }

    /// Amounts, i.e. concentrations scaled by the tracked cell volume.
    fn pools(&self) -> Vec<(&'static str, f64)> {
        self.version
            .names()
            .iter()
            .zip(&self.concs)
            .map(|(name, c)| (*name, c * self.volume))
            .collect()
    }

    /// Concentrations are inherited unchanged; the volume divides.
    fn split(&mut self, fraction: f64) -> Self {
        let mut daughter = self.clone();
        daughter.volume = self.volume * fraction;
        self.volume *= 1.0 - fraction;
        daughter
    }
}

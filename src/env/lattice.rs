use super::{Location, PatchGeometry};
use anyhow::Result;
use cellsim_common::{CellError, EnvironmentConfig};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Named extracellular molecule fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Glucose,
    Oxygen,
    Tgfa,
    Il2,
    Vegf,
    Drug,
    Auxin,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Glucose,
        Field::Oxygen,
        Field::Tgfa,
        Field::Il2,
        Field::Vegf,
        Field::Drug,
        Field::Auxin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Glucose => "glucose",
            Field::Oxygen => "oxygen",
            Field::Tgfa => "tgfa",
            Field::Il2 => "il2",
            Field::Vegf => "vegf",
            Field::Drug => "drug",
            Field::Auxin => "auxin",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CellError> {
        let lower = name.trim().to_ascii_lowercase();
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == lower)
            .ok_or_else(|| CellError::configuration(name, "unknown environment field"))
    }
}

/// Read/write access to per-patch molecule concentrations.
pub trait Lattice {
    /// Average concentration of `field` over the patch.
    fn average_value(&self, field: Field, loc: Location) -> f64;
    /// Total amount of `field` in the patch (average times patch volume).
    fn total_value(&self, field: Field, loc: Location) -> f64;
    /// Multiplies the patch concentration by `multiplier`.
    fn update_value(&mut self, field: Field, loc: Location, multiplier: f64);
    /// Overwrites the patch concentration.
    fn set_value(&mut self, field: Field, loc: Location, value: f64);
}

#[derive(Debug, Clone, Copy)]
struct FieldSource {
    source: f64,
    rate: f64,
}

/// Dense per-patch lattice with first-order relaxation toward a source value.
#[derive(Debug, Clone)]
pub struct PatchLattice {
    geometry: PatchGeometry,
    values: BTreeMap<Field, Vec<f64>>,
    sources: BTreeMap<Field, FieldSource>,
}

impl PatchLattice {
    pub fn new(geometry: PatchGeometry, config: &EnvironmentConfig) -> Result<Self> {
        let n = geometry.num_locations();
        let mut values = BTreeMap::new();
        let mut sources = BTreeMap::new();
        for field in Field::ALL {
            values.insert(field, vec![0.0; n]);
        }
        for (name, field_config) in &config.fields {
            let field = Field::from_name(name)?;
            values.insert(field, vec![field_config.initial; n]);
            if field_config.relaxation_rate > 0.0 {
                sources.insert(
                    field,
                    FieldSource { source: field_config.source_value(), rate: field_config.relaxation_rate },
                );
            }
            debug!(
                "Lattice field '{}' initialised at {} (relaxation {}).",
                name, field_config.initial, field_config.relaxation_rate
            );
        }
        Ok(PatchLattice { geometry, values, sources })
    }

    pub fn geometry(&self) -> &PatchGeometry {
        &self.geometry
    }

    /// Moves every replenished field a fixed fraction of the way back to its source value.
    pub fn relax(&mut self) {
        for (field, src) in &self.sources {
            if let Some(values) = self.values.get_mut(field) {
                for v in values.iter_mut() {
                    *v += src.rate * (src.source - *v);
                }
            }
        }
    }

    /// Maximum average concentration of `field` over `locs`.
    pub fn max_value(&self, field: Field, locs: &[Location]) -> f64 {
        locs.iter().map(|l| self.average_value(field, *l)).fold(0.0, f64::max)
    }

    /// Commits writes staged by one agent's tick.
    pub fn apply(&mut self, writes: LatticeWrites) {
        for ((field, idx), value) in writes.staged {
            if let Some(slot) = self.values.get_mut(&field).and_then(|v| v.get_mut(idx)) {
                *slot = value;
            }
        }
    }

    fn slot(&self, loc: Location) -> Option<usize> {
        self.geometry.index(loc)
    }
}

impl Lattice for PatchLattice {
    fn average_value(&self, field: Field, loc: Location) -> f64 {
        match (self.slot(loc), self.values.get(&field)) {
            (Some(idx), Some(values)) => values[idx],
            _ => 0.0,
        }
    }

    fn total_value(&self, field: Field, loc: Location) -> f64 {
        self.average_value(field, loc) * self.geometry.volume()
    }

    fn update_value(&mut self, field: Field, loc: Location, multiplier: f64) {
        let current = self.average_value(field, loc);
        self.set_value(field, loc, current * multiplier);
    }

    fn set_value(&mut self, field: Field, loc: Location, value: f64) {
        let Some(idx) = self.slot(loc) else {
            warn!("Ignoring write to {} outside the grid at {:?}.", field.name(), loc);
            return;
        };
        if let Some(slot) = self.values.get_mut(&field).and_then(|v| v.get_mut(idx)) {
            *slot = value.max(0.0);
        }
    }
}

/// Writes staged during one agent's tick, ready to be committed.
#[derive(Debug, Default)]
pub struct LatticeWrites {
    staged: BTreeMap<(Field, usize), f64>,
}

impl LatticeWrites {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// Read-through view of a [`PatchLattice`] that stages writes until the agent tick completes.
pub struct LatticeTransaction<'a> {
    base: &'a PatchLattice,
    writes: LatticeWrites,
}

impl<'a> LatticeTransaction<'a> {
    pub fn new(base: &'a PatchLattice) -> Self {
        LatticeTransaction { base, writes: LatticeWrites::default() }
    }

    pub fn geometry(&self) -> &PatchGeometry {
        self.base.geometry()
    }

    pub fn max_value(&self, field: Field, locs: &[Location]) -> f64 {
        locs.iter().map(|l| self.average_value(field, *l)).fold(0.0, f64::max)
    }

    pub fn into_writes(self) -> LatticeWrites {
        self.writes
    }
}

impl Lattice for LatticeTransaction<'_> {
    fn average_value(&self, field: Field, loc: Location) -> f64 {
        match self.base.slot(loc) {
            Some(idx) => match self.writes.staged.get(&(field, idx)) {
                Some(v) => *v,
                None => self.base.average_value(field, loc),
            },
            None => 0.0,
        }
    }

    fn total_value(&self, field: Field, loc: Location) -> f64 {
        self.average_value(field, loc) * self.base.geometry.volume()
    }

    fn update_value(&mut self, field: Field, loc: Location, multiplier: f64) {
        let current = self.average_value(field, loc);
        self.set_value(field, loc, current * multiplier);
    }

    fn set_value(&mut self, field: Field, loc: Location, value: f64) {
        if let Some(idx) = self.base.slot(loc) {
            self.writes.staged.insert((field, idx), value.max(0.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_common::FieldConfig;

    fn lattice() -> PatchLattice {
        let geometry = PatchGeometry { size: 30.0, height: 8.7, radius: 1 };
        let mut config = EnvironmentConfig::default();
        config.fields.insert("tgfa".to_string(), FieldConfig::constant(2.0, 0.0));
        PatchLattice::new(geometry, &config).unwrap()
    }

    #[test]
    fn transaction_reads_its_own_writes_but_base_is_untouched() {
        let base = lattice();
        let mut tx = LatticeTransaction::new(&base);
        tx.update_value(Field::Tgfa, Location::CENTER, 0.5);
        assert_eq!(tx.average_value(Field::Tgfa, Location::CENTER), 1.0);
        assert_eq!(base.average_value(Field::Tgfa, Location::CENTER), 2.0);
    }

    #[test]
    fn committed_writes_are_visible() {
        let mut base = lattice();
        let writes = {
            let mut tx = LatticeTransaction::new(&base);
            tx.set_value(Field::Il2, Location::new(1, 1), 3.0);
            tx.into_writes()
        };
        base.apply(writes);
        assert_eq!(base.average_value(Field::Il2, Location::new(1, 1)), 3.0);
    }

    #[test]
    fn dropped_transaction_discards_writes() {
        let base = lattice();
        {
            let mut tx = LatticeTransaction::new(&base);
            tx.set_value(Field::Glucose, Location::CENTER, 0.0);
        }
        assert_eq!(base.average_value(Field::Glucose, Location::CENTER), 0.005);
    }

    #[test]
    fn relaxation_moves_toward_source() {
        let mut base = lattice();
        base.set_value(Field::Oxygen, Location::CENTER, 0.0);
        base.relax();
        assert!((base.average_value(Field::Oxygen, Location::CENTER) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_field_name_is_a_configuration_error() {
        assert!(matches!(Field::from_name("plasma"), Err(CellError::Configuration { .. })));
    }
}

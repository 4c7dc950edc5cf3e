//! In-memory patch environment: locations, grid occupancy and molecule lattice.

pub mod grid;
pub mod lattice;

use cellsim_common::GridConfig;
use serde::{Deserialize, Serialize};

pub use grid::{AgentId, PatchGrid};
pub use lattice::{Field, Lattice, LatticeTransaction, LatticeWrites, PatchLattice};

/// A square patch on the grid, addressed relative to the center patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const CENTER: Location = Location { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Location { x, y }
    }

    /// Ring index of the patch: 0 for the center, 1 for the surrounding ring, ...
    pub fn radius(&self) -> i32 {
        self.x.abs().max(self.y.abs())
    }
}

/// Geometry shared by every patch of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchGeometry {
    pub size: f64,
    pub height: f64,
    pub radius: i32,
}

impl PatchGeometry {
    pub fn from_config(config: &GridConfig) -> Self {
        PatchGeometry {
            size: config.patch_size,
            height: config.patch_height,
            radius: config.radius as i32,
        }
    }

    pub fn area(&self) -> f64 {
        self.size * self.size
    }

    pub fn volume(&self) -> f64 {
        self.area() * self.height
    }

    /// Estimated perimeter of a cell occupying fraction `f` of the patch. A shared
    /// patch adds one inner wall segment.
    pub fn perimeter(&self, f: f64) -> f64 {
        f * 4.0 * self.size + if (f - 1.0).abs() < 1e-12 { 0.0 } else { self.size }
    }

    pub fn contains(&self, loc: Location) -> bool {
        loc.radius() <= self.radius
    }

    /// In-plane neighbors (up, down, right, left) that lie inside the grid.
    pub fn neighbors(&self, loc: Location) -> Vec<Location> {
        [(0, 1), (0, -1), (1, 0), (-1, 0)]
            .iter()
            .map(|(dx, dy)| Location::new(loc.x + dx, loc.y + dy))
            .filter(|n| self.contains(*n))
            .collect()
    }

    /// Every location of the grid in row-major order.
    pub fn locations(&self) -> Vec<Location> {
        let r = self.radius;
        let mut out = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for y in -r..=r {
            for x in -r..=r {
                out.push(Location::new(x, y));
            }
        }
        out
    }

    /// Dense index of a location, or `None` outside the grid.
    pub fn index(&self, loc: Location) -> Option<usize> {
        if !self.contains(loc) {
            return None;
        }
        let width = 2 * self.radius + 1;
        Some(((loc.y + self.radius) * width + (loc.x + self.radius)) as usize)
    }

    pub fn num_locations(&self) -> usize {
        let width = (2 * self.radius + 1) as usize;
        width * width
    }
}

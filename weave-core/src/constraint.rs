//! Position, layer and instance-count restrictions layered over the grid.
//!
//! Constraints prune possibilities once at initialization and are re-checked
//! whenever the solver commits a collapse.

use crate::grid::{Coord, Grid};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named restriction over where a set of tiles may appear and how often.
///
/// Field semantics:
/// - `required_positions` + `allowed_tiles`: cells at those positions are
///   pruned to the allowed set at init. With `exclusive`, the allowed tiles
///   may not be collapsed anywhere else.
/// - `forbidden_positions`: the deny set (`denied_tiles`, falling back to
///   `allowed_tiles` when empty) is pruned from those cells at init.
/// - `min_layer`/`max_layer`: the constraint's tile set is pruned from every
///   layer outside the band. Layers are indexed by the vertical (Y)
///   coordinate.
/// - `max_instances`: collapse-time cap over the constraint's tile set.
/// - `min_instances`: audited after the run; unmet minimums are reported,
///   not enforced mid-run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constraint {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub required_positions: Vec<Coord>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub forbidden_positions: Vec<Coord>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub allowed_tiles: Vec<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub denied_tiles: Vec<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exclusive: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_layer: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_layer: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_instances: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_instances: Option<u32>,
}

impl Constraint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The tile set this constraint restricts: the allow list, or the deny
    /// list when no allow list is given.
    fn tile_set(&self) -> &[usize] {
        if self.allowed_tiles.is_empty() {
            &self.denied_tiles
        } else {
            &self.allowed_tiles
        }
    }

    fn covers_tile(&self, tile: usize) -> bool {
        self.tile_set().contains(&tile)
    }

    fn layer_in_band(&self, layer: usize) -> bool {
        self.min_layer.map_or(true, |min| layer >= min)
            && self.max_layer.map_or(true, |max| layer <= max)
    }
}

/// All constraints active for a run.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Prunes possibilities the constraints rule out up front. Returns the
    /// coordinates whose sets changed, to seed the initial propagation pass.
    ///
    /// A cell emptied here is left at zero possibilities; the initial
    /// propagation surfaces it as a contradiction.
    pub fn apply_initial(&self, grid: &mut Grid) -> Vec<Coord> {
        let num_tiles = grid.num_tiles();
        let mut changed = Vec::new();

        for constraint in &self.constraints {
            // Required positions keep only the allowed set.
            if !constraint.allowed_tiles.is_empty() {
                for &(x, y, z) in &constraint.required_positions {
                    let Some(cell) = grid.get_mut(x, y, z) else {
                        continue;
                    };
                    let mut touched = false;
                    for tile in 0..num_tiles {
                        if !constraint.allowed_tiles.contains(&tile) && cell.remove(tile) {
                            touched = true;
                        }
                    }
                    if touched {
                        changed.push((x, y, z));
                    }
                }
            }

            // Forbidden positions lose the deny set.
            let deny = constraint.tile_set();
            if !deny.is_empty() {
                for &(x, y, z) in &constraint.forbidden_positions {
                    let Some(cell) = grid.get_mut(x, y, z) else {
                        continue;
                    };
                    let mut touched = false;
                    for &tile in deny {
                        if cell.remove(tile) {
                            touched = true;
                        }
                    }
                    if touched {
                        changed.push((x, y, z));
                    }
                }
            }

            // Layer bands prune the tile set everywhere outside the band.
            if constraint.min_layer.is_some() || constraint.max_layer.is_some() {
                let tiles = constraint.tile_set().to_vec();
                for (x, y, z) in grid.coords().collect::<Vec<_>>() {
                    if constraint.layer_in_band(y) {
                        continue;
                    }
                    let Some(cell) = grid.get_mut(x, y, z) else {
                        continue;
                    };
                    let mut touched = false;
                    for &tile in &tiles {
                        if cell.remove(tile) {
                            touched = true;
                        }
                    }
                    if touched {
                        changed.push((x, y, z));
                    }
                }
            }
        }

        changed.sort_unstable();
        changed.dedup();
        changed
    }

    /// Checks a proposed collapse against every constraint. Returns the name
    /// of the first violated constraint, or `None` when the placement is
    /// acceptable. `counts` holds the current per-tile instance counters.
    pub fn check_collapse(&self, coord: Coord, tile: usize, counts: &[u32]) -> Option<&str> {
        let (_, y, _) = coord;
        for constraint in &self.constraints {
            if !constraint.covers_tile(tile) {
                continue;
            }
            if constraint.exclusive
                && !constraint.required_positions.is_empty()
                && !constraint.required_positions.contains(&coord)
            {
                return Some(&constraint.name);
            }
            if constraint.forbidden_positions.contains(&coord) {
                return Some(&constraint.name);
            }
            if !constraint.layer_in_band(y) {
                return Some(&constraint.name);
            }
            if let Some(max) = constraint.max_instances {
                let placed: u32 = constraint
                    .tile_set()
                    .iter()
                    .map(|&t| counts.get(t).copied().unwrap_or(0))
                    .sum();
                if placed >= max {
                    return Some(&constraint.name);
                }
            }
        }
        None
    }

    /// Audits `min_instances` after a run; returns one message per unmet
    /// minimum.
    pub fn audit_min_instances(&self, counts: &[u32]) -> Vec<String> {
        let mut unmet = Vec::new();
        for constraint in &self.constraints {
            let Some(min) = constraint.min_instances else {
                continue;
            };
            let placed: u32 = constraint
                .tile_set()
                .iter()
                .map(|&t| counts.get(t).copied().unwrap_or(0))
                .sum();
            if placed < min {
                unmet.push(format!(
                    "constraint '{}' placed {placed} of at least {min} required instance(s)",
                    constraint.name
                ));
            }
        }
        unmet
    }
}

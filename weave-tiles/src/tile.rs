//! Tile definitions: categories, rotations and the per-face socket array.

use crate::direction::{Direction, NUM_DIRECTIONS};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Broad classification of a tile, used by selection heuristics and the
/// support rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TileCategory {
    /// Air / nothing. Empty tiles never provide support.
    #[default]
    Empty,
    /// Floor-like tiles, prioritized by the ground-first heuristic.
    Ground,
    Wall,
    Structure,
    Decoration,
}

/// A quarter-turn rotation about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Number of 90° steps this rotation represents.
    pub const fn steps(self) -> usize {
        match self {
            Self::R0 => 0,
            Self::R90 => 1,
            Self::R180 => 2,
            Self::R270 => 3,
        }
    }

    /// The rotation for a number of 90° steps (modulo a full turn).
    pub const fn from_steps(steps: usize) -> Self {
        match steps % 4 {
            0 => Self::R0,
            1 => Self::R90,
            2 => Self::R180,
            _ => Self::R270,
        }
    }

    /// Rotation angle in degrees.
    pub const fn degrees(self) -> u32 {
        (self.steps() as u32) * 90
    }
}

/// An immutable tile description: identity, per-face sockets and the
/// placement attributes consumed by the solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileDefinition {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub category: TileCategory,
    /// Socket names indexed by `Direction::index()`.
    pub sockets: [String; NUM_DIRECTIONS],
    pub weight: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotatable: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_rotation: Rotation,
    /// Placement cap for this tile across a run; `None` means unlimited.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_instances: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub requires_support: bool,
    /// Identifier of the visual asset the external layer places for this tile.
    pub asset: String,
}

impl TileDefinition {
    /// The socket name on the face pointing `direction`.
    #[inline]
    pub fn socket(&self, direction: Direction) -> &str {
        &self.sockets[direction.index()]
    }

    /// Builds the socket array of this tile rotated by `steps` quarter turns:
    /// horizontal sockets are cyclically permuted, vertical sockets stay put.
    pub fn rotated_sockets(&self, steps: usize) -> [String; NUM_DIRECTIONS] {
        let mut rotated: [String; NUM_DIRECTIONS] = Default::default();
        for dir in Direction::ALL {
            rotated[dir.rotated_y_by(steps).index()] = self.sockets[dir.index()].clone();
        }
        rotated
    }

    /// Synthesizes the rotation variant of this tile for `steps` quarter
    /// turns. The variant is marked non-rotatable so a later expansion pass
    /// never re-expands it.
    pub fn rotation_variant(&self, steps: usize) -> Self {
        let rotation = Rotation::from_steps(steps);
        Self {
            name: format!("{}_r{}", self.name, rotation.degrees()),
            category: self.category,
            sockets: self.rotated_sockets(steps),
            weight: self.weight,
            rotatable: false,
            base_rotation: rotation,
            max_instances: self.max_instances,
            requires_support: self.requires_support,
            asset: self.asset.clone(),
        }
    }
}

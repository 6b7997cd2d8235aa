//! The output record handed to the external placement layer.

use crate::grid::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of a generation run.
///
/// On failure the assignments gathered so far are still present, so a caller
/// can salvage a partial result or retry with another seed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerationResult {
    /// True when every cell collapsed without error.
    pub success: bool,
    /// Human-readable description of the failure, if any.
    pub error: Option<String>,
    /// Tile index chosen for each collapsed coordinate.
    pub assignments: HashMap<Coord, usize>,
    /// Coordinates left uncollapsed when the run ended.
    pub failed_positions: Vec<Coord>,
    /// Top-level loop iterations executed.
    pub iterations: u64,
    /// Total collapse events, implicit auto-collapses included.
    pub collapsed: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl GenerationResult {
    /// An empty failed result for inputs rejected before a run could start.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            assignments: HashMap::new(),
            failed_positions: Vec::new(),
            iterations: 0,
            collapsed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// The assigned tile at `coord`, if that cell collapsed.
    pub fn tile_at(&self, coord: Coord) -> Option<usize> {
        self.assignments.get(&coord).copied()
    }

    /// True when the run left nothing behind.
    pub fn is_complete(&self) -> bool {
        self.failed_positions.is_empty()
    }
}

//! Weighted Shannon entropy over possibility sets.
//!
//! Lower entropy means a more constrained cell; the minimum-entropy scan is
//! the basis of the default selection heuristic.

use crate::grid::{Cell, Coord, Grid};
use bitvec::prelude::*;
use float_ord::FloatOrd;
use rayon::prelude::*;

/// Tolerance within which two entropy values count as tied.
pub const ENTROPY_TOLERANCE: f32 = 1e-6;

/// Weighted Shannon entropy of a possibility set:
/// `H = ln(ΣW) - Σ(W·lnW) / ΣW` over the still-possible tiles' weights.
///
/// Collapsed or single-possibility sets have entropy 0. An empty set (a
/// contradiction, never stored) maps to negative infinity. A zero total
/// weight falls back to the unweighted count.
pub fn cell_entropy(possibilities: &BitSlice, weights: &[f32]) -> f32 {
    let count = possibilities.count_ones();
    if count == 0 {
        return f32::NEG_INFINITY;
    }
    if count == 1 {
        return 0.0;
    }

    let mut sum_of_weights = 0.0f32;
    let mut sum_of_weight_log_weight = 0.0f32;
    for tile in possibilities.iter_ones() {
        let weight = weights.get(tile).copied().unwrap_or(0.0);
        if weight > 0.0 {
            sum_of_weights += weight;
            sum_of_weight_log_weight += weight * weight.ln();
        }
    }

    if sum_of_weights <= 0.0 {
        return (count as f32).ln();
    }

    let entropy = sum_of_weights.ln() - (sum_of_weight_log_weight / sum_of_weights);
    // Floating point can land slightly below zero near a collapse.
    entropy.max(0.0)
}

/// Recomputes entropy for every cell in the grid in parallel.
pub fn refresh_grid(grid: &mut Grid, weights: &[f32]) {
    grid.cells_mut().par_iter_mut().for_each(|cell| {
        if cell.is_collapsed() {
            cell.set_entropy(0.0);
        } else {
            let entropy = cell_entropy(cell.possibilities(), weights);
            cell.set_entropy(entropy);
        }
    });
}

/// Finds all uncollapsed cells within [`ENTROPY_TOLERANCE`] of the minimum
/// entropy, restricted to cells accepted by `filter`. Returns an empty list
/// when no uncollapsed cell passes the filter.
pub fn min_entropy_cells<F>(grid: &Grid, filter: F) -> Vec<Coord>
where
    F: Fn(Coord, &Cell) -> bool,
{
    let mut min_entropy: Option<FloatOrd<f32>> = None;
    for coord in grid.coords() {
        let Some(cell) = grid.get(coord.0, coord.1, coord.2) else {
            continue;
        };
        if cell.is_collapsed() || !filter(coord, cell) {
            continue;
        }
        let entropy = FloatOrd(cell.entropy());
        if min_entropy.map_or(true, |m| entropy < m) {
            min_entropy = Some(entropy);
        }
    }

    let Some(FloatOrd(min)) = min_entropy else {
        return Vec::new();
    };

    grid.coords()
        .filter(|&(x, y, z)| {
            grid.get(x, y, z).is_some_and(|cell| {
                !cell.is_collapsed()
                    && filter((x, y, z), cell)
                    && (cell.entropy() - min).abs() < ENTROPY_TOLERANCE
            })
        })
        .collect()
}

//! Core library for the constraint-propagation tile generation engine.
//! Defines the grid model, rule table, constraints and the solver loop.

use thiserror::Error;
use weave_tiles::CatalogError;

/// Position/layer/instance restrictions layered over the grid.
pub mod constraint;
/// Weighted Shannon entropy over possibility sets.
pub mod entropy;
/// The 3D cell grid and neighbor lookups.
pub mod grid;
/// The output record consumed by external renderers/spawners.
pub mod result;
/// Precomputed per-direction tile compatibility.
pub mod rules;
/// The generation engine: selection, collapse, propagation, backtracking.
pub mod solver;

pub use crate::constraint::{Constraint, ConstraintSet};
pub use crate::grid::{Cell, Coord, Grid};
pub use crate::result::GenerationResult;
pub use crate::rules::RuleTable;
pub use crate::solver::{
    BackgroundRun, GenerationConfig, GenerationConfigBuilder, GenerationMode, ProgressInfo, Solver,
    SolverState,
};

/// Errors that can occur during a generation run.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Malformed catalog or configuration; generation never starts.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// A cell reached zero possibilities during propagation.
    /// Includes the (x, y, z) coordinates of the contradictory cell.
    #[error("Contradiction found at ({0}, {1}, {2})")]
    Contradiction(usize, usize, usize),
    /// A drawn tile violated a placement constraint at collapse time.
    #[error("Collapse rejected at ({0}, {1}, {2})")]
    CollapseRejected(usize, usize, usize),
    /// The main loop exceeded the configured iteration cap.
    #[error("Maximum iterations ({0}) reached")]
    IterationLimit(u64),
    /// Propagation exceeded its step ceiling; signals an under-constrained
    /// configuration or a rule-table bug rather than a contradiction.
    #[error("Propagation step limit ({0}) exceeded")]
    PropagationLimit(u64),
    /// The run was cancelled through the cooperative cancellation flag.
    #[error("Run interrupted by cancellation signal")]
    Interrupted,
    /// A second run was started while one was already in flight.
    #[error("A generation run is already in progress")]
    AlreadyRunning,
    /// An error related to grid dimensions or accessing grid data.
    #[error("Grid error: {0}")]
    Grid(String),
    /// An error occurred validating the tile catalog.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

//! The generation engine: cell selection, collapse, constraint propagation
//! and bounded backtracking.

use crate::constraint::{Constraint, ConstraintSet};
use crate::entropy::{self, ENTROPY_TOLERANCE};
use crate::grid::{Cell, Coord, Grid};
use crate::result::GenerationResult;
use crate::rules::RuleTable;
use crate::GenerationError;
use bitvec::prelude::*;
use float_ord::FloatOrd;
use log::{debug, info, warn};
use nalgebra::Vector3;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use weave_tiles::{Direction, TileCatalog, TileCategory};

/// Heuristic used to pick the next cell to collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GenerationMode {
    /// Global minimum entropy, ties broken uniformly at random.
    #[default]
    MinEntropy,
    /// Minimum entropy among cells that can still host a Ground tile,
    /// falling back to plain minimum entropy once no such cell remains.
    GroundFirst,
    /// Minimum entropy within the lowest layer still holding uncollapsed
    /// cells.
    LayeredBottomUp,
    /// Closest uncollapsed cell to the grid center; ties broken by entropy,
    /// then uniformly at random.
    CenterOutward,
}

/// Lifecycle of a solver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Uninitialized,
    Initialized,
    Running,
    Succeeded,
    Failed,
}

/// Configuration for a generation run.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub periodic: bool,
    pub mode: GenerationMode,
    /// Iteration cap for the main loop; 0 selects the default of
    /// 10 × cell count.
    pub max_iterations: u64,
    pub seed: u64,
    pub backtracking: bool,
    /// How many change frames are retained, and so how many consecutive
    /// undo steps a failure may spend before the run is abandoned.
    pub backtracking_depth: usize,
    pub constraints: Vec<Constraint>,
}

impl GenerationConfig {
    /// Creates a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder::default()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            depth: 8,
            periodic: false,
            mode: GenerationMode::MinEntropy,
            max_iterations: 0,
            seed: 0,
            backtracking: false,
            backtracking_depth: 8,
            constraints: Vec::new(),
        }
    }
}

/// Builder for `GenerationConfig`.
#[derive(Default)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn size(mut self, width: usize, height: usize, depth: usize) -> Self {
        self.config.width = width;
        self.config.height = height;
        self.config.depth = depth;
        self
    }

    pub fn periodic(mut self, periodic: bool) -> Self {
        self.config.periodic = periodic;
        self
    }

    pub fn mode(mut self, mode: GenerationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn max_iterations(mut self, max: u64) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn backtracking(mut self, enabled: bool, depth: usize) -> Self {
        self.config.backtracking = enabled;
        self.config.backtracking_depth = depth;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.config.constraints.push(constraint);
        self
    }

    pub fn build(self) -> GenerationConfig {
        self.config
    }
}

/// Snapshot handed to the progress callback after each committed collapse.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub collapsed_cells: usize,
    pub total_cells: usize,
    pub iterations: u64,
    pub elapsed: std::time::Duration,
}

/// Alias for the progress callback function type.
pub type ProgressCallback = Box<dyn Fn(&ProgressInfo) + Send>;

/// One recorded possibility removal, replayed in reverse on undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord {
    pub coord: Coord,
    pub tile: usize,
    pub removed: bool,
}

#[derive(Debug, Clone, Copy)]
struct CollapseRecord {
    coord: Coord,
    tile: usize,
    auto: bool,
}

/// Changes accumulated by one top-level collapse attempt.
#[derive(Debug, Default)]
struct Frame {
    changes: Vec<ChangeRecord>,
    history_mark: usize,
    choice: Option<(Coord, usize)>,
}

/// Orchestrates a generation run over one grid.
///
/// The grid and rule table are rebuilt per run; the catalog is shared and
/// long-lived. At most one run is in flight per solver.
pub struct Solver {
    catalog: Arc<TileCatalog>,
    config: GenerationConfig,
    rules: RuleTable,
    constraints: ConstraintSet,
    grid: Grid,
    weights: Vec<f32>,
    ground_mask: BitVec,
    support_mask: BitVec,
    rng: StdRng,
    instance_counts: Vec<u32>,
    frames: Vec<Frame>,
    collapse_history: Vec<CollapseRecord>,
    consecutive_backtracks: usize,
    last_choice: Option<(Coord, usize)>,
    state: SolverState,
    running: bool,
    cancel: Arc<AtomicBool>,
    iterations: u64,
    collapse_events: u64,
    progress_callback: Option<ProgressCallback>,
}

impl Solver {
    /// Validates the catalog and configuration, builds the rule table and
    /// grid, applies constraints and runs the initial propagation pass.
    ///
    /// Fails closed: any validation issue or a contradiction introduced by
    /// the constraints alone means no run ever starts.
    pub fn new(
        catalog: Arc<TileCatalog>,
        config: GenerationConfig,
    ) -> Result<Self, GenerationError> {
        catalog.validate()?;
        if config.width == 0 || config.height == 0 || config.depth == 0 {
            return Err(GenerationError::Validation(format!(
                "grid extents must be non-zero, got {}x{}x{}",
                config.width, config.height, config.depth
            )));
        }
        if config.backtracking && config.backtracking_depth == 0 {
            return Err(GenerationError::Validation(
                "backtracking enabled with zero depth".to_owned(),
            ));
        }
        for constraint in &config.constraints {
            for &tile in constraint
                .allowed_tiles
                .iter()
                .chain(constraint.denied_tiles.iter())
            {
                if tile >= catalog.len() {
                    return Err(GenerationError::Validation(format!(
                        "constraint '{}' references tile index {tile} out of range",
                        constraint.name
                    )));
                }
            }
        }

        let num_tiles = catalog.len();
        let weights: Vec<f32> = (0..num_tiles)
            .map(|i| catalog.weight(i).unwrap_or(0.0))
            .collect();
        let rules = RuleTable::build(&catalog);
        let asymmetries = rules.validate();
        if asymmetries > 0 {
            warn!("Rule table holds {asymmetries} asymmetric entr(ies); continuing");
        }

        let mut ground_mask = bitvec![0; num_tiles];
        for index in catalog.tiles_by_category(TileCategory::Ground) {
            ground_mask.set(index, true);
        }
        let mut support_mask = bitvec![0; num_tiles];
        for (index, tile) in catalog.tiles().iter().enumerate() {
            if tile.category != TileCategory::Empty {
                support_mask.set(index, true);
            }
        }

        let constraints = ConstraintSet::new(config.constraints.clone());
        let grid = Grid::new(
            config.width,
            config.height,
            config.depth,
            config.periodic,
            num_tiles,
        );
        let rng = StdRng::seed_from_u64(config.seed);

        let mut solver = Self {
            catalog,
            config,
            rules,
            constraints,
            grid,
            weights,
            ground_mask,
            support_mask,
            rng,
            instance_counts: vec![0; num_tiles],
            frames: Vec::new(),
            collapse_history: Vec::new(),
            consecutive_backtracks: 0,
            last_choice: None,
            state: SolverState::Uninitialized,
            running: false,
            cancel: Arc::new(AtomicBool::new(false)),
            iterations: 0,
            collapse_events: 0,
            progress_callback: None,
        };
        solver.init_run()?;
        Ok(solver)
    }

    /// Rebuilds the grid and per-run state so the solver can run again.
    /// The seeded random stream restarts too, so a reset run reproduces the
    /// previous one exactly.
    pub fn reset(&mut self) -> Result<(), GenerationError> {
        if self.running {
            return Err(GenerationError::AlreadyRunning);
        }
        self.grid = Grid::new(
            self.config.width,
            self.config.height,
            self.config.depth,
            self.config.periodic,
            self.catalog.len(),
        );
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.instance_counts = vec![0; self.catalog.len()];
        self.frames.clear();
        self.collapse_history.clear();
        self.consecutive_backtracks = 0;
        self.last_choice = None;
        self.iterations = 0;
        self.collapse_events = 0;
        self.cancel.store(false, Ordering::Relaxed);
        self.init_run()
    }

    /// Applies constraints, then runs one propagation pass seeded from the
    /// cells they changed, so a contradiction introduced by the constraints
    /// alone surfaces before any run starts.
    fn init_run(&mut self) -> Result<(), GenerationError> {
        entropy::refresh_grid(&mut self.grid, &self.weights);
        let seeded = self.constraints.apply_initial(&mut self.grid);
        for &(x, y, z) in &seeded {
            self.refresh_entropy((x, y, z));
            if self.grid.get(x, y, z).map_or(0, Cell::count) == 0 {
                return Err(GenerationError::Contradiction(x, y, z));
            }
        }
        for &coord in &seeded {
            if self.grid.get(coord.0, coord.1, coord.2).map_or(1, Cell::count) == 1 {
                self.auto_collapse(coord);
            }
        }
        self.propagate(seeded.into_iter().collect::<VecDeque<Coord>>())?;
        self.state = SolverState::Initialized;
        Ok(())
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Shared flag polled by the main loop; setting it makes the run fail
    /// with an interruption error and partial results.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }

    /// Runs the generation loop to completion and extracts the result.
    ///
    /// Expected failures (contradictions, iteration limits, interruption)
    /// never surface as errors here; they are folded into the result's
    /// success flag, error text and partial assignments.
    pub fn generate(&mut self) -> GenerationResult {
        if self.running {
            return GenerationResult::rejected(GenerationError::AlreadyRunning.to_string());
        }
        if matches!(self.state, SolverState::Succeeded | SolverState::Failed) {
            if let Err(e) = self.reset() {
                return GenerationResult::rejected(e.to_string());
            }
        }
        self.running = true;
        self.state = SolverState::Running;
        let start = Instant::now();
        let outcome = self.run_loop(start);
        let result = self.extract_result(start, outcome.err());
        self.state = if result.success {
            SolverState::Succeeded
        } else {
            SolverState::Failed
        };
        self.running = false;
        info!(
            "Generation {} after {} iteration(s) in {:?}: {}/{} cells",
            if result.success { "succeeded" } else { "failed" },
            result.iterations,
            result.elapsed,
            result.assignments.len(),
            self.grid.len()
        );
        result
    }

    /// Moves the solver onto a background thread and returns a handle that
    /// can cancel the run and join the result.
    pub fn generate_background(mut self) -> BackgroundRun {
        let cancel = self.cancel.clone();
        let handle = thread::spawn(move || {
            let result = self.generate();
            (self, result)
        });
        BackgroundRun { handle, cancel }
    }

    fn iteration_limit(&self) -> u64 {
        if self.config.max_iterations > 0 {
            self.config.max_iterations
        } else {
            (self.grid.len() as u64).saturating_mul(10)
        }
    }

    fn run_loop(&mut self, start: Instant) -> Result<(), GenerationError> {
        let limit = self.iteration_limit();
        debug!(
            "Generation loop starting: {} cells, {} tiles, limit {limit}, mode {:?}",
            self.grid.len(),
            self.grid.num_tiles(),
            self.config.mode
        );

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                warn!("Cancellation flag set, stopping run");
                return Err(GenerationError::Interrupted);
            }

            let Some(coord) = self.select_next_cell() else {
                return Ok(());
            };

            self.iterations += 1;
            if self.iterations > limit {
                return Err(GenerationError::IterationLimit(limit));
            }

            if self.config.backtracking {
                self.push_frame();
            }

            match self.attempt(coord) {
                Ok(()) => {
                    self.consecutive_backtracks = 0;
                    self.report_progress(start);
                }
                Err(
                    failure @ (GenerationError::Contradiction(..)
                    | GenerationError::CollapseRejected(..)),
                ) => {
                    debug!("Iter {}: attempt at {:?} failed: {failure}", self.iterations, coord);
                    self.recover(failure)?;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// One top-level step: collapse the selected cell, then propagate.
    fn attempt(&mut self, coord: Coord) -> Result<(), GenerationError> {
        self.collapse_cell(coord)?;
        self.propagate(VecDeque::from([coord]))
    }

    /// Weighted-random collapse of the cell at `coord`.
    ///
    /// The draw is proportional to authored weights, falling back to a
    /// uniform draw when no positive weight remains. A drawn tile that
    /// violates the placement checks rejects the whole attempt.
    fn collapse_cell(&mut self, coord: Coord) -> Result<usize, GenerationError> {
        let (x, y, z) = coord;
        let cell = self
            .grid
            .get(x, y, z)
            .ok_or_else(|| GenerationError::Grid(format!("cell ({x}, {y}, {z}) out of bounds")))?;
        if let Some(tile) = cell.collapsed_tile() {
            return Ok(tile);
        }
        let candidates: Vec<usize> = cell.possible_tiles().collect();
        if candidates.is_empty() {
            return Err(GenerationError::Contradiction(x, y, z));
        }

        let tile = if candidates.len() == 1 {
            candidates[0]
        } else {
            let weights: Vec<f32> = candidates.iter().map(|&t| self.weights[t]).collect();
            let total: f32 = weights.iter().sum();
            if total > 0.0 {
                match WeightedIndex::new(&weights) {
                    Ok(dist) => candidates[dist.sample(&mut self.rng)],
                    Err(_) => candidates[self.rng.gen_range(0..candidates.len())],
                }
            } else {
                candidates[self.rng.gen_range(0..candidates.len())]
            }
        };
        self.last_choice = Some((coord, tile));

        if let Some(reason) = self.placement_violation(coord, tile) {
            debug!("Collapse of tile {tile} at {coord:?} rejected: {reason}");
            return Err(GenerationError::CollapseRejected(x, y, z));
        }

        // Commit: drop every other possibility and mark the cell.
        let mut removed = Vec::with_capacity(candidates.len() - 1);
        if let Some(cell) = self.grid.get_mut(x, y, z) {
            for &t in &candidates {
                if t != tile && cell.remove(t) {
                    removed.push(t);
                }
            }
            cell.mark_collapsed(tile);
        }
        for t in removed {
            self.record_removal(coord, t);
        }
        self.instance_counts[tile] += 1;
        self.collapse_history.push(CollapseRecord {
            coord,
            tile,
            auto: false,
        });
        self.collapse_events += 1;
        if let Some(frame) = self.frames.last_mut() {
            frame.choice = Some((coord, tile));
        }
        Ok(tile)
    }

    /// Checks a proposed placement: constraint set, per-tile instance cap
    /// and the support requirement. Returns a description of the first
    /// violation found.
    fn placement_violation(&self, coord: Coord, tile: usize) -> Option<String> {
        if let Some(name) = self
            .constraints
            .check_collapse(coord, tile, &self.instance_counts)
        {
            return Some(format!("constraint '{name}' violated"));
        }
        let def = self.catalog.tile(tile)?;
        if let Some(max) = def.max_instances {
            if self.instance_counts[tile] >= max {
                return Some(format!("instance cap {max} reached"));
            }
        }
        if def.requires_support && !self.has_support(coord) {
            return Some("no support below".to_owned());
        }
        None
    }

    /// A cell is supported when it sits on the lowest layer of a finite
    /// grid, or when the cell below is (or can still become) a non-Empty
    /// tile.
    fn has_support(&self, coord: Coord) -> bool {
        let Some((bx, by, bz)) = self.grid.neighbor(coord, Direction::NegY) else {
            return true;
        };
        let Some(below) = self.grid.get(bx, by, bz) else {
            return false;
        };
        match below.collapsed_tile() {
            Some(tile) => self.support_mask[tile],
            None => below.possible_tiles().any(|t| self.support_mask[t]),
        }
    }

    /// Worklist propagation to arc consistency.
    ///
    /// FIFO over coordinates whose possibility set changed: each neighbor
    /// tile with no remaining support along the connecting direction is
    /// removed, the removal recorded, and the neighbor re-enqueued. A cell
    /// reaching zero possibilities is a contradiction; reaching exactly one
    /// is an implicit collapse. A step ceiling of 10 × cell count guards
    /// against runaway loops.
    fn propagate(&mut self, mut queue: VecDeque<Coord>) -> Result<(), GenerationError> {
        let step_limit = (self.grid.len() as u64).saturating_mul(10);
        let mut steps: u64 = 0;

        while let Some(coord) = queue.pop_front() {
            steps += 1;
            if steps > step_limit {
                return Err(GenerationError::PropagationLimit(step_limit));
            }

            let Some(cell) = self.grid.get(coord.0, coord.1, coord.2) else {
                continue;
            };
            let current = cell.possibilities_cloned();

            for dir in Direction::ALL {
                let Some((nx, ny, nz)) = self.grid.neighbor(coord, dir) else {
                    continue;
                };
                let supported = self.rules.supported(&current, dir);

                let (removed, remaining) = {
                    let Some(neighbor) = self.grid.get_mut(nx, ny, nz) else {
                        continue;
                    };
                    if neighbor.count() == 0 {
                        continue;
                    }
                    let present: Vec<usize> = neighbor.possible_tiles().collect();
                    let mut removed = Vec::new();
                    for t in present {
                        if !supported[t] && neighbor.remove(t) {
                            removed.push(t);
                        }
                    }
                    (removed, neighbor.count())
                };
                if removed.is_empty() {
                    continue;
                }
                for &t in &removed {
                    self.record_removal((nx, ny, nz), t);
                }

                if remaining == 0 {
                    return Err(GenerationError::Contradiction(nx, ny, nz));
                }
                if remaining == 1 {
                    self.auto_collapse((nx, ny, nz));
                } else {
                    self.refresh_entropy((nx, ny, nz));
                }
                queue.push_back((nx, ny, nz));
            }
        }
        Ok(())
    }

    /// Implicit collapse of a cell whose possibilities narrowed to one.
    fn auto_collapse(&mut self, coord: Coord) {
        let Some(cell) = self.grid.get_mut(coord.0, coord.1, coord.2) else {
            return;
        };
        if cell.is_collapsed() {
            return;
        }
        let Some(tile) = cell.sole_possibility() else {
            return;
        };
        cell.mark_collapsed(tile);
        self.instance_counts[tile] += 1;
        self.collapse_history.push(CollapseRecord {
            coord,
            tile,
            auto: true,
        });
        self.collapse_events += 1;
    }

    // --- Backtracking ---

    /// Pushes a fresh change frame, discarding the oldest one beyond the
    /// configured depth. Discarded changes become permanent.
    fn push_frame(&mut self) {
        if self.frames.len() >= self.config.backtracking_depth {
            self.frames.remove(0);
        }
        self.frames.push(Frame {
            changes: Vec::new(),
            history_mark: self.collapse_history.len(),
            choice: None,
        });
    }

    fn record_removal(&mut self, coord: Coord, tile: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.changes.push(ChangeRecord {
                coord,
                tile,
                removed: true,
            });
        }
    }

    /// Undoes the newest frame: restores its removals in reverse order and
    /// reverts the collapses it committed, decrementing instance counters.
    fn rollback_top_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let mut touched: Vec<Coord> = Vec::with_capacity(frame.changes.len());
        for change in frame.changes.iter().rev() {
            if !change.removed {
                continue;
            }
            let (x, y, z) = change.coord;
            if let Some(cell) = self.grid.get_mut(x, y, z) {
                cell.restore(change.tile);
            }
            touched.push(change.coord);
        }
        while self.collapse_history.len() > frame.history_mark {
            let Some(record) = self.collapse_history.pop() else {
                break;
            };
            let (x, y, z) = record.coord;
            if let Some(cell) = self.grid.get_mut(x, y, z) {
                cell.mark_uncollapsed();
            }
            self.instance_counts[record.tile] =
                self.instance_counts[record.tile].saturating_sub(1);
            touched.push(record.coord);
        }
        touched.sort_unstable();
        touched.dedup();
        for coord in touched {
            self.refresh_entropy(coord);
        }
    }

    /// Failure recovery: undo the failed attempt, ban the dead choice so a
    /// retry cannot redraw it, and unwind further committed frames while
    /// the ban keeps emptying cells — up to the configured depth of
    /// consecutive undo steps.
    fn recover(&mut self, failure: GenerationError) -> Result<(), GenerationError> {
        if !self.config.backtracking {
            return Err(failure);
        }
        let Some((mut dead_coord, mut dead_tile)) = self.last_choice.take() else {
            return Err(failure);
        };
        self.rollback_top_frame();

        loop {
            let (x, y, z) = dead_coord;
            let banned = self
                .grid
                .get_mut(x, y, z)
                .map_or(false, |cell| cell.remove(dead_tile));
            if banned {
                self.record_removal(dead_coord, dead_tile);
                self.refresh_entropy(dead_coord);
            }
            let remaining = self.grid.get(x, y, z).map_or(0, Cell::count);

            if remaining > 0 {
                match self.propagate(VecDeque::from([dead_coord])) {
                    Ok(()) => {
                        debug!(
                            "Recovered: banned tile {dead_tile} at {dead_coord:?}, \
                             {} level(s) unwound",
                            self.consecutive_backtracks
                        );
                        return Ok(());
                    }
                    Err(
                        GenerationError::Contradiction(..) | GenerationError::CollapseRejected(..),
                    ) => {
                        // The ban itself is unsatisfiable here; unwind one
                        // more committed level.
                    }
                    Err(other) => return Err(other),
                }
            }

            if self.consecutive_backtracks >= self.config.backtracking_depth {
                return Err(failure);
            }
            let Some(choice) = self.frames.last().and_then(|frame| frame.choice) else {
                return Err(failure);
            };
            self.rollback_top_frame();
            self.consecutive_backtracks += 1;
            (dead_coord, dead_tile) = choice;
        }
    }

    // --- Selection heuristics ---

    fn select_next_cell(&mut self) -> Option<Coord> {
        match self.config.mode {
            GenerationMode::MinEntropy => self.select_min_entropy(),
            GenerationMode::GroundFirst => self.select_ground_first(),
            GenerationMode::LayeredBottomUp => self.select_layered_bottom_up(),
            GenerationMode::CenterOutward => self.select_center_outward(),
        }
    }

    fn pick(&mut self, candidates: &[Coord]) -> Option<Coord> {
        candidates.choose(&mut self.rng).copied()
    }

    fn select_min_entropy(&mut self) -> Option<Coord> {
        let candidates = entropy::min_entropy_cells(&self.grid, |_, _| true);
        self.pick(&candidates)
    }

    fn select_ground_first(&mut self) -> Option<Coord> {
        let candidates = {
            let mask = &self.ground_mask;
            entropy::min_entropy_cells(&self.grid, |_, cell| {
                cell.possible_tiles().any(|t| mask[t])
            })
        };
        if candidates.is_empty() {
            self.select_min_entropy()
        } else {
            self.pick(&candidates)
        }
    }

    fn select_layered_bottom_up(&mut self) -> Option<Coord> {
        for layer in 0..self.grid.height {
            let candidates =
                entropy::min_entropy_cells(&self.grid, |(_, y, _), _| y == layer);
            if !candidates.is_empty() {
                return self.pick(&candidates);
            }
        }
        None
    }

    fn select_center_outward(&mut self) -> Option<Coord> {
        let center = Vector3::new(
            (self.grid.width as f32 - 1.0) / 2.0,
            (self.grid.height as f32 - 1.0) / 2.0,
            (self.grid.depth as f32 - 1.0) / 2.0,
        );
        let distance = |(x, y, z): Coord| {
            (Vector3::new(x as f32, y as f32, z as f32) - center).norm()
        };

        let mut min_dist: Option<FloatOrd<f32>> = None;
        for coord in self.grid.coords() {
            let Some(cell) = self.grid.get(coord.0, coord.1, coord.2) else {
                continue;
            };
            if cell.is_collapsed() {
                continue;
            }
            let d = FloatOrd(distance(coord));
            if min_dist.map_or(true, |m| d < m) {
                min_dist = Some(d);
            }
        }
        let FloatOrd(min) = min_dist?;

        let nearest: Vec<Coord> = self
            .grid
            .coords()
            .filter(|&coord| {
                self.grid
                    .get(coord.0, coord.1, coord.2)
                    .is_some_and(|cell| {
                        !cell.is_collapsed() && (distance(coord) - min).abs() < 1e-4
                    })
            })
            .collect();

        // Distance ties break by entropy, then uniformly at random.
        let min_entropy = nearest
            .iter()
            .filter_map(|&(x, y, z)| self.grid.get(x, y, z))
            .map(|cell| FloatOrd(cell.entropy()))
            .min()?;
        let candidates: Vec<Coord> = nearest
            .into_iter()
            .filter(|&(x, y, z)| {
                self.grid.get(x, y, z).is_some_and(|cell| {
                    (cell.entropy() - min_entropy.0).abs() < ENTROPY_TOLERANCE
                })
            })
            .collect();
        self.pick(&candidates)
    }

    // --- Bookkeeping ---

    fn refresh_entropy(&mut self, coord: Coord) {
        let weights = &self.weights;
        if let Some(cell) = self.grid.get_mut(coord.0, coord.1, coord.2) {
            if cell.is_collapsed() {
                cell.set_entropy(0.0);
            } else {
                let entropy = entropy::cell_entropy(cell.possibilities(), weights);
                cell.set_entropy(entropy);
            }
        }
    }

    fn report_progress(&self, start: Instant) {
        if let Some(callback) = &self.progress_callback {
            callback(&ProgressInfo {
                collapsed_cells: self.grid.collapsed_count(),
                total_cells: self.grid.len(),
                iterations: self.iterations,
                elapsed: start.elapsed(),
            });
        }
    }

    /// Walks the grid into the output record. Collapsed cells become
    /// assignments; the rest become failed positions. Partial results are
    /// returned even on failure so callers can salvage or retry.
    fn extract_result(
        &self,
        start: Instant,
        error: Option<GenerationError>,
    ) -> GenerationResult {
        let mut assignments = HashMap::new();
        let mut failed_positions = Vec::new();
        for (x, y, z) in self.grid.coords() {
            match self.grid.get(x, y, z).and_then(Cell::collapsed_tile) {
                Some(tile) => {
                    assignments.insert((x, y, z), tile);
                }
                None => failed_positions.push((x, y, z)),
            }
        }
        for message in self.constraints.audit_min_instances(&self.instance_counts) {
            warn!("{message}");
        }
        let success = error.is_none() && failed_positions.is_empty();
        GenerationResult {
            success,
            error: error.map(|e| e.to_string()),
            assignments,
            failed_positions,
            iterations: self.iterations,
            collapsed: self.collapse_events,
            elapsed: start.elapsed(),
        }
    }
}

/// Handle to a generation run executing on a background thread.
///
/// The solver (grid and rule table included) is exclusively owned by the
/// worker for the run's duration, so no internal locking exists.
pub struct BackgroundRun {
    handle: JoinHandle<(Solver, GenerationResult)>,
    cancel: Arc<AtomicBool>,
}

impl BackgroundRun {
    /// Requests cooperative cancellation; the loop notices at its next
    /// iteration and fails with an interruption error.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the run completes, returning the solver and its result.
    pub fn join(self) -> (Solver, GenerationResult) {
        match self.handle.join() {
            Ok(pair) => pair,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

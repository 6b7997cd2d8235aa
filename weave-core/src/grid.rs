use bitvec::prelude::*;
use weave_tiles::Direction;

/// A grid coordinate as `(x, y, z)`. Y is the vertical axis.
pub type Coord = (usize, usize, usize);

/// Per-coordinate possibility state.
///
/// Invariants: an uncollapsed cell has at least one set bit (zero is a
/// contradiction surfaced as an error, never stored); a collapsed cell has
/// exactly one set bit and entropy 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    possibilities: BitVec,
    collapsed: Option<usize>,
    entropy: f32,
}

impl Cell {
    /// A fresh cell with all `num_tiles` tiles possible. Entropy is filled
    /// in by the grid-wide refresh once weights are known.
    pub(crate) fn with_all(num_tiles: usize) -> Self {
        Self {
            possibilities: bitvec![1; num_tiles],
            collapsed: None,
            entropy: 0.0,
        }
    }

    /// Number of tiles still possible here.
    #[inline]
    pub fn count(&self) -> usize {
        self.possibilities.count_ones()
    }

    #[inline]
    pub fn allows(&self, tile: usize) -> bool {
        self.possibilities.get(tile).map_or(false, |b| *b)
    }

    #[inline]
    pub fn is_collapsed(&self) -> bool {
        self.collapsed.is_some()
    }

    /// The tile this cell collapsed to, if any.
    #[inline]
    pub fn collapsed_tile(&self) -> Option<usize> {
        self.collapsed
    }

    #[inline]
    pub fn entropy(&self) -> f32 {
        self.entropy
    }

    /// Indices of all still-possible tiles, in ascending order.
    pub fn possible_tiles(&self) -> impl Iterator<Item = usize> + '_ {
        self.possibilities.iter_ones()
    }

    /// The single remaining tile, when exactly one is left.
    pub fn sole_possibility(&self) -> Option<usize> {
        if self.count() == 1 {
            self.possibilities.first_one()
        } else {
            None
        }
    }

    pub fn possibilities(&self) -> &BitSlice {
        &self.possibilities
    }

    pub(crate) fn possibilities_cloned(&self) -> BitVec {
        self.possibilities.clone()
    }

    /// Clears a possibility bit. Returns true if it was set.
    pub(crate) fn remove(&mut self, tile: usize) -> bool {
        if self.allows(tile) {
            self.possibilities.set(tile, false);
            true
        } else {
            false
        }
    }

    /// Restores a previously removed possibility bit.
    pub(crate) fn restore(&mut self, tile: usize) {
        self.possibilities.set(tile, true);
    }

    pub(crate) fn set_entropy(&mut self, entropy: f32) {
        self.entropy = entropy;
    }

    pub(crate) fn mark_collapsed(&mut self, tile: usize) {
        self.collapsed = Some(tile);
        self.entropy = 0.0;
    }

    pub(crate) fn mark_uncollapsed(&mut self) {
        self.collapsed = None;
    }
}

/// A fixed-extent 3D grid of cells, linearized as `z * w * h + y * w + x`.
/// Built once per generation run and never resized.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub periodic: bool,
    num_tiles: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a new grid with every tile possible in every cell.
    pub fn new(width: usize, height: usize, depth: usize, periodic: bool, num_tiles: usize) -> Self {
        let size = width * height * depth;
        let cells = (0..size).map(|_| Cell::with_all(num_tiles)).collect();
        Self {
            width,
            height,
            depth,
            periodic,
            num_tiles,
            cells,
        }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of tiles each possibility set ranges over.
    pub fn num_tiles(&self) -> usize {
        self.num_tiles
    }

    /// Calculates the 1D index for the given 3D coordinates.
    /// Returns None if the coordinates are out of bounds.
    fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        if x < self.width && y < self.height && z < self.depth {
            Some(z * self.width * self.height + y * self.width + x)
        } else {
            None
        }
    }

    /// Returns an immutable reference to the cell at the given coordinates,
    /// or None if the coordinates are out of bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&Cell> {
        self.index(x, y, z).and_then(|idx| self.cells.get(idx))
    }

    /// Returns a mutable reference to the cell at the given coordinates,
    /// or None if the coordinates are out of bounds.
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> Option<&mut Cell> {
        self.index(x, y, z)
            .and_then(move |idx| self.cells.get_mut(idx))
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// The neighboring coordinate one step along `direction`.
    ///
    /// Periodic grids wrap via modulo arithmetic; finite grids return `None`
    /// at the boundary.
    pub fn neighbor(&self, coord: Coord, direction: Direction) -> Option<Coord> {
        let (x, y, z) = coord;
        let (dx, dy, dz) = direction.offset();
        let nx_raw = x as isize + dx;
        let ny_raw = y as isize + dy;
        let nz_raw = z as isize + dz;

        if self.periodic {
            // Use modulo arithmetic for wrapping
            let nx = nx_raw.rem_euclid(self.width as isize) as usize;
            let ny = ny_raw.rem_euclid(self.height as isize) as usize;
            let nz = nz_raw.rem_euclid(self.depth as isize) as usize;
            Some((nx, ny, nz))
        } else if nx_raw >= 0
            && nx_raw < self.width as isize
            && ny_raw >= 0
            && ny_raw < self.height as isize
            && nz_raw >= 0
            && nz_raw < self.depth as isize
        {
            Some((nx_raw as usize, ny_raw as usize, nz_raw as usize))
        } else {
            None
        }
    }

    /// Iterates every coordinate in linearized order (x fastest).
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.depth).flat_map(move |z| {
            (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y, z)))
        })
    }

    /// Number of collapsed cells.
    pub fn collapsed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_collapsed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_all_possible() {
        let grid = Grid::new(2, 3, 4, false, 5);
        assert_eq!(grid.len(), 24);
        for (x, y, z) in grid.coords() {
            let cell = grid.get(x, y, z).unwrap();
            assert_eq!(cell.count(), 5);
            assert!(!cell.is_collapsed());
        }
    }

    #[test]
    fn test_get_out_of_bounds() {
        let grid = Grid::new(2, 2, 2, false, 1);
        assert!(grid.get(2, 0, 0).is_none());
        assert!(grid.get(0, 2, 0).is_none());
        assert!(grid.get(0, 0, 2).is_none());
    }

    #[test]
    fn test_neighbor_finite_edges() {
        let grid = Grid::new(3, 3, 3, false, 1);
        assert_eq!(grid.neighbor((0, 0, 0), Direction::NegX), None);
        assert_eq!(grid.neighbor((2, 0, 0), Direction::PosX), None);
        assert_eq!(grid.neighbor((0, 0, 0), Direction::NegY), None);
        assert_eq!(grid.neighbor((1, 1, 1), Direction::PosZ), Some((1, 1, 2)));
    }

    #[test]
    fn test_neighbor_periodic_wraps() {
        let grid = Grid::new(3, 3, 3, true, 1);
        assert_eq!(grid.neighbor((0, 0, 0), Direction::NegX), Some((2, 0, 0)));
        assert_eq!(grid.neighbor((2, 0, 0), Direction::PosX), Some((0, 0, 0)));
        assert_eq!(grid.neighbor((0, 2, 0), Direction::PosY), Some((0, 0, 0)));
        assert_eq!(grid.neighbor((0, 0, 0), Direction::NegZ), Some((0, 0, 2)));
    }

    #[test]
    fn test_cell_remove_restore() {
        let mut grid = Grid::new(1, 1, 1, false, 3);
        let cell = grid.get_mut(0, 0, 0).unwrap();
        assert!(cell.remove(1));
        assert!(!cell.remove(1));
        assert_eq!(cell.count(), 2);
        cell.restore(1);
        assert_eq!(cell.count(), 3);
    }

    #[test]
    fn test_sole_possibility() {
        let mut grid = Grid::new(1, 1, 1, false, 3);
        let cell = grid.get_mut(0, 0, 0).unwrap();
        assert_eq!(cell.sole_possibility(), None);
        cell.remove(0);
        cell.remove(2);
        assert_eq!(cell.sole_possibility(), Some(1));
    }

    #[test]
    fn test_collapsed_count() {
        let mut grid = Grid::new(2, 1, 1, false, 2);
        assert_eq!(grid.collapsed_count(), 0);
        grid.get_mut(0, 0, 0).unwrap().mark_collapsed(1);
        assert_eq!(grid.collapsed_count(), 1);
    }
}

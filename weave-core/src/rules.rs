//! Precomputed tile-compatibility lookup.
//!
//! Converts the catalog's socket checks into per-(direction, tile) bit rows
//! so propagation pays an O(1) lookup instead of an O(tiles²) socket scan.

use bitvec::prelude::*;
use log::warn;
use weave_tiles::{Direction, TileCatalog};

/// For each `(direction, tileA)`, the set of `tileB` whose socket facing the
/// opposite way is compatible with `tileA`'s socket facing `direction`.
///
/// Derived data: a pure function of the catalog, rebuilt once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    num_tiles: usize,
    /// Rows indexed by `axis * num_tiles + tile`.
    rows: Vec<BitVec>,
}

impl RuleTable {
    /// Builds the table from the catalog with a triple loop over
    /// 6 directions × tileA × tileB.
    pub fn build(catalog: &TileCatalog) -> Self {
        let num_tiles = catalog.len();
        let mut rows = Vec::with_capacity(Direction::ALL.len() * num_tiles);
        for dir in Direction::ALL {
            let opposite = dir.opposite();
            for tile_a in catalog.tiles() {
                let socket_a = tile_a.socket(dir);
                let mut row = bitvec![0; num_tiles];
                for (b, tile_b) in catalog.tiles().iter().enumerate() {
                    if catalog.are_sockets_compatible(socket_a, tile_b.socket(opposite)) {
                        row.set(b, true);
                    }
                }
                rows.push(row);
            }
        }
        Self { num_tiles, rows }
    }

    /// Number of tiles the table covers.
    pub fn num_tiles(&self) -> usize {
        self.num_tiles
    }

    #[inline]
    fn row_index(&self, tile: usize, direction: Direction) -> usize {
        direction.index() * self.num_tiles + tile
    }

    /// The compatibility row for `tile` along `direction`.
    pub fn row(&self, tile: usize, direction: Direction) -> Option<&BitSlice> {
        if tile >= self.num_tiles {
            return None;
        }
        self.rows
            .get(self.row_index(tile, direction))
            .map(BitVec::as_bitslice)
    }

    /// Checks whether `tile_b` may sit one step along `direction` from
    /// `tile_a`. Out-of-range indices are treated as disallowed.
    #[inline]
    pub fn check(&self, tile_a: usize, tile_b: usize, direction: Direction) -> bool {
        if tile_a >= self.num_tiles || tile_b >= self.num_tiles {
            return false;
        }
        self.rows[self.row_index(tile_a, direction)][tile_b]
    }

    /// The union of compatibility rows for every tile set in
    /// `possibilities`: the set of neighbor tiles that at least one source
    /// possibility supports along `direction`.
    pub fn supported(&self, possibilities: &BitSlice, direction: Direction) -> BitVec {
        let mut supported = bitvec![0; self.num_tiles];
        for tile in possibilities.iter_ones() {
            if let Some(row) = self.row(tile, direction) {
                for neighbor in row.iter_ones() {
                    supported.set(neighbor, true);
                }
            }
        }
        supported
    }

    /// Audits the table for directional symmetry: every `A → B` entry along
    /// a direction should have the mirrored `B → A` entry along the
    /// opposite. Asymmetries are logged, not rejected; returns how many
    /// were found.
    pub fn validate(&self) -> usize {
        let mut asymmetries = 0;
        for dir in Direction::ALL {
            for a in 0..self.num_tiles {
                for b in 0..self.num_tiles {
                    if self.check(a, b, dir) && !self.check(b, a, dir.opposite()) {
                        warn!(
                            "Asymmetric rule: tile {a} allows tile {b} along {dir:?} \
                             but not the reverse"
                        );
                        asymmetries += 1;
                    }
                }
            }
        }
        asymmetries
    }
}

//! The tile catalog: owns tiles and sockets, expands rotation variants and
//! validates the authored set before a generation run may use it.

use crate::direction::Direction;
use crate::socket::SocketSet;
use crate::tile::{TileCategory, TileDefinition};
use crate::CatalogError;
use log::debug;
use std::collections::HashSet;

/// Owns tile and socket definitions and answers the compatibility queries
/// the engine builds its rule table from. Long-lived and shared across runs;
/// immutable once validated (rotation expansion happens before validation).
#[derive(Debug, Clone, Default)]
pub struct TileCatalog {
    sockets: SocketSet,
    tiles: Vec<TileDefinition>,
}

impl TileCatalog {
    /// Builds a catalog, rejecting duplicate tile names and non-positive
    /// weights up front. Full validation is a separate, aggregated pass.
    pub fn new(sockets: SocketSet, tiles: Vec<TileDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for tile in &tiles {
            if !seen.insert(tile.name.clone()) {
                return Err(CatalogError::DuplicateTile(tile.name.clone()));
            }
            if tile.weight <= 0.0 {
                return Err(CatalogError::NonPositiveWeight(
                    tile.name.clone(),
                    tile.weight.to_string(),
                ));
            }
        }
        Ok(Self { sockets, tiles })
    }

    /// Number of tiles, rotation variants included.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, index: usize) -> Option<&TileDefinition> {
        self.tiles.get(index)
    }

    pub fn tiles(&self) -> &[TileDefinition] {
        &self.tiles
    }

    pub fn sockets(&self) -> &SocketSet {
        &self.sockets
    }

    /// The authored weight of the tile at `index`.
    pub fn weight(&self, index: usize) -> Option<f32> {
        self.tiles.get(index).map(|t| t.weight)
    }

    /// Index of the tile named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tiles.iter().position(|t| t.name == name)
    }

    /// Indices of all tiles in `category`.
    pub fn tiles_by_category(&self, category: TileCategory) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.category == category)
            .map(|(i, _)| i)
            .collect()
    }

    /// Expands every rotatable tile into three extra variants (90°, 180°,
    /// 270°), appended after the authored tiles. Variants are non-rotatable
    /// and skipped when their name already exists, so the pass is idempotent.
    pub fn generate_rotation_variants(&mut self) {
        let names: HashSet<String> = self.tiles.iter().map(|t| t.name.clone()).collect();
        let mut variants = Vec::new();
        for tile in self.tiles.iter().filter(|t| t.rotatable) {
            for steps in 1..4 {
                let variant = tile.rotation_variant(steps);
                if !names.contains(&variant.name) {
                    variants.push(variant);
                }
            }
        }
        debug!(
            "Rotation expansion added {} variant(s) to {} authored tile(s)",
            variants.len(),
            self.tiles.len()
        );
        self.tiles.append(&mut variants);
    }

    /// Checks whether two facing sockets may sit against each other.
    /// Delegates to the socket set's empty rule and bidirectional lookup.
    pub fn are_sockets_compatible(&self, a: &str, b: &str) -> bool {
        self.sockets.compatible(a, b)
    }

    /// Validates the whole catalog, aggregating every issue found rather
    /// than stopping at the first.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut issues = Vec::new();

        if self.tiles.is_empty() {
            issues.push("catalog defines no tiles".to_owned());
        }

        let mut names = HashSet::new();
        for tile in &self.tiles {
            if !names.insert(tile.name.as_str()) {
                issues.push(format!("duplicate tile name '{}'", tile.name));
            }
            if tile.weight <= 0.0 {
                issues.push(format!(
                    "tile '{}' has non-positive weight {}",
                    tile.name, tile.weight
                ));
            }
            if tile.asset.is_empty() {
                issues.push(format!("tile '{}' has no visual asset", tile.name));
            }
            for dir in Direction::ALL {
                let socket = tile.socket(dir);
                if socket.is_empty() {
                    issues.push(format!(
                        "tile '{}' has a blank socket on face {:?}",
                        tile.name, dir
                    ));
                } else if !self.sockets.contains(socket) {
                    issues.push(format!(
                        "tile '{}' references unknown socket '{}' on face {:?}",
                        tile.name, socket, dir
                    ));
                }
            }
        }

        // Dangling names inside compatibility lists are authoring mistakes
        // too; they would silently never match.
        for socket in self.sockets.iter() {
            for other in &socket.compatible {
                if !self.sockets.contains(other) {
                    issues.push(format!(
                        "socket '{}' lists unknown socket '{}' as compatible",
                        socket.name, other
                    ));
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(issues))
        }
    }
}

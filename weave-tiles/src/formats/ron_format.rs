use crate::formats::FormatParser;
#[cfg(feature = "serde")]
use crate::socket::{SocketDefinition, SocketSet};
#[cfg(feature = "serde")]
use crate::tile::{Rotation, TileCategory, TileDefinition};
use crate::{LoadError, TileCatalog};
#[cfg(feature = "serde")]
use serde::Deserialize;

/// A parser implementation for RON (Rusty Object Notation) format catalogs.
pub struct RonFormatParser;

impl Default for RonFormatParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RonFormatParser {
    /// Creates a new RON format parser
    pub fn new() -> Self {
        Self
    }
}

// --- Structs mirroring the RON format (only needed with serde) ---

#[cfg(feature = "serde")]
#[derive(Debug, Clone, Deserialize)]
struct RonSocketData {
    name: String,
    #[serde(default)]
    compatible: Vec<String>,
    #[serde(default)]
    allow_empty: bool,
}

#[cfg(feature = "serde")]
fn default_weight() -> f32 {
    1.0
}

#[cfg(feature = "serde")]
#[derive(Debug, Clone, Deserialize)]
struct RonTileData {
    /// The unique identifier name for the tile.
    name: String,
    #[serde(default)]
    category: TileCategory,
    /// Socket names in axis order: `+x, -x, +y, -y, +z, -z`.
    sockets: Vec<String>,
    /// The weight associated with this tile, influencing its selection
    /// probability.
    #[serde(default = "default_weight")]
    weight: f32,
    #[serde(default)]
    rotatable: bool,
    #[serde(default)]
    max_instances: Option<u32>,
    #[serde(default)]
    requires_support: bool,
    asset: String,
}

/// Represents the top-level structure of a catalog file in RON format.
/// Used internally for deserialization.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Deserialize)]
struct RonCatalogFile {
    /// Socket definitions referenced by the tiles.
    sockets: Vec<RonSocketData>,
    /// A list defining all available tiles.
    tiles: Vec<RonTileData>,
}

// Implement the FormatParser trait
impl FormatParser for RonFormatParser {
    fn format_name(&self) -> &'static str {
        "Rusty Object Notation (RON)"
    }

    #[cfg(feature = "serde")]
    fn parse(&self, ron_content: &str) -> Result<TileCatalog, LoadError> {
        // 1. Deserialize the RON string
        let catalog_file: RonCatalogFile = ron::from_str(ron_content)
            .map_err(|e| LoadError::Parse(format!("RON deserialization failed: {e}")))?;

        if catalog_file.tiles.is_empty() {
            return Err(LoadError::InvalidData("No tiles defined.".to_owned()));
        }

        // 2. Build the socket set, rejecting duplicates
        let mut sockets = SocketSet::new();
        for socket_data in catalog_file.sockets {
            sockets
                .insert(SocketDefinition {
                    name: socket_data.name,
                    compatible: socket_data.compatible,
                    allow_empty: socket_data.allow_empty,
                })
                .map_err(LoadError::from)?;
        }

        // 3. Convert tile entries, enforcing the six-face socket array
        let mut tiles = Vec::with_capacity(catalog_file.tiles.len());
        for tile_data in catalog_file.tiles {
            let socket_array: [String; 6] =
                tile_data.sockets.try_into().map_err(|got: Vec<String>| {
                    LoadError::InvalidData(format!(
                        "Tile '{}' must define exactly 6 sockets, found {}",
                        tile_data.name,
                        got.len()
                    ))
                })?;
            tiles.push(TileDefinition {
                name: tile_data.name,
                category: tile_data.category,
                sockets: socket_array,
                weight: tile_data.weight,
                rotatable: tile_data.rotatable,
                base_rotation: Rotation::R0,
                max_instances: tile_data.max_instances,
                requires_support: tile_data.requires_support,
                asset: tile_data.asset,
            });
        }

        // 4. Build the catalog (duplicate names / bad weights rejected here)
        TileCatalog::new(sockets, tiles).map_err(LoadError::from)
    }

    /// Stub implementation when the `serde` feature is not enabled.
    #[cfg(not(feature = "serde"))]
    fn parse(&self, _ron_content: &str) -> Result<TileCatalog, LoadError> {
        Err(LoadError::InvalidData(
            "serde feature required for RON parsing".to_owned(),
        ))
    }
}

/// Parses a tile catalog defined in a RON (Rusty Object Notation) string.
pub fn parse_ron_catalog(ron_content: &str) -> Result<TileCatalog, LoadError> {
    let parser = RonFormatParser::new();
    parser.parse(ron_content)
}

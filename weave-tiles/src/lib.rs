//! Tile catalog for socket-based 3D tile generation.
//! Defines sockets, tile definitions, rotation variants and catalog validation.

use thiserror::Error;

pub mod catalog;
pub mod direction;
pub mod formats;
pub mod loader;
pub mod socket;
pub mod tile;

pub use catalog::TileCatalog;
pub use direction::Direction;
pub use socket::{SocketDefinition, SocketSet, EMPTY_SOCKET};
pub use tile::{Rotation, TileCategory, TileDefinition};

/// Errors that can occur while building or validating a tile catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A socket definition with the same name was already registered.
    #[error("Duplicate socket definition: {0}")]
    DuplicateSocket(String),
    /// A tile definition with the same name was already registered.
    #[error("Duplicate tile definition: {0}")]
    DuplicateTile(String),
    /// A tile references a socket name with no definition.
    #[error("Tile '{0}' references unknown socket '{1}'")]
    UnknownSocket(String, String),
    /// A tile was authored with a non-positive weight.
    #[error("Tile '{0}' has non-positive weight {1}")]
    NonPositiveWeight(String, String),
    /// Aggregated validation failures, one message per issue.
    #[error("Catalog validation failed with {} issue(s): {}", .0.len(), .0.join("; "))]
    Validation(Vec<String>),
}

/// Errors that can occur while loading a catalog file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error reading file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog format: {0}")]
    Parse(String),
    #[error("Invalid catalog data: {0}")]
    InvalidData(String),
}

impl From<CatalogError> for LoadError {
    fn from(error: CatalogError) -> Self {
        Self::InvalidData(format!("Catalog error: {error}"))
    }
}

//! File loading entry point for tile catalogs.

use crate::formats::{ron_format::RonFormatParser, FormatParser};
use crate::{LoadError, TileCatalog};
use log::info;
use std::fs;
use std::path::Path;

/// Loads, validates and optionally rotation-expands a tile catalog from a
/// RON file.
///
/// # Arguments
///
/// * `path` - The path to the catalog definition file.
/// * `expand_rotations` - Whether to synthesize the 90°/180°/270° variants
///   of rotatable tiles after parsing.
///
/// # Returns
///
/// A `Result` containing the loaded `TileCatalog` on success, or a
/// `LoadError` on failure.
pub fn load_catalog_from_file(
    path: &Path,
    expand_rotations: bool,
) -> Result<TileCatalog, LoadError> {
    let content = fs::read_to_string(path)?;
    let parser = RonFormatParser::new();
    let mut catalog = parser.parse(&content)?;

    if expand_rotations {
        catalog.generate_rotation_variants();
    }
    catalog.validate().map_err(LoadError::from)?;

    info!(
        "Loaded catalog from {:?}: {} tile(s), {} socket definition(s) [{}]",
        path,
        catalog.len(),
        catalog.sockets().len(),
        parser.format_name()
    );
    Ok(catalog)
}

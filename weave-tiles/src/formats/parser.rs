use crate::{LoadError, TileCatalog};

/// Trait defining the interface for format-specific catalog parsers.
///
/// Implementors of this trait can parse tile catalogs from different file
/// formats (e.g., RON, JSON, or custom binary formats).
pub trait FormatParser {
    /// Parses catalog content into a `TileCatalog`.
    ///
    /// # Arguments
    ///
    /// * `content` - A string slice containing the catalog content
    ///
    /// # Returns
    ///
    /// * `Ok(TileCatalog)` - Successfully parsed catalog
    /// * `Err(LoadError)` - Error encountered during parsing
    fn parse(&self, content: &str) -> Result<TileCatalog, LoadError>;

    /// Returns a descriptive name for this parser format.
    ///
    /// This can be used for debugging, logging, or user-facing error messages.
    fn format_name(&self) -> &'static str;
}

//! Colored terminal rendering of generated layers.

use colored::{ColoredString, Colorize};
use weave_core::GenerationResult;
use weave_tiles::{TileCatalog, TileCategory};

fn glyph(catalog: &TileCatalog, tile: usize) -> ColoredString {
    let Some(def) = catalog.tile(tile) else {
        return "?".red();
    };
    let initial = def
        .name
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_else(|| "#".to_owned());
    let initial = initial.as_str();
    match def.category {
        TileCategory::Empty => initial.dimmed(),
        TileCategory::Ground => initial.green(),
        TileCategory::Wall => initial.yellow(),
        TileCategory::Structure => initial.blue(),
        TileCategory::Decoration => initial.magenta(),
    }
}

/// Prints every Y layer of the result as colored rows of tile initials.
/// Uncollapsed cells render as a red `?`.
pub fn render_terminal(
    result: &GenerationResult,
    catalog: &TileCatalog,
    dims: (usize, usize, usize),
) {
    let (width, height, depth) = dims;
    for y in 0..height {
        println!("--- layer y={y} ---");
        for z in 0..depth {
            let mut row = String::new();
            for x in 0..width {
                let cell = match result.tile_at((x, y, z)) {
                    Some(tile) => glyph(catalog, tile),
                    None => "?".red(),
                };
                row.push_str(&cell.to_string());
                row.push(' ');
            }
            println!("{row}");
        }
        println!();
    }
}

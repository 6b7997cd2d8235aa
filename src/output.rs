use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use weave_core::GenerationResult;
use weave_tiles::TileCatalog;

#[derive(Serialize)]
struct JsonAssignment<'a> {
    x: usize,
    y: usize,
    z: usize,
    tile: usize,
    name: &'a str,
}

/// JSON shape of a saved run, stable for downstream tooling.
#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    error: Option<&'a str>,
    width: usize,
    height: usize,
    depth: usize,
    iterations: u64,
    collapsed: u64,
    elapsed_ms: u128,
    assignments: Vec<JsonAssignment<'a>>,
    failed_positions: &'a [(usize, usize, usize)],
}

/// Saves the assignment map as one JSON document.
pub fn save_result_to_json(
    result: &GenerationResult,
    catalog: &TileCatalog,
    dims: (usize, usize, usize),
    output_path: &Path,
) -> Result<()> {
    let (width, height, depth) = dims;
    let mut assignments: Vec<JsonAssignment> = result
        .assignments
        .iter()
        .map(|(&(x, y, z), &tile)| JsonAssignment {
            x,
            y,
            z,
            tile,
            name: catalog.tile(tile).map_or("", |t| t.name.as_str()),
        })
        .collect();
    assignments.sort_by_key(|a| (a.z, a.y, a.x));

    let report = JsonReport {
        success: result.success,
        error: result.error.as_deref(),
        width,
        height,
        depth,
        iterations: result.iterations,
        collapsed: result.collapsed,
        elapsed_ms: result.elapsed.as_millis(),
        assignments,
        failed_positions: &result.failed_positions,
    };

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {:?}", output_path))?;
    serde_json::to_writer_pretty(io::BufWriter::new(file), &report)
        .context("Failed to serialize result to JSON")?;
    log::info!("Successfully saved JSON result to {:?}", output_path);
    Ok(())
}

/// Saves the assignment map to a file in a simple text format.
///
/// Format: a legend mapping tile indices to names, then space-separated
/// tile indices along X, one row per Z line, blank line per Y layer.
/// Uncollapsed cells are written as `.`.
pub fn save_result_to_file(
    result: &GenerationResult,
    catalog: &TileCatalog,
    dims: (usize, usize, usize),
    output_path: &Path,
) -> Result<()> {
    log::info!("Attempting to save result to {:?}...", output_path);
    let (width, height, depth) = dims;

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {:?}", output_path))?;
    let mut writer = io::BufWriter::new(file);

    writeln!(writer, "# grid-weave assignment map {width}x{height}x{depth}")?;
    for (index, tile) in catalog.tiles().iter().enumerate() {
        writeln!(writer, "# {index} = {} ({})", tile.name, tile.asset)?;
    }
    writeln!(writer)?;

    for y in 0..height {
        if y > 0 {
            // Separator between Y layers
            writeln!(writer)?;
        }
        for z in 0..depth {
            let mut line = String::new();
            for x in 0..width {
                if x > 0 {
                    line.push(' ');
                }
                match result.tile_at((x, y, z)) {
                    Some(tile) => line.push_str(&tile.to_string()),
                    None => line.push('.'),
                }
            }
            writeln!(writer, "{}", line)
                .with_context(|| format!("Failed to write line for coords (:, {}, {})", y, z))?;
        }
    }

    writer
        .flush()
        .context("Failed to flush writer for output file")?;
    log::info!("Successfully saved result to {:?}", output_path);

    Ok(())
}

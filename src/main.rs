pub mod config;
pub mod logging;
pub mod output;
pub mod viz;

use anyhow::{Context, Result};
use clap::Parser;
use config::{AppConfig, OutputFormat, VisualizationMode};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use weave_core::{GenerationConfig, Solver};
use weave_tiles::loader::load_catalog_from_file;

fn main() -> Result<()> {
    // Parse command-line arguments, then merge file/env overrides.
    let mut app_config = AppConfig::parse();
    app_config
        .apply_overrides()
        .context("Failed to apply configuration overrides")?;

    logging::init_logger(&app_config);
    log::info!("grid-weave starting");
    log::debug!("Loaded config: {:?}", app_config);

    // Load the tile catalog.
    log::info!("Loading catalog from: {:?}", app_config.catalog_file);
    let catalog = load_catalog_from_file(&app_config.catalog_file, !app_config.no_rotations)
        .map_err(|e| anyhow::anyhow!(e))?;
    log::info!(
        "Catalog loaded: {} tile(s), {} socket definition(s)",
        catalog.len(),
        catalog.sockets().len()
    );

    // Build the generation configuration.
    let generation_config = GenerationConfig::builder()
        .size(app_config.width, app_config.height, app_config.depth)
        .periodic(app_config.periodic)
        .mode(app_config.mode.into())
        .max_iterations(app_config.max_iterations)
        .seed(app_config.seed)
        .backtracking(app_config.backtracking, app_config.backtracking_depth)
        .build();

    let catalog = Arc::new(catalog);
    let mut solver =
        Solver::new(catalog.clone(), generation_config).context("Solver initialization failed")?;

    // Throttled progress reporting through the solver callback.
    if let Some(interval) = app_config.progress_interval {
        let last_report = Mutex::new(Instant::now());
        solver.set_progress_callback(Box::new(move |info| {
            let mut last = match last_report.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if last.elapsed() >= interval {
                *last = Instant::now();
                log::info!(
                    "Progress: {}/{} cells collapsed, iteration {}, elapsed {:?}",
                    info.collapsed_cells,
                    info.total_cells,
                    info.iterations,
                    info.elapsed
                );
            }
        }));
    }

    log::info!(
        "Generating {}x{}x{} grid (seed {}, mode {:?})",
        app_config.width,
        app_config.height,
        app_config.depth,
        app_config.seed,
        app_config.mode
    );
    let result = solver.generate();

    log::info!(
        "Run finished: success={}, {} assignment(s), {} failed position(s), \
         {} iteration(s), {} collapse(s), {:?}",
        result.success,
        result.assignments.len(),
        result.failed_positions.len(),
        result.iterations,
        result.collapsed,
        result.elapsed
    );

    let dims = (app_config.width, app_config.height, app_config.depth);
    match app_config.output_format {
        OutputFormat::Text => {
            output::save_result_to_file(&result, &catalog, dims, &app_config.output_path)?;
        }
        OutputFormat::Json => {
            output::save_result_to_json(&result, &catalog, dims, &app_config.output_path)?;
        }
    }

    if app_config.visualization_mode == VisualizationMode::Terminal {
        viz::render_terminal(&result, &catalog, dims);
    }

    if result.success {
        Ok(())
    } else {
        let reason = result.error.unwrap_or_else(|| "incomplete result".to_owned());
        anyhow::bail!("generation failed: {reason}")
    }
}

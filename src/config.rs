use clap::{Parser, ValueEnum};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use weave_core::GenerationMode;

/// Represents the different visualization modes available.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq)]
pub enum VisualizationMode {
    #[default]
    None,
    /// Colored per-layer text output on the terminal.
    Terminal,
}

/// On-disk formats for the assignment map.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    /// Legend plus rows of tile indices.
    #[default]
    Text,
    /// One JSON document with assignments and diagnostics.
    Json,
}

/// Selection heuristic names accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum ModeArg {
    #[default]
    MinEntropy,
    GroundFirst,
    LayeredBottomUp,
    CenterOutward,
}

impl From<ModeArg> for GenerationMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::MinEntropy => Self::MinEntropy,
            ModeArg::GroundFirst => Self::GroundFirst,
            ModeArg::LayeredBottomUp => Self::LayeredBottomUp,
            ModeArg::CenterOutward => Self::CenterOutward,
        }
    }
}

/// Global log level for the application.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum GlobalLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Configuration for the grid-weave CLI.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Path to the RON catalog file defining sockets and tiles.
    #[arg(short, long, value_name = "FILE")]
    pub catalog_file: PathBuf,

    /// Optional TOML file with overrides, merged with `GRID_WEAVE_*`
    /// environment variables.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Width of the output grid (X).
    #[arg(long, default_value_t = 8)]
    pub width: usize,

    /// Height of the output grid (Y, vertical).
    #[arg(long, default_value_t = 8)]
    pub height: usize,

    /// Depth of the output grid (Z).
    #[arg(long, default_value_t = 8)]
    pub depth: usize,

    /// Wrap the grid at its boundaries (toroidal topology).
    #[arg(long, default_value_t = false)]
    pub periodic: bool,

    /// Seed for the deterministic random stream.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Cell selection heuristic.
    #[arg(long, value_enum, default_value_t = ModeArg::MinEntropy)]
    pub mode: ModeArg,

    /// Iteration cap for the main loop; 0 selects 10x the cell count.
    #[arg(long, default_value_t = 0)]
    pub max_iterations: u64,

    /// Enable bounded backtracking on contradictions.
    #[arg(long, default_value_t = false)]
    pub backtracking: bool,

    /// Number of undo levels retained for backtracking.
    #[arg(long, default_value_t = 8)]
    pub backtracking_depth: usize,

    /// Skip synthesizing rotation variants of rotatable tiles.
    #[arg(long, default_value_t = false)]
    pub no_rotations: bool,

    /// Path to save the generated assignment map.
    #[arg(short, long, value_name = "FILE", default_value = "output.txt")]
    pub output_path: PathBuf,

    /// Format of the saved assignment map.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Report progress at most every specified interval (e.g. "1s",
    /// "500ms").
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub progress_interval: Option<Duration>,

    /// Choose the visualization mode.
    #[arg(long, value_enum, default_value_t = VisualizationMode::None)]
    pub visualization_mode: VisualizationMode,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, value_enum, default_value_t = GlobalLogLevel::Info)]
    pub log_level: GlobalLogLevel,
}

/// Optional overrides read from the TOML file / environment overlay.
/// Every field is optional; present values replace the CLI ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileOverrides {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub depth: Option<usize>,
    pub periodic: Option<bool>,
    pub seed: Option<u64>,
    pub max_iterations: Option<u64>,
    pub backtracking: Option<bool>,
    pub backtracking_depth: Option<usize>,
}

impl AppConfig {
    /// Merges the TOML config file (when given) and `GRID_WEAVE_*`
    /// environment variables over the parsed CLI arguments.
    pub fn apply_overrides(&mut self) -> Result<(), figment::Error> {
        let mut figment = Figment::new();
        if let Some(path) = &self.config {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("GRID_WEAVE_"));
        let overrides: FileOverrides = figment.extract()?;

        if let Some(width) = overrides.width {
            self.width = width;
        }
        if let Some(height) = overrides.height {
            self.height = height;
        }
        if let Some(depth) = overrides.depth {
            self.depth = depth;
        }
        if let Some(periodic) = overrides.periodic {
            self.periodic = periodic;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(max_iterations) = overrides.max_iterations {
            self.max_iterations = max_iterations;
        }
        if let Some(backtracking) = overrides.backtracking {
            self.backtracking = backtracking;
        }
        if let Some(depth) = overrides.backtracking_depth {
            self.backtracking_depth = depth;
        }
        Ok(())
    }
}

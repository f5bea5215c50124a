// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use astrometry_client::{ClientConfig, ScaleUnits, SolveOptions, SolverClient};

/// Command line plate-solver built on a containerized astrometry.net.
#[derive(Debug, Parser)]
#[command(name = "astro-cli", version, about)]
struct Args {
    /// Path to the image file to solve.
    #[arg(long)]
    image: PathBuf,

    /// Path to the astrometry index files on the host.
    #[arg(long)]
    index_path: Option<PathBuf>,

    /// Optional JSON config file; command line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower bound of the image scale (0 omits the bound).
    #[arg(long, default_value_t = 0.0)]
    scale_low: f64,

    /// Upper bound of the image scale (0 omits the bound).
    #[arg(long, default_value_t = 0.0)]
    scale_high: f64,

    /// Units for the scale bounds.
    #[arg(long, value_enum, default_value_t = ScaleUnits::ArcMinWidth)]
    scale_units: ScaleUnits,

    /// Downsample factor applied before source extraction.
    #[arg(long, default_value_t = 2)]
    downsample: u32,

    /// RA position hint in degrees.
    #[arg(long, default_value_t = 0.0)]
    ra: f64,

    /// Dec position hint in degrees.
    #[arg(long, default_value_t = 0.0)]
    dec: f64,

    /// Search radius around the position hint, in degrees.
    #[arg(long, default_value_t = 0.0)]
    radius: f64,

    /// Solve timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Pass verbose output through from solve-field.
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Keep the per-solve scratch directory for debugging.
    #[arg(long, default_value_t = false)]
    keep_temp_files: bool,
}

/// JSON shape written to stdout. Zero-valued fields from unsolved images
/// are omitted.
#[derive(Serialize)]
struct SolveOutput {
    solved: bool,
    #[serde(skip_serializing_if = "is_zero")]
    ra: f64,
    #[serde(skip_serializing_if = "is_zero")]
    dec: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pixel_scale: f64,
    #[serde(skip_serializing_if = "is_zero")]
    rotation: f64,
    #[serde(skip_serializing_if = "is_zero")]
    field_width: f64,
    #[serde(skip_serializing_if = "is_zero")]
    field_height: f64,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    solve_time: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    output_files: Vec<String>,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    wcs_header: std::collections::HashMap<String, String>,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ClientConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e.message);
                std::process::exit(1);
            }
        },
        None => ClientConfig::default(),
    };
    if let Some(index_path) = &args.index_path {
        config.index_path = index_path.clone();
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }

    let client = match SolverClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating client: {}", e.message);
            std::process::exit(1);
        }
    };

    let opts = SolveOptions {
        scale_low: args.scale_low,
        scale_high: args.scale_high,
        scale_units: args.scale_units,
        downsample_factor: args.downsample,
        ra: args.ra,
        dec: args.dec,
        radius: args.radius,
        verbose: args.verbose,
        keep_temp_files: args.keep_temp_files,
        ..SolveOptions::default()
    };

    let result = match client.solve(&args.image, &opts) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error solving image: {}", e.message);
            std::process::exit(1);
        }
    };

    let output = SolveOutput {
        solved: result.solved,
        ra: result.ra,
        dec: result.dec,
        pixel_scale: result.pixel_scale,
        rotation: result.rotation,
        field_width: result.field_width,
        field_height: result.field_height,
        solve_time: result.solve_time.map(|d| d.as_secs_f64()),
        output_files: result
            .output_files
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        wcs_header: result.wcs_header.clone(),
    };
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error encoding JSON: {}", e);
            std::process::exit(1);
        }
    }

    if !result.solved {
        std::process::exit(1);
    }
}

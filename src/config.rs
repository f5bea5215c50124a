// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Client configuration and per-solve options.

use std::path::PathBuf;
use std::time::Duration;

use canonical_error::{failed_precondition_error, invalid_argument_error, CanonicalError};
use serde::{Deserialize, Serialize};

/// Default Docker image used for plate-solving. Compatible images:
/// "dm90/astrometry", "diarmuidk/astrometry-dockerised-solver",
/// "ghcr.io/diarmuidkelly/astrometry-dockerised-solver".
pub const DEFAULT_DOCKER_IMAGE: &str = "diarmuidk/astrometry-dockerised-solver";

/// Default maximum duration for a solve operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Configuration for a [`SolverClient`](crate::solver::SolverClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Docker image to run solve-field in.
    pub docker_image: String,

    /// Host path to the astrometry index files; mounted into the container.
    /// Required.
    pub index_path: PathBuf,

    /// Working directory for images and output files. Empty means the
    /// system temp directory.
    pub temp_dir: PathBuf,

    /// Maximum duration for the solve operation, in whole seconds.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Use `docker exec` on an existing long-running container instead of
    /// spawning a new one per solve. Faster for repeated solves; requires
    /// `container_name`.
    pub use_docker_exec: bool,

    /// Name of the running container; only used with `use_docker_exec`.
    pub container_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            docker_image: DEFAULT_DOCKER_IMAGE.to_string(),
            index_path: PathBuf::new(),
            temp_dir: PathBuf::new(),
            timeout: DEFAULT_TIMEOUT,
            use_docker_exec: false,
            container_name: String::new(),
        }
    }
}

impl ClientConfig {
    /// Loads a ClientConfig from a JSON file. Fields omitted from the file
    /// take their defaults.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, CanonicalError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            failed_precondition_error(
                format!("Failed to read config file {}: {}", path.display(), e).as_str(),
            )
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            invalid_argument_error(
                format!("Invalid config file {}: {}", path.display(), e).as_str(),
            )
        })
    }
}

/// Units for the solve-field scale bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScaleUnits {
    /// Field width in degrees.
    DegWidth,
    /// Field width in arcminutes.
    ArcMinWidth,
    /// Arcseconds per pixel.
    ArcSecPerPix,
}

impl ScaleUnits {
    /// The spelling solve-field expects for its `-u` flag.
    pub fn as_arg(&self) -> &'static str {
        match self {
            ScaleUnits::DegWidth => "degwidth",
            ScaleUnits::ArcMinWidth => "arcminwidth",
            ScaleUnits::ArcSecPerPix => "arcsecperpix",
        }
    }
}

impl std::fmt::Display for ScaleUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

/// Parameters for a single plate-solving operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Lower bound of the image scale, in `scale_units`. Bounds are passed
    /// to solve-field only when both are positive.
    pub scale_low: f64,

    /// Upper bound of the image scale, in `scale_units`.
    pub scale_high: f64,

    /// Units for the scale bounds.
    pub scale_units: ScaleUnits,

    /// Downsample the image by this factor before solving. Higher is
    /// faster but less accurate.
    pub downsample_factor: u32,

    /// Minimum and maximum number of field quads to try.
    pub depth_low: u32,
    pub depth_high: u32,

    /// Disable generation of plot files.
    pub no_plots: bool,

    /// RA/Dec search hint, degrees (J2000). No hint when both are zero.
    pub ra: f64,
    pub dec: f64,

    /// Search radius around the hint, degrees.
    pub radius: f64,

    /// Allow overwriting existing output files.
    pub overwrite_existing: bool,

    /// Enable verbose solve-field output.
    pub verbose: bool,

    /// Preserve the scratch directory and all solve output files, for
    /// debugging.
    pub keep_temp_files: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            scale_low: 0.0,
            scale_high: 0.0,
            scale_units: ScaleUnits::ArcMinWidth,
            downsample_factor: 2,
            depth_low: 10,
            depth_high: 20,
            no_plots: true,
            ra: 0.0,
            dec: 0.0,
            radius: 0.0,
            overwrite_existing: false,
            verbose: false,
            keep_temp_files: false,
        }
    }
}

// Serializes Duration as integer seconds, the natural form for a hand-
// edited config file.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

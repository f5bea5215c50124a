// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod astro_util;
pub mod config;
pub mod fov;
pub mod solver;
pub mod wcs;

pub use config::{ClientConfig, ScaleUnits, SolveOptions};
pub use solver::SolverClient;
pub use wcs::PlateSolution;

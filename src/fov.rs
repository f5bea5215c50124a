// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Field of view calculations, camera sensor detection, and astrometry
//! index file recommendation.
//!
//! Plate-solving is much faster with a scale hint, and which index files
//! are worth downloading depends on the field width. This module derives
//! the angular field of view from a focal length and sensor size, matches
//! camera model strings against known sensor dimensions, and recommends
//! the 4100-series index files that bracket a given field.

use std::fmt;

use crate::astro_util::fov_degrees;

/// Physical dimensions of a camera sensor, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSize {
    pub width_mm: f64,
    pub height_mm: f64,
    pub name: &'static str,
}

pub const FULL_FRAME: SensorSize = SensorSize {
    width_mm: 36.0,
    height_mm: 24.0,
    name: "Full Frame (35mm)",
};
pub const APS_C_CANON: SensorSize = SensorSize {
    width_mm: 22.3,
    height_mm: 14.9,
    name: "APS-C Canon",
};
pub const APS_C_NIKON: SensorSize = SensorSize {
    width_mm: 23.6,
    height_mm: 15.7,
    name: "APS-C Nikon/Sony",
};
pub const APS_C_FUJI: SensorSize = SensorSize {
    width_mm: 23.5,
    height_mm: 15.6,
    name: "APS-C Fujifilm",
};
pub const MICRO_FOUR_THIRDS: SensorSize = SensorSize {
    width_mm: 17.3,
    height_mm: 13.0,
    name: "Micro Four Thirds",
};
pub const ONE_INCH: SensorSize = SensorSize {
    width_mm: 13.2,
    height_mm: 8.8,
    name: "1\" sensor",
};

/// The angular field of view of an imaging setup.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldOfView {
    pub width_degrees: f64,
    pub height_degrees: f64,
    pub width_arcmin: f64,
    pub height_arcmin: f64,
    pub diagonal_degrees: f64,
}

impl fmt::Display for FieldOfView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}° x {:.2}° ({:.1}' x {:.1}')",
            self.width_degrees, self.height_degrees, self.width_arcmin, self.height_arcmin
        )
    }
}

/// Calculates the field of view for a focal length (mm) and sensor size.
/// Each axis subtends 2*atan(dimension / (2*focal_length)).
pub fn calculate_fov(focal_length_mm: f64, sensor: SensorSize) -> FieldOfView {
    let width_degrees = fov_degrees(sensor.width_mm, focal_length_mm);
    let height_degrees = fov_degrees(sensor.height_mm, focal_length_mm);
    let diagonal_mm =
        (sensor.width_mm * sensor.width_mm + sensor.height_mm * sensor.height_mm).sqrt();
    FieldOfView {
        width_degrees,
        height_degrees,
        width_arcmin: width_degrees * 60.0,
        height_arcmin: height_degrees * 60.0,
        diagonal_degrees: fov_degrees(diagonal_mm, focal_length_mm),
    }
}

/// FOV range of a zoom lens: (narrowest, at max focal length; widest, at
/// min focal length).
pub fn calculate_fov_range(
    min_focal_length_mm: f64,
    max_focal_length_mm: f64,
    sensor: SensorSize,
) -> (FieldOfView, FieldOfView) {
    (
        calculate_fov(max_focal_length_mm, sensor),
        calculate_fov(min_focal_length_mm, sensor),
    )
}

/// How a sensor size was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    /// Matched a known camera model pattern.
    Exif,
    /// No match; fell back to the most common sensor size.
    Default,
}

struct CameraMapping {
    /// Substring to match in the uppercased camera model.
    pattern: &'static str,
    sensor: SensorSize,
}

// Model-to-sensor tables, first match wins. Ordering matters: longer or
// more specific patterns must precede their prefixes (e.g. "EOS R5 MARK II"
// before "EOS R5", Nikon "D3500" before "D3 ").
//
// Sources: Wikipedia APS-C / full-frame DSLR / full-frame mirrorless /
// 4/3-type camera category lists.

const CANON_MAPPINGS: &[CameraMapping] = &[
    // Full frame mirrorless.
    CameraMapping { pattern: "EOS C50", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS R1", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS R3", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS R5 MARK II", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS R5", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS R6 MARK II", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS R6", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS R8", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS RA", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS RP", sensor: FULL_FRAME },
    // Full frame DSLR.
    CameraMapping { pattern: "EOS-1D C", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS-1D X MARK III", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS-1D X MARK II", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS-1D X", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS-1DS MARK III", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS-1DS MARK II", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS-1DS", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS 5D MARK IV", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS 5D MARK III", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS 5D MARK II", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS 5DS", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS 5D", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS 6D MARK II", sensor: FULL_FRAME },
    CameraMapping { pattern: "EOS 6D", sensor: FULL_FRAME },
    // APS-C.
    CameraMapping { pattern: "EOS M", sensor: APS_C_CANON },
    CameraMapping { pattern: "EOS R7", sensor: APS_C_CANON },
    CameraMapping { pattern: "EOS R10", sensor: APS_C_CANON },
    CameraMapping { pattern: "EOS M5", sensor: APS_C_CANON },
    CameraMapping { pattern: "EOS 7D", sensor: APS_C_CANON },
    CameraMapping { pattern: "EOS 77D", sensor: APS_C_CANON },
    CameraMapping { pattern: "EOS 80D", sensor: APS_C_CANON },
    CameraMapping { pattern: "EOS 90D", sensor: APS_C_CANON },
    CameraMapping { pattern: "REBEL", sensor: APS_C_CANON },
    CameraMapping { pattern: "KISS", sensor: APS_C_CANON },
];

const NIKON_MAPPINGS: &[CameraMapping] = &[
    // APS-C, checked first to prevent false matches against the
    // full-frame patterns below.
    CameraMapping { pattern: "Z FC", sensor: APS_C_NIKON },
    CameraMapping { pattern: "Z 50", sensor: APS_C_NIKON },
    CameraMapping { pattern: "Z50", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D7500", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D7200", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D7100", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D5600", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D5500", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D5300", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D3500", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D3400", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D3300", sensor: APS_C_NIKON },
    CameraMapping { pattern: "D500", sensor: APS_C_NIKON },
    // Full frame mirrorless, with and without the space variants.
    CameraMapping { pattern: "Z 5 II", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z5II", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 5", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z5", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 6 III", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z6III", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 6 II", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z6II", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 6", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z6", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 7 II", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z7II", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 7", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z7", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 8", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z8", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z 9", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z9", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z F", sensor: FULL_FRAME },
    CameraMapping { pattern: "ZF", sensor: FULL_FRAME },
    CameraMapping { pattern: "Z R", sensor: FULL_FRAME },
    CameraMapping { pattern: "ZR", sensor: FULL_FRAME },
    // Full frame DSLR. Trailing spaces keep short model numbers from
    // matching inside longer ones (D3 vs D3500).
    CameraMapping { pattern: "D3S", sensor: FULL_FRAME },
    CameraMapping { pattern: "D3X", sensor: FULL_FRAME },
    CameraMapping { pattern: "D3 ", sensor: FULL_FRAME },
    CameraMapping { pattern: "D4S", sensor: FULL_FRAME },
    CameraMapping { pattern: "D4 ", sensor: FULL_FRAME },
    CameraMapping { pattern: "D5 ", sensor: FULL_FRAME },
    CameraMapping { pattern: "D6 ", sensor: FULL_FRAME },
    CameraMapping { pattern: "D600", sensor: FULL_FRAME },
    CameraMapping { pattern: "D610", sensor: FULL_FRAME },
    CameraMapping { pattern: "D700", sensor: FULL_FRAME },
    CameraMapping { pattern: "D750 ", sensor: FULL_FRAME },
    CameraMapping { pattern: "D780", sensor: FULL_FRAME },
    CameraMapping { pattern: "D800", sensor: FULL_FRAME },
    CameraMapping { pattern: "D810A", sensor: FULL_FRAME },
    CameraMapping { pattern: "D810", sensor: FULL_FRAME },
    CameraMapping { pattern: "D850", sensor: FULL_FRAME },
    CameraMapping { pattern: "DF ", sensor: FULL_FRAME },
];

const SONY_MAPPINGS: &[CameraMapping] = &[
    // Full frame mirrorless (ILCE internal codes).
    CameraMapping { pattern: "ILCE-1", sensor: FULL_FRAME },
    CameraMapping { pattern: "A1", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7M5", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7M4", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7M3", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7M2", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7RM5", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7RM4", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7RM3", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7RM2", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7SM3", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-7SM2", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-9M3", sensor: FULL_FRAME },
    CameraMapping { pattern: "ILCE-9", sensor: FULL_FRAME },
    CameraMapping { pattern: "FX3", sensor: FULL_FRAME },
    CameraMapping { pattern: "FX6", sensor: FULL_FRAME },
    // Full frame DSLR/SLT.
    CameraMapping { pattern: "ALPHA 99", sensor: FULL_FRAME },
    CameraMapping { pattern: "ALPHA 850", sensor: FULL_FRAME },
    CameraMapping { pattern: "ALPHA 900", sensor: FULL_FRAME },
    CameraMapping { pattern: "A99", sensor: FULL_FRAME },
    // APS-C.
    CameraMapping { pattern: "ILCE-6", sensor: APS_C_NIKON },
    CameraMapping { pattern: "A6", sensor: APS_C_NIKON },
    CameraMapping { pattern: "ZV-E10", sensor: APS_C_NIKON },
];

const OLYMPUS_MAPPINGS: &[CameraMapping] = &[
    // OM-D series.
    CameraMapping { pattern: "E-M1X", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M1 MARK III", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M1 MARK II", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M5 MARK III", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M5 MARK II", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M10 MARK IV", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M10 MARK III", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M10 MARK II", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-M10", sensor: MICRO_FOUR_THIRDS },
    // OM System.
    CameraMapping { pattern: "OM-1 MARK II", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "OM-1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "OM-3", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "OM-5", sensor: MICRO_FOUR_THIRDS },
    // E-series.
    CameraMapping { pattern: "E-1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-3", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-30", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-300", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-330", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-400", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-410", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-420", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-450", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-500", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-510", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-520", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-620", sensor: MICRO_FOUR_THIRDS },
    // PEN series.
    CameraMapping { pattern: "PEN-F", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-P1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-P2", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-P3", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-P5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-P7", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PL1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PL2", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PL3", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PL5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PL6", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PL7", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PL9", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PM1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "E-PM2", sensor: MICRO_FOUR_THIRDS },
];

const PANASONIC_MAPPINGS: &[CameraMapping] = &[
    CameraMapping { pattern: "DC-G9 II", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DC-G9", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DC-GH6", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DC-GH5S", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DC-GH5M2", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DC-GH5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DC-GX850", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DC-GX800", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G85", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G80", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G10", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G7", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G6", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G3", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G2", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-G1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GF7", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GF6", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GF5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GF3", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GF2", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GF1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GH4", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GH3", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GH2", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GH1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GM5", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GM1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GX8", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GX7", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-GX1", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-L10", sensor: MICRO_FOUR_THIRDS },
    CameraMapping { pattern: "DMC-L1", sensor: MICRO_FOUR_THIRDS },
];

fn match_mapping(mappings: &[CameraMapping], model_upper: &str) -> Option<SensorSize> {
    mappings
        .iter()
        .find(|m| model_upper.contains(m.pattern))
        .map(|m| m.sensor)
}

/// Identifies the sensor size from camera make and model strings (as found
/// in EXIF tags). Matching is first-match-wins against the per-maker
/// tables; unknown cameras default to the most common APS-C size.
pub fn detect_sensor(make: &str, model: &str) -> (SensorSize, DetectionSource) {
    let make_upper = make.to_uppercase();
    let model_upper = model.to_uppercase();

    if make_upper.contains("CANON") {
        if let Some(sensor) = match_mapping(CANON_MAPPINGS, &model_upper) {
            return (sensor, DetectionSource::Exif);
        }
    }
    if make_upper.contains("NIKON") {
        if let Some(sensor) = match_mapping(NIKON_MAPPINGS, &model_upper) {
            return (sensor, DetectionSource::Exif);
        }
    }
    if make_upper.contains("SONY") {
        if let Some(sensor) = match_mapping(SONY_MAPPINGS, &model_upper) {
            return (sensor, DetectionSource::Exif);
        }
    }
    if make_upper.contains("OLYMPUS") || make_upper.contains("OM SYSTEM") {
        if let Some(sensor) = match_mapping(OLYMPUS_MAPPINGS, &model_upper) {
            return (sensor, DetectionSource::Exif);
        }
        // Everything Olympus/OM System is Micro Four Thirds.
        return (MICRO_FOUR_THIRDS, DetectionSource::Exif);
    }
    if make_upper.contains("PANASONIC") {
        if let Some(sensor) = match_mapping(PANASONIC_MAPPINGS, &model_upper) {
            return (sensor, DetectionSource::Exif);
        }
        return (MICRO_FOUR_THIRDS, DetectionSource::Exif);
    }

    (APS_C_NIKON, DetectionSource::Default)
}

/// An astrometry.net index file with its sky-coverage metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexFile {
    pub name: &'static str,
    /// Minimum field width covered, degrees.
    pub min_fov: f64,
    /// Maximum field width covered, degrees.
    pub max_fov: f64,
    pub size_mb: f64,
    pub download_url: &'static str,
}

/// The 4100-series index files, widest to narrowest FOV.
pub const ALL_INDEX_FILES: [IndexFile; 13] = [
    IndexFile { name: "index-4107", min_fov: 8.0, max_fov: 11.0, size_mb: 165.0, download_url: "http://data.astrometry.net/4100/index-4107.fits" },
    IndexFile { name: "index-4108", min_fov: 5.6, max_fov: 8.0, size_mb: 95.0, download_url: "http://data.astrometry.net/4100/index-4108.fits" },
    IndexFile { name: "index-4109", min_fov: 4.2, max_fov: 5.6, size_mb: 50.0, download_url: "http://data.astrometry.net/4100/index-4109.fits" },
    IndexFile { name: "index-4110", min_fov: 3.0, max_fov: 4.2, size_mb: 25.0, download_url: "http://data.astrometry.net/4100/index-4110.fits" },
    IndexFile { name: "index-4111", min_fov: 2.2, max_fov: 3.0, size_mb: 10.0, download_url: "http://data.astrometry.net/4100/index-4111.fits" },
    IndexFile { name: "index-4112", min_fov: 1.6, max_fov: 2.2, size_mb: 5.3, download_url: "http://data.astrometry.net/4100/index-4112.fits" },
    IndexFile { name: "index-4113", min_fov: 1.1, max_fov: 1.6, size_mb: 2.7, download_url: "http://data.astrometry.net/4100/index-4113.fits" },
    IndexFile { name: "index-4114", min_fov: 0.8, max_fov: 1.1, size_mb: 1.4, download_url: "http://data.astrometry.net/4100/index-4114.fits" },
    IndexFile { name: "index-4115", min_fov: 0.56, max_fov: 0.8, size_mb: 0.74, download_url: "http://data.astrometry.net/4100/index-4115.fits" },
    IndexFile { name: "index-4116", min_fov: 0.4, max_fov: 0.56, size_mb: 0.409, download_url: "http://data.astrometry.net/4100/index-4116.fits" },
    IndexFile { name: "index-4117", min_fov: 0.28, max_fov: 0.4, size_mb: 0.248, download_url: "http://data.astrometry.net/4100/index-4117.fits" },
    IndexFile { name: "index-4118", min_fov: 0.2, max_fov: 0.28, size_mb: 0.187, download_url: "http://data.astrometry.net/4100/index-4118.fits" },
    IndexFile { name: "index-4119", min_fov: 0.1, max_fov: 0.2, size_mb: 0.144, download_url: "http://data.astrometry.net/4100/index-4119.fits" },
];

/// Recommended index files for a field of view.
#[derive(Debug, Clone)]
pub struct IndexRecommendation {
    pub target_fov: Option<FieldOfView>,
    /// Matching indexes, narrowest coverage first.
    pub indexes: Vec<IndexFile>,
    pub total_size_mb: f64,
    /// A shell script that downloads the recommended indexes.
    pub download_script: String,
}

impl fmt::Display for IndexRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_fov {
            Some(fov) => writeln!(f, "Recommended indexes for FOV {}:", fov)?,
            None => writeln!(f, "Recommended indexes:")?,
        }
        writeln!(f, "Total download size: {:.1} MB", self.total_size_mb)?;
        writeln!(f)?;
        for idx in &self.indexes {
            writeln!(
                f,
                "  {}: {:.2}° - {:.2}° ({:.1} MB)",
                idx.name, idx.min_fov, idx.max_fov, idx.size_mb
            )?;
        }
        Ok(())
    }
}

fn select_indexes(min_fov: f64, max_fov: f64) -> (Vec<IndexFile>, f64) {
    let mut selected: Vec<IndexFile> = ALL_INDEX_FILES
        .iter()
        .filter(|idx| idx.max_fov >= min_fov && idx.min_fov <= max_fov)
        .copied()
        .collect();
    selected.sort_by(|a, b| a.min_fov.partial_cmp(&b.min_fov).unwrap());
    let total = selected.iter().map(|idx| idx.size_mb).sum();
    (selected, total)
}

fn render_download_script(header_lines: &[String], indexes: &[IndexFile]) -> String {
    let mut script = String::from("#!/bin/bash\n# Download recommended astrometry index files\n\n");
    for line in header_lines {
        script.push_str(line);
        script.push('\n');
    }
    script.push_str("\nmkdir -p astrometry-data && cd astrometry-data\n\n");
    for idx in indexes {
        script.push_str(&format!(
            "wget {}  # {:.2}° - {:.2}° ({:.1} MB)\n",
            idx.download_url, idx.min_fov, idx.max_fov, idx.size_mb
        ));
    }
    script
}

/// Recommends index files bracketing the given field width (degrees), with
/// `margin` as a multiplier extending the range in both directions (1.5
/// means ±50%).
pub fn recommend_indexes(fov_degrees: f64, margin: f64) -> IndexRecommendation {
    let (indexes, total_size_mb) = select_indexes(fov_degrees / margin, fov_degrees * margin);
    let header = vec![
        format!("# Target FOV: {:.2} degrees", fov_degrees),
        format!("# Total download size: {:.1} MB", total_size_mb),
    ];
    let download_script = render_download_script(&header, &indexes);
    IndexRecommendation {
        target_fov: None,
        indexes,
        total_size_mb,
        download_script,
    }
}

/// Recommends index files for a computed [`FieldOfView`].
pub fn recommend_indexes_for_fov(fov: FieldOfView, margin: f64) -> IndexRecommendation {
    let mut rec = recommend_indexes(fov.width_degrees, margin);
    rec.target_fov = Some(fov);
    rec
}

/// Recommends index files covering a lens's whole focal range on the given
/// sensor. For a prime lens pass the same focal length twice.
pub fn recommend_indexes_for_lens(
    min_focal_length_mm: f64,
    max_focal_length_mm: f64,
    sensor: SensorSize,
    margin: f64,
) -> IndexRecommendation {
    let (narrow_fov, wide_fov) =
        calculate_fov_range(min_focal_length_mm, max_focal_length_mm, sensor);

    let (indexes, total_size_mb) = select_indexes(
        narrow_fov.width_degrees / margin,
        wide_fov.width_degrees * margin,
    );
    let header = vec![
        format!(
            "# Lens: {:.0}-{:.0}mm on {}",
            min_focal_length_mm, max_focal_length_mm, sensor.name
        ),
        format!("# FOV range: {} (wide) to {} (tele)", wide_fov, narrow_fov),
        format!("# Total download size: {:.1} MB", total_size_mb),
    ];
    let download_script = render_download_script(&header, &indexes);
    IndexRecommendation {
        target_fov: Some(wide_fov),
        indexes,
        total_size_mb,
        download_script,
    }
}

// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Parser for the WCS (World Coordinate System) header files emitted by
//! astrometry.net's solve-field. A .wcs file is a bare FITS header: a
//! sequence of 80-byte ASCII records of the form `KEY = VALUE / COMMENT`,
//! space-padded, with no line terminators, ending at an `END` record.
//!
//! Parsing is two-phase. [`read_header`] scans the fixed-length records into
//! a string-to-string map; [`solution_from_header`] then derives the field
//! center, pixel scale, rotation, and field dimensions from the standard WCS
//! keywords (CRVAL/CRPIX reference point, CD transform matrix).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use canonical_error::{failed_precondition_error, not_found_error, CanonicalError};

use crate::astro_util::{arcsec_from_degrees, degrees_from_arcsec, limit_to_360};

/// Length of a FITS header record, in bytes. Record boundaries are purely
/// positional; there are no delimiters.
pub const RECORD_SIZE: usize = 80;

/// The outcome of a plate-solve operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlateSolution {
    /// Whether the image was successfully plate-solved.
    pub solved: bool,

    /// Right ascension of the image center, degrees (J2000).
    pub ra: f64,

    /// Declination of the image center, degrees (J2000).
    pub dec: f64,

    /// Image scale, arcseconds per pixel.
    pub pixel_scale: f64,

    /// Field rotation, degrees.
    pub rotation: f64,

    /// Field of view width, degrees.
    pub field_width: f64,

    /// Field of view height, degrees.
    pub field_height: f64,

    /// The raw parsed WCS header fields, for caller inspection. Keywords
    /// not used in the derivation (e.g. CTYPE1/CTYPE2) pass through here.
    pub wcs_header: HashMap<String, String>,

    /// Paths of the solver's output files (.wcs, .corr, etc.). Attached by
    /// the orchestration layer, not by the parser.
    pub output_files: Vec<PathBuf>,

    /// Duration of the solve operation. Attached by the orchestration layer.
    pub solve_time: Option<Duration>,
}

/// Reads fixed 80-byte records from `reader` into a keyword map.
///
/// Records are consumed until end-of-stream or a short read; a partial final
/// record silently terminates the scan (it signals the natural end of the
/// padded file). `END` sentinel records and records without a `=` separator
/// (blank padding, CONTINUE records) are skipped. Values have the comment
/// (first `/` onward) stripped and surrounding single quotes removed; a
/// later duplicate keyword overwrites an earlier one.
pub fn read_header<R: Read>(mut reader: R) -> std::io::Result<HashMap<String, String>> {
    let mut header = HashMap::new();
    let mut record = [0u8; RECORD_SIZE];
    loop {
        let n = reader.read(&mut record)?;
        if n < RECORD_SIZE {
            break; // Short read or EOF ends the header.
        }
        let line = String::from_utf8_lossy(&record);

        if line.starts_with("END") {
            continue;
        }
        let Some((key, value_part)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        // Strip the comment (everything from the first '/'), then any
        // surrounding quotes from string-valued keywords.
        let value = match value_part.find('/') {
            Some(idx) => &value_part[..idx],
            None => value_part,
        };
        let value = value.trim().trim_matches('\'').trim();

        header.insert(key.to_string(), value.to_string());
    }
    Ok(header)
}

/// Looks up `key` and parses its value as f64. Absent and unparsable are
/// treated identically: both yield None.
fn header_f64(header: &HashMap<String, String>, key: &str) -> Option<f64> {
    header.get(key).and_then(|v| v.parse::<f64>().ok())
}

/// Derives the calibrated solution from a parsed WCS keyword map.
///
/// Missing or unparsable numeric keywords silently default to 0.0. CRVAL1's
/// parse success alone determines whether the full CD-matrix transform is
/// attempted; without it (or without positive image dimensions) a degraded
/// fallback uses CRVAL directly as the field center.
///
/// Returns NotFound if no usable solution is present (RA, Dec and pixel
/// scale all zero). Note this heuristic would misclassify a legitimate
/// solve centered exactly at the celestial origin with an unresolved pixel
/// scale; no real solver output has been observed to hit that boundary.
pub fn solution_from_header(
    wcs_header: HashMap<String, String>,
) -> Result<PlateSolution, CanonicalError> {
    let crval1 = header_f64(&wcs_header, "CRVAL1");
    // Only CRVAL1's presence gates the full transform.
    let has_wcs = crval1.is_some();
    let crval1 = crval1.unwrap_or(0.0);
    let crval2 = header_f64(&wcs_header, "CRVAL2").unwrap_or(0.0);
    let crpix1 = header_f64(&wcs_header, "CRPIX1").unwrap_or(0.0);
    let crpix2 = header_f64(&wcs_header, "CRPIX2").unwrap_or(0.0);
    let cd11 = header_f64(&wcs_header, "CD1_1").unwrap_or(0.0);
    let cd12 = header_f64(&wcs_header, "CD1_2").unwrap_or(0.0);
    let cd21 = header_f64(&wcs_header, "CD2_1").unwrap_or(0.0);
    let cd22 = header_f64(&wcs_header, "CD2_2").unwrap_or(0.0);

    // Image extent: IMAGEW/IMAGEH (astrometry.net specific) when present,
    // NAXIS1/NAXIS2 otherwise.
    let image_w = if wcs_header.contains_key("IMAGEW") {
        header_f64(&wcs_header, "IMAGEW").unwrap_or(0.0)
    } else {
        header_f64(&wcs_header, "NAXIS1").unwrap_or(0.0)
    };
    let image_h = if wcs_header.contains_key("IMAGEH") {
        header_f64(&wcs_header, "IMAGEH").unwrap_or(0.0)
    } else {
        header_f64(&wcs_header, "NAXIS2").unwrap_or(0.0)
    };

    let mut solution = PlateSolution {
        solved: true,
        ..Default::default()
    };

    if has_wcs && image_w > 0.0 && image_h > 0.0 {
        // The reference pixel CRPIX carries sky coordinate CRVAL. Transform
        // the pixel offset from reference pixel to image center through the
        // CD matrix to get the field center.
        let center_x = image_w / 2.0;
        let center_y = image_h / 2.0;
        let dx = center_x - crpix1;
        let dy = center_y - crpix2;

        let d_ra = cd11 * dx + cd12 * dy;
        let d_dec = cd21 * dx + cd22 * dy;
        solution.ra = crval1 + d_ra;
        solution.dec = crval2 + d_dec;

        // Pixel scale from the CD matrix column: sqrt(CD1_1^2 + CD2_1^2)
        // degrees/pixel.
        let pixel_scale_deg = (cd11 * cd11 + cd21 * cd21).sqrt();
        solution.pixel_scale = arcsec_from_degrees(pixel_scale_deg);

        // Position angle of "up": 180 - atan2(CD1_2, CD1_1), normalized.
        let rotation_deg = 180.0 - cd12.atan2(cd11).to_degrees();
        solution.rotation = limit_to_360(rotation_deg);
    } else {
        // Degraded mode: CRVAL approximates the field center for most
        // solver outputs.
        solution.ra = crval1;
        solution.dec = crval2;

        if cd11 != 0.0 {
            solution.pixel_scale = arcsec_from_degrees(cd11.abs());
        }

        // Rotation straight from CROTA2 if present; unnormalized.
        if let Some(rot) = header_f64(&wcs_header, "CROTA2") {
            solution.rotation = rot;
        }
    }

    // Field dimensions from image extent and pixel scale. IMAGEW/IMAGEH
    // first, then unconditionally overwritten by NAXIS1/NAXIS2 when those
    // are also present (last write wins).
    if let Some(w) = header_f64(&wcs_header, "IMAGEW") {
        if solution.pixel_scale > 0.0 {
            solution.field_width = degrees_from_arcsec(w * solution.pixel_scale);
        }
    }
    if let Some(h) = header_f64(&wcs_header, "IMAGEH") {
        if solution.pixel_scale > 0.0 {
            solution.field_height = degrees_from_arcsec(h * solution.pixel_scale);
        }
    }
    if let Some(w) = header_f64(&wcs_header, "NAXIS1") {
        if solution.pixel_scale > 0.0 {
            solution.field_width = degrees_from_arcsec(w * solution.pixel_scale);
        }
    }
    if let Some(h) = header_f64(&wcs_header, "NAXIS2") {
        if solution.pixel_scale > 0.0 {
            solution.field_height = degrees_from_arcsec(h * solution.pixel_scale);
        }
    }

    if solution.ra == 0.0 && solution.dec == 0.0 && solution.pixel_scale == 0.0 {
        return Err(not_found_error("No valid WCS fields found"));
    }

    solution.wcs_header = wcs_header;
    Ok(solution)
}

/// Parses a .wcs file into a PlateSolution.
///
/// An unreadable file yields FailedPrecondition; a readable file with no
/// usable coordinate solution yields NotFound. Malformed individual records
/// are skipped, not errors.
pub fn parse_wcs_file(wcs_path: &Path) -> Result<PlateSolution, CanonicalError> {
    let file = File::open(wcs_path).map_err(|e| {
        failed_precondition_error(
            format!("Failed to open WCS file {}: {}", wcs_path.display(), e).as_str(),
        )
    })?;
    let header = read_header(file).map_err(|e| {
        failed_precondition_error(
            format!("Failed to read WCS file {}: {}", wcs_path.display(), e).as_str(),
        )
    })?;
    solution_from_header(header)
}

#[cfg(test)]
mod tests {
    extern crate approx;

    use std::io::Write;

    use approx::assert_abs_diff_eq;
    use canonical_error::CanonicalErrorCode;

    use super::*;

    // Pads a header line out to the FITS record length.
    fn record(line: &str) -> String {
        assert!(line.len() <= RECORD_SIZE);
        format!("{:width$}", line, width = RECORD_SIZE)
    }

    fn header_bytes(lines: &[&str]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for line in lines {
            bytes.extend_from_slice(record(line).as_bytes());
        }
        bytes
    }

    fn parse_lines(lines: &[&str]) -> Result<PlateSolution, CanonicalError> {
        let header = read_header(header_bytes(lines).as_slice()).unwrap();
        solution_from_header(header)
    }

    #[test]
    fn test_read_header_basic() {
        let bytes = header_bytes(&[
            "SIMPLE  =                    T / file does conform to FITS standard",
            "CRVAL1  =        83.4230000000 / RA of reference point (deg)",
            "CTYPE1  = 'RA---TAN-SIP'       / TAN (gnomonic) projection + SIP distortions",
            "COMMENT Original key: \"AN_FILE\"",
            "END",
        ]);
        let header = read_header(bytes.as_slice()).unwrap();
        assert_eq!(header.get("SIMPLE").unwrap(), "T");
        assert_eq!(header.get("CRVAL1").unwrap(), "83.4230000000");
        // Quotes stripped, comment stripped.
        assert_eq!(header.get("CTYPE1").unwrap(), "RA---TAN-SIP");
        // COMMENT records have no '=' before the text here and the END
        // sentinel is not data.
        assert!(!header.contains_key("END"));
    }

    #[test]
    fn test_read_header_duplicate_key_last_wins() {
        let bytes = header_bytes(&[
            "IMAGEW  =                 6000",
            "IMAGEW  =                 3000",
        ]);
        let header = read_header(bytes.as_slice()).unwrap();
        assert_eq!(header.get("IMAGEW").unwrap(), "3000");
    }

    #[test]
    fn test_read_header_short_final_record() {
        let mut bytes = header_bytes(&["CRVAL1  =                 10.0"]);
        // A trailing partial record terminates the scan without error.
        bytes.extend_from_slice(b"CRVAL2  = 20.0");
        let header = read_header(bytes.as_slice()).unwrap();
        assert_eq!(header.get("CRVAL1").unwrap(), "10.0");
        assert!(!header.contains_key("CRVAL2"));
    }

    #[test]
    fn test_read_header_skips_blank_records() {
        let bytes = header_bytes(&["", "HISTORY Created by solve-field.", "NAXIS1  = 100"]);
        let header = read_header(bytes.as_slice()).unwrap();
        assert_eq!(header.len(), 1);
        assert_eq!(header.get("NAXIS1").unwrap(), "100");
    }

    // Values from a real solve of a 6000x4000 frame centered on M42. The
    // reference pixel sits exactly at the image center, so the CD transform
    // contributes zero offset.
    #[test]
    fn test_solution_reference_pixel_at_center() {
        let solution = parse_lines(&[
            "CRPIX1  =          3000.000000 / X reference pixel",
            "CRPIX2  =          2000.000000 / Y reference pixel",
            "CRVAL1  =        83.4230000000 / RA of reference point (deg)",
            "CRVAL2  =        -5.8930000000 / Dec of reference point (deg)",
            "CD1_1   =  -0.0010995000000000 / Transformation matrix",
            "CD1_2   =   0.0004600000000000 / Transformation matrix",
            "CD2_1   =  -0.0004500000000000 / Transformation matrix",
            "CD2_2   =  -0.0011000000000000 / Transformation matrix",
            "IMAGEW  =                 6000 / Image width in pixels",
            "IMAGEH  =                 4000 / Image height in pixels",
            "END",
        ])
        .unwrap();

        assert!(solution.solved);
        assert_abs_diff_eq!(solution.ra, 83.423, epsilon = 0.001);
        assert_abs_diff_eq!(solution.dec, -5.893, epsilon = 0.001);
        assert_abs_diff_eq!(solution.pixel_scale, 4.3, epsilon = 0.2);
        assert_abs_diff_eq!(solution.rotation, 22.0, epsilon = 2.0);
        assert!(solution.rotation >= 0.0 && solution.rotation < 360.0);

        // Field dimensions follow pixel scale and image extent.
        assert_abs_diff_eq!(
            solution.field_width,
            6000.0 * solution.pixel_scale / 3600.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            solution.field_height,
            4000.0 * solution.pixel_scale / 3600.0,
            epsilon = 1e-9
        );
    }

    // Half-pixel reference offset, NAXIS dimensions only. Exercises the
    // full transform with a non-zero offset and the NAXIS fallback.
    #[test]
    fn test_solution_naxis_dimensions_with_offset() {
        let solution = parse_lines(&[
            "CRPIX1  =               2048.5 / X reference pixel",
            "CRPIX2  =               1534.5 / Y reference pixel",
            "CRVAL1  =      120.12345678901 / RA of reference point (deg)",
            "CRVAL2  =      45.987654321010 / Dec of reference point (deg)",
            "CD1_1   =  -0.0003055555555556 / Transformation matrix",
            "CD1_2   =                    0 / Transformation matrix",
            "CD2_1   =                    0 / Transformation matrix",
            "CD2_2   =   0.0003055555555556 / Transformation matrix",
            "CROTA2  =                 15.5 / Rotation (ignored on this path)",
            "NAXIS1  =                 4096 / Image width",
            "NAXIS2  =                 3068 / Image height",
            "END",
        ])
        .unwrap();

        // center (2048, 1534), dx = dy = -0.5.
        let expected_ra = 120.12345678901 + (-0.0003055555555556) * -0.5;
        let expected_dec = 45.98765432101 + 0.0003055555555556 * -0.5;
        assert_abs_diff_eq!(solution.ra, expected_ra, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.dec, expected_dec, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.pixel_scale, 1.1, epsilon = 0.01);
        // Primary path ignores CROTA2: rotation is 180 - atan2(0, cd11<0).
        assert_abs_diff_eq!(solution.rotation, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            solution.field_width,
            4096.0 * solution.pixel_scale / 3600.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            solution.field_height,
            3068.0 * solution.pixel_scale / 3600.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_pixel_scale_from_cd_column() {
        let solution = parse_lines(&[
            "CRPIX1  =                  500",
            "CRPIX2  =                  500",
            "CRVAL1  =                 10.0",
            "CRVAL2  =                 20.0",
            "CD1_1   =                0.0003",
            "CD2_1   =                0.0004",
            "IMAGEW  =                 1000",
            "IMAGEH  =                 1000",
        ])
        .unwrap();
        // Full hypotenuse of the first CD column: 0.0005 deg/px.
        assert_abs_diff_eq!(solution.pixel_scale, 0.0005 * 3600.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fallback_when_crval1_missing() {
        let solution = parse_lines(&[
            "CRVAL2  =                -12.5 / Dec only",
            "CRPIX1  =                  100",
            "CRPIX2  =                  100",
            "CD1_1   =                0.001",
            "CD2_1   =                0.002",
            "CROTA2  =               -15.25",
            "IMAGEW  =                  200",
            "IMAGEH  =                  200",
        ])
        .unwrap();
        // No CRVAL1: no transform, CRVAL taken directly.
        assert_eq!(solution.ra, 0.0);
        assert_eq!(solution.dec, -12.5);
        // Fallback scale ignores CD2_1.
        assert_abs_diff_eq!(solution.pixel_scale, 0.001 * 3600.0, epsilon = 1e-9);
        // Fallback rotation is raw CROTA2, unnormalized.
        assert_eq!(solution.rotation, -15.25);
    }

    #[test]
    fn test_fallback_when_image_dimensions_missing() {
        let solution = parse_lines(&[
            "CRVAL1  =               200.25",
            "CRVAL2  =                 33.5",
            "CRPIX1  =                 1000",
            "CRPIX2  =                 1000",
            "CD1_1   =              -0.0002",
        ])
        .unwrap();
        // Dimensions absent entirely: CRVAL passes through exactly.
        assert_eq!(solution.ra, 200.25);
        assert_eq!(solution.dec, 33.5);
        assert_abs_diff_eq!(solution.pixel_scale, 0.0002 * 3600.0, epsilon = 1e-9);
        assert_eq!(solution.rotation, 0.0);
        // No image extent: field dimensions stay zero.
        assert_eq!(solution.field_width, 0.0);
        assert_eq!(solution.field_height, 0.0);
    }

    #[test]
    fn test_fallback_rotation_large_crota2_unnormalized() {
        let solution = parse_lines(&[
            "CRVAL1  =                 10.0",
            "CRVAL2  =                 20.0",
            "CD1_1   =                0.001",
            "CROTA2  =                370.5",
        ])
        .unwrap();
        assert_eq!(solution.rotation, 370.5);
    }

    #[test]
    fn test_primary_rotation_normalized() {
        let solution = parse_lines(&[
            "CRVAL1  =                 10.0",
            "CRVAL2  =                 20.0",
            "CRPIX1  =                  500",
            "CRPIX2  =                  500",
            "CD1_1   =                0.001",
            "CD1_2   =               -0.001",
            "IMAGEW  =                 1000",
            "IMAGEH  =                 1000",
        ])
        .unwrap();
        // 180 - atan2(-0.001, 0.001) = 180 + 45.
        assert_abs_diff_eq!(solution.rotation, 225.0, epsilon = 1e-9);
        assert!(solution.rotation >= 0.0 && solution.rotation < 360.0);
    }

    // NAXIS overwrites an IMAGEW-derived field dimension when both are
    // present with different values.
    #[test]
    fn test_field_dimensions_naxis_overwrites_imagew() {
        let solution = parse_lines(&[
            "CRVAL1  =                 10.0",
            "CRVAL2  =                 20.0",
            "CRPIX1  =                  500",
            "CRPIX2  =                  500",
            "CD1_1   =                0.001",
            "IMAGEW  =                 1000",
            "IMAGEH  =                 1000",
            "NAXIS1  =                 2000",
        ])
        .unwrap();
        assert_abs_diff_eq!(
            solution.field_width,
            2000.0 * solution.pixel_scale / 3600.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            solution.field_height,
            1000.0 * solution.pixel_scale / 3600.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_unparsable_values_default_to_zero() {
        let solution = parse_lines(&[
            "CRVAL1  =                 10.0",
            "CRVAL2  =           not-a-number",
            "CD1_1   =                0.001",
        ])
        .unwrap();
        assert_eq!(solution.ra, 10.0);
        assert_eq!(solution.dec, 0.0);
    }

    #[test]
    fn test_end_only_file_is_parse_failure() {
        let err = parse_lines(&["END"]).unwrap_err();
        assert_eq!(err.code, CanonicalErrorCode::NotFound);
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let err = parse_wcs_file(Path::new("/nonexistent/file.wcs")).unwrap_err();
        assert_eq!(err.code, CanonicalErrorCode::FailedPrecondition);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let lines = [
            "CRVAL1  =                 83.4",
            "CRVAL2  =                 -5.9",
            "CRPIX1  =                 3000",
            "CRPIX2  =                 2000",
            "CD1_1   =              -0.0011",
            "CD2_2   =              -0.0011",
            "IMAGEW  =                 6000",
            "IMAGEH  =                 4000",
            "END",
        ];
        assert_eq!(parse_lines(&lines).unwrap(), parse_lines(&lines).unwrap());
    }

    #[test]
    fn test_parse_wcs_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wcs");
        let mut file = File::create(&path).unwrap();
        file.write_all(&header_bytes(&[
            "SIMPLE  =                    T / conforms to FITS standard",
            "CRVAL1  =                 83.4 / RA",
            "CRVAL2  =                 -5.9 / Dec",
            "CRPIX1  =                 3000",
            "CRPIX2  =                 2000",
            "CD1_1   =              -0.0011",
            "CD2_2   =              -0.0011",
            "IMAGEW  =                 6000",
            "IMAGEH  =                 4000",
            "END",
        ]))
        .unwrap();
        drop(file);

        let solution = parse_wcs_file(&path).unwrap();
        assert!(solution.solved);
        assert_abs_diff_eq!(solution.ra, 83.4, epsilon = 0.001);
        assert_eq!(solution.wcs_header.get("SIMPLE").unwrap(), "T");
    }
}

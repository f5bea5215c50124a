// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Angle and unit helpers shared by the WCS parser and FOV calculations.

/// Normalizes an angle in degrees into [0, 360) by repeated addition or
/// subtraction of full turns.
pub fn limit_to_360(mut degrees: f64) -> f64 {
    while degrees < 0.0 {
        degrees += 360.0;
    }
    while degrees >= 360.0 {
        degrees -= 360.0;
    }
    degrees
}

/// Converts an angle in degrees to arcseconds.
pub fn arcsec_from_degrees(degrees: f64) -> f64 {
    degrees * 3600.0
}

/// Converts an angle in arcseconds to degrees.
pub fn degrees_from_arcsec(arcsec: f64) -> f64 {
    arcsec / 3600.0
}

/// Returns the angular extent (degrees) subtended by a sensor dimension at
/// the given focal length. Both arguments in millimeters.
pub fn fov_degrees(sensor_dim_mm: f64, focal_length_mm: f64) -> f64 {
    (2.0 * (sensor_dim_mm / (2.0 * focal_length_mm)).atan()).to_degrees()
}

#[cfg(test)]
mod tests {
    extern crate approx;

    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_limit_to_360() {
        assert_eq!(limit_to_360(0.0), 0.0);
        assert_eq!(limit_to_360(359.9), 359.9);
        assert_eq!(limit_to_360(360.0), 0.0);
        assert_abs_diff_eq!(limit_to_360(-30.0), 330.0, epsilon = 1e-9);
        assert_abs_diff_eq!(limit_to_360(725.0), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(limit_to_360(-725.0), 355.0, epsilon = 1e-9);
    }

    #[test]
    fn test_arcsec_conversions() {
        assert_eq!(arcsec_from_degrees(1.0), 3600.0);
        assert_eq!(degrees_from_arcsec(3600.0), 1.0);
        assert_abs_diff_eq!(
            degrees_from_arcsec(arcsec_from_degrees(0.12345)),
            0.12345,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_fov_degrees() {
        // 50mm on a full frame sensor's 36mm width is the classic ~39.6
        // degree horizontal field.
        assert_abs_diff_eq!(fov_degrees(36.0, 50.0), 39.6, epsilon = 0.1);
        // Long focal lengths approach the small-angle limit.
        assert_abs_diff_eq!(fov_degrees(23.6, 300.0), 4.5, epsilon = 0.1);
    }
}

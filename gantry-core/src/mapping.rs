//! Affine remap between machine space and render space

/// Map `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// No clamping, values outside the input range extrapolate. The input range
/// must not be empty.
pub fn map_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    debug_assert!(in_min != in_max, "map_range called with an empty input range");
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_and_midpoint() {
        assert_eq!(map_range(0.0, 0.0, 100.0, -5.0, 5.0), -5.0);
        assert_eq!(map_range(100.0, 0.0, 100.0, -5.0, 5.0), 5.0);
        assert_eq!(map_range(50.0, 0.0, 100.0, -5.0, 5.0), 0.0);
    }

    #[test]
    fn test_inverted_output() {
        assert_eq!(map_range(25.0, 0.0, 100.0, 4.0, 0.0), 3.0);
    }

    #[test]
    fn test_extrapolates() {
        assert_eq!(map_range(200.0, 0.0, 100.0, 0.0, 1.0), 2.0);
    }
}

//! Cross-sectional min-max scaling.

/// Rescale values so the minimum maps to 0 and the maximum to 1.
///
/// Non-finite inputs are ignored when finding the range and come back as
/// `NaN`. If every finite value is equal the output is all zeros.
pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = max - min;

    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                f64::NAN
            } else if range > 0.0 {
                (v - min) / range
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scales_to_unit_interval() {
        let scaled = min_max_scale(&[2.0, 4.0, 3.0]);
        assert_relative_eq!(scaled[0], 0.0);
        assert_relative_eq!(scaled[1], 1.0);
        assert_relative_eq!(scaled[2], 0.5);
    }

    #[test]
    fn test_constant_vector_is_zero() {
        let scaled = min_max_scale(&[0.3, 0.3, 0.3]);
        assert!(scaled.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_non_finite_ignored() {
        let scaled = min_max_scale(&[1.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_relative_eq!(scaled[0], 0.0);
        assert!(scaled[1].is_nan());
        assert_relative_eq!(scaled[2], 1.0);
        assert!(scaled[3].is_nan());
    }

    #[test]
    fn test_empty_and_single() {
        assert!(min_max_scale(&[]).is_empty());
        assert_eq!(min_max_scale(&[7.0]), vec![0.0]);
    }
}

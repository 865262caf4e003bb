//! Per-indicator similarity functions
//!
//! Both functions compare two non-negative measurements of the same
//! indicator relative to the larger of the two.

/// Relative difference `|a - b| / max(|a|, |b|)`.
///
/// Returns 0.0 when both values are zero. For non-negative inputs the result
/// lies in [0.0, 1.0].
#[inline]
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let max = a.abs().max(b.abs());
    if max == 0.0 {
        0.0
    } else {
        (a - b).abs() / max
    }
}

/// Ratio similarity `1 - |a - b| / max(|a|, |b|)`.
///
/// 1.0 for identical values (including both zero), approaching 0.0 as the
/// relative difference grows. Not clamped: inputs are non-negative by the
/// data model, which keeps the result in [0.0, 1.0].
#[inline]
pub fn ratio_similarity(a: f64, b: f64) -> f64 {
    let max = a.abs().max(b.abs());
    if max == 0.0 {
        1.0
    } else {
        1.0 - (a - b).abs() / max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_similarity() {
        assert_eq!(ratio_similarity(10.0, 10.0), 1.0);
        assert_eq!(ratio_similarity(0.0, 0.0), 1.0);
        assert_eq!(ratio_similarity(10.0, 20.0), 0.5);
        assert_eq!(ratio_similarity(0.0, 5.0), 0.0);

        let sim = ratio_similarity(10.0, 11.0);
        assert!(sim > 0.9);
    }

    #[test]
    fn test_ratio_similarity_symmetric() {
        assert_eq!(ratio_similarity(46259.0, 39285.0), ratio_similarity(39285.0, 46259.0));
    }

    #[test]
    fn test_relative_difference() {
        assert_eq!(relative_difference(0.0, 0.0), 0.0);
        assert_eq!(relative_difference(10.0, 20.0), 0.5);
        assert_eq!(relative_difference(3.0, 3.0), 0.0);
        assert_eq!(relative_difference(0.0, 7.5), 1.0);
    }
}

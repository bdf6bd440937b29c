//! Ratio helpers with a defined zero-denominator result.

/// `numerator / denominator`, defined as 0.0 when the denominator is zero.
///
/// An empty group has no meaningful rate but must not poison downstream
/// aggregates with NaN.
pub fn safe_rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// A rate expressed as a percentage, rounded to `decimals` places.
pub fn as_percent(rate: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (rate * 100.0 * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_is_zero() {
        assert_eq!(safe_rate(0, 0), 0.0);
        assert_eq!(safe_rate(5, 0), 0.0);
    }

    #[test]
    fn simple_ratio() {
        assert!((safe_rate(1, 3) - 1.0 / 3.0).abs() < 1e-15);
        assert_eq!(safe_rate(3, 3), 1.0);
    }

    #[test]
    fn percent_rounding() {
        assert_eq!(as_percent(1.0 / 3.0, 2), 33.33);
        assert_eq!(as_percent(0.5, 0), 50.0);
    }
}

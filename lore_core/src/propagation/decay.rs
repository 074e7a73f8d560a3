//! Decay curves applied to propagation probability per hop.

use serde::{Deserialize, Serialize};

/// How quickly spread probability falls off with hop distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayCurve {
    /// `exp(-k * h)`.
    #[default]
    Exponential,
    /// `max(0, 1 - k * h)`.
    Linear,
}

impl DecayCurve {
    /// Evaluate the curve at `hop` for decay constant `k`.
    pub fn apply(&self, k: f64, hop: u32) -> f64 {
        match self {
            DecayCurve::Exponential => exponential_decay(k, hop),
            DecayCurve::Linear => linear_decay(k, hop),
        }
    }
}

/// Exponential falloff. Equals `1.0` at hop 0 and strictly decreases for `k > 0`.
pub fn exponential_decay(k: f64, hop: u32) -> f64 {
    (-k * f64::from(hop)).exp()
}

/// Linear falloff clamped at zero.
pub fn linear_decay(k: f64, hop: u32) -> f64 {
    (1.0 - k * f64::from(hop)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_at_origin() {
        assert_eq!(exponential_decay(0.8, 0), 1.0);
        assert_eq!(exponential_decay(0.0, 7), 1.0);
    }

    #[test]
    fn test_exponential_is_strictly_decreasing() {
        let k = 0.8;
        for h in 0..20 {
            assert!(
                exponential_decay(k, h + 1) < exponential_decay(k, h),
                "decay at hop {} should be below hop {}",
                h + 1,
                h
            );
        }
        assert!((exponential_decay(k, 1) - (-0.8f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_linear_clamps_at_zero() {
        assert!((linear_decay(0.25, 2) - 0.5).abs() < 1e-12);
        assert_eq!(linear_decay(0.25, 4), 0.0);
        assert_eq!(linear_decay(0.25, 9), 0.0);
    }

    #[test]
    fn test_curve_dispatch() {
        assert_eq!(DecayCurve::default(), DecayCurve::Exponential);
        assert_eq!(DecayCurve::Linear.apply(0.5, 1), 0.5);
        assert_eq!(DecayCurve::Exponential.apply(0.5, 0), 1.0);
    }
}

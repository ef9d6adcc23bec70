use crate::traits::Lerp;
use serde::{Deserialize, Serialize};

/// Easing curves for view transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    Linear,
    EaseIn,
    EaseOut,
    /// Smooth step (3t^2 - 2t^3); the default for programmatic view changes.
    #[default]
    InAndOut,
}

impl EasingType {
    /// Apply easing function to a normalized time value (0.0 to 1.0)
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingType::Linear => t,
            EasingType::EaseIn => t * t * t,
            EasingType::EaseOut => {
                let t = t - 1.0;
                t * t * t + 1.0
            }
            EasingType::InAndOut => t * t * (3.0 - 2.0 * t),
        }
    }

    /// Interpolates `start..end` at eased progress `t`.
    pub fn interpolate<T: Lerp>(self, start: &T, end: &T, t: f64) -> T {
        start.lerp(end, self.apply(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_fixed() {
        for easing in [
            EasingType::Linear,
            EasingType::EaseIn,
            EasingType::EaseOut,
            EasingType::InAndOut,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-12);
            assert_eq!(easing.apply(2.0), easing.apply(1.0));
        }
    }

    #[test]
    fn test_in_and_out_is_symmetric() {
        let e = EasingType::InAndOut;
        assert!((e.apply(0.5) - 0.5).abs() < 1e-12);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-12);
    }
}

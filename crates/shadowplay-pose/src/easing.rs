//! Easing curves for override weights and cue paths.
//!
//! Every curve maps `[0, 1]` onto `[0, 1]` with exact endpoints: `apply(0.0)`
//! is `0.0` and `apply(1.0)` is `1.0`, bit-for-bit.

use serde::{Deserialize, Serialize};

/// Iterations of the Bézier x-inversion. Fixed so results never depend on
/// convergence timing.
const BEZIER_STEPS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    SmoothStep,
    EaseInCubic,
    EaseOutCubic,
    #[default]
    EaseInOutCubic,
    /// CSS-style cubic Bézier through `(0,0)`, `(x1,y1)`, `(x2,y2)`, `(1,1)`.
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl Easing {
    /// Map `t` (clamped to `[0, 1]`; NaN reads as 0) through the curve.
    pub fn apply(self, t: f32) -> f32 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Self::Linear => t,
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::EaseInCubic => t * t * t,
            Self::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::CubicBezier { x1, y1, x2, y2 } => bezier_y_at_x(x1, y1, x2, y2, t),
        }
    }

    /// Bézier control x-coordinates must stay in `[0, 1]` for the curve to
    /// be a function of `t`.
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::CubicBezier { x1, y1, x2, y2 } => {
                [x1, y1, x2, y2].iter().all(|v| v.is_finite())
                    && (0.0..=1.0).contains(&x1)
                    && (0.0..=1.0).contains(&x2)
            }
            _ => true,
        }
    }
}

/// One coordinate of a cubic Bézier with endpoints 0 and 1.
fn bezier(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_slope(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Find the curve parameter whose x equals `x`, then return its y.
fn bezier_y_at_x(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    let mut s = x;
    for _ in 0..BEZIER_STEPS {
        let err = bezier(x1, x2, s) - x;
        if err > 0.0 {
            hi = s;
        } else {
            lo = s;
        }
        let slope = bezier_slope(x1, x2, s);
        let newton = if slope.abs() > 1e-6 { s - err / slope } else { f32::NAN };
        s = if newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }
    bezier(y1, y2, s)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Closed-form shadow optics.
//!
//! Each function is total: degenerate inputs are clamped rather than
//! producing NaN or infinity.

use std::f64::consts::TAU;

/// Distances below this are treated as this.
pub const MIN_DISTANCE: f32 = 1e-4;

/// Largest contact-hardening kernel edge (a 9x9 footprint).
pub const MAX_KERNEL: u32 = 9;

/// Interference modulator frequency in Hz.
pub const INTERFERENCE_HZ: f64 = 120.0;

/// Penumbra radius `r_p = (d_o / d_s) * r_l`.
///
/// `d_s` is floored at [`MIN_DISTANCE`].
///
/// # Example
///
/// ```
/// use shadowplay_lighting::optics::penumbra_radius;
///
/// assert_eq!(penumbra_radius(4.0, 2.0, 0.5), 1.0);
/// ```
#[must_use]
pub fn penumbra_radius(d_o: f32, d_s: f32, r_l: f32) -> f32 {
    (d_o.max(0.0) / d_s.max(MIN_DISTANCE)) * r_l.max(0.0)
}

/// Beer-Lambert transmission `exp(-sigma * thickness)`.
#[must_use]
pub fn transmission(sigma: f32, thickness: f32) -> f32 {
    (-sigma.max(0.0) * thickness.max(0.0)).exp()
}

/// Contact hardening `t / (t + r_l)` in `[0, 1]`.
///
/// A point light (`r_l == 0`) with a thick occluder hardens fully; with
/// neither there is nothing to harden.
#[must_use]
pub fn hardening(thickness: f32, r_l: f32) -> f32 {
    let t = thickness.max(0.0);
    let denom = t + r_l.max(0.0);
    if denom < MIN_DISTANCE {
        return 0.0;
    }
    (t / denom).clamp(0.0, 1.0)
}

/// Odd kernel edge `1 + 2 * round(4h)`, between 1 and [`MAX_KERNEL`].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn kernel_size(hardening: f32) -> u32 {
    let steps = (4.0 * hardening.clamp(0.0, 1.0)).round() as u32;
    1 + 2 * steps
}

/// Largest odd kernel not above `cap` (at least 1).
#[must_use]
pub const fn cap_kernel(kernel: u32, cap: u32) -> u32 {
    let cap = if cap == 0 {
        1
    } else if cap % 2 == 0 {
        cap - 1
    } else {
        cap
    };
    if kernel > cap { cap } else { kernel }
}

/// Intensity factor `1 + a * (sin(2 pi f t) + sin(2 pi f t + phase))`,
/// never negative.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn interference_factor(time_secs: f64, amplitude: f32, phase: f32) -> f32 {
    let x = TAU * INTERFERENCE_HZ * time_secs;
    let wave = x.sin() + (x + f64::from(phase)).sin();
    (1.0 + f64::from(amplitude) * wave).max(0.0) as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn penumbra_scenario() {
        assert_relative_eq!(penumbra_radius(4.0, 2.0, 0.5), 1.0);
    }

    #[test]
    fn penumbra_is_linear_in_light_radius() {
        let base = penumbra_radius(3.0, 5.0, 0.2);
        for k in [0.5_f32, 2.0, 7.5] {
            assert_relative_eq!(penumbra_radius(3.0, 5.0, 0.2 * k), base * k, epsilon = 1e-6);
        }
    }

    #[test]
    fn penumbra_is_scale_invariant() {
        let base = penumbra_radius(3.0, 5.0, 0.4);
        for k in [0.1_f32, 3.0, 40.0] {
            assert_relative_eq!(penumbra_radius(3.0 * k, 5.0 * k, 0.4), base, epsilon = 1e-5);
        }
    }

    #[test]
    fn penumbra_floors_plane_distance() {
        let r = penumbra_radius(1.0, 0.0, 1.0);
        assert!(r.is_finite());
        assert_relative_eq!(r, 1.0 / MIN_DISTANCE);
    }

    #[test]
    fn transmission_starts_at_one_and_decreases() {
        assert_eq!(transmission(1.3, 0.0), 1.0);
        let mut last = 1.0;
        for step in 1..=20 {
            let t = transmission(1.3, step as f32 * 0.1);
            assert!(t < last);
            last = t;
        }
    }

    #[test]
    fn transmission_with_zero_sigma_is_clear() {
        assert_eq!(transmission(0.0, 5.0), 1.0);
    }

    #[test]
    fn kernel_sizes_are_odd_and_bounded() {
        assert_eq!(kernel_size(0.0), 1);
        assert_eq!(kernel_size(0.5), 5);
        assert_eq!(kernel_size(1.0), 9);
        for i in 0..=100 {
            let k = kernel_size(i as f32 / 100.0);
            assert!(k % 2 == 1 && (1..=MAX_KERNEL).contains(&k));
        }
    }

    #[test]
    fn hardening_ranges() {
        assert_eq!(hardening(0.0, 0.0), 0.0);
        assert_eq!(hardening(1.0, 0.0), 1.0);
        assert_relative_eq!(hardening(0.5, 0.5), 0.5);
    }

    #[test]
    fn kernel_cap_stays_odd() {
        assert_eq!(cap_kernel(9, 7), 7);
        assert_eq!(cap_kernel(9, 6), 5);
        assert_eq!(cap_kernel(3, 9), 3);
        assert_eq!(cap_kernel(9, 0), 1);
    }

    #[test]
    fn interference_oscillates_around_one() {
        assert_relative_eq!(interference_factor(0.0, 0.1, 0.0), 1.0);
        // Quarter period of 120 Hz: both waves at their peak.
        assert_relative_eq!(interference_factor(1.0 / 480.0, 0.1, 0.0), 1.2, epsilon = 1e-5);
        assert!(interference_factor(3.0 / 480.0, 0.6, 0.0) >= 0.0);
    }
}

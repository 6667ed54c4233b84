// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Window functions for update shapes and guess pulses.
//!
//! An update shape S(t) modulates the pulse update so that it vanishes
//! wherever the pulse must keep its switch-on/off behaviour. The same
//! functions double as envelopes for guess pulses.
//!
//! Ref: Blackman (1958), "The measurement of power spectra".

use std::f64::consts::PI;

/// Blackman window on `[t_start, t_stop]`, zero outside.
///
/// Uses the conventional a = 0.16 coefficient set. The window starts and
/// ends at exactly zero and peaks at 1 in the centre.
pub fn blackman(t: f64, t_start: f64, t_stop: f64) -> f64 {
    if t < t_start || t > t_stop {
        return 0.0;
    }
    let a = 0.16;
    let x = (t - t_start) / (t_stop - t_start);
    0.5 * (1.0 - a - (2.0 * PI * x).cos() + a * (4.0 * PI * x).cos())
}

/// Box window: 1 on `[t_start, t_stop]`, 0 outside.
pub fn box_shape(t: f64, t_start: f64, t_stop: f64) -> f64 {
    if t < t_start || t > t_stop {
        0.0
    } else {
        1.0
    }
}

/// Flat-top window with Blackman-shaped switch-on and switch-off ramps.
///
/// Rises over `[t_start, t_start + t_rise]`, holds at 1, and falls over
/// `[t_stop - t_fall, t_stop]`. Zero outside `[t_start, t_stop]`.
pub fn flattop(t: f64, t_start: f64, t_stop: f64, t_rise: f64, t_fall: f64) -> f64 {
    if t < t_start || t > t_stop {
        return 0.0;
    }
    if t_rise > 0.0 && t < t_start + t_rise {
        // First half of a Blackman window of width 2*t_rise
        return blackman(t, t_start, t_start + 2.0 * t_rise);
    }
    if t_fall > 0.0 && t > t_stop - t_fall {
        return blackman(t, t_stop - 2.0 * t_fall, t_stop);
    }
    1.0
}

/// Trivial shape S ≡ 1.
pub fn one_shape(_t: f64) -> f64 {
    1.0
}

/// Trivial shape S ≡ 0 (freezes a control entirely).
pub fn zero_shape(_t: f64) -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_blackman_vanishes_at_edges() {
        assert_relative_eq!(blackman(0.0, 0.0, 5.0), 0.0, epsilon = 1e-14);
        assert_relative_eq!(blackman(5.0, 0.0, 5.0), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_blackman_peaks_at_centre() {
        assert_relative_eq!(blackman(2.5, 0.0, 5.0), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_blackman_zero_outside() {
        assert_eq!(blackman(-0.1, 0.0, 5.0), 0.0);
        assert_eq!(blackman(5.1, 0.0, 5.0), 0.0);
    }

    #[test]
    fn test_box_shape() {
        assert_eq!(box_shape(-0.01, 0.0, 1.0), 0.0);
        assert_eq!(box_shape(0.5, 0.0, 1.0), 1.0);
        assert_eq!(box_shape(1.01, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_flattop_plateau_is_one() {
        for &t in &[0.5, 2.5, 4.5] {
            assert_relative_eq!(flattop(t, 0.0, 5.0, 0.3, 0.3), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_flattop_vanishes_at_boundaries() {
        assert_relative_eq!(flattop(0.0, 0.0, 5.0, 0.3, 0.3), 0.0, epsilon = 1e-14);
        assert_relative_eq!(flattop(5.0, 0.0, 5.0, 0.3, 0.3), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_flattop_ramp_is_monotone() {
        let samples: Vec<f64> = (0..30)
            .map(|i| flattop(0.01 * i as f64, 0.0, 5.0, 0.3, 0.3))
            .collect();
        for pair in samples.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12);
        }
    }

    #[test]
    fn test_flattop_zero_rise_is_box() {
        for &t in &[0.0, 0.001, 2.5, 4.999, 5.0] {
            assert_eq!(flattop(t, 0.0, 5.0, 0.0, 0.0), box_shape(t, 0.0, 5.0));
        }
    }

    #[test]
    fn test_flattop_nonnegative_everywhere() {
        for i in 0..=1000 {
            let t = -1.0 + 7.0 * i as f64 / 1000.0;
            assert!(flattop(t, 0.0, 5.0, 0.3, 0.3) >= 0.0);
        }
    }

    #[test]
    fn test_trivial_shapes() {
        assert_eq!(one_shape(17.0), 1.0);
        assert_eq!(zero_shape(17.0), 0.0);
    }
}

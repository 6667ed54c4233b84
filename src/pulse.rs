// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pulses on interval midpoints of a time grid.
//!
//! A control is a continuous real function of time; a [`Pulse`] is its
//! discretisation onto the midpoints of the N_T intervals of a time grid
//! with N_T + 1 points. All optimizer arithmetic happens on pulses.

use ndarray::Array1;

use crate::error::{Error, Result};

/// Midpoints of the intervals of `tlist`: (tₙ + tₙ₊₁)/2 for each interval.
pub fn midpoints(tlist: &Array1<f64>) -> Array1<f64> {
    let n_t = tlist.len() - 1;
    Array1::from_iter((0..n_t).map(|n| 0.5 * (tlist[n] + tlist[n + 1])))
}

/// Width of interval `n` of `tlist`.
pub fn delta_t(tlist: &Array1<f64>, n: usize) -> f64 {
    tlist[n + 1] - tlist[n]
}

/// Check that a time grid is usable: at least two points, strictly
/// increasing.
pub fn validate_tlist(tlist: &Array1<f64>) -> Result<()> {
    if tlist.len() < 2 {
        return Err(Error::Config(format!(
            "time grid must have at least 2 points, got {}",
            tlist.len()
        )));
    }
    for n in 0..tlist.len() - 1 {
        if tlist[n + 1] <= tlist[n] {
            return Err(Error::Config(format!(
                "time grid must be strictly increasing, violated at index {}",
                n
            )));
        }
    }
    Ok(())
}

/// A real-valued pulse: one value per interval of the time grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    values: Array1<f64>,
}

impl Pulse {
    /// Discretise a callable control onto the interval midpoints of `tlist`.
    pub fn from_fn<F>(f: F, tlist: &Array1<f64>) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            values: midpoints(tlist).mapv(f),
        }
    }

    /// Adopt an already-discretised sequence.
    ///
    /// A sequence of length N_T is copied verbatim. A sequence of length
    /// N_T + 1 (sampled on the grid points rather than the midpoints) is
    /// averaged down onto the midpoints. Any other length is a
    /// configuration error.
    pub fn from_samples(values: &Array1<f64>, tlist: &Array1<f64>) -> Result<Self> {
        let n_t = tlist.len() - 1;
        if values.len() == n_t {
            Ok(Self {
                values: values.clone(),
            })
        } else if values.len() == n_t + 1 {
            let averaged =
                Array1::from_iter((0..n_t).map(|n| 0.5 * (values[n] + values[n + 1])));
            Ok(Self { values: averaged })
        } else {
            Err(Error::Config(format!(
                "pulse has {} samples; expected {} (intervals) or {} (grid points)",
                values.len(),
                n_t,
                n_t + 1
            )))
        }
    }

    /// A pulse that is identically zero on `n_intervals` intervals.
    pub fn zeros(n_intervals: usize) -> Self {
        Self {
            values: Array1::zeros(n_intervals),
        }
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the pulse covers no intervals.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value on interval `n`.
    pub fn get(&self, n: usize) -> f64 {
        self.values[n]
    }

    /// Overwrite the value on interval `n`.
    pub fn set(&mut self, n: usize, value: f64) {
        self.values[n] = value;
    }

    /// Borrow the underlying array.
    pub fn as_array(&self) -> &Array1<f64> {
        &self.values
    }

    /// Smallest value across all intervals.
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest value across all intervals.
    pub fn max(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(n: usize) -> Array1<f64> {
        Array1::linspace(0.0, 1.0, n)
    }

    #[test]
    fn test_midpoints() {
        let t = grid(5);
        let m = midpoints(&t);
        assert_eq!(m.len(), 4);
        assert_relative_eq!(m[0], 0.125, epsilon = 1e-14);
        assert_relative_eq!(m[3], 0.875, epsilon = 1e-14);
    }

    #[test]
    fn test_delta_t() {
        let t = grid(5);
        assert_relative_eq!(delta_t(&t, 2), 0.25, epsilon = 1e-14);
    }

    #[test]
    fn test_validate_tlist_accepts_increasing() {
        assert!(validate_tlist(&grid(100)).is_ok());
    }

    #[test]
    fn test_validate_tlist_rejects_short() {
        let t = Array1::from_vec(vec![0.0]);
        assert!(validate_tlist(&t).is_err());
    }

    #[test]
    fn test_validate_tlist_rejects_nonmonotone() {
        let t = Array1::from_vec(vec![0.0, 1.0, 1.0, 2.0]);
        assert!(validate_tlist(&t).is_err());
    }

    #[test]
    fn test_from_fn_samples_midpoints() {
        let t = grid(5);
        let p = Pulse::from_fn(|t| 2.0 * t, &t);
        assert_eq!(p.len(), 4);
        assert_relative_eq!(p.get(0), 0.25, epsilon = 1e-14);
        assert_relative_eq!(p.get(3), 1.75, epsilon = 1e-14);
    }

    #[test]
    fn test_from_samples_exact_length() {
        let t = grid(5);
        let v = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let p = Pulse::from_samples(&v, &t).unwrap();
        assert_eq!(p.as_array(), &v);
    }

    #[test]
    fn test_from_samples_gridpoint_length_averages() {
        let t = grid(5);
        let v = Array1::from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let p = Pulse::from_samples(&v, &t).unwrap();
        assert_eq!(p.len(), 4);
        assert_relative_eq!(p.get(0), 0.5, epsilon = 1e-14);
        assert_relative_eq!(p.get(3), 3.5, epsilon = 1e-14);
    }

    #[test]
    fn test_from_samples_bad_length_rejected() {
        let t = grid(5);
        let v = Array1::from_vec(vec![1.0, 2.0]);
        let err = Pulse::from_samples(&v, &t).unwrap_err();
        assert!(err.to_string().contains("expected 4"));
    }

    #[test]
    fn test_min_max() {
        let t = grid(5);
        let v = Array1::from_vec(vec![-1.0, 2.0, 0.5, 1.5]);
        let p = Pulse::from_samples(&v, &t).unwrap();
        assert_relative_eq!(p.min(), -1.0, epsilon = 1e-14);
        assert_relative_eq!(p.max(), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut p = Pulse::zeros(10);
        p.set(3, 0.7);
        assert_relative_eq!(p.get(3), 0.7, epsilon = 1e-14);
        assert_eq!(p.len(), 10);
    }
}

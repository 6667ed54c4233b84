// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Matrix exponential via scaling-and-squaring with Padé(13) approximation.
//!
//! The piecewise-constant exponential stepper calls this once per time
//! interval, so for the small Hilbert-space dimensions typical of control
//! problems (d ≤ 8) this routine dominates the propagation cost.
//!
//! Ref: Higham (2005), "The Scaling and Squaring Method for the Matrix
//! Exponential Revisited", SIAM J. Matrix Anal. Appl. 26(4), 1179.

use ndarray::{s, Array2};
use num_complex::Complex64;

/// Padé(13,13) numerator coefficients, Higham (2005) eq. (10.33).
const PADE_COEFFS: [f64; 14] = [
    1.0,
    0.5,
    0.12,
    1.833_333_333_333_333_4e-2,
    1.992_753_623_188_405_8e-3,
    1.630_434_782_608_696e-4,
    1.035_196_687_401_6e-5,
    5.175_983_437_008_01e-7,
    2.043_151_356_652_5e-8,
    6.306_022_705_717_593e-10,
    1.483_770_048_404_14e-11,
    2.529_153_491_597_966e-13,
    2.810_170_546_219_962_4e-15,
    1.544_049_750_670_309e-17,
];

/// Scaling threshold θ₁₃ from Higham Table 10.2.
const THETA_13: f64 = 5.37;

/// Compute exp(A) for a square complex matrix.
///
/// # Panics
/// Panics if `a` is not square.
pub fn matrix_exp(a: &Array2<Complex64>) -> Array2<Complex64> {
    let d = a.nrows();
    assert_eq!(d, a.ncols(), "matrix_exp requires a square matrix");

    if d == 0 {
        return Array2::zeros((0, 0));
    }
    if d == 1 {
        let mut result = Array2::zeros((1, 1));
        result[[0, 0]] = a[[0, 0]].exp();
        return result;
    }

    // Scale so that ||A/2^s||₁ < θ₁₃, approximate, then undo the scaling
    // by repeated squaring.
    let norm = one_norm(a);
    let scalings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as u32
    } else {
        0
    };
    let scale = Complex64::new(1.0 / (1u64 << scalings) as f64, 0.0);

    let mut result = pade13(&(a * scale));
    for _ in 0..scalings {
        result = result.dot(&result);
    }
    result
}

/// Padé(13,13) approximant of exp(A) for ||A||₁ < θ₁₃.
fn pade13(a: &Array2<Complex64>) -> Array2<Complex64> {
    let d = a.nrows();
    let eye = Array2::from_diag_elem(d, Complex64::new(1.0, 0.0));

    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    let c = |k: usize| Complex64::new(PADE_COEFFS[k], 0.0);

    // Odd part: U = A·((b13·A6 + b11·A4 + b9·A2)·A6 + b7·A6 + b5·A4 + b3·A2 + b1·I)
    let u_inner = (&a6 * c(13) + &a4 * c(11) + &a2 * c(9)).dot(&a6)
        + &a6 * c(7)
        + &a4 * c(5)
        + &a2 * c(3)
        + &eye * c(1);
    let u = a.dot(&u_inner);

    // Even part: V = (b12·A6 + b10·A4 + b8·A2)·A6 + b6·A6 + b4·A4 + b2·A2 + b0·I
    let v = (&a6 * c(12) + &a4 * c(10) + &a2 * c(8)).dot(&a6)
        + &a6 * c(6)
        + &a4 * c(4)
        + &a2 * c(2)
        + &eye * c(0);

    // exp(A) ≈ (V − U)⁻¹·(V + U)
    gauss_solve(&v - &u, &v + &u)
}

/// Solve A·X = B via Gaussian elimination with partial pivoting.
///
/// The Padé denominator V − U is nonsingular for ||A||₁ < θ₁₃, so a
/// vanishing pivot can only arise from a caller violating the scaling
/// contract; the identity is returned in that case rather than poisoning
/// the result with infinities.
fn gauss_solve(a: Array2<Complex64>, b: Array2<Complex64>) -> Array2<Complex64> {
    let d = a.nrows();
    let m = b.ncols();

    let mut aug = Array2::zeros((d, d + m));
    aug.slice_mut(s![.., ..d]).assign(&a);
    aug.slice_mut(s![.., d..]).assign(&b);

    for col in 0..d {
        let mut pivot_row = col;
        let mut pivot_mag = aug[[col, col]].norm();
        for row in col + 1..d {
            let mag = aug[[row, col]].norm();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = row;
            }
        }
        if pivot_mag < 1e-15 {
            return Array2::from_diag_elem(d, Complex64::new(1.0, 0.0));
        }
        if pivot_row != col {
            for j in 0..d + m {
                aug.swap([col, j], [pivot_row, j]);
            }
        }
        let pivot = aug[[col, col]];
        for row in col + 1..d {
            let factor = aug[[row, col]] / pivot;
            for j in col..d + m {
                let val = aug[[col, j]];
                aug[[row, j]] -= factor * val;
            }
        }
    }

    let mut x = Array2::<Complex64>::zeros((d, m));
    for col in (0..d).rev() {
        let pivot = aug[[col, col]];
        for j in 0..m {
            let mut sum = aug[[col, d + j]];
            for k in col + 1..d {
                sum -= aug[[col, k]] * x[[k, j]];
            }
            x[[col, j]] = sum / pivot;
        }
    }
    x
}

/// Maximum absolute column sum.
fn one_norm(a: &Array2<Complex64>) -> f64 {
    let mut max_sum = 0.0_f64;
    for col in a.columns() {
        let sum: f64 = col.iter().map(|z| z.norm()).sum();
        max_sum = max_sum.max(sum);
    }
    max_sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sigma_x, sigma_z};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn assert_matrix_close(a: &Array2<Complex64>, b: &Array2<Complex64>, tol: f64) {
        assert_eq!(a.shape(), b.shape());
        for ((i, j), val) in a.indexed_iter() {
            let diff = (val - b[[i, j]]).norm();
            assert!(
                diff < tol,
                "mismatch at ({}, {}): {:?} vs {:?} (diff = {})",
                i,
                j,
                val,
                b[[i, j]],
                diff
            );
        }
    }

    #[test]
    fn test_exp_of_zero_is_identity() {
        let zero = Array2::<Complex64>::zeros((3, 3));
        let eye = Array2::from_diag_elem(3, Complex64::new(1.0, 0.0));
        assert_matrix_close(&matrix_exp(&zero), &eye, 1e-14);
    }

    #[test]
    fn test_exp_of_diagonal() {
        let mut a = Array2::zeros((2, 2));
        a[[0, 0]] = Complex64::new(1.0, 0.0);
        a[[1, 1]] = Complex64::new(-2.0, 0.0);
        let result = matrix_exp(&a);
        assert_relative_eq!(result[[0, 0]].re, 1.0_f64.exp(), epsilon = 1e-12);
        assert_relative_eq!(result[[1, 1]].re, (-2.0_f64).exp(), epsilon = 1e-12);
        assert!(result[[0, 1]].norm() < 1e-14);
    }

    #[test]
    fn test_exp_scalar() {
        let mut a = Array2::zeros((1, 1));
        a[[0, 0]] = Complex64::new(0.5, 2.0);
        let result = matrix_exp(&a);
        let expected = Complex64::new(0.5, 2.0).exp();
        assert!((result[[0, 0]] - expected).norm() < 1e-13);
    }

    #[test]
    fn test_exp_rotation_about_x() {
        // exp(−i·(θ/2)·σ_x) = cos(θ/2)·I − i·sin(θ/2)·σ_x
        let theta = PI / 3.0;
        let a = sigma_x() * Complex64::new(0.0, -theta / 2.0);
        let result = matrix_exp(&a);
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        assert_relative_eq!(result[[0, 0]].re, c, epsilon = 1e-12);
        assert_relative_eq!(result[[0, 1]].im, -s, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_is_unitary_for_antihermitian() {
        let a = (sigma_z() + sigma_x()) * Complex64::new(0.0, -0.7);
        let u = matrix_exp(&a);
        let u_dag = u.t().mapv(|z| z.conj());
        let eye = Array2::from_diag_elem(2, Complex64::new(1.0, 0.0));
        assert_matrix_close(&u.dot(&u_dag), &eye, 1e-12);
    }

    #[test]
    fn test_exp_large_norm_triggers_scaling() {
        let mut a = Array2::zeros((2, 2));
        a[[0, 0]] = Complex64::new(50.0, 0.0);
        a[[1, 1]] = Complex64::new(-50.0, 0.0);
        let result = matrix_exp(&a);
        let e50 = 50.0_f64.exp();
        assert_relative_eq!(result[[0, 0]].re, e50, max_relative = 1e-10);
        assert!(result[[1, 1]].re.abs() < 1e-20);
    }

    #[test]
    fn test_exp_group_property() {
        // exp(A)·exp(A) = exp(2A) for commuting arguments
        let a = sigma_x() * Complex64::new(0.0, -0.3);
        let double = sigma_x() * Complex64::new(0.0, -0.6);
        let u = matrix_exp(&a);
        assert_matrix_close(&u.dot(&u), &matrix_exp(&double), 1e-12);
    }
}

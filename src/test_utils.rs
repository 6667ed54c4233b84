// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test fixtures.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::functionals;
use crate::generator::{ControlField, ControlTerm, LinearGenerator};
use crate::optimize::ControlProblem;
use crate::shapes;
use crate::trajectory::Trajectory;

pub fn sigma_x() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 1]] = Complex64::new(1.0, 0.0);
    m[[1, 0]] = Complex64::new(1.0, 0.0);
    m
}

pub fn sigma_y() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 1]] = Complex64::new(0.0, -1.0);
    m[[1, 0]] = Complex64::new(0.0, 1.0);
    m
}

pub fn sigma_z() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 0]] = Complex64::new(1.0, 0.0);
    m[[1, 1]] = Complex64::new(-1.0, 0.0);
    m
}

/// Basis state |i⟩ in a `dim`-dimensional space.
pub fn ket(i: usize, dim: usize) -> Array1<Complex64> {
    let mut psi = Array1::zeros(dim);
    psi[i] = Complex64::new(1.0, 0.0);
    psi
}

/// Two-level state-transfer trajectory |0⟩ → |1⟩ under
/// H = −½σ_z + ε(t)·σ_x with a constant guess amplitude.
pub fn two_level_trajectory(amp: f64) -> Trajectory {
    let generator = Arc::new(LinearGenerator::new(
        sigma_z() * Complex64::new(-0.5, 0.0),
        vec![ControlTerm {
            id: 0,
            operator: sigma_x(),
            field: ControlField::constant(amp),
        }],
    ));
    Trajectory::new(ket(0, 2), generator, Some(ket(1, 2)))
}

/// The canonical state-transfer problem on `[0, 5]`: flattop guess pulse
/// with amplitude 0.2 and the state-to-state functional.
pub fn two_level_problem(tlist: Array1<f64>) -> ControlProblem {
    let generator = Arc::new(LinearGenerator::new(
        sigma_z() * Complex64::new(-0.5, 0.0),
        vec![ControlTerm {
            id: 0,
            operator: sigma_x(),
            field: ControlField::from_fn(|t| 0.2 * shapes::flattop(t, 0.0, 5.0, 0.3, 0.3)),
        }],
    ));
    let trajectory = Trajectory::new(ket(0, 2), generator, Some(ket(1, 2)));
    ControlProblem::new(vec![trajectory], tlist).with_functional(functionals::state_to_state())
}

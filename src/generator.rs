// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dynamical generators and their control structure.
//!
//! A generator G(t; ε₁…ε_L) defines a state's equation of motion,
//! i ∂ₜ|ψ⟩ = G|ψ⟩. The optimizer only needs four things from it: which
//! controls it depends on, its value for given control amplitudes, the
//! derivative ∂G/∂ε_l per control, and its adjoint (for the backward
//! co-state propagation). [`LinearGenerator`] covers the common case
//! G = H₀ + Σ_l ε_l(t)·H_l.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Stable identity token for one scalar control field.
///
/// Controls are compared by this index, never by value. The caller assigns
/// the indices when building generators; the workspace collects the
/// distinct indices across all trajectories into its ordered control list.
pub type ControlId = usize;

/// The continuous control bound to a generator term: either a callable of
/// time or a pre-discretised sample sequence.
///
/// This binding supplies the guess pulse; after discretisation the
/// optimizer works on [`crate::pulse::Pulse`] values only.
#[derive(Clone)]
pub enum ControlField {
    /// ε(t) as a function, evaluated at interval midpoints.
    Callable(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
    /// Samples of length N_T (intervals) or N_T + 1 (grid points).
    Samples(Array1<f64>),
}

impl ControlField {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    /// A control that starts at a constant value.
    pub fn constant(value: f64) -> Self {
        Self::Callable(Arc::new(move |_| value))
    }
}

impl std::fmt::Debug for ControlField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable(_) => write!(f, "Callable(...)"),
            Self::Samples(v) => write!(f, "Samples(len={})", v.len()),
        }
    }
}

/// Derivative ∂G/∂ε_l of a generator with respect to one control.
pub enum ControlDeriv {
    /// The control does not act on this generator; it contributes nothing
    /// to the update.
    Absent,
    /// A constant operator (linear control coupling).
    Constant(Array2<Complex64>),
    /// A time-dependent operator; evaluated with the control values on the
    /// current interval (in the generator's `controls()` order) and the
    /// interval midpoint time.
    TimeDependent(Box<dyn Fn(&[f64], f64) -> Array2<Complex64> + Send + Sync>),
}

impl std::fmt::Debug for ControlDeriv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Constant(m) => write!(f, "Constant({}x{})", m.nrows(), m.ncols()),
            Self::TimeDependent(_) => write!(f, "TimeDependent(...)"),
        }
    }
}

/// Interface the optimizer requires from a dynamical generator.
pub trait Generator: Send + Sync {
    /// Hilbert-space dimension.
    fn dim(&self) -> usize;

    /// Control indices this generator depends on, in a fixed order. The
    /// `eps` slices passed to [`Generator::op`] and to time-dependent
    /// control derivatives follow this order.
    fn controls(&self) -> Vec<ControlId>;

    /// The control field bound to the given control, if this generator
    /// binds one. Supplies the guess pulse at workspace construction.
    fn field(&self, control: ControlId) -> Option<&ControlField>;

    /// Evaluate G for the given control amplitudes at time `t`.
    fn op(&self, eps: &[f64], t: f64) -> Array2<Complex64>;

    /// Derivative ∂G/∂ε for the given control.
    fn control_deriv(&self, control: ControlId) -> ControlDeriv;

    /// The adjoint generator G†, governing the backward co-state equation.
    fn adjoint(&self) -> Arc<dyn Generator>;
}

/// One ε_l(t)·H_l term of a [`LinearGenerator`].
#[derive(Debug, Clone)]
pub struct ControlTerm {
    pub id: ControlId,
    pub operator: Array2<Complex64>,
    pub field: ControlField,
}

/// Generator that is linear in every control: G = H₀ + Σ_l ε_l(t)·H_l.
///
/// For linear generators the control derivative is the constant operator
/// H_l, which makes the first-order pulse update exact in Δε.
#[derive(Debug, Clone)]
pub struct LinearGenerator {
    drift: Array2<Complex64>,
    terms: Vec<ControlTerm>,
}

impl LinearGenerator {
    pub fn new(drift: Array2<Complex64>, terms: Vec<ControlTerm>) -> Self {
        for term in &terms {
            assert_eq!(
                term.operator.nrows(),
                drift.nrows(),
                "control operator dimension must match drift"
            );
        }
        Self { drift, terms }
    }

    /// Generator with no controls (drift only).
    pub fn drift_only(drift: Array2<Complex64>) -> Self {
        Self {
            drift,
            terms: Vec::new(),
        }
    }
}

fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

impl Generator for LinearGenerator {
    fn dim(&self) -> usize {
        self.drift.nrows()
    }

    fn controls(&self) -> Vec<ControlId> {
        self.terms.iter().map(|term| term.id).collect()
    }

    fn field(&self, control: ControlId) -> Option<&ControlField> {
        self.terms
            .iter()
            .find(|term| term.id == control)
            .map(|term| &term.field)
    }

    fn op(&self, eps: &[f64], _t: f64) -> Array2<Complex64> {
        let mut h = self.drift.clone();
        for (term, &amp) in self.terms.iter().zip(eps) {
            h = h + &term.operator * Complex64::new(amp, 0.0);
        }
        h
    }

    fn control_deriv(&self, control: ControlId) -> ControlDeriv {
        match self.terms.iter().find(|term| term.id == control) {
            Some(term) => ControlDeriv::Constant(term.operator.clone()),
            None => ControlDeriv::Absent,
        }
    }

    fn adjoint(&self) -> Arc<dyn Generator> {
        Arc::new(Self {
            drift: dagger(&self.drift),
            terms: self
                .terms
                .iter()
                .map(|term| ControlTerm {
                    id: term.id,
                    operator: dagger(&term.operator),
                    field: term.field.clone(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sigma_x, sigma_z};
    use approx::assert_relative_eq;

    fn xz_generator() -> LinearGenerator {
        LinearGenerator::new(
            sigma_z() * Complex64::new(-0.5, 0.0),
            vec![ControlTerm {
                id: 0,
                operator: sigma_x(),
                field: ControlField::constant(0.2),
            }],
        )
    }

    #[test]
    fn test_dim_and_controls() {
        let g = xz_generator();
        assert_eq!(g.dim(), 2);
        assert_eq!(g.controls(), vec![0]);
    }

    #[test]
    fn test_op_assembles_drift_plus_controls() {
        let g = xz_generator();
        let h = g.op(&[0.3], 0.0);
        assert_relative_eq!(h[[0, 0]].re, -0.5, epsilon = 1e-14);
        assert_relative_eq!(h[[0, 1]].re, 0.3, epsilon = 1e-14);
        assert_relative_eq!(h[[1, 0]].re, 0.3, epsilon = 1e-14);
        assert_relative_eq!(h[[1, 1]].re, 0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_control_deriv_is_constant_operator() {
        let g = xz_generator();
        match g.control_deriv(0) {
            ControlDeriv::Constant(m) => {
                assert_relative_eq!(m[[0, 1]].re, 1.0, epsilon = 1e-14);
            }
            other => panic!("expected Constant, got {:?}", other),
        }
    }

    #[test]
    fn test_control_deriv_absent_for_unknown_control() {
        let g = xz_generator();
        assert!(matches!(g.control_deriv(99), ControlDeriv::Absent));
    }

    #[test]
    fn test_adjoint_of_hermitian_is_itself() {
        let g = xz_generator();
        let adj = g.adjoint();
        let h = g.op(&[0.4], 1.0);
        let h_adj = adj.op(&[0.4], 1.0);
        for ((i, j), v) in h.indexed_iter() {
            assert_relative_eq!(v.re, h_adj[[i, j]].re, epsilon = 1e-14);
            assert_relative_eq!(v.im, h_adj[[i, j]].im, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_adjoint_conjugates_nonhermitian_drift() {
        let mut drift = Array2::<Complex64>::zeros((2, 2));
        drift[[0, 1]] = Complex64::new(0.0, 1.0);
        let g = LinearGenerator::drift_only(drift);
        let adj = g.adjoint();
        let h_adj = adj.op(&[], 0.0);
        assert_relative_eq!(h_adj[[1, 0]].im, -1.0, epsilon = 1e-14);
        assert_relative_eq!(h_adj[[0, 1]].norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_field_lookup() {
        let g = xz_generator();
        assert!(g.field(0).is_some());
        assert!(g.field(1).is_none());
    }

    #[test]
    fn test_drift_only_has_no_controls() {
        let g = LinearGenerator::drift_only(sigma_z());
        assert!(g.controls().is_empty());
    }
}

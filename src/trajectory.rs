// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Trajectories and their time-indexed state storage.

use std::sync::Arc;

use ndarray::{s, Array1, Array2, ArrayView1};
use num_complex::Complex64;

use crate::generator::Generator;
use crate::propagate::PropMethod;

/// One system whose evolution depends on the shared controls: an initial
/// state, a generator, and an optional target state.
#[derive(Clone)]
pub struct Trajectory {
    /// State at t₀.
    pub initial_state: Array1<Complex64>,
    /// Equation-of-motion generator.
    pub generator: Arc<dyn Generator>,
    /// Target state at t_{N_T}, if the functional uses one.
    pub target_state: Option<Array1<Complex64>>,
    /// Propagation method for both directions (overridden by the
    /// direction-specific fields).
    pub prop_method: Option<PropMethod>,
    /// Forward-propagation method override.
    pub fw_prop_method: Option<PropMethod>,
    /// Backward-propagation method override.
    pub bw_prop_method: Option<PropMethod>,
}

impl Trajectory {
    pub fn new(
        initial_state: Array1<Complex64>,
        generator: Arc<dyn Generator>,
        target_state: Option<Array1<Complex64>>,
    ) -> Self {
        Self {
            initial_state,
            generator,
            target_state,
            prop_method: None,
            fw_prop_method: None,
            bw_prop_method: None,
        }
    }

    pub fn with_prop_method(mut self, method: PropMethod) -> Self {
        self.prop_method = Some(method);
        self
    }

    /// The adjoint trajectory: same states, adjoint generator. Its
    /// generator governs the backward co-state propagation.
    pub fn adjoint(&self) -> Self {
        Self {
            initial_state: self.initial_state.clone(),
            generator: self.generator.adjoint(),
            target_state: self.target_state.clone(),
            prop_method: self.prop_method,
            fw_prop_method: self.fw_prop_method,
            bw_prop_method: self.bw_prop_method,
        }
    }
}

impl std::fmt::Debug for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trajectory")
            .field("dim", &self.generator.dim())
            .field("has_target", &self.target_state.is_some())
            .finish()
    }
}

/// Time-indexed storage for N_T + 1 state snapshots of one trajectory.
///
/// Column n holds the state at grid point t_n. The layout is one
/// contiguous (dim × N_T+1) array so a sweep walks memory linearly.
#[derive(Debug, Clone)]
pub struct StateStorage {
    data: Array2<Complex64>,
}

impl StateStorage {
    pub fn new(dim: usize, n_intervals: usize) -> Self {
        Self {
            data: Array2::zeros((dim, n_intervals + 1)),
        }
    }

    /// Number of snapshot slots (N_T + 1).
    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.ncols() == 0
    }

    /// Store a state at grid point `n`. Writes may happen in any order.
    pub fn write(&mut self, n: usize, state: ArrayView1<Complex64>) {
        self.data.slice_mut(s![.., n]).assign(&state);
    }

    /// Borrow the state at grid point `n`.
    pub fn read(&self, n: usize) -> ArrayView1<'_, Complex64> {
        self.data.slice(s![.., n])
    }

    /// Copy the state at grid point `n` into a caller-supplied buffer.
    pub fn read_into(&self, n: usize, buf: &mut Array1<Complex64>) {
        buf.assign(&self.data.slice(s![.., n]));
    }
}

// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Piecewise propagation: the stepper contract the optimizer drives.
//!
//! The optimizer never integrates an equation of motion itself. It owns a
//! [`PiecewisePropagator`] per trajectory and direction, rebinds the
//! propagator's pulse arrays, reinitialises it at a boundary state, and
//! asks for one interval step at a time. Two concrete steppers are
//! provided:
//!
//! - [`ExpmPropagator`]: exact piecewise-constant exponential step
//! - [`Rk4Propagator`]: classical 4th-order Runge–Kutta step

pub mod expm;
pub mod stepper;

pub use expm::matrix_exp;
pub use stepper::{ExpmPropagator, Rk4Propagator};

use std::sync::Arc;

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;

use crate::error::Result;
use crate::generator::Generator;
use crate::pulse::Pulse;

/// Options passed to [`PiecewisePropagator::reinit`].
#[derive(Debug, Clone, Default)]
pub struct PropagationOptions {
    /// Step from t_{N_T} downward instead of from t₀ upward.
    pub backward: bool,
    /// Allowed value range per control (indexed like the bound pulses).
    /// Steppers that check bounds reject values outside these ranges.
    pub control_ranges: Option<Vec<(f64, f64)>>,
}

/// A stepper that advances a state across one time-grid interval at a
/// time, with the controls held piecewise-constant on each interval.
pub trait PiecewisePropagator: Send {
    /// Attach the pulse arrays, one per workspace control in control-index
    /// order, replacing any previous binding. The propagator keeps its own
    /// copy; [`PiecewisePropagator::set_pulse_value`] updates it.
    fn rebind(&mut self, pulses: &[Pulse]);

    /// Overwrite the bound value of one control on one interval.
    fn set_pulse_value(&mut self, control: usize, interval: usize, value: f64);

    /// Reset to step from the grid boundary (t₀ forward, t_{N_T}
    /// backward), starting at the given state.
    fn reinit(&mut self, state: ArrayView1<Complex64>, options: &PropagationOptions)
        -> Result<()>;

    /// Advance one interval.
    fn step(&mut self) -> Result<()>;

    /// Borrow the latest state.
    fn state(&self) -> ArrayView1<'_, Complex64>;

    /// Whether this stepper validates pulse values against
    /// [`PropagationOptions::control_ranges`].
    fn checks_pulse_bounds(&self) -> bool;
}

/// Propagation method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropMethod {
    /// Let the workspace pick (currently [`PropMethod::Expm`]).
    #[default]
    Auto,
    /// Piecewise-constant matrix exponential.
    Expm,
    /// Classical 4th-order Runge–Kutta.
    Rk4,
}

impl PropMethod {
    /// Resolve the method for one direction of one trajectory.
    ///
    /// Precedence: caller's direction-specific choice, then the caller's
    /// generic choice, then the trajectory's direction-specific choice,
    /// then the trajectory's generic choice, then `Auto`.
    pub fn resolve(
        caller_directional: Option<PropMethod>,
        caller_generic: Option<PropMethod>,
        traj_directional: Option<PropMethod>,
        traj_generic: Option<PropMethod>,
    ) -> PropMethod {
        caller_directional
            .or(caller_generic)
            .or(traj_directional)
            .or(traj_generic)
            .unwrap_or(PropMethod::Auto)
    }

    /// Construct a propagator of this method.
    ///
    /// `ctrl_positions` maps the generator's `controls()` order to
    /// positions in the workspace control list (= indices into the bound
    /// pulse slice).
    pub fn build(
        self,
        generator: Arc<dyn Generator>,
        tlist: Array1<f64>,
        ctrl_positions: Vec<usize>,
        initial_state: Array1<Complex64>,
    ) -> Box<dyn PiecewisePropagator + Send> {
        match self {
            PropMethod::Auto | PropMethod::Expm => Box::new(ExpmPropagator::new(
                generator,
                tlist,
                ctrl_positions,
                initial_state,
            )),
            PropMethod::Rk4 => Box::new(Rk4Propagator::new(
                generator,
                tlist,
                ctrl_positions,
                initial_state,
            )),
        }
    }
}

/// Allowed value range per control, widened from the bound pulses.
///
/// Each control's observed range [ε_min, ε_max] is widened to
/// [min(ε_min, k·ε_min), max(ε_max, k·ε_max)], leaving the update room to
/// move without tripping a bounds-checking stepper on the first iteration.
/// Checking steppers get k = 2; non-checking steppers get the looser k = 5
/// purely as documentation of intent.
pub fn widened_control_ranges(pulses: &[Pulse], k: f64) -> Vec<(f64, f64)> {
    pulses
        .iter()
        .map(|p| {
            let lo = p.min();
            let hi = p.max();
            (lo.min(k * lo), hi.max(k * hi))
        })
        .collect()
}

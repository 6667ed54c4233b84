// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composable convergence checks.
//!
//! A check inspects the result after each iteration and may set
//! `converged` and `message`; the driver stops before the next iteration
//! once `converged` is set. Checks run in the order they are combined, and
//! a later check never un-sets an earlier verdict.

use crate::result::OptimizationResult;

/// A convergence check, invoked after every iteration.
pub type ConvergenceCheck = Box<dyn FnMut(&mut OptimizationResult)>;

/// Stop once J_T falls below `threshold`.
pub fn value_below(threshold: f64) -> ConvergenceCheck {
    Box::new(move |result| {
        if result.j_t < threshold {
            result.converged = true;
            result.message = format!("J_T < {:e}", threshold);
        }
    })
}

/// Stop once |ΔJ_T| between consecutive iterations falls below
/// `threshold`.
pub fn delta_below(threshold: f64) -> ConvergenceCheck {
    Box::new(move |result| {
        let delta = result.j_t - result.j_t_prev;
        if delta.abs() < threshold {
            result.converged = true;
            result.message = format!("|dJ_T| < {:e}", threshold);
        }
    })
}

/// Stop (as a failure indicator) when J_T increases between iterations.
///
/// First-order updates guarantee monotonic decrease up to propagator
/// tolerance, so an increase signals a too-small λ_a or a numerically
/// unstable propagation.
pub fn check_monotonic_error() -> ConvergenceCheck {
    Box::new(move |result| {
        let delta = result.j_t - result.j_t_prev;
        if delta > 0.0 {
            result.converged = true;
            result.message = format!("dJ_T = {:e} > 0: loss of monotonic convergence", delta);
        }
    })
}

/// Run two checks in sequence.
pub fn and(mut first: ConvergenceCheck, mut second: ConvergenceCheck) -> ConvergenceCheck {
    Box::new(move |result| {
        first(result);
        second(result);
    })
}

// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! The mutable result record of an optimization run.

use std::time::SystemTime;

use ndarray::Array1;
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::pulse::Pulse;

/// Accumulator for everything an optimization run produces: convergence
/// data per iteration, the guess and optimized pulses, and the terminal
/// forward states. Carries enough to restart the run via `continue_from`.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// The time grid the run was discretised on.
    pub tlist: Array1<f64>,
    /// First iteration index of this run.
    pub iter_start: usize,
    /// Iteration index at which the run stops unconditionally.
    pub iter_stop: usize,
    /// Index of the last completed iteration (monotone non-decreasing).
    pub iter: usize,
    /// Wall-clock seconds of the last iteration.
    pub secs: f64,
    /// Per-trajectory overlaps ⟨target|ϕ(T)⟩ from the last functional
    /// evaluation; `None` before the first evaluation.
    pub tau_vals: Option<Vec<Complex64>>,
    /// Value of the final-time functional after the last iteration.
    pub j_t: f64,
    /// Value of the functional at the previously reported iteration.
    pub j_t_prev: f64,
    /// Pulses at iteration 0 (or adopted from a continued run).
    pub guess_controls: Vec<Pulse>,
    /// Pulses after the last completed iteration.
    pub optimized_controls: Vec<Pulse>,
    /// Forward end-states after the last completed forward sweep.
    pub states: Vec<Array1<Complex64>>,
    /// Local time at which the run started.
    pub start_local_time: SystemTime,
    /// Local time at which the run finished.
    pub end_local_time: SystemTime,
    /// Free-form per-iteration records returned by the info hook.
    pub records: Vec<Vec<f64>>,
    /// Whether a convergence condition was met.
    pub converged: bool,
    /// Human-readable reason for stopping.
    pub message: String,
}

impl OptimizationResult {
    /// Fresh result at the start of a run; `guess_controls` snapshots the
    /// discretised controls.
    pub fn new(
        tlist: Array1<f64>,
        guess_controls: Vec<Pulse>,
        iter_start: usize,
        iter_stop: usize,
    ) -> Self {
        Self {
            tlist,
            iter_start,
            iter_stop,
            iter: iter_start,
            secs: 0.0,
            tau_vals: None,
            j_t: f64::NAN,
            j_t_prev: f64::NAN,
            optimized_controls: guess_controls.clone(),
            guess_controls,
            states: Vec::new(),
            start_local_time: SystemTime::now(),
            end_local_time: SystemTime::now(),
            records: Vec::new(),
            converged: false,
            message: String::new(),
        }
    }

    /// Adopt a prior result for continuation: its optimized controls
    /// become the new guess, iteration numbering continues from its
    /// `iter`, and `iter_stop` is replaced. Prior records are kept.
    pub fn continue_from(
        prior: &OptimizationResult,
        tlist: &Array1<f64>,
        iter_stop: usize,
    ) -> Result<Self> {
        if prior.tlist.len() != tlist.len() {
            return Err(Error::Config(format!(
                "continued run has {} time-grid points but the prior result has {}",
                tlist.len(),
                prior.tlist.len()
            )));
        }
        let mut result = prior.clone();
        result.guess_controls = prior.optimized_controls.clone();
        result.iter_start = prior.iter;
        result.iter_stop = iter_stop;
        result.converged = false;
        result.message = String::new();
        result.start_local_time = SystemTime::now();
        Ok(result)
    }

    /// Record the completion of iteration `iter`.
    ///
    /// # Panics
    /// Panics in debug builds if `iter` would move backwards.
    pub fn advance_iteration(&mut self, iter: usize, secs: f64) {
        debug_assert!(iter >= self.iter, "iteration index must not decrease");
        self.iter = iter;
        self.secs = secs;
    }

    /// Shift the functional value into `j_t_prev` and store the new one.
    pub fn push_functional_value(&mut self, j_t: f64) {
        self.j_t_prev = self.j_t;
        self.j_t = j_t;
    }

    /// Mark the run as finished.
    pub fn finalize(&mut self) {
        self.end_local_time = SystemTime::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1 as A1;

    fn grid() -> A1<f64> {
        A1::linspace(0.0, 1.0, 11)
    }

    fn make_result() -> OptimizationResult {
        let tlist = grid();
        let guess = vec![Pulse::from_fn(|t| t, &tlist)];
        OptimizationResult::new(tlist, guess, 0, 50)
    }

    #[test]
    fn test_new_snapshots_guess() {
        let result = make_result();
        assert_eq!(result.guess_controls.len(), 1);
        assert_eq!(result.guess_controls[0], result.optimized_controls[0]);
        assert_eq!(result.iter, 0);
        assert!(result.j_t.is_nan());
        assert!(!result.converged);
        assert!(result.tau_vals.is_none());
    }

    #[test]
    fn test_push_functional_value_shifts_prev() {
        let mut result = make_result();
        result.push_functional_value(0.8);
        assert!(result.j_t_prev.is_nan());
        result.push_functional_value(0.5);
        assert_eq!(result.j_t_prev, 0.8);
        assert_eq!(result.j_t, 0.5);
    }

    #[test]
    fn test_advance_iteration() {
        let mut result = make_result();
        result.advance_iteration(1, 0.25);
        assert_eq!(result.iter, 1);
        assert_eq!(result.secs, 0.25);
        result.advance_iteration(2, 0.5);
        assert_eq!(result.iter, 2);
    }

    #[test]
    fn test_continue_from_adopts_optimized_as_guess() {
        let mut prior = make_result();
        prior.optimized_controls[0].set(3, 9.0);
        prior.advance_iteration(10, 1.0);
        prior.converged = true;
        prior.message = "done".into();
        prior.records.push(vec![10.0, 0.1]);

        let cont = OptimizationResult::continue_from(&prior, &grid(), 50).unwrap();
        assert_eq!(cont.guess_controls[0].get(3), 9.0);
        assert_eq!(cont.iter_start, 10);
        assert_eq!(cont.iter, 10);
        assert_eq!(cont.iter_stop, 50);
        assert!(!cont.converged);
        assert!(cont.message.is_empty());
        assert_eq!(cont.records.len(), 1);
    }

    #[test]
    fn test_continue_from_rejects_grid_mismatch() {
        let prior = make_result();
        let other = A1::linspace(0.0, 1.0, 7);
        assert!(OptimizationResult::continue_from(&prior, &other, 50).is_err());
    }
}

// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! The optimization driver: problem definition and the iteration loop.
//!
//! [`optimize_pulses`] runs first-order Krotov iterations until a
//! convergence check fires or the iteration limit is reached:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ validate problem, build workspace                   │
//! │   ↓                                                 │
//! │ initial forward propagation (unless skipped)        │
//! │   ↓                                                 │
//! │ report iteration 0                                  │
//! │   ↓                                                 │
//! │ ┌─► backward sweep (χ under the guess pulses)       │
//! │ │     ↓                                             │
//! │ │   forward sweep with per-interval pulse update    │
//! │ │     ↓                                             │
//! │ │   update hook → info hook → convergence check     │
//! │ │     ↓                                             │
//! │ └── swap pulse buffers, until converged or capped   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Reaching the iteration cap is not an error: the result is marked
//! converged with a distinguishing message.

use std::collections::HashMap;
use std::time::Instant;

use ndarray::Array1;

use crate::convergence::ConvergenceCheck;
use crate::error::{Error, Result};
use crate::functionals::{ChiFn, FunctionalPair, JtFn};
use crate::generator::ControlId;
use crate::propagate::PropMethod;
use crate::pulse::validate_tlist;
use crate::report;
use crate::result::OptimizationResult;
use crate::trajectory::Trajectory;
use crate::workspace::{PulseOptions, Workspace};

/// Hook invoked after the iteration engine, before the info hook. May
/// mutate the workspace, including the freshly written pulses.
pub type UpdateHook = Box<dyn FnMut(&mut Workspace, usize)>;

/// Hook invoked after each iteration (and once for iteration 0); an
/// optional record it returns is appended to the result's `records`.
pub type InfoHook = Box<dyn FnMut(&Workspace, usize) -> Option<Vec<f64>>>;

/// A full description of one optimization run: trajectories, time grid,
/// functional, per-control options, hooks, and driver settings.
pub struct ControlProblem {
    pub(crate) trajectories: Vec<Trajectory>,
    pub(crate) tlist: Array1<f64>,
    pub(crate) j_t: Option<Box<JtFn>>,
    pub(crate) chi: Option<Box<ChiFn>>,
    pub(crate) pulse_options: Option<HashMap<ControlId, PulseOptions>>,
    pub(crate) iter_start: usize,
    pub(crate) iter_stop: usize,
    pub(crate) prop_method: Option<PropMethod>,
    pub(crate) fw_prop_method: Option<PropMethod>,
    pub(crate) bw_prop_method: Option<PropMethod>,
    pub(crate) update_hook: Option<UpdateHook>,
    pub(crate) info_hook: Option<InfoHook>,
    pub(crate) check_convergence: Option<ConvergenceCheck>,
    pub(crate) verbose: bool,
    pub(crate) skip_initial_forward_propagation: bool,
    pub(crate) continue_from: Option<OptimizationResult>,
    pub(crate) use_threads: bool,
}

impl ControlProblem {
    /// A problem with default driver settings: iterations 0..5000, expm
    /// propagation, the progress table as info hook, no threading.
    pub fn new(trajectories: Vec<Trajectory>, tlist: Array1<f64>) -> Self {
        Self {
            trajectories,
            tlist,
            j_t: None,
            chi: None,
            pulse_options: None,
            iter_start: 0,
            iter_stop: 5000,
            prop_method: None,
            fw_prop_method: None,
            bw_prop_method: None,
            update_hook: None,
            info_hook: None,
            check_convergence: None,
            verbose: false,
            skip_initial_forward_propagation: false,
            continue_from: None,
            use_threads: false,
        }
    }

    /// Set the final-time functional J_T. Required.
    pub fn with_j_t<F>(mut self, j_t: F) -> Self
    where
        F: Fn(&[Array1<num_complex::Complex64>], &[Trajectory]) -> f64 + 'static,
    {
        self.j_t = Some(Box::new(j_t));
        self
    }

    /// Set the co-state constructor χ = −∂J_T/∂⟨ϕ(T)|. Required unless a
    /// standard functional pair supplies it.
    pub fn with_chi<F>(mut self, chi: F) -> Self
    where
        F: Fn(
                &mut [Array1<num_complex::Complex64>],
                &[Array1<num_complex::Complex64>],
                &[Trajectory],
            ) + 'static,
    {
        self.chi = Some(Box::new(chi));
        self
    }

    /// Set J_T and χ together from a matching pair.
    pub fn with_functional(mut self, pair: FunctionalPair) -> Self {
        self.j_t = Some(pair.j_t);
        self.chi = Some(pair.chi);
        self
    }

    /// Per-control λ_a, update shape, and parametrisation. Without this,
    /// defaults apply to every control and a warning is logged.
    pub fn with_pulse_options(mut self, options: HashMap<ControlId, PulseOptions>) -> Self {
        self.pulse_options = Some(options);
        self
    }

    pub fn with_iter_start(mut self, iter_start: usize) -> Self {
        self.iter_start = iter_start;
        self
    }

    pub fn with_iter_stop(mut self, iter_stop: usize) -> Self {
        self.iter_stop = iter_stop;
        self
    }

    /// Propagation method for both directions of every trajectory.
    pub fn with_prop_method(mut self, method: PropMethod) -> Self {
        self.prop_method = Some(method);
        self
    }

    /// Forward-propagation method, overriding `with_prop_method`.
    pub fn with_fw_prop_method(mut self, method: PropMethod) -> Self {
        self.fw_prop_method = Some(method);
        self
    }

    /// Backward-propagation method, overriding `with_prop_method`.
    pub fn with_bw_prop_method(mut self, method: PropMethod) -> Self {
        self.bw_prop_method = Some(method);
        self
    }

    /// Hook run after each iteration's engine pass, before the info hook.
    pub fn with_update_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut Workspace, usize) + 'static,
    {
        self.update_hook = Some(Box::new(hook));
        self
    }

    /// Replace the default progress table with a custom info hook.
    pub fn with_info_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Workspace, usize) -> Option<Vec<f64>> + 'static,
    {
        self.info_hook = Some(Box::new(hook));
        self
    }

    /// Convergence check run after each iteration.
    pub fn with_check_convergence(mut self, check: ConvergenceCheck) -> Self {
        self.check_convergence = Some(check);
        self
    }

    /// Narrate initialisation at info level instead of debug.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Evaluate iteration 0 on whatever states the forward propagators
    /// already hold instead of propagating the guess.
    pub fn skip_initial_forward_propagation(mut self, skip: bool) -> Self {
        self.skip_initial_forward_propagation = skip;
        self
    }

    /// Adopt a prior result: its optimized pulses become the guess and
    /// iteration numbering continues from its last iteration.
    pub fn continue_from(mut self, prior: OptimizationResult) -> Self {
        self.continue_from = Some(prior);
        self
    }

    /// Run the fork-join regions on a worker pool. Results are identical
    /// either way; the update reduction is always sequential.
    pub fn use_threads(mut self, use_threads: bool) -> Self {
        self.use_threads = use_threads;
        self
    }

    /// Check everything that must hold before iteration 0.
    pub fn validate(&self) -> Result<()> {
        if self.trajectories.is_empty() {
            return Err(Error::Config("at least one trajectory is required".into()));
        }
        validate_tlist(&self.tlist)?;
        if self.j_t.is_none() {
            return Err(Error::Config(
                "a final-time functional J_T is required".into(),
            ));
        }
        if self.chi.is_none() {
            return Err(Error::Config(
                "no co-state constructor: supply `chi` or build the problem from a \
                 standard functional pair"
                    .into(),
            ));
        }
        if self.continue_from.is_none() && self.iter_stop < self.iter_start {
            return Err(Error::Config(format!(
                "iter_stop ({}) must not be below iter_start ({})",
                self.iter_stop, self.iter_start
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ControlProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlProblem")
            .field("n_trajectories", &self.trajectories.len())
            .field("n_time_points", &self.tlist.len())
            .field("iter_start", &self.iter_start)
            .field("iter_stop", &self.iter_stop)
            .field("use_threads", &self.use_threads)
            .finish()
    }
}

/// Run the Krotov optimization described by `problem`.
///
/// Configuration errors abort before iteration 0. Propagation errors
/// propagate out unchanged; the result is not returned in that case.
/// Hooks are infallible; a panicking hook unwinds through the driver.
pub fn optimize_pulses(mut problem: ControlProblem) -> Result<OptimizationResult> {
    problem.validate()?;

    let j_t = problem.j_t.take().expect("validated above");
    let chi = problem.chi.take().expect("validated above");
    let mut update_hook = problem.update_hook.take();
    let mut info_hook = problem.info_hook.take();
    let mut check_convergence = problem.check_convergence.take();
    let skip_initial = problem.skip_initial_forward_propagation;
    let verbose = problem.verbose;

    let mut wrk = Workspace::new(&mut problem)?;

    if skip_initial {
        if verbose {
            tracing::info!("skipping initial forward propagation");
        } else {
            tracing::debug!("skipping initial forward propagation");
        }
    } else {
        wrk.initial_forward_propagation()?;
    }
    wrk.evaluate_functional(&*j_t);

    let first_iteration = wrk.result.iter;
    run_info_hook(&mut wrk, &mut info_hook, first_iteration);

    while !wrk.result.converged && wrk.result.iter < wrk.result.iter_stop {
        let iteration = wrk.result.iter + 1;
        let timer = Instant::now();
        wrk.krotov_iteration(&*chi, &*j_t)?;
        wrk.result
            .advance_iteration(iteration, timer.elapsed().as_secs_f64());

        if let Some(hook) = update_hook.as_mut() {
            hook(&mut wrk, iteration);
        }
        wrk.sync_optimized_controls();
        run_info_hook(&mut wrk, &mut info_hook, iteration);
        if let Some(check) = check_convergence.as_mut() {
            check(&mut wrk.result);
        }
        wrk.swap_pulse_buffers();
    }

    if !wrk.result.converged {
        wrk.result.converged = true;
        wrk.result.message = "Reached maximum number of iterations".into();
    }
    wrk.result.finalize();
    Ok(wrk.result)
}

fn run_info_hook(wrk: &mut Workspace, info_hook: &mut Option<InfoHook>, iteration: usize) {
    let record = match info_hook.as_mut() {
        Some(hook) => hook(wrk, iteration),
        None => {
            let g_a_sum: f64 = wrk.g_a_integrals().iter().sum();
            report::print_table(&wrk.result, g_a_sum)
        }
    };
    if let Some(record) = record {
        wrk.result.records.push(record);
    }
}

// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Krotov's method for quantum optimal control.
//!
//! This crate implements the first-order Krotov iteration for a finite
//! collection of control trajectories sharing a set of time-dependent
//! control fields. Each iteration is monotonically convergent: a backward
//! sweep of the co-states under the guess pulses, then a forward sweep in
//! which every time interval's pulse value is updated from
//! Im⟨χ|∂G/∂ε|ϕ⟩ immediately before the step across that interval.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              optimize_pulses                  │
//! ├──────────────────────────────────────────────┤
//! │  ControlProblem (functional, hooks, options)  │
//! ├──────────────────────────────────────────────┤
//! │                 Workspace                     │
//! │   ε⁽ⁱ⁾/ε⁽ⁱ⁺¹⁾ ring │ storages │ g_a │ S, λ_a │
//! ├───────────────────┬──────────────────────────┤
//! │  backward sweep   │  forward sweep + update  │
//! ├───────────────────┴──────────────────────────┤
//! │     PiecewisePropagator (expm / RK4)          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`optimize`]: problem definition and the driver loop
//! - [`workspace`]: buffers, propagator handles, the iteration engine
//! - [`trajectory`]: trajectories and state storage
//! - [`generator`]: generator interface and control derivatives
//! - [`propagate`]: the piecewise stepper contract and implementations
//! - [`pulse`]: discretisation of controls onto interval midpoints
//! - [`parametrize`]: bounded control parametrisations
//! - [`functionals`]: standard J_T / χ pairs
//! - [`shapes`]: update-shape window functions
//! - [`convergence`]: composable convergence checks
//! - [`result`]: the accumulating result record
//! - [`report`]: the default progress table
//! - [`error`]: error types
//!
//! # References
//!
//! - Konnov, Krotov (1999), Autom. Remote Control 60, 1427.
//! - Reich, Ndong, Koch (2012), J. Chem. Phys. 136, 104103.
//!   arXiv:1008.5126
//! - Goerz et al. (2019), SciPost Phys. 7, 080. arXiv:1902.11284

pub mod convergence;
pub mod error;
pub mod functionals;
pub mod generator;
pub mod optimize;
pub mod parametrize;
pub mod propagate;
pub mod pulse;
pub mod report;
pub mod result;
pub mod shapes;
pub mod trajectory;
pub mod workspace;

pub use error::{Error, Result};
pub use generator::{ControlDeriv, ControlField, ControlId, ControlTerm, Generator, LinearGenerator};
pub use optimize::{optimize_pulses, ControlProblem};
pub use parametrize::{Parametrization, TanhParametrization};
pub use propagate::{PiecewisePropagator, PropMethod, PropagationOptions};
pub use pulse::Pulse;
pub use result::OptimizationResult;
pub use trajectory::{StateStorage, Trajectory};
pub use workspace::{PulseOptions, Workspace};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

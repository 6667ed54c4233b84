// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the optimizer core.

use std::fmt;

/// Result type alias for optimizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Optimizer error types.
#[derive(Debug)]
pub enum Error {
    /// Problem configuration error; aborts before the first iteration.
    Config(String),
    /// A pulse value left the range declared to the propagator.
    ControlRange {
        control: usize,
        interval: usize,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Propagation failure inside a stepper.
    Propagation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::ControlRange {
                control,
                interval,
                value,
                min,
                max,
            } => write!(
                f,
                "Control {} at interval {} has value {:.6e} outside [{:.6e}, {:.6e}]",
                control, interval, value, min, max
            ),
            Error::Propagation(msg) => write!(f, "Propagation error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

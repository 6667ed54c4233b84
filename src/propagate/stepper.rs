// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Concrete piecewise steppers.

use std::sync::Arc;

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;

use super::expm::matrix_exp;
use super::{PiecewisePropagator, PropagationOptions};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::pulse::Pulse;

/// State shared by all piecewise steppers: the bound pulses, the cursor on
/// the time grid, and the current state vector.
struct StepperCore {
    generator: Arc<dyn Generator>,
    tlist: Array1<f64>,
    /// Position of each of the generator's controls in the bound pulse
    /// slice, in the generator's `controls()` order.
    ctrl_positions: Vec<usize>,
    pulses: Vec<Pulse>,
    state: Array1<Complex64>,
    /// Next interval to step over (forward), or one past it (backward).
    cursor: usize,
    backward: bool,
    control_ranges: Option<Vec<(f64, f64)>>,
}

impl StepperCore {
    fn new(
        generator: Arc<dyn Generator>,
        tlist: Array1<f64>,
        ctrl_positions: Vec<usize>,
        initial_state: Array1<Complex64>,
    ) -> Self {
        Self {
            generator,
            tlist,
            ctrl_positions,
            pulses: Vec::new(),
            state: initial_state,
            cursor: 0,
            backward: false,
            control_ranges: None,
        }
    }

    fn n_intervals(&self) -> usize {
        self.tlist.len() - 1
    }

    fn rebind(&mut self, pulses: &[Pulse]) {
        self.pulses = pulses.to_vec();
    }

    fn set_pulse_value(&mut self, control: usize, interval: usize, value: f64) {
        self.pulses[control].set(interval, value);
    }

    fn reinit(
        &mut self,
        state: ArrayView1<Complex64>,
        options: &PropagationOptions,
    ) -> Result<()> {
        if state.len() != self.generator.dim() {
            return Err(Error::Propagation(format!(
                "state dimension {} does not match generator dimension {}",
                state.len(),
                self.generator.dim()
            )));
        }
        self.state = state.to_owned();
        self.backward = options.backward;
        self.cursor = if options.backward {
            self.n_intervals()
        } else {
            0
        };
        self.control_ranges = options.control_ranges.clone();
        Ok(())
    }

    /// The interval the next step covers.
    fn next_interval(&self) -> Result<usize> {
        if self.backward {
            if self.cursor == 0 {
                Err(Error::Propagation(
                    "backward step past the start of the time grid".into(),
                ))
            } else {
                Ok(self.cursor - 1)
            }
        } else if self.cursor >= self.n_intervals() {
            Err(Error::Propagation(
                "forward step past the end of the time grid".into(),
            ))
        } else {
            Ok(self.cursor)
        }
    }

    /// Control values on interval `n`, in the generator's `controls()`
    /// order. Validates bounds when `check` is set.
    fn gather_eps(&self, n: usize, check: bool) -> Result<Vec<f64>> {
        let mut eps = Vec::with_capacity(self.ctrl_positions.len());
        for &pos in &self.ctrl_positions {
            let pulse = self.pulses.get(pos).ok_or_else(|| {
                Error::Propagation(format!("no pulse bound for control {}", pos))
            })?;
            let value = pulse.get(n);
            if check {
                if let Some(ranges) = &self.control_ranges {
                    let (min, max) = ranges[pos];
                    if value < min || value > max {
                        return Err(Error::ControlRange {
                            control: pos,
                            interval: n,
                            value,
                            min,
                            max,
                        });
                    }
                }
            }
            eps.push(value);
        }
        Ok(eps)
    }

    /// Signed interval width and midpoint time for interval `n`. The width
    /// is negative in backward mode, so a single step formula covers both
    /// directions.
    fn interval_times(&self, n: usize) -> (f64, f64) {
        let dt = self.tlist[n + 1] - self.tlist[n];
        let t_mid = 0.5 * (self.tlist[n] + self.tlist[n + 1]);
        (if self.backward { -dt } else { dt }, t_mid)
    }

    fn advance(&mut self) {
        if self.backward {
            self.cursor -= 1;
        } else {
            self.cursor += 1;
        }
    }
}

/// Exact piecewise-constant stepper: ψ ← exp(−i·G·Δtₙ)·ψ.
///
/// The exponential is valid for any control amplitude, so this stepper
/// does not validate pulse values against the declared control ranges.
pub struct ExpmPropagator {
    core: StepperCore,
}

impl ExpmPropagator {
    pub fn new(
        generator: Arc<dyn Generator>,
        tlist: Array1<f64>,
        ctrl_positions: Vec<usize>,
        initial_state: Array1<Complex64>,
    ) -> Self {
        Self {
            core: StepperCore::new(generator, tlist, ctrl_positions, initial_state),
        }
    }
}

impl PiecewisePropagator for ExpmPropagator {
    fn rebind(&mut self, pulses: &[Pulse]) {
        self.core.rebind(pulses);
    }

    fn set_pulse_value(&mut self, control: usize, interval: usize, value: f64) {
        self.core.set_pulse_value(control, interval, value);
    }

    fn reinit(
        &mut self,
        state: ArrayView1<Complex64>,
        options: &PropagationOptions,
    ) -> Result<()> {
        self.core.reinit(state, options)
    }

    fn step(&mut self) -> Result<()> {
        let n = self.core.next_interval()?;
        let eps = self.core.gather_eps(n, false)?;
        let (dt, t_mid) = self.core.interval_times(n);
        let h = self.core.generator.op(&eps, t_mid);
        let u = matrix_exp(&(&h * Complex64::new(0.0, -dt)));
        self.core.state = u.dot(&self.core.state);
        self.core.advance();
        Ok(())
    }

    fn state(&self) -> ArrayView1<'_, Complex64> {
        self.core.state.view()
    }

    fn checks_pulse_bounds(&self) -> bool {
        false
    }
}

/// Classical 4th-order Runge–Kutta stepper on i ∂ₜψ = G·ψ, one RK4 stage
/// per grid interval with G held constant on the interval.
///
/// The fixed step is only accurate while ‖G‖·Δt stays small, so this
/// stepper validates pulse values against the declared control ranges.
pub struct Rk4Propagator {
    core: StepperCore,
}

impl Rk4Propagator {
    pub fn new(
        generator: Arc<dyn Generator>,
        tlist: Array1<f64>,
        ctrl_positions: Vec<usize>,
        initial_state: Array1<Complex64>,
    ) -> Self {
        Self {
            core: StepperCore::new(generator, tlist, ctrl_positions, initial_state),
        }
    }
}

fn schrodinger_rhs(
    h: &ndarray::Array2<Complex64>,
    psi: &Array1<Complex64>,
) -> Array1<Complex64> {
    h.dot(psi).mapv(|z| -Complex64::i() * z)
}

impl PiecewisePropagator for Rk4Propagator {
    fn rebind(&mut self, pulses: &[Pulse]) {
        self.core.rebind(pulses);
    }

    fn set_pulse_value(&mut self, control: usize, interval: usize, value: f64) {
        self.core.set_pulse_value(control, interval, value);
    }

    fn reinit(
        &mut self,
        state: ArrayView1<Complex64>,
        options: &PropagationOptions,
    ) -> Result<()> {
        self.core.reinit(state, options)
    }

    fn step(&mut self) -> Result<()> {
        let n = self.core.next_interval()?;
        let eps = self.core.gather_eps(n, true)?;
        let (dt, t_mid) = self.core.interval_times(n);
        let h = self.core.generator.op(&eps, t_mid);

        let dt_c = Complex64::new(dt, 0.0);
        let half = Complex64::new(0.5, 0.0);
        let sixth = Complex64::new(1.0 / 6.0, 0.0);
        let two = Complex64::new(2.0, 0.0);

        let psi = &self.core.state;
        let k1 = schrodinger_rhs(&h, psi);
        let k2 = schrodinger_rhs(&h, &(psi + &(&k1 * (half * dt_c))));
        let k3 = schrodinger_rhs(&h, &(psi + &(&k2 * (half * dt_c))));
        let k4 = schrodinger_rhs(&h, &(psi + &(&k3 * dt_c)));

        self.core.state = psi + &((k1 + k2 * two + k3 * two + k4) * (sixth * dt_c));
        self.core.advance();
        Ok(())
    }

    fn state(&self) -> ArrayView1<'_, Complex64> {
        self.core.state.view()
    }

    fn checks_pulse_bounds(&self) -> bool {
        true
    }
}

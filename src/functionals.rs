// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Standard final-time functionals and their co-state constructors.
//!
//! A functional pair couples J_T(ϕ(T)) with the boundary co-state
//! χ = −∂J_T/∂⟨ϕ(T)| that seeds the backward propagation. The optimizer
//! accepts any user-supplied pair; the three here cover the common
//! overlap-based figures of merit:
//!
//! - [`state_to_state`]: J_T = 1 − (1/N)·Σ_k |τ_k|²
//! - [`square_modulus_sum`]: J_T = 1 − |(1/N)·Σ_k τ_k|²  (phase-sensitive)
//! - [`real_part`]: J_T = 1 − (1/N)·Re Σ_k τ_k
//!
//! with τ_k = ⟨target_k|ϕ_k(T)⟩. Trajectories without a target contribute
//! τ = 0 and receive a vanishing co-state.

use ndarray::Array1;
use num_complex::Complex64;

use crate::trajectory::Trajectory;

/// Final-time functional: (forward end-states, trajectories) → real scalar.
pub type JtFn = dyn Fn(&[Array1<Complex64>], &[Trajectory]) -> f64;

/// Co-state constructor: fills `chi_out[k]` with −∂J_T/∂⟨ϕ_k(T)| given the
/// forward end-states.
pub type ChiFn = dyn Fn(&mut [Array1<Complex64>], &[Array1<Complex64>], &[Trajectory]);

/// A functional together with its matching co-state constructor.
pub struct FunctionalPair {
    pub j_t: Box<JtFn>,
    pub chi: Box<ChiFn>,
}

/// Complex overlaps τ_k = ⟨target_k|ϕ_k⟩, zero where a trajectory has no
/// target.
pub fn tau_overlaps(states: &[Array1<Complex64>], trajectories: &[Trajectory]) -> Vec<Complex64> {
    trajectories
        .iter()
        .zip(states)
        .map(|(traj, phi)| match &traj.target_state {
            Some(target) => inner(target, phi),
            None => Complex64::new(0.0, 0.0),
        })
        .collect()
}

/// ⟨a|b⟩ with the physics convention (conjugate-linear in the first slot).
fn inner(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Complex64 {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

/// J_T = 1 − (1/N)·Σ_k |τ_k|², the state-to-state infidelity averaged over
/// trajectories.
pub fn j_t_ss(states: &[Array1<Complex64>], trajectories: &[Trajectory]) -> f64 {
    let n = trajectories.len() as f64;
    let f: f64 = tau_overlaps(states, trajectories)
        .iter()
        .map(|tau| tau.norm_sqr())
        .sum::<f64>()
        / n;
    1.0 - f
}

/// J_T = 1 − |(1/N)·Σ_k τ_k|²; sensitive to relative phases between
/// trajectories.
pub fn j_t_sm(states: &[Array1<Complex64>], trajectories: &[Trajectory]) -> f64 {
    let n = trajectories.len() as f64;
    let sum: Complex64 = tau_overlaps(states, trajectories).iter().sum();
    1.0 - (sum / n).norm_sqr()
}

/// J_T = 1 − (1/N)·Re Σ_k τ_k; sensitive to the global phase.
pub fn j_t_re(states: &[Array1<Complex64>], trajectories: &[Trajectory]) -> f64 {
    let n = trajectories.len() as f64;
    let sum: Complex64 = tau_overlaps(states, trajectories).iter().sum();
    1.0 - sum.re / n
}

fn zero_like(state: &Array1<Complex64>) -> Array1<Complex64> {
    Array1::zeros(state.len())
}

/// χ_k for [`j_t_ss`]: (τ_k / 2N)·|target_k⟩.
pub fn chis_ss(
    chi_out: &mut [Array1<Complex64>],
    states: &[Array1<Complex64>],
    trajectories: &[Trajectory],
) {
    let n = trajectories.len() as f64;
    let taus = tau_overlaps(states, trajectories);
    for ((chi, traj), tau) in chi_out.iter_mut().zip(trajectories).zip(taus) {
        *chi = match &traj.target_state {
            Some(target) => target.mapv(|z| z * tau / Complex64::new(2.0 * n, 0.0)),
            None => zero_like(chi),
        };
    }
}

/// χ_k for [`j_t_sm`]: ((Σ_j τ_j) / 2N²)·|target_k⟩.
pub fn chis_sm(
    chi_out: &mut [Array1<Complex64>],
    states: &[Array1<Complex64>],
    trajectories: &[Trajectory],
) {
    let n = trajectories.len() as f64;
    let sum: Complex64 = tau_overlaps(states, trajectories).iter().sum();
    let factor = sum / Complex64::new(2.0 * n * n, 0.0);
    for (chi, traj) in chi_out.iter_mut().zip(trajectories) {
        *chi = match &traj.target_state {
            Some(target) => target.mapv(|z| z * factor),
            None => zero_like(chi),
        };
    }
}

/// χ_k for [`j_t_re`]: (1/2N)·|target_k⟩.
pub fn chis_re(
    chi_out: &mut [Array1<Complex64>],
    _states: &[Array1<Complex64>],
    trajectories: &[Trajectory],
) {
    let n = trajectories.len() as f64;
    let factor = Complex64::new(1.0 / (2.0 * n), 0.0);
    for (chi, traj) in chi_out.iter_mut().zip(trajectories) {
        *chi = match &traj.target_state {
            Some(target) => target.mapv(|z| z * factor),
            None => zero_like(chi),
        };
    }
}

/// The state-to-state functional pair.
pub fn state_to_state() -> FunctionalPair {
    FunctionalPair {
        j_t: Box::new(j_t_ss),
        chi: Box::new(chis_ss),
    }
}

/// The square-modulus-of-sum functional pair.
pub fn square_modulus_sum() -> FunctionalPair {
    FunctionalPair {
        j_t: Box::new(j_t_sm),
        chi: Box::new(chis_sm),
    }
}

/// The real-part functional pair.
pub fn real_part() -> FunctionalPair {
    FunctionalPair {
        j_t: Box::new(j_t_re),
        chi: Box::new(chis_re),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ket, two_level_trajectory};
    use approx::assert_relative_eq;

    fn single_traj() -> Vec<Trajectory> {
        vec![two_level_trajectory(0.2)]
    }

    #[test]
    fn test_tau_for_orthogonal_states_is_zero() {
        let trajs = single_traj();
        // target is |1⟩; forward state |0⟩ is orthogonal
        let taus = tau_overlaps(&[ket(0, 2)], &trajs);
        assert_relative_eq!(taus[0].norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_tau_for_reached_target_is_one() {
        let trajs = single_traj();
        let taus = tau_overlaps(&[ket(1, 2)], &trajs);
        assert_relative_eq!(taus[0].re, 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_tau_zero_without_target() {
        let mut traj = two_level_trajectory(0.2);
        traj.target_state = None;
        let taus = tau_overlaps(&[ket(1, 2)], &[traj]);
        assert_relative_eq!(taus[0].norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_j_t_ss_bounds() {
        let trajs = single_traj();
        assert_relative_eq!(j_t_ss(&[ket(0, 2)], &trajs), 1.0, epsilon = 1e-14);
        assert_relative_eq!(j_t_ss(&[ket(1, 2)], &trajs), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_j_t_ss_ignores_global_phase() {
        let trajs = single_traj();
        let phased = ket(1, 2).mapv(|z| z * Complex64::new(0.0, 1.0));
        assert_relative_eq!(j_t_ss(&[phased], &trajs), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_j_t_re_penalises_global_phase() {
        let trajs = single_traj();
        let phased = ket(1, 2).mapv(|z| z * Complex64::new(-1.0, 0.0));
        assert_relative_eq!(j_t_re(&[phased], &trajs), 2.0, epsilon = 1e-14);
        assert_relative_eq!(j_t_re(&[ket(1, 2)], &trajs), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_j_t_sm_two_trajectories_phase_sensitive() {
        let trajs = vec![two_level_trajectory(0.2), two_level_trajectory(0.2)];
        let aligned = vec![ket(1, 2), ket(1, 2)];
        assert_relative_eq!(j_t_sm(&aligned, &trajs), 0.0, epsilon = 1e-14);
        // Opposite phases cancel in the sum.
        let opposed = vec![ket(1, 2), ket(1, 2).mapv(|z| -z)];
        assert_relative_eq!(j_t_sm(&opposed, &trajs), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_chis_ss_direction_and_scale() {
        let trajs = single_traj();
        let phi = ket(1, 2);
        let mut chi = vec![ket(0, 2)];
        chis_ss(&mut chi, &[phi], &trajs);
        // τ = 1, N = 1 → χ = |1⟩/2
        assert_relative_eq!(chi[0][1].re, 0.5, epsilon = 1e-14);
        assert_relative_eq!(chi[0][0].norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_chis_ss_vanishes_for_orthogonal_state() {
        let trajs = single_traj();
        let mut chi = vec![ket(0, 2)];
        chis_ss(&mut chi, &[ket(0, 2)], &trajs);
        assert_relative_eq!(chi[0][0].norm(), 0.0, epsilon = 1e-14);
        assert_relative_eq!(chi[0][1].norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_chis_sm_scale_two_trajectories() {
        let trajs = vec![two_level_trajectory(0.2), two_level_trajectory(0.2)];
        let states = vec![ket(1, 2), ket(1, 2)];
        let mut chi = vec![ket(0, 2), ket(0, 2)];
        chis_sm(&mut chi, &states, &trajs);
        // Σ τ = 2, N = 2 → every χ_k = |1⟩·2/(2·4) = |1⟩/4
        for c in &chi {
            assert_relative_eq!(c[1].re, 0.25, epsilon = 1e-14);
            assert_relative_eq!(c[0].norm(), 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_chis_sm_opposed_phases_cancel() {
        let trajs = vec![two_level_trajectory(0.2), two_level_trajectory(0.2)];
        let states = vec![ket(1, 2), ket(1, 2).mapv(|z| -z)];
        let mut chi = vec![ket(0, 2), ket(0, 2)];
        chis_sm(&mut chi, &states, &trajs);
        for c in &chi {
            assert_relative_eq!(c[1].norm(), 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_chis_re_is_constant() {
        let trajs = single_traj();
        let mut chi = vec![ket(0, 2)];
        chis_re(&mut chi, &[ket(0, 2)], &trajs);
        assert_relative_eq!(chi[0][1].re, 0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_pairs_are_consistent() {
        // The chi of each pair must vanish exactly when J_T is stationary
        // in the fully-converged state-to-state case.
        let trajs = single_traj();
        let pair = state_to_state();
        assert_relative_eq!((pair.j_t)(&[ket(1, 2)], &trajs), 0.0, epsilon = 1e-14);
        let mut chi = vec![ket(0, 2)];
        (pair.chi)(&mut chi, &[ket(1, 2)], &trajs);
        assert!(chi[0][1].norm() > 0.0);
    }
}

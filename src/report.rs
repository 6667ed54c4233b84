// Copyright 2026 KrotovCore Contributors
// SPDX-License-Identifier: Apache-2.0

//! Default per-iteration progress table.

use crate::result::OptimizationResult;

/// Print one fixed-width progress row for the current iteration, with a
/// header when the iteration index is 0.
///
/// Columns: iteration, J_T, the summed running cost Σ_l g_a_int[l], the
/// total J = J_T + Σ g_a_int, the change in J_T and in J since the last
/// reported iteration, and the iteration wall time. The deltas read "n/a"
/// on the first reported row of a run.
///
/// This is the default info hook. It returns no record; supply a custom
/// info hook to collect records.
pub fn print_table(result: &OptimizationResult, g_a_sum: f64) -> Option<Vec<f64>> {
    if result.iter == 0 {
        println!(
            "{:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>6}",
            "iter.", "J_T", "g_a_int", "J", "dJ_T", "dJ", "secs"
        );
    }
    let j = result.j_t + g_a_sum;
    if result.j_t_prev.is_nan() {
        println!(
            "{:>6} {:>12.5e} {:>12.5e} {:>12.5e} {:>12} {:>12} {:>6.1}",
            result.iter, result.j_t, g_a_sum, j, "n/a", "n/a", result.secs
        );
    } else {
        let d_j_t = result.j_t - result.j_t_prev;
        let d_j = d_j_t + g_a_sum;
        println!(
            "{:>6} {:>12.5e} {:>12.5e} {:>12.5e} {:>12.5e} {:>12.5e} {:>6.1}",
            result.iter, result.j_t, g_a_sum, j, d_j_t, d_j, result.secs
        );
    }
    None
}

//! One-compartment transit models.
//!
//! Each model comes as four functions of the same compartment:
//! - `res_*`: residue, the fraction of a bolus still inside at time `t`
//! - `prop_*`: propagator, the outflow caused by a unit bolus at `t = 0`
//! - `flux_*`: outflow for an input flux `J`
//! - `conc_*`: amount inside for an input flux `J`

use crate::kernel::{Grid, check_transit_time, expconv, trapz, validate_times};
use crate::Result;

// ================
// Trap: no outflow
// ================

pub fn res_trap(t: &[f64]) -> Result<Vec<f64>> {
    validate_times(t)?;
    Ok(vec![1.0; t.len()])
}

/// Nothing leaves a trap, so the propagator vanishes everywhere.
pub fn prop_trap(t: &[f64]) -> Result<Vec<f64>> {
    validate_times(t)?;
    Ok(vec![0.0; t.len()])
}

pub fn flux_trap(j: &[f64]) -> Vec<f64> {
    vec![0.0; j.len()]
}

/// Accumulated input: the running integral of `J`.
pub fn conc_trap(j: &[f64], grid: Grid) -> Result<Vec<f64>> {
    trapz(j, grid)
}

// ======================================================
// Pass: well-mixed compartment with mean transit time T
// ======================================================

/// `exp(-t/T)`. With `T = 0` the compartment empties immediately (`1` at
/// `t = 0`, `0` after), with `T = inf` it never empties.
pub fn res_pass(transit_time: f64, t: &[f64]) -> Result<Vec<f64>> {
    check_transit_time("T", transit_time)?;
    validate_times(t)?;
    Ok(t.iter()
        .map(|&ti| {
            if transit_time > 0.0 {
                (-ti / transit_time).exp()
            } else if ti == 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect())
}

/// `exp(-t/T)/T`. With `T = 0` this is a sampled Dirac delta (`inf` at
/// `t = 0`, `0` after); with `T = inf` it is zero, like the trap.
pub fn prop_pass(transit_time: f64, t: &[f64]) -> Result<Vec<f64>> {
    check_transit_time("T", transit_time)?;
    validate_times(t)?;
    Ok(t.iter()
        .map(|&ti| {
            if transit_time > 0.0 {
                (-ti / transit_time).exp() / transit_time
            } else if ti == 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        })
        .collect())
}

/// Outflow `J * exp(-t/T)/T`; equals `J` for `T = 0`.
pub fn flux_pass(j: &[f64], transit_time: f64, grid: Grid) -> Result<Vec<f64>> {
    if transit_time == 0.0 {
        grid.times(j.len())?;
        return Ok(j.to_vec());
    }
    expconv(j, transit_time, grid)
}

/// Amount inside `T (J * exp(-t/T)/T)`; zero for `T = 0`, the trap for `T = inf`.
pub fn conc_pass(j: &[f64], transit_time: f64, grid: Grid) -> Result<Vec<f64>> {
    check_transit_time("T", transit_time)?;
    if transit_time.is_infinite() {
        return conc_trap(j, grid);
    }
    let flux = expconv(j, transit_time, grid)?;
    Ok(flux.iter().map(|x| transit_time * x).collect())
}

//! Inversion of measured signal curves to tracer concentration.
//!
//! Every function estimates the baseline signal as the mean of the first `n0`
//! samples and converts the recovered relaxation rate `R` to concentration
//! with `C = (R - R0) / r`, `r` being the relaxivity.
//!
//! A sample that no physical relaxation rate (`R1 >= 0`) can produce has no
//! solution. The plain functions write [`NO_SOLUTION`] there, the `_checked`
//! variants return `None`. The output always has the length of the input.

use crate::signal::sequence::cos;
use crate::{ModelError, Result};

/// Written in place of samples without a solution.
pub const NO_SOLUTION: f64 = -1.0;

/// Inverts [`signal_ss`](crate::signal_ss).
///
/// ```
/// let c = dcmri::conc_ss(&[1.0, 2.0, 0.0], 1.0, 45.0, 1.0, 1.0, 1).unwrap();
/// assert_eq!(c[1], dcmri::NO_SOLUTION);
/// ```
pub fn conc_ss(s: &[f64], tr: f64, fa: f64, t10: f64, r1: f64, n0: usize) -> Result<Vec<f64>> {
    conc_ss_checked(s, tr, fa, t10, r1, n0).map(with_sentinel)
}

pub fn conc_ss_checked(
    s: &[f64],
    tr: f64,
    fa: f64,
    t10: f64,
    r1: f64,
    n0: usize,
) -> Result<Vec<Option<f64>>> {
    positive("tr", tr)?;
    let (sb, r10) = (baseline(s, n0)?, baseline_rate(t10)?);
    relaxivity("r1", r1)?;
    let c = cos(fa);
    // fraction of the fully relaxed signal at baseline
    let e10 = (-tr * r10).exp();
    let f10 = (1.0 - e10) / (1.0 - c * e10);

    Ok(invert(s, |x| {
        let x = x * f10 / sb;
        if !(0.0..1.0).contains(&x) {
            return None;
        }
        let e = (1.0 - x) / (1.0 - c * x);
        if !(e > 0.0 && e <= 1.0) {
            return None;
        }
        Some((-e.ln() / tr - r10) / r1)
    }))
}

/// Inverts [`signal_free`](crate::signal_free) (saturation recovery).
pub fn conc_src(s: &[f64], tc: f64, t10: f64, r1: f64, n0: usize) -> Result<Vec<f64>> {
    conc_src_checked(s, tc, t10, r1, n0).map(with_sentinel)
}

pub fn conc_src_checked(
    s: &[f64],
    tc: f64,
    t10: f64,
    r1: f64,
    n0: usize,
) -> Result<Vec<Option<f64>>> {
    positive("tc", tc)?;
    let (sb, r10) = (baseline(s, n0)?, baseline_rate(t10)?);
    relaxivity("r1", r1)?;
    let f10 = -(-tc * r10).exp_m1();

    Ok(invert(s, |x| {
        let x = x * f10 / sb;
        if !(0.0..1.0).contains(&x) {
            return None;
        }
        Some((-(-x).ln_1p() / tc - r10) / r1)
    }))
}

/// Inverts [`signal_lin`](crate::signal_lin) exactly.
pub fn conc_lin(s: &[f64], t10: f64, r1: f64, n0: usize) -> Result<Vec<f64>> {
    conc_lin_checked(s, t10, r1, n0).map(with_sentinel)
}

pub fn conc_lin_checked(s: &[f64], t10: f64, r1: f64, n0: usize) -> Result<Vec<Option<f64>>> {
    let (sb, r10) = (baseline(s, n0)?, baseline_rate(t10)?);
    relaxivity("r1", r1)?;

    Ok(invert(s, |x| {
        let rate = x * r10 / sb;
        (rate >= 0.0).then(|| (rate - r10) / r1)
    }))
}

/// Inverts [`signal_t2w`](crate::signal_t2w): `C = -ln(S / Sb) / (TE r2)`.
pub fn conc_t2w(s: &[f64], te: f64, r2: f64, n0: usize) -> Result<Vec<f64>> {
    conc_t2w_checked(s, te, r2, n0).map(with_sentinel)
}

pub fn conc_t2w_checked(s: &[f64], te: f64, r2: f64, n0: usize) -> Result<Vec<Option<f64>>> {
    positive("te", te)?;
    let sb = baseline(s, n0)?;
    relaxivity("r2", r2)?;

    Ok(invert(s, |x| {
        let ratio = x / sb;
        (ratio > 0.0).then(|| -ratio.ln() / te / r2)
    }))
}

// ==========================
// Internal helpers
// ==========================

fn invert(s: &[f64], solve: impl Fn(f64) -> Option<f64>) -> Vec<Option<f64>> {
    let c: Vec<Option<f64>> = s
        .iter()
        .map(|&x| solve(x).filter(|c| c.is_finite()))
        .collect();
    let missing = c.iter().filter(|c| c.is_none()).count();
    if missing > 0 {
        log::debug!("{missing} of {} samples have no solution", c.len());
    }
    c
}

fn with_sentinel(c: Vec<Option<f64>>) -> Vec<f64> {
    c.into_iter().map(|c| c.unwrap_or(NO_SOLUTION)).collect()
}

fn baseline(s: &[f64], n0: usize) -> Result<f64> {
    if n0 == 0 || n0 > s.len() {
        return Err(ModelError::parameter(
            "n0",
            format!("needs 1 to {} baseline samples (found {n0})", s.len()),
        ));
    }
    Ok(s[..n0].iter().sum::<f64>() / n0 as f64)
}

/// `1/T10`, with `T10 = inf` meaning no relaxation at baseline.
fn baseline_rate(t10: f64) -> Result<f64> {
    positive("t10", t10)?;
    Ok(1.0 / t10)
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if !(value > 0.0) {
        return Err(ModelError::parameter(name, format!("must be > 0 (found {value})")));
    }
    Ok(())
}

fn relaxivity(name: &'static str, value: f64) -> Result<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(ModelError::parameter(
            name,
            format!("relaxivity must be positive and finite (found {value})"),
        ));
    }
    Ok(())
}

//! Convolution of an input curve with canonical impulse responses.
//!
//! Every function samples its output on the grid of the input. Inputs are
//! treated as piecewise linear between samples and zero before the first
//! sample, so the output always starts at zero.

use crate::{GridError, ModelError, Result};

/// Sample times of a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Grid<'a> {
    /// Uniform sampling `t_k = k * dt`.
    Uniform(f64),
    /// Explicit, non-negative and strictly increasing sample times.
    Times(&'a [f64]),
}

impl Default for Grid<'_> {
    fn default() -> Self {
        Grid::Uniform(1.0)
    }
}

impl Grid<'_> {
    /// Validated sample times for a curve with `len` samples.
    pub fn times(&self, len: usize) -> Result<Vec<f64>> {
        match *self {
            Grid::Uniform(dt) => {
                if !(dt > 0.0 && dt.is_finite()) {
                    return Err(GridError::NonPositiveStep(dt).into());
                }
                Ok((0..len).map(|k| k as f64 * dt).collect())
            }
            Grid::Times(t) => {
                if t.len() != len {
                    return Err(ModelError::Shape(format!(
                        "time grid has {} points but the curve has {len}",
                        t.len()
                    )));
                }
                validate_times(t)?;
                Ok(t.to_vec())
            }
        }
    }
}

pub(crate) fn validate_times(t: &[f64]) -> std::result::Result<(), GridError> {
    for (i, &ti) in t.iter().enumerate() {
        if !ti.is_finite() {
            return Err(GridError::NotFinite(i));
        }
        if ti < 0.0 {
            return Err(GridError::Negative(i));
        }
        if i > 0 && ti <= t[i - 1] {
            return Err(GridError::NotIncreasing(i));
        }
    }
    Ok(())
}

/// Transit times must be non-negative; `0` and `inf` are valid limits.
pub(crate) fn check_transit_time(name: &'static str, value: f64) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(ModelError::parameter(name, format!("must be >= 0 (found {value})")));
    }
    Ok(())
}

/// Running trapezoidal integral of `f`, starting at zero.
pub fn trapz(f: &[f64], grid: Grid) -> Result<Vec<f64>> {
    let t = grid.times(f.len())?;
    let mut out = vec![0.0; f.len()];
    for k in 1..f.len() {
        out[k] = out[k - 1] + (t[k] - t[k - 1]) * (f[k] + f[k - 1]) / 2.0;
    }
    Ok(out)
}

/// Numerical convolution of two curves sampled on the same grid.
///
/// `h` is read as a function of the offset `t - t[0]` and interpolated at the
/// lags `t[k] - t[i]`, so non-uniform grids are integrated correctly.
pub fn conv(f: &[f64], h: &[f64], grid: Grid) -> Result<Vec<f64>> {
    if f.len() != h.len() {
        return Err(ModelError::Shape(format!(
            "cannot convolve curves of length {} and {}",
            f.len(),
            h.len()
        )));
    }
    let t = grid.times(f.len())?;
    let n = f.len();
    let mut g = vec![0.0; n];
    if n < 2 {
        return Ok(g);
    }
    let offsets: Vec<f64> = t.iter().map(|ti| ti - t[0]).collect();
    let kernel = |lag: f64| interpolate(&offsets, h, lag);

    for k in 1..n {
        g[k] = (0..k)
            .map(|i| {
                let dt = t[i + 1] - t[i];
                dt / 2.0 * (f[i] * kernel(t[k] - t[i]) + f[i + 1] * kernel(t[k] - t[i + 1]))
            })
            .sum();
    }
    Ok(g)
}

/// Convolution with the normalised exponential `exp(-t/T)/T`.
///
/// Exact for piecewise linear `f`. `T = 0` returns `f` unchanged and
/// `T = inf` returns zeros.
pub fn expconv(f: &[f64], transit_time: f64, grid: Grid) -> Result<Vec<f64>> {
    check_transit_time("T", transit_time)?;
    let t = grid.times(f.len())?;
    let n = f.len();
    if n < 2 || transit_time.is_infinite() {
        return Ok(vec![0.0; n]);
    }
    if transit_time == 0.0 {
        return Ok(f.to_vec());
    }

    let mut g = vec![0.0; n];
    for k in 0..n - 1 {
        let x = (t[k + 1] - t[k]) / transit_time;
        let decay = (-x).exp();
        let gain = -(-x).exp_m1();
        // weights of the left and right sample of the linear segment
        let right = 1.0 - gain / x;
        let left = gain - right;
        g[k + 1] = decay * g[k] + left * f[k] + right * f[k + 1];
    }
    Ok(g)
}

/// Convolution with two parallel exponential pathways:
/// `w exp(-t/T1)/T1 + (1-w) exp(-t/T2)/T2`.
pub fn biexpconv(f: &[f64], t1: f64, t2: f64, w: f64, grid: Grid) -> Result<Vec<f64>> {
    if !(0.0..=1.0).contains(&w) {
        return Err(ModelError::parameter("w", format!("must be in [0, 1] (found {w})")));
    }
    let g1 = expconv(f, t1, grid)?;
    let g2 = expconv(f, t2, grid)?;
    Ok(g1
        .iter()
        .zip(&g2)
        .map(|(a, b)| w * a + (1.0 - w) * b)
        .collect())
}

/// Convolution with a chain of `n` identical exponential stages of total mean
/// transit time `T` (an Erlang distribution of order `n`).
pub fn nexpconv(f: &[f64], n: usize, transit_time: f64, grid: Grid) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(ModelError::parameter("n", "at least one stage is required"));
    }
    check_transit_time("T", transit_time)?;
    let stage = transit_time / n as f64;
    let mut g = f.to_vec();
    for _ in 0..n {
        g = expconv(&g, stage, grid)?;
    }
    Ok(g)
}

/// Convolution with a unit-area step on `[T(1-D), T(1+D)]`.
///
/// `D` is the dispersion in `[0, 1]`. With `D = 0` this is a pure delay of
/// `f` by `T`.
pub fn stepconv(f: &[f64], transit_time: f64, dispersion: f64, grid: Grid) -> Result<Vec<f64>> {
    check_transit_time("T", transit_time)?;
    if !transit_time.is_finite() {
        return Err(ModelError::parameter("T", "must be finite"));
    }
    if !(0.0..=1.0).contains(&dispersion) {
        return Err(ModelError::parameter(
            "D",
            format!("must be in [0, 1] (found {dispersion})"),
        ));
    }
    let t = grid.times(f.len())?;
    let n = f.len();
    if n < 2 {
        return Ok(vec![0.0; n]);
    }

    let lo = transit_time * (1.0 - dispersion);
    let hi = transit_time * (1.0 + dispersion);
    if hi == lo {
        return Ok(t.iter().map(|tk| sample(&t, f, tk - lo)).collect());
    }
    let cum = trapz(f, Grid::Times(&t))?;
    Ok(t.iter()
        .map(|tk| {
            (antiderivative(&t, f, &cum, tk - lo) - antiderivative(&t, f, &cum, tk - hi))
                / (hi - lo)
        })
        .collect())
}

// ============================================
// Internal helpers for piecewise linear curves
// ============================================

/// Linear interpolation of `y(x)`, clamped to the end values.
fn interpolate(x: &[f64], y: &[f64], at: f64) -> f64 {
    let i = x.partition_point(|&xi| xi <= at);
    if i == 0 {
        return y[0];
    }
    if i == x.len() {
        return y[x.len() - 1];
    }
    let w = (at - x[i - 1]) / (x[i] - x[i - 1]);
    y[i - 1] + w * (y[i] - y[i - 1])
}

/// Value of `f` at `at`, zero before the first sample.
fn sample(t: &[f64], f: &[f64], at: f64) -> f64 {
    if at < t[0] { 0.0 } else { interpolate(t, f, at) }
}

/// Integral of `f` from `t[0]` to `at`, exact for piecewise linear `f`.
fn antiderivative(t: &[f64], f: &[f64], cum: &[f64], at: f64) -> f64 {
    if at <= t[0] {
        return 0.0;
    }
    let i = t.partition_point(|&ti| ti <= at);
    if i == t.len() {
        let last = t.len() - 1;
        return cum[last] + f[last] * (at - t[last]);
    }
    let s = at - t[i - 1];
    let dt = t[i] - t[i - 1];
    cum[i - 1] + f[i - 1] * s + (f[i] - f[i - 1]) * s * s / (2.0 * dt)
}

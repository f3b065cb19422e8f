#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{ModelError, Result};

/// A pulse sequence seen through one relaxation mode.
///
/// The magnetization of every compartment set decouples into modes that relax
/// with rate `lambda` towards the source `b` (`dy/dt = -lambda y + b`). A
/// readout returns the longitudinal magnetization of one mode at the moment
/// the signal is acquired; the signal models sum it over all modes.
pub trait Readout {
    /// Signal scale: the fully relaxed signal without calibration.
    fn s0(&self) -> f64;

    /// Flip angle in degrees of the excitation that is read out.
    fn flip_angle(&self) -> f64;

    fn mode(&self, lambda: f64, b: f64) -> f64;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Spoiled gradient echo in steady state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SteadyState {
    pub s0: f64,
    /// Repetition time
    pub tr: f64,
    /// Flip angle (degrees)
    pub fa: f64,
}

/// Spoiled gradient echo read out after a finite number of pulses.
///
/// The train starts from equilibrium, or from a saturation pulse followed by
/// a delay `tp`. The signal is sampled at pulse `n0 + round(tc / tr)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spgr {
    pub s0: f64,
    /// Time from the first pulse to the centre of k-space
    pub tc: f64,
    /// Repetition time
    pub tr: f64,
    /// Flip angle (degrees)
    pub fa: f64,
    /// Delay between saturation and the first pulse, `None` without preparation
    pub tp: Option<f64>,
    /// Dummy pulses applied before the train
    pub n0: u32,
}

/// Saturation recovery, read out with a single pulse after a delay `tc`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FreeRecovery {
    pub s0: f64,
    /// Time between saturation and readout
    pub tc: f64,
    /// Flip angle (degrees)
    pub fa: f64,
}

impl SteadyState {
    pub fn new(s0: f64, tr: f64, fa: f64) -> Self {
        Self { s0, tr, fa }
    }
}

impl Spgr {
    pub fn new(s0: f64, tc: f64, tr: f64, fa: f64) -> Self {
        Self {
            s0,
            tc,
            tr,
            fa,
            tp: None,
            n0: 0,
        }
    }

    pub fn prepared(mut self, tp: f64) -> Self {
        self.tp = Some(tp);
        self
    }

    pub fn dummies(mut self, n0: u32) -> Self {
        self.n0 = n0;
        self
    }

    /// Index of the sampled pulse.
    fn pulses(&self) -> f64 {
        f64::from(self.n0) + (self.tc / self.tr).round()
    }
}

impl FreeRecovery {
    pub fn new(s0: f64, tc: f64, fa: f64) -> Self {
        Self { s0, tc, fa }
    }
}

impl Readout for SteadyState {
    fn s0(&self) -> f64 {
        self.s0
    }

    fn flip_angle(&self) -> f64 {
        self.fa
    }

    fn mode(&self, lambda: f64, b: f64) -> f64 {
        let damping = 1.0 - cos(self.fa) * (-lambda * self.tr).exp();
        if damping == 0.0 {
            // no excitation and no relaxation: no steady state to speak of
            return 0.0;
        }
        b * recovery(lambda, self.tr) / damping
    }

    fn validate(&self) -> Result<()> {
        non_negative("tr", self.tr)
    }
}

impl Readout for Spgr {
    fn s0(&self) -> f64 {
        self.s0
    }

    fn flip_angle(&self) -> f64 {
        self.fa
    }

    fn mode(&self, lambda: f64, b: f64) -> f64 {
        let initial = match self.tp {
            Some(tp) => b * recovery(lambda, tp),
            None => equilibrium(lambda, b),
        };
        let per_pulse = cos(self.fa) * (-lambda * self.tr).exp();
        if per_pulse == 1.0 {
            return initial;
        }
        let steady = b * recovery(lambda, self.tr) / (1.0 - per_pulse);
        steady + per_pulse.powf(self.pulses()) * (initial - steady)
    }

    fn validate(&self) -> Result<()> {
        if !(self.tr > 0.0 && self.tr.is_finite()) {
            return Err(ModelError::parameter(
                "tr",
                format!("must be positive and finite (found {})", self.tr),
            ));
        }
        non_negative("tc", self.tc)?;
        if !self.tc.is_finite() {
            return Err(ModelError::parameter("tc", "must be finite"));
        }
        if let Some(tp) = self.tp {
            non_negative("tp", tp)?;
        }
        Ok(())
    }
}

impl Readout for FreeRecovery {
    fn s0(&self) -> f64 {
        self.s0
    }

    fn flip_angle(&self) -> f64 {
        self.fa
    }

    fn mode(&self, lambda: f64, b: f64) -> f64 {
        b * recovery(lambda, self.tc)
    }

    fn validate(&self) -> Result<()> {
        non_negative("tc", self.tc)
    }
}

// ===================================
// Internal helpers for mode responses
// ===================================

pub(crate) fn cos(fa: f64) -> f64 {
    fa.to_radians().cos()
}

pub(crate) fn sin(fa: f64) -> f64 {
    fa.to_radians().sin()
}

/// `(1 - exp(-lambda tau)) / lambda`, which tends to `tau` as `lambda -> 0`.
fn recovery(lambda: f64, tau: f64) -> f64 {
    if lambda == 0.0 {
        tau
    } else {
        -(-lambda * tau).exp_m1() / lambda
    }
}

/// `b / lambda`; a mode without source stays empty even if it does not relax.
fn equilibrium(lambda: f64, b: f64) -> f64 {
    if b == 0.0 { 0.0 } else { b / lambda }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(ModelError::parameter(name, format!("must be >= 0 (found {value})")));
    }
    Ok(())
}

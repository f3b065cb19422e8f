//! Forward signal models.
//!
//! The longitudinal models ([`signal_ss`], [`signal_spgr`], [`signal_free`])
//! accept a single compartment or several compartments exchanging water,
//! configured through [`Tissue`]. Transverse and linear models treat
//! compartments as independent.
//!
//! Every shape and consistency check happens before any numeric work.

mod exchange;
pub mod sequence;

pub use sequence::{FreeRecovery, Readout, Spgr, SteadyState};

use crate::value::shape::Columns;
use crate::{ModelError, Relax, Result, Signal, Tissue};
use exchange::Network;

/// Steady-state spoiled gradient echo.
///
/// ```
/// use dcmri::{SteadyState, Tissue, signal_ss};
///
/// let seq = SteadyState::new(1.0, 1.0, 0.0);
/// assert_eq!(signal_ss(&seq, 1.0, &Tissue::single()).unwrap(), 0.0);
/// ```
pub fn signal_ss(seq: &SteadyState, r1: impl Into<Relax>, tissue: &Tissue) -> Result<Signal> {
    signal(seq, &r1.into(), tissue)
}

/// Spoiled gradient echo after a finite pulse train, optionally prepared by
/// a saturation pulse.
pub fn signal_spgr(seq: &Spgr, r1: impl Into<Relax>, tissue: &Tissue) -> Result<Signal> {
    signal(seq, &r1.into(), tissue)
}

/// Saturation recovery read out with a single pulse.
pub fn signal_free(seq: &FreeRecovery, r1: impl Into<Relax>, tissue: &Tissue) -> Result<Signal> {
    signal(seq, &r1.into(), tissue)
}

/// Signal of any [`Readout`] for relaxation rates `r1`.
pub fn signal<R: Readout + ?Sized>(readout: &R, r1: &Relax, tissue: &Tissue) -> Result<Signal> {
    readout.validate()?;
    let excitation = sequence::sin(readout.flip_angle());

    let Some(v) = tissue.volumes()? else {
        let cols = r1.single("r1")?;
        let scale = match tissue.reference_rates(1)? {
            None => readout.s0(),
            Some(r10) => calibrate(readout.s0(), excitation * readout.mode(r10[0], r10[0]))?,
        };
        return cols.map(|_, col| Ok(scale * excitation * readout.mode(col[0], col[0])));
    };

    let cols = r1.per_compartment(v.len(), "r1")?;
    let network = Network::new(v, &tissue.fw)?;
    let inflow = match &tissue.j {
        Some(j) => j.broadcast(v.len(), cols.len(), "j")?.cols,
        None => vec![network.default_inflow(); cols.len()],
    };
    let scale = match tissue.reference_rates(v.len())? {
        None => readout.s0(),
        Some(r10) => {
            let reference = network.respond(readout, &r10, &network.default_inflow())?;
            calibrate(readout.s0(), excitation * reference)?
        }
    };
    cols.map(|t, col| Ok(scale * excitation * network.respond(readout, col, &inflow[t])?))
}

/// Linear approximation `S = S0 R1`.
pub fn signal_lin(r1: impl Into<Relax>, s0: f64) -> Result<Signal> {
    r1.into().single("r1")?.map(|_, col| Ok(s0 * col[0]))
}

/// T2-weighted signal `S0 exp(-TE R2)`, volume-weighted over compartments if
/// `v` is given.
///
/// ```
/// assert_eq!(dcmri::signal_t2w(1.0, 1.0, 0.0, None).unwrap(), 1.0);
/// ```
pub fn signal_t2w(r2: impl Into<Relax>, s0: f64, te: f64, v: Option<&[f64]>) -> Result<Signal> {
    let (cols, weights) = without_exchange(&r2.into(), v, "r2")?;
    cols.map(|_, r2| {
        Ok(s0 * weights.iter().zip(r2).map(|(w, r)| w * (-te * r).exp()).sum::<f64>())
    })
}

/// Susceptibility-weighted signal `S0 exp(-TE R2) (1 - exp(-TR R1))`.
///
/// `r1` and `r2` must have the same shape.
pub fn signal_dsc(
    r1: impl Into<Relax>,
    r2: impl Into<Relax>,
    s0: f64,
    tr: f64,
    te: f64,
    v: Option<&[f64]>,
) -> Result<Signal> {
    let (r1, r2) = (r1.into(), r2.into());
    let (cols1, weights) = without_exchange(&r1, v, "r1")?;
    let (cols2, _) = without_exchange(&r2, v, "r2")?;

    if r1.kind() != r2.kind() || cols1.len() != cols2.len() {
        return Err(ModelError::Shape(format!(
            "r1 ({}, {} samples) and r2 ({}, {} samples) differ in shape",
            r1.kind(),
            cols1.len(),
            r2.kind(),
            cols2.len()
        )));
    }
    cols1.map(|t, r1| {
        let r2 = &cols2.cols[t];
        Ok(s0
            * (0..weights.len())
                .map(|i| weights[i] * (-te * r2[i]).exp() * -(-tr * r1[i]).exp_m1())
                .sum::<f64>())
    })
}

// ==========================
// Internal helpers
// ==========================

fn calibrate(s0: f64, reference: f64) -> Result<f64> {
    if reference == 0.0 || !reference.is_finite() {
        log::warn!("calibration rejected: reference signal is {reference}");
        return Err(ModelError::parameter(
            "r10",
            format!("reference signal must be finite and non-zero (found {reference})"),
        ));
    }
    Ok(s0 / reference)
}

/// Columns of `x` and the volume weights of independent compartments.
fn without_exchange(x: &Relax, v: Option<&[f64]>, name: &str) -> Result<(Columns, Vec<f64>)> {
    let tissue = Tissue {
        v: v.map(<[f64]>::to_vec),
        ..Tissue::default()
    };
    match tissue.volumes()? {
        None => Ok((x.single(name)?, vec![1.0])),
        Some(v) => Ok((x.per_compartment(v.len(), name)?, v.to_vec())),
    }
}

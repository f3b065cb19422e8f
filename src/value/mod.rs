//! Tagged inputs and outputs of the signal models.
//!
//! Relaxation rates and exchange rates can be given as a single number or as
//! per-compartment arrays. Every variant is normalised to fixed-rank columns
//! (see [`shape`]) before any numeric work happens.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub(crate) mod shape;
mod tissue;

pub use tissue::Tissue;

/// Relaxation rates (or any other per-compartment quantity such as inflow).
///
/// Without volume fractions, `Scalar` is a single value and `Vector` is a time
/// series of a single compartment. With `n` volume fractions, `Vector` holds
/// one value per compartment and `Matrix` holds `n` rows of equal length `T`,
/// one row per compartment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Relax {
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

/// Water exchange between compartments.
///
/// `Matrix[i][j]` (`i != j`) is the exchange rate between `i` and `j` and must
/// equal `Matrix[j][i]` exactly. `Matrix[i][i]` is the flow between `i` and
/// the outside. `Scalar(x)` sets every off-diagonal entry to `x` and the
/// diagonal to zero: `0.0` means no exchange, `f64::INFINITY` instantaneous.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Exchange {
    Scalar(f64),
    Matrix(Vec<Vec<f64>>),
}

impl Default for Exchange {
    fn default() -> Self {
        Exchange::Scalar(0.0)
    }
}

/// Model output: one value for a static input, one value per time point for
/// a time series input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Signal {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Signal {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Signal::Scalar(value) => Some(*value),
            Signal::Series(_) => None,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Signal::Scalar(value) => std::slice::from_ref(value),
            Signal::Series(values) => values,
        }
    }

    pub fn into_vec(self) -> Vec<f64> {
        match self {
            Signal::Scalar(value) => vec![value],
            Signal::Series(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Euclidean norm over all samples.
    pub fn norm(&self) -> f64 {
        self.as_slice().iter().map(|x| x * x).sum::<f64>().sqrt()
    }
}

impl PartialEq<f64> for Signal {
    fn eq(&self, other: &f64) -> bool {
        self.as_scalar() == Some(*other)
    }
}

// =====================================================
// CONVERSION: plain Rust numbers -> tagged input values
// =====================================================

macro_rules! impl_from {
    ($target:ident, $rust_type:ty, $variant:ident) => {
        impl From<$rust_type> for $target {
            fn from(value: $rust_type) -> Self {
                $target::$variant(value)
            }
        }
    };
}

impl_from!(Relax, f64, Scalar);
impl_from!(Relax, Vec<f64>, Vector);
impl_from!(Relax, Vec<Vec<f64>>, Matrix);
impl_from!(Exchange, f64, Scalar);
impl_from!(Exchange, Vec<Vec<f64>>, Matrix);

impl From<&[f64]> for Relax {
    fn from(value: &[f64]) -> Self {
        Relax::Vector(value.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Relax {
    fn from(value: [f64; N]) -> Self {
        Relax::Vector(value.to_vec())
    }
}

impl<const N: usize, const M: usize> From<[[f64; N]; M]> for Relax {
    fn from(value: [[f64; N]; M]) -> Self {
        Relax::Matrix(value.iter().map(|row| row.to_vec()).collect())
    }
}

impl<const N: usize, const M: usize> From<[[f64; N]; M]> for Exchange {
    fn from(value: [[f64; N]; M]) -> Self {
        Exchange::Matrix(value.iter().map(|row| row.to_vec()).collect())
    }
}

impl From<&Relax> for Relax {
    fn from(value: &Relax) -> Self {
        value.clone()
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Exchange, Relax};
use crate::{ModelError, Result};

/// Compartment configuration passed to the signal models.
///
/// The default is a single compartment: `v`, `fw` and `j` are only read when
/// volume fractions are set. `r10` calibrates `S0` on a reference state.
///
/// ```
/// use dcmri::{Exchange, Tissue};
///
/// let tissue = Tissue::compartments([0.3, 0.7])
///     .exchange([[0.01, 2.0], [2.0, 0.0]])
///     .reference(1.0);
/// assert_eq!(tissue.fw, Exchange::Matrix(vec![vec![0.01, 2.0], vec![2.0, 0.0]]));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Tissue {
    /// Volume fraction of every compartment, each in `(0, 1]`.
    pub v: Option<Vec<f64>>,
    /// Water exchange, see [`Exchange`].
    pub fw: Exchange,
    /// Inflow of longitudinal magnetization per compartment (units of `M0`
    /// per unit time). Defaults to the diagonal of `fw`: inflowing water is
    /// fully relaxed.
    pub j: Option<Relax>,
    /// Reference relaxation rates at which the model returns exactly `S0`.
    pub r10: Option<Relax>,
}

impl Tissue {
    pub fn single() -> Self {
        Self::default()
    }

    pub fn compartments(v: impl Into<Vec<f64>>) -> Self {
        Self {
            v: Some(v.into()),
            ..Self::default()
        }
    }

    pub fn exchange(mut self, fw: impl Into<Exchange>) -> Self {
        self.fw = fw.into();
        self
    }

    pub fn inflow(mut self, j: impl Into<Relax>) -> Self {
        self.j = Some(j.into());
        self
    }

    pub fn reference(mut self, r10: impl Into<Relax>) -> Self {
        self.r10 = Some(r10.into());
        self
    }

    /// Validated volume fractions, `None` for a single compartment.
    pub(crate) fn volumes(&self) -> Result<Option<&[f64]>> {
        let Some(v) = &self.v else {
            return Ok(None);
        };
        if v.is_empty() {
            return Err(ModelError::Shape("v must not be empty".to_string()));
        }
        if let Some(i) = v.iter().position(|&x| !(x > 0.0 && x <= 1.0)) {
            return Err(ModelError::parameter(
                "v",
                format!("volume fraction {} at index {i} is outside (0, 1]", v[i]),
            ));
        }
        Ok(Some(v))
    }

    /// Reference rates for `n` compartments (scalar broadcasts).
    pub(crate) fn reference_rates(&self, n: usize) -> Result<Option<Vec<f64>>> {
        match &self.r10 {
            None => Ok(None),
            Some(Relax::Scalar(x)) => Ok(Some(vec![*x; n])),
            Some(Relax::Vector(xs)) if xs.len() == n => Ok(Some(xs.clone())),
            Some(other) => Err(ModelError::Shape(format!(
                "r10 ({}) does not match {n} compartments",
                other.kind()
            ))),
        }
    }
}

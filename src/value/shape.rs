use crate::{ModelError, Result, Signal};

use super::Relax;

/// Per-compartment values, one column per time point.
///
/// `series` records whether the caller passed a time series, which decides
/// whether the result is returned as [`Signal::Series`] or [`Signal::Scalar`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Columns {
    pub cols: Vec<Vec<f64>>,
    pub series: bool,
}

impl Columns {
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    /// Evaluate `f` on every column and shape the result like the input.
    pub fn map(&self, mut f: impl FnMut(usize, &[f64]) -> Result<f64>) -> Result<Signal> {
        let values = self
            .cols
            .iter()
            .enumerate()
            .map(|(t, col)| f(t, col))
            .collect::<Result<Vec<f64>>>()?;
        Ok(match (self.series, values.as_slice()) {
            (false, [value]) => Signal::Scalar(*value),
            _ => Signal::Series(values),
        })
    }
}

impl Relax {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Relax::Scalar(_) => "scalar",
            Relax::Vector(_) => "vector",
            Relax::Matrix(_) => "matrix",
        }
    }

    /// Single compartment: a scalar, or a time series evaluated elementwise.
    pub(crate) fn single(&self, name: &str) -> Result<Columns> {
        match self {
            Relax::Scalar(x) => Ok(Columns {
                cols: vec![vec![*x]],
                series: false,
            }),
            Relax::Vector(xs) => Ok(Columns {
                cols: xs.iter().map(|x| vec![*x]).collect(),
                series: true,
            }),
            Relax::Matrix(_) => Err(ModelError::Shape(format!(
                "{name} is a matrix but no volume fractions were given"
            ))),
        }
    }

    /// `n` compartments: a vector of length `n` or a `n x T` matrix.
    pub(crate) fn per_compartment(&self, n: usize, name: &str) -> Result<Columns> {
        match self {
            Relax::Vector(xs) if xs.len() == n => Ok(Columns {
                cols: vec![xs.clone()],
                series: false,
            }),
            Relax::Matrix(rows) if rows.len() == n => Ok(Columns {
                cols: transpose(rows, name)?,
                series: true,
            }),
            Relax::Vector(xs) => Err(ModelError::Shape(format!(
                "{name} has {} values for {n} compartments",
                xs.len()
            ))),
            Relax::Matrix(rows) => Err(ModelError::Shape(format!(
                "{name} has {} rows for {n} compartments",
                rows.len()
            ))),
            Relax::Scalar(_) => Err(ModelError::Shape(format!(
                "{name} is a scalar but {n} volume fractions were given"
            ))),
        }
    }

    /// Like [`Relax::per_compartment`], but a scalar applies to every
    /// compartment and a vector to every one of the `t` time points.
    pub(crate) fn broadcast(&self, n: usize, t: usize, name: &str) -> Result<Columns> {
        let cols = match self {
            Relax::Scalar(x) => vec![vec![*x; n]; t],
            Relax::Vector(xs) if xs.len() == n => vec![xs.clone(); t],
            Relax::Matrix(rows) if rows.len() == n => {
                let cols = transpose(rows, name)?;
                if cols.len() != t {
                    return Err(ModelError::Shape(format!(
                        "{name} has {} time points, expected {t}",
                        cols.len()
                    )));
                }
                cols
            }
            _ => return Err(ModelError::Shape(format!(
                "{name} ({}) does not match {n} compartments",
                self.kind()
            ))),
        };
        Ok(Columns { cols, series: t != 1 })
    }
}

/// Rows are compartments, returned columns are time points.
fn transpose(rows: &[Vec<f64>], name: &str) -> Result<Vec<Vec<f64>>> {
    let t = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != t) {
        return Err(ModelError::Shape(format!(
            "{name} rows have different lengths"
        )));
    }
    Ok((0..t)
        .map(|k| rows.iter().map(|row| row[k]).collect())
        .collect())
}

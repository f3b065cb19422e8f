//! Longitudinal magnetization of a set of compartments exchanging water.
//!
//! With magnetization `m_i` per compartment (equilibrium `v_i`), the system
//! evolves as `dm/dt = -K m + J` where
//!
//! ```text
//! K_ii = R1_i + (sum_k Fw[k][i]) / v_i
//! K_ij = -Fw[i][j] / v_j                  (i != j)
//! J_i  = R1_i v_i + j_i
//! ```
//!
//! `K diag(v)` is symmetric, so `K` is diagonalised through the symmetric
//! matrix `A = V^-1/2 (K V) V^-1/2`. In the eigenbasis of `A` every sequence
//! acts on each mode independently (see [`Readout`]).
//!
//! No exchange and instantaneous exchange are solved in closed form; the
//! eigen decomposition is only used for finite exchange.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use super::sequence::Readout;
use crate::{Exchange, ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Regime {
    /// All off-diagonal exchange rates are zero.
    Independent,
    /// All off-diagonal exchange rates are infinite.
    Fast,
    Finite,
}

/// A validated set of compartments with their exchange matrix.
#[derive(Debug, Clone)]
pub(crate) struct Network<'a> {
    v: &'a [f64],
    fw: DMatrix<f64>,
    regime: Regime,
}

impl<'a> Network<'a> {
    pub fn new(v: &'a [f64], exchange: &Exchange) -> Result<Self> {
        let n = v.len();
        let fw = match exchange {
            Exchange::Scalar(x) => {
                if x.is_nan() || *x < 0.0 {
                    return Err(ModelError::parameter("fw", format!("must be >= 0 (found {x})")));
                }
                DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { *x })
            }
            Exchange::Matrix(rows) => matrix(rows, n)?,
        };
        let regime = classify(&fw)?;
        log::debug!("{n} compartments, exchange regime {regime:?}");
        Ok(Self { v, fw, regime })
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Fully relaxed inflow: the magnetization carried in by the external flow.
    pub fn default_inflow(&self) -> Vec<f64> {
        self.fw.diagonal().iter().copied().collect()
    }

    /// Total magnetization acquired by `readout` for relaxation rates `r1`
    /// and inflow `j` (one value per compartment).
    pub fn respond<R: Readout + ?Sized>(&self, readout: &R, r1: &[f64], j: &[f64]) -> Result<f64> {
        let total = match self.regime() {
            Regime::Independent => self.independent(readout, r1, j),
            Regime::Fast => self.fast(readout, r1, j),
            Regime::Finite => self.finite(readout, r1, j),
        };
        if !total.is_finite() {
            log::warn!("exchange system has no finite solution (regime {:?})", self.regime());
            return Err(ModelError::Consistency(format!(
                "no finite magnetization for R1 = {r1:?}"
            )));
        }
        Ok(total)
    }

    fn independent<R: Readout + ?Sized>(&self, readout: &R, r1: &[f64], j: &[f64]) -> f64 {
        (0..self.len())
            .map(|i| {
                let lambda = r1[i] + self.fw[(i, i)] / self.v[i];
                readout.mode(lambda, r1[i] * self.v[i] + j[i])
            })
            .sum()
    }

    /// All compartments merge into one pool with the volume-weighted mean R1.
    fn fast<R: Readout + ?Sized>(&self, readout: &R, r1: &[f64], j: &[f64]) -> f64 {
        let volume: f64 = self.v.iter().sum();
        let weighted: f64 = self.v.iter().zip(r1).map(|(v, r)| v * r).sum();
        let outflow: f64 = self.fw.diagonal().sum();
        let lambda = (weighted + outflow) / volume;
        readout.mode(lambda, weighted + j.iter().sum::<f64>())
    }

    fn finite<R: Readout + ?Sized>(&self, readout: &R, r1: &[f64], j: &[f64]) -> f64 {
        let n = self.len();
        let root: Vec<f64> = self.v.iter().map(|v| v.sqrt()).collect();
        // total flow leaving each compartment, including to the outside
        let outflow: Vec<f64> = (0..n).map(|i| self.fw.column(i).sum()).collect();

        let a = DMatrix::from_fn(n, n, |i, k| {
            if i == k {
                r1[i] + outflow[i] / self.v[i]
            } else {
                -self.fw[(i, k)] / (root[i] * root[k])
            }
        });
        let eigen = SymmetricEigen::new(a);

        let source = DVector::from_fn(n, |i, _| (r1[i] * self.v[i] + j[i]) / root[i]);
        let b = eigen.eigenvectors.transpose() * source;
        let y = DVector::from_fn(n, |k, _| readout.mode(eigen.eigenvalues[k], b[k]));
        let z = &eigen.eigenvectors * y;
        (0..n).map(|i| root[i] * z[i]).sum()
    }
}

/// Shape and symmetry checks of an explicit exchange matrix.
fn matrix(rows: &[Vec<f64>], n: usize) -> Result<DMatrix<f64>> {
    let size = rows.len();
    if let Some(row) = rows.iter().find(|row| row.len() != size) {
        return Err(ModelError::Shape(format!(
            "exchange matrix is not square ({size} rows, a row of length {})",
            row.len()
        )));
    }
    if size != n {
        return Err(ModelError::Shape(format!(
            "exchange matrix is {size}x{size} for {n} compartments"
        )));
    }
    for i in 0..n {
        for j in 0..n {
            let x = rows[i][j];
            if x.is_nan() || x < 0.0 {
                return Err(ModelError::parameter(
                    "fw",
                    format!("entry [{i}][{j}] must be >= 0 (found {x})"),
                ));
            }
            // exact comparison: 1e6 and inf are different exchange rates
            if j > i && x != rows[j][i] {
                return Err(ModelError::Consistency(format!(
                    "exchange matrix is not symmetric: [{i}][{j}] = {x}, [{j}][{i}] = {}",
                    rows[j][i]
                )));
            }
        }
        if rows[i][i].is_infinite() {
            return Err(ModelError::Consistency(format!(
                "external flow of compartment {i} is infinite"
            )));
        }
    }
    Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
}

fn classify(fw: &DMatrix<f64>) -> Result<Regime> {
    let n = fw.nrows();
    let off_diagonal = || {
        (0..n).flat_map(move |i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
    };
    if off_diagonal().all(|(i, j)| fw[(i, j)] == 0.0) {
        return Ok(Regime::Independent);
    }
    let infinite = off_diagonal().filter(|&(i, j)| fw[(i, j)].is_infinite()).count();
    match infinite {
        0 => Ok(Regime::Finite),
        count if count == n * (n - 1) => Ok(Regime::Fast),
        _ => Err(ModelError::Consistency(
            "exchange matrix mixes finite and infinite exchange rates".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::sequence::SteadyState;
    use approx::assert_relative_eq;

    const V: [f64; 2] = [0.3, 0.6];

    #[test]
    fn scalar_exchange_is_broadcast() {
        let net = Network::new(&V, &Exchange::Scalar(0.0)).unwrap();
        assert_eq!(net.regime(), Regime::Independent);
        let net = Network::new(&V, &Exchange::Scalar(f64::INFINITY)).unwrap();
        assert_eq!(net.regime(), Regime::Fast);
        let net = Network::new(&V, &Exchange::Scalar(2.0)).unwrap();
        assert_eq!(net.regime(), Regime::Finite);
        assert_eq!(net.default_inflow(), vec![0.0, 0.0]);
        assert!(Network::new(&V, &Exchange::Scalar(-1.0)).is_err());
    }

    #[test]
    fn matrix_shape_errors() {
        let err = Network::new(&V, &Exchange::Matrix(vec![vec![1.0, 1.0]])).unwrap_err();
        assert!(matches!(err, ModelError::Shape(_)));
        let err = Network::new(&V, &Exchange::from([[1.0; 3]; 3])).unwrap_err();
        assert!(matches!(err, ModelError::Shape(_)));
    }

    #[test]
    fn matrix_must_be_exactly_symmetric() {
        let fw = Exchange::from([[0.1, 1e6], [f64::INFINITY, 1.0]]);
        assert!(matches!(Network::new(&V, &fw), Err(ModelError::Consistency(_))));
        let fw = Exchange::from([[0.1, 2.0], [2.0 + 1e-12, 1.0]]);
        assert!(matches!(Network::new(&V, &fw), Err(ModelError::Consistency(_))));
    }

    #[test]
    fn mixed_infinite_exchange_is_rejected() {
        let v = [0.2, 0.3, 0.4];
        let inf = f64::INFINITY;
        let fw = Exchange::from([[0.0, inf, 1.0], [inf, 0.0, 1.0], [1.0, 1.0, 0.0]]);
        assert!(matches!(Network::new(&v, &fw), Err(ModelError::Consistency(_))));
        let fw = Exchange::from([[inf, 1.0], [1.0, 0.0]]);
        assert!(matches!(Network::new(&V, &fw), Err(ModelError::Consistency(_))));
    }

    #[test]
    fn finite_solve_matches_closed_forms() {
        let seq = SteadyState::new(1.0, 0.01, 25.0);
        let r1 = [0.7, 2.5];
        let j = [0.05, 0.4];

        let diag = [[0.05, 0.0], [0.0, 0.4]];
        let independent = Network::new(&V, &Exchange::from(diag)).unwrap();
        let mut tiny = diag;
        tiny[0][1] = 1e-9;
        tiny[1][0] = 1e-9;
        let slow = Network::new(&V, &Exchange::from(tiny)).unwrap();
        assert_eq!(slow.regime(), Regime::Finite);
        assert_relative_eq!(
            slow.respond(&seq, &r1, &j).unwrap(),
            independent.respond(&seq, &r1, &j).unwrap(),
            max_relative = 1e-6
        );

        let inf = f64::INFINITY;
        let fast = Network::new(&V, &Exchange::from([[0.05, inf], [inf, 0.4]])).unwrap();
        let quick = Network::new(&V, &Exchange::from([[0.05, 1e7], [1e7, 0.4]])).unwrap();
        assert_relative_eq!(
            quick.respond(&seq, &r1, &j).unwrap(),
            fast.respond(&seq, &r1, &j).unwrap(),
            max_relative = 1e-4
        );
    }

    #[test]
    fn equilibrium_is_volume() {
        // without excitation the magnetization stays at equilibrium: sum of v
        let seq = SteadyState::new(1.0, 1.0, 0.0);
        let net = Network::new(&V, &Exchange::from([[0.2, 3.0], [3.0, 0.1]])).unwrap();
        let j = net.default_inflow();
        let total = net.respond(&seq, &[1.0, 0.4], &j).unwrap();
        assert_relative_eq!(total, 0.9, max_relative = 1e-10);
    }
}

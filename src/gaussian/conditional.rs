//! Definition of the `GaussianConditional`

use crate::util::{HybridError, Result};
use crate::values::{Vector, VectorValues};
use crate::variable::{Key, Symbol};

use approx::AbsDiffEq;
use itertools::Itertools;
use ndarray::{s, Array1, Array2};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::f64::consts::PI;
use std::fmt;

/// A Gaussian conditional density `p(X | Pa(X))` over one or more frontal variables `X`.
///
/// # Representation
/// The density is kept in whitened square-root form, the result of eliminating the frontal
/// variables from a linear system:
///
/// ```text
/// p(x | pa) ∝ exp(-½ ‖R x + S pa − d‖²)
/// ```
///
/// where `R` is upper triangular with a non-zero diagonal. The columns of `R` follow the
/// frontal variables in order, those of `S` follow the parents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianConditional {

    /// The frontal variables and their dimensions
    frontals: Vec<(Key, usize)>,

    /// The parent variables and their dimensions
    parents: Vec<(Key, usize)>,

    r: Array2<f64>,
    s: Array2<f64>,
    d: Array1<f64>,
}

impl GaussianConditional {

    /// Create a new `GaussianConditional` `R x + S pa = d`.
    ///
    /// # Errors
    /// * `HybridError::InvalidConditional` if the matrix shapes do not match the variable
    ///   dimensions, `R` is not upper triangular with a non-zero diagonal, or a variable appears
    ///   twice
    pub fn new(
        frontals: Vec<(Key, usize)>,
        parents: Vec<(Key, usize)>,
        r: Array2<f64>,
        s: Array2<f64>,
        d: Array1<f64>,
    ) -> Result<Self> {
        let n: usize = frontals.iter().map(|&(_, dim)| dim).sum();
        let m: usize = parents.iter().map(|&(_, dim)| dim).sum();

        if frontals.is_empty() {
            return Err(HybridError::InvalidConditional(String::from("a conditional needs a frontal variable")));
        }

        let nr_keys = frontals.len() + parents.len();
        if frontals.iter().chain(parents.iter()).map(|&(k, _)| k).unique().count() != nr_keys {
            return Err(HybridError::InvalidConditional(String::from("a variable appears twice in the conditional")));
        }

        if r.dim() != (n, n) || s.dim() != (n, m) || d.len() != n {
            return Err(HybridError::InvalidConditional(format!(
                "R is {:?}, S is {:?} and d has length {}, expected {n}x{n}, {n}x{m} and {n}",
                r.dim(),
                s.dim(),
                d.len(),
                n = n,
                m = m
            )));
        }

        for ((i, j), &v) in r.indexed_iter() {
            if (i > j && v != 0.0) || (i == j && v == 0.0) {
                return Err(HybridError::InvalidConditional(String::from(
                    "R must be upper triangular with a non-zero diagonal"
                )));
            }
        }

        Ok(GaussianConditional { frontals, parents, r, s, d })
    }

    /// A conditional over scalar variables: `r x + Σ s_i pa_i = d`
    pub fn scalar(frontal: Key, r: f64, parents: &[(Key, f64)], d: f64) -> Result<Self> {
        let s = Array2::from_shape_vec((1, parents.len()), parents.iter().map(|&(_, v)| v).collect())
            .map_err(|e| HybridError::InvalidConditional(e.to_string()))?;

        GaussianConditional::new(
            vec![(frontal, 1)],
            parents.iter().map(|&(k, _)| (k, 1)).collect(),
            Array2::from_elem((1, 1), r),
            s,
            Array1::from_elem(1, d),
        )
    }

    /// A density over `key` with the given mean and isotropic standard deviation
    pub fn from_mean_and_stddev(key: Key, mean: Vector, sigma: f64) -> Result<Self> {
        let n = mean.len();
        GaussianConditional::new(
            vec![(key, n)],
            vec![],
            Array2::eye(n) / sigma,
            Array2::zeros((n, 0)),
            mean / sigma,
        )
    }

    pub fn frontals(&self) -> &[(Key, usize)] {
        &self.frontals
    }

    pub fn parents(&self) -> &[(Key, usize)] {
        &self.parents
    }

    pub fn frontal_keys(&self) -> Vec<Key> {
        self.frontals.iter().map(|&(k, _)| k).collect()
    }

    pub fn parent_keys(&self) -> Vec<Key> {
        self.parents.iter().map(|&(k, _)| k).collect()
    }

    /// The number of rows, i.e. the total dimension of the frontal variables
    pub fn dim(&self) -> usize {
        self.d.len()
    }

    pub fn r(&self) -> &Array2<f64> {
        &self.r
    }

    pub fn s(&self) -> &Array2<f64> {
        &self.s
    }

    pub fn d(&self) -> &Array1<f64> {
        &self.d
    }

    /// Check if two conditionals are over the same variables, with the same dimensions
    pub fn same_structure(&self, other: &GaussianConditional) -> bool {
        self.frontals == other.frontals && self.parents == other.parents
    }

    /// The whitened residual `R x + S pa − d`
    fn residual(&self, values: &VectorValues) -> Result<Array1<f64>> {
        let x = stack(&self.frontals, values)?;
        let pa = stack(&self.parents, values)?;
        Ok(self.r.dot(&x) + self.s.dot(&pa) - &self.d)
    }

    /// The negative log density, up to the normalization constant: `½ ‖R x + S pa − d‖²`
    ///
    /// # Errors
    /// * `HybridError::KeyNotFound` if a frontal or parent variable has no value
    /// * `HybridError::DimensionMismatch` if a value has the wrong dimension
    pub fn error(&self, values: &VectorValues) -> Result<f64> {
        let e = self.residual(values)?;
        Ok(0.5 * e.dot(&e))
    }

    /// `ln` of the constant `K` in `p(x | pa) = K exp(-error)`: `−n/2 ln 2π + Σ ln|R_ii|`
    pub fn log_normalization_constant(&self) -> f64 {
        let log_det: f64 = self.r.diag().iter().map(|v| v.abs().ln()).sum();
        -0.5 * (self.dim() as f64) * (2.0 * PI).ln() + log_det
    }

    /// `−ln K`, added to `error` to obtain the full negative log density
    pub fn neg_log_constant(&self) -> f64 {
        -self.log_normalization_constant()
    }

    /// Solve for the most likely frontal values given the parents' values, `x = R⁻¹ (d − S pa)`
    pub fn solve(&self, parents: &VectorValues) -> Result<VectorValues> {
        let pa = stack(&self.parents, parents)?;
        let rhs = &self.d - &self.s.dot(&pa);
        Ok(self.split(back_substitute(&self.r, rhs)))
    }

    /// Draw frontal values given the parents' values
    pub fn sample<R: Rng + ?Sized>(&self, parents: &VectorValues, rng: &mut R) -> Result<VectorValues> {
        let pa = stack(&self.parents, parents)?;
        let noise: Array1<f64> = Array1::random_using(self.dim(), StandardNormal, rng);
        let rhs = &self.d - &self.s.dot(&pa) + &noise;
        Ok(self.split(back_substitute(&self.r, rhs)))
    }

    /// Check if the two conditionals have the same structure and matrices equal up to `tol`
    pub fn equals(&self, other: &GaussianConditional, tol: f64) -> bool {
        // shapes that differ compare unequal
        self.same_structure(other)
            && self.r.abs_diff_eq(&other.r, tol)
            && self.s.abs_diff_eq(&other.s, tol)
            && self.d.abs_diff_eq(&other.d, tol)
    }

    /// Split a stacked frontal vector into per-variable values
    fn split(&self, x: Array1<f64>) -> VectorValues {
        let mut values = VectorValues::new();
        let mut offset = 0;
        for &(key, dim) in &self.frontals {
            values.insert(key, x.slice(s![offset..offset + dim]).to_owned());
            offset += dim;
        }
        values
    }
}

/// Concatenate the values of `keys`, checking each dimension
fn stack(keys: &[(Key, usize)], values: &VectorValues) -> Result<Array1<f64>> {
    let mut out = Vec::with_capacity(keys.iter().map(|&(_, dim)| dim).sum());
    for &(key, dim) in keys {
        out.extend(values.at_dim(key, dim)?.iter().cloned());
    }
    Ok(Array1::from(out))
}

/// Solve `R x = rhs` for upper triangular `R`
fn back_substitute(r: &Array2<f64>, mut rhs: Array1<f64>) -> Array1<f64> {
    let n = rhs.len();
    for i in (0..n).rev() {
        let tail = r.slice(s![i, i + 1..]).dot(&rhs.slice(s![i + 1..]));
        rhs[i] = (rhs[i] - tail) / r[[i, i]];
    }
    rhs
}

impl fmt::Display for GaussianConditional {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "p({}", self.frontals.iter().map(|&(k, _)| Symbol(k)).join(", "))?;
        if !self.parents.is_empty() {
            write!(f, " | {}", self.parents.iter().map(|&(k, _)| Symbol(k)).join(", "))?;
        }
        write!(f, ")")
    }
}

use nalgebra::*;
use crate::calc;
use crate::error::{StatsError, Result};
use crate::settings::AnalysisSettings;

/// Residual norm (relative to a unit vector) under which a vector is taken as
/// lying in the span of the basis built so far.
const DEPENDENCE_TOL : f64 = 1E-10;

/// Gram-Schmidt orthonormalization of the C rows of a C x B matrix (C <= B).
/// The rows before `start` are assumed to be orthonormal already; with
/// start = 0 the first row is normalized and seeds the basis. Each following
/// row is normalized, projected onto the orthogonal complement of the rows
/// before it through P = I - U (UᵗU)⁻¹ Uᵗ, and normalized again. The result
/// spans the same space as the input, provided the input rows are linearly
/// independent; otherwise LinearlyDependent names the first offending row.
pub fn orthogonalize(vecs : &DMatrix<f64>, start : usize) -> Result<DMatrix<f64>> {
    orthogonalize_with(vecs, start, &AnalysisSettings::default())
}

/// As orthogonalize, inverting UᵗU under settings.pivot_tolerance.
pub fn orthogonalize_with(
    vecs : &DMatrix<f64>,
    start : usize,
    settings : &AnalysisSettings
) -> Result<DMatrix<f64>> {
    let (c, b) = vecs.shape();
    if c > b {
        return Err(StatsError::DimensionMismatch { expected : b, found : c });
    }
    let mut basis = vecs.clone();
    if c == 0 {
        return Ok(basis);
    }
    let mut start = start;
    if start == 0 {
        let norm = basis.row(0).norm();
        if norm <= DEPENDENCE_TOL {
            return Err(StatsError::LinearlyDependent { index : 0 });
        }
        basis.row_mut(0).unscale_mut(norm);
        start = 1;
    }
    let eye = DMatrix::<f64>::identity(b, b);
    for i in start..c {
        let norm = basis.row(i).norm();
        if norm <= DEPENDENCE_TOL {
            return Err(StatsError::LinearlyDependent { index : i });
        }
        let v : DVector<f64> = basis.row(i).transpose().unscale(norm);
        let u = basis.rows(0, i).transpose();
        let utu_inv = calc::invert(&(u.transpose() * &u), settings.pivot_tolerance)
            .ok_or(StatsError::LinearlyDependent { index : i })?;
        let p = &eye - &u * utu_inv * u.transpose();
        let w = p * v;
        let w_norm = w.norm();
        if w_norm <= DEPENDENCE_TOL {
            return Err(StatsError::LinearlyDependent { index : i });
        }
        basis.set_row(i, &w.unscale(w_norm).transpose());
    }
    Ok(basis)
}

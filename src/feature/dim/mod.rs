use nalgebra::*;
use std::cmp::Ordering;
use crate::calc::{self, running};
use crate::error::{StatsError, Result};
use crate::sample::SampleSource;
use crate::settings::AnalysisSettings;

/// Eigenvalues and the matching unit-norm eigenvectors, the i-th eigenvector
/// being the i-th row of `eigenvectors`. No particular order is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenResult {
    pub eigenvalues : DVector<f64>,
    pub eigenvectors : DMatrix<f64>
}

impl EigenResult {

    pub fn len(&self) -> usize {
        self.eigenvalues.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.nrows() == 0
    }

    /// Reorders the pairs by decreasing eigenvalue.
    pub fn sorted_descending(&self) -> Self {
        let mut order : Vec<usize> = (0..self.len()).collect();
        order.sort_by(|a, b| {
            self.eigenvalues[*b].partial_cmp(&self.eigenvalues[*a]).unwrap_or(Ordering::Equal)
        });
        let eigenvalues = DVector::from_iterator(order.len(), order.iter().map(|i| self.eigenvalues[*i] ));
        let eigenvectors = DMatrix::from_fn(order.len(), self.eigenvectors.ncols(), |i, j| {
            self.eigenvectors[(order[i], j)]
        });
        Self { eigenvalues, eigenvectors }
    }

    /// Keeps the leading pairs holding `fraction` of the total variance. Expects
    /// eigenvalues in decreasing order (see sorted_descending).
    pub fn reduce(&self, fraction : f64) -> Result<Self> {
        let (eigenvalues, eigenvectors) = reduce_eigenvectors(&self.eigenvalues, &self.eigenvectors, fraction)?;
        Ok(Self { eigenvalues, eigenvectors })
    }

    pub fn reduce_with(&self, settings : &AnalysisSettings) -> Result<Self> {
        self.reduce(settings.retained_fraction)
    }

}

/// Principal components of a sample set.
#[derive(Debug, Clone)]
pub struct PrincipalComponents {

    pub eigen : EigenResult,

    pub mean : DVector<f64>,

    pub cov : DMatrix<f64>

}

/// Eigendecomposition of the sample covariance. Eigenvectors are returned as
/// unit-norm rows; the pairs are in whatever order the decomposition produced
/// them, so call EigenResult::sorted_descending before truncating.
pub fn principal_components<S>(source : &S) -> Result<PrincipalComponents>
where
    S : SampleSource + ?Sized
{
    let (mean, cov, _) = calc::mean_cov(source)?;
    Ok(decompose(mean, cov))
}

pub fn principal_components_with<S>(source : &S, settings : &AnalysisSettings) -> Result<PrincipalComponents>
where
    S : SampleSource + ?Sized
{
    let (mean, cov, _) = if settings.parallel {
        calc::mean_cov_parallel(source)?
    } else {
        calc::mean_cov(source)?
    };
    Ok(decompose(mean, cov))
}

fn decompose(mean : DVector<f64>, cov : DMatrix<f64>) -> PrincipalComponents {
    let eig = cov.clone().symmetric_eigen();
    let mut eigenvectors = eig.eigenvectors.transpose();
    for mut row in eigenvectors.row_iter_mut() {
        let norm = row.norm();
        if norm > 0.0 {
            row.unscale_mut(norm);
        }
    }
    PrincipalComponents {
        eigen : EigenResult { eigenvalues : eig.eigenvalues, eigenvectors },
        mean,
        cov
    }
}

/// Retains the smallest leading set of eigenvalues (and their eigenvectors,
/// one per row) whose sum is at least `fraction` of the sum of all
/// eigenvalues. The eigenvalues must be non-negative and in decreasing order.
/// A fraction of 1.0 keeps every pair.
pub fn reduce_eigenvectors(
    eigenvalues : &DVector<f64>,
    eigenvectors : &DMatrix<f64>,
    fraction : f64
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(StatsError::InvalidFraction(fraction));
    }
    if eigenvectors.nrows() != eigenvalues.nrows() {
        return Err(StatsError::DimensionMismatch { expected : eigenvalues.nrows(), found : eigenvectors.nrows() });
    }
    let n = eigenvalues.nrows();
    let total = eigenvalues.sum();
    if fraction >= 1.0 || n == 0 || total <= 0.0 {
        return Ok((eigenvalues.clone(), eigenvectors.clone()));
    }
    let keep = running::cumulative_sum_until(eigenvalues.iter().cloned(), |s| s / total >= fraction )
        .map(|acc| acc.pos + 1 )
        .unwrap_or(n);
    Ok((eigenvalues.rows(0, keep).clone_owned(), eigenvectors.rows(0, keep).clone_owned()))
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::sample::MatrixSamples;

    const EPS : f64 = 1E-9;

    #[test]
    fn components_diagonalize_covariance() {
        let s = MatrixSamples::from_rows(&[
            vec![2.5, 2.4, 0.5],
            vec![0.5, 0.7, 1.1],
            vec![2.2, 2.9, 0.3],
            vec![1.9, 2.2, 0.8],
            vec![3.1, 3.0, 0.1],
            vec![2.3, 2.7, 0.9],
            vec![2.0, 1.6, 1.4],
            vec![1.0, 1.1, 0.6]
        ]).unwrap();
        let pc = principal_components(&s).unwrap();
        let v = &pc.eigen.eigenvectors;
        for row in v.row_iter() {
            assert!((row.norm() - 1.0).abs() < EPS);
        }
        let d = v * &pc.cov * v.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { pc.eigen.eigenvalues[i] } else { 0.0 };
                assert!((d[(i, j)] - expected).abs() < EPS);
            }
        }
        let sorted = pc.eigen.sorted_descending();
        assert!(sorted.eigenvalues[0] >= sorted.eigenvalues[1]);
        assert!(sorted.eigenvalues[1] >= sorted.eigenvalues[2]);
    }

    #[test]
    fn reduction_keeps_variance_fraction() {
        let l = DVector::from_vec(vec![6.0, 3.0, 0.9, 0.1]);
        let v = DMatrix::identity(4, 4);
        let (l2, v2) = reduce_eigenvectors(&l, &v, 0.9).unwrap();
        assert_eq!(l2.nrows(), 2);
        assert_eq!(v2.nrows(), 2);
        assert_eq!(v2.ncols(), 4);
        let (l3, _) = reduce_eigenvectors(&l, &v, 0.95).unwrap();
        assert_eq!(l3.nrows(), 3);
        let (l4, v4) = reduce_eigenvectors(&l, &v, 1.0).unwrap();
        assert_eq!(l4, l);
        assert_eq!(v4, v);
        assert!(reduce_eigenvectors(&l, &v, 0.0).is_err());
    }

}

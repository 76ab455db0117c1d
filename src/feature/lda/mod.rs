use nalgebra::*;
use tracing::debug;
use crate::calc;
use crate::error::{StatsError, Result};
use crate::feature::dim::EigenResult;
use crate::settings::AnalysisSettings;
use crate::train::TrainingClassSet;

/// Fisher's linear discriminant over a set of C classes: the C-1 axes of
/// maximum between-class relative to within-class variation, together with
/// the two covariance matrices they were derived from.
///
/// The discriminants are the solutions of the generalized eigenproblem
/// Cb v = λ Cw v (the eigenpairs of Cw⁻¹ Cb), ordered by decreasing λ, and
/// scaled so that the within-class covariance becomes the identity in the
/// projected space (V Cw Vᵗ = I).
#[derive(Debug, Clone)]
pub struct LinearDiscriminant {

    pub eigen : EigenResult,

    /// Between-class covariance.
    pub cov_b : DMatrix<f64>,

    /// Within-class covariance.
    pub cov_w : DMatrix<f64>

}

impl LinearDiscriminant {

    /// The (C-1) x B matrix projecting samples onto the discriminant axes.
    pub fn transform(&self) -> &DMatrix<f64> {
        &self.eigen.eigenvectors
    }

}

pub fn linear_discriminant(classes : &mut TrainingClassSet) -> Result<LinearDiscriminant> {
    linear_discriminant_with(classes, &AnalysisSettings::default())
}

/// Statistics missing from any class are computed first. With N the total
/// number of samples, the within-class covariance is Cw = Σ (n_i - 1) cov_i / N
/// and the between-class covariance Cb = Σ n_i (m_i - m)(m_i - m)ᵗ / N, m being
/// the sample-weighted grand mean.
pub fn linear_discriminant_with(
    classes : &mut TrainingClassSet,
    settings : &AnalysisSettings
) -> Result<LinearDiscriminant> {
    let c = classes.len();
    if c < 2 {
        return Err(StatsError::InsufficientClasses { found : c });
    }
    classes.ensure_statistics_with(settings)?;
    let b = classes.num_bands().unwrap_or(0);

    let mut n = 0.0;
    let mut mean = DVector::<f64>::zeros(b);
    for cl in classes.iter() {
        let stats = cl.stats().ok_or(StatsError::StatisticsUnavailable(cl.index()))?;

        // A class re-projected on its own (through get_mut) no longer matches the set.
        if stats.num_bands() != b {
            return Err(StatsError::DimensionMismatch { expected : b, found : stats.num_bands() });
        }
        let size = stats.num_samples() as f64;
        n += size;
        mean += stats.mean() * size;
    }
    mean.unscale_mut(n);

    let mut cov_w = DMatrix::<f64>::zeros(b, b);
    let mut cov_b = DMatrix::<f64>::zeros(b, b);
    for cl in classes.iter() {
        let stats = cl.stats().ok_or(StatsError::StatisticsUnavailable(cl.index()))?;
        let size = stats.num_samples() as f64;
        cov_w += stats.cov() * (size - 1.0);
        let dm = stats.mean() - &mean;
        cov_b.ger(size, &dm, &dm, 1.0);
    }
    cov_w.unscale_mut(n);
    cov_b.unscale_mut(n);

    let singular = StatsError::SingularWithinClassCovariance { dim : b };
    if calc::invert(&cov_w, settings.pivot_tolerance).is_none() {
        return Err(singular);
    }

    // Cw = L Lᵗ turns the problem into the symmetric one L⁻¹ Cb L⁻ᵗ w = λ w,
    // whose eigenvectors map back through v = L⁻ᵗ w.
    let l = cov_w.clone().cholesky().ok_or(singular.clone())?.l();
    let l_inv = l.solve_lower_triangular(&DMatrix::identity(b, b)).ok_or(singular)?;
    let reduced = &l_inv * &cov_b * l_inv.transpose();
    let reduced = (&reduced + reduced.transpose()).unscale(2.0);
    let eig = reduced.symmetric_eigen();
    let vecs = (l_inv.transpose() * eig.eigenvectors).transpose();

    let unordered = EigenResult { eigenvalues : eig.eigenvalues, eigenvectors : vecs };
    let rank = (c - 1).min(b);
    let sorted = unordered.sorted_descending();
    let eigenvalues = sorted.eigenvalues.rows(0, rank).clone_owned();
    let mut eigenvectors = sorted.eigenvectors.rows(0, rank).clone_owned();

    // Unit within-class variance along every discriminant axis.
    let proj_w = &eigenvectors * &cov_w * eigenvectors.transpose();
    for (i, mut row) in eigenvectors.row_iter_mut().enumerate() {
        row.unscale_mut(proj_w[(i, i)].sqrt());
    }

    debug!(classes = c, bands = b, retained = rank, "linear discriminant solved");
    Ok(LinearDiscriminant {
        eigen : EigenResult { eigenvalues, eigenvectors },
        cov_b,
        cov_w
    })
}

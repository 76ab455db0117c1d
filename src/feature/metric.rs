use nalgebra::*;
use crate::calc;
use crate::error::{StatsError, Result};
use crate::settings::AnalysisSettings;
use crate::train::{TrainingClass, GaussianStats};

/// Linear (mean separation) and quadratic (covariance mismatch) parts of the
/// Bhattacharyya distance between two Gaussian classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BDistanceTerms {
    pub linear : f64,
    pub quadratic : f64
}

impl BDistanceTerms {

    pub fn total(&self) -> f64 {
        self.linear + self.quadratic
    }

}

pub fn b_distance_terms_from_stats(a : &GaussianStats, b : &GaussianStats) -> Result<BDistanceTerms> {
    b_distance_terms_from_stats_with(a, b, &AnalysisSettings::default())
}

/// With Δm = mean_a - mean_b and avg = (cov_a + cov_b) / 2:
/// linear = Δmᵗ avg⁻¹ Δm / 8 and
/// quadratic = (ln|avg| - ln|cov_a| / 2 - ln|cov_b| / 2) / 2.
/// avg is inverted under settings.pivot_tolerance.
pub fn b_distance_terms_from_stats_with(
    a : &GaussianStats,
    b : &GaussianStats,
    settings : &AnalysisSettings
) -> Result<BDistanceTerms> {
    if a.num_bands() != b.num_bands() {
        return Err(StatsError::DimensionMismatch { expected : a.num_bands(), found : b.num_bands() });
    }
    let dm : DVector<f64> = a.mean() - b.mean();
    let avg_cov = (a.cov() + b.cov()).unscale(2.0);
    let avg_inv = calc::invert(&avg_cov, settings.pivot_tolerance)
        .ok_or(StatsError::SingularCovariance { dim : avg_cov.nrows() })?;
    let linear = dm.dot(&(avg_inv * &dm)) / 8.0;
    let quadratic = 0.5 * (calc::log_determinant(&avg_cov) - 0.5 * a.log_det_cov() - 0.5 * b.log_det_cov());
    Ok(BDistanceTerms { linear, quadratic })
}

pub fn b_distance_terms(a : &TrainingClass, b : &TrainingClass) -> Result<BDistanceTerms> {
    b_distance_terms_with(a, b, &AnalysisSettings::default())
}

/// Bhattacharyya terms between two classes, which must hold valid statistics.
pub fn b_distance_terms_with(
    a : &TrainingClass,
    b : &TrainingClass,
    settings : &AnalysisSettings
) -> Result<BDistanceTerms> {
    let sa = a.stats().ok_or(StatsError::StatisticsUnavailable(a.index()))?;
    let sb = b.stats().ok_or(StatsError::StatisticsUnavailable(b.index()))?;
    b_distance_terms_from_stats_with(sa, sb, settings)
}

/// Separability of two classes: the larger the distance, the better the classes
/// can be told apart.
pub fn bhattacharyya_distance(a : &TrainingClass, b : &TrainingClass) -> Result<f64> {
    bhattacharyya_distance_with(a, b, &AnalysisSettings::default())
}

pub fn bhattacharyya_distance_with(
    a : &TrainingClass,
    b : &TrainingClass,
    settings : &AnalysisSettings
) -> Result<f64> {
    b_distance_terms_with(a, b, settings).map(|t| t.total() )
}

pub use self::bhattacharyya_distance as b_distance;

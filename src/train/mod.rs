use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::sync::Arc;
use tracing::debug;
use crate::calc;
use crate::error::{StatsError, Result};
use crate::sample::{SampleSource, TransformedSamples};
use crate::settings::AnalysisSettings;

pub mod set;

pub use set::*;

pub mod record;

pub use record::*;

/// Gaussian summary of a training class: mean, unbiased covariance and the
/// quantities derived from the covariance (its inverse and log-determinant).
/// The derived fields are always computed together with the covariance they
/// come from; a GaussianStats value is never updated piecewise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianStats {
    mean : DVector<f64>,
    cov : DMatrix<f64>,
    inv_cov : DMatrix<f64>,
    log_det_cov : f64,
    num_samples : usize
}

impl GaussianStats {

    /// Derives inverse and log-determinant from the informed covariance. Fails
    /// with SingularCovariance if the covariance cannot be inverted.
    pub fn from_mean_cov(
        mean : DVector<f64>,
        cov : DMatrix<f64>,
        num_samples : usize,
        tol : f64
    ) -> Result<Self> {
        if !cov.is_square() || cov.nrows() != mean.nrows() {
            return Err(StatsError::DimensionMismatch { expected : mean.nrows(), found : cov.nrows() });
        }
        let inv_cov = calc::invert(&cov, tol)
            .ok_or(StatsError::SingularCovariance { dim : cov.nrows() })?;
        let log_det_cov = calc::log_determinant(&cov);
        Ok(Self { mean, cov, inv_cov, log_det_cov, num_samples })
    }

    /// Single pass over the source followed by inversion of the covariance.
    pub fn estimate<S>(source : &S, tol : f64) -> Result<Self>
    where
        S : SampleSource + ?Sized
    {
        let (mean, cov, n) = calc::mean_cov(source)?;
        Self::from_mean_cov(mean, cov, n, tol)
    }

    /// Statistics of the samples re-expressed as X x, for a C x B matrix X:
    /// mean' = X mean and cov' = X cov Xᵗ. The sample count is unchanged.
    pub fn transform(&self, x : &DMatrix<f64>, tol : f64) -> Result<Self> {
        if x.ncols() != self.mean.nrows() {
            return Err(StatsError::DimensionMismatch { expected : self.mean.nrows(), found : x.ncols() });
        }
        let mean = x * &self.mean;
        let cov = x * &self.cov * x.transpose();
        Self::from_mean_cov(mean, cov, self.num_samples, tol)
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    pub fn inv_cov(&self) -> &DMatrix<f64> {
        &self.inv_cov
    }

    pub fn log_det_cov(&self) -> f64 {
        self.log_det_cov
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn num_bands(&self) -> usize {
        self.mean.nrows()
    }

}

/// Cached statistics of a training class.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsState {

    /// Never computed.
    Uncomputed,

    Valid(GaussianStats),

    /// The selection or source changed after the last computation.
    Stale

}

/// A labeled set of samples assumed to come from one Gaussian population.
/// The class reads its samples through a shared handle it does not own, and
/// computes its statistics on demand.
#[derive(Debug, Clone)]
pub struct TrainingClass {
    index : u32,
    class_prob : f64,
    source : Arc<dyn SampleSource>,
    num_bands : usize,
    state : StatsState
}

impl TrainingClass {

    pub fn new(index : u32, source : Arc<dyn SampleSource>) -> Self {
        let num_bands = source.band_count();
        Self {
            index,
            class_prob : 1.0,
            source,
            num_bands,
            state : StatsState::Uncomputed
        }
    }

    /// Sets the prior probability used by classifiers (1.0 gives every class
    /// equal weighting).
    pub fn with_prob(mut self, class_prob : f64) -> Self {
        self.class_prob = class_prob;
        self
    }

    pub(crate) fn from_parts(
        index : u32,
        class_prob : f64,
        source : Arc<dyn SampleSource>,
        stats : GaussianStats
    ) -> Self {
        Self {
            index,
            class_prob,
            num_bands : stats.num_bands(),
            source,
            state : StatsState::Valid(stats)
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn class_prob(&self) -> f64 {
        self.class_prob
    }

    pub fn set_class_prob(&mut self, class_prob : f64) {
        self.class_prob = class_prob;
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    pub fn source(&self) -> &Arc<dyn SampleSource> {
        &self.source
    }

    pub fn state(&self) -> &StatsState {
        &self.state
    }

    pub fn samples<'a>(&'a self) -> impl Iterator<Item=DVector<f64>> + 'a {
        self.source.samples()
    }

    /// Returns the cached statistics, if they are valid.
    pub fn stats(&self) -> Option<&GaussianStats> {
        match self.state {
            StatsState::Valid(ref s) => Some(s),
            _ => None
        }
    }

    pub fn stats_valid(&self) -> bool {
        self.stats().is_some()
    }

    /// Marks the statistics as outdated (e.g. after the selection behind the
    /// sample source changed).
    pub fn invalidate(&mut self) {
        if self.stats_valid() {
            self.state = StatsState::Stale;
        }
    }

    /// Binds the class to a new sample source, invalidating its statistics.
    pub fn set_source(&mut self, source : Arc<dyn SampleSource>) {
        self.num_bands = source.band_count();
        self.source = source;
        self.invalidate();
    }

    /// Number of samples in the class. Taken from the statistics when they are
    /// valid; otherwise asked from the source, which does not require a pass
    /// over the samples.
    pub fn size(&self) -> usize {
        match self.state {
            StatsState::Valid(ref s) => s.num_samples(),
            _ => self.source.sample_count()
        }
    }

    pub fn calc_statistics(&mut self) -> Result<&GaussianStats> {
        self.calc_statistics_with(&AnalysisSettings::default())
    }

    /// Recomputes the statistics from the sample source. The previous state is
    /// kept if the computation fails.
    pub fn calc_statistics_with(&mut self, settings : &AnalysisSettings) -> Result<&GaussianStats> {
        let stats = GaussianStats::estimate(self.source.as_ref(), settings.pivot_tolerance)?;
        debug!(index = self.index, samples = stats.num_samples(), bands = stats.num_bands(), "class statistics computed");
        self.state = StatsState::Valid(stats);
        Ok(self.valid_stats())
    }

    /// Returns valid statistics, computing them only if needed.
    pub fn ensure_statistics(&mut self) -> Result<&GaussianStats> {
        self.ensure_statistics_with(&AnalysisSettings::default())
    }

    pub fn ensure_statistics_with(&mut self, settings : &AnalysisSettings) -> Result<&GaussianStats> {
        if !self.stats_valid() {
            return self.calc_statistics_with(settings);
        }
        Ok(self.valid_stats())
    }

    fn valid_stats(&self) -> &GaussianStats {
        match self.state {
            StatsState::Valid(ref s) => s,
            _ => unreachable!("statistics checked or assigned before access")
        }
    }

    /// Builds the statistics and the sample view this class would have after
    /// a transform by x, without modifying self.
    pub(crate) fn prepare_transform(
        &self,
        x : &DMatrix<f64>,
        settings : &AnalysisSettings
    ) -> Result<(GaussianStats, Arc<dyn SampleSource>)> {
        if x.ncols() != self.num_bands {
            return Err(StatsError::DimensionMismatch { expected : self.num_bands, found : x.ncols() });
        }
        let stats = match self.stats() {
            Some(s) => s.transform(x, settings.pivot_tolerance)?,
            None => GaussianStats::estimate(self.source.as_ref(), settings.pivot_tolerance)?
                .transform(x, settings.pivot_tolerance)?
        };
        let source : Arc<dyn SampleSource> = Arc::new(TransformedSamples::new(x.clone(), self.source.clone())?);
        Ok((stats, source))
    }

    pub(crate) fn commit_transform(&mut self, stats : GaussianStats, source : Arc<dyn SampleSource>) {
        debug!(index = self.index, from = self.num_bands, to = stats.num_bands(), "class transformed");
        self.num_bands = stats.num_bands();
        self.source = source;
        self.state = StatsState::Valid(stats);
    }

    pub fn transform(&mut self, x : &DMatrix<f64>) -> Result<()> {
        self.transform_with(x, &AnalysisSettings::default())
    }

    /// Re-expresses the class under the C x B linear map x: statistics become
    /// (X mean, X cov Xᵗ) with freshly derived inverse and log-determinant, the
    /// class gets C bands and its samples are read through a transformed view
    /// of the previous source. Either everything is updated or nothing is.
    pub fn transform_with(&mut self, x : &DMatrix<f64>, settings : &AnalysisSettings) -> Result<()> {
        let (stats, source) = self.prepare_transform(x, settings)?;
        self.commit_transform(stats, source);
        Ok(())
    }

}

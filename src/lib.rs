/// Sample sources: the abstract view over a set of B-dimensional vectors, and the
/// concrete sources built from matrices, images and label maps.
pub mod sample;

/// Streaming moments, covariance, inversion and log-determinants.
pub mod calc;

/// Training classes (a labeled sample source plus its Gaussian statistics) and
/// sets of such classes.
pub mod train;

/// Feature extraction and dimensionality reduction: PCA, LDA, Gram-Schmidt,
/// Bhattacharyya distance, linear unmixing and NDVI.
pub mod feature;

pub mod error;

/// Numerical settings shared by the analysis routines.
pub mod settings;

pub use error::{StatsError, Result};

pub use settings::AnalysisSettings;

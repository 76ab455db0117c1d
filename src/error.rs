use thiserror::Error;

/// Failures of the statistics and discriminant routines. Every variant is
/// fatal to the call that produced it; nothing here is retried or regularized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {

    #[error("Covariance requires at least 2 samples (found {found})")]
    InsufficientSamples { found : usize },

    #[error("Covariance matrix ({dim}x{dim}) is not invertible")]
    SingularCovariance { dim : usize },

    #[error("Within-class covariance matrix ({dim}x{dim}) is not invertible")]
    SingularWithinClassCovariance { dim : usize },

    #[error("Training set already contains a class with index {0}")]
    DuplicateIndex(u32),

    #[error("Index 0 is reserved for unlabeled samples")]
    ReservedIndex,

    #[error("No class with index {0} in training set")]
    UnknownClass(u32),

    #[error("Statistics of class {0} were not computed or are stale")]
    StatisticsUnavailable(u32),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected : usize, found : usize },

    #[error("Discriminant analysis requires at least 2 classes (found {found})")]
    InsufficientClasses { found : usize },

    #[error("The {count} endmember spectra are not linearly independent")]
    SingularEndmembers { count : usize },

    #[error("Vector {index} lies in the span of the preceding vectors")]
    LinearlyDependent { index : usize },

    #[error("Retained variance fraction {0} outside (0, 1]")]
    InvalidFraction(f64)

}

pub type Result<T> = std::result::Result<T, StatsError>;

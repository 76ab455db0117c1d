/// Principal component analysis and selection of leading eigenvectors by retained variance.
pub mod dim;

/// Orthogonalization of vectors against the span of a leading set (Gram-Schmidt).
pub mod basis;

/// Fisher linear discriminant analysis over a training set.
pub mod lda;

/// Class separability (Bhattacharyya distance between Gaussian class models).
pub mod metric;

// Linear unmixing and spectral angles against endmember spectra.
pub mod unmix;

/// Band-ratio indices (NDVI).
pub mod index;

use nalgebra::*;
use std::sync::Arc;
use super::{SampleSource, LabelMap, Selection};
use crate::error::{StatsError, Result};

/// A derived view that pre-multiplies every sample of a shared source by a
/// C x B matrix. The underlying source is never modified; its selection (if
/// any) is forwarded unchanged.
#[derive(Debug, Clone)]
pub struct TransformedSamples {
    source : Arc<dyn SampleSource>,
    matrix : DMatrix<f64>
}

impl TransformedSamples {

    pub fn new(matrix : DMatrix<f64>, source : Arc<dyn SampleSource>) -> Result<Self> {
        if matrix.ncols() != source.band_count() {
            return Err(StatsError::DimensionMismatch { expected : source.band_count(), found : matrix.ncols() });
        }
        Ok(Self { source, matrix })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn inner(&self) -> &Arc<dyn SampleSource> {
        &self.source
    }

}

impl SampleSource for TransformedSamples {

    fn sample_count(&self) -> usize {
        self.source.sample_count()
    }

    fn band_count(&self) -> usize {
        self.matrix.nrows()
    }

    fn samples<'a>(&'a self) -> Box<dyn Iterator<Item=DVector<f64>> + Send + 'a> {
        Box::new(self.source.samples().map(move |x| &self.matrix * x ))
    }

    fn mask(&self) -> Option<(&LabelMap, Selection)> {
        self.source.mask()
    }

}

#[test]
fn transformed_samples_project_each_vector() {
    use super::MatrixSamples;
    let src = MatrixSamples::from_rows(&[vec![1.0, 2.0, 3.0], vec![0.0, 1.0, 0.0]]).unwrap().into_shared();
    let x = DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 1.0, 0.0, 2.0, 0.0]);
    let t = TransformedSamples::new(x, src.clone()).unwrap();
    assert_eq!(t.band_count(), 2);
    assert_eq!(t.sample_count(), 2);
    let out : Vec<_> = t.samples().collect();
    assert_eq!(out[0], DVector::from_vec(vec![6.0, 4.0]));
    assert_eq!(out[1], DVector::from_vec(vec![1.0, 2.0]));
    assert!(TransformedSamples::new(DMatrix::zeros(2, 2), src).is_err());
}

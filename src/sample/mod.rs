use nalgebra::*;
use std::fmt::Debug;
use std::sync::Arc;

pub mod image;

pub use image::*;

pub mod transform;

pub use transform::*;

/// Sample sources are the single boundary between concrete pixel containers
/// (image cubes, masked images, plain matrices, derived views) and the
/// statistics routines. A source knows its sample and band counts up front
/// and can be iterated any number of times; each pass yields the same set of
/// band vectors, although not necessarily in the same order.
///
/// Sources are shared through `Arc<dyn SampleSource>` handles: many training
/// classes may read the same image through different masks, and no class-level
/// operation ever mutates a source. Re-projecting a class replaces its handle
/// by a derived view (see `TransformedSamples`) instead.
pub trait SampleSource
where
    Self : Debug + Send + Sync
{

    /// Number of vectors a full pass over samples() yields.
    fn sample_count(&self) -> usize;

    /// Length of every yielded vector.
    fn band_count(&self) -> usize;

    /// Starts a new pass over the band vectors.
    fn samples<'a>(&'a self) -> Box<dyn Iterator<Item=DVector<f64>> + Send + 'a>;

    /// If the source is a selection over a label map, returns the map and the
    /// selection criterion; used when persisting training classes.
    fn mask(&self) -> Option<(&LabelMap, Selection)> {
        None
    }

}

/// Owned samples arranged over the rows of a N x B matrix.
#[derive(Debug, Clone)]
pub struct MatrixSamples {
    data : DMatrix<f64>
}

impl MatrixSamples {

    pub fn new(data : DMatrix<f64>) -> Self {
        Self { data }
    }

    /// Builds the sample matrix from a set of equally-sized rows. Returns
    /// None when the rows differ in length or there are no rows.
    pub fn from_rows(rows : &[Vec<f64>]) -> Option<Self> {
        let ncols = rows.first()?.len();
        if rows.iter().any(|r| r.len() != ncols ) {
            return None;
        }
        let data = DMatrix::from_row_slice(
            rows.len(),
            ncols,
            &rows.iter().flatten().cloned().collect::<Vec<_>>()[..]
        );
        Some(Self { data })
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn into_shared(self) -> Arc<dyn SampleSource> {
        Arc::new(self)
    }

}

impl SampleSource for MatrixSamples {

    fn sample_count(&self) -> usize {
        self.data.nrows()
    }

    fn band_count(&self) -> usize {
        self.data.ncols()
    }

    fn samples<'a>(&'a self) -> Box<dyn Iterator<Item=DVector<f64>> + Send + 'a> {
        Box::new(self.data.row_iter().map(|r| r.transpose() ))
    }

}

#[test]
fn matrix_samples_iterate_rows() {
    let s = MatrixSamples::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
    assert_eq!(s.sample_count(), 3);
    assert_eq!(s.band_count(), 2);
    let second = s.samples().nth(1).unwrap();
    assert_eq!(second, DVector::from_vec(vec![3.0, 4.0]));
    assert!(MatrixSamples::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_none());
}

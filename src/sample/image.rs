use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use super::SampleSource;
use crate::error::{StatsError, Result};

/// A rows x cols x bands image cube, stored band-interleaved-by-pixel
/// (the bands of a pixel are contiguous over memory).
#[derive(Debug, Clone)]
pub struct Image {
    rows : usize,
    cols : usize,
    bands : usize,
    data : Vec<f64>
}

impl Image {

    pub fn new(rows : usize, cols : usize, bands : usize, data : Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols * bands {
            return Err(StatsError::DimensionMismatch { expected : rows * cols * bands, found : data.len() });
        }
        Ok(Self { rows, cols, bands, data })
    }

    /// Builds an image by evaluating f(row, col) for every pixel. Each returned
    /// spectrum must have exactly `bands` entries.
    pub fn from_fn<F>(rows : usize, cols : usize, bands : usize, mut f : F) -> Result<Self>
    where
        F : FnMut(usize, usize) -> Vec<f64>
    {
        let mut data = Vec::with_capacity(rows * cols * bands);
        for r in 0..rows {
            for c in 0..cols {
                let px = f(r, c);
                if px.len() != bands {
                    return Err(StatsError::DimensionMismatch { expected : bands, found : px.len() });
                }
                data.extend(px);
            }
        }
        Ok(Self { rows, cols, bands, data })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.bands)
    }

    pub fn pixel(&self, row : usize, col : usize) -> &[f64] {
        self.linear_pixel(row * self.cols + col)
    }

    fn linear_pixel(&self, ix : usize) -> &[f64] {
        &self.data[ix*self.bands..(ix+1)*self.bands]
    }

}

/// Iterates over every pixel of an image.
#[derive(Debug, Clone)]
pub struct ImageSamples {
    image : Arc<Image>
}

impl ImageSamples {

    pub fn new(image : Arc<Image>) -> Self {
        Self { image }
    }

}

impl SampleSource for ImageSamples {

    fn sample_count(&self) -> usize {
        self.image.rows * self.image.cols
    }

    fn band_count(&self) -> usize {
        self.image.bands
    }

    fn samples<'a>(&'a self) -> Box<dyn Iterator<Item=DVector<f64>> + Send + 'a> {
        let n = self.sample_count();
        Box::new((0..n).map(move |ix| DVector::from_column_slice(self.image.linear_pixel(ix)) ))
    }

}

/// Integer label per pixel. Label 0 marks unlabeled pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMap {
    rows : usize,
    cols : usize,
    labels : Vec<u32>
}

impl LabelMap {

    pub fn new(rows : usize, cols : usize, labels : Vec<u32>) -> Result<Self> {
        if labels.len() != rows * cols {
            return Err(StatsError::DimensionMismatch { expected : rows * cols, found : labels.len() });
        }
        Ok(Self { rows, cols, labels })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row : usize, col : usize) -> u32 {
        self.labels[row * self.cols + col]
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels[..]
    }

    /// Distinct label values present in the map (including 0, if present), in ascending order.
    pub fn distinct(&self) -> BTreeSet<u32> {
        self.labels.iter().cloned().collect()
    }

    /// Number of pixels the selection picks, without touching any image data.
    pub fn count(&self, selection : Selection) -> usize {
        self.labels.iter().filter(|l| selection.matches(**l) ).count()
    }

}

/// Which pixels of a label map belong to a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {

    /// Pixels whose label equals the index.
    Index(u32),

    /// All labeled pixels.
    NonZero

}

impl Selection {

    /// Index 0 selects every labeled pixel; any other index selects the pixels
    /// carrying that label.
    pub fn for_index(index : u32) -> Self {
        if index == 0 { Selection::NonZero } else { Selection::Index(index) }
    }

    pub fn matches(&self, label : u32) -> bool {
        match self {
            Selection::Index(ix) => label == *ix,
            Selection::NonZero => label != 0
        }
    }

}

/// The pixels of an image picked by a selection over a label map of the same
/// spatial shape. The sample count is taken from the label map once, at construction.
#[derive(Debug, Clone)]
pub struct MaskedSamples {
    image : Arc<Image>,
    mask : Arc<LabelMap>,
    selection : Selection,
    count : usize
}

impl MaskedSamples {

    pub fn new(image : Arc<Image>, mask : Arc<LabelMap>, selection : Selection) -> Result<Self> {
        let (rows, cols, _) = image.shape();
        if mask.shape() != (rows, cols) {
            return Err(StatsError::DimensionMismatch { expected : rows * cols, found : mask.labels.len() });
        }
        let count = mask.count(selection);
        Ok(Self { image, mask, selection, count })
    }

    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

}

impl SampleSource for MaskedSamples {

    fn sample_count(&self) -> usize {
        self.count
    }

    fn band_count(&self) -> usize {
        self.image.bands
    }

    fn samples<'a>(&'a self) -> Box<dyn Iterator<Item=DVector<f64>> + Send + 'a> {
        let sel = self.selection;
        Box::new(
            self.mask.labels.iter()
                .enumerate()
                .filter(move |(_, l)| sel.matches(**l) )
                .map(move |(ix, _)| DVector::from_column_slice(self.image.linear_pixel(ix)) )
        )
    }

    fn mask(&self) -> Option<(&LabelMap, Selection)> {
        Some((&self.mask, self.selection))
    }

}

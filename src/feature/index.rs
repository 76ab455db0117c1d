use nalgebra::*;
use std::ops::Range;
use crate::error::{StatsError, Result};
use crate::sample::SampleSource;

fn check_range(bands : usize, range : &Range<usize>) -> Result<()> {
    if range.start >= range.end || range.end > bands {
        return Err(StatsError::DimensionMismatch { expected : bands, found : range.end });
    }
    Ok(())
}

fn band_mean(x : &DVector<f64>, range : &Range<usize>) -> f64 {
    x.rows(range.start, range.len()).mean()
}

/// Normalized Difference Vegetation Index (n - r) / (n + r) of every sample,
/// in source order. r and n are the sample values averaged over the red and
/// near-infrared band ranges (a single band is the range i..i+1). Samples with
/// n + r = 0 yield NaN. Empty ranges, and ranges reaching past the last band,
/// are reported as DimensionMismatch.
pub fn ndvi<S>(source : &S, red : Range<usize>, nir : Range<usize>) -> Result<DVector<f64>>
where
    S : SampleSource + ?Sized
{
    let bands = source.band_count();
    check_range(bands, &red)?;
    check_range(bands, &nir)?;
    let values : Vec<f64> = source.samples()
        .map(|x| {
            let r = band_mean(&x, &red);
            let n = band_mean(&x, &nir);
            (n - r) / (n + r)
        })
        .collect();
    Ok(DVector::from_vec(values))
}

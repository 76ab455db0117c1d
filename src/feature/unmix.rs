use nalgebra::*;
use crate::calc;
use crate::error::{StatsError, Result};
use crate::sample::SampleSource;
use crate::settings::AnalysisSettings;

fn check_members<S>(source : &S, members : &DMatrix<f64>) -> Result<()>
where
    S : SampleSource + ?Sized
{
    if members.ncols() != source.band_count() {
        return Err(StatsError::DimensionMismatch { expected : source.band_count(), found : members.ncols() });
    }
    Ok(())
}

/// Linear unmixing against C endmember spectra (rows of `members`, C x B).
/// Returns one row of C abundance fractions per sample, in source order,
/// computed with the pseudo-inverse (M Mᵗ)⁻¹ M. Fractions may be negative.
pub fn unmix<S>(source : &S, members : &DMatrix<f64>) -> Result<DMatrix<f64>>
where
    S : SampleSource + ?Sized
{
    unmix_with(source, members, &AnalysisSettings::default())
}

/// As unmix, inverting M Mᵗ under settings.pivot_tolerance.
pub fn unmix_with<S>(source : &S, members : &DMatrix<f64>, settings : &AnalysisSettings) -> Result<DMatrix<f64>>
where
    S : SampleSource + ?Sized
{
    check_members(source, members)?;
    let gram = members * members.transpose();
    let pinv = calc::invert(&gram, settings.pivot_tolerance)
        .ok_or(StatsError::SingularEndmembers { count : members.nrows() })? * members;
    let rows : Vec<RowDVector<f64>> = source.samples()
        .map(|x| (&pinv * x).transpose() )
        .collect();
    Ok(stack_rows(rows, members.nrows()))
}

/// Angle (radians) between every sample and every endmember spectrum; one row
/// per sample. The smallest angle of a row names the closest member.
pub fn spectral_angles<S>(source : &S, members : &DMatrix<f64>) -> Result<DMatrix<f64>>
where
    S : SampleSource + ?Sized
{
    check_members(source, members)?;
    let norms : Vec<f64> = members.row_iter().map(|m| m.norm() ).collect();
    let rows : Vec<RowDVector<f64>> = source.samples()
        .map(|x| {
            let xn = x.norm();
            RowDVector::from_iterator(members.nrows(), members.row_iter().zip(norms.iter()).map(|(m, mn)| {
                let cos = m.transpose().dot(&x) / (xn * mn);
                cos.max(-1.0).min(1.0).acos()
            }))
        })
        .collect();
    Ok(stack_rows(rows, members.nrows()))
}

fn stack_rows(rows : Vec<RowDVector<f64>>, ncols : usize) -> DMatrix<f64> {
    if rows.is_empty() {
        DMatrix::zeros(0, ncols)
    } else {
        DMatrix::from_rows(&rows[..])
    }
}

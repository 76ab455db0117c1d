use nalgebra::*;
use rayon::prelude::*;
use tracing::warn;
use crate::sample::SampleSource;
use crate::error::{StatsError, Result};

/// Streaming first and second moments of a set of band vectors: the running
/// sum Σx and the running outer-product sum Σ(x xᵗ). Accumulators over
/// disjoint parts of a sample set can be merged in any order.
#[derive(Debug, Clone)]
pub struct MomentAccumulator {
    count : usize,
    sum : DVector<f64>,
    sum_sq : DMatrix<f64>
}

impl MomentAccumulator {

    pub fn new(bands : usize) -> Self {
        Self {
            count : 0,
            sum : DVector::zeros(bands),
            sum_sq : DMatrix::zeros(bands, bands)
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn push(&mut self, x : &DVector<f64>) {
        self.count += 1;
        self.sum += x;
        self.sum_sq.ger(1.0, x, x, 1.0);
    }

    pub fn merge(mut self, other : Self) -> Self {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self
    }

    /// Returns mean = Σx / N and the unbiased covariance
    /// (Σ(x xᵗ) - Σx Σxᵗ / N) / (N - 1).
    pub fn finish(self) -> Result<(DVector<f64>, DMatrix<f64>, usize)> {
        let n = self.count;
        if n < 2 {
            return Err(StatsError::InsufficientSamples { found : n });
        }
        let nf = n as f64;
        let mean = self.sum.unscale(nf);
        let mut cov = self.sum_sq;
        cov.ger(-1.0 / nf, &self.sum, &self.sum, 1.0);
        cov.unscale_mut(nf - 1.0);

        // Σ(x xᵗ) is symmetric by construction; the correction term can
        // still leave rounding asymmetries.
        let cov = (&cov + cov.transpose()).unscale(2.0);
        Ok((mean, cov, n))
    }

}

fn check_bands<S>(source : &S, x : &DVector<f64>) -> Result<()>
where
    S : SampleSource + ?Sized
{
    if x.nrows() != source.band_count() {
        return Err(StatsError::DimensionMismatch { expected : source.band_count(), found : x.nrows() });
    }
    Ok(())
}

/// Single pass over the source, returning (mean, covariance, number of samples).
pub fn mean_cov<S>(source : &S) -> Result<(DVector<f64>, DMatrix<f64>, usize)>
where
    S : SampleSource + ?Sized
{
    let mut acc = MomentAccumulator::new(source.band_count());
    for x in source.samples() {
        check_bands(source, &x)?;
        acc.push(&x);
    }
    acc.finish()
}

/// Same result as mean_cov (up to floating-point reassociation), with the
/// accumulation spread over the rayon pool.
pub fn mean_cov_parallel<S>(source : &S) -> Result<(DVector<f64>, DMatrix<f64>, usize)>
where
    S : SampleSource + ?Sized
{
    let bands = source.band_count();
    let acc = source.samples()
        .par_bridge()
        .try_fold(
            || MomentAccumulator::new(bands),
            |mut acc, x| {
                check_bands(source, &x)?;
                acc.push(&x);
                Ok::<_, StatsError>(acc)
            }
        )
        .try_reduce(|| MomentAccumulator::new(bands), |a, b| Ok::<_, StatsError>(a.merge(b)) )?;
    acc.finish()
}

pub fn covariance<S>(source : &S) -> Result<DMatrix<f64>>
where
    S : SampleSource + ?Sized
{
    mean_cov(source).map(|(_, cov, _)| cov )
}

/// Inverts a square matrix through its LU factorization. The matrix is taken
/// as singular (returning None) when its smallest |pivot| is not larger than
/// tol * n * (largest |pivot|).
pub fn invert(m : &DMatrix<f64>, tol : f64) -> Option<DMatrix<f64>> {
    if !m.is_square() || m.nrows() == 0 {
        return None;
    }
    let lu = m.clone().lu();
    let pivots = lu.u().diagonal();
    let max_piv = pivots.amax();
    if !max_piv.is_finite() || max_piv == 0.0 || pivots.amin() <= max_piv * tol * (m.nrows() as f64) {
        return None;
    }
    lu.try_inverse()
}

/// Natural log of the determinant of a (symmetric) covariance matrix. Uses the
/// LU determinant when it is positive and finite; otherwise sums the logs of
/// the eigenvalues above n·ε·λmax, which keeps the value defined for
/// rank-deficient matrices. Eigenvalues that are positive but at or below that
/// floor count as zero and are left out, like the non-positive ones.
pub fn log_determinant(m : &DMatrix<f64>) -> f64 {
    let det = m.clone().lu().determinant();
    if det > 0.0 && det.is_finite() {
        det.ln()
    } else {
        warn!(det, dim = m.nrows(), "determinant not usable; log-determinant taken from positive eigenvalues");
        eigen_log_determinant(m)
    }
}

// Eigenvalues within rounding distance of zero count as zero.
fn eigen_log_determinant(m : &DMatrix<f64>) -> f64 {
    let eigenvalues = m.clone().symmetric_eigenvalues();
    let floor = eigenvalues.amax() * f64::EPSILON * (m.nrows().max(1) as f64);
    eigenvalues.iter()
        .filter(|l| **l > floor )
        .map(|l| l.ln() )
        .sum()
}

/// Single-pass cumulative calculations.
pub mod running {

    use num_traits::Zero;
    use std::ops::AddAssign;

    pub struct Accumulated<T> {
        pub pos : usize,
        pub val : T
    }

    pub fn cumulative_sum<T>(iter : impl Iterator<Item=T>) -> impl Iterator<Item=T>
    where
        T : AddAssign + Zero + Copy
    {
        iter.scan(T::zero(), |s, x| {
            *s += x;
            Some(*s)
        })
    }

    /// Position and value of the first partial sum for which pred holds.
    pub fn cumulative_sum_until<T, F>(iter : impl Iterator<Item=T>, pred : F) -> Option<Accumulated<T>>
    where
        T : AddAssign + Zero + Copy,
        F : Fn(T) -> bool
    {
        cumulative_sum(iter)
            .enumerate()
            .find(|(_, s)| pred(*s) )
            .map(|(pos, val)| Accumulated { pos, val })
    }

}

use nalgebra::*;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Normal, Distribution};
use std::sync::Arc;
use spectra::sample::*;
use spectra::train::*;
use spectra::feature::{dim, basis, lda, metric, unmix};
use spectra::calc;
use spectra::StatsError;

const EPS : f64 = 1E-8;

/// n samples of an isotropic unit-variance normal around `mean`.
fn normal_samples(rng : &mut StdRng, mean : &[f64], n : usize) -> MatrixSamples {
    let noise = Normal::new(0.0, 1.0).unwrap();
    let b = mean.len();
    let data = DMatrix::from_fn(n, b, |_, j| mean[j] + noise.sample(&mut *rng) );
    MatrixSamples::new(data)
}

fn normal_class(rng : &mut StdRng, index : u32, mean : &[f64], n : usize) -> TrainingClass {
    TrainingClass::new(index, normal_samples(rng, mean, n).into_shared())
}

#[test]
fn bhattacharyya_grows_with_mean_separation() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut origin = normal_class(&mut rng, 1, &[0.0, 0.0], 200);
    let mut near = normal_class(&mut rng, 2, &[1.0, 1.0], 200);
    let mut far = normal_class(&mut rng, 3, &[10.0, 10.0], 200);
    for cl in [&mut origin, &mut near, &mut far].iter_mut() {
        cl.calc_statistics().unwrap();
    }
    let d_near = metric::bhattacharyya_distance(&origin, &near).unwrap();
    let d_far = metric::b_distance(&origin, &far).unwrap();
    assert!(d_near > 0.0);
    assert!(d_far > d_near);

    // Mahalanobis term dominates: (1/8) * 200 for unit covariances.
    let terms = metric::b_distance_terms(&origin, &far).unwrap();
    assert!(terms.linear > 15.0 && terms.linear < 35.0);
    assert!(terms.quadratic.abs() < 0.1);

    let d_self = metric::bhattacharyya_distance(&origin, &origin).unwrap();
    assert!(d_self.abs() < EPS);

    let sym = metric::bhattacharyya_distance(&far, &origin).unwrap();
    assert!((sym - d_far).abs() < EPS);
}

#[test]
fn distance_requires_statistics() {
    let mut rng = StdRng::seed_from_u64(2);
    let a = normal_class(&mut rng, 1, &[0.0, 0.0], 20);
    let mut b = normal_class(&mut rng, 2, &[0.0, 0.0], 20);
    b.calc_statistics().unwrap();
    assert_eq!(metric::bhattacharyya_distance(&a, &b).unwrap_err(), StatsError::StatisticsUnavailable(1));

    let mut set = TrainingClassSet::new();
    set.add_class(a).unwrap();
    set.add_class(b).unwrap();
    assert!(set.bhattacharyya_distance(1, 2).unwrap() >= 0.0);
    assert_eq!(set.bhattacharyya_distance(1, 9).unwrap_err(), StatsError::UnknownClass(9));
}

#[test]
fn discriminant_whitens_within_class_covariance() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut set = TrainingClassSet::new();
    set.add_class(normal_class(&mut rng, 1, &[0.0, 0.0, 0.0, 0.0], 100)).unwrap();
    set.add_class(normal_class(&mut rng, 2, &[4.0, 0.0, 1.0, 0.0], 100)).unwrap();
    set.add_class(normal_class(&mut rng, 3, &[0.0, 4.0, 0.0, -1.0], 100)).unwrap();
    let lda = lda::linear_discriminant(&mut set).unwrap();
    assert_eq!(lda.eigen.len(), 2);
    assert_eq!(lda.transform().shape(), (2, 4));
    assert!(lda.eigen.eigenvalues[0] >= lda.eigen.eigenvalues[1]);
    assert!(lda.eigen.eigenvalues[1] > 0.0);

    let v = lda.transform();
    let white = v * &lda.cov_w * v.transpose();
    assert!((white - DMatrix::<f64>::identity(2, 2)).amax() < 1E-6);

    // Each axis solves Cb v = λ Cw v.
    for i in 0..2 {
        let vi : DVector<f64> = v.row(i).transpose();
        let lhs = &lda.cov_b * &vi;
        let rhs = &lda.cov_w * &vi * lda.eigen.eigenvalues[i];
        assert!((lhs - rhs).amax() < 1E-6);
    }
}

#[test]
fn discriminant_needs_two_classes() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut set = TrainingClassSet::new();
    assert_eq!(lda::linear_discriminant(&mut set).unwrap_err(), StatsError::InsufficientClasses { found : 0 });
    set.add_class(normal_class(&mut rng, 1, &[0.0, 0.0], 10)).unwrap();
    assert_eq!(lda::linear_discriminant(&mut set).unwrap_err(), StatsError::InsufficientClasses { found : 1 });
}

#[test]
fn training_classes_from_label_map() {
    let image = Arc::new(Image::from_fn(2, 2, 2, |r, c| vec![(r + c) as f64, (2 * r) as f64 - c as f64] ).unwrap());
    let labels = Arc::new(LabelMap::new(2, 2, vec![0, 1, 1, 2]).unwrap());
    let set = create_training_classes(image, labels, false, None).unwrap();
    assert_eq!(set.indices().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(set.num_bands(), Some(2));
    assert!(set.iter().all(|cl| !cl.stats_valid() ));
}

#[test]
fn transformed_class_statistics_are_consistent() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut set = TrainingClassSet::new();
    set.add_class(normal_class(&mut rng, 1, &[0.0, 1.0, 2.0], 50)).unwrap();
    set.add_class(normal_class(&mut rng, 2, &[3.0, 1.0, 0.0], 50)).unwrap();
    set.calc_statistics().unwrap();

    let x = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 1.0, 0.0, 2.0, -1.0]);
    let before = set.get(1).unwrap().stats().unwrap().clone();
    set.transform(&x).unwrap();
    assert_eq!(set.num_bands(), Some(2));

    let cl = set.get_mut(1).unwrap();
    let stats = cl.stats().unwrap().clone();
    assert_eq!(stats.num_bands(), 2);
    assert!((stats.mean() - &x * before.mean()).amax() < EPS);
    assert!((stats.cov() - &x * before.cov() * x.transpose()).amax() < EPS);
    assert!((stats.inv_cov() * stats.cov() - DMatrix::<f64>::identity(2, 2)).amax() < 1E-6);
    let log_det = calc::log_determinant(stats.cov());
    assert!((log_det - stats.log_det_cov()).abs() < 1E-6);

    // Statistics recomputed from the transformed samples agree with the transformed ones.
    let recomputed = cl.calc_statistics().unwrap().clone();
    assert!((recomputed.mean() - stats.mean()).amax() < 1E-6);
    assert!((recomputed.cov() - stats.cov()).amax() < 1E-6);

    // Wrong number of columns leaves the set untouched.
    assert!(set.transform(&DMatrix::zeros(2, 3)).is_err());
    assert_eq!(set.num_bands(), Some(2));
}

#[test]
fn principal_components_capture_dominant_axis() {
    let mut rng = StdRng::seed_from_u64(6);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let data = DMatrix::from_fn(500, 3, |_, j| {
        let scale = [10.0, 1.0, 0.1][j];
        scale * noise.sample(&mut rng)
    });
    let src = MatrixSamples::new(data);
    let pc = dim::principal_components(&src).unwrap();
    let sorted = pc.eigen.sorted_descending();
    assert_eq!(sorted.len(), 3);
    assert!(sorted.eigenvalues[0] > sorted.eigenvalues[1] && sorted.eigenvalues[1] > sorted.eigenvalues[2]);
    assert!(sorted.eigenvectors[(0, 0)].abs() > 0.99);
    for row in sorted.eigenvectors.row_iter() {
        assert!((row.norm() - 1.0).abs() < EPS);
    }

    let reduced = sorted.reduce(0.95).unwrap();
    assert_eq!(reduced.len(), 1);
    let all = sorted.reduce(1.0).unwrap();
    assert_eq!(all.len(), 3);
    assert!(sorted.reduce(0.0).is_err());
}

#[test]
fn orthogonalized_vectors_form_orthonormal_basis() {
    let vecs = DMatrix::from_row_slice(3, 4, &[
        1.0, 1.0, 0.0, 0.0,
        1.0, 0.0, 1.0, 0.0,
        0.0, 1.0, 1.0, 1.0
    ]);
    let q = basis::orthogonalize(&vecs, 0).unwrap();
    assert!((&q * q.transpose() - DMatrix::<f64>::identity(3, 3)).amax() < EPS);

    // First row keeps its direction.
    let first = vecs.row(0).unscale(vecs.row(0).norm());
    assert!((q.row(0) - first).amax() < EPS);

    let dependent = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
    assert_eq!(basis::orthogonalize(&dependent, 0).unwrap_err(), StatsError::LinearlyDependent { index : 1 });
}

#[test]
fn unmixing_recovers_abundances() {
    let members = DMatrix::from_row_slice(2, 4, &[1.0, 0.5, 0.0, 0.2, 0.0, 0.5, 1.0, 0.8]);
    let fractions = [(0.2, 0.8), (0.5, 0.5), (1.0, 0.0)];
    let rows : Vec<Vec<f64>> = fractions.iter()
        .map(|(a, b)| (0..4).map(|j| a * members[(0, j)] + b * members[(1, j)] ).collect() )
        .collect();
    let src = MatrixSamples::from_rows(&rows).unwrap();
    let ab = unmix::unmix(&src, &members).unwrap();
    assert_eq!(ab.shape(), (3, 2));
    for (i, (a, b)) in fractions.iter().enumerate() {
        assert!((ab[(i, 0)] - a).abs() < EPS && (ab[(i, 1)] - b).abs() < EPS);
    }
    let angles = unmix::spectral_angles(&src, &members).unwrap();
    assert!(angles[(2, 0)].abs() < 1E-6);
    assert!(angles[(2, 1)] > angles[(2, 0)]);
}

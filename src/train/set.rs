use nalgebra::*;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use super::TrainingClass;
use crate::error::{StatsError, Result};
use crate::feature::metric;
use crate::sample::{SampleSource, Image, LabelMap, MaskedSamples, Selection};
use crate::settings::AnalysisSettings;

/// Collection of training classes keyed by their (non-zero, unique) index.
/// All classes share the same number of bands, fixed by the first class added.
#[derive(Debug, Clone, Default)]
pub struct TrainingClassSet {
    classes : BTreeMap<u32, TrainingClass>,
    num_bands : Option<usize>
}

impl TrainingClassSet {

    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn num_bands(&self) -> Option<usize> {
        self.num_bands
    }

    pub fn get(&self, index : u32) -> Option<&TrainingClass> {
        self.classes.get(&index)
    }

    pub fn get_mut(&mut self, index : u32) -> Option<&mut TrainingClass> {
        self.classes.get_mut(&index)
    }

    pub fn indices<'a>(&'a self) -> impl Iterator<Item=u32> + 'a {
        self.classes.keys().cloned()
    }

    /// Classes in ascending index order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item=&'a TrainingClass> + 'a {
        self.classes.values()
    }

    pub fn iter_mut<'a>(&'a mut self) -> impl Iterator<Item=&'a mut TrainingClass> + 'a {
        self.classes.values_mut()
    }

    /// Adds a class to the set. The set is left unchanged if the class index
    /// is 0, is already taken, or the class band count differs from the set's.
    pub fn add_class(&mut self, cl : TrainingClass) -> Result<()> {
        if cl.index() == 0 {
            return Err(StatsError::ReservedIndex);
        }
        if self.classes.contains_key(&cl.index()) {
            return Err(StatsError::DuplicateIndex(cl.index()));
        }
        match self.num_bands {
            Some(b) if b != cl.num_bands() => {
                return Err(StatsError::DimensionMismatch { expected : b, found : cl.num_bands() });
            },
            Some(_) => { },
            None => {
                self.num_bands = Some(cl.num_bands());
            }
        }
        self.classes.insert(cl.index(), cl);
        Ok(())
    }

    pub fn calc_statistics(&mut self) -> Result<()> {
        self.calc_statistics_with(&AnalysisSettings::default())
    }

    /// Recomputes the statistics of every class; distinct classes are processed
    /// concurrently when settings.parallel is set.
    pub fn calc_statistics_with(&mut self, settings : &AnalysisSettings) -> Result<()> {
        if settings.parallel {
            self.classes.par_iter_mut()
                .try_for_each(|(_, cl)| cl.calc_statistics_with(settings).map(|_| () ))
        } else {
            self.classes.values_mut()
                .try_for_each(|cl| cl.calc_statistics_with(settings).map(|_| () ))
        }
    }

    /// Computes statistics for the classes that lack valid ones.
    pub fn ensure_statistics_with(&mut self, settings : &AnalysisSettings) -> Result<()> {
        let run = |cl : &mut TrainingClass| cl.ensure_statistics_with(settings).map(|_| () );
        if settings.parallel {
            self.classes.par_iter_mut().try_for_each(|(_, cl)| run(cl) )
        } else {
            self.classes.values_mut().try_for_each(run)
        }
    }

    pub fn transform(&mut self, x : &DMatrix<f64>) -> Result<()> {
        self.transform_with(x, &AnalysisSettings::default())
    }

    /// Applies the C x B linear transform x to all classes; afterwards every
    /// class (and the set) has C bands. If any class cannot be transformed the
    /// whole set is left as it was. An empty set keeps its band count open.
    pub fn transform_with(&mut self, x : &DMatrix<f64>, settings : &AnalysisSettings) -> Result<()> {
        if let Some(b) = self.num_bands {
            if x.ncols() != b {
                return Err(StatsError::DimensionMismatch { expected : b, found : x.ncols() });
            }
        }
        let mut prepared = Vec::with_capacity(self.classes.len());
        for (ix, cl) in self.classes.iter() {
            prepared.push((*ix, cl.prepare_transform(x, settings)?));
        }
        for (ix, (stats, source)) in prepared {
            if let Some(cl) = self.classes.get_mut(&ix) {
                cl.commit_transform(stats, source);
            }
        }
        if !self.classes.is_empty() {
            self.num_bands = Some(x.nrows());
        }
        debug!(classes = self.classes.len(), bands = x.nrows(), "training set transformed");
        Ok(())
    }

    /// Total number of samples over all classes.
    pub fn total_size(&self) -> usize {
        self.classes.values().map(|cl| cl.size() ).sum()
    }

    /// A source yielding the samples of every class in the set.
    pub fn all_samples<'a>(&'a self) -> SetSamples<'a> {
        SetSamples { set : self }
    }

    /// Bhattacharyya distance between two classes of the set, computing their
    /// statistics first if needed.
    pub fn bhattacharyya_distance(&mut self, a : u32, b : u32) -> Result<f64> {
        self.bhattacharyya_distance_with(a, b, &AnalysisSettings::default())
    }

    pub fn bhattacharyya_distance_with(&mut self, a : u32, b : u32, settings : &AnalysisSettings) -> Result<f64> {
        for ix in [a, b].iter() {
            self.classes.get_mut(ix)
                .ok_or(StatsError::UnknownClass(*ix))?
                .ensure_statistics_with(settings)?;
        }
        let (ca, cb) = (self.class_ref(a)?, self.class_ref(b)?);
        metric::bhattacharyya_distance_with(ca, cb, settings)
    }

    fn class_ref(&self, index : u32) -> Result<&TrainingClass> {
        self.classes.get(&index).ok_or(StatsError::UnknownClass(index))
    }

}

/// Samples of all classes of a training set, class after class.
#[derive(Debug, Clone, Copy)]
pub struct SetSamples<'a> {
    set : &'a TrainingClassSet
}

impl<'a> SampleSource for SetSamples<'a> {

    fn sample_count(&self) -> usize {
        self.set.total_size()
    }

    fn band_count(&self) -> usize {
        self.set.num_bands.unwrap_or(0)
    }

    fn samples<'b>(&'b self) -> Box<dyn Iterator<Item=DVector<f64>> + Send + 'b> {
        Box::new(self.set.classes.values().flat_map(|cl| cl.source().samples() ))
    }

}

/// Builds a training set from a label map over an image: one class per
/// distinct non-zero label (restricted to `indices`, when informed). Label 0
/// marks unlabeled pixels and never becomes a class.
pub fn create_training_classes(
    image : Arc<Image>,
    labels : Arc<LabelMap>,
    calc_stats : bool,
    indices : Option<&[u32]>
) -> Result<TrainingClassSet> {
    let mut set = TrainingClassSet::new();
    for label in labels.distinct() {
        if label == 0 {
            continue;
        }
        if let Some(allowed) = indices {
            if !allowed.contains(&label) {
                continue;
            }
        }
        let source = MaskedSamples::new(image.clone(), labels.clone(), Selection::Index(label))?;
        set.add_class(TrainingClass::new(label, Arc::new(source)))?;
    }
    if calc_stats {
        set.calc_statistics()?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::sample::MatrixSamples;

    fn matrix_class(index : u32, rows : &[Vec<f64>]) -> TrainingClass {
        TrainingClass::new(index, MatrixSamples::from_rows(rows).unwrap().into_shared())
    }

    #[test]
    fn duplicate_index_leaves_set_unchanged() {
        let mut set = TrainingClassSet::new();
        set.add_class(matrix_class(1, &[vec![0.0, 1.0], vec![1.0, 0.0]])).unwrap();
        let dup = matrix_class(1, &[vec![5.0, 5.0], vec![6.0, 7.0], vec![1.0, 1.0]]);
        assert_eq!(set.add_class(dup).unwrap_err(), StatsError::DuplicateIndex(1));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(1).unwrap().size(), 2);
        assert_eq!(set.add_class(matrix_class(0, &[vec![0.0, 0.0]])).unwrap_err(), StatsError::ReservedIndex);
        assert!(set.add_class(matrix_class(3, &[vec![0.0, 0.0, 1.0]])).is_err());
        assert_eq!(set.num_bands(), Some(2));
    }

    #[test]
    fn label_zero_never_becomes_a_class() {
        let image = Arc::new(Image::new(2, 2, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap());
        let labels = Arc::new(LabelMap::new(2, 2, vec![0, 1, 1, 2]).unwrap());
        let set = create_training_classes(image.clone(), labels.clone(), false, None).unwrap();
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(set.get(1).unwrap().size(), 2);
        assert_eq!(set.get(2).unwrap().size(), 1);
        assert_eq!(set.total_size(), 3);
        assert_eq!(set.all_samples().samples().count(), 3);

        let only_two = create_training_classes(image, labels, false, Some(&[2, 7])).unwrap();
        assert_eq!(only_two.indices().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn transform_is_all_or_nothing() {
        let mut set = TrainingClassSet::new();
        set.add_class(matrix_class(1, &[vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 2.0], vec![1.0, 3.0]])).unwrap();

        // Collinear samples: the class statistics cannot be derived.
        set.add_class(matrix_class(2, &[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]])).unwrap();
        let before = set.get_mut(1).unwrap().calc_statistics().unwrap().clone();

        let x = DMatrix::from_row_slice(1, 2, &[1.0, -1.0]);
        assert_eq!(set.transform(&x).unwrap_err(), StatsError::SingularCovariance { dim : 2 });
        assert_eq!(set.num_bands(), Some(2));
        let first = set.get(1).unwrap();
        assert_eq!(first.num_bands(), 2);
        assert_eq!(first.stats().unwrap(), &before);
        assert_eq!(first.source().band_count(), 2);
        assert!(!set.get(2).unwrap().stats_valid());
    }

    #[test]
    fn empty_set_transform_leaves_bands_open() {
        let mut set = TrainingClassSet::new();
        set.transform(&DMatrix::identity(3, 4)).unwrap();
        assert_eq!(set.num_bands(), None);
        set.add_class(matrix_class(1, &[vec![0.0, 1.0], vec![1.0, 0.0]])).unwrap();
        assert_eq!(set.num_bands(), Some(2));
    }

}

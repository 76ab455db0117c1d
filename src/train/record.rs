use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use super::{TrainingClass, GaussianStats};
use crate::error::{StatsError, Result};
use crate::sample::{SampleSource, LabelMap, Selection};

/// Selection data of a persisted class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskRecord {
    pub labels : LabelMap,
    pub selection : Selection
}

/// Persisted form of a training class. The image data itself is not stored:
/// `source_id` names it, and the caller resolves that name back to a live
/// sample source before calling TrainingClass::from_record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingClassRecord {
    pub source_id : String,
    pub index : u32,
    pub num_samples : usize,
    pub class_prob : f64,
    pub mask : Option<MaskRecord>,
    pub mean : DVector<f64>,
    pub cov : DMatrix<f64>,
    pub inv_cov : DMatrix<f64>,
    pub log_det_cov : f64
}

impl TrainingClassRecord {

    pub fn load_from_path<P>(path : P) -> std::result::Result<Self, anyhow::Error>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(mut reader : R) -> std::result::Result<Self, anyhow::Error>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let rec : Self = serde_json::from_str(&content[..])?;
        Ok(rec)
    }

    pub fn save_to_path<P>(&self, path : P) -> std::result::Result<(), anyhow::Error>
    where
        P : AsRef<Path>
    {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        self.save(file)
    }

    pub fn save<W>(&self, mut writer : W) -> std::result::Result<(), anyhow::Error>
    where
        W : Write
    {
        let content = serde_json::to_string_pretty(&self)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

}

impl TrainingClass {

    /// Captures the class (computing its statistics if needed) in its persisted form.
    pub fn to_record(&mut self, source_id : &str) -> Result<TrainingClassRecord> {
        let stats = self.ensure_statistics()?.clone();
        let mask = self.source().mask()
            .map(|(labels, selection)| MaskRecord { labels : labels.clone(), selection });
        Ok(TrainingClassRecord {
            source_id : source_id.to_string(),
            index : self.index(),
            num_samples : stats.num_samples(),
            class_prob : self.class_prob(),
            mask,
            mean : stats.mean().clone(),
            cov : stats.cov().clone(),
            inv_cov : stats.inv_cov().clone(),
            log_det_cov : stats.log_det_cov()
        })
    }

    /// Restores a persisted class over the live source its source_id refers to.
    /// The stored statistics are taken as valid; they are not recomputed.
    pub fn from_record(rec : TrainingClassRecord, source : Arc<dyn SampleSource>) -> Result<Self> {
        let b = rec.mean.nrows();
        for found in [source.band_count(), rec.cov.nrows(), rec.cov.ncols(), rec.inv_cov.nrows(), rec.inv_cov.ncols()].iter() {
            if *found != b {
                return Err(StatsError::DimensionMismatch { expected : b, found : *found });
            }
        }
        let stats = GaussianStats {
            mean : rec.mean,
            cov : rec.cov,
            inv_cov : rec.inv_cov,
            log_det_cov : rec.log_det_cov,
            num_samples : rec.num_samples
        };
        Ok(TrainingClass::from_parts(rec.index, rec.class_prob, source, stats))
    }

}

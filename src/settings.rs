use serde::{Serialize, Deserialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Tunables shared by the statistics routines. Deserialized from JSON; any
/// field left out takes its default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {

    /// Fraction of total variance kept when truncating eigenvectors.
    pub retained_fraction : f64,

    /// Smallest |pivot| / max |pivot| ratio (per dimension) of an LU
    /// factorization still considered invertible.
    pub pivot_tolerance : f64,

    /// Compute statistics of distinct classes on the rayon pool.
    pub parallel : bool

}

impl Default for AnalysisSettings {

    fn default() -> Self {
        Self {
            retained_fraction : 0.99,
            pivot_tolerance : f64::EPSILON,
            parallel : true
        }
    }

}

impl AnalysisSettings {

    pub fn load_from_path<P>(path : P) -> Result<Self, anyhow::Error>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(mut reader : R) -> Result<Self, anyhow::Error>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let settings : Self = serde_json::from_str(&content[..])?;
        if !(settings.retained_fraction > 0.0 && settings.retained_fraction <= 1.0) {
            return Err(anyhow::Error::msg("retained_fraction must lie in (0, 1]"));
        }
        if settings.pivot_tolerance < 0.0 {
            return Err(anyhow::Error::msg("pivot_tolerance must be non-negative"));
        }
        Ok(settings)
    }

}

#[test]
fn partial_settings_take_defaults() {
    let s = AnalysisSettings::load(r#"{ "parallel" : false }"#.as_bytes()).unwrap();
    assert!(!s.parallel);
    assert_eq!(s.retained_fraction, 0.99);
    assert!(AnalysisSettings::load(r#"{ "retained_fraction" : 1.5 }"#.as_bytes()).is_err());
}

//! Configuration snapshots for report reproducibility.
//!
//! A snapshot pins the exact configuration a report was computed with. It
//! carries no wall-clock time so identical runs serialize identically.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::{AnalysisConfig, CohortGranularity};
use crate::resolve::ConfigSource;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Schema version of the configuration.
    pub schema_version: String,

    /// Where the configuration was loaded from.
    pub source: String,

    /// SHA-256 of the canonical JSON form of the configuration.
    pub config_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub registration_field: String,
    pub target_field: String,
    pub granularity: CohortGranularity,
    pub require_target: bool,
    pub windows: Vec<String>,
    pub histograms: Vec<String>,
    pub period_count: usize,
    pub period_metrics: Vec<String>,
    pub distribution_buckets: usize,
}

impl ConfigSnapshot {
    /// Create a snapshot of `config` loaded from `source`.
    pub fn new(config: &AnalysisConfig, source: &ConfigSource) -> Self {
        let canonical = serde_json::to_string(config).unwrap_or_default();
        let periods = config.periods.as_ref();

        ConfigSnapshot {
            schema_version: config.schema_version.clone(),
            source: source.to_string(),
            config_hash: hash_content(&canonical),
            summary: ConfigSummary {
                registration_field: config.fields.registration.clone(),
                target_field: config.fields.target.clone(),
                granularity: config.cohort.granularity,
                require_target: config.cohort.require_target,
                windows: config.windows.iter().map(|w| w.label.clone()).collect(),
                histograms: config.histograms.iter().map(|h| h.label.clone()).collect(),
                period_count: periods.map_or(0, |p| p.ranges.len()),
                period_metrics: periods.map(|p| p.metrics.clone()).unwrap_or_default(),
                distribution_buckets: config.distribution.len(),
            },
        }
    }

    /// Check if this snapshot matches another (same config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{get_preset, PresetName};

    #[test]
    fn test_snapshot_is_stable() {
        let cfg = get_preset(PresetName::Conversion);
        let s1 = ConfigSnapshot::new(&cfg, &ConfigSource::BuiltinPreset);
        let s2 = ConfigSnapshot::new(&cfg, &ConfigSource::BuiltinPreset);
        assert_eq!(s1, s2);
        assert!(s1.matches(&s2));
    }

    #[test]
    fn test_snapshot_detects_changes() {
        let cfg = get_preset(PresetName::Conversion);
        let mut changed = cfg.clone();
        changed.windows[0].bound = 6.0;
        let a = ConfigSnapshot::new(&cfg, &ConfigSource::BuiltinPreset);
        let b = ConfigSnapshot::new(&changed, &ConfigSource::BuiltinPreset);
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_snapshot_summary() {
        let cfg = get_preset(PresetName::Conversion);
        let s = ConfigSnapshot::new(&cfg, &ConfigSource::BuiltinPreset);
        assert_eq!(s.summary.windows.len(), 6);
        assert_eq!(s.summary.period_count, 11);
        assert_eq!(s.summary.period_metrics, vec!["D7", "D14", "D30"]);
        assert_eq!(s.short_id().len(), 12);
        assert_eq!(s.config_hash.len(), 64);
    }
}

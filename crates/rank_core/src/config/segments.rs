//! Segment table: per-segment probability bands, field-size tables,
//! protection constants and point bands.
//!
//! The built-in table is embedded at compile time and parsed once.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RankError, RankResult};
use crate::models::ScoreThreshold;
use crate::segment::SegmentName;

/// Built-in segment table YAML (embedded at compile time)
pub const SEGMENTS_YAML: &str = include_str!("../../data/segments.yaml");

static DEFAULT_TABLE: OnceLock<SegmentTable> = OnceLock::new();

/// Protection constants carried into every player's protection record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionConstants {
    pub protection_threshold: u32,
    pub demotion_grace_period: u32,
    pub promotion_stability_period: u32,
}

/// Inclusive cumulative-score range; `max == None` means open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBand {
    pub min: i64,
    #[serde(default)]
    pub max: Option<i64>,
}

impl PointBand {
    pub fn contains(&self, points: i64) -> bool {
        points >= self.min && self.max.map_or(true, |max| points <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub segment: SegmentName,
    pub learning_rate: f64,
    pub max_rank: usize,
    pub thresholds: Vec<ScoreThreshold>,
    #[serde(default)]
    pub field_tables: BTreeMap<usize, Vec<f64>>,
    pub protection: ProtectionConstants,
    pub band: PointBand,
    #[serde(default)]
    pub inactivity_max_penalty: i64,
}

impl SegmentProfile {
    /// Distribution of the highest-priority band
    pub fn base_distribution(&self) -> Vec<f64> {
        self.thresholds
            .iter()
            .max_by_key(|t| t.priority)
            .map(|t| t.ranking_probabilities.clone())
            .unwrap_or_else(|| vec![1.0 / self.max_rank.max(1) as f64; self.max_rank])
    }

    fn validate(&self) -> RankResult<()> {
        if self.max_rank == 0 {
            return Err(RankError::Configuration(format!("{}: max_rank must be > 0", self.segment)));
        }
        if self.thresholds.is_empty() {
            return Err(RankError::Configuration(format!("{}: no score thresholds", self.segment)));
        }
        for threshold in &self.thresholds {
            threshold.validate(self.max_rank).map_err(|e| {
                RankError::Configuration(format!("{}: {}", self.segment, e))
            })?;
        }
        for (field_size, probs) in &self.field_tables {
            if probs.len() != *field_size {
                return Err(RankError::Configuration(format!(
                    "{}: field table {} has {} entries",
                    self.segment,
                    field_size,
                    probs.len()
                )));
            }
            if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(RankError::Configuration(format!(
                    "{}: field table {} has negative weights",
                    self.segment, field_size
                )));
            }
        }
        if let Some(max) = self.band.max {
            if max < self.band.min {
                return Err(RankError::Configuration(format!(
                    "{}: band max {} below min {}",
                    self.segment, max, self.band.min
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTable {
    pub segments: Vec<SegmentProfile>,
}

impl Default for SegmentTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl SegmentTable {
    /// Built-in table, parsed on first use.
    ///
    /// Falls back to an empty table (and logs) if the embedded YAML is
    /// broken; `validate()` rejects such a table.
    pub fn builtin() -> &'static SegmentTable {
        DEFAULT_TABLE.get_or_init(|| match Self::from_yaml_str(SEGMENTS_YAML) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "embedded segment table failed to parse");
                SegmentTable { segments: Vec::new() }
            }
        })
    }

    pub fn from_yaml_str(yaml: &str) -> RankResult<Self> {
        let table: SegmentTable = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    pub fn get(&self, segment: SegmentName) -> RankResult<&SegmentProfile> {
        self.segments.iter().find(|p| p.segment == segment).ok_or_else(|| {
            RankError::Configuration(format!("No configuration for segment {}", segment))
        })
    }

    /// Segment whose band contains `points`. Negative totals map to the lowest band.
    pub fn segment_for_points(&self, points: i64) -> SegmentName {
        let mut ordered: Vec<&SegmentProfile> = self.segments.iter().collect();
        ordered.sort_by_key(|p| p.segment);
        ordered
            .iter()
            .rev()
            .find(|p| points >= p.band.min)
            .or_else(|| ordered.first())
            .map(|p| p.segment)
            .unwrap_or_default()
    }

    pub fn validate(&self) -> RankResult<()> {
        for segment in SegmentName::ALL {
            let profile = self.get(segment)?;
            profile.validate()?;
        }

        // bands must ascend with the tier and must not overlap
        let mut previous: Option<&SegmentProfile> = None;
        for segment in SegmentName::ALL {
            let profile = self.get(segment)?;
            if let Some(prev) = previous {
                let prev_max = prev.band.max.ok_or_else(|| {
                    RankError::Configuration(format!("{}: only the top band may be open", prev.segment))
                })?;
                if profile.band.min <= prev_max {
                    return Err(RankError::Configuration(format!(
                        "{} band overlaps {}",
                        profile.segment, prev.segment
                    )));
                }
            }
            previous = Some(profile);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = SegmentTable::builtin();
        assert_eq!(table.segments.len(), 6);
        table.validate().unwrap();
    }

    #[test]
    fn test_base_distribution_uses_highest_priority() {
        let gold = SegmentTable::builtin().get(SegmentName::Gold).unwrap();
        assert_eq!(gold.base_distribution(), vec![0.35, 0.30, 0.20, 0.15]);
        assert!((gold.learning_rate - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_segment_for_points() {
        let table = SegmentTable::builtin();
        assert_eq!(table.segment_for_points(-40), SegmentName::Bronze);
        assert_eq!(table.segment_for_points(999), SegmentName::Bronze);
        assert_eq!(table.segment_for_points(1000), SegmentName::Silver);
        assert_eq!(table.segment_for_points(4999), SegmentName::Gold);
        assert_eq!(table.segment_for_points(19_999), SegmentName::Diamond);
        assert_eq!(table.segment_for_points(250_000), SegmentName::Master);
    }

    #[test]
    fn test_field_tables_loaded() {
        let bronze = SegmentTable::builtin().get(SegmentName::Bronze).unwrap();
        assert_eq!(bronze.field_tables.get(&6).map(|v| v.len()), Some(6));
        assert!(bronze.field_tables.get(&5).is_none());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let yaml = SEGMENTS_YAML.replacen("[0.15, 0.25, 0.35, 0.25]", "[0.15, 0.25, 0.35]", 1);
        let err = SegmentTable::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, RankError::Configuration(_)), "got {:?}", err);
    }

    #[test]
    fn test_rejects_overlapping_bands() {
        let yaml = SEGMENTS_YAML.replacen("band: { min: 1000, max: 2499 }", "band: { min: 900, max: 2499 }", 1);
        assert!(SegmentTable::from_yaml_str(&yaml).is_err());
    }
}

//! Rank-probability lookup keyed by segment, score and field size

use tracing::debug;

use crate::config::{FieldSizePolicy, SegmentTable};
use crate::error::{RankError, RankResult};
use crate::models::threshold::select_band;
use crate::models::PlayerScoreThresholdConfig;
use crate::segment::SegmentName;

#[derive(Debug, Clone)]
pub struct ProbabilityTable {
    segments: SegmentTable,
    policy: FieldSizePolicy,
}

impl Default for ProbabilityTable {
    fn default() -> Self {
        Self::new(SegmentTable::default(), FieldSizePolicy::Interpolate)
    }
}

impl ProbabilityTable {
    pub fn new(segments: SegmentTable, policy: FieldSizePolicy) -> Self {
        Self { segments, policy }
    }

    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    /// Distribution for a segment's default configuration.
    ///
    /// Highest-priority band containing `score`, else the base distribution.
    pub fn lookup(&self, segment: SegmentName, score: f64) -> RankResult<Vec<f64>> {
        let profile = self.segments.get(segment)?;
        let hit = select_band(&profile.thresholds, score).map(|t| t.ranking_probabilities.clone());
        Ok(hit.unwrap_or_else(|| profile.base_distribution()))
    }

    /// Same lookup against a player's own configuration. In adaptive
    /// mode the score is scaled by `1 + learning_rate` first.
    pub fn lookup_player(&self, config: &PlayerScoreThresholdConfig, score: f64) -> Vec<f64> {
        let effective = effective_score(config, score);
        match config.matching_threshold(effective) {
            Some(threshold) => threshold.ranking_probabilities.clone(),
            None => config.base_ranking_probability.clone(),
        }
    }

    /// Distribution for a field of `field_size` participants.
    ///
    /// Resolution order: the player's banded table when the field matches
    /// `max_rank`, the segment's fixed table for that field size, then the
    /// banded table resized by the configured policy.
    pub fn lookup_for_field(
        &self,
        config: &PlayerScoreThresholdConfig,
        score: f64,
        field_size: usize,
    ) -> RankResult<Vec<f64>> {
        if field_size == 0 {
            return Err(RankError::Validation("field size must be at least 1".into()));
        }
        if field_size == config.max_rank {
            return Ok(self.lookup_player(config, score));
        }
        if let Ok(profile) = self.segments.get(config.segment_name) {
            if let Some(fixed) = profile.field_tables.get(&field_size) {
                return Ok(fixed.clone());
            }
        }

        let banded = self.lookup_player(config, score);
        debug!(
            uid = %config.uid,
            from = banded.len(),
            to = field_size,
            policy = ?self.policy,
            "resizing rank distribution"
        );
        Ok(resize_distribution(&banded, field_size, self.policy))
    }
}

pub fn effective_score(config: &PlayerScoreThresholdConfig, score: f64) -> f64 {
    if config.adaptive_mode {
        score * (1.0 + config.learning_rate)
    } else {
        score
    }
}

/// Reshape `probs` to `len` entries and renormalize to sum 1.
pub fn resize_distribution(probs: &[f64], len: usize, policy: FieldSizePolicy) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    let src: Vec<f64> = probs.iter().map(|p| if p.is_finite() { p.max(0.0) } else { 0.0 }).collect();

    let resized = if src.is_empty() {
        vec![1.0; len]
    } else if src.len() == len {
        src
    } else {
        match policy {
            FieldSizePolicy::Interpolate => interpolate(&src, len),
            FieldSizePolicy::PadTruncate => {
                let mut out: Vec<f64> = src.iter().copied().take(len).collect();
                out.resize(len, 0.0);
                out
            }
        }
    };
    normalize(resized)
}

fn interpolate(src: &[f64], len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    if src.len() == 1 {
        return vec![src[0]; len];
    }
    let span = (src.len() - 1) as f64;
    (0..len)
        .map(|i| {
            let pos = i as f64 * span / (len - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(src.len() - 1);
            let frac = pos - lo as f64;
            src[lo] * (1.0 - frac) + src[hi] * frac
        })
        .collect()
}

fn normalize(mut values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        let uniform = 1.0 / values.len() as f64;
        values.iter_mut().for_each(|v| *v = uniform);
    } else {
        values.iter_mut().for_each(|v| *v /= total);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config_for(segment: SegmentName) -> PlayerScoreThresholdConfig {
        let profile = SegmentTable::builtin().get(segment).unwrap();
        let mut config = PlayerScoreThresholdConfig::from_segment("p1", profile, Utc::now());
        config.adaptive_mode = false;
        config
    }

    #[test]
    fn test_lookup_band_and_fallback() {
        let table = ProbabilityTable::default();
        assert_eq!(table.lookup(SegmentName::Bronze, 500.0).unwrap(), vec![0.15, 0.25, 0.35, 0.25]);
        assert_eq!(table.lookup(SegmentName::Bronze, 2500.0).unwrap(), vec![0.25, 0.35, 0.25, 0.15]);
        // above every band → top band
        assert_eq!(table.lookup(SegmentName::Master, 99_999.0).unwrap(), vec![0.50, 0.30, 0.15, 0.05]);
        // below every band → base (highest priority band)
        assert_eq!(table.lookup(SegmentName::Bronze, -5.0).unwrap(), vec![0.25, 0.35, 0.25, 0.15]);
    }

    #[test]
    fn test_adaptive_score_just_past_band_edge() {
        let table = ProbabilityTable::default();
        let mut config = config_for(SegmentName::Bronze);
        config.adaptive_mode = true;
        // 952 * 1.05 = 999.6 is inside the first band, 953 * 1.05 = 1000.65
        // falls between the first two bands
        let first = vec![0.15, 0.25, 0.35, 0.25];
        assert_eq!(table.lookup_player(&config, 952.0), first);
        assert_eq!(table.lookup_player(&config, 953.0), first);
        assert_eq!(table.lookup_player(&config, 960.0), vec![0.20, 0.30, 0.30, 0.20]);

        let mut previous = 0.0;
        for score in (900..1300).map(f64::from) {
            let top = table.lookup_player(&config, score)[0];
            assert!(top >= previous, "rank-1 mass fell at score {}", score);
            previous = top;
        }
    }

    #[test]
    fn test_rank_one_mass_rises_with_score() {
        let table = ProbabilityTable::default();
        for segment in SegmentName::ALL {
            let low = table.lookup(segment, 0.0).unwrap()[0];
            let high = table.lookup(segment, 4000.0).unwrap()[0];
            assert!(high >= low, "{}: {} < {}", segment, high, low);
        }
    }

    #[test]
    fn test_adaptive_mode_scales_score() {
        let table = ProbabilityTable::default();
        let mut config = config_for(SegmentName::Gold);
        // 1900 sits in the first band; 1900 * 1.12 = 2128 lands in the second
        assert_eq!(table.lookup_player(&config, 1900.0), vec![0.25, 0.35, 0.25, 0.15]);
        config.adaptive_mode = true;
        assert_eq!(table.lookup_player(&config, 1900.0), vec![0.30, 0.35, 0.20, 0.15]);
    }

    #[test]
    fn test_field_table_used_for_other_sizes() {
        let table = ProbabilityTable::default();
        let config = config_for(SegmentName::Silver);
        let six = table.lookup_for_field(&config, 1000.0, 6).unwrap();
        assert_eq!(six, vec![0.25, 0.22, 0.20, 0.18, 0.10, 0.05]);
    }

    #[test]
    fn test_resize_interpolates_and_normalizes() {
        let table = ProbabilityTable::default();
        let config = config_for(SegmentName::Gold);
        let five = table.lookup_for_field(&config, 100.0, 5).unwrap();
        assert_eq!(five.len(), 5);
        assert!((five.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(five.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_pad_truncate_policy() {
        let padded = resize_distribution(&[0.5, 0.3, 0.2], 5, FieldSizePolicy::PadTruncate);
        assert_eq!(padded.len(), 5);
        assert_eq!(padded[3], 0.0);
        assert!((padded[0] - 0.5).abs() < 1e-9);

        let truncated = resize_distribution(&[0.4, 0.4, 0.2], 2, FieldSizePolicy::PadTruncate);
        assert!((truncated[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_field_rejected() {
        let table = ProbabilityTable::default();
        let config = config_for(SegmentName::Gold);
        assert!(table.lookup_for_field(&config, 100.0, 0).is_err());
        assert_eq!(table.lookup_for_field(&config, 100.0, 1).unwrap(), vec![1.0]);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SegmentProfile;
use crate::error::{RankError, RankResult};
use crate::segment::SegmentName;

/// Score band with its rank distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreThreshold {
    pub min_score: f64,
    pub max_score: f64,
    /// Relative weights, index 0 = 1st place
    pub ranking_probabilities: Vec<f64>,
    /// Higher wins when bands overlap
    pub priority: u32,
}

/// Highest-priority band containing `score`. Bands read as contiguous: a
/// score between two bands (or above all of them) stays in the nearest
/// band below it. `None` only when the score is below every band.
pub fn select_band(bands: &[ScoreThreshold], score: f64) -> Option<&ScoreThreshold> {
    bands
        .iter()
        .filter(|t| t.contains(score))
        .max_by_key(|t| t.priority)
        .or_else(|| {
            bands
                .iter()
                .filter(|t| t.max_score < score)
                .max_by(|a, b| a.max_score.total_cmp(&b.max_score).then(a.priority.cmp(&b.priority)))
        })
}

impl ScoreThreshold {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min_score && score <= self.max_score
    }

    pub fn validate(&self, max_rank: usize) -> Result<(), String> {
        if self.min_score > self.max_score {
            return Err(format!("band {}..{} is inverted", self.min_score, self.max_score));
        }
        if self.ranking_probabilities.len() != max_rank {
            return Err(format!(
                "band {}..{} has {} probabilities, expected {}",
                self.min_score,
                self.max_score,
                self.ranking_probabilities.len(),
                max_rank
            ));
        }
        if self.ranking_probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(format!("band {}..{} has negative weights", self.min_score, self.max_score));
        }
        if self.ranking_probabilities.iter().sum::<f64>() <= 0.0 {
            return Err(format!("band {}..{} has zero total weight", self.min_score, self.max_score));
        }
        Ok(())
    }
}

/// Per-player probability configuration.
///
/// Seeded from the segment profile on first match, recalibrated after
/// every match and reseeded when the player changes segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScoreThresholdConfig {
    pub uid: String,
    pub segment_name: SegmentName,
    pub score_thresholds: Vec<ScoreThreshold>,
    pub base_ranking_probability: Vec<f64>,
    pub max_rank: usize,
    pub adaptive_mode: bool,
    pub learning_rate: f64,
    pub auto_adjust_learning_rate: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerScoreThresholdConfig {
    pub fn from_segment(uid: impl Into<String>, profile: &SegmentProfile, now: DateTime<Utc>) -> Self {
        Self {
            uid: uid.into(),
            segment_name: profile.segment,
            score_thresholds: profile.thresholds.clone(),
            base_ranking_probability: profile.base_distribution(),
            max_rank: profile.max_rank,
            adaptive_mode: true,
            learning_rate: profile.learning_rate,
            auto_adjust_learning_rate: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Swap in another segment's tables, keeping the player's flags
    pub fn reseed_for_segment(&mut self, profile: &SegmentProfile, now: DateTime<Utc>) {
        self.segment_name = profile.segment;
        self.score_thresholds = profile.thresholds.clone();
        self.base_ranking_probability = profile.base_distribution();
        self.max_rank = profile.max_rank;
        self.learning_rate = profile.learning_rate;
        self.updated_at = now;
    }

    /// Band for `score`, see [`select_band`]
    pub fn matching_threshold(&self, score: f64) -> Option<&ScoreThreshold> {
        select_band(&self.score_thresholds, score)
    }

    pub fn validate(&self) -> RankResult<()> {
        if self.uid.trim().is_empty() {
            return Err(RankError::Validation("config uid is empty".into()));
        }
        if self.max_rank == 0 {
            return Err(RankError::Configuration(format!("{}: max_rank must be > 0", self.uid)));
        }
        if self.base_ranking_probability.len() != self.max_rank {
            return Err(RankError::Configuration(format!(
                "{}: base distribution has {} entries, expected {}",
                self.uid,
                self.base_ranking_probability.len(),
                self.max_rank
            )));
        }
        for threshold in &self.score_thresholds {
            threshold
                .validate(self.max_rank)
                .map_err(|e| RankError::Configuration(format!("{}: {}", self.uid, e)))?;
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(RankError::Configuration(format!(
                "{}: learning rate {} is invalid",
                self.uid, self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentTable;

    fn gold_config() -> PlayerScoreThresholdConfig {
        let profile = SegmentTable::builtin().get(SegmentName::Gold).unwrap();
        PlayerScoreThresholdConfig::from_segment("p1", profile, Utc::now())
    }

    #[test]
    fn test_seeded_from_segment() {
        let config = gold_config();
        assert_eq!(config.max_rank, 4);
        assert_eq!(config.score_thresholds.len(), 3);
        assert_eq!(config.base_ranking_probability, vec![0.35, 0.30, 0.20, 0.15]);
        config.validate().unwrap();
    }

    #[test]
    fn test_matching_threshold_prefers_priority() {
        let mut config = gold_config();
        config.score_thresholds.push(ScoreThreshold {
            min_score: 1500.0,
            max_score: 2500.0,
            ranking_probabilities: vec![0.7, 0.1, 0.1, 0.1],
            priority: 9,
        });
        let hit = config.matching_threshold(2200.0).unwrap();
        assert_eq!(hit.priority, 9);
        assert_eq!(config.matching_threshold(2600.0).unwrap().priority, 2);
        assert_eq!(config.matching_threshold(9000.0).unwrap().priority, 3);
        assert!(config.matching_threshold(-1.0).is_none());
    }

    #[test]
    fn test_gap_between_bands_stays_in_lower_band() {
        let config = gold_config();
        // 2000 and 2001 are adjacent band edges
        assert_eq!(config.matching_threshold(2000.5).unwrap().priority, 1);
        assert_eq!(config.matching_threshold(2001.0).unwrap().priority, 2);
        assert_eq!(config.matching_threshold(3000.99).unwrap().priority, 2);
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let mut config = gold_config();
        config.score_thresholds[0].ranking_probabilities.pop();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RankError::Configuration(_)), "got {:?}", err);
    }

    #[test]
    fn test_reseed_keeps_flags() {
        let mut config = gold_config();
        config.auto_adjust_learning_rate = false;
        let platinum = SegmentTable::builtin().get(SegmentName::Platinum).unwrap();
        config.reseed_for_segment(platinum, Utc::now());

        assert_eq!(config.segment_name, SegmentName::Platinum);
        assert!((config.learning_rate - 0.15).abs() < 1e-9);
        assert!(!config.auto_adjust_learning_rate);
    }
}

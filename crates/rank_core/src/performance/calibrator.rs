//! Learning-rate recalibration from rolling performance

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CalibrationConfig;
use crate::models::{PlayerPerformanceMetrics, PlayerScoreThresholdConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub previous: f64,
    pub proposed: f64,
    /// `proposed` was written back to the config
    pub applied: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AdaptiveCalibrator {
    config: CalibrationConfig,
}

impl AdaptiveCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Proposed learning rate, starting from the segment's base rate.
    /// `None` while the player is not eligible.
    pub fn propose(
        &self,
        player: &PlayerScoreThresholdConfig,
        metrics: &PlayerPerformanceMetrics,
        segment_base_rate: f64,
    ) -> Option<f64> {
        let c = &self.config;
        if !player.auto_adjust_learning_rate || metrics.total_matches < c.min_matches {
            return None;
        }

        let mut rate = segment_base_rate;
        let win_rate = metrics.win_rate();
        if win_rate < c.low_win_rate {
            rate = (rate * c.low_win_rate_factor).min(c.learning_rate_max);
        } else if win_rate > c.high_win_rate {
            rate = (rate * c.high_win_rate_factor).max(c.dampen_floor);
        }

        if metrics.current_win_streak >= c.win_streak_threshold {
            rate = (rate * c.win_streak_factor).max(c.dampen_floor);
        } else if metrics.current_lose_streak >= c.lose_streak_threshold {
            rate = (rate * c.lose_streak_factor).min(c.learning_rate_max);
        }

        Some(rate.clamp(c.learning_rate_min, c.learning_rate_max))
    }

    /// Recalibrate in place. Changes within `persist_epsilon` are dropped.
    pub fn recalibrate(
        &self,
        player: &mut PlayerScoreThresholdConfig,
        metrics: &PlayerPerformanceMetrics,
        segment_base_rate: f64,
    ) -> CalibrationOutcome {
        let previous = player.learning_rate;
        let Some(proposed) = self.propose(player, metrics, segment_base_rate) else {
            return CalibrationOutcome { previous, proposed: previous, applied: false };
        };

        let applied = (proposed - previous).abs() > self.config.persist_epsilon;
        if applied {
            debug!(uid = %player.uid, previous, proposed, "learning rate adjusted");
            player.learning_rate = proposed;
            player.updated_at = metrics.last_updated;
        }
        CalibrationOutcome { previous, proposed, applied }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentTable;
    use crate::segment::SegmentName;
    use chrono::Utc;

    fn setup(segment: SegmentName) -> (PlayerScoreThresholdConfig, PlayerPerformanceMetrics, f64) {
        let profile = SegmentTable::builtin().get(segment).unwrap();
        let config = PlayerScoreThresholdConfig::from_segment("p", profile, Utc::now());
        let metrics = PlayerPerformanceMetrics::new("p", Utc::now());
        (config, metrics, profile.learning_rate)
    }

    fn with_record(metrics: &mut PlayerPerformanceMetrics, matches: u32, wins: u32) {
        metrics.total_matches = matches;
        metrics.total_wins = wins;
        metrics.total_losses = matches - wins;
    }

    #[test]
    fn test_not_eligible_below_min_matches() {
        let calibrator = AdaptiveCalibrator::default();
        let (mut config, mut metrics, base) = setup(SegmentName::Gold);
        with_record(&mut metrics, 19, 0);
        let outcome = calibrator.recalibrate(&mut config, &metrics, base);
        assert!(!outcome.applied);
        assert!((config.learning_rate - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_low_win_rate_raises_rate() {
        let calibrator = AdaptiveCalibrator::default();
        let (mut config, mut metrics, base) = setup(SegmentName::Gold);
        with_record(&mut metrics, 20, 4);
        let outcome = calibrator.recalibrate(&mut config, &metrics, base);
        assert!(outcome.applied);
        assert!((config.learning_rate - 0.18).abs() < 1e-9, "rate {}", config.learning_rate);
    }

    #[test]
    fn test_high_win_rate_and_streak_dampen() {
        let calibrator = AdaptiveCalibrator::default();
        let (mut config, mut metrics, base) = setup(SegmentName::Master);
        with_record(&mut metrics, 30, 25);
        metrics.current_win_streak = 6;
        calibrator.recalibrate(&mut config, &metrics, base);
        // 0.2 * 0.8 * 0.9
        assert!((config.learning_rate - 0.144).abs() < 1e-9, "rate {}", config.learning_rate);
    }

    #[test]
    fn test_lose_streak_capped() {
        let calibrator = AdaptiveCalibrator::default();
        let (mut config, mut metrics, base) = setup(SegmentName::Master);
        with_record(&mut metrics, 40, 8);
        metrics.current_lose_streak = 4;
        calibrator.recalibrate(&mut config, &metrics, base);
        // 0.2 * 1.5 = 0.3 (cap), * 1.3 capped again
        assert!((config.learning_rate - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_small_change_not_persisted() {
        let calibrator = AdaptiveCalibrator::default();
        let (mut config, mut metrics, base) = setup(SegmentName::Bronze);
        with_record(&mut metrics, 20, 10);
        config.learning_rate = 0.055;
        // proposal is the base 0.05, within epsilon of 0.055
        let outcome = calibrator.recalibrate(&mut config, &metrics, base);
        assert!(!outcome.applied);
        assert!((config.learning_rate - 0.055).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_flag() {
        let calibrator = AdaptiveCalibrator::default();
        let (mut config, mut metrics, base) = setup(SegmentName::Gold);
        config.auto_adjust_learning_rate = false;
        with_record(&mut metrics, 50, 0);
        assert!(calibrator.propose(&config, &metrics, base).is_none());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RankError, RankResult};
use crate::models::PlayerPerformanceMetrics;

/// Signed streak update: wins extend a positive streak or restart at 1,
/// losses extend a negative streak or restart at -1.
pub fn update_streak(streak: i32, is_win: bool) -> i32 {
    if is_win {
        if streak >= 0 {
            streak.saturating_add(1)
        } else {
            1
        }
    } else if streak <= 0 {
        streak.saturating_sub(1)
    } else {
        -1
    }
}

/// What the tracker did with one match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedMatch {
    pub is_win: bool,
    /// Signed streak before the match
    pub streak_before: i32,
    pub streak_after: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker;

impl PerformanceTracker {
    pub fn new() -> Self {
        Self
    }

    /// Fold one finished match into `metrics`. A rank of 1 is a win.
    pub fn record_match(
        &self,
        metrics: &mut PlayerPerformanceMetrics,
        score: f64,
        rank: u32,
        points: i64,
        at: DateTime<Utc>,
    ) -> RankResult<TrackedMatch> {
        if rank == 0 {
            return Err(RankError::Validation("rank is 1-based".into()));
        }
        if !score.is_finite() {
            return Err(RankError::Validation(format!("score {} is not finite", score)));
        }

        let is_win = rank == 1;
        let streak_before = metrics.signed_streak();

        metrics.total_matches += 1;
        metrics.total_points += points;
        if is_win {
            metrics.total_wins += 1;
            metrics.current_win_streak += 1;
            metrics.current_lose_streak = 0;
        } else {
            metrics.total_losses += 1;
            metrics.current_lose_streak += 1;
            metrics.current_win_streak = 0;
        }

        if metrics.total_matches == 1 {
            metrics.best_score = score;
            metrics.worst_score = score;
        } else {
            metrics.best_score = metrics.best_score.max(score);
            metrics.worst_score = metrics.worst_score.min(score);
        }
        metrics.average_score = metrics.total_points as f64 / metrics.total_matches as f64;
        metrics.last_updated = at;

        Ok(TrackedMatch { is_win, streak_before, streak_after: metrics.signed_streak() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_streak() {
        assert_eq!(update_streak(0, true), 1);
        assert_eq!(update_streak(4, true), 5);
        assert_eq!(update_streak(-3, true), 1);
        assert_eq!(update_streak(0, false), -1);
        assert_eq!(update_streak(-2, false), -3);
        assert_eq!(update_streak(6, false), -1);
    }

    #[test]
    fn test_record_match_counters() {
        let tracker = PerformanceTracker::new();
        let mut m = PlayerPerformanceMetrics::new("p", Utc::now());

        tracker.record_match(&mut m, 1200.0, 1, 100, Utc::now()).unwrap();
        tracker.record_match(&mut m, 800.0, 1, 100, Utc::now()).unwrap();
        let tracked = tracker.record_match(&mut m, 1500.0, 3, 30, Utc::now()).unwrap();

        assert_eq!(m.total_matches, 3);
        assert_eq!(m.total_wins, 2);
        assert_eq!(m.total_losses, 1);
        assert_eq!(m.current_win_streak, 0);
        assert_eq!(m.current_lose_streak, 1);
        assert_eq!(tracked.streak_before, 2);
        assert_eq!(tracked.streak_after, -1);
        assert_eq!(m.best_score, 1500.0);
        assert_eq!(m.worst_score, 800.0);
        assert!((m.average_score - 230.0 / 3.0).abs() < 1e-9);
        m.check_streaks().unwrap();
    }

    #[test]
    fn test_first_match_sets_worst_score() {
        let tracker = PerformanceTracker::new();
        let mut m = PlayerPerformanceMetrics::new("p", Utc::now());
        tracker.record_match(&mut m, 640.0, 2, 60, Utc::now()).unwrap();
        assert_eq!(m.worst_score, 640.0);
        assert_eq!(m.best_score, 640.0);
    }

    #[test]
    fn test_rank_zero_rejected() {
        let tracker = PerformanceTracker::new();
        let mut m = PlayerPerformanceMetrics::new("p", Utc::now());
        assert!(tracker.record_match(&mut m, 1.0, 0, 0, Utc::now()).is_err());
        assert_eq!(m.total_matches, 0);
    }
}

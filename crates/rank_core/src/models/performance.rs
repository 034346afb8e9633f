use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RankError, RankResult};

/// Rolling match aggregates for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformanceMetrics {
    pub uid: String,
    pub total_matches: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    pub total_points: i64,
    pub average_score: f64,
    pub current_win_streak: u32,
    pub current_lose_streak: u32,
    pub best_score: f64,
    pub worst_score: f64,
    pub last_updated: DateTime<Utc>,
}

impl PlayerPerformanceMetrics {
    pub fn new(uid: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            uid: uid.into(),
            total_matches: 0,
            total_wins: 0,
            total_losses: 0,
            total_points: 0,
            average_score: 0.0,
            current_win_streak: 0,
            current_lose_streak: 0,
            best_score: 0.0,
            worst_score: 0.0,
            last_updated: now,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_matches == 0 {
            0.0
        } else {
            self.total_wins as f64 / self.total_matches as f64
        }
    }

    /// Positive = win streak, negative = loss streak
    pub fn signed_streak(&self) -> i32 {
        if self.current_win_streak > 0 {
            self.current_win_streak.min(i32::MAX as u32) as i32
        } else {
            -(self.current_lose_streak.min(i32::MAX as u32) as i32)
        }
    }

    /// At most one streak counter may be non-zero
    pub fn check_streaks(&self) -> RankResult<()> {
        if self.current_win_streak > 0 && self.current_lose_streak > 0 {
            return Err(RankError::InvariantViolation(format!(
                "{}: win streak {} and lose streak {} both active",
                self.uid, self.current_win_streak, self.current_lose_streak
            )));
        }
        if u64::from(self.total_wins) + u64::from(self.total_losses) != u64::from(self.total_matches) {
            return Err(RankError::InvariantViolation(format!(
                "{}: {} wins + {} losses != {} matches",
                self.uid, self.total_wins, self.total_losses, self.total_matches
            )));
        }
        Ok(())
    }

    /// Reset only the counters [`check_streaks`](Self::check_streaks)
    /// rejects. Returns whether anything changed.
    pub fn repair_counters(&mut self) -> bool {
        let mut repaired = false;
        if self.current_win_streak > 0 && self.current_lose_streak > 0 {
            self.current_win_streak = 0;
            self.current_lose_streak = 0;
            repaired = true;
        }
        if u64::from(self.total_wins) + u64::from(self.total_losses) != u64::from(self.total_matches) {
            self.total_wins = self.total_wins.min(self.total_matches);
            self.total_losses = self.total_matches - self.total_wins;
            repaired = true;
        }
        repaired
    }
}

//! Shared types for the progression policies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ProgressionMode, WinRewardConfig};
use crate::error::RankError;
use crate::segment::SegmentName;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Normal,
    Casual,
    Ranked,
    Tournament,
    MasterChallenge,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Normal => "normal",
            MatchType::Casual => "casual",
            MatchType::Ranked => "ranked",
            MatchType::Tournament => "tournament",
            MatchType::MasterChallenge => "master_challenge",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(MatchType::Normal),
            "casual" => Ok(MatchType::Casual),
            "ranked" => Ok(MatchType::Ranked),
            "tournament" => Ok(MatchType::Tournament),
            "master_challenge" => Ok(MatchType::MasterChallenge),
            other => Err(RankError::Validation(format!("Unknown match type: {}", other))),
        }
    }
}

/// One head-to-head result as seen by the progression policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    pub player_segment: SegmentName,
    pub opponent_segment: SegmentName,
    pub player_score: f64,
    pub opponent_score: f64,
    pub is_win: bool,
    /// Signed streak before this match (positive = wins)
    pub player_streak: i32,
    pub match_type: MatchType,
}

impl MatchContext {
    pub fn margin(&self) -> f64 {
        (self.player_score - self.opponent_score).abs()
    }

    /// How far the opponent finished ahead; negative when the player outscored them
    pub fn loss_margin(&self) -> f64 {
        self.opponent_score - self.player_score
    }

    /// Opponent tier minus player tier
    pub fn tier_diff(&self) -> i32 {
        self.opponent_segment.tier() - self.player_segment.tier()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaReason {
    Win,
    NewPlayerProtection,
    ChallengeProtection,
    StreakProtection,
    PartialStreakProtection,
    StandardLoss,
    LossProtected,
}

impl fmt::Display for DeltaReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            DeltaReason::Win => "win",
            DeltaReason::NewPlayerProtection => "new-player protection",
            DeltaReason::ChallengeProtection => "challenge protection",
            DeltaReason::StreakProtection => "streak protection",
            DeltaReason::PartialStreakProtection => "partial streak protection",
            DeltaReason::StandardLoss => "loss",
            DeltaReason::LossProtected => "loss protected",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionDelta {
    /// Signed change to apply to the player's cumulative score
    pub delta: i64,
    pub base: i64,
    pub segment_multiplier: f64,
    pub type_multiplier: f64,
    pub streak_bonus: i64,
    pub reason: DeltaReason,
    /// A loss penalty was reduced or waived
    pub protected: bool,
    pub detail: String,
}

/// Interchangeable point economies
pub trait ProgressionPolicy: Send + Sync {
    fn mode(&self) -> ProgressionMode;

    fn calculate(&self, ctx: &MatchContext) -> ProgressionDelta;
}

/// Win base: `base` plus the larger margin bonus that applies
pub(crate) fn win_base(win: &WinRewardConfig, margin: f64) -> i64 {
    if margin >= win.big_margin {
        win.base + win.big_margin_bonus
    } else if margin >= win.mid_margin {
        win.base + win.mid_margin_bonus
    } else {
        win.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_base_tiers() {
        let win = WinRewardConfig::default();
        assert_eq!(win_base(&win, 0.0), 100);
        assert_eq!(win_base(&win, 200.0), 120);
        assert_eq!(win_base(&win, 499.0), 120);
        assert_eq!(win_base(&win, 500.0), 150);
    }

    #[test]
    fn test_match_type_parse() {
        assert_eq!("master-challenge".parse::<MatchType>().unwrap(), MatchType::MasterChallenge);
        assert_eq!("Tournament".parse::<MatchType>().unwrap(), MatchType::Tournament);
        assert!("friendly".parse::<MatchType>().is_err());
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(DeltaReason::NewPlayerProtection.to_string(), "new-player protection");
        assert_eq!(DeltaReason::LossProtected.to_string(), "loss protected");
    }
}

//! Ranking, calibration and protection settings

use serde::{Deserialize, Serialize};

/// How a distribution is reshaped when the field size differs from its length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSizePolicy {
    /// Linear interpolation over rank positions, then renormalize
    Interpolate,
    /// Drop trailing ranks or pad them with zero weight, then renormalize
    PadTruncate,
}

/// When a protection level earned through demotion falls back to 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionDecay {
    /// One level per `demotion_grace_period` matches without a segment change
    Automatic,
    /// Only a promotion resets the level
    OnPromotionOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Synthetic opponent offset from the human score (min, max)
    pub opponent_offset_min: f64,
    pub opponent_offset_max: f64,
    pub confidence_min: f64,
    pub confidence_max: f64,
    pub field_size_policy: FieldSizePolicy,
    /// Matches considered for the confidence trend
    pub trend_window: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            opponent_offset_min: 50.0,
            opponent_offset_max: 150.0,
            confidence_min: 0.1,
            confidence_max: 0.95,
            field_size_policy: FieldSizePolicy::Interpolate,
            trend_window: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub min_matches: u32,
    pub learning_rate_min: f64,
    pub learning_rate_max: f64,
    /// Lower bound for rates that are being reduced
    pub dampen_floor: f64,
    pub low_win_rate: f64,
    pub high_win_rate: f64,
    pub low_win_rate_factor: f64,
    pub high_win_rate_factor: f64,
    pub win_streak_threshold: u32,
    pub win_streak_factor: f64,
    pub lose_streak_threshold: u32,
    pub lose_streak_factor: f64,
    /// Minimum change worth persisting
    pub persist_epsilon: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_matches: 20,
            learning_rate_min: 0.01,
            learning_rate_max: 0.3,
            dampen_floor: 0.02,
            low_win_rate: 0.3,
            high_win_rate: 0.7,
            low_win_rate_factor: 1.5,
            high_win_rate_factor: 0.8,
            win_streak_threshold: 5,
            win_streak_factor: 0.9,
            lose_streak_threshold: 3,
            lose_streak_factor: 1.3,
            persist_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    pub decay: ProtectionDecay,
    pub max_level: u8,
    /// Level assigned right after a demotion
    pub demotion_level: u8,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self { decay: ProtectionDecay::Automatic, max_level: 3, demotion_level: 1 }
    }
}

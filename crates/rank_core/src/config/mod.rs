//! # Engine Configuration
//!
//! 랭킹/진행 엔진의 모든 튜닝 상수를 한 곳에서 관리합니다.
//!
//! ## 사용법
//! ```rust
//! use rank_core::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! let lenient = EngineConfig::lenient();
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Environment Variables
//!
//! - `RANK_PROFILE`: Select preset (lenient, strict, standard)

mod progression;
mod ranking;
mod segments;

pub use progression::{
    tier_amount, InactivityConfig, LossPenaltyConfig, MasterMaintenanceConfig,
    MatchTypeMultipliers, ProgressionConfig, ProgressionMode, RankPointsConfig,
    ReturnRewardConfig, SegmentMultiplierConfig, StreakTier, WinRewardConfig,
};
pub use ranking::{CalibrationConfig, FieldSizePolicy, ProtectionConfig, ProtectionDecay, RankingConfig};
pub use segments::{PointBand, ProtectionConstants, SegmentProfile, SegmentTable, SEGMENTS_YAML};

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RankError, RankResult};

pub const PROFILE_ENV: &str = "RANK_PROFILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ranking: RankingConfig,
    pub calibration: CalibrationConfig,
    pub progression: ProgressionConfig,
    pub protection: ProtectionConfig,
    pub segments: SegmentTable,
}

impl EngineConfig {
    pub fn standard() -> Self {
        Self::default()
    }

    /// Softer losses and longer protection
    pub fn lenient() -> Self {
        let mut cfg = Self::default();
        cfg.progression.loss.base = -30;
        cfg.progression.loss.big_margin_penalty = -20;
        cfg.progression.loss.mid_margin_penalty = -10;
        cfg.progression.loss.lower_tier_amplifier = 1.2;
        cfg.protection.max_level = 3;
        for profile in &mut cfg.segments.segments {
            profile.protection.demotion_grace_period += 2;
            profile.protection.promotion_stability_period += 2;
        }
        cfg
    }

    /// No automatic protection decay, faster calibration
    pub fn strict() -> Self {
        let mut cfg = Self::default();
        cfg.protection.decay = ProtectionDecay::OnPromotionOnly;
        cfg.protection.max_level = 1;
        cfg.calibration.min_matches = 10;
        cfg.progression.loss.full_protection_streak = 15;
        cfg
    }

    pub fn from_env_or_default() -> Self {
        match env::var(PROFILE_ENV).unwrap_or_default().to_lowercase().as_str() {
            "lenient" => Self::lenient(),
            "strict" => Self::strict(),
            _ => Self::standard(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> RankResult<Self> {
        let cfg: EngineConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> RankResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> RankResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> RankResult<()> {
        self.segments.validate()?;

        let r = &self.ranking;
        if !(r.opponent_offset_min > 0.0 && r.opponent_offset_min <= r.opponent_offset_max) {
            return Err(RankError::Configuration(format!(
                "opponent offsets must satisfy 0 < min <= max (got {}..{})",
                r.opponent_offset_min, r.opponent_offset_max
            )));
        }
        if !(0.0..=1.0).contains(&r.confidence_min) || r.confidence_min > r.confidence_max {
            return Err(RankError::Configuration("confidence bounds out of range".into()));
        }

        let c = &self.calibration;
        if !(c.learning_rate_min > 0.0 && c.learning_rate_min <= c.learning_rate_max) {
            return Err(RankError::Configuration("learning rate bounds out of range".into()));
        }
        for profile in &self.segments.segments {
            if !(c.learning_rate_min..=c.learning_rate_max).contains(&profile.learning_rate) {
                return Err(RankError::Configuration(format!(
                    "{}: learning rate {} outside [{}, {}]",
                    profile.segment, profile.learning_rate, c.learning_rate_min, c.learning_rate_max
                )));
            }
        }

        if self.protection.demotion_level > self.protection.max_level {
            return Err(RankError::Configuration("demotion_level exceeds max_level".into()));
        }
        if self.progression.rank_points.by_rank.is_empty() {
            return Err(RankError::Configuration("rank_points.by_rank is empty".into()));
        }
        Ok(())
    }
}

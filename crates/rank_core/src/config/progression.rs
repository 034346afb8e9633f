//! Progression economy constants (hard points and soft SP)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionMode {
    HardPoints,
    SoftSp,
}

/// Streak threshold → flat adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakTier {
    pub min_streak: u32,
    pub amount: i64,
}

/// First matching tier wins, so tiers are kept sorted by descending `min_streak`
pub fn tier_amount(tiers: &[StreakTier], streak: u32) -> Option<i64> {
    tiers.iter().find(|t| streak >= t.min_streak).map(|t| t.amount)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WinRewardConfig {
    pub base: i64,
    /// Margins at or above this earn `big_margin_bonus`
    pub big_margin: f64,
    pub big_margin_bonus: i64,
    pub mid_margin: f64,
    pub mid_margin_bonus: i64,
    pub streak_bonus: Vec<StreakTier>,
}

impl Default for WinRewardConfig {
    fn default() -> Self {
        Self {
            base: 100,
            big_margin: 500.0,
            big_margin_bonus: 50,
            mid_margin: 200.0,
            mid_margin_bonus: 20,
            streak_bonus: vec![
                StreakTier { min_streak: 10, amount: 100 },
                StreakTier { min_streak: 5, amount: 50 },
                StreakTier { min_streak: 3, amount: 20 },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LossPenaltyConfig {
    pub base: i64,
    pub big_margin_penalty: i64,
    pub mid_margin_penalty: i64,
    /// Losing to a lower segment
    pub lower_tier_amplifier: f64,
    /// Opponents this many tiers above never cost points
    pub challenge_gap: i32,
    /// Win streak at which the next loss is free
    pub full_protection_streak: u32,
    /// Flat penalties for shorter win streaks
    pub partial_protection: Vec<StreakTier>,
    /// Extra penalty for running loss streaks
    pub loss_streak_penalty: Vec<StreakTier>,
    pub tournament_factor: f64,
    pub ranked_factor: f64,
}

impl Default for LossPenaltyConfig {
    fn default() -> Self {
        Self {
            base: -50,
            big_margin_penalty: -30,
            mid_margin_penalty: -15,
            lower_tier_amplifier: 1.5,
            challenge_gap: 2,
            full_protection_streak: 10,
            partial_protection: vec![
                StreakTier { min_streak: 5, amount: -10 },
                StreakTier { min_streak: 3, amount: -20 },
            ],
            loss_streak_penalty: vec![
                StreakTier { min_streak: 5, amount: -20 },
                StreakTier { min_streak: 3, amount: -10 },
            ],
            tournament_factor: 0.8,
            ranked_factor: 1.2,
        }
    }
}

/// Multiplier by `opponent tier - player tier`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentMultiplierConfig {
    pub two_or_more_above: f64,
    pub one_above: f64,
    pub same: f64,
    pub one_below: f64,
    pub far_below: f64,
}

impl Default for SegmentMultiplierConfig {
    fn default() -> Self {
        Self { two_or_more_above: 1.5, one_above: 1.2, same: 1.0, one_below: 0.8, far_below: 0.5 }
    }
}

impl SegmentMultiplierConfig {
    pub fn for_tier_diff(&self, tier_diff: i32) -> f64 {
        match tier_diff {
            d if d >= 2 => self.two_or_more_above,
            1 => self.one_above,
            0 => self.same,
            -1 => self.one_below,
            _ => self.far_below,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchTypeMultipliers {
    pub tournament: f64,
    pub master_challenge: f64,
    pub ranked: f64,
    pub casual: f64,
    pub normal: f64,
}

impl Default for MatchTypeMultipliers {
    fn default() -> Self {
        Self { tournament: 1.5, master_challenge: 2.0, ranked: 1.2, casual: 0.8, normal: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InactivityConfig {
    pub min_days: i64,
    pub base_pct: f64,
    pub weekly_step: f64,
    pub max_pct: f64,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self { min_days: 7, base_pct: 0.07, weekly_step: 0.02, max_pct: 0.15 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnRewardConfig {
    pub min_days: i64,
    pub base_sp: i64,
    pub base_tickets: u32,
    pub base_props: u32,
    pub weekly_step: f64,
    pub max_multiplier: f64,
}

impl Default for ReturnRewardConfig {
    fn default() -> Self {
        Self {
            min_days: 7,
            base_sp: 50,
            base_tickets: 1,
            base_props: 1,
            weekly_step: 0.2,
            max_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterMaintenanceConfig {
    pub min_weekly_tournaments: u32,
    pub min_sp: i64,
    pub demotion_sp_penalty: i64,
    pub demotion_sp_floor: i64,
    pub reward_sp: i64,
    pub reward_tickets: u32,
    pub reward_props: u32,
}

impl Default for MasterMaintenanceConfig {
    fn default() -> Self {
        Self {
            min_weekly_tournaments: 3,
            min_sp: 2000,
            demotion_sp_penalty: 200,
            demotion_sp_floor: 1800,
            reward_sp: 100,
            reward_tickets: 1,
            reward_props: 1,
        }
    }
}

/// Points awarded by finishing position when a report carries none
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankPointsConfig {
    /// Index 0 = 1st place
    pub by_rank: Vec<i64>,
    pub fallback: i64,
    pub streak_bonus_min: u32,
    pub streak_bonus: i64,
}

impl Default for RankPointsConfig {
    fn default() -> Self {
        Self { by_rank: vec![100, 60, 30, 10], fallback: 5, streak_bonus_min: 3, streak_bonus: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub mode: ProgressionMode,
    pub win: WinRewardConfig,
    pub loss: LossPenaltyConfig,
    pub segment_multipliers: SegmentMultiplierConfig,
    pub match_types: MatchTypeMultipliers,
    pub inactivity: InactivityConfig,
    pub return_reward: ReturnRewardConfig,
    pub master_maintenance: MasterMaintenanceConfig,
    pub rank_points: RankPointsConfig,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            mode: ProgressionMode::HardPoints,
            win: WinRewardConfig::default(),
            loss: LossPenaltyConfig::default(),
            segment_multipliers: SegmentMultiplierConfig::default(),
            match_types: MatchTypeMultipliers::default(),
            inactivity: InactivityConfig::default(),
            return_reward: ReturnRewardConfig::default(),
            master_maintenance: MasterMaintenanceConfig::default(),
            rank_points: RankPointsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_amount_first_match_wins() {
        let tiers = WinRewardConfig::default().streak_bonus;
        assert_eq!(tier_amount(&tiers, 12), Some(100));
        assert_eq!(tier_amount(&tiers, 7), Some(50));
        assert_eq!(tier_amount(&tiers, 3), Some(20));
        assert_eq!(tier_amount(&tiers, 2), None);
    }

    #[test]
    fn test_segment_multiplier_by_tier_diff() {
        let m = SegmentMultiplierConfig::default();
        assert!((m.for_tier_diff(3) - 1.5).abs() < 1e-9);
        assert!((m.for_tier_diff(1) - 1.2).abs() < 1e-9);
        assert!((m.for_tier_diff(0) - 1.0).abs() < 1e-9);
        assert!((m.for_tier_diff(-1) - 0.8).abs() < 1e-9);
        assert!((m.for_tier_diff(-4) - 0.5).abs() < 1e-9);
    }
}

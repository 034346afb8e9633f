//! Soft SP economy.
//!
//! Losses never cost SP. Wins scale with the opponent's segment and the
//! match type. SP can still shrink through inactivity decay, and master
//! players must keep up a weekly tournament quota.

use serde::{Deserialize, Serialize};

use super::policy::{win_base, DeltaReason, MatchContext, MatchType, ProgressionDelta, ProgressionPolicy};
use crate::config::{
    InactivityConfig, MasterMaintenanceConfig, MatchTypeMultipliers, ProgressionConfig,
    ProgressionMode, ReturnRewardConfig, SegmentMultiplierConfig, SegmentTable, WinRewardConfig,
};
use crate::error::RankResult;
use crate::segment::SegmentName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactivityPenalty {
    pub days_inactive: i64,
    pub weeks_inactive: i64,
    pub penalty_pct: f64,
    pub penalty: i64,
    pub new_sp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnReward {
    pub weeks_inactive: i64,
    pub multiplier: f64,
    pub sp: i64,
    pub tickets: u32,
    pub props: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceReward {
    pub sp: i64,
    pub tickets: u32,
    pub props: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceCheck {
    /// Player is in master and the check ran
    pub applicable: bool,
    pub maintained: bool,
    pub demotion_required: bool,
    pub new_segment: Option<SegmentName>,
    pub new_sp: i64,
    pub reward: Option<MaintenanceReward>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionCheck {
    pub current: SegmentName,
    pub target: SegmentName,
    pub should_change: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SoftSpPolicy {
    win: WinRewardConfig,
    segments: SegmentMultiplierConfig,
    match_types: MatchTypeMultipliers,
    inactivity: InactivityConfig,
    return_reward: ReturnRewardConfig,
    maintenance: MasterMaintenanceConfig,
    table: SegmentTable,
}

impl SoftSpPolicy {
    pub fn new(config: &ProgressionConfig, table: &SegmentTable) -> Self {
        Self {
            win: config.win.clone(),
            segments: config.segment_multipliers.clone(),
            match_types: config.match_types.clone(),
            inactivity: config.inactivity.clone(),
            return_reward: config.return_reward.clone(),
            maintenance: config.master_maintenance.clone(),
            table: table.clone(),
        }
    }

    pub fn type_multiplier(&self, match_type: MatchType) -> f64 {
        let m = &self.match_types;
        match match_type {
            MatchType::Tournament => m.tournament,
            MatchType::MasterChallenge => m.master_challenge,
            MatchType::Ranked => m.ranked,
            MatchType::Casual => m.casual,
            MatchType::Normal => m.normal,
        }
    }

    /// Decay for silver and above after `min_days` without a match.
    /// `None` when no penalty applies.
    pub fn inactivity_penalty(
        &self,
        segment: SegmentName,
        sp: i64,
        days_inactive: i64,
    ) -> RankResult<Option<InactivityPenalty>> {
        let cfg = &self.inactivity;
        if segment == SegmentName::Bronze || days_inactive < cfg.min_days {
            return Ok(None);
        }
        let cap = self.table.get(segment)?.inactivity_max_penalty;
        let weeks = days_inactive / 7;
        let pct = (cfg.base_pct + (weeks - 1).max(0) as f64 * cfg.weekly_step).min(cfg.max_pct);
        let penalty = ((sp.max(0) as f64 * pct).round() as i64).min(cap).max(0);

        Ok(Some(InactivityPenalty {
            days_inactive,
            weeks_inactive: weeks,
            penalty_pct: pct,
            penalty,
            new_sp: (sp - penalty).max(0),
        }))
    }

    /// Comeback bonus after `min_days` away, scaled by weeks away
    pub fn return_reward(&self, days_inactive: i64) -> Option<ReturnReward> {
        let cfg = &self.return_reward;
        if days_inactive < cfg.min_days {
            return None;
        }
        let weeks = days_inactive / 7;
        let multiplier = (1.0 + weeks as f64 * cfg.weekly_step).min(cfg.max_multiplier);
        Some(ReturnReward {
            weeks_inactive: weeks,
            multiplier,
            sp: (cfg.base_sp as f64 * multiplier).round() as i64,
            tickets: (cfg.base_tickets as f64 * multiplier).round() as u32,
            props: (cfg.base_props as f64 * multiplier).round() as u32,
        })
    }

    pub fn check_master_maintenance(
        &self,
        segment: SegmentName,
        sp: i64,
        weekly_tournaments: u32,
    ) -> MaintenanceCheck {
        let cfg = &self.maintenance;
        if segment != SegmentName::Master {
            return MaintenanceCheck {
                applicable: false,
                maintained: true,
                demotion_required: false,
                new_segment: None,
                new_sp: sp,
                reward: None,
                reason: format!("{} has no maintenance requirement", segment),
            };
        }

        if sp < cfg.min_sp {
            let new_sp = (sp - cfg.demotion_sp_penalty).max(cfg.demotion_sp_floor);
            return MaintenanceCheck {
                applicable: true,
                maintained: false,
                demotion_required: true,
                new_segment: segment.previous(),
                new_sp,
                reward: None,
                reason: format!("SP {} below the {} required to stay in master", sp, cfg.min_sp),
            };
        }

        if weekly_tournaments < cfg.min_weekly_tournaments {
            return MaintenanceCheck {
                applicable: true,
                maintained: false,
                demotion_required: false,
                new_segment: None,
                new_sp: sp,
                reward: None,
                reason: format!(
                    "{} of {} weekly tournaments played, reward withheld",
                    weekly_tournaments, cfg.min_weekly_tournaments
                ),
            };
        }

        MaintenanceCheck {
            applicable: true,
            maintained: true,
            demotion_required: false,
            new_segment: None,
            new_sp: sp + cfg.reward_sp,
            reward: Some(MaintenanceReward {
                sp: cfg.reward_sp,
                tickets: cfg.reward_tickets,
                props: cfg.reward_props,
            }),
            reason: "master maintained".to_string(),
        }
    }

    /// Pure band lookup on SP
    pub fn check_promotion(&self, current: SegmentName, sp: i64) -> PromotionCheck {
        let target = self.table.segment_for_points(sp);
        PromotionCheck { current, target, should_change: target != current }
    }
}

impl ProgressionPolicy for SoftSpPolicy {
    fn mode(&self) -> ProgressionMode {
        ProgressionMode::SoftSp
    }

    fn calculate(&self, ctx: &MatchContext) -> ProgressionDelta {
        if !ctx.is_win {
            return ProgressionDelta {
                delta: 0,
                base: 0,
                segment_multiplier: 1.0,
                type_multiplier: 1.0,
                streak_bonus: 0,
                reason: DeltaReason::LossProtected,
                protected: true,
                detail: format!("loss vs {} keeps SP", ctx.opponent_segment),
            };
        }

        let base = win_base(&self.win, ctx.margin());
        let segment_multiplier = self.segments.for_tier_diff(ctx.tier_diff());
        let type_multiplier = self.type_multiplier(ctx.match_type);
        let delta = (base as f64 * segment_multiplier * type_multiplier).round() as i64;

        ProgressionDelta {
            delta,
            base,
            segment_multiplier,
            type_multiplier,
            streak_bonus: 0,
            reason: DeltaReason::Win,
            protected: false,
            detail: format!(
                "{} win vs {} on a {} streak: {} x{:.1} x{:.1}",
                ctx.match_type,
                ctx.opponent_segment,
                ctx.player_streak.max(0) + 1,
                base,
                segment_multiplier,
                type_multiplier
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SoftSpPolicy {
        SoftSpPolicy::new(&ProgressionConfig::default(), SegmentTable::builtin())
    }

    #[test]
    fn test_master_challenge_upset() {
        let ctx = MatchContext {
            player_segment: SegmentName::Gold,
            opponent_segment: SegmentName::Master,
            player_score: 3000.0,
            opponent_score: 2500.0,
            is_win: true,
            player_streak: 10,
            match_type: MatchType::MasterChallenge,
        };
        let d = policy().calculate(&ctx);
        assert_eq!(d.base, 150);
        assert!((d.segment_multiplier - 1.5).abs() < 1e-9);
        assert!((d.type_multiplier - 2.0).abs() < 1e-9);
        assert_eq!(d.delta, 450);
    }

    #[test]
    fn test_loss_never_costs() {
        let ctx = MatchContext {
            player_segment: SegmentName::Diamond,
            opponent_segment: SegmentName::Bronze,
            player_score: 0.0,
            opponent_score: 9000.0,
            is_win: false,
            player_streak: -9,
            match_type: MatchType::Tournament,
        };
        let d = policy().calculate(&ctx);
        assert_eq!(d.delta, 0);
        assert_eq!(d.reason.to_string(), "loss protected");
    }

    #[test]
    fn test_casual_win_same_tier() {
        let ctx = MatchContext {
            player_segment: SegmentName::Silver,
            opponent_segment: SegmentName::Silver,
            player_score: 1300.0,
            opponent_score: 1000.0,
            is_win: true,
            player_streak: 0,
            match_type: MatchType::Casual,
        };
        assert_eq!(policy().calculate(&ctx).delta, 96); // 120 * 0.8
    }

    #[test]
    fn test_inactivity_penalty() {
        let p = policy();
        assert!(p.inactivity_penalty(SegmentName::Bronze, 800, 30).unwrap().is_none());
        assert!(p.inactivity_penalty(SegmentName::Gold, 3000, 6).unwrap().is_none());

        let one_week = p.inactivity_penalty(SegmentName::Gold, 1000, 7).unwrap().unwrap();
        assert!((one_week.penalty_pct - 0.07).abs() < 1e-9);
        assert_eq!(one_week.penalty, 70);
        assert_eq!(one_week.new_sp, 930);

        // three weeks: 11%, capped at gold's 150
        let capped = p.inactivity_penalty(SegmentName::Gold, 3000, 21).unwrap().unwrap();
        assert!((capped.penalty_pct - 0.11).abs() < 1e-9);
        assert_eq!(capped.penalty, 150);

        // long absence tops out at 15%
        let long = p.inactivity_penalty(SegmentName::Silver, 400, 200).unwrap().unwrap();
        assert!((long.penalty_pct - 0.15).abs() < 1e-9);
        assert_eq!(long.penalty, 60);
    }

    #[test]
    fn test_return_reward_scaling() {
        let p = policy();
        assert!(p.return_reward(6).is_none());
        let two_weeks = p.return_reward(14).unwrap();
        assert!((two_weeks.multiplier - 1.4).abs() < 1e-9);
        assert_eq!(two_weeks.sp, 70);
        assert_eq!(two_weeks.tickets, 1);

        let capped = p.return_reward(365).unwrap();
        assert!((capped.multiplier - 2.0).abs() < 1e-9);
        assert_eq!(capped.sp, 100);
        assert_eq!(capped.props, 2);
    }

    #[test]
    fn test_master_maintenance_demotion() {
        let check = policy().check_master_maintenance(SegmentName::Master, 1800, 5);
        assert!(check.demotion_required);
        assert_eq!(check.new_segment, Some(SegmentName::Diamond));
        assert_eq!(check.new_sp, 1800);

        let deeper = policy().check_master_maintenance(SegmentName::Master, 1999, 5);
        assert_eq!(deeper.new_sp, 1800);
    }

    #[test]
    fn test_master_maintenance_quota_only() {
        let check = policy().check_master_maintenance(SegmentName::Master, 25_000, 2);
        assert!(!check.demotion_required);
        assert!(!check.maintained);
        assert!(check.reward.is_none());
        assert_eq!(check.new_sp, 25_000);

        let ok = policy().check_master_maintenance(SegmentName::Master, 25_000, 3);
        assert!(ok.maintained);
        assert_eq!(ok.reward.as_ref().map(|r| r.sp), Some(100));

        let na = policy().check_master_maintenance(SegmentName::Gold, 10, 0);
        assert!(!na.applicable);
    }

    #[test]
    fn test_check_promotion() {
        let p = policy();
        let check = p.check_promotion(SegmentName::Silver, 2600);
        assert_eq!(check.target, SegmentName::Gold);
        assert!(check.should_change);
        assert!(!p.check_promotion(SegmentName::Gold, 2600).should_change);
    }
}

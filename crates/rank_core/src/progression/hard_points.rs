//! Hard points economy: wins add, losses subtract unless protected

use super::policy::{win_base, DeltaReason, MatchContext, MatchType, ProgressionDelta, ProgressionPolicy};
use crate::config::{
    tier_amount, LossPenaltyConfig, ProgressionConfig, ProgressionMode, SegmentMultiplierConfig,
    WinRewardConfig,
};
use crate::segment::SegmentName;

#[derive(Debug, Clone, Default)]
pub struct HardPointsPolicy {
    win: WinRewardConfig,
    loss: LossPenaltyConfig,
    segments: SegmentMultiplierConfig,
}

impl HardPointsPolicy {
    pub fn new(config: &ProgressionConfig) -> Self {
        Self {
            win: config.win.clone(),
            loss: config.loss.clone(),
            segments: config.segment_multipliers.clone(),
        }
    }

    fn win_delta(&self, ctx: &MatchContext) -> ProgressionDelta {
        let base = win_base(&self.win, ctx.margin());
        let segment_multiplier = self.segments.for_tier_diff(ctx.tier_diff());
        let streak_bonus = if ctx.player_streak > 0 {
            tier_amount(&self.win.streak_bonus, ctx.player_streak as u32).unwrap_or(0)
        } else {
            0
        };
        let delta = (base as f64 * segment_multiplier + streak_bonus as f64).round() as i64;

        ProgressionDelta {
            delta,
            base,
            segment_multiplier,
            type_multiplier: 1.0,
            streak_bonus,
            reason: DeltaReason::Win,
            protected: false,
            detail: format!(
                "win vs {}: base {} x{:.1} + streak {}",
                ctx.opponent_segment, base, segment_multiplier, streak_bonus
            ),
        }
    }

    fn loss_delta(&self, ctx: &MatchContext) -> ProgressionDelta {
        let tier_diff = ctx.tier_diff();

        if ctx.player_segment == SegmentName::Bronze {
            return protected(0, DeltaReason::NewPlayerProtection, "bronze players keep their points");
        }
        if tier_diff >= self.loss.challenge_gap {
            return protected(
                0,
                DeltaReason::ChallengeProtection,
                &format!("lost to {} ({} tiers up)", ctx.opponent_segment, tier_diff),
            );
        }
        if ctx.player_streak > 0 {
            let streak = ctx.player_streak as u32;
            if streak >= self.loss.full_protection_streak {
                return protected(
                    0,
                    DeltaReason::StreakProtection,
                    &format!("{} win streak absorbs the loss", streak),
                );
            }
            if let Some(flat) = tier_amount(&self.loss.partial_protection, streak) {
                return protected(
                    flat,
                    DeltaReason::PartialStreakProtection,
                    &format!("{} win streak caps the loss at {}", streak, flat),
                );
            }
        }

        let margin = ctx.loss_margin();
        let mut base = self.loss.base as f64;
        if margin >= self.win.big_margin {
            base += self.loss.big_margin_penalty as f64;
        } else if margin >= self.win.mid_margin {
            base += self.loss.mid_margin_penalty as f64;
        }
        if tier_diff < 0 {
            base *= self.loss.lower_tier_amplifier;
        }
        let type_multiplier = match ctx.match_type {
            MatchType::Tournament => self.loss.tournament_factor,
            MatchType::Ranked => self.loss.ranked_factor,
            _ => 1.0,
        };
        let base = (base * type_multiplier).round() as i64;
        let segment_multiplier = self.segments.for_tier_diff(tier_diff);

        let streak_bonus = if ctx.player_streak < 0 {
            tier_amount(&self.loss.loss_streak_penalty, ctx.player_streak.unsigned_abs()).unwrap_or(0)
        } else {
            0
        };
        let delta = (base as f64 * segment_multiplier + streak_bonus as f64).round() as i64;

        ProgressionDelta {
            delta,
            base,
            segment_multiplier,
            type_multiplier,
            streak_bonus,
            reason: DeltaReason::StandardLoss,
            protected: false,
            detail: format!(
                "loss vs {} ({}): base {} x{:.1} + streak {}",
                ctx.opponent_segment, ctx.match_type, base, segment_multiplier, streak_bonus
            ),
        }
    }
}

fn protected(delta: i64, reason: DeltaReason, detail: &str) -> ProgressionDelta {
    ProgressionDelta {
        delta,
        base: delta,
        segment_multiplier: 1.0,
        type_multiplier: 1.0,
        streak_bonus: 0,
        reason,
        protected: true,
        detail: detail.to_string(),
    }
}

impl ProgressionPolicy for HardPointsPolicy {
    fn mode(&self) -> ProgressionMode {
        ProgressionMode::HardPoints
    }

    fn calculate(&self, ctx: &MatchContext) -> ProgressionDelta {
        if ctx.is_win {
            self.win_delta(ctx)
        } else {
            self.loss_delta(ctx)
        }
    }
}


#[cfg(all(test, feature = "proptest"))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bronze_losses_never_cost(opp in 0usize..6, margin in 0.0f64..5000.0, streak in -50i32..50) {
            let policy = HardPointsPolicy::default();
            let ctx = MatchContext {
                player_segment: SegmentName::Bronze,
                opponent_segment: SegmentName::ALL[opp],
                player_score: 0.0,
                opponent_score: margin,
                is_win: false,
                player_streak: streak,
                match_type: MatchType::Ranked,
            };
            prop_assert_eq!(policy.calculate(&ctx).delta, 0);
        }
    }
}

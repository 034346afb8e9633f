//! Progression ledger: point/SP deltas after a match and the segment
//! transitions they cause.

pub mod hard_points;
pub mod policy;
pub mod rank_points;
pub mod soft_sp;
pub mod transition;

pub use hard_points::HardPointsPolicy;
pub use policy::{DeltaReason, MatchContext, MatchType, ProgressionDelta, ProgressionPolicy};
pub use rank_points::RankPointAllocator;
pub use soft_sp::{
    InactivityPenalty, MaintenanceCheck, MaintenanceReward, PromotionCheck, ReturnReward,
    SoftSpPolicy,
};
pub use transition::{SegmentTransitionManager, TransitionKind, TransitionOutcome};

use crate::config::{EngineConfig, ProgressionMode};

/// The active economy, picked from `progression.mode`
#[derive(Debug, Clone)]
pub enum ProgressionLedger {
    HardPoints(HardPointsPolicy),
    SoftSp(SoftSpPolicy),
}

impl ProgressionLedger {
    pub fn from_config(config: &EngineConfig) -> Self {
        match config.progression.mode {
            ProgressionMode::HardPoints => {
                ProgressionLedger::HardPoints(HardPointsPolicy::new(&config.progression))
            }
            ProgressionMode::SoftSp => {
                ProgressionLedger::SoftSp(SoftSpPolicy::new(&config.progression, &config.segments))
            }
        }
    }

    pub fn policy(&self) -> &dyn ProgressionPolicy {
        match self {
            ProgressionLedger::HardPoints(p) => p,
            ProgressionLedger::SoftSp(p) => p,
        }
    }

    pub fn calculate(&self, ctx: &MatchContext) -> ProgressionDelta {
        self.policy().calculate(ctx)
    }

    /// Soft-only mechanics (inactivity, return reward, maintenance)
    pub fn soft(&self) -> Option<&SoftSpPolicy> {
        match self {
            ProgressionLedger::SoftSp(p) => Some(p),
            ProgressionLedger::HardPoints(_) => None,
        }
    }
}

//! Segment state machine.
//!
//! Applies cumulative-score deltas, decides promotion or demotion against
//! the segment bands and keeps the protection bookkeeping. This is the
//! only producer of `SegmentChangeRecord`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ProtectionConfig, ProtectionDecay, SegmentTable};
use crate::error::{RankError, RankResult};
use crate::models::{ChangeType, PlayerProtectionStatus, SegmentChangeRecord};
use crate::segment::SegmentName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Hold,
    Promotion,
    Demotion,
    DemotionSuppressed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub kind: TransitionKind,
    pub from: SegmentName,
    pub to: SegmentName,
    pub points_before: i64,
    pub points_after: i64,
    /// The raw total was negative and was clamped to 0
    pub clamped: bool,
    pub level_decayed: bool,
    pub record: Option<SegmentChangeRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentTransitionManager {
    table: SegmentTable,
    protection: ProtectionConfig,
}

impl SegmentTransitionManager {
    pub fn new(table: SegmentTable, protection: ProtectionConfig) -> Self {
        Self { table, protection }
    }

    pub fn apply_delta(
        &self,
        status: &mut PlayerProtectionStatus,
        delta: i64,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> RankResult<TransitionOutcome> {
        let before = status.segment_points;
        let raw = before.saturating_add(delta);
        let clamped = raw < 0;
        let after = if clamped {
            warn!(uid = %status.uid, before, delta, "cumulative score would go negative, clamped to 0");
            0
        } else {
            raw
        };

        let current = status.segment_name;
        let target = self.table.segment_for_points(after);

        if target > current {
            let profile = self.table.get(target)?;
            status.segment_points = after;
            status.enter_segment(profile, now);
            status.protection_level = 0;
            status.protection_matches_remaining = profile.protection.promotion_stability_period;
            info!(uid = %status.uid, from = %current, to = %target, points = after, "promoted");

            let record = self.change_record(
                status,
                current,
                target,
                ChangeType::Promotion,
                profile.band.min,
                match_id,
                now,
            );
            return Ok(self.outcome(
                TransitionKind::Promotion,
                current,
                target,
                before,
                after,
                clamped,
                false,
                Some(record),
            ));
        }

        if target < current {
            let can_suppress = status.protection_matches_remaining > 0
                && status.protection_level < self.protection.max_level;
            if can_suppress {
                status.segment_points = before;
                status.protection_matches_remaining -= 1;
                status.protection_level += 1;
                status.stable_matches = 0;
                info!(
                    uid = %status.uid,
                    segment = %current,
                    remaining = status.protection_matches_remaining,
                    level = status.protection_level,
                    "demotion suppressed"
                );
                return Ok(self.outcome(
                    TransitionKind::DemotionSuppressed,
                    current,
                    current,
                    before,
                    before,
                    clamped,
                    false,
                    None,
                ));
            }

            let floor = self.table.get(current)?.band.min;
            let record = self.demote(status, target, after, floor, match_id, now)?;
            return Ok(self.outcome(
                TransitionKind::Demotion,
                current,
                target,
                before,
                after,
                clamped,
                false,
                Some(record),
            ));
        }

        status.segment_points = after;
        status.stable_matches = status.stable_matches.saturating_add(1);
        let level_decayed = self.maybe_decay(status);
        Ok(self.outcome(
            TransitionKind::Hold,
            current,
            current,
            before,
            after,
            clamped,
            level_decayed,
            None,
        ))
    }

    /// Demotion decided outside the band check (master maintenance).
    /// Bypasses protection.
    pub fn force_demotion(
        &self,
        status: &mut PlayerProtectionStatus,
        to: SegmentName,
        new_points: i64,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> RankResult<TransitionOutcome> {
        let current = status.segment_name;
        if to >= current {
            return Err(RankError::Validation(format!(
                "cannot demote {} from {} to {}",
                status.uid, current, to
            )));
        }
        let before = status.segment_points;
        let clamped = new_points < 0;
        if clamped {
            warn!(uid = %status.uid, new_points, "forced demotion score clamped to 0");
        }
        let after = new_points.max(0);
        let record = self.demote(status, to, after, before - after, match_id, now)?;
        Ok(self.outcome(
            TransitionKind::Demotion,
            current,
            to,
            before,
            after,
            clamped,
            false,
            Some(record),
        ))
    }

    fn demote(
        &self,
        status: &mut PlayerProtectionStatus,
        to: SegmentName,
        points: i64,
        points_consumed: i64,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> RankResult<SegmentChangeRecord> {
        let from = status.segment_name;
        let profile = self.table.get(to)?;
        status.segment_points = points;
        status.enter_segment(profile, now);
        status.protection_level = self.protection.demotion_level;
        status.protection_matches_remaining = 0;
        info!(uid = %status.uid, %from, %to, points, "demoted");
        Ok(self.change_record(status, from, to, ChangeType::Demotion, points_consumed, match_id, now))
    }

    fn maybe_decay(&self, status: &mut PlayerProtectionStatus) -> bool {
        if self.protection.decay != ProtectionDecay::Automatic
            || status.protection_level == 0
            || status.demotion_grace_period == 0
            || status.stable_matches < status.demotion_grace_period
        {
            return false;
        }
        status.protection_level -= 1;
        status.stable_matches = 0;
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn change_record(
        &self,
        status: &PlayerProtectionStatus,
        from: SegmentName,
        to: SegmentName,
        change_type: ChangeType,
        points_consumed: i64,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> SegmentChangeRecord {
        SegmentChangeRecord {
            uid: status.uid.clone(),
            old_segment: from,
            new_segment: to,
            change_type,
            points_consumed,
            match_id: match_id.to_string(),
            created_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn outcome(
        &self,
        kind: TransitionKind,
        from: SegmentName,
        to: SegmentName,
        points_before: i64,
        points_after: i64,
        clamped: bool,
        level_decayed: bool,
        record: Option<SegmentChangeRecord>,
    ) -> TransitionOutcome {
        TransitionOutcome { kind, from, to, points_before, points_after, clamped, level_decayed, record }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SegmentProfile;
use crate::segment::SegmentName;

/// Segment membership, cumulative score and demotion protection.
///
/// `segment_points` holds hard points or SP depending on the
/// progression mode; it is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProtectionStatus {
    pub uid: String,
    pub segment_name: SegmentName,
    pub segment_points: i64,
    /// 0..=3
    pub protection_level: u8,
    pub protection_threshold: u32,
    pub demotion_grace_period: u32,
    pub promotion_stability_period: u32,
    /// Demotions that can still be suppressed
    pub protection_matches_remaining: u32,
    /// Matches since the last promotion, demotion or suppression
    pub stable_matches: u32,
    pub last_segment_change: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl PlayerProtectionStatus {
    /// Fresh record at the floor of `profile`'s band
    pub fn new(uid: impl Into<String>, profile: &SegmentProfile) -> Self {
        Self {
            uid: uid.into(),
            segment_name: profile.segment,
            segment_points: profile.band.min.max(0),
            protection_level: 0,
            protection_threshold: profile.protection.protection_threshold,
            demotion_grace_period: profile.protection.demotion_grace_period,
            promotion_stability_period: profile.protection.promotion_stability_period,
            protection_matches_remaining: profile.protection.promotion_stability_period,
            stable_matches: 0,
            last_segment_change: None,
            last_activity_at: None,
        }
    }

    /// Adopt the constants of a new segment
    pub fn enter_segment(&mut self, profile: &SegmentProfile, now: DateTime<Utc>) {
        self.segment_name = profile.segment;
        self.protection_threshold = profile.protection.protection_threshold;
        self.demotion_grace_period = profile.protection.demotion_grace_period;
        self.promotion_stability_period = profile.protection.promotion_stability_period;
        self.stable_matches = 0;
        self.last_segment_change = Some(now);
    }

    pub fn is_protected(&self) -> bool {
        self.protection_matches_remaining > 0
    }
}

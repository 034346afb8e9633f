//! Append-only audit logs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::segment::SegmentName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Promotion,
    Demotion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChangeRecord {
    pub uid: String,
    pub old_segment: SegmentName,
    pub new_segment: SegmentName,
    pub change_type: ChangeType,
    pub points_consumed: i64,
    pub match_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchRecord {
    pub match_id: String,
    pub uid: String,
    pub score: f64,
    pub rank: u32,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

impl PlayerMatchRecord {
    pub fn is_win(&self) -> bool {
        self.rank == 1
    }
}

//! 플레이어 상태 저장소 경계
//!
//! The engine keeps no player state of its own. Everything is read from
//! and written back to a [`PlayerStore`], keyed by UID. Reads and writes
//! are the only suspension points of the match pipeline.
//!
//! Single-document operations cover ad-hoc tooling. The pipeline itself
//! goes through [`PlayerStore::load_snapshot`] and [`PlayerStore::commit`],
//! which give per-player read-modify-write atomicity through an
//! optimistic revision number.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RankResult;
use crate::models::{
    PlayerMatchRecord, PlayerPerformanceMetrics, PlayerProtectionStatus,
    PlayerScoreThresholdConfig, SegmentChangeRecord,
};

/// Everything stored for one player, read at a single revision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub config: Option<PlayerScoreThresholdConfig>,
    pub metrics: Option<PlayerPerformanceMetrics>,
    pub protection: Option<PlayerProtectionStatus>,
    /// 0 for a player that has never been written
    pub revision: u64,
}

impl PlayerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.config.is_none() && self.metrics.is_none() && self.protection.is_none()
    }
}

/// All writes produced by one match event. Applied in full or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerWriteBatch {
    pub uid: String,
    /// Revision the batch was computed from
    pub expected_revision: u64,
    pub config: PlayerScoreThresholdConfig,
    pub metrics: PlayerPerformanceMetrics,
    pub protection: PlayerProtectionStatus,
    pub match_records: Vec<PlayerMatchRecord>,
    pub change_records: Vec<SegmentChangeRecord>,
}

#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn load_player_config(&self, uid: &str) -> RankResult<Option<PlayerScoreThresholdConfig>>;

    /// Saving a document equal to the stored one is a no-op
    async fn save_player_config(&self, config: &PlayerScoreThresholdConfig) -> RankResult<()>;

    async fn load_performance_metrics(&self, uid: &str) -> RankResult<Option<PlayerPerformanceMetrics>>;

    async fn save_performance_metrics(&self, uid: &str, metrics: &PlayerPerformanceMetrics) -> RankResult<()>;

    async fn load_protection_status(&self, uid: &str) -> RankResult<Option<PlayerProtectionStatus>>;

    async fn save_protection_status(&self, uid: &str, status: &PlayerProtectionStatus) -> RankResult<()>;

    async fn append_match_record(&self, record: &PlayerMatchRecord) -> RankResult<()>;

    async fn append_segment_change_record(&self, record: &SegmentChangeRecord) -> RankResult<()>;

    /// Newest first, at most `limit`
    async fn recent_matches(&self, uid: &str, limit: usize) -> RankResult<Vec<PlayerMatchRecord>>;

    /// Oldest first
    async fn segment_changes(&self, uid: &str) -> RankResult<Vec<SegmentChangeRecord>>;

    async fn load_snapshot(&self, uid: &str) -> RankResult<PlayerSnapshot>;

    /// Apply `batch` iff the stored revision still equals
    /// `batch.expected_revision`. Returns the new revision, or
    /// `RankError::Conflict` when another write got there first.
    async fn commit(&self, batch: PlayerWriteBatch) -> RankResult<u64>;
}

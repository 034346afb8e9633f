//! In-process store for tests, simulations and the CLI

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{PlayerSnapshot, PlayerStore, PlayerWriteBatch};
use crate::error::{RankError, RankResult};
use crate::models::{
    PlayerMatchRecord, PlayerPerformanceMetrics, PlayerProtectionStatus,
    PlayerScoreThresholdConfig, SegmentChangeRecord,
};

#[derive(Debug, Default)]
struct PlayerEntry {
    config: Option<PlayerScoreThresholdConfig>,
    metrics: Option<PlayerPerformanceMetrics>,
    protection: Option<PlayerProtectionStatus>,
    matches: Vec<PlayerMatchRecord>,
    changes: Vec<SegmentChangeRecord>,
    revision: u64,
}

/// Replaces `slot` when `value` differs. Returns whether anything changed.
fn replace_if_changed<T: PartialEq + Clone>(slot: &mut Option<T>, value: &T) -> bool {
    if slot.as_ref() == Some(value) {
        return false;
    }
    *slot = Some(value.clone());
    true
}

fn check_uid(expected: &str, found: &str) -> RankResult<()> {
    if expected != found {
        return Err(RankError::Validation(format!(
            "record for {} saved under {}",
            found, expected
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    players: Mutex<HashMap<String, PlayerEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RankResult<MutexGuard<'_, HashMap<String, PlayerEntry>>> {
        self.players
            .lock()
            .map_err(|_| RankError::Storage("memory store lock poisoned".into()))
    }

    pub fn player_count(&self) -> RankResult<usize> {
        Ok(self.lock()?.len())
    }

    /// Current revision for `uid` (0 if never written)
    pub fn revision(&self, uid: &str) -> RankResult<u64> {
        Ok(self.lock()?.get(uid).map(|e| e.revision).unwrap_or(0))
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn load_player_config(&self, uid: &str) -> RankResult<Option<PlayerScoreThresholdConfig>> {
        Ok(self.lock()?.get(uid).and_then(|e| e.config.clone()))
    }

    async fn save_player_config(&self, config: &PlayerScoreThresholdConfig) -> RankResult<()> {
        config.validate()?;
        let mut players = self.lock()?;
        let entry = players.entry(config.uid.clone()).or_default();
        if replace_if_changed(&mut entry.config, config) {
            entry.revision += 1;
        }
        Ok(())
    }

    async fn load_performance_metrics(&self, uid: &str) -> RankResult<Option<PlayerPerformanceMetrics>> {
        Ok(self.lock()?.get(uid).and_then(|e| e.metrics.clone()))
    }

    async fn save_performance_metrics(&self, uid: &str, metrics: &PlayerPerformanceMetrics) -> RankResult<()> {
        check_uid(uid, &metrics.uid)?;
        let mut players = self.lock()?;
        let entry = players.entry(uid.to_string()).or_default();
        if replace_if_changed(&mut entry.metrics, metrics) {
            entry.revision += 1;
        }
        Ok(())
    }

    async fn load_protection_status(&self, uid: &str) -> RankResult<Option<PlayerProtectionStatus>> {
        Ok(self.lock()?.get(uid).and_then(|e| e.protection.clone()))
    }

    async fn save_protection_status(&self, uid: &str, status: &PlayerProtectionStatus) -> RankResult<()> {
        check_uid(uid, &status.uid)?;
        let mut players = self.lock()?;
        let entry = players.entry(uid.to_string()).or_default();
        if replace_if_changed(&mut entry.protection, status) {
            entry.revision += 1;
        }
        Ok(())
    }

    async fn append_match_record(&self, record: &PlayerMatchRecord) -> RankResult<()> {
        let mut players = self.lock()?;
        let entry = players.entry(record.uid.clone()).or_default();
        entry.matches.push(record.clone());
        entry.revision += 1;
        Ok(())
    }

    async fn append_segment_change_record(&self, record: &SegmentChangeRecord) -> RankResult<()> {
        let mut players = self.lock()?;
        let entry = players.entry(record.uid.clone()).or_default();
        entry.changes.push(record.clone());
        entry.revision += 1;
        Ok(())
    }

    async fn recent_matches(&self, uid: &str, limit: usize) -> RankResult<Vec<PlayerMatchRecord>> {
        let players = self.lock()?;
        Ok(players
            .get(uid)
            .map(|e| e.matches.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn segment_changes(&self, uid: &str) -> RankResult<Vec<SegmentChangeRecord>> {
        Ok(self.lock()?.get(uid).map(|e| e.changes.clone()).unwrap_or_default())
    }

    async fn load_snapshot(&self, uid: &str) -> RankResult<PlayerSnapshot> {
        let players = self.lock()?;
        Ok(players
            .get(uid)
            .map(|e| PlayerSnapshot {
                config: e.config.clone(),
                metrics: e.metrics.clone(),
                protection: e.protection.clone(),
                revision: e.revision,
            })
            .unwrap_or_default())
    }

    async fn commit(&self, batch: PlayerWriteBatch) -> RankResult<u64> {
        check_uid(&batch.uid, &batch.config.uid)?;
        check_uid(&batch.uid, &batch.metrics.uid)?;
        check_uid(&batch.uid, &batch.protection.uid)?;
        batch.config.validate()?;

        let mut players = self.lock()?;
        let entry = players.entry(batch.uid.clone()).or_default();
        if entry.revision != batch.expected_revision {
            return Err(RankError::Conflict {
                uid: batch.uid,
                expected: batch.expected_revision,
                found: entry.revision,
            });
        }

        entry.config = Some(batch.config);
        entry.metrics = Some(batch.metrics);
        entry.protection = Some(batch.protection);
        entry.matches.extend(batch.match_records);
        entry.changes.extend(batch.change_records);
        entry.revision += 1;
        debug!(uid = %batch.uid, revision = entry.revision, "player batch committed");
        Ok(entry.revision)
    }
}

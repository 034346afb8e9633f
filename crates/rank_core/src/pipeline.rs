//! Match completion pipeline.
//!
//! One report drives one sequential pass for one player:
//! settlement → tracker → calibrator → ledger → transition, followed by a
//! single atomic commit. A concurrent write for the same player makes the
//! commit fail with `Conflict`, in which case the whole pass is recomputed
//! from a fresh snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{RankError, RankResult};
use crate::models::{
    PlayerMatchRecord, PlayerPerformanceMetrics, PlayerProtectionStatus,
    PlayerScoreThresholdConfig,
};
use crate::performance::{AdaptiveCalibrator, CalibrationOutcome, PerformanceTracker};
use crate::progression::{
    InactivityPenalty, MaintenanceCheck, MatchContext, MatchType, ProgressionDelta,
    ProgressionLedger, RankPointAllocator, ReturnReward, SegmentTransitionManager,
    TransitionOutcome,
};
use crate::segment::SegmentName;
use crate::store::{PlayerSnapshot, PlayerStore, PlayerWriteBatch};

pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// A finished match as reported by the submission handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub match_id: String,
    pub uid: String,
    /// Starting segment for a player with no stored state
    #[serde(default)]
    pub segment_hint: Option<SegmentName>,
    pub score: f64,
    /// 1-based finishing position
    pub rank: u32,
    /// Match points. Allocated from `rank` when absent.
    #[serde(default)]
    pub points: Option<i64>,
    /// Defaults to the player's own segment
    #[serde(default)]
    pub opponent_segment: Option<SegmentName>,
    /// Defaults to the player's score (zero margin)
    #[serde(default)]
    pub opponent_score: Option<f64>,
    #[serde(default)]
    pub match_type: MatchType,
    pub played_at: DateTime<Utc>,
}

impl MatchReport {
    pub fn new(uid: impl Into<String>, score: f64, rank: u32, played_at: DateTime<Utc>) -> Self {
        Self {
            match_id: Self::generate_match_id(),
            uid: uid.into(),
            segment_hint: None,
            score,
            rank,
            points: None,
            opponent_segment: None,
            opponent_score: None,
            match_type: MatchType::Normal,
            played_at,
        }
    }

    pub fn generate_match_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn validate(&self) -> RankResult<()> {
        if self.uid.trim().is_empty() {
            return Err(RankError::Validation("match report has an empty uid".into()));
        }
        if self.match_id.trim().is_empty() {
            return Err(RankError::Validation(format!("{}: empty match id", self.uid)));
        }
        if self.rank == 0 {
            return Err(RankError::Validation(format!(
                "{}: rank must be >= 1 (match {})",
                self.uid, self.match_id
            )));
        }
        if !self.score.is_finite() || self.opponent_score.is_some_and(|s| !s.is_finite()) {
            return Err(RankError::Validation(format!("{}: score is not finite", self.uid)));
        }
        Ok(())
    }
}

/// Soft-mode adjustments settled before the match itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub inactivity: Option<InactivityPenalty>,
    pub return_reward: Option<ReturnReward>,
}

impl Settlement {
    pub fn delta(&self) -> i64 {
        let penalty = self.inactivity.as_ref().map(|p| p.penalty).unwrap_or(0);
        let reward = self.return_reward.as_ref().map(|r| r.sp).unwrap_or(0);
        reward - penalty
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub match_id: String,
    pub uid: String,
    pub delta: ProgressionDelta,
    pub settlement: Settlement,
    pub transition: TransitionOutcome,
    pub learning_rate: CalibrationOutcome,
    pub metrics: PlayerPerformanceMetrics,
    pub protection: PlayerProtectionStatus,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceOutcome {
    pub uid: String,
    pub check: MaintenanceCheck,
    pub transition: Option<TransitionOutcome>,
    pub revision: u64,
}

/// Player state with defaults filled in for anything missing
struct PlayerState {
    config: PlayerScoreThresholdConfig,
    metrics: PlayerPerformanceMetrics,
    protection: PlayerProtectionStatus,
    revision: u64,
}

pub struct MatchPipeline<S: PlayerStore> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: PlayerStore> MatchPipeline<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn process_match(&self, report: &MatchReport) -> RankResult<MatchOutcome> {
        report.validate()?;

        let mut attempt = 1;
        loop {
            match self.try_process(report).await {
                Err(RankError::Conflict { uid, expected, found }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(%uid, match_id = %report.match_id, expected, found, attempt, "commit conflict, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Reports for distinct players run concurrently, reports for the same
    /// player in input order. Results come back in input order.
    pub async fn process_batch(&self, reports: &[MatchReport]) -> Vec<RankResult<MatchOutcome>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_uid: HashMap<&str, usize> = HashMap::new();
        for (idx, report) in reports.iter().enumerate() {
            let group = *by_uid.entry(report.uid.as_str()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(idx);
        }

        let runs = groups.into_iter().map(|indices| async move {
            let mut results = Vec::with_capacity(indices.len());
            for idx in indices {
                results.push((idx, self.process_match(&reports[idx]).await));
            }
            results
        });

        let mut flat: Vec<(usize, RankResult<MatchOutcome>)> =
            join_all(runs).await.into_iter().flatten().collect();
        flat.sort_by_key(|(idx, _)| *idx);
        flat.into_iter().map(|(_, result)| result).collect()
    }

    /// Weekly master check. SP failure demotes through the transition
    /// manager, a kept quota pays the maintenance reward.
    pub async fn run_master_maintenance(
        &self,
        uid: &str,
        weekly_tournaments: u32,
        now: DateTime<Utc>,
    ) -> RankResult<MaintenanceOutcome> {
        let ledger = ProgressionLedger::from_config(&self.config);
        let soft = ledger.soft().ok_or_else(|| {
            RankError::Configuration("master maintenance needs the soft SP progression mode".into())
        })?;

        let mut attempt = 1;
        loop {
            let snapshot = self.store.load_snapshot(uid).await?;
            let Some(protection) = snapshot.protection.as_ref() else {
                return Err(RankError::NotFound(format!("no progression state for {}", uid)));
            };
            let check = soft.check_master_maintenance(
                protection.segment_name,
                protection.segment_points,
                weekly_tournaments,
            );
            if !check.applicable {
                return Err(RankError::Validation(format!(
                    "{} is {}, maintenance only applies to master",
                    uid, protection.segment_name
                )));
            }

            let mut state = self.state_from(uid, snapshot, None, now)?;
            let manager = self.transition_manager();
            let match_id = format!("maintenance-{}", MatchReport::generate_match_id());

            let transition = if check.demotion_required {
                let to = check.new_segment.ok_or_else(|| {
                    RankError::InvariantViolation(format!("{}: demotion without a target segment", uid))
                })?;
                Some(manager.force_demotion(&mut state.protection, to, check.new_sp, &match_id, now)?)
            } else if let Some(reward) = check.reward.as_ref() {
                Some(manager.apply_delta(&mut state.protection, reward.sp, &match_id, now)?)
            } else {
                None
            };

            let Some(transition) = transition else {
                info!(%uid, reason = %check.reason, "master maintenance: nothing to write");
                return Ok(MaintenanceOutcome { uid: uid.to_string(), check, transition: None, revision: state.revision });
            };

            self.reseed_on_change(&mut state, &transition, now)?;
            let batch = PlayerWriteBatch {
                uid: uid.to_string(),
                expected_revision: state.revision,
                config: state.config,
                metrics: state.metrics,
                protection: state.protection,
                match_records: Vec::new(),
                change_records: transition.record.iter().cloned().collect(),
            };

            match self.store.commit(batch).await {
                Ok(revision) => {
                    info!(%uid, reason = %check.reason, kind = ?transition.kind, "master maintenance applied");
                    return Ok(MaintenanceOutcome {
                        uid: uid.to_string(),
                        check,
                        transition: Some(transition),
                        revision,
                    });
                }
                Err(RankError::Conflict { expected, found, .. }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(%uid, expected, found, attempt, "maintenance commit conflict, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_process(&self, report: &MatchReport) -> RankResult<MatchOutcome> {
        let snapshot = self.store.load_snapshot(&report.uid).await?;
        let mut state = self.state_from(&report.uid, snapshot, report.segment_hint, report.played_at)?;
        let ledger = ProgressionLedger::from_config(&self.config);

        // soft-mode inactivity settlement, from the previous activity stamp
        let mut settlement = Settlement::default();
        if let (Some(soft), Some(last)) = (ledger.soft(), state.protection.last_activity_at) {
            let days = (report.played_at - last).num_days().max(0);
            settlement.inactivity = soft.inactivity_penalty(
                state.protection.segment_name,
                state.protection.segment_points,
                days,
            )?;
            settlement.return_reward = soft.return_reward(days);
        }

        let streak_before = state.metrics.signed_streak();
        let points = report.points.unwrap_or_else(|| {
            RankPointAllocator::new(self.config.progression.rank_points.clone())
                .points_for(report.rank, streak_before)
        });
        let tracked = PerformanceTracker::new().record_match(
            &mut state.metrics,
            report.score,
            report.rank,
            points,
            report.played_at,
        )?;

        let base_rate = self.config.segments.get(state.config.segment_name)?.learning_rate;
        let learning_rate = AdaptiveCalibrator::new(self.config.calibration.clone()).recalibrate(
            &mut state.config,
            &state.metrics,
            base_rate,
        );

        let player_segment = state.protection.segment_name;
        let ctx = MatchContext {
            player_segment,
            opponent_segment: report.opponent_segment.unwrap_or(player_segment),
            player_score: report.score,
            opponent_score: report.opponent_score.unwrap_or(report.score),
            is_win: tracked.is_win,
            player_streak: tracked.streak_before,
            match_type: report.match_type,
        };
        let delta = ledger.calculate(&ctx);

        let transition = self.transition_manager().apply_delta(
            &mut state.protection,
            delta.delta + settlement.delta(),
            &report.match_id,
            report.played_at,
        )?;
        self.reseed_on_change(&mut state, &transition, report.played_at)?;
        state.protection.last_activity_at = Some(report.played_at);

        let record = PlayerMatchRecord {
            match_id: report.match_id.clone(),
            uid: report.uid.clone(),
            score: report.score,
            rank: report.rank,
            points,
            created_at: report.played_at,
        };
        let batch = PlayerWriteBatch {
            uid: report.uid.clone(),
            expected_revision: state.revision,
            config: state.config,
            metrics: state.metrics.clone(),
            protection: state.protection.clone(),
            match_records: vec![record],
            change_records: transition.record.iter().cloned().collect(),
        };
        let revision = self.store.commit(batch).await?;

        info!(
            uid = %report.uid,
            match_id = %report.match_id,
            delta = delta.delta,
            reason = %delta.reason,
            segment = %state.protection.segment_name,
            points = state.protection.segment_points,
            "match processed"
        );

        Ok(MatchOutcome {
            match_id: report.match_id.clone(),
            uid: report.uid.clone(),
            delta,
            settlement,
            transition,
            learning_rate,
            metrics: state.metrics,
            protection: state.protection,
            revision,
        })
    }

    fn transition_manager(&self) -> SegmentTransitionManager {
        SegmentTransitionManager::new(self.config.segments.clone(), self.config.protection.clone())
    }

    /// Fill in missing documents. A player with no protection record
    /// starts in the segment of their config, else `hint`, else bronze.
    fn state_from(
        &self,
        uid: &str,
        snapshot: PlayerSnapshot,
        hint: Option<SegmentName>,
        now: DateTime<Utc>,
    ) -> RankResult<PlayerState> {
        if snapshot.is_empty() {
            info!(%uid, segment = %hint.unwrap_or_default(), "no stored state, initializing player");
        }
        let PlayerSnapshot { config, metrics, protection, revision } = snapshot;

        let segment = protection
            .as_ref()
            .map(|p| p.segment_name)
            .or_else(|| config.as_ref().map(|c| c.segment_name))
            .or(hint)
            .unwrap_or_default();
        let profile = self.config.segments.get(segment)?;

        let protection = protection.unwrap_or_else(|| PlayerProtectionStatus::new(uid, profile));
        let mut config = config.unwrap_or_else(|| PlayerScoreThresholdConfig::from_segment(uid, profile, now));
        if config.segment_name != segment {
            warn!(%uid, config_segment = %config.segment_name, %segment, "threshold config out of sync, reseeding");
            config.reseed_for_segment(profile, now);
        }

        let mut metrics = metrics.unwrap_or_else(|| PlayerPerformanceMetrics::new(uid, now));
        if let Err(e) = metrics.check_streaks() {
            warn!(%uid, error = %e, "performance counters inconsistent, repairing");
            metrics.repair_counters();
        }

        Ok(PlayerState { config, metrics, protection, revision })
    }

    fn reseed_on_change(
        &self,
        state: &mut PlayerState,
        transition: &TransitionOutcome,
        now: DateTime<Utc>,
    ) -> RankResult<()> {
        if transition.to != state.config.segment_name {
            let profile = self.config.segments.get(transition.to)?;
            state.config.reseed_for_segment(profile, now);
        }
        Ok(())
    }
}

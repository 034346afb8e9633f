//! rankctl library
//!
//! 설정 로딩과 오프라인 시뮬레이션 (MemoryStore 기반)

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rank_core::config::SegmentProfile;
use rank_core::progression::TransitionKind;
use rank_core::{
    EngineConfig, HumanPlayer, MatchPipeline, MatchReport, MemoryStore, PlayerStore,
    RankRecommendationEngine, SegmentName,
};

/// Resolve the effective configuration.
///
/// A config file wins over a profile name; with neither, `RANK_PROFILE`
/// decides.
pub fn load_config(path: Option<&Path>, profile: Option<&str>) -> Result<EngineConfig> {
    if let Some(path) = path {
        return EngineConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()));
    }
    match profile {
        None => Ok(EngineConfig::from_env_or_default()),
        Some("standard") => Ok(EngineConfig::standard()),
        Some("lenient") => Ok(EngineConfig::lenient()),
        Some("strict") => Ok(EngineConfig::strict()),
        Some(other) => bail!("Unknown profile '{}' (expected standard, lenient or strict)", other),
    }
}

/// Simulation result for one synthetic player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub matches: u32,
    pub wins: u32,
    pub promotions: u32,
    pub demotions: u32,
    pub suppressed_demotions: u32,
    pub start_segment: SegmentName,
    pub final_segment: SegmentName,
    pub final_points: i64,
    pub final_learning_rate: f64,
    pub segment_path: Vec<SegmentName>,
}

/// Score range covered by the segment's bands
fn score_range(profile: &SegmentProfile) -> (f64, f64) {
    let lo = profile.thresholds.iter().map(|t| t.min_score).fold(f64::INFINITY, f64::min);
    let hi = profile.thresholds.iter().map(|t| t.max_score).fold(f64::NEG_INFINITY, f64::max);
    if lo.is_finite() && hi.is_finite() {
        (lo, hi)
    } else {
        (0.0, 1000.0)
    }
}

/// Play `matches` single-human matches end to end: recommendation, then
/// the match pipeline with the recommended rank as the result.
pub async fn simulate(
    config: EngineConfig,
    start: SegmentName,
    matches: u32,
    seed: u64,
) -> Result<SimulationSummary> {
    let store = Arc::new(MemoryStore::new());
    let pipeline = MatchPipeline::new(store.clone(), config.clone());
    let mut engine = RankRecommendationEngine::seeded(&config, seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

    let uid = "sim-player";
    let base = Utc::now();
    let mut summary = SimulationSummary {
        seed,
        matches,
        wins: 0,
        promotions: 0,
        demotions: 0,
        suppressed_demotions: 0,
        start_segment: start,
        final_segment: start,
        final_points: 0,
        final_learning_rate: config.segments.get(start)?.learning_rate,
        segment_path: vec![start],
    };

    for i in 0..matches {
        let segment = store
            .load_protection_status(uid)
            .await?
            .map(|s| s.segment_name)
            .unwrap_or(start);
        let profile = config.segments.get(segment)?;
        let (lo, hi) = score_range(profile);
        let score = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        let ai_count = profile.max_rank.saturating_sub(1).max(1) as i64;

        let rankings = engine
            .generate_match_rankings(store.as_ref(), &[HumanPlayer::new(uid, score)], ai_count, start)
            .await?;
        let rank = rankings
            .human_players
            .first()
            .map(|h| h.recommended_rank)
            .context("recommendation returned no human player")?;
        let best_ai = rankings.ai_opponents.iter().map(|a| a.score).fold(f64::NEG_INFINITY, f64::max);

        let mut report = MatchReport::new(uid, score, rank as u32, base + Duration::hours(i as i64));
        report.segment_hint = Some(start);
        report.opponent_score = best_ai.is_finite().then_some(best_ai);

        let outcome = pipeline
            .process_match(&report)
            .await
            .with_context(|| format!("match {} of {} failed", i + 1, matches))?;
        debug!(match_no = i + 1, rank, delta = outcome.delta.delta, "simulated match");

        if rank == 1 {
            summary.wins += 1;
        }
        match outcome.transition.kind {
            TransitionKind::Promotion => summary.promotions += 1,
            TransitionKind::Demotion => summary.demotions += 1,
            TransitionKind::DemotionSuppressed => summary.suppressed_demotions += 1,
            TransitionKind::Hold => {}
        }
        if outcome.transition.from != outcome.transition.to {
            summary.segment_path.push(outcome.transition.to);
        }
        summary.final_segment = outcome.protection.segment_name;
        summary.final_points = outcome.protection.segment_points;
    }

    if let Some(player) = store.load_player_config(uid).await? {
        summary.final_learning_rate = player.learning_rate;
    }
    Ok(summary)
}

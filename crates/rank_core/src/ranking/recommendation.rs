//! Target-rank recommendation for a match field.
//!
//! One human against AI opponents: the rank is sampled from the player's
//! segment distribution and synthetic opponents are generated to realize
//! it. Several humans in one field: scores alone decide the order.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::opponent_generator::SyntheticOpponentGenerator;
use super::probability_table::ProbabilityTable;
use crate::config::{EngineConfig, RankingConfig};
use crate::error::{RankError, RankResult};
use crate::models::{PlayerMatchRecord, PlayerPerformanceMetrics, PlayerScoreThresholdConfig};
use crate::segment::SegmentName;
use crate::store::PlayerStore;

/// Largest field (humans + AI) a single recommendation accepts
pub const MAX_FIELD_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanPlayer {
    pub uid: String,
    pub score: f64,
}

impl HumanPlayer {
    pub fn new(uid: impl Into<String>, score: f64) -> Self {
        Self { uid: uid.into(), score }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativePerformance {
    Excelling,
    Average,
    Struggling,
}

impl RelativePerformance {
    pub fn as_str(self) -> &'static str {
        match self {
            RelativePerformance::Excelling => "excelling",
            RelativePerformance::Average => "average",
            RelativePerformance::Struggling => "struggling",
        }
    }
}

/// Everything the engine needs to know about one human
#[derive(Debug, Clone)]
pub struct PlayerContext {
    pub config: PlayerScoreThresholdConfig,
    pub metrics: PlayerPerformanceMetrics,
    /// Newest first
    pub recent_matches: Vec<PlayerMatchRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanRankRecommendation {
    pub uid: String,
    pub recommended_rank: usize,
    pub confidence: f64,
    pub relative_performance: RelativePerformance,
    pub reasoning: String,
    pub used_segment_probability: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiOpponent {
    pub ai_id: String,
    pub score: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRankingResult {
    pub human_players: Vec<HumanRankRecommendation>,
    pub ai_opponents: Vec<AiOpponent>,
    pub total_participants: usize,
    pub used_segment_probability: bool,
}

pub struct RankRecommendationEngine<R: Rng = ChaCha8Rng> {
    table: ProbabilityTable,
    generator: SyntheticOpponentGenerator,
    config: RankingConfig,
    rng: R,
}

impl RankRecommendationEngine<ChaCha8Rng> {
    /// Reproducible engine (same seed = same recommendations)
    pub fn seeded(config: &EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy(config: &EngineConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> RankRecommendationEngine<R> {
    pub fn with_rng(config: &EngineConfig, rng: R) -> Self {
        Self {
            table: ProbabilityTable::new(config.segments.clone(), config.ranking.field_size_policy),
            generator: SyntheticOpponentGenerator::new(&config.ranking),
            config: config.ranking.clone(),
            rng,
        }
    }

    /// Pre-match entry point: loads each human's state from `store`
    /// (read-only) and recommends target ranks. Unknown players are
    /// treated as fresh players of `default_segment`.
    pub async fn generate_match_rankings<S: PlayerStore + ?Sized>(
        &mut self,
        store: &S,
        humans: &[HumanPlayer],
        ai_count: i64,
        default_segment: SegmentName,
    ) -> RankResult<MatchRankingResult> {
        validate_field(humans, ai_count)?;

        let now = chrono::Utc::now();
        let mut players = Vec::with_capacity(humans.len());
        for human in humans {
            let config = match store.load_player_config(&human.uid).await? {
                Some(config) => config,
                None => {
                    let segment = match store.load_protection_status(&human.uid).await? {
                        Some(status) => status.segment_name,
                        None => default_segment,
                    };
                    debug!(uid = %human.uid, %segment, "no threshold config, using segment defaults");
                    let profile = self.table.segments().get(segment)?;
                    PlayerScoreThresholdConfig::from_segment(&human.uid, profile, now)
                }
            };
            let metrics = store
                .load_performance_metrics(&human.uid)
                .await?
                .unwrap_or_else(|| PlayerPerformanceMetrics::new(&human.uid, now));
            let recent_matches = store.recent_matches(&human.uid, self.config.trend_window).await?;
            players.push((human.clone(), PlayerContext { config, metrics, recent_matches }));
        }

        self.recommend(&players, ai_count)
    }

    pub fn recommend(
        &mut self,
        players: &[(HumanPlayer, PlayerContext)],
        ai_count: i64,
    ) -> RankResult<MatchRankingResult> {
        let humans: Vec<HumanPlayer> = players.iter().map(|(h, _)| h.clone()).collect();
        let ai_count = validate_field(&humans, ai_count)?;

        match players {
            [(human, context)] => self.recommend_single(human, context, ai_count),
            _ => Ok(self.recommend_by_score(players, ai_count)),
        }
    }

    fn recommend_single(
        &mut self,
        human: &HumanPlayer,
        context: &PlayerContext,
        ai_count: usize,
    ) -> RankResult<MatchRankingResult> {
        let field_size = ai_count + 1;
        let probs = self.table.lookup_for_field(&context.config, human.score, field_size)?;
        let rank = sample_rank(&mut self.rng, &probs);
        let mass = rank_mass(&probs, rank);

        let ai_scores = self.generator.generate(&mut self.rng, human.score, rank, ai_count, field_size)?;
        let performance = relative_performance(&context.config, human.score);
        let confidence = self.clamp_confidence(0.4 + 0.5 * mass + self.trend_adjustment(context));

        let reasoning = format!(
            "{} segment ranking probability {:.0}% for rank {}/{} (score {:.0}, {} within segment)",
            context.config.segment_name,
            mass * 100.0,
            rank,
            field_size,
            human.score,
            performance.as_str()
        );
        info!(uid = %human.uid, rank, field_size, confidence, "segment probability recommendation");

        let mut ai_sorted = ai_scores;
        ai_sorted.sort_by(|a, b| b.total_cmp(a));
        let ai_opponents = ai_sorted
            .into_iter()
            .enumerate()
            .map(|(i, score)| {
                let position = i + 1;
                AiOpponent {
                    ai_id: format!("ai_{}", position),
                    score,
                    // the human sits at `rank`, AIs from there on shift down one
                    rank: if position < rank { position } else { position + 1 },
                }
            })
            .collect();

        Ok(MatchRankingResult {
            human_players: vec![HumanRankRecommendation {
                uid: human.uid.clone(),
                recommended_rank: rank,
                confidence,
                relative_performance: performance,
                reasoning,
                used_segment_probability: true,
            }],
            ai_opponents,
            total_participants: field_size,
            used_segment_probability: true,
        })
    }

    fn recommend_by_score(
        &mut self,
        players: &[(HumanPlayer, PlayerContext)],
        ai_count: usize,
    ) -> MatchRankingResult {
        let human_scores: Vec<f64> = players.iter().map(|(h, _)| h.score).collect();
        let n = human_scores.len() as f64;
        let mean = human_scores.iter().map(|s| s / n).sum::<f64>();

        // AI filler alternates above and below the human mean
        let mut ai_scores = Vec::with_capacity(ai_count);
        for i in 0..ai_count {
            let offset = if self.config.opponent_offset_max > self.config.opponent_offset_min {
                self.rng.gen_range(self.config.opponent_offset_min..self.config.opponent_offset_max)
            } else {
                self.config.opponent_offset_min
            };
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let mut score = mean + sign * offset;
            // step scales with magnitude so it always moves past a collision
            let step = score.abs().max(1.0) * f64::EPSILON * 4.0;
            while human_scores.iter().any(|h| *h == score) {
                score += sign * step;
            }
            ai_scores.push(score);
        }

        // (score, human index or None for AI)
        let mut field: Vec<(f64, Option<usize>)> = human_scores
            .iter()
            .enumerate()
            .map(|(i, s)| (*s, Some(i)))
            .chain(ai_scores.iter().map(|s| (*s, None)))
            .collect();
        field.sort_by(|a, b| b.0.total_cmp(&a.0));

        // competition ranking: equal scores share the rank of the first of them (1, 1, 3)
        let mut ranks = Vec::with_capacity(field.len());
        for (pos, (score, _)) in field.iter().enumerate() {
            let rank = match pos.checked_sub(1) {
                Some(prev) if field[prev].0 == *score => ranks[prev],
                _ => pos + 1,
            };
            ranks.push(rank);
        }

        let total = field.len();
        let mut human_players = Vec::with_capacity(players.len());
        let mut ai_opponents = Vec::with_capacity(ai_count);
        for (pos, (score, owner)) in field.iter().enumerate() {
            let rank = ranks[pos];
            match owner {
                Some(idx) => {
                    let (human, context) = &players[*idx];
                    let gap = field
                        .iter()
                        .enumerate()
                        .filter(|(other, _)| *other != pos)
                        .map(|(_, (s, _))| (s - score).abs())
                        .fold(f64::INFINITY, f64::min);
                    let gap = if gap.is_finite() { gap } else { 0.0 };
                    let confidence = self.clamp_confidence(
                        0.5 + (gap / 400.0).min(0.4) + self.trend_adjustment(context) / 2.0,
                    );
                    let performance = relative_performance(&context.config, human.score);
                    human_players.push(HumanRankRecommendation {
                        uid: human.uid.clone(),
                        recommended_rank: rank,
                        confidence,
                        relative_performance: performance,
                        reasoning: format!(
                            "ranked {}/{} by score {:.0} against {} human players ({} within segment)",
                            rank,
                            total,
                            human.score,
                            players.len(),
                            performance.as_str()
                        ),
                        used_segment_probability: false,
                    });
                }
                None => ai_opponents.push(AiOpponent {
                    ai_id: format!("ai_{}", ai_opponents.len() + 1),
                    score: *score,
                    rank,
                }),
            }
        }

        // keep request order for humans
        human_players.sort_by_key(|rec| {
            players.iter().position(|(h, _)| h.uid == rec.uid).unwrap_or(usize::MAX)
        });
        debug!(humans = players.len(), total, "score-only ranking");

        MatchRankingResult {
            human_players,
            ai_opponents,
            total_participants: total,
            used_segment_probability: false,
        }
    }

    fn trend_adjustment(&self, context: &PlayerContext) -> f64 {
        let recent: Vec<&PlayerMatchRecord> =
            context.recent_matches.iter().take(self.config.trend_window).collect();
        let mut adjustment = 0.0;
        if !recent.is_empty() {
            let rate = recent.iter().filter(|m| m.is_win()).count() as f64 / recent.len() as f64;
            if rate >= 0.6 {
                adjustment += 0.1;
            } else if rate <= 0.3 {
                adjustment -= 0.1;
            }
        }
        if context.metrics.current_win_streak >= 3 {
            adjustment += 0.05;
        }
        adjustment
    }

    fn clamp_confidence(&self, value: f64) -> f64 {
        value.clamp(self.config.confidence_min, self.config.confidence_max)
    }
}

/// Rejects empty fields, negative/oversized AI counts and duplicate UIDs
fn validate_field(humans: &[HumanPlayer], ai_count: i64) -> RankResult<usize> {
    if humans.is_empty() {
        return Err(RankError::Validation("at least one human player is required".into()));
    }
    if ai_count < 0 {
        return Err(RankError::Validation(format!("ai_count must be >= 0 (got {})", ai_count)));
    }
    let ai_count = ai_count as usize;
    if humans.len() + ai_count > MAX_FIELD_SIZE {
        return Err(RankError::Validation(format!(
            "field of {} exceeds {} participants",
            humans.len() + ai_count,
            MAX_FIELD_SIZE
        )));
    }
    let mut seen = HashSet::new();
    for human in humans {
        if human.uid.trim().is_empty() {
            return Err(RankError::Validation("human uid is empty".into()));
        }
        if !seen.insert(human.uid.as_str()) {
            return Err(RankError::Validation(format!("duplicate human uid {}", human.uid)));
        }
        if !human.score.is_finite() {
            return Err(RankError::Validation(format!("score for {} is not finite", human.uid)));
        }
    }
    Ok(ai_count)
}

/// Cumulative-weight sampling over relative weights; returns a 1-based rank
pub fn sample_rank<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    let clean: Vec<f64> = weights.iter().map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 }).collect();
    let total: f64 = clean.iter().sum();
    if clean.is_empty() {
        return 1;
    }
    if total <= 0.0 {
        return rng.gen_range(1..=clean.len());
    }

    let roll = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, w) in clean.iter().enumerate() {
        cumulative += w;
        if roll < cumulative {
            return i + 1;
        }
    }
    // float rounding: last rank with positive weight
    clean.iter().rposition(|w| *w > 0.0).map_or(clean.len(), |i| i + 1)
}

fn rank_mass(weights: &[f64], rank: usize) -> f64 {
    let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    match weights.get(rank.wrapping_sub(1)) {
        Some(w) if total > 0.0 && *w > 0.0 => w / total,
        _ => 0.0,
    }
}

/// Position of `score` within the span of the player's score bands
pub fn relative_performance(config: &PlayerScoreThresholdConfig, score: f64) -> RelativePerformance {
    let min = config.score_thresholds.iter().map(|t| t.min_score).fold(f64::INFINITY, f64::min);
    let max = config.score_thresholds.iter().map(|t| t.max_score).fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() || max <= min {
        return RelativePerformance::Average;
    }
    let position = (score - min) / (max - min);
    if position >= 0.66 {
        RelativePerformance::Excelling
    } else if position < 0.33 {
        RelativePerformance::Struggling
    } else {
        RelativePerformance::Average
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentTable;
    use chrono::Utc;

    fn context(uid: &str, segment: SegmentName) -> PlayerContext {
        let profile = SegmentTable::builtin().get(segment).unwrap();
        PlayerContext {
            config: PlayerScoreThresholdConfig::from_segment(uid, profile, Utc::now()),
            metrics: PlayerPerformanceMetrics::new(uid, Utc::now()),
            recent_matches: Vec::new(),
        }
    }

    fn engine(seed: u64) -> RankRecommendationEngine {
        RankRecommendationEngine::seeded(&EngineConfig::default(), seed)
    }

    #[test]
    fn test_single_human_uses_segment_probability() {
        let mut engine = engine(42);
        let players = vec![(HumanPlayer::new("p1", 2500.0), context("p1", SegmentName::Gold))];
        let result = engine.recommend(&players, 3).unwrap();

        assert!(result.used_segment_probability);
        assert_eq!(result.total_participants, 4);
        assert_eq!(result.ai_opponents.len(), 3);
        let rec = &result.human_players[0];
        assert!(rec.reasoning.contains("ranking probability"), "reasoning: {}", rec.reasoning);
        assert!(rec.used_segment_probability);
        assert!((1..=4).contains(&rec.recommended_rank));
        assert!(rec.confidence >= 0.1 && rec.confidence <= 0.95);
    }

    #[test]
    fn test_single_human_ai_scores_realize_rank() {
        let mut engine = engine(7);
        for _ in 0..20 {
            let players = vec![(HumanPlayer::new("p1", 1800.0), context("p1", SegmentName::Silver))];
            let result = engine.recommend(&players, 5).unwrap();
            let rank = result.human_players[0].recommended_rank;
            let above = result.ai_opponents.iter().filter(|ai| ai.score > 1800.0).count();
            assert_eq!(above + 1, rank);

            let mut ranks: Vec<usize> = result.ai_opponents.iter().map(|ai| ai.rank).collect();
            ranks.push(rank);
            ranks.sort_unstable();
            assert_eq!(ranks, (1..=6).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_multi_human_ranks_by_score() {
        let mut engine = engine(1);
        let players = vec![
            (HumanPlayer::new("low", 900.0), context("low", SegmentName::Master)),
            (HumanPlayer::new("high", 4000.0), context("high", SegmentName::Bronze)),
        ];
        let result = engine.recommend(&players, 2).unwrap();

        assert!(!result.used_segment_probability);
        assert_eq!(result.total_participants, 4);
        assert_eq!(result.human_players[0].uid, "low");
        let low = &result.human_players[0];
        let high = &result.human_players[1];
        assert!(high.recommended_rank < low.recommended_rank);
        for rec in &result.human_players {
            assert!(!rec.reasoning.contains("ranking probability"), "reasoning: {}", rec.reasoning);
            assert!(!rec.used_segment_probability);
        }
    }

    #[test]
    fn test_tied_humans_share_rank() {
        for order in [["a", "b"], ["b", "a"]] {
            let mut engine = engine(4);
            let players: Vec<(HumanPlayer, PlayerContext)> = order
                .iter()
                .map(|uid| (HumanPlayer::new(*uid, 1000.0), context(uid, SegmentName::Gold)))
                .collect();
            let result = engine.recommend(&players, 0).unwrap();
            for rec in &result.human_players {
                assert_eq!(rec.recommended_rank, 1, "{} in order {:?}", rec.uid, order);
            }
        }

        // the next distinct score skips past the shared rank
        let mut engine = engine(4);
        let players = vec![
            (HumanPlayer::new("a", 1000.0), context("a", SegmentName::Gold)),
            (HumanPlayer::new("b", 1000.0), context("b", SegmentName::Gold)),
            (HumanPlayer::new("c", 500.0), context("c", SegmentName::Gold)),
        ];
        let result = engine.recommend(&players, 0).unwrap();
        let ranks: Vec<usize> = result.human_players.iter().map(|r| r.recommended_rank).collect();
        assert_eq!(ranks, vec![1, 1, 3]);
    }

    #[test]
    fn test_ai_filler_clears_huge_tied_scores() {
        let mut engine = engine(8);
        let players = vec![
            (HumanPlayer::new("a", 1e19), context("a", SegmentName::Master)),
            (HumanPlayer::new("b", 1e19), context("b", SegmentName::Master)),
        ];
        let result = engine.recommend(&players, 1).unwrap();

        assert_eq!(result.total_participants, 3);
        let ai = &result.ai_opponents[0];
        assert!(ai.score.is_finite());
        assert_ne!(ai.score, 1e19);
        assert_eq!(result.human_players[0].recommended_rank, result.human_players[1].recommended_rank);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let mut engine = engine(1);
        assert!(matches!(engine.recommend(&[], 3), Err(RankError::Validation(_))));

        let players = vec![(HumanPlayer::new("p1", 10.0), context("p1", SegmentName::Gold))];
        assert!(matches!(engine.recommend(&players, -1), Err(RankError::Validation(_))));
        assert!(engine.recommend(&players, 500).is_err());

        let dupes = vec![
            (HumanPlayer::new("p1", 10.0), context("p1", SegmentName::Gold)),
            (HumanPlayer::new("p1", 20.0), context("p1", SegmentName::Gold)),
        ];
        assert!(engine.recommend(&dupes, 0).is_err());
    }

    #[test]
    fn test_zero_ai_single_human_is_first() {
        let mut engine = engine(3);
        let players = vec![(HumanPlayer::new("p1", 10.0), context("p1", SegmentName::Gold))];
        let result = engine.recommend(&players, 0).unwrap();
        assert_eq!(result.human_players[0].recommended_rank, 1);
        assert!(result.ai_opponents.is_empty());
    }

    #[test]
    fn test_seeded_engines_agree() {
        let players = vec![(HumanPlayer::new("p1", 3100.0), context("p1", SegmentName::Diamond))];
        let a = engine(99).recommend(&players, 3).unwrap();
        let b = engine(99).recommend(&players, 3).unwrap();
        assert_eq!(a.human_players[0].recommended_rank, b.human_players[0].recommended_rank);
        let sa: Vec<f64> = a.ai_opponents.iter().map(|o| o.score).collect();
        let sb: Vec<f64> = b.ai_opponents.iter().map(|o| o.score).collect();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_sample_rank_follows_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert_eq!(sample_rank(&mut rng, &[0.0, 1.0, 0.0]), 2);

        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[sample_rank(&mut rng, &[0.7, 0.1, 0.1, 0.1]) - 1] += 1;
        }
        assert!(counts[0] > 2400, "rank 1 drawn {} times", counts[0]);
    }

    #[test]
    fn test_confidence_trend() {
        let mut engine = engine(11);
        let mut hot = context("p1", SegmentName::Gold);
        hot.metrics.current_win_streak = 4;
        hot.recent_matches = (0..10)
            .map(|i| PlayerMatchRecord {
                match_id: format!("m{}", i),
                uid: "p1".into(),
                score: 2000.0,
                rank: 1,
                points: 100,
                created_at: Utc::now(),
            })
            .collect();
        let cold = context("p1", SegmentName::Gold);

        let hot_conf = engine.trend_adjustment(&hot);
        let cold_conf = engine.trend_adjustment(&cold);
        assert!((hot_conf - 0.15).abs() < 1e-9);
        assert_eq!(cold_conf, 0.0);

        let result = engine.recommend(&[(HumanPlayer::new("p1", 2000.0), hot)], 3).unwrap();
        assert!(result.human_players[0].confidence <= 0.95);
    }

    #[test]
    fn test_relative_performance_labels() {
        let ctx = context("p", SegmentName::Gold); // bands span 0..4000
        assert_eq!(relative_performance(&ctx.config, 3900.0), RelativePerformance::Excelling);
        assert_eq!(relative_performance(&ctx.config, 2000.0), RelativePerformance::Average);
        assert_eq!(relative_performance(&ctx.config, 100.0), RelativePerformance::Struggling);
    }

    #[tokio::test]
    async fn test_generate_match_rankings_reads_store() {
        use crate::models::PlayerProtectionStatus;
        use crate::store::{MemoryStore, PlayerStore};

        let store = MemoryStore::new();
        let profile = SegmentTable::builtin().get(SegmentName::Diamond).unwrap();
        store
            .save_protection_status("d1", &PlayerProtectionStatus::new("d1", profile))
            .await
            .unwrap();

        let mut engine = engine(5);
        let humans = [HumanPlayer::new("d1", 3000.0)];
        let result = engine
            .generate_match_rankings(&store, &humans, 3, SegmentName::Bronze)
            .await
            .unwrap();
        assert!(result.human_players[0].reasoning.starts_with("diamond"));

        // read-only: nothing new was written
        assert!(store.load_player_config("d1").await.unwrap().is_none());
        assert!(engine.generate_match_rankings(&store, &humans, -2, SegmentName::Bronze).await.is_err());
    }
}

//! JSON API for rank recommendation and match processing
//!
//! String in, string out. Every response is an [`ApiResponse`] envelope;
//! failures never panic and carry a stable error code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{ApiError, ApiResponse, API_VERSION};
use crate::config::EngineConfig;
use crate::pipeline::{MatchOutcome, MatchPipeline, MatchReport};
use crate::progression::MatchType;
use crate::ranking::{HumanPlayer, MatchRankingResult, RankRecommendationEngine};
use crate::segment::SegmentName;
use crate::store::PlayerStore;

/// Pre-match recommendation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub schema_version: Option<String>,
    pub human_players: Vec<HumanPlayer>,
    /// Signed so that negative counts reach validation instead of failing to parse
    pub ai_count: i64,
    /// Segment for players with no stored state (default: bronze)
    pub default_segment: Option<SegmentName>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub rankings: MatchRankingResult,
    pub generated_with_seed: Option<u64>,
}

/// Match completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMatchRequest {
    pub schema_version: Option<String>,
    /// Generated when absent
    pub match_id: Option<String>,
    pub uid: String,
    pub segment_hint: Option<SegmentName>,
    pub score: f64,
    pub rank: u32,
    pub points: Option<i64>,
    pub opponent_segment: Option<SegmentName>,
    pub opponent_score: Option<f64>,
    pub match_type: Option<MatchType>,
    /// Defaults to now
    pub played_at: Option<DateTime<Utc>>,
}

impl ProcessMatchRequest {
    pub fn into_report(self) -> MatchReport {
        MatchReport {
            match_id: self.match_id.unwrap_or_else(MatchReport::generate_match_id),
            uid: self.uid,
            segment_hint: self.segment_hint,
            score: self.score,
            rank: self.rank,
            points: self.points,
            opponent_segment: self.opponent_segment,
            opponent_score: self.opponent_score,
            match_type: self.match_type.unwrap_or_default(),
            played_at: self.played_at.unwrap_or_else(Utc::now),
        }
    }
}

fn check_schema(version: Option<&str>) -> Result<(), ApiError> {
    match version {
        Some(v) if v != API_VERSION => Err(ApiError::new(
            "UNSUPPORTED_SCHEMA",
            &format!("schema_version {} is not supported (expected {})", v, API_VERSION),
        )),
        _ => Ok(()),
    }
}

fn parse<T: for<'de> Deserialize<'de>>(request_json: &str, what: &str) -> Result<T, ApiError> {
    serde_json::from_str(request_json).map_err(|e| {
        error!("Failed to parse {}: {}", what, e);
        ApiError::new("INVALID_JSON", &format!("Invalid JSON format: {}", e))
    })
}

/// Recommend target ranks for a match field
///
/// # Returns
/// JSON string containing `ApiResponse<RecommendResponse>`
pub async fn recommend_json<S: PlayerStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    request_json: &str,
) -> String {
    let request: RecommendRequest = match parse(request_json, "RecommendRequest") {
        Ok(req) => req,
        Err(error) => return ApiResponse::<RecommendResponse>::error(error).to_json(),
    };
    if let Err(error) = check_schema(request.schema_version.as_deref()) {
        return ApiResponse::<RecommendResponse>::error(error).to_json();
    }

    let mut engine = match request.seed {
        Some(seed) => RankRecommendationEngine::seeded(config, seed),
        None => RankRecommendationEngine::from_entropy(config),
    };
    let default_segment = request.default_segment.unwrap_or_default();

    match engine
        .generate_match_rankings(store, &request.human_players, request.ai_count, default_segment)
        .await
    {
        Ok(rankings) => {
            info!(
                humans = request.human_players.len(),
                ai_count = request.ai_count,
                "recommendation served"
            );
            ApiResponse::success(RecommendResponse { rankings, generated_with_seed: request.seed })
                .to_json()
        }
        Err(e) => {
            warn!("Recommendation rejected: {}", e);
            ApiResponse::<RecommendResponse>::error(ApiError::from(&e)).to_json()
        }
    }
}

/// Run the match pipeline for one report
///
/// # Returns
/// JSON string containing `ApiResponse<MatchOutcome>`
pub async fn process_match_json<S: PlayerStore>(pipeline: &MatchPipeline<S>, request_json: &str) -> String {
    let request: ProcessMatchRequest = match parse(request_json, "ProcessMatchRequest") {
        Ok(req) => req,
        Err(error) => return ApiResponse::<MatchOutcome>::error(error).to_json(),
    };
    if let Err(error) = check_schema(request.schema_version.as_deref()) {
        return ApiResponse::<MatchOutcome>::error(error).to_json();
    }

    let report = request.into_report();
    match pipeline.process_match(&report).await {
        Ok(outcome) => ApiResponse::success(outcome).to_json(),
        Err(e) => {
            error!(uid = %report.uid, match_id = %report.match_id, "Match processing failed: {}", e);
            ApiResponse::<MatchOutcome>::error(ApiError::from(&e)).to_json()
        }
    }
}

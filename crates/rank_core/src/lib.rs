//! # rank_core - Outcome-Controlled Ranking and Progression Engine
//!
//! Decides the finishing rank of a human player in a field padded with
//! synthetic opponents, then settles the match into the player's skill
//! progression.
//!
//! ## Features
//! - Per-segment rank probability tables (seeded RNG: same seed = same result)
//! - Synthetic opponent scores that realize a target rank exactly
//! - Adaptive learning rate from rolling performance
//! - Two progression economies: hard points and soft SP
//! - Segment promotion/demotion with protection bookkeeping
//! - Async persistence boundary with optimistic per-player commits
//! - JSON API for integration

// Doc formatting lints - purely cosmetic, fix incrementally
#![allow(clippy::doc_lazy_continuation)]
// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::too_many_arguments)]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod performance;
pub mod pipeline;
pub mod progression;
pub mod ranking;
pub mod segment;
pub mod store;

pub use api::{process_match_json, recommend_json, ApiError, ApiResponse, API_VERSION};
pub use config::{EngineConfig, ProgressionMode};
pub use error::{RankError, RankResult};
pub use pipeline::{MatchOutcome, MatchPipeline, MatchReport, MaintenanceOutcome, Settlement};
pub use progression::{MatchContext, MatchType, ProgressionLedger, SegmentTransitionManager};
pub use ranking::{HumanPlayer, MatchRankingResult, ProbabilityTable, RankRecommendationEngine};
pub use segment::SegmentName;
pub use store::{MemoryStore, PlayerStore};

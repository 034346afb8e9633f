//! Outcome control: rank distributions, target-rank sampling and
//! synthetic opponents.

pub mod opponent_generator;
pub mod probability_table;
pub mod recommendation;

pub use opponent_generator::{realized_rank, SyntheticOpponentGenerator};
pub use probability_table::{effective_score, resize_distribution, ProbabilityTable};
pub use recommendation::{
    relative_performance, sample_rank, AiOpponent, HumanPlayer, HumanRankRecommendation,
    MatchRankingResult, PlayerContext, RankRecommendationEngine, RelativePerformance,
    MAX_FIELD_SIZE,
};

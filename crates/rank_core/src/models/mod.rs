//! Player-scoped records, keyed by UID

pub mod performance;
pub mod protection;
pub mod records;
pub mod threshold;

pub use performance::PlayerPerformanceMetrics;
pub use protection::PlayerProtectionStatus;
pub use records::{ChangeType, PlayerMatchRecord, SegmentChangeRecord};
pub use threshold::{PlayerScoreThresholdConfig, ScoreThreshold};

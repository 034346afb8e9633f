pub mod calibrator;
pub mod tracker;

pub use calibrator::{AdaptiveCalibrator, CalibrationOutcome};
pub use tracker::{update_streak, PerformanceTracker, TrackedMatch};

//! Segment (skill tier) catalogue
//!
//! bronze → silver → gold → platinum → diamond → master

use crate::error::RankError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SegmentName {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
}

impl SegmentName {
    pub const ALL: [SegmentName; 6] = [
        SegmentName::Bronze,
        SegmentName::Silver,
        SegmentName::Gold,
        SegmentName::Platinum,
        SegmentName::Diamond,
        SegmentName::Master,
    ];

    /// 1 (bronze) ..= 6 (master)
    pub fn tier(self) -> i32 {
        match self {
            SegmentName::Bronze => 1,
            SegmentName::Silver => 2,
            SegmentName::Gold => 3,
            SegmentName::Platinum => 4,
            SegmentName::Diamond => 5,
            SegmentName::Master => 6,
        }
    }

    pub fn from_tier(tier: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.tier() == tier)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_tier(self.tier() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_tier(self.tier() - 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SegmentName::Bronze => "bronze",
            SegmentName::Silver => "silver",
            SegmentName::Gold => "gold",
            SegmentName::Platinum => "platinum",
            SegmentName::Diamond => "diamond",
            SegmentName::Master => "master",
        }
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentName {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|seg| seg.as_str() == lower)
            .ok_or_else(|| RankError::Validation(format!("Unknown segment: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order() {
        let tiers: Vec<i32> = SegmentName::ALL.iter().map(|s| s.tier()).collect();
        assert_eq!(tiers, vec![1, 2, 3, 4, 5, 6]);
        assert!(SegmentName::Master > SegmentName::Diamond);
    }

    #[test]
    fn test_next_previous_edges() {
        assert_eq!(SegmentName::Bronze.previous(), None);
        assert_eq!(SegmentName::Bronze.next(), Some(SegmentName::Silver));
        assert_eq!(SegmentName::Master.next(), None);
        assert_eq!(SegmentName::Master.previous(), Some(SegmentName::Diamond));
    }

    #[test]
    fn test_parse_and_serde() {
        assert_eq!("Gold".parse::<SegmentName>().unwrap(), SegmentName::Gold);
        assert!("grandmaster".parse::<SegmentName>().is_err());

        let json = serde_json::to_string(&SegmentName::Platinum).unwrap();
        assert_eq!(json, "\"platinum\"");
        let back: SegmentName = serde_json::from_str("\"diamond\"").unwrap();
        assert_eq!(back, SegmentName::Diamond);
    }
}

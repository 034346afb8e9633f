// 순위 기반 매치 포인트

use crate::config::RankPointsConfig;

/// Match points by finishing position, for reports that carry none
#[derive(Debug, Clone, Default)]
pub struct RankPointAllocator {
    config: RankPointsConfig,
}

impl RankPointAllocator {
    pub fn new(config: RankPointsConfig) -> Self {
        Self { config }
    }

    /// `streak_before` is the signed streak entering the match
    pub fn points_for(&self, rank: u32, streak_before: i32) -> i64 {
        let base = rank
            .checked_sub(1)
            .and_then(|idx| self.config.by_rank.get(idx as usize))
            .copied()
            .unwrap_or(self.config.fallback);

        let bonus = if streak_before >= self.config.streak_bonus_min as i32 {
            self.config.streak_bonus
        } else {
            0
        };
        base + bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_by_rank() {
        let alloc = RankPointAllocator::default();
        assert_eq!(alloc.points_for(1, 0), 100);
        assert_eq!(alloc.points_for(2, 0), 60);
        assert_eq!(alloc.points_for(4, -3), 10);
        assert_eq!(alloc.points_for(7, 0), 5);
    }

    #[test]
    fn test_streak_bonus() {
        let alloc = RankPointAllocator::default();
        assert_eq!(alloc.points_for(1, 3), 120);
        assert_eq!(alloc.points_for(3, 2), 30);
    }
}

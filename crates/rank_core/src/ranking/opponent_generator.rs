//! Synthetic opponent scores that realize a target rank

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::RankingConfig;
use crate::error::{RankError, RankResult};

#[derive(Debug, Clone)]
pub struct SyntheticOpponentGenerator {
    offset_min: f64,
    offset_max: f64,
}

impl Default for SyntheticOpponentGenerator {
    fn default() -> Self {
        Self::new(&RankingConfig::default())
    }
}

impl SyntheticOpponentGenerator {
    pub fn new(config: &RankingConfig) -> Self {
        Self { offset_min: config.opponent_offset_min, offset_max: config.opponent_offset_max }
    }

    /// `target_rank - 1` scores strictly above `human_score`, the rest
    /// strictly below. Output order is shuffled.
    pub fn generate<R: Rng>(
        &self,
        rng: &mut R,
        human_score: f64,
        target_rank: usize,
        ai_count: usize,
        max_rank: usize,
    ) -> RankResult<Vec<f64>> {
        if !human_score.is_finite() {
            return Err(RankError::Validation(format!("human score {} is not finite", human_score)));
        }
        if target_rank == 0 || target_rank > ai_count + 1 {
            return Err(RankError::Validation(format!(
                "target rank {} impossible with {} opponents",
                target_rank, ai_count
            )));
        }
        if target_rank > max_rank {
            return Err(RankError::Validation(format!(
                "target rank {} exceeds max rank {}",
                target_rank, max_rank
            )));
        }

        let above = target_rank - 1;
        let mut scores = Vec::with_capacity(ai_count);
        for i in 0..ai_count {
            let sign = if i < above { 1.0 } else { -1.0 };
            scores.push(self.offset_score(rng, human_score, sign));
        }
        scores.shuffle(rng);
        Ok(scores)
    }

    fn offset_score<R: Rng>(&self, rng: &mut R, human_score: f64, sign: f64) -> f64 {
        let offset = if self.offset_max > self.offset_min {
            rng.gen_range(self.offset_min..self.offset_max)
        } else {
            self.offset_min
        };
        let candidate = human_score + sign * offset;
        // large magnitudes can swallow the offset
        if candidate == human_score {
            let step = human_score.abs().max(1.0) * f64::EPSILON * 4.0;
            human_score + sign * step.max(self.offset_min)
        } else {
            candidate
        }
    }
}

/// 1-based position of `human_score` when the field is sorted descending
pub fn realized_rank(human_score: f64, ai_scores: &[f64]) -> usize {
    1 + ai_scores.iter().filter(|s| **s > human_score).count()
}


#[cfg(all(test, feature = "proptest"))]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    proptest! {
        #[test]
        fn generated_scores_realize_target(
            seed in any::<u64>(),
            human in -5_000.0f64..50_000.0,
            ai_count in 0usize..10,
            pick in 0usize..100,
        ) {
            let gen = SyntheticOpponentGenerator::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let target = 1 + pick % (ai_count + 1);
            let scores = gen.generate(&mut rng, human, target, ai_count, ai_count + 1).unwrap();

            prop_assert_eq!(scores.len(), ai_count);
            prop_assert!(scores.iter().all(|s| *s != human));
            let mut field: Vec<f64> = scores.clone();
            field.push(human);
            field.sort_by(|a, b| b.partial_cmp(a).unwrap());
            let pos = field.iter().position(|s| *s == human).unwrap() + 1;
            prop_assert_eq!(pos, target);
        }
    }
}

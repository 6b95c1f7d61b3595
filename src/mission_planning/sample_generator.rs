//! Random batch generation
//!
//! Uniform batches draw ids without replacement. Constrained batches respect
//! per-item stock: an item is never drawn more often than its quantity across
//! one generation call, and at most `per_batch_repeat_limit` times within a
//! single batch. Slots are filled by a soft greedy rule that favours items
//! with more stock left while keeping some variety.

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::{Batch, Item, RoutingError, RoutingResult};

/// Configuration for batch generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Items per batch
    pub batch_size: usize,
    /// Constrained attempts before giving up
    pub max_attempts: usize,
    /// How often one item may appear inside a single batch
    pub per_batch_repeat_limit: usize,
    /// Weight per unit of remaining stock
    pub stock_weight: f64,
    /// Candidates within this fraction of the best weight are eligible
    pub selection_ratio: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_attempts: 10,
            per_batch_repeat_limit: 3,
            stock_weight: 10.0,
            selection_ratio: 0.8,
        }
    }
}

/// Slot that ran out of candidates during one constrained attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeadEnd {
    batch_index: usize,
    slot: usize,
}

/// Batch generator
pub struct SampleGenerator<R = StdRng> {
    rng: R,
    config: SamplingConfig,
}

impl SampleGenerator<StdRng> {
    pub fn new(config: SamplingConfig) -> Self {
        Self::with_rng(StdRng::from_entropy(), config)
    }

    /// Reproducible generator.
    pub fn seeded(seed: u64, config: SamplingConfig) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), config)
    }
}

impl<R: Rng> SampleGenerator<R> {
    pub fn with_rng(rng: R, config: SamplingConfig) -> Self {
        SampleGenerator { rng, config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// `num_samples` batches of `k` distinct ids, each drawn independently.
    pub fn generate_uniform(
        &mut self,
        ids: &[String],
        num_samples: usize,
        k: usize,
    ) -> RoutingResult<Vec<Batch>> {
        if k == 0 {
            return Err(RoutingError::InvalidParameter("batch size must be positive".to_string()));
        }
        if ids.len() < k {
            return Err(RoutingError::InsufficientItems {
                available: ids.len(),
                required: k,
            });
        }

        let batches: Vec<Batch> = (0..num_samples)
            .map(|_| ids.choose_multiple(&mut self.rng, k).cloned().collect())
            .collect();
        info!(batches = batches.len(), k, pool = ids.len(), "uniform batches generated");
        Ok(batches)
    }

    /// `num_samples` batches of `k` ids within the stock of `items`.
    ///
    /// Only items with an access point and positive quantity take part.
    pub fn generate_constrained(
        &mut self,
        items: &[Item],
        num_samples: usize,
        k: usize,
    ) -> RoutingResult<Vec<Batch>> {
        if k == 0 {
            return Err(RoutingError::InvalidParameter("batch size must be positive".to_string()));
        }
        if self.config.max_attempts == 0 || self.config.per_batch_repeat_limit == 0 {
            return Err(RoutingError::InvalidParameter(
                "max_attempts and per_batch_repeat_limit must be positive".to_string(),
            ));
        }

        let pool: Vec<&Item> = items
            .iter()
            .filter(|item| item.is_routable() && item.quantity_available > 0)
            .collect();
        let available: u64 = pool.iter().map(|item| u64::from(item.quantity_available)).sum();
        let required = num_samples as u64 * k as u64;
        if available < required {
            return Err(RoutingError::InsufficientQuantity { available, required });
        }

        let mut last_dead_end = DeadEnd {
            batch_index: 0,
            slot: 0,
        };
        for attempt in 1..=self.config.max_attempts {
            match self.attempt(&pool, num_samples, k) {
                Ok(batches) => {
                    info!(batches = batches.len(), k, attempt, "constrained batches generated");
                    return Ok(batches);
                }
                Err(dead_end) => {
                    debug!(attempt, ?dead_end, "constrained attempt dead-ended");
                    last_dead_end = dead_end;
                }
            }
        }

        warn!(attempts = self.config.max_attempts, "constrained generation exhausted retries");
        Err(RoutingError::GenerationFailed {
            attempts: self.config.max_attempts,
            batch_index: last_dead_end.batch_index,
            slot: last_dead_end.slot,
        })
    }

    /// One full pass over all batches with a fresh stock budget.
    fn attempt(&mut self, pool: &[&Item], num_samples: usize, k: usize) -> Result<Vec<Batch>, DeadEnd> {
        let noise = Uniform::new(0.0, 1.0);
        let repeat_limit = self.config.per_batch_repeat_limit;
        let stock_weight = self.config.stock_weight;
        let selection_ratio = self.config.selection_ratio;
        let rng = &mut self.rng;

        let mut remaining: Vec<u32> = pool.iter().map(|item| item.quantity_available).collect();
        let mut batches = Vec::with_capacity(num_samples);

        for batch_index in 0..num_samples {
            let mut used = vec![0usize; pool.len()];
            let mut batch = Vec::with_capacity(k);

            for slot in 0..k {
                let weighted: Vec<(usize, f64)> = (0..pool.len())
                    .filter(|&i| remaining[i] > 0 && used[i] < repeat_limit)
                    .map(|i| (i, f64::from(remaining[i]) * stock_weight + noise.sample(&mut *rng)))
                    .collect();

                let max_weight = weighted
                    .iter()
                    .map(|&(_, w)| OrderedFloat(w))
                    .max()
                    .ok_or(DeadEnd { batch_index, slot })?;
                let threshold = max_weight.into_inner() * selection_ratio;
                let candidates: Vec<usize> = weighted
                    .iter()
                    .filter(|&&(_, w)| w >= threshold)
                    .map(|&(i, _)| i)
                    .collect();

                let &chosen = candidates
                    .choose(&mut *rng)
                    .ok_or(DeadEnd { batch_index, slot })?;
                remaining[chosen] -= 1;
                used[chosen] += 1;
                batch.push(pool[chosen].id.clone());
            }
            batches.push(batch);
        }

        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Cell;
    use std::collections::HashMap;

    fn stocked(id: &str, quantity: u32) -> Item {
        Item::new(id, quantity).with_access_point(Cell::new(0, 0), Cell::new(1, 0))
    }

    fn usage(batches: &[Batch]) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for id in batches.iter().flatten() {
            *counts.entry(id.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_uniform_batches_are_distinct_draws() {
        let ids: Vec<String> = (0..8).map(|i| format!("P{:02}", i)).collect();
        let mut generator = SampleGenerator::seeded(7, SamplingConfig::default());
        let batches = generator.generate_uniform(&ids, 20, 5).unwrap();

        assert_eq!(batches.len(), 20);
        for batch in &batches {
            assert_eq!(batch.len(), 5);
            let mut sorted = batch.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), 5);
            assert!(batch.iter().all(|id| ids.contains(id)));
        }
    }

    #[test]
    fn test_uniform_needs_enough_items() {
        let ids = vec!["A".to_string(), "B".to_string()];
        let mut generator = SampleGenerator::seeded(1, SamplingConfig::default());
        assert_eq!(
            generator.generate_uniform(&ids, 3, 5),
            Err(RoutingError::InsufficientItems {
                available: 2,
                required: 5
            })
        );
        assert!(generator.generate_uniform(&ids, 0, 2).unwrap().is_empty());
    }

    #[test]
    fn test_constrained_exact_saturation() {
        let items = vec![stocked("A", 2), stocked("B", 2), stocked("C", 2)];
        for seed in 0..20 {
            let mut generator = SampleGenerator::seeded(seed, SamplingConfig::default());
            let batches = generator.generate_constrained(&items, 3, 2).unwrap();
            assert_eq!(batches.len(), 3);
            assert!(batches.iter().all(|batch| batch.len() == 2));

            let counts = usage(&batches);
            for id in ["A", "B", "C"].iter() {
                assert_eq!(counts[*id], 2, "seed {}", seed);
            }
        }
    }

    #[test]
    fn test_constrained_insufficient_quantity() {
        let items = vec![stocked("A", 2), stocked("B", 1), stocked("C", 2)];
        let mut generator = SampleGenerator::seeded(3, SamplingConfig::default());
        assert_eq!(
            generator.generate_constrained(&items, 3, 2),
            Err(RoutingError::InsufficientQuantity {
                available: 5,
                required: 6
            })
        );
    }

    #[test]
    fn test_constrained_ignores_unroutable_and_empty_stock() {
        let items = vec![
            stocked("A", 4),
            Item::new("HIDDEN", 100),
            stocked("EMPTY", 0),
            stocked("B", 4),
        ];
        let mut generator = SampleGenerator::seeded(11, SamplingConfig::default());
        let batches = generator.generate_constrained(&items, 4, 2).unwrap();
        let counts = usage(&batches);
        assert!(!counts.contains_key("HIDDEN"));
        assert!(!counts.contains_key("EMPTY"));
        assert_eq!(counts.values().sum::<u32>(), 8);

        // Stock of the hidden item does not count toward the budget
        assert!(matches!(
            generator.generate_constrained(&items, 5, 2),
            Err(RoutingError::InsufficientQuantity { available: 8, .. })
        ));
    }

    #[test]
    fn test_constrained_respects_stock_and_repeat_limit() {
        let items: Vec<Item> = (0..10).map(|i| stocked(&format!("S{}", i), 1 + i as u32)).collect();
        let mut generator = SampleGenerator::seeded(42, SamplingConfig::default());
        let batches = generator.generate_constrained(&items, 8, 5).unwrap();

        let counts = usage(&batches);
        for item in &items {
            assert!(counts.get(&item.id).copied().unwrap_or(0) <= item.quantity_available);
        }
        for batch in &batches {
            let per_batch = usage(std::slice::from_ref(batch));
            assert!(per_batch.values().all(|&n| n <= 3));
        }
    }

    #[test]
    fn test_constrained_reports_dead_end_slot() {
        // Plenty of stock but one item can fill only three slots of a batch
        let items = vec![stocked("ONLY", 10)];
        let mut generator = SampleGenerator::seeded(5, SamplingConfig::default());
        assert_eq!(
            generator.generate_constrained(&items, 1, 4),
            Err(RoutingError::GenerationFailed {
                attempts: 10,
                batch_index: 0,
                slot: 3
            })
        );
    }

    #[test]
    fn test_seeded_generators_agree() {
        let items: Vec<Item> = (0..6).map(|i| stocked(&format!("R{}", i), 5)).collect();
        let config = SamplingConfig::default();
        let first = SampleGenerator::seeded(99, config.clone())
            .generate_constrained(&items, 5, 4)
            .unwrap();
        let second = SampleGenerator::seeded(99, config)
            .generate_constrained(&items, 5, 4)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut generator = SampleGenerator::seeded(0, SamplingConfig::default());
        assert!(matches!(
            generator.generate_constrained(&[stocked("A", 1)], 1, 0),
            Err(RoutingError::InvalidParameter(_))
        ));
    }
}

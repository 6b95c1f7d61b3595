/*!
 * Batch sequencing to reduce item changeovers
 *
 * Batches are grouped into nights of a fixed size. Inside each night the
 * order is rebuilt by greedy chaining on shared items from a few start
 * batches, then polished by reversing short runs while that lowers the
 * changeover count. Nights never exchange batches.
 */

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::{Batch, RoutingError, RoutingResult};

/// Configuration for batch sequencing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Batches per night
    pub night_size: usize,
    /// Greedy chains tried per night
    pub start_attempts: usize,
    /// Longest run considered for reversal
    pub reversal_window: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            night_size: 15,
            start_attempts: 5,
            reversal_window: 5,
        }
    }
}

/// Per-night changeover statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightStats {
    pub index: usize,
    pub batch_count: usize,
    pub unique_items: usize,
    pub total_changeovers: usize,
    pub transitions: usize,
    pub average_changeover: f64,
    /// `(batch_count - 1) * k`, k being the longest batch in the night
    pub worst_case_changeovers: usize,
    pub efficiency: f64,
}

/// Changeover statistics for a whole sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub nights: Vec<NightStats>,
    pub total_changeovers: usize,
    pub worst_case_changeovers: usize,
    pub overall_efficiency: f64,
}

fn item_set(batch: &Batch) -> HashSet<&str> {
    batch.iter().map(String::as_str).collect()
}

/// Items dropped plus items added between two batches.
pub fn changeover_cost(a: &Batch, b: &Batch) -> usize {
    item_set(a).symmetric_difference(&item_set(b)).count()
}

/// Sum of changeovers between consecutive batches.
pub fn sequence_cost(batches: &[Batch]) -> usize {
    batches.windows(2).map(|pair| changeover_cost(&pair[0], &pair[1])).sum()
}

/// Split into contiguous nights; the last one may be shorter.
pub fn group_into_nights(batches: &[Batch], night_size: usize) -> RoutingResult<Vec<Vec<Batch>>> {
    if night_size == 0 {
        return Err(RoutingError::InvalidParameter("night size must be positive".to_string()));
    }
    Ok(batches.chunks(night_size).map(|chunk| chunk.to_vec()).collect())
}

fn ratio_efficiency(observed: usize, worst: usize) -> f64 {
    if worst == 0 {
        1.0
    } else {
        1.0 - observed as f64 / worst as f64
    }
}

/// Changeover statistics per night and overall.
///
/// Efficiency is `1 - observed / worst` and is not clamped; neighbours
/// sharing nothing can push it below zero.
pub fn analyze_efficiency(nights: &[Vec<Batch>]) -> EfficiencyReport {
    let stats: Vec<NightStats> = nights
        .iter()
        .enumerate()
        .map(|(index, night)| {
            let sets: Vec<HashSet<&str>> = night.iter().map(item_set).collect();
            let unique_items = sets.iter().flatten().collect::<HashSet<_>>().len();
            let k = night.iter().map(Vec::len).max().unwrap_or(0);
            let transitions = night.len().saturating_sub(1);
            let total_changeovers = sequence_cost(night);
            let worst_case_changeovers = transitions * k;
            let average_changeover = if transitions == 0 {
                0.0
            } else {
                total_changeovers as f64 / transitions as f64
            };

            NightStats {
                index,
                batch_count: night.len(),
                unique_items,
                total_changeovers,
                transitions,
                average_changeover,
                worst_case_changeovers,
                efficiency: ratio_efficiency(total_changeovers, worst_case_changeovers),
            }
        })
        .collect();

    let total_changeovers = stats.iter().map(|night| night.total_changeovers).sum();
    let worst_case_changeovers = stats.iter().map(|night| night.worst_case_changeovers).sum();
    EfficiencyReport {
        nights: stats,
        total_changeovers,
        worst_case_changeovers,
        overall_efficiency: ratio_efficiency(total_changeovers, worst_case_changeovers),
    }
}

/// Pairwise item overlap and changeover among the batches of one night
struct PairTable {
    overlap: Vec<Vec<usize>>,
    cost: Vec<Vec<usize>>,
}

impl PairTable {
    fn new(batches: &[Batch]) -> Self {
        let sets: Vec<HashSet<&str>> = batches.iter().map(item_set).collect();
        let n = sets.len();
        let mut overlap = vec![vec![0; n]; n];
        let mut cost = vec![vec![0; n]; n];
        for i in 0..n {
            for j in 0..n {
                overlap[i][j] = sets[i].intersection(&sets[j]).count();
                cost[i][j] = sets[i].symmetric_difference(&sets[j]).count();
            }
        }
        PairTable { overlap, cost }
    }

    fn order_cost(&self, order: &[usize]) -> usize {
        order.windows(2).map(|pair| self.cost[pair[0]][pair[1]]).sum()
    }
}

/// Night-by-night batch sequencer
#[derive(Debug, Clone, Default)]
pub struct SequenceOptimizer {
    config: SequenceConfig,
}

impl SequenceOptimizer {
    pub fn new(config: SequenceConfig) -> Self {
        SequenceOptimizer { config }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Reorder `batches` within nights of `night_size`.
    ///
    /// The changeover count inside every night never exceeds that of the
    /// input order.
    pub fn optimize(&self, batches: &[Batch], night_size: usize) -> RoutingResult<Vec<Batch>> {
        let nights = group_into_nights(batches, night_size)?;
        let before: usize = nights.iter().map(|night| sequence_cost(night)).sum();

        let optimized: Vec<Batch> = nights
            .iter()
            .flat_map(|night| self.optimize_night(night))
            .collect();

        let after: usize = group_into_nights(&optimized, night_size)?
            .iter()
            .map(|night| sequence_cost(night))
            .sum();
        info!(
            batches = batches.len(),
            nights = nights.len(),
            before,
            after,
            "batch sequence optimized"
        );
        Ok(optimized)
    }

    /// Best ordering of a single night.
    pub fn optimize_night(&self, night: &[Batch]) -> Vec<Batch> {
        let n = night.len();
        if n < 3 {
            return night.to_vec();
        }

        let table = PairTable::new(night);
        let attempts = self.config.start_attempts.clamp(1, n);

        let mut best: Option<(usize, Vec<usize>)> = None;
        for attempt in 0..attempts {
            let start = attempt * n / attempts;
            let mut order = greedy_chain(&table, start);
            self.improve_by_reversal(&table, &mut order);
            let cost = table.order_cost(&order);
            debug!(start, cost, "greedy chain");
            if best.as_ref().map_or(true, |(best_cost, _)| cost < *best_cost) {
                best = Some((cost, order));
            }
        }

        // The input order competes too, so the result is never worse
        let mut identity: Vec<usize> = (0..n).collect();
        self.improve_by_reversal(&table, &mut identity);
        let identity_cost = table.order_cost(&identity);
        let order = match best {
            Some((cost, order)) if cost <= identity_cost => order,
            _ => identity,
        };

        order.into_iter().map(|i| night[i].clone()).collect()
    }

    /// Reverse runs of 2..=window batches while that strictly lowers the cost.
    fn improve_by_reversal(&self, table: &PairTable, order: &mut [usize]) {
        let n = order.len();
        let window = self.config.reversal_window;
        let edge = |a: Option<&usize>, b: Option<&usize>| -> i64 {
            match (a, b) {
                (Some(&a), Some(&b)) => table.cost[a][b] as i64,
                _ => 0,
            }
        };

        loop {
            let mut improved = false;
            for i in 0..n {
                for len in 2..=window {
                    let j = i + len - 1;
                    if j >= n {
                        break;
                    }
                    // Inner edges keep their cost under reversal
                    let before = i.checked_sub(1).map(|p| &order[p]);
                    let after = order.get(j + 1);
                    let old = edge(before, Some(&order[i])) + edge(Some(&order[j]), after);
                    let new = edge(before, Some(&order[j])) + edge(Some(&order[i]), after);
                    if new < old {
                        order[i..=j].reverse();
                        improved = true;
                    }
                }
            }
            if !improved {
                break;
            }
        }
    }
}

/// Chain batches by largest overlap with the last placed one.
fn greedy_chain(table: &PairTable, start: usize) -> Vec<usize> {
    let n = table.overlap.len();
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    placed[start] = true;
    order.push(start);

    while order.len() < n {
        let last = order[order.len() - 1];
        let mut pick: Option<(usize, usize)> = None;
        for j in (0..n).filter(|&j| !placed[j]) {
            let overlap = table.overlap[last][j];
            if pick.map_or(true, |(_, best)| overlap > best) {
                pick = Some((j, overlap));
            }
        }
        match pick {
            Some((j, _)) => {
                placed[j] = true;
                order.push(j);
            }
            None => break,
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission_planning::{SampleGenerator, SamplingConfig};
    use approx::assert_relative_eq;

    fn batch(ids: &[&str]) -> Batch {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn sorted(mut batches: Vec<Batch>) -> Vec<Batch> {
        batches.sort();
        batches
    }

    fn nightly_cost(batches: &[Batch], night_size: usize) -> usize {
        group_into_nights(batches, night_size)
            .unwrap()
            .iter()
            .map(|night| sequence_cost(night))
            .sum()
    }

    #[test]
    fn test_changeover_cost_uses_item_sets() {
        assert_eq!(changeover_cost(&batch(&["A", "B", "C"]), &batch(&["B", "C", "D"])), 2);
        assert_eq!(changeover_cost(&batch(&["A", "A", "B"]), &batch(&["B", "A"])), 0);
        assert_eq!(changeover_cost(&batch(&["A"]), &batch(&["B", "C"])), 3);
        assert_eq!(sequence_cost(&[batch(&["A"])]), 0);
    }

    #[test]
    fn test_alternating_batches_are_grouped() {
        let batches = vec![
            batch(&["A", "B"]),
            batch(&["C", "D"]),
            batch(&["A", "B"]),
            batch(&["C", "D"]),
        ];
        assert_eq!(sequence_cost(&batches), 12);

        let optimizer = SequenceOptimizer::default();
        let optimized = optimizer.optimize(&batches, 15).unwrap();
        assert_eq!(sequence_cost(&optimized), 4);
        assert_eq!(sorted(optimized), sorted(batches));
    }

    #[test]
    fn test_optimize_never_increases_cost() {
        let ids: Vec<String> = (0..9).map(|i| format!("I{}", i)).collect();
        let optimizer = SequenceOptimizer::default();
        for seed in 0..10 {
            let batches = SampleGenerator::seeded(seed, SamplingConfig::default())
                .generate_uniform(&ids, 40, 4)
                .unwrap();
            for &night_size in [1usize, 4, 15, 40].iter() {
                let optimized = optimizer.optimize(&batches, night_size).unwrap();
                assert!(
                    nightly_cost(&optimized, night_size) <= nightly_cost(&batches, night_size),
                    "seed {} night size {}",
                    seed,
                    night_size
                );
            }
            let single_night = optimizer.optimize(&batches, batches.len()).unwrap();
            assert!(sequence_cost(&single_night) <= sequence_cost(&batches));
        }
    }

    #[test]
    fn test_nights_keep_their_batches() {
        let ids: Vec<String> = (0..7).map(|i| format!("N{}", i)).collect();
        let batches = SampleGenerator::seeded(21, SamplingConfig::default())
            .generate_uniform(&ids, 23, 3)
            .unwrap();
        let optimized = SequenceOptimizer::default().optimize(&batches, 5).unwrap();
        assert_eq!(optimized.len(), batches.len());
        for (before, after) in batches.chunks(5).zip(optimized.chunks(5)) {
            assert_eq!(sorted(before.to_vec()), sorted(after.to_vec()));
        }
    }

    #[test]
    fn test_zero_night_size_rejected() {
        let optimizer = SequenceOptimizer::default();
        assert!(matches!(
            optimizer.optimize(&[batch(&["A"])], 0),
            Err(RoutingError::InvalidParameter(_))
        ));
        assert!(optimizer.optimize(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_efficiency_report() {
        let nights = vec![
            vec![batch(&["A", "B", "C"]), batch(&["A", "B", "D"]), batch(&["A", "B", "D"])],
            vec![batch(&["X"])],
        ];
        let report = analyze_efficiency(&nights);

        let first = &report.nights[0];
        assert_eq!(first.batch_count, 3);
        assert_eq!(first.unique_items, 4);
        assert_eq!(first.transitions, 2);
        assert_eq!(first.total_changeovers, 2);
        assert_eq!(first.worst_case_changeovers, 6);
        assert_relative_eq!(first.average_changeover, 1.0);
        assert_relative_eq!(first.efficiency, 1.0 - 2.0 / 6.0);

        let second = &report.nights[1];
        assert_eq!(second.transitions, 0);
        assert_relative_eq!(second.efficiency, 1.0);

        assert_eq!(report.total_changeovers, 2);
        assert_eq!(report.worst_case_changeovers, 6);
        assert_relative_eq!(report.overall_efficiency, 1.0 - 2.0 / 6.0);
    }

    #[test]
    fn test_worst_case_counts_repeated_ids() {
        // Repeats shrink the item sets but not the batch length
        let nights = vec![vec![batch(&["A", "A", "B"]), batch(&["C", "C", "D"])]];
        let report = analyze_efficiency(&nights);
        let night = &report.nights[0];
        assert_eq!(night.unique_items, 4);
        assert_eq!(night.total_changeovers, 4);
        assert_eq!(night.worst_case_changeovers, 3);
        assert_relative_eq!(night.efficiency, 1.0 - 4.0 / 3.0);
    }

    #[test]
    fn test_disjoint_neighbours_go_negative() {
        let nights = vec![vec![batch(&["A", "B"]), batch(&["C", "D"])]];
        let report = analyze_efficiency(&nights);
        assert_eq!(report.nights[0].total_changeovers, 4);
        assert_relative_eq!(report.overall_efficiency, -1.0);
    }
}

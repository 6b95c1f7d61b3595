//! All-pairs travel distances among start, waypoints and end
//!
//! Distances are counted in grid steps; `f64::INFINITY` marks a pair the
//! planner could not connect.

use tracing::debug;

use crate::common::{Cell, GridPathPlanner};

/// Typed distance table for one routing problem
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    from_start: Vec<f64>,
    to_end: Vec<f64>,
    between: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    /// Run the planner for start→each point, every unordered pair of points
    /// (stored symmetrically), and each point→end.
    pub fn build<P: GridPathPlanner>(planner: &P, points: &[Cell], start: Cell, end: Cell) -> Self {
        let n = points.len();
        let leg = |from: Cell, to: Cell| -> f64 {
            planner
                .find_path(from, to)
                .map_or(f64::INFINITY, |path| path.distance_cells() as f64)
        };

        let from_start: Vec<f64> = points.iter().map(|&point| leg(start, point)).collect();

        let mut between = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = leg(points[i], points[j]);
                between[i][j] = d;
                between[j][i] = d;
            }
        }

        let to_end: Vec<f64> = points.iter().map(|&point| leg(point, end)).collect();

        debug!(?from_start, ?to_end, "distance matrix for {} points", n);

        DistanceMatrix {
            from_start,
            to_end,
            between,
        }
    }

    pub fn len(&self) -> usize {
        self.from_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_start.is_empty()
    }

    pub fn from_start(&self, i: usize) -> f64 {
        self.from_start[i]
    }

    pub fn to_end(&self, i: usize) -> f64 {
        self.to_end[i]
    }

    pub fn between(&self, i: usize, j: usize) -> f64 {
        self.between[i][j]
    }

    /// Waypoints that cannot be reached from the start or cannot reach the end.
    pub fn unreachable_points(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.from_start[i].is_infinite() || self.to_end[i].is_infinite())
            .collect()
    }

    /// Total length of `start → order[0] → … → order[n-1] → end`.
    ///
    /// Returns `None` as soon as a leg is infinite.
    pub fn route_length(&self, order: &[usize]) -> Option<f64> {
        let (first, last) = match (order.first(), order.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return None,
        };

        let mut total = self.from_start[first];
        if total.is_infinite() {
            return None;
        }
        for pair in order.windows(2) {
            let d = self.between[pair[0]][pair[1]];
            if d.is_infinite() {
                return None;
            }
            total += d;
        }
        let tail = self.to_end[last];
        if tail.is_infinite() {
            return None;
        }
        Some(total + tail)
    }
}

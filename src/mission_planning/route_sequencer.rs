/*!
 * Multi-waypoint route sequencing
 *
 * Orders the pickup waypoints between a start and an end cell so that the
 * total travel distance is minimal, then stitches the per-leg grid paths
 * into a single route.
 *
 * Up to `exact_waypoint_limit` waypoints every permutation is scored against
 * a precomputed distance matrix. Above that, a greedy nearest-neighbour tour
 * is built directly with the path planner; it is not guaranteed optimal.
 */

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::cancel::check_cancelled;
use crate::common::{
    CancellationToken, Cell, GridPath, GridPathPlanner, RouteResult, RoutingError, RoutingResult,
};
use crate::path_planning::DistanceMatrix;

/// Configuration for route sequencing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Largest waypoint count solved by full permutation search
    pub exact_waypoint_limit: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            exact_waypoint_limit: 7,
        }
    }
}

/// Route sequencer over any grid path planner
pub struct RouteSequencer<P> {
    planner: P,
    config: RouteConfig,
    cancel: Option<CancellationToken>,
}

impl<P: GridPathPlanner> RouteSequencer<P> {
    pub fn new(planner: P, config: RouteConfig) -> Self {
        RouteSequencer {
            planner,
            config,
            cancel: None,
        }
    }

    pub fn with_defaults(planner: P) -> Self {
        Self::new(planner, RouteConfig::default())
    }

    /// Poll `token` between permutations and greedy steps.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Sequence a route, reporting any failure as `RouteResult::failed()`.
    pub fn sequence(&self, start: Cell, waypoints: &[Cell], end: Cell) -> RouteResult {
        match self.try_sequence(start, waypoints, end) {
            Ok(result) => result,
            Err(err) => {
                warn!(%err, waypoints = waypoints.len(), "route sequencing failed");
                RouteResult::failed()
            }
        }
    }

    /// Sequence a route, keeping the reason for a failure.
    pub fn try_sequence(&self, start: Cell, waypoints: &[Cell], end: Cell) -> RoutingResult<RouteResult> {
        let n = waypoints.len();
        let (path, cells, visit_order) = if n == 0 {
            debug!("no waypoints, planning direct path");
            let path = self.leg(start, end)?;
            let cells = path.distance_cells() as f64;
            (path, cells, Vec::new())
        } else if n <= self.config.exact_waypoint_limit {
            self.exact_route(start, waypoints, end)?
        } else {
            debug!(waypoints = n, "using greedy nearest-neighbour ordering");
            self.greedy_route(start, waypoints, end)?
        };

        let distance_meters = cells * self.planner.meters_per_cell();
        info!(
            waypoints = n,
            cells = path.len(),
            distance_meters,
            "route sequenced"
        );

        Ok(RouteResult {
            path,
            distance_meters,
            visit_order,
        })
    }

    fn leg(&self, from: Cell, to: Cell) -> RoutingResult<GridPath> {
        self.planner
            .find_path(from, to)
            .ok_or(RoutingError::Unreachable { from, to })
    }

    /// Concatenate legs between consecutive stops.
    fn stitch(&self, stops: &[Cell]) -> RoutingResult<GridPath> {
        let mut path = GridPath::new();
        for pair in stops.windows(2) {
            let leg = self.leg(pair[0], pair[1])?;
            path.extend_segment(&leg);
        }
        Ok(path)
    }

    fn exact_route(
        &self,
        start: Cell,
        waypoints: &[Cell],
        end: Cell,
    ) -> RoutingResult<(GridPath, f64, Vec<usize>)> {
        let n = waypoints.len();
        let matrix = DistanceMatrix::build(&self.planner, waypoints, start, end);

        if let Some(&i) = matrix.unreachable_points().first() {
            let (from, to) = if matrix.from_start(i).is_infinite() {
                (start, waypoints[i])
            } else {
                (waypoints[i], end)
            };
            return Err(RoutingError::Unreachable { from, to });
        }

        let mut best: Option<(f64, Vec<usize>)> = None;
        for order in (0..n).permutations(n) {
            check_cancelled(self.cancel.as_ref())?;
            if let Some(length) = matrix.route_length(&order) {
                if best.as_ref().map_or(true, |(best_length, _)| length < *best_length) {
                    best = Some((length, order));
                }
            }
        }

        let (cells, order) = best.ok_or(RoutingError::NoFeasibleOrder { waypoints: n })?;
        debug!(?order, cells, "best permutation");

        let mut stops = Vec::with_capacity(n + 2);
        stops.push(start);
        stops.extend(order.iter().map(|&i| waypoints[i]));
        stops.push(end);
        let path = self.stitch(&stops)?;

        Ok((path, cells, order))
    }

    /// Nearest-neighbour tour. When it gets stuck, the error pairs the
    /// current stop with the first remaining waypoint in input order.
    fn greedy_route(
        &self,
        start: Cell,
        waypoints: &[Cell],
        end: Cell,
    ) -> RoutingResult<(GridPath, f64, Vec<usize>)> {
        let mut unvisited: Vec<usize> = (0..waypoints.len()).collect();
        let mut order = Vec::with_capacity(waypoints.len());
        let mut path = GridPath::from_cells(vec![start]);
        let mut cells = 0usize;
        let mut current = start;

        while !unvisited.is_empty() {
            check_cancelled(self.cancel.as_ref())?;

            let mut nearest: Option<(usize, GridPath)> = None;
            for (slot, &i) in unvisited.iter().enumerate() {
                if let Some(leg) = self.planner.find_path(current, waypoints[i]) {
                    if nearest.as_ref().map_or(true, |(_, best)| leg.len() < best.len()) {
                        nearest = Some((slot, leg));
                    }
                }
            }

            // None of the remaining waypoints is reachable from `current`;
            // report the first of them in input order
            let (slot, leg) = nearest.ok_or(RoutingError::Unreachable {
                from: current,
                to: waypoints[unvisited[0]],
            })?;
            let next = unvisited.remove(slot);
            cells += leg.distance_cells();
            path.extend_segment(&leg);
            order.push(next);
            current = waypoints[next];
        }

        check_cancelled(self.cancel.as_ref())?;
        let leg = self.leg(current, end)?;
        cells += leg.distance_cells();
        path.extend_segment(&leg);

        Ok((path, cells as f64, order))
    }
}

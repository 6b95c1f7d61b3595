//! Bulk route generation over many batches
//!
//! Each batch is resolved to access points and sequenced on its own. A batch
//! that cannot be routed is recorded as failed and the run moves on.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::{Batch, CancellationToken, Cell, GridPathPlanner, RoutingError, RoutingResult};
use crate::mission_planning::{ItemCatalog, RouteSequencer};

/// One routed batch, in the shape persisted by route exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    /// 1-based position of the batch in the run
    pub route_id: usize,
    /// Item ids in visiting order
    pub items: Vec<String>,
    /// Rounded to centimetres
    pub distance_meters: f64,
    pub path_length: usize,
    pub path: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Routed(RouteRecord),
    Failed { batch_index: usize, error: RoutingError },
}

/// Snapshot passed to the progress callback after every batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the run stopped early on a cancellation request
    pub cancelled: bool,
}

impl BatchReport {
    pub fn records(&self) -> impl Iterator<Item = &RouteRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BatchOutcome::Routed(record) => Some(record),
            BatchOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &RoutingError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BatchOutcome::Failed { batch_index, error } => Some((*batch_index, error)),
            BatchOutcome::Routed(_) => None,
        })
    }
}

fn round_centimetres(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

/// Runs a route sequencer over a list of batches
pub struct BatchRunner<P> {
    sequencer: RouteSequencer<P>,
    cancel: Option<CancellationToken>,
}

impl<P: GridPathPlanner> BatchRunner<P> {
    pub fn new(sequencer: RouteSequencer<P>) -> Self {
        BatchRunner {
            sequencer,
            cancel: None,
        }
    }

    /// Poll `token` between batches and inside each route search.
    pub fn with_cancellation(self, token: CancellationToken) -> Self {
        BatchRunner {
            sequencer: self.sequencer.with_cancellation(token.clone()),
            cancel: Some(token),
        }
    }

    pub fn sequencer(&self) -> &RouteSequencer<P> {
        &self.sequencer
    }

    pub fn run<F>(
        &self,
        catalog: &ItemCatalog,
        batches: &[Batch],
        start: Cell,
        end: Cell,
        mut on_progress: F,
    ) -> BatchReport
    where
        F: FnMut(BatchProgress),
    {
        let mut report = BatchReport::default();

        for (batch_index, batch) in batches.iter().enumerate() {
            if self.cancel.as_ref().map_or(false, CancellationToken::is_cancelled) {
                report.cancelled = true;
                break;
            }

            match self.route_batch(catalog, batch_index, batch, start, end) {
                Ok(record) => {
                    report.succeeded += 1;
                    report.outcomes.push(BatchOutcome::Routed(record));
                }
                Err(RoutingError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(error) => {
                    warn!(batch_index, %error, "batch could not be routed");
                    report.failed += 1;
                    report.outcomes.push(BatchOutcome::Failed { batch_index, error });
                }
            }

            on_progress(BatchProgress {
                completed: report.outcomes.len(),
                total: batches.len(),
                succeeded: report.succeeded,
                failed: report.failed,
            });
        }

        info!(
            total = batches.len(),
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            "batch routing finished"
        );
        report
    }

    fn route_batch(
        &self,
        catalog: &ItemCatalog,
        batch_index: usize,
        batch: &Batch,
        start: Cell,
        end: Cell,
    ) -> RoutingResult<RouteRecord> {
        let waypoints = catalog.access_points(batch)?;
        let route = self.sequencer.try_sequence(start, &waypoints, end)?;

        Ok(RouteRecord {
            route_id: batch_index + 1,
            items: route.visit_order.iter().map(|&i| batch[i].clone()).collect(),
            distance_meters: round_centimetres(route.distance_meters),
            path_length: route.path.len(),
            path: route.path.cells,
        })
    }
}

//! Error types for warehouse_routing

use thiserror::Error;

use crate::common::types::Cell;

/// Main error type for routing and batch planning
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// Scale calibration with a non-positive distance
    #[error("invalid scale: {real_distance} m over {pixel_distance} px")]
    InvalidScale { pixel_distance: f64, real_distance: f64 },
    /// Robot radius must be strictly positive
    #[error("invalid robot radius: {radius} m")]
    InvalidRadius { radius: f64 },
    /// Obstacle matrix is empty or ragged
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A* found no path between a specific pair of cells
    #[error("no path from {from:?} to {to:?}")]
    Unreachable { from: Cell, to: Cell },
    /// Every waypoint permutation crosses an unreachable leg
    #[error("no feasible visiting order for {waypoints} waypoints")]
    NoFeasibleOrder { waypoints: usize },
    /// Fewer distinct items than the batch size
    #[error("need at least {required} items with access points, have {available}")]
    InsufficientItems { available: usize, required: usize },
    /// Total stock cannot cover the requested batches
    #[error("total quantity {available} is below the {required} picks requested")]
    InsufficientQuantity { available: u64, required: u64 },
    /// Constrained sampling kept dead-ending until the retry budget ran out
    #[error("batch generation failed after {attempts} attempts (batch {batch_index}, slot {slot} had no candidates)")]
    GenerationFailed {
        attempts: usize,
        batch_index: usize,
        slot: usize,
    },
    #[error("unknown item '{item_id}'")]
    UnknownItem { item_id: String },
    #[error("item '{item_id}' has no access point")]
    MissingAccessPoint { item_id: String },
    /// Cancellation was requested through a `CancellationToken`
    #[error("operation cancelled")]
    Cancelled,
}

impl RoutingError {
    /// Configuration and precondition errors stop a whole call; the others
    /// are local to one route or batch.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RoutingError::Unreachable { .. }
                | RoutingError::NoFeasibleOrder { .. }
                | RoutingError::UnknownItem { .. }
                | RoutingError::MissingAccessPoint { .. }
        )
    }
}

/// Result type alias for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoutingError::Unreachable {
            from: Cell::new(0, 0),
            to: Cell::new(3, 4),
        };
        assert_eq!(
            format!("{}", err),
            "no path from Cell { x: 0, y: 0 } to Cell { x: 3, y: 4 }"
        );
    }

    #[test]
    fn test_generation_failure_carries_context() {
        let err = RoutingError::GenerationFailed {
            attempts: 10,
            batch_index: 2,
            slot: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("batch 2"));
        assert!(msg.contains("slot 4"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_route_local_errors_are_not_fatal() {
        let err = RoutingError::MissingAccessPoint {
            item_id: "A001".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(RoutingError::InvalidRadius { radius: 0.0 }.is_fatal());
    }
}

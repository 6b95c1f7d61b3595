//! warehouse_routing - route planning for warehouse picking robots
//!
//! This crate turns an occupancy map into robot-clearance aware grid paths,
//! orders multi-item pick routes, and generates and sequences pick batches
//! under per-item stock limits.

// Core modules
pub mod common;

// Algorithm modules
pub mod mapping;
pub mod path_planning;
pub mod mission_planning;

// Re-export common types for convenience
pub use common::{Batch, Cell, GridPath, Item, RouteResult};
pub use common::{CancellationToken, GridPathPlanner, PlannerConfig};
pub use common::{RoutingError, RoutingResult};

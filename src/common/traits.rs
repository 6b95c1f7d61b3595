//! Common traits defining interfaces for the routing algorithms

use crate::common::types::{Cell, GridPath};

/// Trait for single-pair grid path planners
pub trait GridPathPlanner {
    /// Plan a 4-connected path from start to goal, both included.
    ///
    /// Returns `None` when either end is blocked or the goal is unreachable.
    fn find_path(&self, start: Cell, goal: Cell) -> Option<GridPath>;

    /// Physical length of one grid step in meters.
    fn meters_per_cell(&self) -> f64;
}

impl<'a, P: GridPathPlanner + ?Sized> GridPathPlanner for &'a P {
    fn find_path(&self, start: Cell, goal: Cell) -> Option<GridPath> {
        (**self).find_path(start, goal)
    }

    fn meters_per_cell(&self) -> f64 {
        (**self).meters_per_cell()
    }
}

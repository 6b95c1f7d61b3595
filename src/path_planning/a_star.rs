//! A* path planning on the inflated occupancy grid
//!
//! 4-connected moves with unit cost and a Manhattan heuristic, which is
//! admissible and consistent for this motion model. Equal f-scores are broken
//! by preferring the deeper node, then the older queue entry, so results are
//! reproducible.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::common::{Cell, GridPath, GridPathPlanner};
use crate::mapping::OccupancyGrid;

/// Configuration for A* planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AStarConfig {
    /// Hard cap on node expansions; `None` derives it from the grid size
    pub max_expansions: Option<usize>,
    /// Derived cap is `width * height / expansion_divisor`
    pub expansion_divisor: usize,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            max_expansions: None,
            expansion_divisor: 4,
        }
    }
}

/// Open-set entry (min-heap on f)
#[derive(Debug, PartialEq, Eq)]
struct OpenNode {
    cell: Cell,
    g: usize,
    f: usize,
    seq: u64,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse on f for min-heap behavior
        other
            .f
            .cmp(&self.f)
            .then_with(|| self.g.cmp(&other.g))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* path planner borrowing an occupancy grid
pub struct AStarPlanner<'a> {
    grid: &'a OccupancyGrid,
    config: AStarConfig,
}

impl<'a> AStarPlanner<'a> {
    pub fn new(grid: &'a OccupancyGrid, config: AStarConfig) -> Self {
        AStarPlanner { grid, config }
    }

    pub fn with_defaults(grid: &'a OccupancyGrid) -> Self {
        Self::new(grid, AStarConfig::default())
    }

    /// Get reference to the grid
    pub fn grid(&self) -> &OccupancyGrid {
        self.grid
    }

    pub fn expansion_limit(&self) -> usize {
        self.config.max_expansions.unwrap_or_else(|| {
            self.grid.width() * self.grid.height() / self.config.expansion_divisor.max(1)
        })
    }

    fn index(&self, cell: Cell) -> usize {
        cell.y as usize * self.grid.width() + cell.x as usize
    }

    fn reconstruct_path(&self, came_from: &[Option<Cell>], start: Cell, goal: Cell) -> GridPath {
        let mut cells = vec![goal];
        let mut current = goal;
        while current != start {
            match came_from[self.index(current)] {
                Some(prev) => {
                    cells.push(prev);
                    current = prev;
                }
                None => break,
            }
        }
        cells.reverse();
        GridPath::from_cells(cells)
    }
}

impl<'a> GridPathPlanner for AStarPlanner<'a> {
    fn find_path(&self, start: Cell, goal: Cell) -> Option<GridPath> {
        trace!(?start, ?goal, "[AStar] find_path");

        if !self.grid.is_walkable(start, false) || !self.grid.is_walkable(goal, false) {
            debug!(?start, ?goal, "[AStar] start or goal is not walkable");
            return None;
        }
        if start == goal {
            return Some(GridPath::from_cells(vec![start]));
        }

        let n = self.grid.width() * self.grid.height();
        let mut g_score = vec![usize::MAX; n];
        let mut came_from: Vec<Option<Cell>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut open_set = BinaryHeap::new();
        let mut seq = 0u64;

        g_score[self.index(start)] = 0;
        open_set.push(OpenNode {
            cell: start,
            g: 0,
            f: start.manhattan(&goal),
            seq,
        });

        let limit = self.expansion_limit();
        let mut expansions = 0;

        while let Some(current) = open_set.pop() {
            let current_index = self.index(current.cell);
            if closed[current_index] {
                continue;
            }

            if current.cell == goal {
                let path = self.reconstruct_path(&came_from, start, goal);
                trace!(expansions, cells = path.len(), "[AStar] path found");
                return Some(path);
            }

            if expansions >= limit {
                debug!(?start, ?goal, limit, "[AStar] expansion limit reached");
                return None;
            }
            expansions += 1;
            closed[current_index] = true;

            for neighbor in current.cell.neighbors_4().iter() {
                if !self.grid.is_walkable(*neighbor, false) {
                    continue;
                }
                let neighbor_index = self.index(*neighbor);
                if closed[neighbor_index] {
                    continue;
                }

                let tentative_g = current.g + 1;
                if tentative_g < g_score[neighbor_index] {
                    g_score[neighbor_index] = tentative_g;
                    came_from[neighbor_index] = Some(current.cell);
                    seq += 1;
                    open_set.push(OpenNode {
                        cell: *neighbor,
                        g: tentative_g,
                        f: tentative_g + neighbor.manhattan(&goal),
                        seq,
                    });
                }
            }
        }

        debug!(?start, ?goal, expansions, "[AStar] open set exhausted");
        None
    }

    fn meters_per_cell(&self) -> f64 {
        self.grid.meters_per_pixel()
    }
}

//! Common types used throughout warehouse_routing

use serde::{Deserialize, Serialize};

/// Integer grid coordinate, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four axis-aligned neighbours in a fixed order (+x, +y, -x, -y).
    pub fn neighbors_4(&self) -> [Cell; 4] {
        [
            Cell::new(self.x + 1, self.y),
            Cell::new(self.x, self.y + 1),
            Cell::new(self.x - 1, self.y),
            Cell::new(self.x, self.y - 1),
        ]
    }

    pub fn manhattan(&self, other: &Cell) -> usize {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as usize
    }

    pub fn chebyshev(&self, other: &Cell) -> usize {
        (self.x - other.x).abs().max((self.y - other.y).abs()) as usize
    }

    /// Squared Euclidean distance, kept integral for exact comparisons.
    pub fn distance_sq(&self, other: &Cell) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Shifted cell; saturates at the `i32` range.
    pub fn offset(&self, dx: i32, dy: i32) -> Cell {
        Cell::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl From<(i32, i32)> for Cell {
    fn from(tuple: (i32, i32)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

/// Path represented as a sequence of 4-connected grid cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPath {
    pub cells: Vec<Cell>,
}

impl GridPath {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn first(&self) -> Option<Cell> {
        self.cells.first().copied()
    }

    pub fn last(&self) -> Option<Cell> {
        self.cells.last().copied()
    }

    /// Number of unit moves along the path.
    pub fn distance_cells(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// True when every consecutive pair differs by exactly one axis step.
    pub fn is_connected(&self) -> bool {
        self.cells.windows(2).all(|w| w[0].manhattan(&w[1]) == 1)
    }

    /// Append another segment that starts where this path ends.
    ///
    /// The junction cell is stored once.
    pub fn extend_segment(&mut self, segment: &GridPath) {
        let skip = match (self.last(), segment.first()) {
            (Some(end), Some(start)) if end == start => 1,
            _ => 0,
        };
        self.cells.extend(segment.cells.iter().skip(skip).copied());
    }
}

/// A stock-keeping item that can be placed on the map and picked by the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub quantity_available: u32,
    pub location: Option<Cell>,
    /// Nearest walkable cell to `location`; required to route to the item.
    pub access_point: Option<Cell>,
}

impl Item {
    pub fn new(id: &str, quantity_available: u32) -> Self {
        Self {
            id: id.to_string(),
            quantity_available,
            location: None,
            access_point: None,
        }
    }

    pub fn with_access_point(mut self, location: Cell, access_point: Cell) -> Self {
        self.location = Some(location);
        self.access_point = Some(access_point);
        self
    }

    pub fn is_routable(&self) -> bool {
        self.access_point.is_some()
    }
}

/// Ordered item ids collected together in one trip.
pub type Batch = Vec<String>;

/// Result of ordering and stitching a multi-waypoint route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub path: GridPath,
    pub distance_meters: f64,
    /// `visit_order[i]` is the index into the input waypoints visited i-th.
    pub visit_order: Vec<usize>,
}

impl RouteResult {
    /// The empty result reported when no route could be built.
    pub fn failed() -> Self {
        Self {
            path: GridPath::new(),
            distance_meters: f64::INFINITY,
            visit_order: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.path.is_empty() && self.distance_meters.is_finite()
    }
}

// Occupancy Grid with robot-radius inflation
//
// The raw map comes from an image-derived boolean matrix (true = occupied).
// The inflated map marks every cell within `robot_radius_pixels` (Chebyshev)
// of an occupied cell, so a point-robot check on it approximates a disk robot
// on the raw map.

use std::convert::TryFrom;

use itertools::iproduct;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{Cell, RoutingError, RoutingResult};

/// Configuration for building an occupancy grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Map scale in meters per pixel
    pub meters_per_pixel: f64,
    /// Robot radius in meters
    pub robot_radius_meters: f64,
    /// Ring search limit when snapping an item location to an aisle cell
    pub access_search_radius: usize,
    /// Grayscale pixels darker than this are obstacles
    pub obstacle_threshold: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            meters_per_pixel: 0.1,
            robot_radius_meters: 0.3,
            access_search_radius: 50,
            obstacle_threshold: 128,
        }
    }
}

/// Scale and clearance metadata the persistence layer stores next to a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMetadata {
    pub width: usize,
    pub height: usize,
    pub meters_per_pixel: f64,
    pub robot_radius_meters: f64,
    pub robot_radius_pixels: usize,
}

/// Immutable raw + inflated obstacle map.
///
/// Changing the scale or the robot radius produces a new grid instead of
/// mutating this one, so the inflated layer can never go stale.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    raw: DMatrix<bool>,
    inflated: DMatrix<bool>,
    meters_per_pixel: f64,
    robot_radius_meters: f64,
    robot_radius_pixels: usize,
}

impl OccupancyGrid {
    /// Build from an obstacle matrix indexed `(row = y, column = x)`.
    pub fn build(
        raw: DMatrix<bool>,
        meters_per_pixel: f64,
        robot_radius_meters: f64,
    ) -> RoutingResult<Self> {
        if raw.nrows() == 0 || raw.ncols() == 0 {
            return Err(RoutingError::InvalidGrid("obstacle matrix is empty".to_string()));
        }
        validate_scale(1.0, meters_per_pixel)?;
        validate_radius(robot_radius_meters)?;

        let extent = raw.nrows().max(raw.ncols());
        let robot_radius_pixels = radius_in_pixels(robot_radius_meters, meters_per_pixel, extent);
        let inflated = inflate(&raw, robot_radius_pixels);

        debug!(
            width = raw.ncols(),
            height = raw.nrows(),
            robot_radius_pixels,
            "inflated occupancy grid"
        );

        Ok(Self {
            raw,
            inflated,
            meters_per_pixel,
            robot_radius_meters,
            robot_radius_pixels,
        })
    }

    /// Build from row-major rows (`rows[y][x]`).
    pub fn from_rows(
        rows: &[Vec<bool>],
        meters_per_pixel: f64,
        robot_radius_meters: f64,
    ) -> RoutingResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        if let Some(y) = rows.iter().position(|row| row.len() != width) {
            return Err(RoutingError::InvalidGrid(format!(
                "row {} has {} cells, expected {}",
                y,
                rows[y].len(),
                width
            )));
        }
        let raw = DMatrix::from_fn(height, width, |y, x| rows[y][x]);
        Self::build(raw, meters_per_pixel, robot_radius_meters)
    }

    /// Build from a row-major grayscale buffer; pixels below `threshold` are obstacles.
    pub fn from_luma(
        width: usize,
        height: usize,
        pixels: &[u8],
        threshold: u8,
        meters_per_pixel: f64,
        robot_radius_meters: f64,
    ) -> RoutingResult<Self> {
        if pixels.len() != width * height {
            return Err(RoutingError::InvalidGrid(format!(
                "expected {} pixels for {}x{}, got {}",
                width * height,
                width,
                height,
                pixels.len()
            )));
        }
        let raw = DMatrix::from_fn(height, width, |y, x| pixels[y * width + x] < threshold);
        Self::build(raw, meters_per_pixel, robot_radius_meters)
    }

    /// Build from rows using the scale and radius of a `GridConfig`.
    pub fn from_config(rows: &[Vec<bool>], config: &GridConfig) -> RoutingResult<Self> {
        Self::from_rows(rows, config.meters_per_pixel, config.robot_radius_meters)
    }

    /// New grid calibrated so that `pixel_distance` pixels span `real_distance_meters`.
    pub fn with_scale(&self, pixel_distance: f64, real_distance_meters: f64) -> RoutingResult<Self> {
        validate_scale(pixel_distance, real_distance_meters)?;
        Self::build(
            self.raw.clone(),
            real_distance_meters / pixel_distance,
            self.robot_radius_meters,
        )
    }

    /// New grid re-inflated for a different robot radius.
    pub fn with_robot_radius(&self, robot_radius_meters: f64) -> RoutingResult<Self> {
        validate_radius(robot_radius_meters)?;
        Self::build(self.raw.clone(), self.meters_per_pixel, robot_radius_meters)
    }

    pub fn width(&self) -> usize {
        self.raw.ncols()
    }

    pub fn height(&self) -> usize {
        self.raw.nrows()
    }

    pub fn meters_per_pixel(&self) -> f64 {
        self.meters_per_pixel
    }

    pub fn robot_radius_meters(&self) -> f64 {
        self.robot_radius_meters
    }

    pub fn robot_radius_pixels(&self) -> usize {
        self.robot_radius_pixels
    }

    pub fn raw(&self) -> &DMatrix<bool> {
        &self.raw
    }

    pub fn inflated(&self) -> &DMatrix<bool> {
        &self.inflated
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width() && (cell.y as usize) < self.height()
    }

    /// Occupancy on the inflated layer; cells outside the map count as occupied.
    pub fn is_obstacle(&self, cell: Cell) -> bool {
        !self.contains(cell) || self.inflated[(cell.y as usize, cell.x as usize)]
    }

    /// Occupancy on the un-inflated layer (shelf vs aisle). Outside the map is free.
    pub fn is_obstacle_raw(&self, cell: Cell) -> bool {
        self.contains(cell) && self.raw[(cell.y as usize, cell.x as usize)]
    }

    /// Walkability on the inflated layer.
    ///
    /// With `use_radius` the eight points at `±robot_radius_pixels` around
    /// the cell are sampled as well. Sample points outside the map do not block.
    /// This looser check is only meant for validating clicked positions;
    /// path search uses `use_radius = false`.
    pub fn is_walkable(&self, cell: Cell, use_radius: bool) -> bool {
        if self.is_obstacle(cell) {
            return false;
        }
        if !use_radius {
            return true;
        }

        let r = self.robot_radius_pixels as i32;
        let offsets = [-r, 0, r];
        iproduct!(offsets.iter(), offsets.iter())
            .map(|(&dx, &dy)| cell.offset(dx, dy))
            .filter(|point| self.contains(*point))
            .all(|point| !self.inflated[(point.y as usize, point.x as usize)])
    }

    /// Nearest walkable cell by expanding square rings `1..=max_radius`.
    ///
    /// The first ring holding a walkable cell wins; inside that ring the
    /// Euclidean-closest cell is chosen, ties going to the smaller `(x, y)`.
    pub fn find_nearest_walkable(&self, cell: Cell, max_radius: usize) -> Option<Cell> {
        if self.is_walkable(cell, false) {
            return Some(cell);
        }

        // Rings past the farthest map corner hold no cells of it
        let span = |c: i32, len: usize| -> i64 {
            let c = i64::from(c);
            c.abs().max((c - len as i64 + 1).abs())
        };
        let farthest = span(cell.x, self.width()).max(span(cell.y, self.height()));
        let limit = i64::try_from(max_radius)
            .unwrap_or(i64::MAX)
            .min(farthest)
            .min(i64::from(i32::MAX)) as i32;
        for r in 1..=limit {
            let nearest = iproduct!(-r..=r, -r..=r)
                .filter(|&(dx, dy)| dx.abs() == r || dy.abs() == r)
                .map(|(dx, dy)| cell.offset(dx, dy))
                .filter(|candidate| self.is_walkable(*candidate, false))
                .min_by_key(|candidate| (candidate.distance_sq(&cell), candidate.x, candidate.y));
            if nearest.is_some() {
                return nearest;
            }
        }

        None
    }

    pub fn obstacle_count(&self) -> usize {
        self.raw.iter().filter(|&&occupied| occupied).count()
    }

    pub fn inflated_count(&self) -> usize {
        self.inflated.iter().filter(|&&occupied| occupied).count()
    }

    pub fn metadata(&self) -> MapMetadata {
        MapMetadata {
            width: self.width(),
            height: self.height(),
            meters_per_pixel: self.meters_per_pixel,
            robot_radius_meters: self.robot_radius_meters,
            robot_radius_pixels: self.robot_radius_pixels,
        }
    }
}

fn validate_scale(pixel_distance: f64, real_distance: f64) -> RoutingResult<()> {
    let meters_per_pixel = real_distance / pixel_distance;
    if !(pixel_distance > 0.0) || !(meters_per_pixel > 0.0) || !meters_per_pixel.is_finite() {
        return Err(RoutingError::InvalidScale {
            pixel_distance,
            real_distance,
        });
    }
    Ok(())
}

fn validate_radius(radius: f64) -> RoutingResult<()> {
    if !(radius > 0.0) || !radius.is_finite() {
        return Err(RoutingError::InvalidRadius { radius });
    }
    Ok(())
}

/// At least one pixel, and never more than the map extent: a larger square
/// already covers the whole map.
fn radius_in_pixels(robot_radius_meters: f64, meters_per_pixel: f64, extent: usize) -> usize {
    ((robot_radius_meters / meters_per_pixel).round() as usize).clamp(1, extent.max(1))
}

/// Square dilation by `r`, done as a row pass followed by a column pass.
fn inflate(raw: &DMatrix<bool>, r: usize) -> DMatrix<bool> {
    let (height, width) = raw.shape();

    let rows = DMatrix::from_fn(height, width, |y, x| {
        let lo = x.saturating_sub(r);
        let hi = x.saturating_add(r).min(width - 1);
        (lo..=hi).any(|cx| raw[(y, cx)])
    });

    DMatrix::from_fn(height, width, |y, x| {
        let lo = y.saturating_sub(r);
        let hi = y.saturating_add(r).min(height - 1);
        (lo..=hi).any(|cy| rows[(cy, x)])
    })
}

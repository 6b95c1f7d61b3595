//! Item registry with map placement and access points

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::common::{Cell, Item, RoutingError, RoutingResult};
use crate::mapping::OccupancyGrid;

/// Items keyed by id, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Item>) -> RoutingResult<Self> {
        let mut catalog = Self::new();
        for item in items {
            catalog.insert(item)?;
        }
        Ok(catalog)
    }

    /// Add an item; ids must be unique.
    pub fn insert(&mut self, item: Item) -> RoutingResult<()> {
        if self.index.contains_key(&item.id) {
            return Err(RoutingError::InvalidParameter(format!(
                "duplicate item id '{}'",
                item.id
            )));
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    fn get_mut(&mut self, id: &str) -> RoutingResult<&mut Item> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.items[i]),
            None => Err(RoutingError::UnknownItem {
                item_id: id.to_string(),
            }),
        }
    }

    /// Put an item on the map and snap its access point to the nearest
    /// walkable cell within `max_radius`.
    pub fn place_item(
        &mut self,
        id: &str,
        location: Cell,
        grid: &OccupancyGrid,
        max_radius: usize,
    ) -> RoutingResult<Option<Cell>> {
        let access_point = grid.find_nearest_walkable(location, max_radius);
        let item = self.get_mut(id)?;
        item.location = Some(location);
        item.access_point = access_point;

        match access_point {
            Some(cell) => debug!(item = id, ?location, access = ?cell, "item placed"),
            None => warn!(item = id, ?location, max_radius, "no walkable cell near item"),
        }
        Ok(access_point)
    }

    /// Recompute every access point against a rebuilt grid.
    ///
    /// Returns the number of placed items that lost their access point.
    pub fn refresh_access_points(&mut self, grid: &OccupancyGrid, max_radius: usize) -> usize {
        let mut lost = 0;
        for item in self.items.iter_mut() {
            if let Some(location) = item.location {
                item.access_point = grid.find_nearest_walkable(location, max_radius);
                if item.access_point.is_none() {
                    lost += 1;
                }
            }
        }
        if lost > 0 {
            warn!(lost, "items without access point after grid change");
        }
        lost
    }

    /// First placed item within Chebyshev `tolerance` of `cell`.
    pub fn item_at(&self, cell: Cell, tolerance: usize) -> Option<&Item> {
        self.items.iter().find(|item| {
            item.location
                .map_or(false, |location| location.chebyshev(&cell) <= tolerance)
        })
    }

    /// Ids usable as route waypoints.
    pub fn ids_with_access(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.is_routable())
            .map(|item| item.id.clone())
            .collect()
    }

    /// Access points for `ids`, in the same order.
    pub fn access_points(&self, ids: &[String]) -> RoutingResult<Vec<Cell>> {
        ids.iter()
            .map(|id| {
                let item = self.get(id).ok_or_else(|| RoutingError::UnknownItem {
                    item_id: id.clone(),
                })?;
                item.access_point.ok_or_else(|| RoutingError::MissingAccessPoint {
                    item_id: id.clone(),
                })
            })
            .collect()
    }
}

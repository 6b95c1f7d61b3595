// Shared warehouse layout for mission planning tests

use crate::common::{Cell, Item};
use crate::mapping::OccupancyGrid;
use crate::mission_planning::ItemCatalog;
use crate::path_planning::{AStarConfig, AStarPlanner};

pub(crate) const START: Cell = Cell { x: 1, y: 1 };
pub(crate) const END: Cell = Cell { x: 28, y: 18 };

/// Aisle cells beside the shelves (the access points of `warehouse_catalog`)
pub(crate) const AISLE_POINTS: [Cell; 6] = [
    Cell { x: 3, y: 5 },
    Cell { x: 9, y: 12 },
    Cell { x: 11, y: 4 },
    Cell { x: 17, y: 8 },
    Cell { x: 19, y: 14 },
    Cell { x: 25, y: 6 },
];

/// 30x20 map, 0.5 m per pixel, three shelf blocks x 5..=7, 13..=15, 21..=23
/// over y 3..=15. Inflated by one pixel.
pub(crate) fn warehouse_grid() -> OccupancyGrid {
    let mut rows = vec![vec![false; 30]; 20];
    for shelf_x in [5usize, 13, 21].iter() {
        for row in rows.iter_mut().take(16).skip(3) {
            for x in *shelf_x..*shelf_x + 3 {
                row[x] = true;
            }
        }
    }
    OccupancyGrid::from_rows(&rows, 0.5, 0.5).unwrap()
}

pub(crate) fn generous_planner(grid: &OccupancyGrid) -> AStarPlanner<'_> {
    AStarPlanner::new(
        grid,
        AStarConfig {
            max_expansions: Some(1_000_000),
            ..Default::default()
        },
    )
}

/// Six items placed on shelf cells, access points snapped into the aisles.
pub(crate) fn warehouse_catalog(grid: &OccupancyGrid, quantity: u32) -> ItemCatalog {
    let shelf_slots = [
        ("A001", Cell::new(5, 5)),
        ("A002", Cell::new(7, 12)),
        ("A003", Cell::new(13, 4)),
        ("A004", Cell::new(15, 8)),
        ("A005", Cell::new(21, 14)),
        ("A006", Cell::new(23, 6)),
    ];
    let mut catalog = ItemCatalog::new();
    for (id, location) in shelf_slots.iter() {
        catalog.insert(Item::new(id, quantity)).unwrap();
        catalog.place_item(id, *location, grid, 10).unwrap();
    }
    catalog
}

// Warehouse picking demo
//
// Builds a synthetic shelf layout, places items, generates stock-limited
// pick batches, sequences them into nights and routes every batch.

use warehouse_routing::common::{Cell, Item, PlannerConfig, RoutingResult};
use warehouse_routing::mapping::OccupancyGrid;
use warehouse_routing::mission_planning::{
    analyze_efficiency, group_into_nights, sequence_cost, BatchRunner, ItemCatalog, RouteSequencer,
    SampleGenerator, SequenceOptimizer,
};
use warehouse_routing::path_planning::AStarPlanner;

const WIDTH: usize = 120;
const HEIGHT: usize = 80;
const NUM_BATCHES: usize = 20;

/// Grayscale warehouse: white floor, black border and four shelf rows.
fn synthetic_map() -> Vec<u8> {
    let mut pixels = vec![255u8; WIDTH * HEIGHT];
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let border = x < 2 || y < 2 || x >= WIDTH - 2 || y >= HEIGHT - 2;
            let shelf = (15..65).contains(&y) && (0..4).any(|i| (20 + 24 * i..26 + 24 * i).contains(&x));
            if border || shelf {
                pixels[y * WIDTH + x] = 0;
            }
        }
    }
    pixels
}

fn build_catalog(grid: &OccupancyGrid, search_radius: usize) -> RoutingResult<ItemCatalog> {
    let mut catalog = ItemCatalog::new();
    for shelf in 0..4 {
        for slot in 0..5 {
            let id = format!("SKU-{}{:02}", (b'A' + shelf as u8) as char, slot + 1);
            let quantity = 4 + ((shelf * 5 + slot) % 4) as u32;
            catalog.insert(Item::new(&id, quantity))?;

            let location = Cell::new(20 + 24 * shelf, 20 + 10 * slot);
            catalog.place_item(&id, location, grid, search_radius)?;
        }
    }
    Ok(catalog)
}

fn main() -> RoutingResult<()> {
    let mut config = PlannerConfig::default();
    config.a_star.expansion_divisor = 1;
    config.validate()?;

    let grid = OccupancyGrid::from_luma(
        WIDTH,
        HEIGHT,
        &synthetic_map(),
        config.grid.obstacle_threshold,
        config.grid.meters_per_pixel,
        config.grid.robot_radius_meters,
    )?;
    let meta = grid.metadata();
    println!(
        "map {}x{} px, {:.2} m/px, robot radius {} px, {} obstacle / {} inflated cells",
        meta.width,
        meta.height,
        meta.meters_per_pixel,
        meta.robot_radius_pixels,
        grid.obstacle_count(),
        grid.inflated_count()
    );

    let catalog = build_catalog(&grid, config.grid.access_search_radius)?;
    println!(
        "{} items placed, {} reachable",
        catalog.len(),
        catalog.ids_with_access().len()
    );

    let k = config.sampling.batch_size;
    let mut generator = SampleGenerator::seeded(2024, config.sampling.clone());
    let batches = generator.generate_constrained(catalog.items(), NUM_BATCHES, k)?;

    let night_size = config.sequencing.night_size;
    let optimizer = SequenceOptimizer::new(config.sequencing.clone());
    let ordered = optimizer.optimize(&batches, night_size)?;
    println!(
        "changeovers: {} -> {} across {} batches",
        sequence_cost(&batches),
        sequence_cost(&ordered),
        ordered.len()
    );

    let report = analyze_efficiency(&group_into_nights(&ordered, night_size)?);
    for night in &report.nights {
        println!(
            "night {}: {} batches, {} unique items, {} changeovers, efficiency {:.1}%",
            night.index + 1,
            night.batch_count,
            night.unique_items,
            night.total_changeovers,
            night.efficiency * 100.0
        );
    }
    println!("overall efficiency {:.1}%", report.overall_efficiency * 100.0);

    let planner = AStarPlanner::new(&grid, config.a_star.clone());
    let runner = BatchRunner::new(RouteSequencer::new(planner, config.route.clone()));
    let start = Cell::new(6, 6);
    let end = Cell::new(WIDTH as i32 - 7, HEIGHT as i32 - 7);
    let routes = runner.run(&catalog, &ordered, start, end, |progress| {
        if progress.completed % 10 == 0 || progress.completed == progress.total {
            println!("routed {}/{}", progress.completed, progress.total);
        }
    });

    for record in routes.records().take(3) {
        println!(
            "route {}: {} -> {:.2} m, {} cells",
            record.route_id,
            record.items.join(", "),
            record.distance_meters,
            record.path_length
        );
    }
    for (batch_index, error) in routes.failures() {
        println!("batch {} failed: {}", batch_index + 1, error);
    }
    println!("{} routes ok, {} failed", routes.succeeded, routes.failed);

    Ok(())
}

//! Aggregate configuration for a planning session

use serde::{Deserialize, Serialize};

use crate::common::error::{RoutingError, RoutingResult};
use crate::mapping::GridConfig;
use crate::mission_planning::{RouteConfig, SamplingConfig, SequenceConfig};
use crate::path_planning::AStarConfig;

/// Every tunable of the grid, the planners and batch generation.
///
/// Missing sections or fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub grid: GridConfig,
    pub a_star: AStarConfig,
    pub route: RouteConfig,
    pub sampling: SamplingConfig,
    pub sequencing: SequenceConfig,
}

impl PlannerConfig {
    pub fn validate(&self) -> RoutingResult<()> {
        let grid = &self.grid;
        if !(grid.meters_per_pixel > 0.0) || !grid.meters_per_pixel.is_finite() {
            return Err(RoutingError::InvalidScale {
                pixel_distance: 1.0,
                real_distance: grid.meters_per_pixel,
            });
        }
        if !(grid.robot_radius_meters > 0.0) || !grid.robot_radius_meters.is_finite() {
            return Err(RoutingError::InvalidRadius {
                radius: grid.robot_radius_meters,
            });
        }

        let positive = [
            ("a_star.expansion_divisor", self.a_star.expansion_divisor),
            ("sampling.batch_size", self.sampling.batch_size),
            ("sampling.max_attempts", self.sampling.max_attempts),
            ("sampling.per_batch_repeat_limit", self.sampling.per_batch_repeat_limit),
            ("sequencing.night_size", self.sequencing.night_size),
            ("sequencing.start_attempts", self.sequencing.start_attempts),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(RoutingError::InvalidParameter(format!("{} must be positive", name)));
        }

        let ratio = self.sampling.selection_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RoutingError::InvalidParameter(format!(
                "sampling.selection_ratio {} is outside [0, 1]",
                ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.route.exact_waypoint_limit, 7);
        assert_eq!(config.sampling.batch_size, 5);
        assert_eq!(config.sequencing.night_size, 15);
        assert_eq!(config.grid.obstacle_threshold, 128);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: PlannerConfig = serde_json::from_str(
            r#"{ "grid": { "meters_per_pixel": 0.05 }, "sequencing": { "night_size": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.grid.meters_per_pixel, 0.05);
        assert_eq!(config.grid.robot_radius_meters, 0.3);
        assert_eq!(config.sequencing.night_size, 10);
        assert_eq!(config.sequencing.reversal_window, 5);
        assert_eq!(config.a_star, AStarConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PlannerConfig::default();
        config.grid.robot_radius_meters = 0.0;
        assert_eq!(config.validate(), Err(RoutingError::InvalidRadius { radius: 0.0 }));

        let mut config = PlannerConfig::default();
        config.grid.meters_per_pixel = -0.1;
        assert!(matches!(config.validate(), Err(RoutingError::InvalidScale { .. })));

        let mut config = PlannerConfig::default();
        config.sequencing.night_size = 0;
        assert_eq!(
            config.validate(),
            Err(RoutingError::InvalidParameter(
                "sequencing.night_size must be positive".to_string()
            ))
        );

        let mut config = PlannerConfig::default();
        config.sampling.selection_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}

//! Common types, traits, and error definitions for warehouse_routing
//!
//! This module provides the plain data shared by the grid, the path
//! planners and the batch planning layer.

pub mod types;
pub mod traits;
pub mod error;
pub mod cancel;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use cancel::CancellationToken;
pub use config::PlannerConfig;

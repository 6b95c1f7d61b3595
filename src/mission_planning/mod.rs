// Mission planning module

pub mod batch_runner;
pub mod catalog;
pub mod route_sequencer;
pub mod sample_generator;
pub mod sequence_optimizer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use batch_runner::*;
pub use catalog::*;
pub use route_sequencer::*;
pub use sample_generator::*;
pub use sequence_optimizer::*;

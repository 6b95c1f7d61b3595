// Path Planning algorithms module

pub mod a_star;
pub mod distance_matrix;

pub use a_star::*;
pub use distance_matrix::*;

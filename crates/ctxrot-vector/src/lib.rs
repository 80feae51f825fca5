pub mod distance;
pub mod flat;

pub use distance::squared_l2;
pub use flat::VectorIndex;

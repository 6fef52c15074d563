//! AI and navigation module
//!
//! Grid pathfinding for game objects.

mod pathfinding;

pub use pathfinding::{DEFAULT_WEIGHT, Grid, PathResult, find_cell_path, find_path};

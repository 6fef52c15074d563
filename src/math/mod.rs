//! Geometry primitives shared by the renderer and gameplay code

mod bounds;
mod rect;

pub use bounds::Bounds;
pub use rect::Rect;

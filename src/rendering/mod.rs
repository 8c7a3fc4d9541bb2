//! GPU rendering of the particle population.

pub mod points;

pub use points::{drawable_extent, PointRenderer};

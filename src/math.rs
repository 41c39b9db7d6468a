//! Mathematical types.

use cgmath::Point2;

/// A 2D point
pub type Point2d = Point2<f64>;

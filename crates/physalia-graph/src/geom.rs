//! Geometry aliases shared across the workspace.
//!
//! All coordinates are `f64` in an abstract diagram space; the unit tag is not
//! used to distinguish local vs. global coordinates (which container space a
//! value lives in is tracked explicitly where it matters).

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;
pub type Rect = euclid::Rect<f64, Unit>;
pub type Transform = euclid::Transform2D<f64, Unit, Unit>;

/// `top, right, bottom, left` insets, used for container padding and node
/// decoration margins.
pub type SideOffsets = euclid::SideOffsets2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

pub fn size(width: f64, height: f64) -> Size {
    euclid::size2(width, height)
}

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
    euclid::rect(x, y, width, height)
}

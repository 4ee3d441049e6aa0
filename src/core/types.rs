use serde::{Deserialize, Serialize};

/// Box size of the page element a component tree is anchored into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[must_use]
    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[must_use]
    pub fn offset(self, by: Point) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }
}

/// Resolved width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned pixel bounds. `bottom_right` is never above or left of `top_left`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Bounds {
    /// Builds bounds from two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            top_left: Point::new(a.x.min(b.x), a.y.min(b.y)),
            bottom_right: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    #[must_use]
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::from_corners(
            origin,
            Point::new(origin.x + size.width, origin.y + size.height),
        )
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    #[must_use]
    pub fn height(self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }

    #[must_use]
    pub fn x_range(self) -> Range {
        Range::new(self.top_left.x, self.bottom_right.x)
    }

    #[must_use]
    pub fn y_range(self) -> Range {
        Range::new(self.top_left.y, self.bottom_right.y)
    }
}

/// Closed numeric interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[must_use]
    pub fn point(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }
}

/// Minimum size a component needs given the space it was offered.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpaceRequest {
    pub min_width: f64,
    pub min_height: f64,
}

impl SpaceRequest {
    #[must_use]
    pub const fn new(min_width: f64, min_height: f64) -> Self {
        Self {
            min_width,
            min_height,
        }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Clamps negative or NaN minimums to zero.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let clamp = |value: f64| if value.is_nan() { 0.0 } else { value.max(0.0) };
        Self::new(clamp(self.min_width), clamp(self.min_height))
    }
}

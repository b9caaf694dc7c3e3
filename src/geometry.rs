//! Box and point primitives shared by every subsystem
//!
//! Layout space uses `f64` points and integer boxes; output-local damage uses
//! the same `Rect` type in pixel units. Conversions between the two spaces live
//! in `renderer::damage`, not here.

/// A position in layout (or surface-local) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box with integer origin and size
///
/// A box with a non-positive width or height is empty and never intersects
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the smallest integer box covering a floating-point box.
    ///
    /// The origin is floored and the far edge is ceiled so that scaling never
    /// loses a partially covered pixel.
    pub fn covering(x: f64, y: f64, width: f64, height: f64) -> Self {
        let x1 = x.floor();
        let y1 = y.floor();
        let x2 = (x + width).ceil();
        let y2 = (y + height).ceil();
        Self {
            x: x1 as i32,
            y: y1 as i32,
            width: (x2 - x1) as i32,
            height: (y2 - y1) as i32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Two boxes intersect if they share at least one pixel
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Returns `None` if the boxes don't intersect
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }

        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Smallest box containing both (empty inputs are ignored)
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());

        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Scales origin and size, rounding outward
    pub fn scale(&self, factor: f64) -> Rect {
        Rect::covering(
            self.x as f64 * factor,
            self.y as f64 * factor,
            self.width as f64 * factor,
            self.height as f64 * factor,
        )
    }

    /// Half-open containment: the right and bottom edges are outside
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64
            && x < self.right() as f64
            && y >= self.y as f64
            && y < self.bottom() as f64
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

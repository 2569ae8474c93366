use std::fmt;

use crate::store::rtree_constants::FIXED_POINT_SCALE;
use crate::store::rtree_types::{FormatErrorKind, RTreeError, RTreeResult};

/// Coordinate type stored in the index (signed fixed-point).
pub type Coord = i32;

/// A point in index coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Converts a longitude/latitude pair in degrees to fixed-point coordinates.
    ///
    /// Values are scaled by [`FIXED_POINT_SCALE`] and truncated toward zero.
    pub fn from_degrees(lon: f64, lat: f64) -> RTreeResult<Self> {
        Ok(Self {
            x: to_fixed_point(lon)?,
            y: to_fixed_point(lat)?,
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn to_fixed_point(degrees: f64) -> RTreeResult<Coord> {
    let scaled = (degrees * FIXED_POINT_SCALE).trunc();
    if !scaled.is_finite() || scaled < Coord::MIN as f64 || scaled > Coord::MAX as f64 {
        return Err(RTreeError::InvalidOperation(format!(
            "{} degrees does not fit a fixed-point coordinate",
            degrees
        )));
    }
    Ok(scaled as Coord)
}

/// An axis-aligned bounding box `{x0, y0, x1, y1}`.
///
/// Every `Rect` satisfies `x0 <= x1` and `y0 <= y1`. The only ways to get
/// one are the checked constructors and the decoders, which reject
/// inverted boxes, so the invariant holds for the whole crate.
///
/// # Examples
///
/// ```rust
/// use osm_rtree::{Point, Rect};
///
/// let area = Rect::new(0, 0, 100, 100).unwrap();
/// assert!(area.contains_point(Point::new(50, 50)));
/// assert!(Rect::new(10, 0, 5, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    x0: Coord,
    y0: Coord,
    x1: Coord,
    y1: Coord,
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}, {}, {}}}", self.x0, self.y0, self.x1, self.y1)
    }
}

impl Rect {
    /// Creates a rectangle, rejecting inverted corners.
    pub fn new(x0: Coord, y0: Coord, x1: Coord, y1: Coord) -> RTreeResult<Self> {
        if x0 > x1 || y0 > y1 {
            return Err(RTreeError::InvalidOperation(format!(
                "inverted rectangle {{{}, {}, {}, {}}}",
                x0, y0, x1, y1
            )));
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    /// Decoder entry point: same check as [`Rect::new`], reported as a
    /// format error against the node that carried the rectangle.
    pub(crate) fn decode(
        offset: u64,
        x0: Coord,
        y0: Coord,
        x1: Coord,
        y1: Coord,
    ) -> RTreeResult<Self> {
        if x0 > x1 || y0 > y1 {
            return Err(RTreeError::format(
                offset,
                FormatErrorKind::InvertedRect { x0, y0, x1, y1 },
            ));
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    /// A degenerate rectangle covering exactly one point.
    pub fn point(p: Point) -> Self {
        Self {
            x0: p.x,
            y0: p.y,
            x1: p.x,
            y1: p.y,
        }
    }

    /// Builds a rectangle from two longitude/latitude corners in degrees.
    pub fn from_degrees(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> RTreeResult<Self> {
        let a = Point::from_degrees(lon0, lat0)?;
        let b = Point::from_degrees(lon1, lat1)?;
        Self::new(a.x, a.y, b.x, b.y)
    }

    pub fn x0(&self) -> Coord {
        self.x0
    }

    pub fn y0(&self) -> Coord {
        self.y0
    }

    pub fn x1(&self) -> Coord {
        self.x1
    }

    pub fn y1(&self) -> Coord {
        self.y1
    }

    /// Returns the corners as `(x0, y0, x1, y1)`.
    pub fn coords(&self) -> (Coord, Coord, Coord, Coord) {
        (self.x0, self.y0, self.x1, self.y1)
    }

    pub fn width(&self) -> u64 {
        (self.x1 as i64 - self.x0 as i64) as u64
    }

    pub fn height(&self) -> u64 {
        (self.y1 as i64 - self.y0 as i64) as u64
    }

    /// Returns the area. Always fits: each side is below 2^32.
    pub fn area(&self) -> u64 {
        self.width() * self.height()
    }

    /// Checks if this rectangle intersects another (shared edges count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 <= other.x1 && self.x1 >= other.x0 && self.y0 <= other.y1 && self.y1 >= other.y0
    }

    /// Checks if `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    /// Returns the smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grows this rectangle in place to cover `other`.
    pub fn expand(&mut self, other: &Rect) {
        *self = self.union(other);
    }

    /// Area that would be added by growing this rectangle to cover `other`.
    pub fn needed_growth(&self, other: &Rect) -> u64 {
        self.union(other).area().saturating_sub(self.area())
    }

    pub fn is_point(&self) -> bool {
        self.x0 == self.x1 && self.y0 == self.y1
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Integer cell coordinate. `x` runs along the scroll direction (columns),
/// `y` along a column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    /// `(0, 0)`, also the `Default` value.
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    /// Builds a point from its coordinates.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the point moved by `(dx, dy)`.
    pub const fn offset(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Sparse mapping from cells to glyphs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphMap {
    cells: BTreeMap<Point, char>,
}

/// A glyph map shifted so that its minimum coordinates are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedImage {
    pub image: GlyphMap,
    pub width: u64,
    pub height: u64,
    /// Minimum x and y of the source map.
    pub origin: Point,
}

impl GlyphMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the glyph at `point`, replacing any previous one.
    pub fn insert(&mut self, point: Point, glyph: char) {
        self.cells.insert(point, glyph);
    }

    /// Returns the glyph at `point`.
    pub fn get(&self, point: Point) -> Option<char> {
        self.cells.get(&point).copied()
    }

    /// Returns whether `point` holds a glyph.
    pub fn contains(&self, point: Point) -> bool {
        self.cells.contains_key(&point)
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates cells in point order.
    pub fn iter(&self) -> impl Iterator<Item = (Point, char)> + '_ {
        self.cells.iter().map(|(point, glyph)| (*point, *glyph))
    }

    /// Iterates occupied points in order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.cells.keys().copied()
    }

    /// Minimum and maximum corners, or `None` for an empty map.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut points = self.points();
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }

    /// Returns a copy with every cell moved by `(dx, dy)`.
    pub fn translate(&self, dx: i64, dy: i64) -> GlyphMap {
        self.iter()
            .map(|(point, glyph)| (point.offset(dx, dy), glyph))
            .collect()
    }

    /// Shifts the map so its minimum corner sits at the origin. An empty
    /// map yields an empty image with zero size.
    pub fn normalize(&self) -> NormalizedImage {
        let Some((min, max)) = self.bounds() else {
            return NormalizedImage::default();
        };

        NormalizedImage {
            image: self.translate(-min.x, -min.y),
            width: (max.x - min.x + 1) as u64,
            height: (max.y - min.y + 1) as u64,
            origin: min,
        }
    }

    /// Copies every cell of `other` into `self`, overwriting collisions.
    pub fn merge(&mut self, other: &GlyphMap) {
        self.cells.extend(other.iter());
    }
}

impl FromIterator<(Point, char)> for GlyphMap {
    fn from_iter<I: IntoIterator<Item = (Point, char)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl NormalizedImage {
    /// Moves the image back to where the source map was.
    pub fn restore(&self) -> GlyphMap {
        self.image.translate(self.origin.x, self.origin.y)
    }
}

/// Radius and center of one circle to rasterize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleDescriptor {
    pub radius: u32,
    pub center: Point,
}

impl CircleDescriptor {
    /// Rasterizes this circle with `glyph`; see [`circle`].
    pub fn rasterize(&self, glyph: char) -> GlyphMap {
        circle(self.radius, self.center, glyph)
    }
}

/// Rasterizes a circle outline with the midpoint algorithm, stepping one
/// octant and mirroring it eight ways.
pub fn circle(radius: u32, center: Point, glyph: char) -> GlyphMap {
    let mut image = GlyphMap::new();
    let mut decision = 3 - 2 * i64::from(radius);
    let mut cx: i64 = 0;
    let mut cy = i64::from(radius);

    while cx <= cy {
        for (dx, dy) in [
            (cx, -cy),
            (cy, -cx),
            (cy, cx),
            (cx, cy),
            (-cx, cy),
            (-cy, cx),
            (-cy, -cx),
            (-cx, -cy),
        ] {
            image.insert(center.offset(dx, dy), glyph);
        }

        if decision < 0 {
            decision += 4 * cx + 6;
        } else {
            decision += 4 * (cx - cy) + 10;
            cy -= 1;
        }
        cx += 1;
    }

    image
}

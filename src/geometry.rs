//! Immutable geometry value types.
//!
//! Points, sizes and rectangles are plain `Copy` values reconstructed at
//! every step rather than shared and mutated, so no two collaborators can
//! alias the same rectangle.

/// A point in window-local logical coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A size in logical coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Size {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    pub loc: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            loc: Point::new(x, y),
            size: Size::new(w, h),
        }
    }

    /// A rectangle of the given size at the origin.
    pub fn from_size(size: Size) -> Self {
        Self {
            loc: Point::default(),
            size,
        }
    }

    pub fn left(self) -> f64 {
        self.loc.x
    }

    pub fn top(self) -> f64 {
        self.loc.y
    }

    pub fn right(self) -> f64 {
        self.loc.x + self.size.w
    }

    pub fn bottom(self) -> f64 {
        self.loc.y + self.size.h
    }

    pub fn center(self) -> Point {
        Point::new(
            self.loc.x + self.size.w / 2.0,
            self.loc.y + self.size.h / 2.0,
        )
    }

    pub fn is_empty(self) -> bool {
        self.size.w <= 0.0 || self.size.h <= 0.0
    }

    /// Containment is half-open: the right and bottom edges are excluded.
    pub fn contains(self, pos: Point) -> bool {
        pos.x >= self.left() && pos.x < self.right() && pos.y >= self.top() && pos.y < self.bottom()
    }

    /// Splits into two child rectangles at `ratio`, leaving a divider gap.
    ///
    /// `ratio` is the share of the first child. The divider is centered on
    /// the cut line and belongs to neither child.
    pub fn split_at(self, orientation: Orientation, ratio: f64, divider: f64) -> (Rect, Rect) {
        let ratio = ratio.clamp(0.0, 1.0);
        match orientation {
            Orientation::Horizontal => {
                let avail = (self.size.w - divider).max(0.0);
                let first_w = avail * ratio;
                let first = Rect::new(self.loc.x, self.loc.y, first_w, self.size.h);
                let second = Rect::new(
                    self.loc.x + first_w + divider,
                    self.loc.y,
                    avail - first_w,
                    self.size.h,
                );
                (first, second)
            }
            Orientation::Vertical => {
                let avail = (self.size.h - divider).max(0.0);
                let first_h = avail * ratio;
                let first = Rect::new(self.loc.x, self.loc.y, self.size.w, first_h);
                let second = Rect::new(
                    self.loc.x,
                    self.loc.y + first_h + divider,
                    self.size.w,
                    avail - first_h,
                );
                (first, second)
            }
        }
    }

    /// The half of this rectangle on the given side of a split.
    pub fn half(self, orientation: Orientation, side: SplitSide) -> Rect {
        let (first, second) = match orientation {
            Orientation::Horizontal => (
                Rect::new(self.loc.x, self.loc.y, self.size.w / 2.0, self.size.h),
                Rect::new(
                    self.loc.x + self.size.w / 2.0,
                    self.loc.y,
                    self.size.w / 2.0,
                    self.size.h,
                ),
            ),
            Orientation::Vertical => (
                Rect::new(self.loc.x, self.loc.y, self.size.w, self.size.h / 2.0),
                Rect::new(
                    self.loc.x,
                    self.loc.y + self.size.h / 2.0,
                    self.size.w,
                    self.size.h / 2.0,
                ),
            ),
        };
        match side {
            SplitSide::First => first,
            SplitSide::Second => second,
        }
    }
}

/// Split orientation: horizontal lays children out side by side, vertical
/// stacks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Which child of a split: first is left/top, second is right/bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitSide {
    First,
    Second,
}

impl SplitSide {
    pub fn other(self) -> SplitSide {
        match self {
            SplitSide::First => SplitSide::Second,
            SplitSide::Second => SplitSide::First,
        }
    }

    pub fn index(self) -> usize {
        match self {
            SplitSide::First => 0,
            SplitSide::Second => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn split_leaves_divider_gap() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let (first, second) = rect.split_at(Orientation::Horizontal, 0.5, 4.0);
        assert_abs_diff_eq!(first.size.w, 48.0);
        assert_abs_diff_eq!(second.loc.x, 52.0);
        assert_abs_diff_eq!(second.size.w, 48.0);
        assert_abs_diff_eq!(first.size.h, 50.0);
    }

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(!rect.contains(Point::new(30.0, 10.0)));
        assert!(!rect.contains(Point::new(10.0, 30.0)));
    }

    #[test]
    fn halves_cover_the_rect() {
        let rect = Rect::new(0.0, 0.0, 80.0, 40.0);
        let first = rect.half(Orientation::Vertical, SplitSide::First);
        let second = rect.half(Orientation::Vertical, SplitSide::Second);
        assert_abs_diff_eq!(first.bottom(), second.top());
        assert_abs_diff_eq!(second.bottom(), rect.bottom());
    }
}

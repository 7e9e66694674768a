//! Geometry
//!
//! DOMRect, as supplied by the host's layout for each element.

/// DOMRect - rectangle geometry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    /// Create with dimensions
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Check if rects overlap or touch
    pub fn intersects(&self, other: &DOMRect) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }

    /// Get intersection rect (zero-area when the rects only touch)
    pub fn intersection(&self, other: &DOMRect) -> Option<DOMRect> {
        if !self.intersects(other) {
            return None;
        }

        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        Some(DOMRect::from_xywh(x, y, right - x, bottom - y))
    }

    /// Grow the rect by the given edge amounts
    pub fn expand(&self, top: f64, right: f64, bottom: f64, left: f64) -> DOMRect {
        DOMRect::from_xywh(
            self.x - left,
            self.y - top,
            self.width + left + right,
            self.height + top + bottom,
        )
    }

    /// Move the rect by an offset
    pub fn translate(&self, dx: f64, dy: f64) -> DOMRect {
        DOMRect::from_xywh(self.x + dx, self.y + dy, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = DOMRect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let b = DOMRect::from_xywh(50.0, 50.0, 100.0, 100.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, DOMRect::from_xywh(50.0, 50.0, 50.0, 50.0));
    }

    #[test]
    fn test_touching_edges() {
        let a = DOMRect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let b = DOMRect::from_xywh(0.0, 100.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b).map(|r| r.area()), Some(0.0));
        assert!(a.intersection(&b.translate(0.0, 1.0)).is_none());
    }

    #[test]
    fn test_expand() {
        let r = DOMRect::from_xywh(0.0, 0.0, 800.0, 600.0).expand(300.0, 100.0, 300.0, 100.0);
        assert_eq!(r, DOMRect::from_xywh(-100.0, -300.0, 1000.0, 1200.0));
    }
}

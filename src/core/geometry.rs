use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle, half-open: `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn x1(&self) -> u32 {
        self.x + self.width
    }

    pub fn y1(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x1() && py >= self.y && py < self.y1()
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.x1() && other.x < self.x1() && self.y < other.y1() && other.y < self.y1()
    }

    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self {
            x,
            y,
            width: self.x1().max(other.x1()) - x,
            height: self.y1().max(other.y1()) - y,
        }
    }

    /// Shrinks the rectangle by `ratio` of its size on every side, keeping at
    /// least one pixel in each dimension.
    pub fn inset(&self, ratio: f32) -> Self {
        let dx = ((self.width as f32 * ratio) as u32).min(self.width.saturating_sub(1) / 2);
        let dy = ((self.height as f32 * ratio) as u32).min(self.height.saturating_sub(1) / 2);
        Self {
            x: self.x + dx,
            y: self.y + dy,
            width: self.width - 2 * dx,
            height: self.height - 2 * dy,
        }
    }

    /// Clamps the rectangle to a `width × height` canvas.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.x1().min(width) - x,
            height: self.y1().min(height) - y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn adjacent_rects_do_not_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(10, 0, 10, 10);
        assert!(!a.intersects(&b));
        assert_eq!(a.union(&b), PixelRect::new(0, 0, 20, 10));
    }

    #[test]
    fn inset_keeps_a_pixel() {
        let r = PixelRect::new(5, 5, 3, 3).inset(0.45);
        assert_eq!(r, PixelRect::new(6, 6, 1, 1));
        let r = PixelRect::new(0, 0, 100, 50).inset(0.1);
        assert_eq!(r, PixelRect::new(10, 5, 80, 40));
    }

    #[test]
    fn clamps_to_canvas() {
        let r = PixelRect::new(90, 40, 20, 20).clamp_to(100, 50);
        assert_eq!(r, PixelRect::new(90, 40, 10, 10));
    }
}

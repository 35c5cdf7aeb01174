//! Pointer position in normalized device coordinates.

use crate::Vec2;

/// Last known pointer position, x and y in `[-1, 1]`, +y up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerTracker {
    pos: Vec2,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.pos
    }

    /// Overwrite the position from window coordinates (origin top-left).
    /// Positions outside the window are clamped to the edge.
    pub fn on_move(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let nx = (x / width) * 2.0 - 1.0;
        let ny = -(y / height) * 2.0 + 1.0;
        self.pos = Vec2::new(nx.clamp(-1.0, 1.0) as f32, ny.clamp(-1.0, 1.0) as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(x: f64, y: f64) -> Vec2 {
        let mut p = PointerTracker::new();
        p.on_move(x, y, 800.0, 600.0);
        p.position()
    }

    #[test]
    fn corners_map_to_ndc_corners() {
        assert_eq!(moved(0.0, 0.0), Vec2::new(-1.0, 1.0));
        assert_eq!(moved(800.0, 600.0), Vec2::new(1.0, -1.0));
        assert_eq!(moved(800.0, 0.0), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn centre_maps_to_origin() {
        assert_eq!(moved(400.0, 300.0), Vec2::ZERO);
    }

    #[test]
    fn every_pixel_stays_in_range() {
        let mut p = PointerTracker::new();
        for x in (0..=800).step_by(7) {
            for y in (0..=600).step_by(11) {
                p.on_move(x as f64, y as f64, 800.0, 600.0);
                let v = p.position();
                assert!((-1.0..=1.0).contains(&v.x));
                assert!((-1.0..=1.0).contains(&v.y));
            }
        }
    }

    #[test]
    fn outside_window_is_clamped() {
        assert_eq!(moved(-50.0, 900.0), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn last_move_wins() {
        let mut p = PointerTracker::new();
        p.on_move(0.0, 0.0, 800.0, 600.0);
        p.on_move(400.0, 300.0, 800.0, 600.0);
        assert_eq!(p.position(), Vec2::ZERO);
    }

    #[test]
    fn degenerate_viewport_keeps_previous_value() {
        let mut p = PointerTracker::new();
        p.on_move(800.0, 0.0, 800.0, 600.0);
        p.on_move(10.0, 10.0, 0.0, 600.0);
        assert_eq!(p.position(), Vec2::new(1.0, 1.0));
    }
}

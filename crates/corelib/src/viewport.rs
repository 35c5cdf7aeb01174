//! Window size bookkeeping for the resize handler.

use crate::error::{CoreError, CoreResult};

/// Logical window size plus the device pixel ratio used for the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
    max_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64, max_pixel_ratio: f64) -> CoreResult<Self> {
        let mut vp = Self {
            width: 1.0,
            height: 1.0,
            pixel_ratio: 1.0,
            max_pixel_ratio,
        };
        vp.resize(width, height, device_pixel_ratio)?;
        Ok(vp)
    }

    /// Store a new logical size. Sizes below one are clamped to one; the
    /// pixel ratio is capped at the configured maximum.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) -> CoreResult<()> {
        if !width.is_finite() || !height.is_finite() {
            return Err(CoreError::InvalidViewport { width, height });
        }
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        self.pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio.min(self.max_pixel_ratio)
        } else {
            1.0
        };
        Ok(())
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        (self.width / self.height) as f32
    }

    /// Size of the drawing surface in physical pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        let w = (self.width * self.pixel_ratio).floor().max(1.0);
        let h = (self.height * self.pixel_ratio).floor().max(1.0);
        (w as u32, h as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let vp = Viewport::new(800.0, 600.0, 3.0, 2.0).unwrap();
        assert_eq!(vp.pixel_ratio, 2.0);
        assert_eq!(vp.surface_size(), (1600, 1200));
    }

    #[test]
    fn low_ratio_passes_through() {
        let vp = Viewport::new(800.0, 600.0, 1.5, 2.0).unwrap();
        assert_eq!(vp.surface_size(), (1200, 900));
    }

    #[test]
    fn resize_is_idempotent() {
        let mut once = Viewport::new(640.0, 480.0, 1.0, 2.0).unwrap();
        once.resize(1024.0, 768.0, 2.5).unwrap();
        let mut twice = once;
        twice.resize(1024.0, 768.0, 2.5).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.aspect(), twice.aspect());
    }

    #[test]
    fn zero_size_is_clamped() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 2.0).unwrap();
        assert_eq!(vp.surface_size(), (1, 1));
        assert_eq!(vp.aspect(), 1.0);
    }

    #[test]
    fn non_finite_size_is_rejected() {
        let mut vp = Viewport::new(800.0, 600.0, 1.0, 2.0).unwrap();
        assert!(vp.resize(f64::NAN, 600.0, 1.0).is_err());
        assert_eq!(vp.width, 800.0);
    }
}

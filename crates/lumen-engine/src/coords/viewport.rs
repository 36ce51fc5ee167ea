use crate::error::{RenderError, Result};

/// Viewport size in physical pixels.
///
/// Both dimensions are strictly positive. Construction from signed values goes
/// through [`Viewport::try_new`], which rejects zero and negative sizes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Validates and creates a viewport.
    pub fn try_new(width: i64, height: i64) -> Result<Self> {
        if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    #[inline]
    pub fn width_f32(self) -> f32 {
        self.width as f32
    }

    #[inline]
    pub fn height_f32(self) -> f32 {
        self.height as f32
    }

    #[inline]
    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Half-size viewport used by reduced-resolution passes. Never collapses to zero.
    #[inline]
    pub fn halved(self) -> Self {
        Self {
            width: (self.width / 2).max(1),
            height: (self.height / 2).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_dimensions() {
        for (w, h) in [(0, 600), (800, 0), (-1, 600), (800, -600), (0, 0)] {
            let err = Viewport::try_new(w, h).unwrap_err();
            assert!(matches!(err, RenderError::InvalidViewport { .. }), "{w}x{h}");
        }
    }

    #[test]
    fn aspect_ratio() {
        let vp = Viewport::try_new(800, 600).unwrap();
        assert!((vp.aspect_ratio() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn halved_never_reaches_zero() {
        let vp = Viewport::try_new(1, 1).unwrap();
        assert_eq!(vp.halved(), vp);
        let vp = Viewport::try_new(801, 600).unwrap();
        assert_eq!(vp.halved(), Viewport { width: 400, height: 300 });
    }
}

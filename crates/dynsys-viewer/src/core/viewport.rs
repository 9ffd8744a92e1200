use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height; 1.0 for an empty viewport.
    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width.max(1) as f32, self.height.max(1) as f32)
    }

    /// Map a CSS-pixel offset on an element of `css_size` to physical pixels.
    pub fn css_to_physical(&self, offset: Vec2, css_size: Vec2) -> Vec2 {
        offset * self.size() / css_size.max(Vec2::ONE)
    }
}

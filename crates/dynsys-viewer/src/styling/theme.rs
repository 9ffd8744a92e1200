//! Dark theme used by the viewer.

use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Colour palette for the scene. Colours are linear RGBA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerTheme {
    pub background: Vec4,
    pub axis_color: Vec4,
    pub tick_color: Vec4,
    pub label_color: Vec4,
    pub title_color: Vec4,
    /// Grid RGB; alpha comes from `AxesConfig::grid_opacity`.
    pub grid_color: Vec4,
    /// Trajectory colour at the first sample.
    pub trajectory_start: Vec4,
    /// Trajectory colour at the last sample.
    pub trajectory_end: Vec4,
}

impl Default for ViewerTheme {
    fn default() -> Self {
        Self {
            background: Vec4::new(0.08, 0.09, 0.11, 1.0), // deep charcoal
            axis_color: Vec4::new(0.65, 0.68, 0.72, 1.0),
            tick_color: Vec4::new(0.65, 0.68, 0.72, 1.0),
            label_color: Vec4::new(0.75, 0.78, 0.82, 1.0),
            title_color: Vec4::new(0.95, 0.96, 0.97, 1.0),
            grid_color: Vec4::new(0.45, 0.48, 0.52, 1.0),
            trajectory_start: Vec4::new(0.25, 0.65, 0.85, 1.0), // blue
            trajectory_end: Vec4::new(0.35, 0.78, 0.48, 1.0),   // green
        }
    }
}

impl ViewerTheme {
    /// Grid colour with the configured opacity applied.
    pub fn grid_with_opacity(&self, opacity: f32) -> Vec4 {
        let mut c = self.grid_color;
        c.w = opacity.clamp(0.0, 1.0);
        c
    }

    /// Colour for sample `index` of `count`, blending start to end.
    pub fn trajectory_color(&self, index: usize, count: usize) -> Vec4 {
        let t = if count > 1 {
            index as f32 / (count - 1) as f32
        } else {
            0.0
        };
        self.trajectory_start.lerp(self.trajectory_end, t)
    }

    pub fn background_wgpu(&self) -> wgpu::Color {
        wgpu::Color {
            r: self.background.x as f64,
            g: self.background.y as f64,
            b: self.background.z as f64,
            a: self.background.w as f64,
        }
    }

    /// Colour as an 8-bit CSS `rgba()` string for canvas text.
    pub fn css_rgba(color: Vec4) -> String {
        let c = (color.truncate() * 255.0).round();
        format!(
            "rgba({}, {}, {}, {:.3})",
            c.x as u8,
            c.y as u8,
            c.z as u8,
            color.w.clamp(0.0, 1.0)
        )
    }
}

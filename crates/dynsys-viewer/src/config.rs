//! Viewer configuration.
//!
//! Every section is fully defaulted so hosts can supply partial documents
//! (YAML/JSON/TOML from the CLI, a plain JS object in the browser).

use crate::core::bounds::ComponentMapping;
use crate::core::normalize::ScaleMode;
use crate::styling::ViewerTheme;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub normalizer: NormalizerConfig,
    pub ticks: TickConfig,
    pub camera: CameraConfig,
    pub axes: AxesConfig,
    pub mapping: ComponentMapping,
    pub theme: ViewerTheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Edge length of the render cube the data is fitted into.
    pub target_extent: f64,
    pub scale_mode: ScaleMode,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_extent: 2.0,
            scale_mode: ScaleMode::Isotropic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub min_ticks: usize,
    pub max_ticks: usize,
    /// Preferred on-screen distance between ticks; drives zoom-dependent density.
    pub desired_spacing_px: f32,
    pub label_format: LabelFormat,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            min_ticks: 5,
            max_ticks: 15,
            desired_spacing_px: 90.0,
            label_format: LabelFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelFormat {
    /// Magnitudes at or above this use scientific notation.
    pub scientific_upper: f64,
    /// Non-zero magnitudes at or below this use scientific notation.
    pub scientific_lower: f64,
    pub significant_digits: usize,
    pub max_decimals: usize,
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self {
            scientific_upper: 1.0e3,
            scientific_lower: 1.0e-3,
            significant_digits: 3,
            max_decimals: 4,
        }
    }
}

/// What the orbit camera looks at after a new trajectory is plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    /// The render origin, i.e. the centre of the bounding box.
    #[default]
    Origin,
    /// The centroid of the trajectory samples.
    TrajectoryCenter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub polar_deg: f32,
    pub azimuth_deg: f32,
    /// Starting distance; `None` frames the render cube.
    pub initial_radius: Option<f32>,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Keeps the polar angle away from the poles (radians).
    pub polar_epsilon: f32,
    /// Radians per dragged pixel.
    pub rotate_sensitivity: f32,
    /// Wheel delta to log-zoom factor.
    pub zoom_sensitivity: f32,
    pub focus_mode: FocusMode,
    /// Re-frame the camera whenever a new trajectory is plotted.
    pub reset_on_plot: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            polar_deg: 60.0,
            azimuth_deg: 45.0,
            initial_radius: None,
            min_radius: 0.5,
            max_radius: 50.0,
            polar_epsilon: 0.01,
            rotate_sensitivity: 0.005,
            zoom_sensitivity: 0.0015,
            focus_mode: FocusMode::Origin,
            reset_on_plot: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    /// Tick length as a fraction of the render tick spacing.
    pub tick_length_fraction: f64,
    /// Upper bound on tick length as a fraction of the render extent.
    pub max_tick_length_fraction: f64,
    /// Gap between tick end and label anchor, as a fraction of the render extent.
    pub label_gap_fraction: f64,
    pub label_size_px: f32,
    pub title_size_px: f32,
    pub axis_names: [String; 3],
    pub show_titles: bool,
    pub show_grid: bool,
    pub grid_opacity: f32,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            tick_length_fraction: 0.2,
            max_tick_length_fraction: 0.05,
            label_gap_fraction: 0.04,
            label_size_px: 12.0,
            title_size_px: 14.0,
            axis_names: ["x[0]".to_string(), "x[1]".to_string(), "x[2]".to_string()],
            show_titles: true,
            show_grid: true,
            grid_opacity: 0.25,
        }
    }
}

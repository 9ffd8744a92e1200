//! Data-to-render scaling.
//!
//! Trajectories arrive in arbitrary units (1e-6 or 1e6 are both common). The
//! normaliser centres the bounding box on the render origin and scales it to
//! a fixed render extent so the camera, tick lengths and label offsets can use
//! fixed constants.

use crate::config::NormalizerConfig;
use crate::core::bounds::{Axis, BoundingBox, TrajectoryPoint};
use crate::error::Result;
use crate::LOG_TARGET;
use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// One factor for every axis; preserves the trajectory's shape.
    #[default]
    Isotropic,
    /// Independent factors; every axis fills the render cube.
    Anisotropic,
}

/// Per-axis affine map from data space to render space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneTransform {
    pub scale: DVec3,
    pub translation: DVec3,
}

impl Default for SceneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SceneTransform {
    pub const IDENTITY: SceneTransform = SceneTransform {
        scale: DVec3::ONE,
        translation: DVec3::ZERO,
    };

    pub fn to_render(&self, data: DVec3) -> DVec3 {
        data * self.scale + self.translation
    }

    pub fn to_render_f32(&self, data: DVec3) -> Vec3 {
        self.to_render(data).as_vec3()
    }

    pub fn to_data(&self, render: DVec3) -> DVec3 {
        (render - self.translation) / self.scale
    }

    pub fn scale_of(&self, axis: Axis) -> f64 {
        self.scale[axis.index()]
    }

    /// The data bounds expressed in render coordinates.
    pub fn render_bounds(&self, bounds: &BoundingBox) -> BoundingBox {
        BoundingBox::new(self.to_render(bounds.min), self.to_render(bounds.max))
    }
}

/// Result of normalising one trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub bounds: BoundingBox,
    pub transform: SceneTransform,
    pub degenerate: [bool; 3],
}

#[derive(Debug, Clone, Default)]
pub struct ScaleNormalizer {
    config: NormalizerConfig,
}

impl ScaleNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn normalize(&self, points: &[TrajectoryPoint]) -> Result<Normalized> {
        let bounds = BoundingBox::from_points(points)?;
        Ok(self.normalize_bounds(bounds))
    }

    pub fn normalize_bounds(&self, bounds: BoundingBox) -> Normalized {
        let target = self.config.target_extent;
        let degenerate = Axis::ALL.map(|a| bounds.is_degenerate(a));

        // half-extents keep spans near f64::MAX finite
        let half = bounds.max * 0.5 - bounds.min * 0.5;
        let fit = Axis::ALL.map(|a| {
            if degenerate[a.index()] {
                return None;
            }
            let factor = (target * 0.5) / half[a.index()];
            (factor.is_finite() && factor > 0.0).then_some(factor)
        });

        for axis in Axis::ALL {
            let i = axis.index();
            if degenerate[i] {
                log::warn!(
                    target: LOG_TARGET,
                    "axis {:?} has zero extent at {}; using unit scale",
                    axis,
                    bounds.min[i]
                );
            } else if fit[i].is_none() {
                log::warn!(
                    target: LOG_TARGET,
                    "axis {:?} extent [{}, {}] cannot be fitted; using unit scale",
                    axis,
                    bounds.min[i],
                    bounds.max[i]
                );
            }
        }

        let scale = match self.config.scale_mode {
            ScaleMode::Isotropic => {
                let uniform = fit.iter().flatten().copied().fold(f64::INFINITY, f64::min);
                let uniform = if uniform.is_finite() { uniform } else { 1.0 };
                DVec3::from_array(fit.map(|f| if f.is_some() { uniform } else { 1.0 }))
            }
            ScaleMode::Anisotropic => DVec3::from_array(fit.map(|f| f.unwrap_or(1.0))),
        };

        let transform = SceneTransform {
            scale,
            translation: -bounds.center() * scale,
        };
        log::debug!(
            target: LOG_TARGET,
            "normalized bounds {:?} -> scale {:?} translation {:?}",
            bounds.as_tuple(),
            transform.scale,
            transform.translation
        );

        Normalized {
            bounds,
            transform,
            degenerate,
        }
    }
}

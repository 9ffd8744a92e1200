//! Orbit camera for trajectory navigation
//!
//! The camera sits on a sphere around a focus point and always looks at it.
//! Spherical state is the source of truth; matrices are derived and cached.
//! Polar angle and radius are clamped on every update so the view matrix
//! never degenerates (looking straight along world up, or zero distance).

use crate::config::CameraConfig;
use crate::core::interaction::{Modifiers, MouseButton};
use crate::core::viewport::Viewport;
use crate::LOG_TARGET;
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use std::f32::consts::PI;

/// Clamp bounds for the spherical state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitLimits {
    pub min_radius: f32,
    pub max_radius: f32,
    pub polar_epsilon: f32,
}

impl OrbitLimits {
    fn from_config(cfg: &CameraConfig) -> Self {
        let min_radius = cfg.min_radius.max(1e-4);
        Self {
            min_radius,
            max_radius: cfg.max_radius.max(min_radius),
            polar_epsilon: cfg.polar_epsilon.clamp(1e-6, PI / 4.0),
        }
    }

    pub fn clamp_polar(&self, polar: f32) -> f32 {
        polar.clamp(self.polar_epsilon, PI - self.polar_epsilon)
    }

    pub fn clamp_radius(&self, radius: f32) -> f32 {
        radius.clamp(self.min_radius, self.max_radius)
    }
}

/// Immutable copy of what the axis builder needs from the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Vec3,
    pub focus: Vec3,
    pub view_proj: Mat4,
    pub viewport: Viewport,
}

impl CameraSnapshot {
    /// Project a world point to pixel coordinates (origin top-left).
    /// `None` when the point is behind the camera.
    pub fn project_to_screen(&self, world: Vec3) -> Option<Vec2> {
        project(self.view_proj, self.viewport, world)
    }
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub radius: f32,
    /// Angle from world up (+Y), radians.
    pub polar: f32,
    /// Angle around world up measured from +X towards +Z, radians.
    pub azimuth: f32,
    pub focus: Vec3,

    pub fov: f32,
    pub aspect_ratio: f32,
    pub limits: OrbitLimits,

    pub rotate_sensitivity: f32,
    pub zoom_sensitivity: f32,

    /// Render-space size of the scene, used for clip planes and framing.
    scene_extent: f32,
    home: (f32, f32, f32),

    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_proj_dirty: bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(&CameraConfig::default(), 2.0)
    }
}

impl OrbitCamera {
    pub fn new(cfg: &CameraConfig, scene_extent: f32) -> Self {
        let limits = OrbitLimits::from_config(cfg);
        let fov = cfg.fov_deg.clamp(5.0, 150.0).to_radians();
        let scene_extent = scene_extent.max(1e-3);
        let radius = limits.clamp_radius(
            cfg.initial_radius
                .unwrap_or_else(|| framing_radius(scene_extent, fov)),
        );
        let polar = limits.clamp_polar(cfg.polar_deg.to_radians());
        let azimuth = cfg.azimuth_deg.to_radians();
        let mut camera = Self {
            radius,
            polar,
            azimuth,
            focus: Vec3::ZERO,
            fov,
            aspect_ratio: 4.0 / 3.0,
            limits,
            rotate_sensitivity: cfg.rotate_sensitivity,
            zoom_sensitivity: cfg.zoom_sensitivity,
            scene_extent,
            home: (radius, polar, azimuth),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_proj_dirty: true,
        };
        camera.update_matrices();
        camera
    }

    /// Eye position derived from the spherical state.
    pub fn position(&self) -> Vec3 {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        self.focus + self.radius * Vec3::new(sin_p * cos_a, cos_p, sin_p * sin_a)
    }

    /// Orbit by a pointer delta in pixels.
    pub fn rotate(&mut self, delta_px: Vec2) {
        let d = delta_px * self.rotate_sensitivity;
        self.orbit_by(-d.x, d.y);
    }

    /// Orbit by raw angles. Azimuth is unbounded; polar is clamped.
    pub fn orbit_by(&mut self, d_azimuth: f32, d_polar: f32) {
        if !d_azimuth.is_finite() || !d_polar.is_finite() {
            return;
        }
        self.azimuth = (self.azimuth + d_azimuth).rem_euclid(2.0 * PI);
        self.polar = self.limits.clamp_polar(self.polar + d_polar);
        self.view_proj_dirty = true;
    }

    /// Multiply the radius by `factor` (> 1 moves away). Invalid factors are ignored.
    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.radius = self.limits.clamp_radius(self.radius * factor);
        self.view_proj_dirty = true;
    }

    /// Update aspect ratio (call when the viewport resizes)
    pub fn update_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
            self.view_proj_dirty = true;
        }
    }

    /// Call after writing the spherical fields directly.
    pub fn mark_dirty(&mut self) {
        self.view_proj_dirty = true;
    }

    pub fn set_focus(&mut self, focus: Vec3) {
        self.focus = focus;
        self.view_proj_dirty = true;
    }

    pub fn set_scene_extent(&mut self, extent: f32) {
        self.scene_extent = extent.max(1e-3);
        self.view_proj_dirty = true;
    }

    /// Back to the configured starting angles and distance.
    pub fn reset(&mut self) {
        let (radius, polar, azimuth) = self.home;
        self.radius = radius;
        self.polar = polar;
        self.azimuth = azimuth;
        self.view_proj_dirty = true;
    }

    /// Distance at which the whole scene fits the vertical field of view.
    pub fn framing_radius(&self) -> f32 {
        self.limits
            .clamp_radius(framing_radius(self.scene_extent, self.fov))
    }

    pub fn view_matrix(&mut self) -> Mat4 {
        if self.view_proj_dirty {
            self.update_matrices();
        }
        self.view_matrix
    }

    pub fn projection_matrix(&mut self) -> Mat4 {
        if self.view_proj_dirty {
            self.update_matrices();
        }
        self.projection_matrix
    }

    pub fn view_proj_matrix(&mut self) -> Mat4 {
        if self.view_proj_dirty {
            self.update_matrices();
        }
        self.projection_matrix * self.view_matrix
    }

    pub fn snapshot(&mut self, viewport: Viewport) -> CameraSnapshot {
        CameraSnapshot {
            position: self.position(),
            focus: self.focus,
            view_proj: self.view_proj_matrix(),
            viewport,
        }
    }

    /// Clip planes bracketing the scene at the current distance.
    pub fn clip_planes(&self) -> (f32, f32) {
        let reach = self.scene_extent * 2.0;
        let near = (self.radius - reach).max(self.radius * 0.01).max(1e-3);
        let far = (self.radius + reach).max(near + 1.0);
        (near, far)
    }

    fn update_matrices(&mut self) {
        self.view_matrix = Mat4::look_at_rh(self.position(), self.focus, Vec3::Y);
        let (near, far) = self.clip_planes();
        self.projection_matrix = Mat4::perspective_rh(self.fov, self.aspect_ratio, near, far);
        log::trace!(
            target: LOG_TARGET,
            "camera r={:.3} polar={:.3} azimuth={:.3} near={:.3} far={:.3} aspect={:.3}",
            self.radius,
            self.polar,
            self.azimuth,
            near,
            far,
            self.aspect_ratio
        );
        self.view_proj_dirty = false;
    }
}

fn framing_radius(extent: f32, fov: f32) -> f32 {
    // bounding sphere of a cube with edge `extent`
    let sphere = extent * 3f32.sqrt() * 0.5;
    sphere / (fov * 0.5).sin() * 1.1
}

pub(crate) fn project(view_proj: Mat4, viewport: Viewport, world: Vec3) -> Option<Vec2> {
    let clip = view_proj * world.extend(1.0);
    if clip.w <= 1e-6 {
        return None;
    }
    let ndc = clip.xyz() / clip.w;
    let size = viewport.size();
    Some(Vec2::new(
        (ndc.x + 1.0) * 0.5 * size.x,
        (1.0 - ndc.y) * 0.5 * size.y,
    ))
}

/// Turns pointer and wheel input into camera updates.
#[derive(Debug, Default)]
pub struct CameraController {
    pub active_button: Option<MouseButton>,
    pub last_mouse_pos: Vec2,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active_button.is_some()
    }

    pub fn mouse_press(&mut self, position: Vec2, button: MouseButton) {
        self.last_mouse_pos = position;
        self.active_button = Some(button);
    }

    pub fn mouse_release(&mut self, button: MouseButton) {
        if self.active_button == Some(button) {
            self.active_button = None;
        }
    }

    /// Drag orbits; Ctrl/Cmd slows it down; Shift-drag dollies.
    /// Returns `true` when the camera changed.
    pub fn mouse_move(
        &mut self,
        position: Vec2,
        modifiers: Modifiers,
        camera: &mut OrbitCamera,
    ) -> bool {
        let delta = position - self.last_mouse_pos;
        self.last_mouse_pos = position;
        if self.active_button.is_none() || delta.length_squared() == 0.0 {
            return false;
        }

        if modifiers.shift {
            // drag up moves closer
            let factor = (delta.y * camera.zoom_sensitivity * 4.0).exp().clamp(0.2, 5.0);
            camera.zoom(factor);
        } else {
            let fine = if modifiers.ctrl || modifiers.meta { 0.35 } else { 1.0 };
            camera.rotate(delta * fine);
        }
        true
    }

    /// Wheel zoom: positive deltas (scroll down) zoom out.
    pub fn mouse_wheel(&mut self, delta_y: f32, camera: &mut OrbitCamera) -> bool {
        if !delta_y.is_finite() || delta_y == 0.0 {
            return false;
        }
        let factor = (delta_y * camera.zoom_sensitivity).exp().clamp(0.2, 5.0);
        let before = camera.radius;
        camera.zoom(factor);
        camera.radius != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default(), 2.0)
    }

    #[test]
    fn position_follows_spherical_convention() {
        let mut cam = camera();
        cam.radius = 2.0;
        cam.polar = PI / 2.0;
        cam.azimuth = 0.0;
        assert!((cam.position() - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        cam.azimuth = PI / 2.0;
        assert!((cam.position() - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn polar_never_reaches_the_poles() {
        let mut cam = camera();
        let eps = cam.limits.polar_epsilon;
        cam.orbit_by(0.0, 10.0);
        assert_eq!(cam.polar, PI - eps);
        cam.orbit_by(0.0, -10.0);
        assert_eq!(cam.polar, eps);
        assert!(cam.view_proj_matrix().is_finite());
    }

    #[test]
    fn zoom_respects_radius_limits() {
        let mut cam = camera();
        for _ in 0..200 {
            cam.zoom(0.5);
        }
        assert_eq!(cam.radius, cam.limits.min_radius);
        for _ in 0..200 {
            cam.zoom(2.0);
        }
        assert_eq!(cam.radius, cam.limits.max_radius);
    }

    #[test]
    fn invalid_zoom_factors_are_ignored() {
        let mut cam = camera();
        let r = cam.radius;
        cam.zoom(0.0);
        cam.zoom(-1.0);
        cam.zoom(f32::NAN);
        assert_eq!(cam.radius, r);
    }

    #[test]
    fn resize_only_touches_aspect() {
        let mut cam = camera();
        let (r, p, a) = (cam.radius, cam.polar, cam.azimuth);
        cam.update_aspect_ratio(2.5);
        assert_eq!(cam.aspect_ratio, 2.5);
        assert_eq!((cam.radius, cam.polar, cam.azimuth), (r, p, a));
    }

    #[test]
    fn default_view_frames_the_cube() {
        let mut cam = camera();
        let snap = cam.snapshot(Viewport::new(800, 800));
        for corner in [Vec3::splat(-1.0), Vec3::splat(1.0), Vec3::new(1.0, -1.0, 1.0)] {
            let p = snap.project_to_screen(corner).expect("in front");
            assert!(p.x > 0.0 && p.x < 800.0 && p.y > 0.0 && p.y < 800.0, "{corner} -> {p}");
        }
    }

    #[test]
    fn controller_drag_orbits_and_release_stops() {
        let mut cam = camera();
        let mut ctl = CameraController::new();
        let azimuth = cam.azimuth;

        ctl.mouse_press(Vec2::new(10.0, 10.0), MouseButton::Left);
        assert!(ctl.mouse_move(Vec2::new(30.0, 10.0), Modifiers::default(), &mut cam));
        let expected = (azimuth - 20.0 * cam.rotate_sensitivity).rem_euclid(2.0 * PI);
        assert!((cam.azimuth - expected).abs() < 1e-5);

        ctl.mouse_release(MouseButton::Left);
        assert!(!ctl.mouse_move(Vec2::new(60.0, 40.0), Modifiers::default(), &mut cam));
    }

    #[test]
    fn wheel_down_zooms_out() {
        let mut cam = camera();
        let mut ctl = CameraController::new();
        let r = cam.radius;
        assert!(ctl.mouse_wheel(100.0, &mut cam));
        assert!(cam.radius > r);
    }
}

//! Viewer engine shared by every host
//!
//! Owns the view state and the primitive registry. Input events become camera
//! transitions and each visible change triggers a full decoration rebuild.
//! Hosts (the browser canvas, the CLI inspector) only feed events in and read
//! frames out.

use crate::config::{FocusMode, ViewerConfig};
use crate::core::{
    validate_points, Axis, AxisBuilder, BoundingBox, CameraController, ComponentMapping,
    Normalized, OrbitCamera, PrimitiveKind, PrimitiveRegistry, PrimitiveSet, ScaleNormalizer,
    SceneSnapshot, TickPlanner, TickSet, TrajectoryPoint, Vertex, ViewerEvent, Viewport,
};
use crate::error::Result;
use crate::LOG_TARGET;
use glam::{DVec3, Mat4, Vec3};
use serde::Serialize;
use std::collections::BTreeMap;

/// The currently plotted trajectory and everything derived from it at plot time.
#[derive(Debug, Clone)]
pub struct TrajectorySession {
    pub points: Vec<TrajectoryPoint>,
    pub normalized: Normalized,
    /// Mean of the samples, in data space.
    pub centroid: DVec3,
}

impl TrajectorySession {
    pub fn bounds(&self) -> &BoundingBox {
        &self.normalized.bounds
    }

    pub fn render_centroid(&self) -> Vec3 {
        self.normalized.transform.to_render_f32(self.centroid)
    }
}

/// Everything a rebuild reads.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub session: Option<TrajectorySession>,
    pub camera: OrbitCamera,
    pub viewport: Viewport,
}

/// What the render loop needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSnapshot {
    pub view_proj: Mat4,
    pub viewport: Viewport,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewerStats {
    pub rebuilds: u64,
    pub rejected_trajectories: u64,
    pub points: usize,
    pub generation: u64,
}

pub struct Viewer {
    config: ViewerConfig,
    mapping: ComponentMapping,
    state: ViewState,
    controller: CameraController,
    normalizer: ScaleNormalizer,
    planner: TickPlanner,
    builder: AxisBuilder,
    registry: PrimitiveRegistry,
    last_ticks: Option<[TickSet; 3]>,
    stats: ViewerStats,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let mapping = ComponentMapping::new(config.mapping.0)?;
        let extent = config.normalizer.target_extent as f32;
        let mut camera = OrbitCamera::new(&config.camera, extent);
        let viewport = Viewport::default();
        camera.update_aspect_ratio(viewport.aspect());

        log::debug!(
            target: LOG_TARGET,
            "viewer created: mapping={:?} scale_mode={:?} extent={}",
            mapping.0,
            config.normalizer.scale_mode,
            extent
        );

        Ok(Self {
            mapping,
            state: ViewState {
                session: None,
                camera,
                viewport,
            },
            controller: CameraController::new(),
            normalizer: ScaleNormalizer::new(config.normalizer.clone()),
            planner: TickPlanner::new(config.ticks.clone()),
            builder: AxisBuilder::new(config.axes.clone(), config.theme.clone()),
            registry: PrimitiveRegistry::new(),
            last_ticks: None,
            stats: ViewerStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.state.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.state.camera
    }

    pub fn registry(&self) -> &PrimitiveRegistry {
        &self.registry
    }

    pub fn session(&self) -> Option<&TrajectorySession> {
        self.state.session.as_ref()
    }

    /// Ticks from the last rebuild, ordered X, Y, Z.
    pub fn ticks(&self) -> Option<&[TickSet; 3]> {
        self.last_ticks.as_ref()
    }

    pub fn stats(&self) -> ViewerStats {
        ViewerStats {
            generation: self.registry.generation(),
            ..self.stats
        }
    }

    /// Map raw simulation rows through the session's component mapping and plot them.
    pub fn set_trajectory_rows<R: AsRef<[f64]>>(&mut self, rows: &[R]) -> Result<()> {
        match self.mapping.map_rows(rows) {
            Ok(points) => self.set_trajectory(points),
            Err(err) => self.reject(err),
        }
    }

    /// Replace the plotted trajectory. On error the previous session stays on screen.
    pub fn set_trajectory(&mut self, points: Vec<TrajectoryPoint>) -> Result<()> {
        if let Err(err) = validate_points(&points) {
            return self.reject(err);
        }
        let normalized = match self.normalizer.normalize(&points) {
            Ok(n) => n,
            Err(err) => return self.reject(err),
        };

        let n = points.len() as f64;
        let centroid = points.iter().fold(DVec3::ZERO, |acc, p| acc + p.0 / n);
        let session = TrajectorySession {
            points,
            normalized,
            centroid,
        };

        let trajectory = self.trajectory_vertices(&session);
        self.registry
            .replace(PrimitiveKind::Trajectory, PrimitiveSet::Lines(trajectory));

        if self.config.camera.reset_on_plot {
            self.state.camera.reset();
        }
        let focus = match self.config.camera.focus_mode {
            FocusMode::Origin => Vec3::ZERO,
            FocusMode::TrajectoryCenter => session.render_centroid(),
        };
        self.state.camera.set_focus(focus);

        log::debug!(
            target: LOG_TARGET,
            "trajectory set: {} points, bounds {:?}, degenerate {:?}",
            session.points.len(),
            session.bounds().as_tuple(),
            session.normalized.degenerate
        );
        self.stats.points = session.points.len();
        self.state.session = Some(session);
        self.rebuild();
        Ok(())
    }

    /// Drop the trajectory and every decoration.
    pub fn clear(&mut self) {
        self.state.session = None;
        self.last_ticks = None;
        self.stats.points = 0;
        self.registry.clear();
        log::debug!(target: LOG_TARGET, "viewer cleared");
    }

    /// Feed one input event. Returns `true` when the scene was rebuilt.
    pub fn handle_event(&mut self, event: ViewerEvent) -> bool {
        // pure orbiting keeps tick positions; anything touching distance or size replans
        let (changed, replan) = match event {
            ViewerEvent::PointerDown {
                position, button, ..
            } => {
                self.controller.mouse_press(position, button);
                (false, false)
            }
            ViewerEvent::PointerMove {
                position,
                modifiers,
            } => (
                self.controller
                    .mouse_move(position, modifiers, &mut self.state.camera),
                modifiers.shift,
            ),
            ViewerEvent::PointerUp { button, .. } => {
                self.controller.mouse_release(button);
                (false, false)
            }
            ViewerEvent::Wheel { delta_y, .. } => (
                self.controller.mouse_wheel(delta_y, &mut self.state.camera),
                true,
            ),
            ViewerEvent::Resize { width, height } => (self.apply_resize(width, height), true),
        };
        if changed {
            self.rebuild_decorations(replan);
        }
        changed
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.handle_event(ViewerEvent::Resize { width, height })
    }

    /// Orbit by raw angles and rebuild. Tick positions are kept.
    pub fn rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        self.state.camera.orbit_by(d_azimuth, d_polar);
        self.rebuild_decorations(false);
    }

    /// Scale the camera distance and rebuild.
    pub fn zoom(&mut self, factor: f32) {
        self.state.camera.zoom(factor);
        self.rebuild();
    }

    /// Regenerate axes, ticks, labels and grid from the current state.
    pub fn rebuild(&mut self) {
        self.rebuild_decorations(true);
    }

    fn rebuild_decorations(&mut self, replan: bool) {
        let Some(scene) = self.scene_snapshot() else {
            self.last_ticks = None;
            self.registry
                .swap_in(&PrimitiveKind::DECORATIONS, BTreeMap::new());
            return;
        };
        let layout = scene.layout();
        let lengths = scene.projected_lengths(&layout);

        let ticks = match self.last_ticks.take() {
            Some(ticks) if !replan => ticks,
            _ => Axis::ALL.map(|axis| {
                let (lo, hi) = scene.bounds.range(axis);
                let target = self.planner.target_for_length(lengths[axis.index()]);
                self.planner.plan(axis, lo, hi, target)
            }),
        };

        let primitives = self.builder.build_with_layout(&scene, &layout, &ticks);
        self.registry.swap_in(
            &PrimitiveKind::DECORATIONS,
            primitives.into_sets(self.builder.config().show_grid),
        );
        self.stats.rebuilds += 1;

        log::debug!(
            target: LOG_TARGET,
            "rebuild #{}: front {:?} ticks {:?} replanned={} edge px {:?}",
            self.stats.rebuilds,
            layout.faces.front,
            ticks.each_ref().map(TickSet::len),
            replan,
            lengths
        );
        self.last_ticks = Some(ticks);
    }

    /// Bounds and camera captured together; `None` without a trajectory.
    pub fn scene_snapshot(&mut self) -> Option<SceneSnapshot> {
        let session = self.state.session.as_ref()?;
        Some(SceneSnapshot {
            bounds: *session.bounds(),
            transform: session.normalized.transform,
            camera: self.state.camera.snapshot(self.state.viewport),
            target_extent: self.normalizer.config().target_extent,
        })
    }

    pub fn frame(&mut self) -> FrameSnapshot {
        FrameSnapshot {
            view_proj: self.state.camera.view_proj_matrix(),
            viewport: self.state.viewport,
            generation: self.registry.generation(),
        }
    }

    fn apply_resize(&mut self, width: u32, height: u32) -> bool {
        let viewport = Viewport::new(width, height);
        if viewport.is_empty() || viewport == self.state.viewport {
            return false;
        }
        self.state.viewport = viewport;
        self.state.camera.update_aspect_ratio(viewport.aspect());
        log::debug!(target: LOG_TARGET, "viewport resized to {width}x{height}");
        true
    }

    fn trajectory_vertices(&self, session: &TrajectorySession) -> Vec<Vertex> {
        let theme = &self.config.theme;
        let transform = &session.normalized.transform;
        let count = session.points.len();
        let vertex = |i: usize| {
            Vertex::new(
                transform.to_render_f32(session.points[i].0),
                theme.trajectory_color(i, count),
            )
        };

        if count == 1 {
            // a lone sample still shows up as a zero-length segment
            return vec![vertex(0), vertex(0)];
        }
        let mut out = Vec::with_capacity((count - 1) * 2);
        for i in 1..count {
            out.push(vertex(i - 1));
            out.push(vertex(i));
        }
        out
    }

    fn reject(&mut self, err: crate::error::ViewerError) -> Result<()> {
        self.stats.rejected_trajectories += 1;
        log::warn!(target: LOG_TARGET, "trajectory rejected: {err}");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Modifiers, MouseButton};
    use glam::Vec2;

    fn viewer() -> Viewer {
        Viewer::new(ViewerConfig::default()).unwrap()
    }

    #[test]
    fn empty_viewer_has_no_decorations() {
        let mut v = viewer();
        v.rebuild();
        assert!(v.registry().is_empty());
        assert!(v.ticks().is_none());
    }

    #[test]
    fn trajectory_segments_chain_consecutive_points() {
        let mut v = viewer();
        v.set_trajectory(vec![
            TrajectoryPoint::new(0.0, 0.0, 0.0),
            TrajectoryPoint::new(1.0, 0.0, 0.0),
            TrajectoryPoint::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        let lines = v.registry().lines(PrimitiveKind::Trajectory);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].position, lines[2].position);
    }

    #[test]
    fn drag_rebuilds_and_release_stops() {
        let mut v = viewer();
        v.set_trajectory(vec![
            TrajectoryPoint::new(0.0, 0.0, 0.0),
            TrajectoryPoint::new(1.0, 2.0, 3.0),
        ])
        .unwrap();
        let before = v.stats().rebuilds;
        let m = Modifiers::default();
        assert!(!v.handle_event(ViewerEvent::PointerDown {
            position: Vec2::new(10.0, 10.0),
            button: MouseButton::Left,
            modifiers: m,
        }));
        assert!(v.handle_event(ViewerEvent::PointerMove {
            position: Vec2::new(40.0, 25.0),
            modifiers: m,
        }));
        v.handle_event(ViewerEvent::PointerUp {
            position: Vec2::new(40.0, 25.0),
            button: MouseButton::Left,
        });
        assert!(!v.handle_event(ViewerEvent::PointerMove {
            position: Vec2::new(80.0, 25.0),
            modifiers: m,
        }));
        assert_eq!(v.stats().rebuilds, before + 1);
    }

    #[test]
    fn orbiting_keeps_tick_positions() {
        let mut v = viewer();
        v.set_trajectory(vec![
            TrajectoryPoint::new(-30.0, 0.0, 0.0),
            TrajectoryPoint::new(70.0, 1.0, 2.0),
        ])
        .unwrap();
        let planned = v.ticks().cloned();
        for _ in 0..8 {
            v.rotate(0.4, 0.1);
            assert_eq!(v.ticks().cloned(), planned);
        }
        let rebuilds = v.stats().rebuilds;
        v.rotate(0.4, 0.0);
        assert_eq!(v.stats().rebuilds, rebuilds + 1);
    }

    #[test]
    fn trajectory_center_focus_uses_centroid() {
        let mut config = ViewerConfig::default();
        config.camera.focus_mode = FocusMode::TrajectoryCenter;
        let mut v = Viewer::new(config).unwrap();
        v.set_trajectory(vec![
            TrajectoryPoint::new(0.0, 0.0, 0.0),
            TrajectoryPoint::new(0.0, 0.0, 0.0),
            TrajectoryPoint::new(0.0, 0.0, 0.0),
            TrajectoryPoint::new(4.0, 4.0, 4.0),
        ])
        .unwrap();
        // centroid (1,1,1) of a [0,4] cube lands at -0.5 in render space
        assert!(v.camera().focus.abs_diff_eq(Vec3::splat(-0.5), 1e-6));
    }
}

//! Axis, tick, label and grid generation.
//!
//! Each rebuild picks, per axis, the box face nearest the camera ("front")
//! from the camera position relative to the box centre. Tick edges run along
//! silhouette edges of the box and grid planes sit on the back faces, so the
//! trajectory is always drawn in front of the grid and labels are not hidden
//! behind the far side of the box.

use crate::config::AxesConfig;
use crate::core::bounds::{Axis, BoundingBox};
use crate::core::camera::CameraSnapshot;
use crate::core::normalize::SceneTransform;
use crate::core::primitives::{
    push_segment, LabelKind, LabelSprite, PrimitiveKind, PrimitiveSet, Vertex,
};
use crate::core::ticks::TickSet;
use crate::styling::ViewerTheme;
use glam::{DVec3, Vec3, Vec4};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Min,
    Max,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Min => Side::Max,
            Side::Max => Side::Min,
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Side::Min => -1.0,
            Side::Max => 1.0,
        }
    }

    fn pick(self, bounds: &BoundingBox, axis: Axis) -> f64 {
        let (lo, hi) = bounds.range(axis);
        match self {
            Side::Min => lo,
            Side::Max => hi,
        }
    }
}

/// Front side of the render box for each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceSelection {
    pub front: [Side; 3],
}

impl FaceSelection {
    pub fn from_camera(render_box: &BoundingBox, camera_position: Vec3) -> Self {
        let center = render_box.center();
        let cam = camera_position.as_dvec3();
        let front = Axis::ALL.map(|a| {
            if cam[a.index()] > center[a.index()] {
                Side::Max
            } else {
                Side::Min
            }
        });
        Self { front }
    }

    pub fn front(&self, axis: Axis) -> Side {
        self.front[axis.index()]
    }

    pub fn back(&self, axis: Axis) -> Side {
        self.front(axis).opposite()
    }
}

/// The box edge carrying one axis's ticks, in render space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEdge {
    pub axis: Axis,
    pub start: Vec3,
    pub end: Vec3,
    /// Unit direction ticks and labels extend in, away from the box.
    pub outward: Vec3,
}

impl AxisEdge {
    /// Edge point whose `axis` coordinate is `coord`.
    pub fn at(&self, coord: f32) -> Vec3 {
        let mut p = self.start;
        p[self.axis.index()] = coord;
        p
    }

    pub fn midpoint(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLayout {
    pub render_box: BoundingBox,
    pub faces: FaceSelection,
    pub edges: [AxisEdge; 3],
}

impl AxisLayout {
    /// Horizontal axes (X, Z) lie on the floor opposite the camera, at the
    /// other horizontal axis's front face. The vertical axis (Y) takes the
    /// edge at front X / back Z. All three are silhouette edges.
    pub fn new(render_box: BoundingBox, faces: FaceSelection) -> Self {
        let corner = |x: Side, y: Side, z: Side| {
            DVec3::new(
                x.pick(&render_box, Axis::X),
                y.pick(&render_box, Axis::Y),
                z.pick(&render_box, Axis::Z),
            )
            .as_vec3()
        };
        let floor = faces.back(Axis::Y);
        let fx = faces.front(Axis::X);
        let fz = faces.front(Axis::Z);
        let bz = faces.back(Axis::Z);

        let x_edge = AxisEdge {
            axis: Axis::X,
            start: corner(Side::Min, floor, fz),
            end: corner(Side::Max, floor, fz),
            outward: Vec3::Z * fz.sign(),
        };
        let z_edge = AxisEdge {
            axis: Axis::Z,
            start: corner(fx, floor, Side::Min),
            end: corner(fx, floor, Side::Max),
            outward: Vec3::X * fx.sign(),
        };
        let y_edge = AxisEdge {
            axis: Axis::Y,
            start: corner(fx, Side::Min, bz),
            end: corner(fx, Side::Max, bz),
            outward: Vec3::X * fx.sign(),
        };

        Self {
            render_box,
            faces,
            edges: [x_edge, y_edge, z_edge],
        }
    }

    pub fn edge(&self, axis: Axis) -> &AxisEdge {
        &self.edges[axis.index()]
    }
}

/// Everything one rebuild reads, captured before any computation starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSnapshot {
    pub bounds: BoundingBox,
    pub transform: SceneTransform,
    pub camera: CameraSnapshot,
    pub target_extent: f64,
}

impl SceneSnapshot {
    pub fn layout(&self) -> AxisLayout {
        let render_box = self.transform.render_bounds(&self.bounds);
        AxisLayout::new(
            render_box,
            FaceSelection::from_camera(&render_box, self.camera.position),
        )
    }

    /// On-screen length of each axis edge in pixels (0 when off-screen).
    pub fn projected_lengths(&self, layout: &AxisLayout) -> [f32; 3] {
        layout.edges.map(|edge| {
            match (
                self.camera.project_to_screen(edge.start),
                self.camera.project_to_screen(edge.end),
            ) {
                (Some(a), Some(b)) => a.distance(b),
                _ => 0.0,
            }
        })
    }
}

/// Decoration primitives produced by one rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisPrimitives {
    pub axes: Vec<Vertex>,
    pub ticks: Vec<Vertex>,
    pub grid: Vec<Vertex>,
    pub labels: Vec<LabelSprite>,
}

impl AxisPrimitives {
    /// Registry sets keyed by category; the grid is omitted when disabled.
    pub fn into_sets(self, show_grid: bool) -> BTreeMap<PrimitiveKind, PrimitiveSet> {
        let mut sets = BTreeMap::new();
        sets.insert(PrimitiveKind::Axes, PrimitiveSet::Lines(self.axes));
        sets.insert(PrimitiveKind::Ticks, PrimitiveSet::Lines(self.ticks));
        sets.insert(PrimitiveKind::Labels, PrimitiveSet::Labels(self.labels));
        if show_grid {
            sets.insert(PrimitiveKind::Grid, PrimitiveSet::Lines(self.grid));
        }
        sets
    }
}

#[derive(Debug, Clone, Default)]
pub struct AxisBuilder {
    config: AxesConfig,
    theme: ViewerTheme,
}

impl AxisBuilder {
    pub fn new(config: AxesConfig, theme: ViewerTheme) -> Self {
        Self { config, theme }
    }

    pub fn config(&self) -> &AxesConfig {
        &self.config
    }

    pub fn build(&self, scene: &SceneSnapshot, ticks: &[TickSet; 3]) -> AxisPrimitives {
        let layout = scene.layout();
        self.build_with_layout(scene, &layout, ticks)
    }

    pub fn build_with_layout(
        &self,
        scene: &SceneSnapshot,
        layout: &AxisLayout,
        ticks: &[TickSet; 3],
    ) -> AxisPrimitives {
        let mut out = AxisPrimitives::default();
        let axis_color = self.theme.axis_color;
        let extent = scene.target_extent.max(1e-9);
        let max_tick = (self.config.max_tick_length_fraction * extent) as f32;
        let gap = (self.config.label_gap_fraction * extent) as f32;

        for axis in Axis::ALL {
            let edge = layout.edge(axis);
            push_segment(&mut out.axes, edge.start, edge.end, axis_color);

            let set = &ticks[axis.index()];
            let spacing = (set.step * scene.transform.scale_of(axis)).abs() as f32;
            let tick_len = (spacing * self.config.tick_length_fraction as f32).min(max_tick);

            for tick in &set.ticks {
                let coord = self.render_coord(scene, axis, tick.value);
                let base = edge.at(coord);
                let tip = base + edge.outward * tick_len;
                push_segment(&mut out.ticks, base, tip, self.theme.tick_color);
                out.labels.push(LabelSprite {
                    anchor: (tip + edge.outward * gap).to_array(),
                    text: tick.label.clone(),
                    kind: LabelKind::Tick,
                    axis,
                    color: self.theme.label_color.to_array(),
                    size_px: self.config.label_size_px,
                });
            }

            if self.config.show_titles {
                let title_anchor = edge.midpoint() + edge.outward * (max_tick + gap * 3.5);
                out.labels.push(LabelSprite {
                    anchor: title_anchor.to_array(),
                    text: self.config.axis_names[axis.index()].clone(),
                    kind: LabelKind::Title,
                    axis,
                    color: self.theme.title_color.to_array(),
                    size_px: self.config.title_size_px,
                });
            }
        }

        if self.config.show_grid {
            let color = self.theme.grid_with_opacity(self.config.grid_opacity);
            for normal in Axis::ALL {
                self.grid_plane(scene, layout, normal, ticks, color, &mut out.grid);
            }
        }

        log::debug!(
            target: crate::LOG_TARGET,
            "axes rebuilt: front={:?} ticks={} labels={} grid={}",
            layout.faces.front,
            out.ticks.len() / 2,
            out.labels.len(),
            out.grid.len() / 2
        );
        out
    }

    fn render_coord(&self, scene: &SceneSnapshot, axis: Axis, value: f64) -> f32 {
        let i = axis.index();
        (value * scene.transform.scale[i] + scene.transform.translation[i]) as f32
    }

    /// Lines on the back plane perpendicular to `normal`, at every tick of
    /// both in-plane axes.
    fn grid_plane(
        &self,
        scene: &SceneSnapshot,
        layout: &AxisLayout,
        normal: Axis,
        ticks: &[TickSet; 3],
        color: Vec4,
        out: &mut Vec<Vertex>,
    ) {
        let rb = &layout.render_box;
        let plane = layout.faces.back(normal).pick(rb, normal) as f32;
        let in_plane: Vec<Axis> = Axis::ALL.into_iter().filter(|a| *a != normal).collect();

        for (&along, &across) in [(&in_plane[0], &in_plane[1]), (&in_plane[1], &in_plane[0])] {
            let (lo, hi) = rb.range(across);
            for tick in &ticks[along.index()].ticks {
                let mut a = Vec3::ZERO;
                a[normal.index()] = plane;
                a[along.index()] = self.render_coord(scene, along, tick.value);
                let mut b = a;
                a[across.index()] = lo as f32;
                b[across.index()] = hi as f32;
                push_segment(out, a, b, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::core::camera::OrbitCamera;
    use crate::core::ticks::TickPlanner;
    use crate::core::viewport::Viewport;
    use std::f32::consts::PI;

    fn scene_with_camera(azimuth: f32, polar: f32) -> SceneSnapshot {
        let bounds = BoundingBox::new(DVec3::ZERO, DVec3::splat(2.0));
        let transform = SceneTransform {
            scale: DVec3::ONE,
            translation: DVec3::splat(-1.0),
        };
        let mut cam = OrbitCamera::new(&CameraConfig::default(), 2.0);
        cam.azimuth = azimuth;
        cam.polar = polar;
        cam.mark_dirty();
        SceneSnapshot {
            bounds,
            transform,
            camera: cam.snapshot(Viewport::new(800, 600)),
            target_extent: 2.0,
        }
    }

    fn unit_ticks() -> [TickSet; 3] {
        let planner = TickPlanner::default();
        Axis::ALL.map(|a| planner.plan(a, 0.0, 2.0, 5))
    }

    #[test]
    fn front_faces_follow_camera_octant() {
        let scene = scene_with_camera(PI / 4.0, PI / 3.0);
        let faces = scene.layout().faces;
        assert_eq!(faces.front, [Side::Max, Side::Max, Side::Max]);

        let scene = scene_with_camera(PI + PI / 4.0, 2.0 * PI / 3.0);
        let faces = scene.layout().faces;
        assert_eq!(faces.front, [Side::Min, Side::Min, Side::Min]);
    }

    #[test]
    fn ticks_are_a_fifth_of_spacing_and_point_outward() {
        let scene = scene_with_camera(PI / 4.0, PI / 3.0);
        let mut builder = AxisBuilder::default();
        builder.config.max_tick_length_fraction = 1.0;
        let prims = builder.build(&scene, &unit_ticks());

        // 5 ticks per axis, two vertices each
        assert_eq!(prims.ticks.len(), 3 * 5 * 2);
        for pair in prims.ticks.chunks(2) {
            let a = Vec3::from_array(pair[0].position);
            let b = Vec3::from_array(pair[1].position);
            assert!(((b - a).length() - 0.1).abs() < 1e-5);
        }
        // X ticks sit on the front Z face and point +Z
        let first = Vec3::from_array(prims.ticks[0].position);
        let tip = Vec3::from_array(prims.ticks[1].position);
        assert_eq!(first.z, 1.0);
        assert!(tip.z > first.z);
        // on the floor opposite the camera (camera above)
        assert_eq!(first.y, -1.0);
    }

    #[test]
    fn tick_length_is_capped() {
        let scene = scene_with_camera(PI / 4.0, PI / 3.0);
        let prims = AxisBuilder::default().build(&scene, &unit_ticks());
        let a = Vec3::from_array(prims.ticks[0].position);
        let b = Vec3::from_array(prims.ticks[1].position);
        // 0.05 * extent 2.0
        assert!(((b - a).length() - 0.1).abs() < 1e-5);

        let planner = TickPlanner::default();
        let coarse = Axis::ALL.map(|a| planner.plan(a, 0.0, 20.0, 5));
        let prims = AxisBuilder::default().build(&scene, &coarse);
        let a = Vec3::from_array(prims.ticks[0].position);
        let b = Vec3::from_array(prims.ticks[1].position);
        assert!((b - a).length() <= 0.1 + 1e-5);
    }

    #[test]
    fn labels_and_titles_per_axis() {
        let scene = scene_with_camera(0.3, 1.0);
        let prims = AxisBuilder::default().build(&scene, &unit_ticks());
        let tick_labels = prims
            .labels
            .iter()
            .filter(|l| l.kind == LabelKind::Tick)
            .count();
        let titles: Vec<_> = prims
            .labels
            .iter()
            .filter(|l| l.kind == LabelKind::Title)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(tick_labels, 15);
        assert_eq!(titles, vec!["x[0]", "x[1]", "x[2]"]);
    }

    #[test]
    fn grid_lies_on_back_planes_with_low_alpha() {
        let scene = scene_with_camera(PI / 4.0, PI / 3.0);
        let prims = AxisBuilder::default().build(&scene, &unit_ticks());
        // three planes, two in-plane axes, five ticks each
        assert_eq!(prims.grid.len(), 3 * 2 * 5 * 2);
        for v in &prims.grid {
            assert_eq!(v.color[3], 0.25);
            let p = Vec3::from_array(v.position);
            // every grid vertex touches at least one back face (all Min here)
            assert!(p.x == -1.0 || p.y == -1.0 || p.z == -1.0);
        }
    }

    #[test]
    fn disabled_grid_is_dropped_from_sets() {
        let sets = AxisPrimitives::default().into_sets(false);
        assert!(!sets.contains_key(&PrimitiveKind::Grid));
        assert!(sets.contains_key(&PrimitiveKind::Labels));
    }
}

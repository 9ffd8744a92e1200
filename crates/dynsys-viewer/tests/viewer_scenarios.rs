use dynsys_viewer::config::FocusMode;
use dynsys_viewer::core::{Axis, LabelKind, Modifiers, PrimitiveKind, TrajectoryPoint};
use dynsys_viewer::{PointDefect, Viewer, ViewerConfig, ViewerError, ViewerEvent};
use std::f32::consts::PI;

fn diagonal() -> Vec<TrajectoryPoint> {
    vec![
        TrajectoryPoint::new(0.0, 0.0, 0.0),
        TrajectoryPoint::new(1.0, 1.0, 1.0),
        TrajectoryPoint::new(2.0, 2.0, 2.0),
    ]
}

fn plotted() -> Viewer {
    let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
    viewer.set_trajectory(diagonal()).unwrap();
    viewer
}

fn spiral(n: usize) -> Vec<[f64; 3]> {
    (0..n)
        .map(|i| {
            let t = i as f64 * 0.1;
            [t.cos() * 10.0, t.sin() * 10.0, t * 0.5]
        })
        .collect()
}

#[test]
fn diagonal_plot_has_expected_box_and_ticks() {
    let viewer = plotted();
    let session = viewer.session().unwrap();
    assert_eq!(
        session.bounds().as_tuple(),
        (0.0, 2.0, 0.0, 2.0, 0.0, 2.0)
    );

    let ticks = viewer.ticks().unwrap();
    for set in ticks {
        assert_eq!(set.step, 0.5);
        assert_eq!(set.values(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    let labels = viewer.registry().labels();
    let tick_labels = labels.iter().filter(|l| l.kind == LabelKind::Tick).count();
    let titles = labels.iter().filter(|l| l.kind == LabelKind::Title).count();
    assert_eq!(tick_labels, 15);
    assert_eq!(titles, 3);
    assert_eq!(viewer.registry().lines(PrimitiveKind::Axes).len(), 6);
    assert_eq!(viewer.registry().lines(PrimitiveKind::Ticks).len(), 30);
}

#[test]
fn rebuild_is_idempotent() {
    let mut viewer = plotted();
    let before = viewer.registry().clone();
    viewer.rebuild();
    assert!(viewer.registry().same_content(&before));
    assert!(viewer.registry().generation() > before.generation());
    viewer.rebuild();
    assert!(viewer.registry().same_content(&before));
}

#[test]
fn repeated_zoom_out_never_drops_below_floor() {
    let mut viewer = plotted();
    let floor = viewer.camera().limits.min_radius;
    for _ in 0..10 {
        viewer.zoom(1.1);
        assert!(viewer.camera().radius >= floor);
    }
    for _ in 0..40 {
        viewer.zoom(0.5);
    }
    assert_eq!(viewer.camera().radius, floor);
    assert!(viewer.camera().position().is_finite());
}

#[test]
fn rotating_past_the_pole_clamps_polar_angle() {
    let mut viewer = plotted();
    let eps = viewer.camera().limits.polar_epsilon;
    viewer.rotate(0.0, 4.0);
    assert!((viewer.camera().polar - (PI - eps)).abs() < 1e-6);
    viewer.rotate(0.0, -10.0);
    assert!((viewer.camera().polar - eps).abs() < 1e-6);
}

#[test]
fn rotation_moves_tick_edges_to_the_new_front() {
    let mut viewer = plotted();
    let anchors = |v: &Viewer| -> Vec<[f32; 3]> {
        v.registry()
            .labels()
            .iter()
            .filter(|l| l.axis == Axis::X && l.kind == LabelKind::Tick)
            .map(|l| l.anchor)
            .collect()
    };
    let before = anchors(&viewer);
    viewer.rotate(PI, 0.0);
    let after = anchors(&viewer);
    assert_eq!(before.len(), after.len());
    // same X coordinates, opposite side in Z
    for (a, b) in before.iter().zip(&after) {
        assert!((a[0] - b[0]).abs() < 1e-6);
        assert!(a[2] * b[2] < 0.0);
    }
}

#[test]
fn invalid_input_keeps_previous_plot() {
    let mut viewer = plotted();
    let registry = viewer.registry().clone();
    let bounds = *viewer.session().unwrap().bounds();

    let err = viewer.set_trajectory(Vec::new()).unwrap_err();
    assert_eq!(err, ViewerError::EmptyTrajectory);

    let err = viewer
        .set_trajectory_rows(&[vec![0.0, 1.0], vec![2.0]])
        .unwrap_err();
    assert_eq!(
        err,
        ViewerError::InvalidPoint {
            index: 1,
            defect: PointDefect::MissingComponents {
                found: 1,
                required: 2
            },
        }
    );

    let err = viewer
        .set_trajectory(vec![TrajectoryPoint::new(0.0, f64::NAN, 0.0)])
        .unwrap_err();
    assert!(matches!(err, ViewerError::InvalidPoint { index: 0, .. }));

    assert_eq!(*viewer.session().unwrap().bounds(), bounds);
    assert!(viewer.registry().same_content(&registry));
    assert_eq!(viewer.registry().generation(), registry.generation());
    assert_eq!(viewer.stats().rejected_trajectories, 3);
}

#[test]
fn planar_rows_get_unit_scale_on_flat_axis() {
    let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
    viewer
        .set_trajectory_rows(&[vec![0.0, 1.0], vec![4.0, 3.0], vec![2.0, 2.0]])
        .unwrap();
    let session = viewer.session().unwrap();
    let scale = session.normalized.transform.scale;
    assert_eq!(scale.z, 1.0);
    assert_eq!(scale.x, 0.5);
    assert_eq!(scale.y, 0.5);
    assert!(session.normalized.degenerate[2]);

    let z_ticks = &viewer.ticks().unwrap()[2];
    assert_eq!(z_ticks.values(), vec![0.0]);
}

#[test]
fn resize_rebuilds_with_denser_ticks() {
    let mut viewer = plotted();
    let rebuilds = viewer.stats().rebuilds;
    assert!(viewer.handle_event(ViewerEvent::Resize {
        width: 2400,
        height: 1800
    }));
    assert_eq!(viewer.stats().rebuilds, rebuilds + 1);
    let x = &viewer.ticks().unwrap()[0];
    assert_eq!(x.step, 0.2);
    assert_eq!(x.len(), 11);

    // same size again is a no-op
    assert!(!viewer.resize(2400, 1800));
    assert!(!viewer.resize(0, 600));
}

#[test]
fn wheel_zoom_respects_ceiling() {
    let mut viewer = plotted();
    let ceiling = viewer.camera().limits.max_radius;
    for _ in 0..100 {
        viewer.handle_event(ViewerEvent::Wheel {
            delta_y: 500.0,
            modifiers: Modifiers::default(),
        });
    }
    assert_eq!(viewer.camera().radius, ceiling);
    assert!(!viewer.handle_event(ViewerEvent::Wheel {
        delta_y: 500.0,
        modifiers: Modifiers::default(),
    }));
}

#[test]
fn replot_keeps_camera_unless_reset_requested() {
    let mut viewer = plotted();
    viewer.rotate(1.0, 0.3);
    let azimuth = viewer.camera().azimuth;
    viewer
        .set_trajectory_rows(&spiral(200))
        .unwrap();
    assert_eq!(viewer.camera().azimuth, azimuth);

    let mut config = ViewerConfig::default();
    config.camera.reset_on_plot = true;
    config.camera.focus_mode = FocusMode::TrajectoryCenter;
    let mut viewer = Viewer::new(config).unwrap();
    viewer.set_trajectory(diagonal()).unwrap();
    let home = viewer.camera().azimuth;
    viewer.rotate(1.0, 0.0);
    viewer.set_trajectory(diagonal()).unwrap();
    assert_eq!(viewer.camera().azimuth, home);
}

#[test]
fn every_tick_count_stays_in_band_for_large_trajectories() {
    let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
    viewer.set_trajectory_rows(&spiral(1000)).unwrap();
    for (w, h) in [(320, 240), (800, 600), (1920, 1080), (3840, 2160)] {
        viewer.resize(w, h);
        for set in viewer.ticks().unwrap() {
            assert!((5..=15).contains(&set.len()), "{} ticks at {w}x{h}", set.len());
        }
    }
}

#[test]
fn clear_empties_every_category() {
    let mut viewer = plotted();
    viewer.clear();
    assert!(viewer.registry().is_empty());
    assert!(viewer.session().is_none());
    viewer.rebuild();
    assert!(viewer.registry().is_empty());
    let frame = viewer.frame();
    assert_eq!(frame.generation, viewer.registry().generation());
}

#[test]
fn extreme_finite_ranges_plot_without_panicking() {
    let cases = [
        vec![
            TrajectoryPoint::new(0.0, 0.0, 0.0),
            TrajectoryPoint::new(5e-324, 1.0, 1.0),
        ],
        vec![
            TrajectoryPoint::new(-1.0e308, 0.0, 0.0),
            TrajectoryPoint::new(1.0e308, 1.0, 1.0),
        ],
    ];
    for points in cases {
        let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
        viewer.set_trajectory(points.clone()).unwrap();
        viewer.rotate(40.0, -25.0);
        viewer.zoom(1.5);

        let session = viewer.session().unwrap();
        assert!(session.centroid.is_finite());
        assert!(session.normalized.transform.scale.is_finite());
        for set in viewer.ticks().unwrap() {
            assert!(!set.is_empty() && set.len() <= 15, "{:?}", set.axis);
            assert!(set.step.is_finite() && set.step > 0.0);
            for tick in &set.ticks {
                assert!(tick.value.is_finite(), "{:?} {}", set.axis, tick.label);
            }
        }
        let render = session.normalized.transform.render_bounds(session.bounds());
        for axis in Axis::ALL {
            let (lo, hi) = render.range(axis);
            assert!(lo.abs() <= 1.0 + 1e-9 && hi.abs() <= 1.0 + 1e-9, "{axis:?}");
        }
    }
}

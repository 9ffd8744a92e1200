//! dynsys-view - headless inspector for the trajectory viewer
//!
//! Loads a trajectory file, runs it through the same normalise / tick /
//! camera / axis pipeline the interactive viewer uses and prints what would be
//! drawn: bounds, scene transform, front faces, ticks and primitive counts.

mod config;
mod trajectory_file;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::ConfigLoader;
use dynsys_logging::{init_logging, LoggingOptions};
use dynsys_viewer::core::{Axis, Side};
use dynsys_viewer::{PrimitiveKind, TickSet, Viewer, ViewerConfig, ViewerStats};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;

/// dynsys-view - inspect how a trajectory will be framed, ticked and labelled
#[derive(Parser)]
#[command(
    name = "dynsys-view",
    version,
    about = "Inspect the scene the 3D trajectory viewer builds for a data file",
    after_help = r#"
Environment Variables:
  DYNSYS_VIEW_CONFIG=<path>          Path to configuration file
  DYNSYS_VIEW_LOG_LEVEL=debug        Set log level (error, warn, info, debug, trace)
  DYNSYS_VIEW_SCALE_MODE=anisotropic Override the scale mode
  DYNSYS_VIEW_MAPPING=0,2,1          Override the component mapping
  DYNSYS_LOG=dynsys_viewer=trace     Fine-grained tracing filter
"#
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, env = "DYNSYS_VIEW_DEBUG")]
    debug: bool,

    /// Set log level
    #[arg(long, value_enum, env = "DYNSYS_VIEW_LOG_LEVEL", default_value = "warn")]
    log_level: LogLevel,

    /// Configuration file path
    #[arg(long, env = "DYNSYS_VIEW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the scene for a trajectory file and report it
    Inspect {
        /// Trajectory file (.json rows or delimited text)
        file: PathBuf,

        /// Viewport width in pixels
        #[arg(long, default_value = "800")]
        width: u32,

        /// Viewport height in pixels
        #[arg(long, default_value = "600")]
        height: u32,

        /// Camera azimuth in degrees
        #[arg(long, allow_hyphen_values = true)]
        azimuth: Option<f32>,

        /// Camera polar angle in degrees, measured from +Y
        #[arg(long)]
        polar: Option<f32>,

        /// Zoom factor applied after framing (>1 moves the camera away)
        #[arg(long, default_value = "1.0")]
        zoom: f32,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        config_command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Write a sample configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = ".dynsys-view.yaml")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level: log::LevelFilter = if cli.debug {
        log::LevelFilter::Debug
    } else {
        cli.log_level.into()
    };
    let _logging = init_logging(LoggingOptions {
        default_level: level.to_string().to_lowercase(),
        stderr: true,
        ansi: std::io::stderr().is_terminal(),
    });

    let config = ConfigLoader::load(cli.config.as_deref())?;
    debug!("Effective configuration: {config:?}");

    match cli.command {
        Commands::Inspect {
            file,
            width,
            height,
            azimuth,
            polar,
            zoom,
            json,
        } => {
            let report = inspect(
                config,
                &InspectOptions {
                    file,
                    width,
                    height,
                    azimuth,
                    polar,
                    zoom,
                },
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Commands::Config { config_command } => match config_command {
            ConfigCommand::Show => {
                print!("{}", serde_yaml::to_string(&config)?);
                Ok(())
            }
            ConfigCommand::Generate { output } => {
                let sample = ConfigLoader::generate_sample_config()?;
                std::fs::write(&output, sample)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                println!("Sample configuration written to {}", output.display());
                Ok(())
            }
        },
    }
}

struct InspectOptions {
    file: PathBuf,
    width: u32,
    height: u32,
    azimuth: Option<f32>,
    polar: Option<f32>,
    zoom: f32,
}

#[derive(Debug, Serialize)]
struct Report {
    file: String,
    points: usize,
    viewport: [u32; 2],
    bounds: [[f64; 2]; 3],
    degenerate: [bool; 3],
    scale: [f64; 3],
    translation: [f64; 3],
    camera: CameraReport,
    front_faces: BTreeMap<Axis, &'static str>,
    ticks: Vec<TickSet>,
    primitives: BTreeMap<PrimitiveKind, usize>,
    stats: ViewerStats,
}

#[derive(Debug, Serialize)]
struct CameraReport {
    azimuth_deg: f32,
    polar_deg: f32,
    radius: f32,
    focus: [f32; 3],
    position: [f32; 3],
}

fn inspect(config: ViewerConfig, opts: &InspectOptions) -> Result<Report> {
    let rows = trajectory_file::load_rows(&opts.file)?;
    info!("Inspecting {} ({} rows)", opts.file.display(), rows.len());

    let mut viewer = Viewer::new(config)?;
    viewer.resize(opts.width, opts.height);
    viewer
        .set_trajectory_rows(&rows)
        .with_context(|| format!("Rejected trajectory in {}", opts.file.display()))?;

    if opts.azimuth.is_some() || opts.polar.is_some() {
        let camera = viewer.camera_mut();
        if let Some(az) = opts.azimuth {
            camera.azimuth = az.to_radians().rem_euclid(std::f32::consts::TAU);
        }
        if let Some(polar) = opts.polar {
            camera.polar = camera.limits.clamp_polar(polar.to_radians());
        }
        camera.mark_dirty();
        viewer.rebuild();
    }
    if opts.zoom != 1.0 {
        viewer.zoom(opts.zoom);
    }

    let Some(scene) = viewer.scene_snapshot() else {
        anyhow::bail!("viewer has no trajectory after a successful plot");
    };
    let layout = scene.layout();
    let front_faces = Axis::ALL
        .into_iter()
        .map(|axis| {
            let side = match layout.faces.front(axis) {
                Side::Min => "min",
                Side::Max => "max",
            };
            (axis, side)
        })
        .collect();

    let session = viewer
        .session()
        .context("viewer has no trajectory after a successful plot")?;
    let bounds = session.bounds();
    let transform = session.normalized.transform;
    let camera = viewer.camera();

    Ok(Report {
        file: opts.file.display().to_string(),
        points: session.points.len(),
        viewport: [viewer.state().viewport.width, viewer.state().viewport.height],
        bounds: Axis::ALL.map(|axis| {
            let (lo, hi) = bounds.range(axis);
            [lo, hi]
        }),
        degenerate: session.normalized.degenerate,
        scale: transform.scale.to_array(),
        translation: transform.translation.to_array(),
        camera: CameraReport {
            azimuth_deg: camera.azimuth.to_degrees(),
            polar_deg: camera.polar.to_degrees(),
            radius: camera.radius,
            focus: camera.focus.to_array(),
            position: camera.position().to_array(),
        },
        front_faces,
        ticks: viewer.ticks().map(|t| t.to_vec()).unwrap_or_default(),
        primitives: viewer.registry().counts(),
        stats: viewer.stats(),
    })
}

fn print_report(report: &Report) {
    println!("file:        {}", report.file);
    println!("points:      {}", report.points);
    println!(
        "viewport:    {}x{}",
        report.viewport[0], report.viewport[1]
    );
    for (axis, [lo, hi]) in Axis::ALL.iter().zip(report.bounds) {
        let flat = if report.degenerate[axis.index()] {
            " (flat)"
        } else {
            ""
        };
        println!("bounds {axis:?}:    [{lo}, {hi}]{flat}");
    }
    println!("scale:       {:?}", report.scale);
    println!("translation: {:?}", report.translation);
    println!(
        "camera:      azimuth {:.1} deg, polar {:.1} deg, radius {:.3}",
        report.camera.azimuth_deg, report.camera.polar_deg, report.camera.radius
    );
    let faces: Vec<String> = report
        .front_faces
        .iter()
        .map(|(axis, side)| format!("{axis:?}={side}"))
        .collect();
    println!("front faces: {}", faces.join(" "));
    for set in &report.ticks {
        let labels: Vec<&str> = set.ticks.iter().map(|t| t.label.as_str()).collect();
        println!(
            "ticks {:?}:     step {} -> {}",
            set.axis,
            set.step,
            labels.join(" ")
        );
    }
    for (kind, count) in &report.primitives {
        println!("{kind:?}: {count}");
    }
    println!(
        "rebuilds:    {} (generation {})",
        report.stats.rebuilds, report.stats.generation
    );
}

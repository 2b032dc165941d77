//! Headless demo that walks an observer through a small built-in scene and
//! renders a day of frames, switching between a perspective and a fisheye
//! view.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p scenery-demo -- --frames 48 --fisheye-every 4`.
//! Pass `--gpu` to also draw a frame with the wgpu backend on an offscreen
//! target.

use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;
use scenery_config::{CliArgs, Config, default_config_dir};
use scenery_core::{DrawReport, Scenery3d};
use scenery_render::{RecordingBackend, RenderBackend, WgpuBackend};
use scenery_scene::{
    AllTexturesReady, BodyState, FixedEphemeris, Illumination, InMemoryMesh, LoadedScene,
    LogNotifier, Material, PerspectiveProjection, SceneInfo, SkyProjection, SkySnapshot,
    StereographicProjection, Viewport,
};
use tracing::{info, warn};

/// Hours of simulated time per rendered frame.
const HOURS_PER_FRAME: f64 = 0.5;
const START_JD: f64 = 2_460_200.25;

#[derive(Parser, Debug)]
#[command(name = "scenery-demo", about = "Headless Scenery3d walkthrough")]
struct DemoArgs {
    #[command(flatten)]
    cli: CliArgs,

    /// Number of frames to render.
    #[arg(long, default_value_t = 48)]
    frames: u32,

    /// Draw every n-th frame through the fisheye projection; 0 disables it.
    #[arg(long, default_value_t = 4)]
    fisheye_every: u32,

    /// Scene directory with a `scene.ron`; the built-in geometry is used
    /// with its settings.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Also render one frame on the GPU.
    #[arg(long)]
    gpu: bool,
}

fn main() {
    let args = DemoArgs::parse();

    let config_dir = args
        .cli
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from(".scenery3d"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args.cli);

    let log_dir = config_dir.join("logs");
    scenery_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let info = match args.scene.as_deref() {
        Some(dir) => SceneInfo::load(dir).unwrap_or_else(|e| {
            warn!(dir = %dir.display(), error = %e, "could not read scene settings, using defaults");
            demo_info()
        }),
        None => demo_info(),
    };

    let mut backend = RecordingBackend::new();
    let mut scenery = Scenery3d::new(&config);
    scenery.finalize_load(village(info.clone()));

    let mut cubemap_frames = 0;
    for frame in 0..args.frames {
        let report = render_frame(&mut scenery, &mut backend, frame, args.fisheye_every);
        if report.cubemap_regenerated {
            cubemap_frames += 1;
        }
        let passes = backend.take_passes();
        info!(
            frame,
            path = ?report.path,
            caster = report.caster.name(),
            shadows = report.shadows,
            cubemap_regenerated = report.cubemap_regenerated,
            passes = passes.len(),
            "frame rendered"
        );
    }
    info!(
        frames = args.frames,
        cubemap_frames,
        live_targets = backend.live_targets(),
        "walkthrough finished"
    );

    if args.gpu {
        render_on_gpu(&config, info);
    }
}

fn demo_info() -> SceneInfo {
    SceneInfo {
        id: "demo-village".to_string(),
        name: "Demo village".to_string(),
        ..SceneInfo::default()
    }
}

/// A ground slab with a house and a glass shed.
fn village(info: SceneInfo) -> LoadedScene {
    let mut model = InMemoryMesh::cuboid(
        Vec3::new(-80.0, -80.0, -1.0),
        Vec3::new(80.0, 80.0, 0.0),
        Material {
            name: "ground".to_string(),
            diffuse: Vec3::new(0.35, 0.45, 0.25),
            ..Material::default()
        },
    );
    model.merge(InMemoryMesh::cuboid(
        Vec3::new(6.0, 4.0, 0.0),
        Vec3::new(16.0, 12.0, 7.5),
        Material {
            name: "house".to_string(),
            diffuse: Vec3::new(0.7, 0.55, 0.4),
            ..Material::default()
        },
    ));
    model.merge(InMemoryMesh::cuboid(
        Vec3::new(-14.0, 2.0, 0.0),
        Vec3::new(-10.0, 8.0, 3.0),
        Material {
            name: "glass".to_string(),
            illumination: Illumination::Translucent,
            alpha: 0.35,
            ..Material::default()
        },
    ));
    LoadedScene {
        info,
        model: Box::new(model),
        ground_height: None,
    }
}

/// Sky at `frame`: the sun circles once a day, the moon trails by half a
/// day and Venus stays low in the west.
fn sky_at(frame: u32) -> SkySnapshot {
    let hours = f64::from(frame) * HOURS_PER_FRAME;
    let day_angle = (hours / 24.0) as f32 * 360.0;
    let ephemeris = FixedEphemeris {
        sun: BodyState::from_alt_az(
            50.0 * (day_angle - 90.0).to_radians().sin(),
            day_angle,
            0.0,
        ),
        moon: BodyState::from_alt_az(
            40.0 * (day_angle + 90.0).to_radians().sin(),
            (day_angle + 180.0) % 360.0,
            0.6,
        ),
        venus: BodyState::from_alt_az(8.0, 280.0, 1.2),
        julian_day: START_JD + hours / 24.0,
        lightscape_brightness: None,
    };
    SkySnapshot::capture(&ephemeris)
}

fn view_direction(frame: u32) -> Vec3 {
    let azimuth = (frame as f32 * 7.5).to_radians();
    Vec3::new(azimuth.cos(), azimuth.sin(), -0.05).normalize()
}

fn render_frame<B: RenderBackend>(
    scenery: &mut Scenery3d<B>,
    backend: &mut B,
    frame: u32,
    fisheye_every: u32,
) -> DrawReport {
    let sky = sky_at(frame);
    let direction = view_direction(frame);
    let fisheye = fisheye_every > 0 && frame % fisheye_every == fisheye_every - 1;
    let projection: Box<dyn SkyProjection> = if fisheye {
        Box::new(StereographicProjection::new(
            direction,
            180.0,
            Viewport::new(0, 0, 1024, 1024),
        ))
    } else {
        Box::new(PerspectiveProjection::new(
            direction,
            60.0,
            Viewport::new(0, 0, 1280, 720),
        ))
    };

    // Walk forward slowly along the view azimuth.
    scenery.update(
        1.0 / 30.0,
        Vec3::new(1.0, 0.0, 0.0),
        direction,
        projection.fov_degrees(),
        sky.julian_day,
    );

    match scenery.draw(
        backend,
        projection.as_ref(),
        &sky,
        &AllTexturesReady,
        &LogNotifier,
    ) {
        Ok(report) => report,
        Err(e) => {
            warn!(frame, error = %e, "frame failed");
            DrawReport::default()
        }
    }
}

fn render_on_gpu(config: &Config, info: SceneInfo) {
    let mut backend = match WgpuBackend::new_headless(1280, 720) {
        Ok(backend) => backend,
        Err(e) => {
            warn!(error = %e, "no GPU available, skipping the wgpu frame");
            return;
        }
    };
    let mut scenery = Scenery3d::new(config);
    scenery.finalize_load(village(info));
    let report = render_frame(&mut scenery, &mut backend, 0, 0);
    backend.submit();
    info!(path = ?report.path, caster = report.caster.name(), "gpu frame submitted");
}

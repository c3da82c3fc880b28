//! Squish - a headless rigid and soft body playground
//!
//! Loads the demo scene, steps it for a configured number of frames while
//! launching balls from the camera, then exports the world as JSON.

mod settings;

use std::fs;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use squish_sim::{demo, Simulation};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use settings::Settings;

/// Screen points the scripted launches cycle through, as fractions of the
/// viewport size.
const LAUNCH_TARGETS: [(f32, f32); 4] = [(0.5, 0.5), (0.65, 0.45), (0.35, 0.55), (0.75, 0.4)];

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting squish...");

    let settings = Settings::load();
    if Settings::settings_path().is_some_and(|p| !p.exists()) {
        // Leave an editable copy of the defaults behind.
        if let Err(e) = settings.save() {
            warn!("Could not write default settings: {e:#}");
        }
    }
    let run = &settings.run;

    let mut sim = Simulation::new(settings.simulation.clone(), run.viewport)
        .context("Failed to create simulation")?;
    demo::populate(sim.world_mut(), &settings.simulation);

    let delta = run.frame_delta();
    let frame_budget = Duration::from_secs_f32(delta);
    let mut elapsed = 0.0f64;
    let mut launches = 0usize;

    for frame in 0..run.frames {
        let started = Instant::now();

        if run.launch_interval > 0 && frame % run.launch_interval == 0 {
            let (fx, fy) = LAUNCH_TARGETS[launches % LAUNCH_TARGETS.len()];
            let ndc = run
                .viewport
                .to_ndc(fx * run.viewport.width, fy * run.viewport.height);
            if sim.request_launch(ndc) {
                launches += 1;
            }
        }

        elapsed += delta as f64;
        sim.tick(delta, elapsed)
            .with_context(|| format!("Simulation failed at frame {frame}"))?;

        if frame > 0 && frame % run.frame_rate.max(1.0) as u32 == 0 {
            log_progress(&sim, frame);
        }

        if run.realtime {
            if let Some(rest) = frame_budget.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    info!(
        frames = sim.frame_count(),
        balls = sim.balls().len(),
        "Simulation finished"
    );

    let json = sim
        .snapshot()
        .to_json_pretty()
        .context("Failed to serialize world snapshot")?;
    match &run.export_path {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported world to {:?}", path);
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn log_progress(sim: &Simulation, frame: u32) {
    let Some(physics) = sim.physics() else {
        return;
    };
    let heights: Vec<f32> = sim
        .snapshot()
        .entities
        .iter()
        .filter_map(|e| e.soft_body.as_ref()?.centroid)
        .map(|c| c.y)
        .collect();
    info!(
        frame,
        time = physics.elapsed_time(),
        balls = sim.balls().len(),
        soft_heights = ?heights,
        "Progress"
    );
}

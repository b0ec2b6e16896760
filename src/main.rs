mod time_accumulator;

use anyhow::Context;
use log::info;
use physics::{
    scene::{PhysicsScene, SceneKind},
    Config,
};
use std::time::Duration;
use time_accumulator::TimeAccumulator;

/// Simulated display refresh driving the accumulator.
const FRAME_RATE: u32 = 50;

/// Body transforms are logged once per this many display frames.
const LOG_INTERVAL: u64 = 50;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let kind = match args.next() {
        Some(name) => name.parse::<SceneKind>()?,
        None => SceneKind::Stack,
    };
    let config = match args.next() {
        Some(path) if path != "-" => {
            Config::load(&path).with_context(|| format!("failed to load config '{}'", path))?
        }
        _ => Config::default(),
    };
    let seconds = match args.next() {
        Some(secs) => secs
            .parse::<f32>()
            .with_context(|| format!("invalid duration '{}'", secs))?,
        None => 10.0,
    };

    let mut accum = TimeAccumulator::new(config.step);
    if let Some(dilation) = args.next() {
        let dilation = dilation
            .parse::<f32>()
            .with_context(|| format!("invalid time dilation '{}'", dilation))?;
        accum.set_time_dilation(dilation);
        info!("time dilation: {}", accum.time_dilation());
    }
    let mut scene = PhysicsScene::new(kind, config)?;
    let frame_delta = Duration::from_secs(1) / FRAME_RATE;
    let frames = (seconds.max(0.0) * FRAME_RATE as f32).ceil() as u64;

    for _ in 0..frames {
        accum.update(frame_delta);
        let step_secs = accum.step_secs();
        for _ in 0..accum.num_steps() {
            scene.update(step_secs);
        }
        if accum.frame_number() % LOG_INTERVAL == 0 {
            scene.world.bodies().log_bodies(scene.world.frame());
            let perf = scene.world.perf();
            info!(
                "frame: {} total: {:.3}ms broad: {:.3}ms resolve: {:.3}ms position: {:.3}ms",
                scene.world.frame(),
                perf.total,
                perf.broad,
                perf.resolve,
                perf.position
            );
        }
    }

    let sleeping = scene
        .world
        .bodies()
        .iter()
        .filter(|(_, body)| body.moves() && body.is_sleeping())
        .count();
    info!(
        "{} finished after {} steps, {} of {} bodies sleeping",
        scene.kind(),
        scene.world.frame(),
        sleeping,
        scene.world.bodies().len()
    );
    Ok(())
}

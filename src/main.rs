use std::time::Instant;

use clap::Parser;
use intersection_sim::{SimConfig, SimError, Simulation};
use log::info;

#[derive(Parser)]
#[command(name = "intersection-sim")]
#[command(about = "Headless traffic simulation of a signalised intersection")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "2000")]
    ticks: u32,

    /// Wall time per tick in seconds, before time scaling
    #[arg(long, default_value = "0.05")]
    delta: f64,

    /// Seed for spawning decisions; random if omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Multiplier applied to each tick
    #[arg(long, default_value = "1.0")]
    time_scale: f64,

    /// Extend green phases while queues are long
    #[arg(long)]
    adaptive: bool,

    /// Report metrics every this many ticks
    #[arg(long, default_value = "200")]
    report_every: u32,

    /// Print the final state as JSON
    #[cfg(feature = "serde")]
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), SimError> {
    env_logger::init();
    let cli = Cli::parse();

    let config = SimConfig::default();
    let mut sim = match cli.seed {
        Some(seed) => Simulation::with_seed(config, seed)?,
        None => Simulation::new(config)?,
    };
    sim.set_time_scale(cli.time_scale);
    sim.set_adaptive_light(cli.adaptive);
    info!(
        "running {} ticks of {}s at {}x, {} light",
        cli.ticks,
        cli.delta,
        sim.time_scale(),
        if cli.adaptive { "adaptive" } else { "fixed" }
    );

    let report_every = cli.report_every.max(1);
    let start = Instant::now();
    for tick in 1..=cli.ticks {
        sim.step(cli.delta);
        if tick % report_every == 0 {
            report(&sim);
        }
    }
    let elapsed = start.elapsed();

    report(&sim);
    if cli.ticks > 0 {
        info!(
            "avg. frame: {:?} ({} vehicles passed)",
            elapsed / cli.ticks,
            sim.passed_count()
        );
    }

    #[cfg(feature = "serde")]
    {
        if cli.json {
            match sim.snapshot_json() {
                Ok(json) => println!("{json}"),
                Err(err) => log::error!("failed to serialize snapshot: {err}"),
            }
        }
    }
    Ok(())
}

fn report(sim: &Simulation) {
    let metrics = sim.metrics();
    info!(
        "t={:.1}s light={} vehicles={} passed={} avg speed={:.1} queue={} pedestrians={}",
        metrics.simulation_time,
        metrics.light_phase,
        metrics.active_vehicles,
        metrics.passed_vehicles,
        metrics.average_speed,
        metrics.queue_length,
        metrics.active_pedestrians,
    );
}

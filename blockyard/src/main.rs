use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use blockyard_benchmark::BenchmarkMetrics;
use blockyard_world::{Registries, World, WorldConfig};

#[derive(Parser)]
#[command(
    name = "blockyard",
    about = "Voxel world server: chunk generation, caching and persistence"
)]
pub struct Args {
    /// TOML config file with a [world] table
    #[arg(short, long, env = "BLOCKYARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// World directory (overrides the config)
    #[arg(short, long, env = "WORLD")]
    pub world: Option<PathBuf>,

    /// Seed for a new world; ignored when the world exists
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    /// Chunk format: "alpha" or "beta"
    #[arg(long, env = "SERIALIZER")]
    pub serializer: Option<String>,

    /// Number of chunks around spawn that stay loaded
    #[arg(long)]
    pub cache_level: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<WorldConfig> {
        let mut config = match &self.config {
            Some(path) => WorldConfig::load(path)?,
            None => WorldConfig::default(),
        };
        if let Some(world) = self.world {
            config.path = world;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(serializer) = self.serializer {
            config.serializer = serializer;
        }
        if let Some(level) = self.cache_level {
            config.cache_level = level;
        }
        config.validate()?;
        Ok(config)
    }
}

fn write_benchmark_report(bench: &BenchmarkMetrics) -> Result<()> {
    let report = bench.generate_report();
    let timestamp = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)?.as_secs();

    std::fs::create_dir_all("benchmarks").context("failed to create benchmarks directory")?;
    let filename = format!("benchmarks/benchmark-{}.txt", timestamp);
    std::fs::write(&filename, &report).with_context(|| format!("failed to write {}", filename))?;

    println!("Benchmark report written to {}", filename);
    println!("{}", report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let config = Args::parse().into_config()?;

    let benchmark = if std::env::var("BENCHMARK").is_ok() {
        println!("BENCHMARK MODE ENABLED");
        Some(Arc::new(BenchmarkMetrics::new()))
    } else {
        None
    };

    let world = World::open(config, &Registries::builtin(), benchmark.clone())
        .await
        .context("failed to open world")?;
    println!("{}", serde_json::to_string_pretty(&world.summary())?);
    println!("World running. Press Ctrl+C to stop");

    let mut ticker = tokio::time::interval(Duration::from_millis(world.config().tick_interval_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = world.tick().await;
                if report.flush_failed > 0 {
                    log::warn!("{} chunks failed to save, will retry", report.flush_failed);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                break;
            }
        }
    }

    let flushed = world.shutdown().await;
    println!("Saved {} chunks on shutdown", flushed.saved);
    if let Some(bench) = benchmark {
        if let Err(e) = write_benchmark_report(&bench) {
            eprintln!("Failed to write benchmark report: {:#}", e);
        }
    }
    if flushed.failed > 0 {
        anyhow::bail!("{} chunks could not be saved", flushed.failed);
    }
    Ok(())
}

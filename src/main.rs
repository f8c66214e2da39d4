// src/main.rs

mod catalog;
mod config;
mod engine;
mod feed;
mod geo;
mod replay;
mod types;

use anyhow::Result;
use catalog::HazardCatalog;
use engine::Engine;
use tracing::{error, info};

fn main() -> Result<()> {
    let config = types::Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("roadwatch={}", config.logging.level))
        .init();

    info!("🚗 Roadwatch proximity engine starting");

    let snapshot = feed::load_feed(&config.feed.path)?;
    info!(
        "✓ Hazard feed loaded: {} cameras, {} corridors ({} rejected)",
        snapshot.stats.cameras_accepted, snapshot.stats.corridors_accepted, snapshot.stats.rejected
    );

    let catalog = HazardCatalog::new(snapshot.hazards, snapshot.corridors);
    let mut engine = Engine::with_config(config.engine.clone(), catalog);
    info!(
        "✓ Engine ready: {} hazards, {} corridors in catalog",
        engine.catalog().hazard_count(),
        engine.catalog().corridor_count()
    );

    let trace_files = replay::find_trace_files(&config.replay.input_dir)?;
    if trace_files.is_empty() {
        error!("No trace files found in {}", config.replay.input_dir);
        return Ok(());
    }

    info!("Found {} trace file(s) to replay", trace_files.len());

    for (idx, path) in trace_files.iter().enumerate() {
        info!(
            "Replaying trace {}/{}: {}",
            idx + 1,
            trace_files.len(),
            path.display()
        );

        match replay::replay_file(&mut engine, path, config.replay.progress_log_every) {
            Ok(stats) => {
                info!("✓ Trace replayed");
                info!("  Samples: {} ({} skipped)", stats.samples, stats.skipped_lines);
                info!("  Alerts: {}", stats.alerts);
                info!(
                    "  Zone sessions: {} entered, {} exited",
                    stats.zone_entries, stats.zone_exits
                );
                info!(
                    "  Visibility churn: +{} -{}",
                    stats.visibility_entered, stats.visibility_exited
                );
            }
            Err(err) => {
                error!("Failed to replay {}: {:#}", path.display(), err);
            }
        }
    }

    let summary = engine.metrics().summary();
    info!(
        "📊 Session summary: {}",
        serde_json::to_string(&summary).unwrap_or_default()
    );

    Ok(())
}

// src/replay.rs
//
// Drives the engine from recorded GPS traces, standing in for the device
// geolocation callback. Traces are JSON-lines of PositionSample.

use crate::engine::{Engine, EngineEvent};
use anyhow::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone)]
pub struct ReplayStats {
    pub samples: u64,
    pub skipped_lines: u64,
    pub alerts: u64,
    pub zone_entries: u64,
    pub zone_exits: u64,
    pub progress_events: u64,
    pub visibility_entered: u64,
    pub visibility_exited: u64,
}

pub fn find_trace_files(input_dir: &str) -> Result<Vec<PathBuf>> {
    let mut traces = Vec::new();

    let trace_extensions = ["jsonl", "JSONL"];

    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if let Some(ext) = path.extension() {
            if trace_extensions.contains(&ext.to_str().unwrap_or("")) {
                traces.push(path.to_path_buf());
            }
        }
    }

    traces.sort();
    info!("Found {} trace files", traces.len());
    Ok(traces)
}

/// Replay one trace file sample-by-sample. Malformed lines are skipped
/// with a warning; the file itself must be readable.
pub fn replay_file(
    engine: &mut Engine,
    path: &Path,
    progress_log_every: u64,
) -> Result<ReplayStats> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut stats = ReplayStats::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let sample = match serde_json::from_str(&line) {
            Ok(sample) => sample,
            Err(err) => {
                warn!(
                    "{}:{}: skipping malformed sample: {}",
                    path.display(),
                    line_no + 1,
                    err
                );
                stats.skipped_lines += 1;
                continue;
            }
        };

        stats.samples += 1;
        for event in engine.ingest(sample) {
            tally_event(&event, &mut stats, progress_log_every);
        }
    }

    Ok(stats)
}

fn tally_event(event: &EngineEvent, stats: &mut ReplayStats, progress_log_every: u64) {
    debug!("{} emitted", event.name());
    match event {
        EngineEvent::VisibleSetChanged { entered, exited } => {
            stats.visibility_entered += entered.len() as u64;
            stats.visibility_exited += exited.len() as u64;
        }
        EngineEvent::HazardAlert { .. } => {
            // The evaluator already narrates the alert itself.
            stats.alerts += 1;
        }
        EngineEvent::ZoneEntered { .. } => stats.zone_entries += 1,
        EngineEvent::ZoneExited { .. } => stats.zone_exits += 1,
        EngineEvent::ZoneProgress {
            pct,
            current_kmh,
            limit_kmh,
            over_by_kmh,
            ..
        } => {
            stats.progress_events += 1;
            if progress_log_every > 0 && stats.progress_events % progress_log_every == 0 {
                if *over_by_kmh > 0.0 {
                    info!(
                        "⚠️  Zone {:.0}%: {:.0} km/h, {:.0} over the {:.0} limit",
                        pct * 100.0,
                        current_kmh,
                        over_by_kmh,
                        limit_kmh
                    );
                } else {
                    info!(
                        "Zone {:.0}%: {:.0} km/h (limit {:.0})",
                        pct * 100.0,
                        current_kmh,
                        limit_kmh
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::HazardCatalog;
    use crate::types::{HazardKind, HazardPoint, SpeedUnit};
    use std::io::Write;

    fn write_temp_trace(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = File::create(&path).expect("temp trace should be writable");
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn replay_counts_samples_and_alerts() {
        let camera = HazardPoint::new(39.0, 35.0, HazardKind::Fixed, SpeedUnit::Kmh);
        let mut engine = Engine::new(HazardCatalog::new(vec![camera], vec![]));

        let trace = "\
{\"lat\":38.999,\"lon\":35.0,\"speed_kmh\":90.0,\"heading_deg\":0.0,\"timestamp_ms\":1000}
{\"lat\":38.999,\"lon\":35.0,\"speed_kmh\":90.0,\"heading_deg\":0.0,\"timestamp_ms\":2000}
";
        let path = write_temp_trace("roadwatch_replay_alert_test.jsonl", trace);
        let stats = replay_file(&mut engine, &path, 10).expect("replay should succeed");
        std::fs::remove_file(&path).ok();

        assert_eq!(stats.samples, 2);
        assert_eq!(stats.alerts, 1, "cool-down allows exactly one alert");
        assert_eq!(stats.visibility_entered, 1);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let mut engine = Engine::new(HazardCatalog::empty());

        let trace = "\
{\"lat\":38.999,\"lon\":35.0,\"timestamp_ms\":1000}
not json at all
{\"lat\":38.998,\"lon\":35.0,\"timestamp_ms\":2000}
";
        let path = write_temp_trace("roadwatch_replay_malformed_test.jsonl", trace);
        let stats = replay_file(&mut engine, &path, 10).expect("replay should succeed");
        std::fs::remove_file(&path).ok();

        assert_eq!(stats.samples, 2);
        assert_eq!(stats.skipped_lines, 1);
    }

    #[test]
    fn trace_discovery_ignores_other_files() {
        let dir = std::env::temp_dir().join("roadwatch_trace_discovery_test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("drive.jsonl"), "").unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();

        let traces = find_trace_files(dir.to_str().unwrap()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(traces.len(), 1);
        assert!(traces[0].ends_with("drive.jsonl"));
    }
}

//! flowfeat entrypoint: drains the spool directory batch by batch and writes one row file per batch.
//! Runs once, or as a daemon polling the spool at a configurable interval.

use flowfeat::{
    collectors::SpoolCollector,
    config::EngineConfig,
    export::{RowSink, SCHEMA_VERSION},
    features::FlowEngine,
    logging::StructuredLogger,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

static STOP: AtomicBool = AtomicBool::new(false);

fn process_file(
    path: &Path,
    config: &EngineConfig,
    collector: &SpoolCollector,
    engine: &FlowEngine,
    sink: &RowSink,
) -> flowfeat::Result<()> {
    let started = Instant::now();
    let mut batch = collector.read_batch(path)?;
    let (rows, report) = engine.process_batch(std::mem::take(&mut batch.packets))?;

    let out = config
        .output_dir
        .join(format!("{}.{}", batch.file_stem(), sink.format().extension()));
    sink.write_file(&rows, &out)?;
    collector.commit(path, &out, config.batch.delete_processed)?;

    info!(
        batch_id = %batch.id,
        input = %path.display(),
        output = %out.display(),
        packets = report.packets,
        dropped = report.dropped,
        flows = report.flows,
        parallel = report.parallel,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch exported"
    );
    Ok(())
}

fn run_one_cycle(
    config: &EngineConfig,
    collector: &SpoolCollector,
    engine: &FlowEngine,
    sink: &RowSink,
) -> flowfeat::Result<usize> {
    let pending = collector.pending()?;
    let mut done = 0;
    for path in pending {
        if STOP.load(Ordering::Relaxed) {
            break;
        }
        // A bad batch must not stop the loop; it stays in the spool for inspection.
        match process_file(&path, config, collector, engine, sink) {
            Ok(()) => done += 1,
            Err(e) => warn!(input = %path.display(), error = %e, "batch failed"),
        }
    }
    Ok(done)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("FLOWFEAT_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = EngineConfig::load(&config_path)?;

    StructuredLogger::init(config.log.json, &config.log.level);
    config.validate()?;

    info!(
        input_dir = ?config.input_dir,
        output_dir = ?config.output_dir,
        window_flows = config.features.window_flows,
        format = config.batch.format.extension(),
        schema_version = SCHEMA_VERSION,
        "flowfeat starting"
    );

    std::fs::create_dir_all(&config.input_dir)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let collector = SpoolCollector::new(&config.input_dir);
    let engine = FlowEngine::new(config.features.clone())?;
    let sink = RowSink::new(config.batch.format);

    let interval_secs = config.batch.poll_interval_secs;
    if interval_secs > 0 {
        info!(interval_secs, "daemon mode (Ctrl+C to stop)");
        if let Err(e) = ctrlc::set_handler(|| STOP.store(true, Ordering::Relaxed)) {
            warn!(error = %e, "could not install Ctrl+C handler");
        }
        let mut cycle: u64 = 0;
        while !STOP.load(Ordering::Relaxed) {
            cycle += 1;
            if let Err(e) = run_one_cycle(&config, &collector, &engine, &sink) {
                warn!(cycle, error = %e, "cycle failed");
            }
            for _ in 0..interval_secs {
                if STOP.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(Duration::from_secs(1));
            }
        }
        info!("flowfeat stopping");
    } else {
        let done = run_one_cycle(&config, &collector, &engine, &sink)?;
        info!(batches = done, "spool drained");
    }

    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use metapipe::config::DEFAULT_SOURCE;
use metapipe::frame::DEFAULT_MAX_RECORD_BYTES;
use metapipe::{
    create_state, Config, EventSink, FingerprintMode, LogSink, MetadataEvent, MetadataReader,
    SharedState,
};

#[derive(Parser, Debug)]
#[command(name = "metapipe", version)]
#[command(about = "Follow a shairport-sync metadata pipe and report what is playing.")]
struct Cli {
    /// Metadata pipe (or file) written by shairport-sync
    #[arg(long, env = "METAPIPE_SOURCE", default_value = DEFAULT_SOURCE)]
    source: PathBuf,

    /// Largest item accepted before the stream is treated as broken
    #[arg(long, default_value_t = DEFAULT_MAX_RECORD_BYTES)]
    max_record_bytes: usize,

    /// How album, artist and title are combined to detect a new track
    #[arg(long, value_enum, default_value_t = FingerprintMode::Concatenated)]
    fingerprint: FingerprintMode,

    /// Print the snapshot as JSON on every track or playback change and at exit
    #[arg(long)]
    json: bool,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config {
        source: cli.source,
        max_record_bytes: cli.max_record_bytes,
        fingerprint: cli.fingerprint,
    };
    log::info!("Starting metapipe on {}", config.source.display());

    let state = create_state();
    let mut reader = MetadataReader::new(config, state.clone());
    if cli.json {
        reader = reader.with_sink(Arc::new(JsonSink {
            state: state.clone(),
        }));
    }

    // Setup signal handler for Ctrl+C (SIGINT) and SIGTERM
    let reader_for_signal = reader.clone();
    let json = cli.json;
    ctrlc::set_handler(move || {
        log::info!("Received interrupt signal (Ctrl+C), stopping reader...");
        reader_for_signal.stop();
        if json {
            print_snapshot(&reader_for_signal.state());
        }
        // The reader may be blocked on the pipe, so don't wait for it
        std::process::exit(0);
    })
    .context("Failed to set Ctrl+C handler")?;

    reader.spawn().context("Failed to start metadata reader")?;
    let result = reader.wait();

    if cli.json {
        print_snapshot(&state);
    }
    let stats = state.read().stats;
    log::info!(
        "{} items, {} tracks, {} malformed, {} undecodable fields, {} unknown codes",
        stats.items,
        stats.tracks,
        stats.malformed,
        stats.field_errors,
        stats.unknown_codes
    );

    result.context("Metadata reader stopped with an error")
}

/// Logs every event and prints the snapshot whenever the track or playback state changes.
struct JsonSink {
    state: SharedState,
}

impl EventSink for JsonSink {
    fn emit(&self, event: &MetadataEvent) {
        LogSink.emit(event);
        if matches!(
            event,
            MetadataEvent::Playback { .. }
                | MetadataEvent::BundleEnd {
                    track_changed: true,
                    ..
                }
        ) {
            print_snapshot(&self.state);
        }
    }
}

fn print_snapshot(state: &SharedState) {
    let now_playing = state.read().now_playing.clone();
    match serde_json::to_string(&now_playing) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize snapshot: {}", e),
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use tracing::{info, warn};

mod cli;
mod headers;

use cli::{parse_url, Args};
use playback_engine::prelude::*;
use playback_observer::logging::{init_logging_from_env, init_logging_with_level, LoggingMode};
use playback_observer::{Callbacks, MetadataSink, ObservationService, ObserverConfig};

/// Why the main loop stops
#[derive(Debug)]
enum Outcome {
    Ended,
    Failed(Option<MediaError>),
    Interrupted,
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    if std::env::var_os("AVPLAY_LOG_MODE").is_some() {
        init_logging_from_env()?;
    } else {
        init_logging_with_level(LoggingMode::Development, &args.log_level.to_lowercase())?;
    }

    let Some(url) = parse_url(&args.url) else {
        println!("invalid url");
        std::process::exit(1);
    };

    let engine = Arc::new(SimulatedEngine::new());
    let (tx, rx) = mpsc::channel::<Outcome>();

    let callbacks = build_callbacks(&tx, args.json);
    let service = ObservationService::with_config(&engine, callbacks, ObserverConfig::new())
        .context("Failed to observe the player")?;

    // Failures are read back through the snapshot handle from inside the callbacks
    let reader = service.reader();
    let failed = tx.clone();
    service.callbacks().item_status_changed.set(move |status: ItemStatus| {
        if status.is_failed() {
            let _ = failed.send(Outcome::Failed(reader.item_error()));
        }
    });
    let reader = service.reader();
    let failed = tx.clone();
    service.callbacks().player_status_changed.set(move |status: PlayerStatus| {
        if status.is_failed() {
            let _ = failed.send(Outcome::Failed(reader.player_error()));
        }
    });

    let metadata = if args.should_output_metadata() {
        let sink = Arc::new(MetadataSink::new());
        if args.json {
            sink.on_entry.set(|entry| {
                if let Ok(line) = serde_json::to_string(&entry) {
                    println!("{}", line);
                }
            });
        }
        let output: Arc<dyn MetadataOutput> = Arc::clone(&sink) as Arc<dyn MetadataOutput>;
        Some(
            engine
                .add_metadata_output(output)
                .context("Failed to attach the metadata output")?,
        )
    } else {
        None
    };

    if let Err(e) = headers::spawn_head_request(url.clone(), args.head_timeout_duration()) {
        warn!("Could not start the HEAD request: {}", e);
    }

    start_playback(&engine, &args, &url);

    let interrupt = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Outcome::Interrupted);
    })
    .context("Failed to install the Ctrl-C handler")?;
    drop(tx);

    let tick = args.tick_duration();
    let outcome = loop {
        match rx.recv_timeout(tick) {
            Ok(outcome) => break outcome,
            Err(RecvTimeoutError::Timeout) => engine.advance(MediaTime::from_duration(tick)),
            Err(RecvTimeoutError::Disconnected) => break Outcome::Interrupted,
        }
    };

    match &outcome {
        Outcome::Ended => info!("Playback finished"),
        Outcome::Failed(Some(error)) => warn!("Playback failed: {}", error),
        Outcome::Failed(None) => warn!("Playback failed"),
        Outcome::Interrupted => info!("Interrupted"),
    }

    if let Some(id) = metadata {
        if let Err(e) = engine.remove(id) {
            warn!("Failed to detach the metadata output: {}", e);
        }
    }
    service.shutdown();

    if let Outcome::Failed(error) = outcome {
        let reason = error.map(|e| e.to_string()).unwrap_or_else(|| "unknown error".to_string());
        return Err(anyhow::anyhow!("Playback of {} failed: {}", url, reason));
    }

    Ok(())
}

/// Callbacks that end the main loop, plus JSON output of log entries
fn build_callbacks(tx: &Sender<Outcome>, json: bool) -> Callbacks {
    let callbacks = Callbacks::new();

    let ended = tx.clone();
    callbacks.item_played_to_end.set(move |()| {
        let _ = ended.send(Outcome::Ended);
    });

    let failed = tx.clone();
    callbacks.item_failed_to_play_to_end.set(move |error| {
        let _ = failed.send(Outcome::Failed(error));
    });

    if json {
        callbacks.item_new_access_log_event.set(|event: AccessLogEvent| {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        });
        callbacks.item_new_error_log_event.set(|event: ErrorLogEvent| {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        });
    }

    callbacks
}

/// Script the simulated player the way a real stream would come up
fn start_playback(engine: &SimulatedEngine, args: &Args, url: &url::Url) {
    let session = uuid::Uuid::new_v4().to_string();
    let started = chrono::Utc::now();

    engine.load(url.as_str());
    engine.set_muted(args.muted);

    let duration = match args.duration {
        Some(seconds) => MediaTime::from_seconds(seconds, 1000),
        None => {
            engine.set_current_date(Some(started));
            MediaTime::Indefinite
        }
    };
    engine.set_duration(duration);
    engine.set_buffer_empty(false);
    engine.set_likely_to_keep_up(true);
    if duration.is_numeric() {
        engine.set_loaded_time_ranges(vec![TimeRange::new(MediaTime::ZERO, duration)]);
        engine.set_seekable_time_ranges(vec![TimeRange::new(MediaTime::ZERO, duration)]);
    }
    engine.set_status(PlayerStatus::ReadyToPlay);
    // The observer resumes playback when the item turns ready
    engine.set_item_status(ItemStatus::ReadyToPlay);

    engine.emit_metadata(&[TimedMetadataGroup::new(vec![MetadataItem::common(
        CommonKey::Title.as_str(),
        MetadataValue::Text(url.path().trim_start_matches('/').to_string()),
    )])]);

    let playback_type = if args.duration.is_some() { "VOD" } else { "LIVE" };
    engine.append_access_log(AccessLogEvent {
        uri: Some(url.to_string()),
        server_address: url.host_str().map(str::to_string),
        playback_session_id: Some(session),
        playback_start_date: Some(started),
        playback_type: Some(playback_type.to_string()),
        ..AccessLogEvent::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("avplay").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_start_playback_resumes_once() {
        let engine = Arc::new(SimulatedEngine::new());
        let service = ObservationService::new(&engine, Callbacks::new()).unwrap();
        let args = args(&["https://example.com/song.mp3", "--duration", "3", "--muted"]);
        let url = parse_url(&args.url).unwrap();

        start_playback(&engine, &args, &url);
        service.flush().unwrap();

        assert_eq!(engine.resume_count(), 1);
        assert_eq!(engine.rate(), 1.0);
        assert!(engine.is_muted());
        assert_eq!(service.current_duration(), Some(MediaTime::new(3, 1)));
    }
}

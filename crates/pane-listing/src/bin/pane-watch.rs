//! Watches a directory (or several, as a library) and logs every pane event.
//!
//! Usage:
//!   pane-watch [PATH...]
//!
//! One path lists that directory; several paths merge them into a library view.
//! Without arguments, the current directory is used. Tuning comes from the
//! `PANE_LISTING_*` environment variables, log level from `RUST_LOG` (default: info).

use pane_listing::{LoaderConfig, NavigationRequest, PaneEvent, PaneLoader, Resolver};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn request_from_args() -> NavigationRequest {
    let mut paths: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    match paths.len() {
        0 => NavigationRequest::local(env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
        1 => NavigationRequest::local(paths.remove(0)),
        _ => NavigationRequest::library(paths),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = LoaderConfig::from_env();
    log::debug!("Loader config: {:?}", config);

    let loader = PaneLoader::new(Arc::new(Resolver::local_only()), config);
    let mut events = loader.subscribe();
    loader.submit(request_from_args());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    loader.dispose();
}

fn log_event(event: &PaneEvent) {
    match event {
        PaneEvent::SnapshotPublished {
            generation,
            items,
            source,
            failures,
        } => {
            log::info!("[gen {}] {} ({} items)", generation, source.location, items.len());
            for item in items.iter() {
                let size = item.size_bytes.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
                let marker = if item.is_container { "/" } else { "" };
                log::info!("  {:>12}  {}{}", size, item.name, marker);
            }
            for failure in failures {
                log::warn!("  unavailable: {}: {}", failure.path, failure.message);
            }
        }
        PaneEvent::EnrichmentUpdated {
            generation,
            item_path,
            fields,
        } => {
            log::info!(
                "[gen {}] {}: {} bytes in {} files, {} dirs",
                generation,
                item_path,
                fields.size_bytes,
                fields.file_count,
                fields.dir_count
            );
        }
        PaneEvent::LoadFailed { generation, error } => {
            log::error!("[gen {}] {}", generation, error);
        }
    }
}

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};

use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, registry::Registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_NAME: &str = "bt-daemon.log";

/// Candidate log file locations, most preferred first.
///
/// - debug:  ./bt-daemon.log (current directory)
/// - release: /var/log/bt-daemon.log, then XDG data dir + "bt-daemon/bt-daemon.log"
pub fn log_filepaths() -> Vec<PathBuf> {
    #[cfg(debug_assertions)]
    {
        vec![PathBuf::from(".").join(LOG_FILE_NAME)]
    }

    #[cfg(not(debug_assertions))]
    {
        let mut paths = vec![PathBuf::from("/var/log").join(LOG_FILE_NAME)];
        match xdg::BaseDirectories::with_prefix("bt-daemon").place_data_file(LOG_FILE_NAME) {
            Ok(p) => paths.push(p),
            Err(e) => warn!("Could not determine XDG log file path: {}", e),
        }
        paths
    }
}

/// The appender panics on a file it cannot open, so probe first.
fn is_writable(path: &Path) -> bool {
    OpenOptions::new().create(true).append(true).open(path).is_ok()
}

fn build_file_writer() -> Result<NonBlocking> {
    let path = log_filepaths()
        .into_iter()
        .find(|p| is_writable(p))
        .ok_or_else(|| anyhow!("No writable log file location"))?;

    let dir = path
        .parent()
        .context("Could not determine log file directory")?;
    let file_name = path
        .file_name()
        .context("Could not determine log file name")?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep guard alive for entire process
    let _ = LOG_GUARD.set(guard);

    Ok(file_writer)
}

pub fn init_tracing() {
    #[cfg(debug_assertions)]
    let log_level = LevelFilter::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = LevelFilter::INFO;

    #[cfg(debug_assertions)]
    let stdout_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_filter(log_level);

    #[cfg(not(debug_assertions))]
    let stdout_layer = fmt::layer().with_ansi(false).with_filter(log_level);

    match build_file_writer() {
        Ok(writer) => {
            #[cfg(debug_assertions)]
            let file_layer = fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_ansi(false) // no ANSI in file
                .with_writer(writer)
                .with_filter(log_level);

            #[cfg(not(debug_assertions))]
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(log_level);

            let subscriber = Registry::default().with(stdout_layer).with(file_layer);

            tracing::subscriber::set_global_default(subscriber)
                .expect("Could not set global tracing subscriber with file logging");
        }
        Err(e) => {
            let subscriber = Registry::default().with(stdout_layer);

            tracing::subscriber::set_global_default(subscriber)
                .expect("Could not set global tracing subscriber without file logging");

            warn!(
                "File logging could not be initialized. Falling back to stdout only: {}",
                e
            );
        }
    }
}

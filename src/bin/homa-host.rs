//! Native messaging host executable.
//!
//! Launched by the browser with the extension origin as its argument. Standard
//! output belongs to the framing protocol, so diagnostics go to a log file.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use homa_host::{Host, InstallLayout};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the log filter.
const LOG_ENV: &str = "HOMA_LOG";

/// Filter used when `HOMA_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "homa_host=info";

/// Fallback log file name in the temp directory.
const FALLBACK_LOG_NAME: &str = "homa_host_debug.log";

/// Grace period for in-flight tasks once the loop has returned.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let layout = InstallLayout::resolve();
    init_logging(layout.as_ref().ok().map(InstallLayout::host_log).as_deref());
    install_panic_hook();

    let args: Vec<String> = env::args().skip(1).collect();
    info!(?args, pid = std::process::id(), "Host started");

    let layout = match layout {
        Ok(layout) => layout,
        Err(e) => {
            error!(error = %e, "Cannot resolve install directory");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build runtime");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        let mut host = Host::builder().install_dir(layout.root()).build()?;
        host.serve(tokio::io::stdin(), tokio::io::stdout()).await
    });

    // The stdin reader parks a blocking thread; do not wait on it forever.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match outcome {
        Ok(()) => {
            info!("Host exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Host exited with error");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Installs the global subscriber.
///
/// Writes to `preferred`, then the temp fallback, then stderr; never stdout.
fn init_logging(preferred: Option<&Path>) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fallback = env::temp_dir().join(FALLBACK_LOG_NAME);
    let writer = preferred
        .and_then(open_log)
        .or_else(|| open_log(&fallback))
        .map_or_else(
            || BoxMakeWriter::new(std::io::stderr),
            |file| BoxMakeWriter::new(Mutex::new(file)),
        );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn open_log(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Routes panic reports into the log instead of stderr.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!(%location, "Panic: {info}");
    }));
}

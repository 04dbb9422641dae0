//! Native messaging host and dispatch loop.
//!
//! The [`Host`] reads one request at a time, routes it by command and writes
//! one correlated reply. `TEST` is the exception: its reply is written later
//! by a spawned task, and dispatch returns [`Dispatch::Deferred`] so the
//! loop writes nothing for it.
//!
//! # Example
//!
//! ```no_run
//! use homa_host::Host;
//!
//! # async fn example() -> homa_host::Result<()> {
//! let mut host = Host::builder().install_dir("/opt/homa").build()?;
//! host.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::engine::{PortRegistry, Supervisor, TestRunner};
use crate::error::{Error, Result};
use crate::protocol::{Command, Message};
use crate::transport::{ChannelWriter, FrameReader, decode_payload};

use super::builder::HostBuilder;
use super::layout::InstallLayout;
use super::options::{EngineOptions, ProbeOptions};

// ============================================================================
// Constants
// ============================================================================

/// Reply text for unrecognized commands.
const UNKNOWN_COMMAND: &str = "unknown_command";

/// Reply text when a handler panicked.
const INTERNAL_ERROR: &str = "internal error";

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of dispatching one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Write this reply now.
    Reply(Message),
    /// A spawned task owns the reply.
    Deferred,
}

// ============================================================================
// Host
// ============================================================================

/// Native messaging host.
///
/// Owns the [`Supervisor`] (and therefore the persistent engine) and a
/// shared [`TestRunner`].
pub struct Host {
    /// Install paths.
    layout: Arc<InstallLayout>,
    /// Persistent engine owner; touched only by the loop.
    supervisor: Supervisor,
    /// Shared with spawned `TEST` tasks.
    tester: Arc<TestRunner>,
}

// ============================================================================
// Host - Display
// ============================================================================

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("root", &self.layout.root())
            .field("engine", &self.supervisor.status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Host - Public API
// ============================================================================

impl Host {
    /// Creates a configuration builder for the host.
    #[inline]
    #[must_use]
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Returns the install layout.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Returns the persistent engine supervisor.
    #[inline]
    #[must_use]
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Returns the persistent engine supervisor mutably.
    #[inline]
    #[must_use]
    pub fn supervisor_mut(&mut self) -> &mut Supervisor {
        &mut self.supervisor
    }

    /// Runs the message loop until the channel ends.
    ///
    /// The persistent engine is stopped before this returns, whatever the
    /// reason for exiting.
    ///
    /// # Errors
    ///
    /// Returns `Ok(())` when the extension closed the channel cleanly, and
    /// the channel error (read failure, write failure, oversized frame)
    /// otherwise.
    pub async fn serve<R, W>(&mut self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut reader = FrameReader::new(reader);
        let writer = ChannelWriter::new(writer);

        info!(root = %self.layout.root().display(), "Message loop started");
        let outcome = self.run_loop(&mut reader, &writer).await;

        if let Err(e) = self.supervisor.stop().await {
            warn!(error = %e, "Failed to stop engine on exit");
        }

        match &outcome {
            Ok(()) => info!("Channel closed by extension, exiting"),
            Err(e) => error!(error = %e, "Channel failed, exiting"),
        }
        outcome
    }

    /// Routes one request.
    ///
    /// `writer` is handed to the task spawned for `TEST`.
    pub async fn dispatch(&mut self, request: Message, writer: &ChannelWriter) -> Dispatch {
        match request.cmd {
            Command::Ping => Dispatch::Reply(Message::pong(&request)),
            Command::Test => match request.config.clone() {
                Some(fragment) => {
                    self.spawn_test(request, fragment, writer.clone());
                    Dispatch::Deferred
                }
                None => Dispatch::Reply(error_reply(&request, &Error::MissingConfig)),
            },
            Command::Start => Dispatch::Reply(self.handle_start(&request).await),
            Command::Stop => Dispatch::Reply(self.handle_stop(&request).await),
            Command::Unknown(ref name) => {
                warn!(cmd = %name, "Unknown command");
                Dispatch::Reply(Message::error(&request, UNKNOWN_COMMAND))
            }
        }
    }
}

// ============================================================================
// Host - Internal API
// ============================================================================

impl Host {
    /// Creates a host from validated settings.
    pub(crate) fn new(layout: InstallLayout, engine: EngineOptions, probe: ProbeOptions) -> Self {
        let layout = Arc::new(layout);
        let ports = PortRegistry::new();

        let supervisor = Supervisor::new(Arc::clone(&layout), engine.clone(), ports.clone());
        let tester = Arc::new(TestRunner::new(Arc::clone(&layout), engine, probe, ports));

        Self {
            layout,
            supervisor,
            tester,
        }
    }

    /// Reads and answers requests until the channel ends.
    async fn run_loop<R>(
        &mut self,
        reader: &mut FrameReader<R>,
        writer: &ChannelWriter,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let next = tokio::select! {
                biased;
                () = writer.closed() => return Err(Error::ChannelClosed),
                next = reader.read_frame() => next,
            };

            let Some(payload) = next? else {
                return Ok(());
            };

            let request = match decode_payload(&payload) {
                Ok(request) => request,
                Err(e) => {
                    let header = Message::header_of(&payload);
                    warn!(id = ?header.id, error = %e, "Malformed message");
                    let reply = Message::error(&header, format!("invalid message: {e}"));
                    writer.write_message(&reply).await?;
                    continue;
                }
            };

            debug!(id = ?request.id, cmd = %request.cmd, "RX");

            match self.dispatch_guarded(request, writer).await {
                Dispatch::Reply(reply) => {
                    debug!(id = ?reply.id, cmd = %reply.cmd, status = ?reply.status, "TX");
                    writer.write_message(&reply).await?;
                }
                Dispatch::Deferred => {}
            }
        }
    }

    /// Dispatches, turning a handler panic into an error reply.
    async fn dispatch_guarded(&mut self, request: Message, writer: &ChannelWriter) -> Dispatch {
        let skeleton = Message::reply_to(&request);

        match guarded(self.dispatch(request, writer)).await {
            Ok(dispatch) => dispatch,
            Err(panic) => {
                error!(cmd = %skeleton.cmd, %panic, "Handler panicked");
                Dispatch::Reply(Message::error(&skeleton, INTERNAL_ERROR))
            }
        }
    }

    async fn handle_start(&mut self, request: &Message) -> Message {
        let Some(fragment) = request.config.as_ref() else {
            return error_reply(request, &Error::MissingConfig);
        };

        match self.supervisor.start(fragment).await {
            Ok(port) => Message::ok(request).with_port(port),
            Err(e) => {
                error!(error = %e, "Engine start failed");
                error_reply(request, &e)
            }
        }
    }

    async fn handle_stop(&mut self, request: &Message) -> Message {
        match self.supervisor.stop().await {
            Ok(()) => Message::ok(request),
            Err(e) => error_reply(request, &e),
        }
    }

    /// Runs a connectivity test on its own task and replies when done.
    fn spawn_test(&self, request: Message, fragment: Value, writer: ChannelWriter) {
        let tester = Arc::clone(&self.tester);
        debug!(id = ?request.id, "Connectivity test spawned");

        tokio::spawn(async move {
            let outcome = guarded(tester.run(&fragment)).await;
            let reply = test_reply(&request, outcome);

            if let Err(e) = writer.write_message(&reply).await {
                warn!(id = ?request.id, error = %e, "Failed to deliver test result");
            }
        });
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn error_reply(request: &Message, err: &Error) -> Message {
    Message::error(request, err.reply_text())
}

/// Builds the deferred `TEST` reply; latency goes in `data` as whole ms.
fn test_reply(request: &Message, outcome: StdResult<Result<Duration>, String>) -> Message {
    match outcome {
        Ok(Ok(latency)) => {
            let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
            Message::ok(request).with_data(millis)
        }
        Ok(Err(e)) => error_reply(request, &e),
        Err(panic) => {
            error!(id = ?request.id, %panic, "Test task panicked");
            Message::error(request, INTERNAL_ERROR)
        }
    }
}

/// Polls `handler` to completion, returning the panic message if it panicked.
async fn guarded<F>(handler: F) -> StdResult<F::Output, String>
where
    F: Future,
{
    AssertUnwindSafe(handler)
        .catch_unwind()
        .await
        .map_err(|panic| panic_message(&*panic).to_string())
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ============================================================================
// Tests
// ============================================================================

//! Shared fixtures for integration tests.
//!
//! Provides a throwaway install tree with a stand-in engine and an in-memory
//! client for the native messaging channel.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use homa_host::transport::{FrameReader, encode_frame};
use homa_host::{Host, Message, Result};
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex, split};
use tokio::task::JoinHandle;

// ============================================================================
// Constants
// ============================================================================

/// Stand-in engine: records its pid next to `bin/`, then stays alive until
/// killed. `exec` keeps the recorded pid valid.
const FAKE_ENGINE: &str = "#!/bin/sh\necho $$ >> \"$(dirname \"$0\")/../engine.pids\"\nexec sleep 30\n";

/// Stand-in engine that dies immediately.
const CRASHING_ENGINE: &str = "#!/bin/sh\nexit 23\n";

/// Settle delay used by tests; short but non-zero.
pub const SETTLE: Duration = Duration::from_millis(50);

/// Upper bound on any single reply wait.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Install
// ============================================================================

/// Temporary install root.
pub struct Install {
    dir: TempDir,
}

impl Install {
    /// Install tree without an engine executable.
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    /// Install tree whose engine sleeps until killed.
    pub fn with_fake_engine() -> Self {
        let install = Self::empty();
        install.write_engine(FAKE_ENGINE);
        install
    }

    /// Install tree whose engine exits during startup.
    pub fn with_crashing_engine() -> Self {
        let install = Self::empty();
        install.write_engine(CRASHING_ENGINE);
        install
    }

    fn write_engine(&self, script: &str) {
        let bin = self.root().join("bin");
        fs::create_dir_all(&bin).expect("create bin");
        let path = bin.join("xray");
        fs::write(&path, script).expect("write engine");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root().join("config")
    }

    /// Names of `config_test_*.json` files currently on disk.
    pub fn test_configs(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.config_dir()) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("config_test_"))
            .collect()
    }

    /// Pids of every stand-in engine launched so far.
    pub fn engine_pids(&self) -> Vec<u32> {
        fs::read_to_string(self.root().join("engine.pids"))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect()
    }

    /// Builds a host against this install.
    pub fn host(&self) -> Host {
        Host::builder()
            .install_dir(self.root())
            .settle_delay(SETTLE)
            .probe_timeout(Duration::from_secs(2))
            .build()
            .expect("build host")
    }
}

// ============================================================================
// Client
// ============================================================================

/// Extension side of an in-memory channel.
pub struct Client {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: Option<WriteHalf<DuplexStream>>,
    host: JoinHandle<(Host, Result<()>)>,
}

impl Client {
    /// Starts `host` serving one end of a duplex pipe.
    pub fn connect(mut host: Host) -> Self {
        let (client_side, host_side) = duplex(64 * 1024);
        let (host_read, host_write) = split(host_side);
        let (reader, writer) = split(client_side);

        let task = tokio::spawn(async move {
            let outcome = host.serve(host_read, host_write).await;
            (host, outcome)
        });

        Self {
            reader: FrameReader::new(reader),
            writer: Some(writer),
            host: task,
        }
    }

    /// Sends one framed message.
    pub async fn send(&mut self, message: &Message) {
        let frame = encode_frame(message).expect("encode");
        self.send_raw(&frame).await;
    }

    /// Sends raw bytes.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let writer = self.writer.as_mut().expect("channel open");
        writer.write_all(bytes).await.expect("write");
        writer.flush().await.expect("flush");
    }

    /// Sends a payload with its length prefix.
    pub async fn send_payload(&mut self, payload: &[u8]) {
        let mut frame = (payload.len() as u32).to_le_bytes().to_vec();
        frame.extend_from_slice(payload);
        self.send_raw(&frame).await;
    }

    /// Reads the next reply.
    pub async fn recv(&mut self) -> Message {
        tokio::time::timeout(REPLY_TIMEOUT, self.reader.read_message())
            .await
            .expect("reply in time")
            .expect("read reply")
            .expect("channel open")
    }

    /// Sends a request and reads the next reply.
    pub async fn call(&mut self, message: &Message) -> Message {
        self.send(message).await;
        self.recv().await
    }

    /// Closes the extension's write end and waits for the host to return.
    pub async fn close(mut self) -> (Host, Result<()>) {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.expect("shutdown");
        }
        self.finish().await
    }

    /// Waits for the host to return without closing anything.
    pub async fn finish(self) -> (Host, Result<()>) {
        tokio::time::timeout(REPLY_TIMEOUT, self.host)
            .await
            .expect("host exits in time")
            .expect("host task")
    }
}

// ============================================================================
// Process Helpers
// ============================================================================

/// Returns `true` while a process with `pid` exists and is not a zombie.
pub fn process_alive(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z"),
        Err(_) => false,
    }
}

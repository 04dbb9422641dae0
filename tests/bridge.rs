//! End-to-end tests of the native messaging loop.
//!
//! A stand-in engine script replaces Xray, so these run on Unix only.

#![cfg(unix)]

mod common;

use std::collections::HashMap;

use common::{Client, Install, process_alive};
use homa_host::{Command, Error, Message, Status};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn fragment() -> serde_json::Value {
    json!({
        "protocol": "vless",
        "settings": {"vnext": [{"address": "203.0.113.7", "port": 443}]}
    })
}

fn request(cmd: Command, id: &str) -> Message {
    Message::new(cmd).with_id(id)
}

// ============================================================================
// Channel
// ============================================================================

#[tokio::test]
async fn test_ping_pong() {
    let install = Install::empty();
    let mut client = Client::connect(install.host());

    let ping = request(Command::Ping, "p-1");
    let reply = client.call(&ping).await;

    assert_eq!(reply.status, Some(Status::Pong));
    assert_eq!(reply.data, Some(json!("pong")));
    assert!(reply.correlates_with(&ping));

    let (_, outcome) = client.close().await;
    outcome.expect("clean exit");
}

#[tokio::test]
async fn test_unknown_command_keeps_cmd() {
    let install = Install::empty();
    let mut client = Client::connect(install.host());

    let reply = client.call(&Message::new("RELOAD").with_id("u-1")).await;

    assert_eq!(reply.cmd, Command::from("RELOAD"));
    assert_eq!(reply.error.as_deref(), Some("unknown_command"));
}

#[tokio::test]
async fn test_empty_frame_is_unknown_command() {
    let install = Install::empty();
    let mut client = Client::connect(install.host());

    client.send_payload(b"").await;
    let reply = client.recv().await;

    assert_eq!(reply.id, None);
    assert_eq!(reply.cmd, Command::from(""));
    assert_eq!(reply.error.as_deref(), Some("unknown_command"));
}

#[tokio::test]
async fn test_malformed_json_is_answered_and_loop_continues() {
    let install = Install::empty();
    let mut client = Client::connect(install.host());

    client.send_payload(b"{not json").await;
    let reply = client.recv().await;
    assert!(reply.is_error());
    assert!(
        reply
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("invalid message"))
    );

    let reply = client.call(&request(Command::Ping, "after")).await;
    assert_eq!(reply.status, Some(Status::Pong));
}

#[tokio::test]
async fn test_undecodable_field_keeps_correlation() {
    let install = Install::empty();
    let mut client = Client::connect(install.host());

    client
        .send_payload(br#"{"id":"bad-1","cmd":"START","status":"pending"}"#)
        .await;
    let reply = client.recv().await;

    assert!(reply.is_error());
    assert_eq!(reply.id.as_ref().map(|id| id.as_str()), Some("bad-1"));
    assert_eq!(reply.cmd, Command::Start);
}

#[tokio::test]
async fn test_oversized_frame_ends_loop() {
    let install = Install::empty();
    let client = {
        let mut client = Client::connect(install.host());
        client.send_raw(&u32::MAX.to_le_bytes()).await;
        client
    };

    let (_, outcome) = client.finish().await;
    assert!(matches!(outcome, Err(Error::FrameTooLarge { .. })));
}

#[tokio::test]
async fn test_immediate_eof_exits_cleanly() {
    let install = Install::with_fake_engine();
    let client = Client::connect(install.host());

    let (host, outcome) = client.close().await;
    outcome.expect("clean exit");
    assert!(!host.supervisor().is_running());
}

// ============================================================================
// START / STOP
// ============================================================================

#[tokio::test]
async fn test_start_without_config() {
    let install = Install::with_fake_engine();
    let mut client = Client::connect(install.host());

    let reply = client.call(&request(Command::Start, "s-1")).await;
    assert_eq!(reply.error.as_deref(), Some("Config is missing"));

    client
        .send_payload(br#"{"id":"s-2","cmd":"START","config":null}"#)
        .await;
    let reply = client.recv().await;
    assert_eq!(reply.error.as_deref(), Some("Config is missing"));
    assert_eq!(reply.port, None);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let install = Install::empty();
    let mut client = Client::connect(install.host());

    for id in ["x-1", "x-2"] {
        let reply = client.call(&request(Command::Stop, id)).await;
        assert_eq!(reply.status, Some(Status::Ok));
    }
}

#[tokio::test]
async fn test_start_without_engine_binary() {
    let install = Install::empty();
    let mut client = Client::connect(install.host());

    let reply = client
        .call(&request(Command::Start, "s-1").with_config(fragment()))
        .await;

    assert!(reply.is_error());
    assert!(reply.error.as_deref().is_some_and(|e| e.contains("not found")));

    let (host, _) = client.close().await;
    assert!(!host.supervisor().is_running());
}

#[tokio::test]
async fn test_start_with_crashing_engine() {
    let install = Install::with_crashing_engine();
    let mut client = Client::connect(install.host());

    let reply = client
        .call(&request(Command::Start, "s-1").with_config(fragment()))
        .await;

    assert!(
        reply
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("xray exited during startup"))
    );
}

#[tokio::test]
async fn test_start_writes_run_config() -> anyhow::Result<()> {
    let install = Install::with_fake_engine();
    let mut client = Client::connect(install.host());

    let reply = client
        .call(&request(Command::Start, "s-1").with_config(fragment()))
        .await;
    let port = reply.port.ok_or_else(|| anyhow::anyhow!("no port in {reply:?}"))?;

    let written = std::fs::read_to_string(install.config_dir().join("config_run.json"))?;
    let doc: serde_json::Value = serde_json::from_str(&written)?;
    assert_eq!(doc["inbounds"][0]["port"], json!(port));
    assert_eq!(doc["outbounds"][0], fragment());

    let (_, outcome) = client.close().await;
    outcome?;
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_restart_kills_previous_process() {
    let install = Install::with_fake_engine();
    let mut host = install.host();

    let first_port = host
        .supervisor_mut()
        .start(&fragment())
        .await
        .expect("first start");
    let first_pid = host.supervisor().status().expect("running").pid;
    assert!(process_alive(first_pid));
    assert!(host.supervisor().ports().is_reserved(first_port));

    let second_port = host
        .supervisor_mut()
        .start(&fragment())
        .await
        .expect("second start");
    let second_pid = host.supervisor().status().expect("running").pid;

    assert_ne!(first_port, second_port);
    assert!(!host.supervisor().ports().is_reserved(first_port));
    assert!(host.supervisor().ports().is_reserved(second_port));
    assert_eq!(host.supervisor().ports().len(), 1);

    assert!(!process_alive(first_pid));
    assert!(process_alive(second_pid));

    let mut client = Client::connect(host);
    let reply = client.call(&request(Command::Stop, "x-1")).await;
    assert_eq!(reply.status, Some(Status::Ok));
    assert!(!process_alive(second_pid));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_eof_kills_persistent_engine() {
    let install = Install::with_fake_engine();
    let mut client = Client::connect(install.host());

    let reply = client
        .call(&request(Command::Start, "s-1").with_config(fragment()))
        .await;
    assert_eq!(reply.status, Some(Status::Ok));

    let (host, outcome) = client.close().await;
    outcome.expect("clean exit");
    assert!(host.supervisor().status().is_none());
}

// ============================================================================
// TEST
// ============================================================================

#[tokio::test]
async fn test_test_without_config_is_synchronous() {
    let install = Install::with_fake_engine();
    let mut client = Client::connect(install.host());

    let reply = client.call(&request(Command::Test, "t-1")).await;
    assert_eq!(reply.error.as_deref(), Some("Config is missing"));
}

#[tokio::test]
async fn test_unreachable_test_reports_error_and_cleans_up() {
    let install = Install::with_fake_engine();
    let mut client = Client::connect(install.host());

    // The stand-in engine never listens, so the probe cannot connect.
    let reply = client
        .call(&request(Command::Test, "t-1").with_config(fragment()))
        .await;

    assert!(reply.is_error());
    assert!(reply.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert!(install.test_configs().is_empty());

    let pids = install.engine_pids();
    assert_eq!(pids.len(), 1);
    #[cfg(target_os = "linux")]
    assert!(!process_alive(pids[0]));
}

#[tokio::test]
async fn test_concurrent_tests_correlate_by_id() {
    let install = Install::with_fake_engine();
    let mut client = Client::connect(install.host());

    let sent: Vec<Message> = ["t-1", "t-2", "t-3"]
        .into_iter()
        .map(|id| request(Command::Test, id).with_config(fragment()))
        .collect();
    for message in &sent {
        client.send(message).await;
    }

    // The loop keeps serving while tests run.
    client.send(&request(Command::Ping, "p-1")).await;

    let mut replies: HashMap<String, Message> = HashMap::new();
    while replies.len() < sent.len() + 1 {
        let reply = client.recv().await;
        let id = reply.id.as_ref().expect("id").as_str().to_string();
        replies.insert(id, reply);
    }
    assert_eq!(replies["p-1"].status, Some(Status::Pong));

    for message in &sent {
        let id = message.id.as_ref().expect("id").as_str();
        let reply = &replies[id];
        assert!(reply.correlates_with(message));
        assert!(reply.is_error());
    }
    assert!(install.test_configs().is_empty());

    let pids = install.engine_pids();
    assert_eq!(pids.len(), sent.len());
    #[cfg(target_os = "linux")]
    assert!(pids.iter().all(|&pid| !process_alive(pid)));
}

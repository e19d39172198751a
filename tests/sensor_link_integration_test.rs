// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Real-world integration test for the sensor link simulator
//!
//! These tests start a full daemon instance (simulator server plus
//! simulation loop) and exercise the JSON line protocol end to end: client
//! reads and writes, batched reads with unknown ids, and the in-band error
//! responses for malformed and unknown requests over a raw TCP connection.

use anyhow::Result;
use rust_sensorlink::{
    client::{ClientError, SensorClient},
    config::Config,
    daemon::launch_daemon::Daemon,
    registers::{register_ids, REGISTER_TABLE},
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;

/// Build a test configuration on a dedicated port so tests can run in
/// parallel without colliding.
fn test_config(port: u16) -> Config {
    let mut config = Config::default();
    config.simulator.port = port;
    config.simulator.tick_interval_ms = 100;
    config.polling.port = port;
    config.polling.connect_timeout_ms = 2000;
    config.polling.request_timeout_ms = 2000;
    config
}

/// Integration test that starts a real daemon and runs the full
/// read/write/batch cycle through the sensor client
#[tokio::test]
async fn test_sensor_link_end_to_end() -> Result<()> {
    // Initialize logging for debugging
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let config = test_config(18891);

    println!("Starting daemon with simulator server and simulation loop...");
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    // Give the server a moment to start accepting and the simulation loop
    // a few ticks to move the registers
    sleep(Duration::from_millis(500)).await;

    let mut client = SensorClient::new(config.polling.clone());
    client.connect().await?;
    println!("✓ Connected to simulator at {}", config.polling.server_address());

    // Test 1: Read every register and verify the simulated values stay
    // inside the register bounds
    println!("\n=== Testing full-table batched read ===");
    let values = client.read_multiple(&register_ids()).await?;
    assert_eq!(values.len(), REGISTER_TABLE.len());
    for spec in REGISTER_TABLE {
        let value = values[spec.id];
        println!("  {} = {} {}", spec.id, value, spec.unit);
        assert!(
            (spec.min_value..=spec.max_value).contains(&value),
            "{} out of bounds: {}",
            spec.id,
            value
        );
    }
    println!("✓ All {} registers in bounds", values.len());

    // Test 2: Write a value and read it back exactly; the simulation must
    // not move it between the write and an immediate read beyond its noise,
    // so rebase and read in one quick sequence and only check the echo
    println!("\n=== Testing register write ===");
    let stored = client.write_register("D20", 42.0).await?;
    assert_eq!(stored, 42.0);
    println!("✓ Write echoed the stored value: D20 = {}", stored);

    // An out-of-range write is clamped, not rejected
    let clamped = client.write_register("D20", 250.0).await?;
    assert_eq!(clamped, 100.0);
    println!("✓ Out-of-range write clamped to {}", clamped);

    // Test 3: A batch with an unknown id still returns the known values
    println!("\n=== Testing partial batched read ===");
    let mixed = vec!["D20".to_string(), "D99".to_string()];
    let partial = client.read_multiple(&mixed).await?;
    assert_eq!(partial.len(), 1);
    assert!(partial.contains_key("D20"));
    println!("✓ Partial read returned the known register");

    // Test 4: Reading an unknown register alone is a server-side error
    match client.read_register("D99").await {
        Err(ClientError::RegisterError(message)) => {
            assert_eq!(message, "Register D99 not found");
            println!("✓ Unknown register reported as: {}", message);
        }
        other => panic!("expected a register error, got {:?}", other.err()),
    }

    // The error was in-band; the connection must still work
    let value = client.read_register("D20").await?;
    println!("✓ Connection survived the error, D20 = {}", value);

    // Clean shutdown
    println!("\n=== Shutting down daemon ===");
    client.disconnect();
    daemon.shutdown();
    daemon.join().await?;

    println!("✓ Sensor link integration test completed successfully");
    Ok(())
}

/// Drive the wire protocol with raw TCP lines to verify the in-band error
/// taxonomy and that protocol errors never kill the session
#[tokio::test]
async fn test_protocol_errors_over_raw_tcp() -> Result<()> {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let config = test_config(18892);
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    sleep(Duration::from_millis(300)).await;

    let stream = TcpStream::connect(config.polling.server_address()).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    async fn round_trip(
        writer: &mut tokio::net::tcp::OwnedWriteHalf,
        reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
        line: &str,
    ) -> Result<serde_json::Value> {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        let mut response = String::new();
        reader.read_line(&mut response).await?;
        Ok(serde_json::from_str(&response)?)
    }

    // Malformed JSON is answered, not dropped
    let reply = round_trip(&mut write_half, &mut reader, "this is not json").await?;
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], "Invalid JSON");
    println!("✓ Malformed JSON answered with: {}", reply["message"]);

    // An unknown action names the action in the error
    let reply = round_trip(&mut write_half, &mut reader, r#"{"action": "bogus"}"#).await?;
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], "Unknown action: bogus");
    println!("✓ Unknown action answered with: {}", reply["message"]);

    // A request without an action field
    let reply = round_trip(&mut write_half, &mut reader, r#"{"register": "D20"}"#).await?;
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], "Unknown action: null");

    // The same session still serves valid requests afterwards
    let reply = round_trip(
        &mut write_half,
        &mut reader,
        r#"{"action": "read", "register": "D20"}"#,
    )
    .await?;
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["register"], "D20");
    assert!(reply["value"].is_number());
    println!("✓ Session survived three protocol errors, D20 = {}", reply["value"]);

    daemon.shutdown();
    daemon.join().await?;
    Ok(())
}

/// Connecting to a port nobody listens on fails within the configured
/// timeout instead of hanging
#[tokio::test]
async fn test_connect_to_dead_port_fails() {
    let config = test_config(18893);
    let mut client = SensorClient::new(config.polling.clone());

    let started = std::time::Instant::now();
    let result = client.connect().await;
    assert!(result.is_err());
    assert!(!client.is_connected());
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "connect should fail within the configured timeout"
    );
}

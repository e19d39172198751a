// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{anyhow, Result};
use clap::Parser;

use rust_sensorlink::client::{SensorClient, SensorEvent, SensorPoller};
use rust_sensorlink::config::PollingConfig;
use rust_sensorlink::registers::register_ids;

/// TCP client for reading and writing simulated PLC registers
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Simulator server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Simulator server port
    #[clap(long, default_value = "8888")]
    port: u16,

    /// Register to read (e.g. D20); reads the whole table when omitted
    #[clap(long)]
    register: Option<String>,

    /// Write this value to the register given with --register
    #[clap(long)]
    write: Option<f64>,

    /// Keep polling and print every snapshot until interrupted
    #[clap(long)]
    watch: bool,

    /// Poll interval in milliseconds for --watch mode
    #[clap(long, default_value = "1000")]
    poll_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();

    let config = PollingConfig {
        address: args.address.clone(),
        port: args.port,
        poll_interval_ms: args.poll_interval_ms,
        ..PollingConfig::default()
    };

    if args.watch {
        return watch(config).await;
    }

    println!(
        "Connecting to sensor link at {}:{}",
        args.address, args.port
    );
    let mut client = SensorClient::new(config);
    client.connect().await?;

    if let Some(value) = args.write {
        let register = args
            .register
            .ok_or_else(|| anyhow!("--write requires --register"))?;
        let stored = client.write_register(&register, value).await?;
        println!("{} = {}", register, stored);
        return Ok(());
    }

    match args.register {
        Some(register) => {
            let value = client.read_register(&register).await?;
            println!("{} = {}", register, value);
        }
        None => {
            let values = client.read_multiple(&register_ids()).await?;
            for (register, value) in values {
                println!("{} = {}", register, value);
            }
        }
    }

    Ok(())
}

/// Poll the full register table and print each snapshot until ctrl-c.
async fn watch(config: PollingConfig) -> Result<()> {
    let mut poller = SensorPoller::new(config);
    let mut events = poller.start_polling().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SensorEvent::DataReceived(snapshot)) => {
                    let line: Vec<String> = snapshot
                        .values
                        .iter()
                        .map(|(register, value)| format!("{}={:.2}", register, value))
                        .collect();
                    println!("[{}] {}", snapshot.received_at.format("%H:%M:%S"), line.join(" "));
                }
                Some(SensorEvent::ConnectionChanged(connected)) => {
                    println!("connection: {}", if connected { "up" } else { "down" });
                }
                Some(SensorEvent::Error(message)) => {
                    eprintln!("error: {}", message);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.disconnect().await;
    Ok(())
}

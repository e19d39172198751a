// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor link client
//!
//! [`SensorClient`] is the request/response side of the link: it owns one
//! TCP connection to the simulator and exposes the three protocol
//! operations plus connection management. Every network wait is bounded by
//! the configured timeouts, and any transport failure disconnects the
//! client immediately; reconnection is the caller's decision (the
//! [`SensorPoller`] makes it automatically, once per poll tick).

use log::{info, warn};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpStream,
};
use tokio::time::timeout;

use crate::config::PollingConfig;
use crate::protocol::{decode_response, encode_line, read_frame, Request, Response};

pub mod poller;

pub use poller::{RegisterSnapshot, SensorEvent, SensorPoller};

/// Failures of one client operation.
///
/// All of these except `RegisterError` are transport errors: the client has
/// already disconnected itself by the time the error is returned, and the
/// next reconnect attempt is up to the caller.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not connected to the sensor link")]
    NotConnected,

    #[error("Communication timeout")]
    Timeout,

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Communication error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer answered, but with something the codec cannot parse.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A structured error response, e.g. `Register D99 not found`.
    #[error("Server error: {0}")]
    RegisterError(String),
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// TCP client for the simulated sensor link.
pub struct SensorClient {
    config: PollingConfig,
    connection: Option<Connection>,
}

impl SensorClient {
    pub fn new(config: PollingConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// True while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the TCP connection, bounded by the configured connect timeout.
    ///
    /// A failure (timeout, refused) is reported to the caller and not
    /// retried here. Connecting while already connected is a no-op.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Ok(());
        }

        let address = self.config.server_address();
        let stream = timeout(self.config.connect_timeout(), TcpStream::connect(&address))
            .await
            .map_err(|_| ClientError::Timeout)??;
        // One poll round trip per interval; latency matters more than batching
        let _ = stream.set_nodelay(true);

        let (read_half, write_half) = stream.into_split();
        self.connection = Some(Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        });

        info!("Connected to sensor link at {}", address);
        Ok(())
    }

    /// Close the connection if open; idempotent.
    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            info!("Disconnected from sensor link");
        }
    }

    /// Send one request and wait for its response.
    ///
    /// The write and the newline-terminated read together are bounded by the
    /// request timeout. On timeout or any transport failure the client
    /// disconnects itself and returns the error; it never resends.
    pub async fn send_request(&mut self, request: &Request) -> Result<Response, ClientError> {
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        let line =
            encode_line(request).map_err(|e| ClientError::Protocol(e.to_string()))?;

        let round_trip = timeout(self.config.request_timeout(), async {
            connection.writer.write_all(line.as_bytes()).await?;
            read_frame(&mut connection.reader).await
        })
        .await;

        let reply = match round_trip {
            Err(_) => {
                warn!("Timeout waiting for a response, disconnecting");
                self.disconnect();
                return Err(ClientError::Timeout);
            }
            Ok(Err(e)) => {
                warn!("Transport error during request: {}", e);
                self.disconnect();
                return Err(ClientError::Io(e));
            }
            Ok(Ok(None)) => {
                self.disconnect();
                return Err(ClientError::ConnectionClosed);
            }
            Ok(Ok(Some(reply))) => reply,
        };

        match decode_response(&reply) {
            Ok(response) => Ok(response),
            Err(e) => {
                // An unparseable response means framing can no longer be
                // trusted on this connection.
                self.disconnect();
                Err(ClientError::Protocol(e.to_string()))
            }
        }
    }

    /// Read one register value.
    pub async fn read_register(&mut self, register: &str) -> Result<f64, ClientError> {
        let request = Request::Read {
            register: register.to_string(),
        };
        match self.send_request(&request).await? {
            Response::Value { value, .. } => Ok(value),
            Response::Error { message, .. } => Err(ClientError::RegisterError(message)),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to read: {:?}",
                other
            ))),
        }
    }

    /// Read a batch of registers.
    ///
    /// A `partial` response is still data: the known values are returned
    /// and the per-id error messages are logged.
    pub async fn read_multiple(
        &mut self,
        registers: &[String],
    ) -> Result<BTreeMap<String, f64>, ClientError> {
        let request = Request::ReadMultiple {
            registers: registers.to_vec(),
        };
        match self.send_request(&request).await? {
            Response::Values { values, errors, .. } => {
                if let Some(errors) = errors {
                    for error in errors {
                        warn!("Partial batch read: {}", error);
                    }
                }
                Ok(values)
            }
            Response::Error { message, .. } => Err(ClientError::RegisterError(message)),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to read_multiple: {:?}",
                other
            ))),
        }
    }

    /// Write a value to a register. Returns the value the server stored,
    /// which may have been clamped to the register bounds.
    pub async fn write_register(
        &mut self,
        register: &str,
        value: f64,
    ) -> Result<f64, ClientError> {
        let request = Request::Write {
            register: register.to_string(),
            value,
        };
        match self.send_request(&request).await? {
            Response::Value { value, .. } => Ok(value),
            Response::Error { message, .. } => Err(ClientError::RegisterError(message)),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to write: {:?}",
                other
            ))),
        }
    }
}

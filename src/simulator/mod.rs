// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mock PLC simulator server
//!
//! A TCP server that answers the JSON line protocol over any number of
//! concurrent client connections. Each accepted connection is served by its
//! own session task; all sessions share the [`RegisterStore`], which a
//! background simulation loop keeps perturbing independently of any client
//! traffic.
//!
//! Failure handling follows the session state machine: a malformed or
//! unknown request is answered in-band and the session keeps going; only
//! transport failures (I/O error, peer close, oversized line) tear a session
//! down, and only that one session. A bind failure at startup is fatal for
//! the whole server.

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, Instant};

use crate::config::SimulatorConfig;
use crate::protocol::{decode_request, encode_line, read_frame, Request, Response};
use crate::registers::{NoiseGenerator, RegisterStore};

/// Bound on writing one response back to a client.
const RESPONSE_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for in-flight sessions before aborting them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// How often the accept loop re-checks the running flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// The simulator's TCP front end.
///
/// Owns the listener lifecycle; the register values live in the shared
/// [`RegisterStore`] handed in at construction so the simulation loop and
/// any embedding code see the same state.
pub struct SimulatorServer {
    listener: TcpListener,
    store: RegisterStore,
    running: Arc<AtomicBool>,
    active_sessions: Arc<AtomicUsize>,
    sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SimulatorServer {
    /// Bind the listening socket.
    ///
    /// A bind failure (port in use, permission denied) is returned to the
    /// caller; it is fatal to the server and must be reported to the
    /// operator, never retried silently.
    pub async fn bind(
        config: &SimulatorConfig,
        store: RegisterStore,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let bind_address = config.bind_address();
        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("Failed to bind simulator server to {}", bind_address))?;
        info!("Mock PLC simulator listening on {}", bind_address);

        Ok(Self {
            listener,
            store,
            running,
            active_sessions: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// The address the listener actually bound, useful when the configured
    /// port was 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read the simulator's local address")
    }

    /// Accept and serve until the running flag is cleared.
    ///
    /// On shutdown the accept loop stops first, then in-flight sessions get
    /// a bounded grace period before being aborted; the listening socket is
    /// released when the server is dropped.
    pub async fn run(&self) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_session(stream, peer),
                        Err(e) => {
                            // Transient accept errors (e.g. per-connection
                            // resource exhaustion) must not kill the server.
                            if self.running.load(Ordering::SeqCst) {
                                error!("Error accepting client connection: {}", e);
                            }
                        }
                    }
                }
                _ = sleep(SHUTDOWN_POLL) => {}
            }
        }

        // The accept loop has stopped; give in-flight sessions a bounded
        // grace period before tearing them down.
        self.drain_sessions().await;

        info!("Mock PLC simulator stopped");
        Ok(())
    }

    /// Number of currently connected clients.
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        info!("Client connected from {}", peer);
        let store = self.store.clone();
        let active = self.active_sessions.clone();
        active.fetch_add(1, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            if let Err(e) = handle_session(stream, peer, store).await {
                error!("Error handling client {}: {}", peer, e);
            }
            info!("Client {} disconnected", peer);
            active.fetch_sub(1, Ordering::SeqCst);
        });

        let mut sessions = self.sessions.lock().unwrap();
        sessions.retain(|session| !session.is_finished());
        sessions.push(handle);
    }

    /// Bounded wait for in-flight sessions, then abort the stragglers.
    async fn drain_sessions(&self) {
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.active_sessions.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            sleep(Duration::from_millis(50)).await;
        }

        let leftover = self.active_sessions.load(Ordering::SeqCst);
        if leftover > 0 {
            warn!("Aborting {} session(s) still active at shutdown", leftover);
            for session in self.sessions.lock().unwrap().drain(..) {
                session.abort();
            }
        }
    }
}

/// Serve one client connection until EOF or a transport error.
///
/// Per-session state machine: read one line, decode it, process it against
/// the store, respond, repeat. Decode failures are answered with the
/// structured error response and the loop continues; only `read_frame` and
/// write failures end the session.
async fn handle_session(stream: TcpStream, peer: SocketAddr, store: RegisterStore) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let line = match read_frame(&mut reader).await? {
            Some(line) => line,
            None => break, // peer closed the connection
        };

        let response = match decode_request(&line) {
            Ok(request) => process_request(&store, request),
            Err(e) => {
                debug!("Protocol error from {}: {:?}", peer, e);
                e.to_response()
            }
        };

        let encoded = encode_line(&response)?;
        timeout(RESPONSE_WRITE_TIMEOUT, write_half.write_all(encoded.as_bytes()))
            .await
            .map_err(|_| anyhow!("response write to {} timed out", peer))??;
    }

    Ok(())
}

/// Execute one decoded request against the register store.
///
/// Unknown register ids are protocol errors, answered in-band; a write
/// echoes the stored (clamped) value.
pub fn process_request(store: &RegisterStore, request: Request) -> Response {
    match request {
        Request::Read { register } => match store.get(&register) {
            Some(value) => Response::read_ok(register, value),
            None => Response::register_not_found(&register),
        },
        Request::ReadMultiple { registers } => {
            let (values, missing) = store.get_many(&registers);
            Response::multi(values, missing)
        }
        Request::Write { register, value } => match store.set(&register, value) {
            Some(stored) => Response::write_ok(register, stored),
            None => Response::register_not_found(&register),
        },
    }
}

/// Background simulation loop.
///
/// Ticks at the configured period for the server's entire lifetime,
/// regardless of connection count (including zero). Each tick perturbs all
/// registers around their base values; see
/// [`RegisterStore::simulate_tick`].
pub async fn run_simulation_loop(
    store: RegisterStore,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut rng = NoiseGenerator::new_from_system_time();
    let started = Instant::now();
    let mut ticker = interval(tick_interval);
    info!(
        "Simulation loop started, tick interval {} ms",
        tick_interval.as_millis()
    );

    while running.load(Ordering::SeqCst) {
        ticker.tick().await;
        store.simulate_tick(started.elapsed().as_secs_f64(), &mut rng);
    }

    info!("Simulation loop stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::register_ids;

    #[test]
    fn read_request_returns_the_current_value() {
        let store = RegisterStore::new();
        store.set("D20", 42.0);

        let response = process_request(
            &store,
            Request::Read {
                register: "D20".to_string(),
            },
        );
        assert_eq!(response, Response::read_ok("D20", 42.0));
    }

    #[test]
    fn read_unknown_register_is_an_error() {
        let store = RegisterStore::new();
        let response = process_request(
            &store,
            Request::Read {
                register: "D99".to_string(),
            },
        );
        assert_eq!(response, Response::error("Register D99 not found"));
    }

    #[test]
    fn write_then_read_roundtrips_exactly() {
        let store = RegisterStore::new();

        let write = process_request(
            &store,
            Request::Write {
                register: "D20".to_string(),
                value: 42.0,
            },
        );
        assert_eq!(write, Response::write_ok("D20", 42.0));

        let read = process_request(
            &store,
            Request::Read {
                register: "D20".to_string(),
            },
        );
        assert_eq!(read, Response::read_ok("D20", 42.0));
    }

    #[test]
    fn read_multiple_with_unknown_id_is_partial() {
        let store = RegisterStore::new();
        let response = process_request(
            &store,
            Request::ReadMultiple {
                registers: vec!["D20".to_string(), "D99".to_string()],
            },
        );

        match response {
            Response::Values {
                status,
                values,
                errors,
            } => {
                assert_eq!(status, "partial");
                assert!(values.contains_key("D20"));
                assert_eq!(values.len(), 1);
                assert_eq!(errors.unwrap(), vec!["Register D99 not found"]);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn read_multiple_full_table_is_ok() {
        let store = RegisterStore::new();
        let response = process_request(
            &store,
            Request::ReadMultiple {
                registers: register_ids(),
            },
        );

        match response {
            Response::Values {
                status,
                values,
                errors,
            } => {
                assert_eq!(status, "ok");
                assert_eq!(values.len(), register_ids().len());
                assert!(errors.is_none());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }
}

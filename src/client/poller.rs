// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Polling loop and subscriber events
//!
//! The poller issues a full-table batched read once per interval and
//! delivers each snapshot to a single subscriber through a bounded channel.
//! Delivery is decoupled from any UI toolkit: the subscriber is whoever
//! holds the [`SensorEvent`] receiver.
//!
//! Failure policy: starting the poller requires a successful initial
//! connect; after that, a poll round that yields no data disconnects the
//! client, waits the configured reconnect delay, and attempts exactly one
//! reconnect. If that fails the client stays disconnected until the next
//! tick, which retries the connect before polling. Polling itself is never
//! cancelled by a failed round.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};

use crate::config::PollingConfig;
use crate::registers::register_ids;

use super::{ClientError, SensorClient};

/// Capacity of the subscriber event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// One delivered batch of register values.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterSnapshot {
    /// Register id to most recent value, one entry per known register.
    pub values: BTreeMap<String, f64>,
    /// When the poll response was received.
    pub received_at: DateTime<Utc>,
}

/// Events delivered to the poller's subscriber.
///
/// Connection-status changes and received data are the only externally
/// observable signals; raw transport errors are additionally surfaced as
/// [`SensorEvent::Error`] so an embedding UI can choose to display them.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// One successful poll cycle's values.
    DataReceived(RegisterSnapshot),
    /// The client connected (`true`) or lost its connection (`false`).
    ConnectionChanged(bool),
    /// A transport or protocol failure, already handled by the poller.
    Error(String),
}

/// Interval-driven polling client.
///
/// Owns the [`SensorClient`] behind an async mutex so one-shot operations
/// (e.g. a write from a settings screen) can share the connection with the
/// running poll loop; the mutex serializes them with poll cycles.
pub struct SensorPoller {
    config: PollingConfig,
    client: Arc<Mutex<SensorClient>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SensorPoller {
    pub fn new(config: PollingConfig) -> Self {
        let client = SensorClient::new(config.clone());
        Self {
            config,
            client: Arc::new(Mutex::new(client)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Shared handle to the underlying client, for one-shot operations.
    pub fn client(&self) -> Arc<Mutex<SensorClient>> {
        self.client.clone()
    }

    /// True while the poll loop is active.
    pub fn is_polling(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Connect and start the poll loop, handing back the subscriber's
    /// event receiver.
    ///
    /// Connects first if needed; when that initial connect fails the error
    /// is returned and polling does not start. Once started, rounds that
    /// fail later degrade to one reconnect attempt per tick, so a simulator
    /// that goes away and comes back is picked up without intervention.
    pub async fn start_polling(&mut self) -> Result<mpsc::Receiver<SensorEvent>, ClientError> {
        if let Some(stale) = self.handle.take() {
            warn!("Poller restarted while already running");
            stale.abort();
        }

        self.client.lock().await.connect().await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        // The channel is empty, the subscriber learns the link is up first
        let _ = tx.try_send(SensorEvent::ConnectionChanged(true));
        self.running.store(true, Ordering::SeqCst);

        let client = self.client.clone();
        let running = self.running.clone();
        let config = self.config.clone();
        self.handle = Some(tokio::spawn(async move {
            poll_loop(client, config, running, tx).await;
        }));

        info!(
            "Started polling with interval {} ms",
            self.config.poll_interval_ms
        );
        Ok(rx)
    }

    /// Halt the interval loop. Does not disconnect; the connection stays
    /// available for one-shot operations through [`Self::client`].
    pub async fn stop_polling(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            // The loop notices the flag at its next tick; don't wait longer
            // than one interval for it.
            let grace = self.config.poll_interval() + Duration::from_millis(100);
            if timeout(grace, handle).await.is_err() {
                warn!("Poll loop did not stop in time");
            }
        }
        info!("Stopped polling");
    }

    /// Stop polling and close the connection.
    pub async fn disconnect(&mut self) {
        self.stop_polling().await;
        self.client.lock().await.disconnect();
    }
}

async fn poll_loop(
    client: Arc<Mutex<SensorClient>>,
    config: PollingConfig,
    running: Arc<AtomicBool>,
    tx: mpsc::Sender<SensorEvent>,
) {
    let ids = register_ids();
    let mut ticker = interval(config.poll_interval());
    // A missed tick (slow subscriber, long timeout) must not cause a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while running.load(Ordering::SeqCst) {
        ticker.tick().await;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        poll_once(&client, &ids, &config, &tx).await;
    }

    debug!("Poll loop exited");
}

/// One poll cycle: (re)connect if needed, batch-read the full table,
/// deliver, and on failure run the disconnect/delay/single-reconnect policy.
///
/// The client mutex is released before the reconnect delay so one-shot
/// operations through [`SensorPoller::client`] never stall behind a failed
/// round.
async fn poll_once(
    client: &Arc<Mutex<SensorClient>>,
    ids: &[String],
    config: &PollingConfig,
    tx: &mpsc::Sender<SensorEvent>,
) {
    let failure = {
        let mut client = client.lock().await;

        if !client.is_connected() {
            match client.connect().await {
                Ok(()) => dispatch(tx, config, SensorEvent::ConnectionChanged(true)).await,
                Err(e) => {
                    debug!("Connect attempt failed: {}", e);
                    dispatch(tx, config, SensorEvent::Error(format!("Connection failed: {}", e)))
                        .await;
                    return;
                }
            }
        }

        match client.read_multiple(ids).await {
            Ok(values) if !values.is_empty() => {
                let snapshot = RegisterSnapshot {
                    values,
                    received_at: Utc::now(),
                };
                dispatch(tx, config, SensorEvent::DataReceived(snapshot)).await;
                return;
            }
            Ok(_) => {
                client.disconnect();
                None
            }
            Err(e) => {
                // Transport errors already disconnected the client inside
                // send_request; server-side errors leave it connected
                client.disconnect();
                Some(e)
            }
        }
    };

    if let Some(e) = failure {
        dispatch(tx, config, SensorEvent::Error(e.to_string())).await;
    }
    warn!("Polling failed, attempting to reconnect");
    dispatch(tx, config, SensorEvent::ConnectionChanged(false)).await;

    // Brief delay, then a single reconnect attempt; if it fails the next
    // tick retries. No lock is held while waiting.
    sleep(config.reconnect_delay()).await;
    match client.lock().await.connect().await {
        Ok(()) => dispatch(tx, config, SensorEvent::ConnectionChanged(true)).await,
        Err(e) => {
            dispatch(
                tx,
                config,
                SensorEvent::Error(format!("Reconnect failed: {}", e)),
            )
            .await
        }
    }
}

/// Hand one event to the subscriber, bounded by the dispatch timeout.
///
/// The subscriber must never be able to wedge the poll loop: if the channel
/// stays full past the timeout the event is dropped with a warning, and a
/// closed channel (subscriber gone) is only logged.
async fn dispatch(tx: &mpsc::Sender<SensorEvent>, config: &PollingConfig, event: SensorEvent) {
    match timeout(config.dispatch_timeout(), tx.send(event)).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => debug!("Subscriber is gone, event discarded"),
        Err(_) => warn!("Subscriber backlogged, event dropped"),
    }
}

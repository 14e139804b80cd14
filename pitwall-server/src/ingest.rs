//! Ingest loop
//!
//! One task owns the [`SessionAggregator`] and serially handles:
//! - datagrams from the UDP socket (or an in-process feed)
//! - the tick that checks liveness and publishes a snapshot
//! - control messages such as identity updates
//! - shutdown

use crate::aggregator::{IngestError, SessionAggregator};
use crate::emitter::LapEmitter;
use crate::state::AppState;
use chrono::Utc;
use pitwall_core::Identity;
use pitwall_decoder::{DecodeError, DemoFeed};
use serde::Deserialize;
use std::future::Future;
use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Largest datagram accepted; every known packet is smaller
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Rate of the demo feed
const DEMO_INTERVAL: Duration = Duration::from_millis(50);

/// Partial identity update; missing fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUpdate {
    pub driver_name: Option<String>,
    pub session_id: Option<String>,
}

impl IdentityUpdate {
    pub fn is_empty(&self) -> bool {
        self.driver_name.is_none() && self.session_id.is_none()
    }

    pub fn apply_to(self, current: &Identity) -> Identity {
        Identity {
            driver_name: self
                .driver_name
                .unwrap_or_else(|| current.driver_name.clone()),
            session_id: self.session_id.unwrap_or_else(|| current.session_id.clone()),
        }
    }
}

/// Messages from the rest of the process into the ingest loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestControl {
    SetIdentity(IdentityUpdate),
}

/// Where datagrams come from
pub enum DatagramSource {
    Udp(UdpSocket),
    /// Datagrams pushed by another task (demo feed, tests)
    Channel(mpsc::Receiver<Vec<u8>>),
}

impl DatagramSource {
    pub async fn bind(addr: std::net::SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening for telemetry on udp://{}", socket.local_addr()?);
        Ok(Self::Udp(socket))
    }

    /// Next datagram copied into `buf`; `None` once the source is closed
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self {
            Self::Udp(socket) => socket.recv_from(buf).await.map(|(len, _)| Some(len)),
            Self::Channel(rx) => Ok(rx.recv().await.map(|datagram| {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                len
            })),
        }
    }
}

/// Drive a [`DemoFeed`] in real time into `tx` until cancelled
pub fn spawn_demo_feed(
    tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("Demo feed started");
        let mut feed = DemoFeed::new();
        let mut interval = tokio::time::interval(DEMO_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        'feed: loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    for datagram in feed.step(DEMO_INTERVAL.as_secs_f32()) {
                        if tx.send(datagram).await.is_err() {
                            break 'feed;
                        }
                    }
                }
            }
        }
        info!("Demo feed stopped");
    })
}

/// Cancel `cancel` once `signal` (e.g. Ctrl-C) fires. If the signal cannot
/// be listened for, the error is logged and nothing is cancelled.
pub async fn cancel_on_signal<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown requested");
            cancel.cancel();
        }
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

/// Run the ingest loop until `cancel` fires or the source closes.
///
/// Returns the aggregator so the caller can inspect the final state. The
/// emitter is dropped on return, which lets the persistence worker finish.
pub async fn run(
    mut source: DatagramSource,
    mut aggregator: SessionAggregator,
    emitter: LapEmitter,
    state: AppState,
    mut control_rx: mpsc::Receiver<IngestControl>,
    tick: Duration,
    cancel: CancellationToken,
) -> SessionAggregator {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Ingest loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Ingest loop cancelled");
                break;
            }
            received = source.recv(&mut buf) => match received {
                Ok(Some(len)) => handle_datagram(&mut aggregator, &emitter, &state, &buf[..len]),
                Ok(None) => {
                    info!("Datagram source closed");
                    break;
                }
                Err(e) => warn!("Error receiving datagram: {}", e),
            },
            _ = ticker.tick() => {
                let was_connected = aggregator.state().connected;
                if !aggregator.check_liveness(Utc::now()) && was_connected {
                    warn!("Telemetry connection lost");
                }
                state.publish(aggregator.snapshot()).await;
            }
            Some(control) = control_rx.recv() => match control {
                IngestControl::SetIdentity(update) => {
                    let identity = update.apply_to(aggregator.identity());
                    aggregator.set_identity(identity);
                }
            },
        }
    }

    state.publish(aggregator.snapshot()).await;
    aggregator
}

fn handle_datagram(
    aggregator: &mut SessionAggregator,
    emitter: &LapEmitter,
    state: &AppState,
    datagram: &[u8],
) {
    let stats = &state.stats;
    stats.datagrams.fetch_add(1, Ordering::Relaxed);

    match aggregator.ingest(datagram, Utc::now()) {
        Ok(completed) => {
            stats.decoded.fetch_add(1, Ordering::Relaxed);
            if let Some(record) = completed {
                stats.laps_completed.fetch_add(1, Ordering::Relaxed);
                emitter.emit(record);
            }
        }
        Err(IngestError::Decode(e @ DecodeError::UnknownPacketKind { .. })) => {
            stats.unknown_kind.fetch_add(1, Ordering::Relaxed);
            trace!("Dropping datagram: {}", e);
        }
        Err(IngestError::Decode(e @ DecodeError::TooShort { .. })) => {
            stats.too_short.fetch_add(1, Ordering::Relaxed);
            debug!("Dropping datagram: {}", e);
        }
        Err(IngestError::Decode(e @ DecodeError::TruncatedRecord { .. })) => {
            stats.truncated.fetch_add(1, Ordering::Relaxed);
            debug!("Dropping datagram: {}", e);
        }
        Err(e @ IngestError::StaleLapData { .. }) => {
            stats.decoded.fetch_add(1, Ordering::Relaxed);
            stats.stale_lap_data.fetch_add(1, Ordering::Relaxed);
            debug!("Dropping datagram: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_update_merges() {
        let current = Identity {
            driver_name: "Oscar".to_string(),
            session_id: "S1".to_string(),
        };
        let update = IdentityUpdate {
            driver_name: None,
            session_id: Some("S2".to_string()),
        };
        assert_eq!(
            update.apply_to(&current),
            Identity {
                driver_name: "Oscar".to_string(),
                session_id: "S2".to_string(),
            }
        );
        assert!(IdentityUpdate::default().is_empty());
    }

    #[tokio::test]
    async fn test_signal_error_does_not_cancel() {
        let cancel = CancellationToken::new();
        cancel_on_signal(
            async { Err(io::Error::new(io::ErrorKind::Unsupported, "no signals")) },
            cancel.clone(),
        )
        .await;
        assert!(!cancel.is_cancelled());

        cancel_on_signal(async { Ok(()) }, cancel.clone()).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_channel_source_copies_datagram() {
        let (tx, rx) = mpsc::channel(1);
        let mut source = DatagramSource::Channel(rx);
        tx.send(vec![1, 2, 3]).await.unwrap();
        drop(tx);

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        assert_eq!(source.recv(&mut buf).await.unwrap(), Some(3));
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(source.recv(&mut buf).await.unwrap(), None);
    }
}

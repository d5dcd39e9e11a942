//! Liveness prober.
//!
//! Runs on its own interval task, separate from input handling. Each tick
//! broadcasts `ping {t}` with the server's wall-clock time; clients echo it
//! back as `pong {t}` whenever they like and [`Prober::on_pong`] turns the
//! echo into a latency sample for the registered player.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::connection::{ConnectionId, PlayerRegistry};
use crate::hub::{BroadcastReport, Hub};
use crate::messaging::{Frame, LatencySample, Probe};
use crate::shutdown::ShutdownState;

/// Milliseconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Periodic probe broadcaster and pong handler.
#[derive(Debug)]
pub struct Prober {
    registry: Arc<PlayerRegistry>,
    hub: Arc<Hub>,
    interval: Duration,
    samples: broadcast::Sender<LatencySample>,
}

impl Prober {
    pub fn new(registry: Arc<PlayerRegistry>, hub: Arc<Hub>, interval: Duration) -> Self {
        let (samples, _) = broadcast::channel(256);
        Self {
            registry,
            hub,
            interval,
            samples,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Receives every latency sample reported after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LatencySample> {
        self.samples.subscribe()
    }

    /// Broadcasts one probe stamped with the current time.
    pub fn probe_once(&self) -> (Probe, BroadcastReport) {
        let probe = Probe {
            t: current_timestamp(),
        };
        (probe, self.probe_with(probe))
    }

    pub fn probe_with(&self, probe: Probe) -> BroadcastReport {
        self.hub.broadcast(&Frame::probe(probe))
    }

    /// Handles a `pong` received now.
    pub fn on_pong(&self, connection: &ConnectionId, probe: Probe) -> Option<LatencySample> {
        self.on_pong_at(connection, probe, current_timestamp())
    }

    /// Handles a `pong` received at `received_at` (epoch ms).
    ///
    /// Replies from unregistered connections are discarded. Stale probes are
    /// accepted; an echo from the future counts as zero latency.
    pub fn on_pong_at(
        &self,
        connection: &ConnectionId,
        probe: Probe,
        received_at: u64,
    ) -> Option<LatencySample> {
        let Some(player) = self.registry.lookup(connection) else {
            trace!("Ignoring pong from unregistered connection {}", connection);
            return None;
        };

        let sample = LatencySample {
            connection: connection.clone(),
            player,
            latency_ms: received_at.saturating_sub(probe.t),
        };
        info!("PLAYER_PING: {} {}ms", sample.player, sample.latency_ms);
        // no observers is fine
        let _ = self.samples.send(sample.clone());
        Some(sample)
    }

    /// Spawns the probe loop. The first probe goes out one interval after the
    /// call; the loop ends once shutdown is initiated.
    pub fn spawn(self: Arc<Self>, shutdown: ShutdownState) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("Prober started with {:?} interval", self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.wait() => break,
                }
                if shutdown.is_shutdown_initiated() {
                    break;
                }
                let (probe, report) = self.probe_once();
                trace!(
                    "Probe t={} sent to {} connections ({} skipped)",
                    probe.t,
                    report.delivered,
                    report.dropped
                );
            }

            debug!("Prober stopped");
        })
    }
}

//! Periodic telemetry sweep.
//!
//! Every period, serialize the current value of every instance of every
//! sensor kind and hand it to the outbound publish capability. The sweep
//! acquires the store guard once PER INSTANCE, copies the instance out,
//! and releases before serializing: worst-case guard hold time is one
//! `memcpy`, so a slow sweep can never starve the sensor writers. The price
//! is that the sweep is not an atomic snapshot across instances, which is
//! acceptable for best-effort monitoring data.
//!
//! Telemetry is explicitly lossy: a failed serialize skips the instance, a
//! full outbound buffer drops the message, and the sweep always finishes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

use hand::config::TelemetryConfig;
use hand::sensor::{
    ImuEstimate, ImuSample, PotentiometerSample, SensorKind, ServoStatus, StrainGaugeSample,
};

use crate::store::{StateRecord, StateStore};

// ─── Outbound Capability ────────────────────────────────────────────

/// Identifier assigned to an accepted outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

/// Delivery options forwarded to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// QoS level (0..=2).
    pub qos: u8,
    /// Broker retain flag.
    pub retain: bool,
    /// Backend-side persistence hint.
    pub store: bool,
}

/// Outbound enqueue failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutboundError {
    /// Transport buffer is full; the message was dropped.
    #[error("outbound buffer full")]
    Full,

    /// Transport side has gone away.
    #[error("outbound channel closed")]
    Closed,
}

/// Non-blocking enqueue into an outbound transport buffer.
///
/// Implementations must return within a bounded, short duration; the
/// telemetry task calls this once per instance per sweep and must never
/// block on network I/O.
pub trait Outbound: Send + Sync {
    fn enqueue(
        &self,
        topic: &str,
        payload: &[u8],
        options: PublishOptions,
    ) -> Result<MessageId, OutboundError>;
}

// ─── Publisher ──────────────────────────────────────────────────────

/// Counters for one telemetry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Messages accepted by the outbound buffer.
    pub published: usize,
    /// Instances skipped because serialization failed.
    pub skipped: usize,
    /// Messages dropped because the outbound buffer refused them.
    pub dropped: usize,
}

/// Periodic task draining the state store into the outbound capability.
pub struct TelemetryPublisher {
    store: Arc<StateStore>,
    outbound: Arc<dyn Outbound>,
    config: TelemetryConfig,
}

impl TelemetryPublisher {
    pub fn new(
        store: Arc<StateStore>,
        outbound: Arc<dyn Outbound>,
        config: TelemetryConfig,
    ) -> Self {
        Self {
            store,
            outbound,
            config,
        }
    }

    /// Run sweeps at the configured period while `running` stays set.
    pub fn run(&self, running: &AtomicBool) {
        let period = Duration::from_millis(self.config.period_ms);
        while running.load(Ordering::Relaxed) {
            let stats = self.sweep_once();
            trace!(
                published = stats.published,
                skipped = stats.skipped,
                dropped = stats.dropped,
                "telemetry sweep complete"
            );
            std::thread::sleep(period);
        }
        debug!("telemetry publisher stopped");
    }

    /// One pass over every instance of every kind.
    pub fn sweep_once(&self) -> SweepStats {
        let mut stats = SweepStats::default();
        for kind in SensorKind::ALL {
            match kind {
                SensorKind::ImuRaw => self.sweep_kind::<ImuSample>(&mut stats),
                SensorKind::ImuFused => self.sweep_kind::<ImuEstimate>(&mut stats),
                SensorKind::Potentiometer => {
                    self.sweep_kind::<PotentiometerSample>(&mut stats)
                }
                SensorKind::StrainGauge => self.sweep_kind::<StrainGaugeSample>(&mut stats),
                SensorKind::Servo => self.sweep_kind::<ServoStatus>(&mut stats),
            }
        }
        stats
    }

    fn sweep_kind<T: StateRecord>(&self, stats: &mut SweepStats) {
        let topic = self.config.topics.for_kind(T::KIND);
        let options = PublishOptions {
            qos: self.config.qos,
            retain: self.config.retain,
            store: self.config.persist,
        };

        let count = self.store.with_lock(|h| h.count::<T>());
        for index in 0..count {
            // Copy out under the guard, serialize after release. Re-check
            // the count inside the guard: a concurrent re-init may have
            // shrunk the kind since the sweep started.
            let instance = self.store.with_lock(|h| {
                if index < h.count::<T>() {
                    h.copy_out::<T>(index).ok()
                } else {
                    None
                }
            });
            let Some(instance) = instance else {
                break;
            };

            let payload = match serde_json::to_vec(&instance) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(kind = T::KIND.as_str(), index, error = %e, "serialize failed, instance skipped");
                    stats.skipped += 1;
                    continue;
                }
            };

            match self.outbound.enqueue(topic, &payload, options) {
                Ok(_) => stats.published += 1,
                Err(e) => {
                    debug!(kind = T::KIND.as_str(), index, error = %e, "publish dropped");
                    stats.dropped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hand::config::StoreLayout;
    use std::sync::Mutex;

    /// Capturing outbound stub; optionally refuses everything.
    #[derive(Default)]
    struct CapturingOutbound {
        messages: Mutex<Vec<(String, Vec<u8>, PublishOptions)>>,
        refuse: bool,
    }

    impl Outbound for CapturingOutbound {
        fn enqueue(
            &self,
            topic: &str,
            payload: &[u8],
            options: PublishOptions,
        ) -> Result<MessageId, OutboundError> {
            if self.refuse {
                return Err(OutboundError::Full);
            }
            let mut messages = self.messages.lock().unwrap();
            messages.push((topic.to_string(), payload.to_vec(), options));
            Ok(MessageId(messages.len() as u64))
        }
    }

    fn publisher_with(
        layout: StoreLayout,
        outbound: Arc<CapturingOutbound>,
    ) -> (Arc<StateStore>, TelemetryPublisher) {
        let store = Arc::new(StateStore::new());
        store.init(&layout);
        let publisher =
            TelemetryPublisher::new(store.clone(), outbound, TelemetryConfig::default());
        (store, publisher)
    }

    fn pots_only(n: usize) -> StoreLayout {
        StoreLayout {
            imu_raw: 0,
            imu_fused: 0,
            potentiometer: n,
            strain_gauge: 0,
            servo: 0,
        }
    }

    #[test]
    fn sweep_publishes_one_message_per_instance() {
        let outbound = Arc::new(CapturingOutbound::default());
        let (store, publisher) = publisher_with(pots_only(3), outbound.clone());

        store.with_lock(|h| {
            for (idx, angle) in [10u16, 20, 30].into_iter().enumerate() {
                h.get_mut::<PotentiometerSample>(idx).unwrap().angle_deg = angle;
            }
        });

        let stats = publisher.sweep_once();
        assert_eq!(stats.published, 3);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.dropped, 0);

        let messages = outbound.messages.lock().unwrap();
        assert_eq!(messages.len(), 3);
        for (idx, angle) in [10u16, 20, 30].into_iter().enumerate() {
            let (topic, payload, options) = &messages[idx];
            assert_eq!(topic, "hand/monitoring/potentiometer");
            assert_eq!(options.qos, 1);
            let sample: PotentiometerSample = serde_json::from_slice(payload).unwrap();
            assert_eq!(sample.angle_deg, angle);
        }
    }

    #[test]
    fn sweep_covers_every_kind() {
        let outbound = Arc::new(CapturingOutbound::default());
        let layout = StoreLayout {
            imu_raw: 1,
            imu_fused: 1,
            potentiometer: 2,
            strain_gauge: 1,
            servo: 2,
        };
        let (_store, publisher) = publisher_with(layout, outbound.clone());

        let stats = publisher.sweep_once();
        assert_eq!(stats.published, layout.total());

        let messages = outbound.messages.lock().unwrap();
        let servo_msgs = messages
            .iter()
            .filter(|(t, _, _)| t == "hand/monitoring/servo")
            .count();
        assert_eq!(servo_msgs, 2);
    }

    #[test]
    fn refused_enqueue_is_counted_not_fatal() {
        let outbound = Arc::new(CapturingOutbound {
            refuse: true,
            ..Default::default()
        });
        let (_store, publisher) = publisher_with(pots_only(3), outbound);

        let stats = publisher.sweep_once();
        assert_eq!(stats.published, 0);
        assert_eq!(stats.dropped, 3);
    }

    #[test]
    fn empty_store_sweeps_cleanly() {
        let outbound = Arc::new(CapturingOutbound::default());
        let store = Arc::new(StateStore::new());
        let publisher = TelemetryPublisher::new(
            store,
            outbound,
            TelemetryConfig::default(),
        );
        assert_eq!(publisher.sweep_once(), SweepStats::default());
    }
}

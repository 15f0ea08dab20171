//! Inbound message routing and decode.
//!
//! Each control topic maps to exactly one command variant; the payload is
//! decoded with that variant's schema and the result is pushed onto the
//! command queue. Decode failures are a boundary concern: they are logged
//! and dropped, and the queue never holds partially-decoded data. A remote
//! operator sees nothing on a bad payload except a missing actuator motion.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use hand::command::{
    Command, GoToAngle, HoldGesture, Lock, MoveToPressure, SmoothMove, Unlock,
};
use hand_core::telemetry::{Outbound, PublishOptions};
use hand_core::{CommandQueue, QueueError};

/// Topic suffix for each inbound route, relative to the control prefix.
const TOPIC_GO_TO_ANGLE: &str = "hand/control/go_to_angle";
const TOPIC_LOCK: &str = "hand/control/lock";
const TOPIC_UNLOCK: &str = "hand/control/unlock";
const TOPIC_SMOOTH_MOVE: &str = "hand/control/smooth_move";
const TOPIC_MOVE_TO_PRESSURE: &str = "hand/control/move_to_pressure";
const TOPIC_HOLD_GESTURE: &str = "hand/control/hold_gesture";
const TOPIC_PING: &str = "hand/monitoring/ping";
const TOPIC_PONG: &str = "hand/monitoring/pong";

/// One inbound route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRoute {
    GoToAngle,
    Lock,
    Unlock,
    SmoothMove,
    MoveToPressure,
    HoldGesture,
    /// Liveness probe, answered immediately with a pong publish.
    Ping,
}

impl CommandRoute {
    /// Resolve a topic to its route. `None` for unknown topics.
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic {
            TOPIC_GO_TO_ANGLE => Some(Self::GoToAngle),
            TOPIC_LOCK => Some(Self::Lock),
            TOPIC_UNLOCK => Some(Self::Unlock),
            TOPIC_SMOOTH_MOVE => Some(Self::SmoothMove),
            TOPIC_MOVE_TO_PRESSURE => Some(Self::MoveToPressure),
            TOPIC_HOLD_GESTURE => Some(Self::HoldGesture),
            TOPIC_PING => Some(Self::Ping),
            _ => None,
        }
    }

    /// All command-carrying topics, for the session layer's subscribe list.
    pub const SUBSCRIBE_TOPICS: [&'static str; 7] = [
        TOPIC_GO_TO_ANGLE,
        TOPIC_LOCK,
        TOPIC_UNLOCK,
        TOPIC_SMOOTH_MOVE,
        TOPIC_MOVE_TO_PRESSURE,
        TOPIC_HOLD_GESTURE,
        TOPIC_PING,
    ];
}

/// Decode failures. Absorbed at the boundary, never propagated inward.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Topic has no route.
    #[error("no route for topic '{0}'")]
    UnknownTopic(String),

    /// Payload did not match the variant schema.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode a payload according to its route.
///
/// `Ping` carries no command; callers handle it before decoding.
pub fn decode(route: CommandRoute, payload: &[u8]) -> Result<Command, DecodeError> {
    let command = match route {
        CommandRoute::GoToAngle => {
            Command::GoToAngle(serde_json::from_slice::<GoToAngle>(payload)?)
        }
        CommandRoute::Lock => Command::Lock(serde_json::from_slice::<Lock>(payload)?),
        CommandRoute::Unlock => Command::Unlock(serde_json::from_slice::<Unlock>(payload)?),
        CommandRoute::SmoothMove => {
            Command::SmoothMove(serde_json::from_slice::<SmoothMove>(payload)?)
        }
        CommandRoute::MoveToPressure => {
            Command::MoveToPressure(serde_json::from_slice::<MoveToPressure>(payload)?)
        }
        CommandRoute::HoldGesture => {
            Command::HoldGesture(serde_json::from_slice::<HoldGesture>(payload)?)
        }
        CommandRoute::Ping => {
            unreachable!("ping is handled before decode")
        }
    };
    Ok(command)
}

/// Running counters for ingress traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngressStats {
    /// Commands decoded and queued.
    pub queued: usize,
    /// Messages dropped: unknown topic, malformed payload, or full queue.
    pub dropped: usize,
    /// Pings answered.
    pub pings: usize,
}

/// Inbound boundary component: routes, decodes, enqueues.
pub struct CommandIngress {
    queue: Arc<CommandQueue>,
    outbound: Arc<dyn Outbound>,
    pong_options: PublishOptions,
}

impl CommandIngress {
    pub fn new(queue: Arc<CommandQueue>, outbound: Arc<dyn Outbound>, qos: u8) -> Self {
        Self {
            queue,
            outbound,
            pong_options: PublishOptions {
                qos,
                retain: false,
                store: false,
            },
        }
    }

    /// Handle one inbound message. Never fails outward; returns `true`
    /// when a command was queued.
    pub fn ingest(&self, topic: &str, payload: &[u8], stats: &mut IngressStats) -> bool {
        if topic.is_empty() {
            warn!("inbound message with empty topic");
            stats.dropped += 1;
            return false;
        }

        let Some(route) = CommandRoute::from_topic(topic) else {
            debug!(topic, "no route for inbound topic");
            stats.dropped += 1;
            return false;
        };

        if route == CommandRoute::Ping {
            if let Err(e) = self.outbound.enqueue(TOPIC_PONG, &[], self.pong_options) {
                debug!(error = %e, "pong dropped");
            }
            stats.pings += 1;
            return false;
        }

        let command = match decode(route, payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(topic, error = %e, "inbound payload rejected");
                stats.dropped += 1;
                return false;
            }
        };

        match self.queue.push(command) {
            Ok(()) => {
                debug!(topic, kind = command.kind().as_str(), "command queued");
                stats.queued += 1;
                true
            }
            Err(QueueError::Exhausted) => {
                warn!(
                    topic,
                    kind = command.kind().as_str(),
                    "command queue full, command dropped"
                );
                stats.dropped += 1;
                false
            }
            Err(e) => {
                warn!(topic, error = %e, "unexpected queue error");
                stats.dropped += 1;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hand_core::telemetry::{MessageId, OutboundError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingOutbound {
        topics: Mutex<Vec<String>>,
    }

    impl Outbound for CapturingOutbound {
        fn enqueue(
            &self,
            topic: &str,
            _payload: &[u8],
            _options: PublishOptions,
        ) -> Result<MessageId, OutboundError> {
            let mut topics = self.topics.lock().unwrap();
            topics.push(topic.to_string());
            Ok(MessageId(topics.len() as u64))
        }
    }

    fn ingress() -> (Arc<CommandQueue>, Arc<CapturingOutbound>, CommandIngress) {
        let queue = Arc::new(CommandQueue::new());
        let outbound = Arc::new(CapturingOutbound::default());
        let ingress = CommandIngress::new(queue.clone(), outbound.clone(), 1);
        (queue, outbound, ingress)
    }

    #[test]
    fn valid_command_reaches_queue() {
        let (queue, _outbound, ingress) = ingress();
        let mut stats = IngressStats::default();

        let queued = ingress.ingest(
            "hand/control/go_to_angle",
            br#"{"servo": 4, "angle_deg": 120}"#,
            &mut stats,
        );
        assert!(queued);
        assert_eq!(stats.queued, 1);

        let cmd = queue.pop().unwrap();
        let payload = cmd.as_go_to_angle().unwrap();
        assert_eq!(payload.servo, 4);
        assert_eq!(payload.angle_deg, 120);
    }

    #[test]
    fn malformed_payload_never_reaches_queue() {
        let (queue, _outbound, ingress) = ingress();
        let mut stats = IngressStats::default();

        assert!(!ingress.ingest("hand/control/go_to_angle", b"{not json", &mut stats));
        assert!(!ingress.ingest(
            "hand/control/go_to_angle",
            br#"{"servo": "left"}"#,
            &mut stats
        ));
        assert_eq!(stats.dropped, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn unknown_and_empty_topics_dropped() {
        let (queue, _outbound, ingress) = ingress();
        let mut stats = IngressStats::default();

        assert!(!ingress.ingest("hand/control/self_destruct", b"{}", &mut stats));
        assert!(!ingress.ingest("", b"{}", &mut stats));
        assert_eq!(stats.dropped, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn ping_answered_with_pong_and_not_queued() {
        let (queue, outbound, ingress) = ingress();
        let mut stats = IngressStats::default();

        assert!(!ingress.ingest("hand/monitoring/ping", b"", &mut stats));
        assert_eq!(stats.pings, 1);
        assert!(queue.is_empty());
        assert_eq!(
            outbound.topics.lock().unwrap().as_slice(),
            ["hand/monitoring/pong"]
        );
    }

    #[test]
    fn every_command_topic_decodes_its_variant() {
        let cases: [(&str, &[u8]); 6] = [
            ("hand/control/go_to_angle", br#"{"servo":0,"angle_deg":10}"#),
            ("hand/control/lock", br#"{"servo":1}"#),
            ("hand/control/unlock", br#"{"servo":1}"#),
            (
                "hand/control/smooth_move",
                br#"{"servo":2,"angle_deg":90,"duration_ms":500}"#,
            ),
            (
                "hand/control/move_to_pressure",
                br#"{"finger":"Index","pressure_kpa":8.5}"#,
            ),
            (
                "hand/control/hold_gesture",
                br#"{"gesture":3,"hold_ms":1000}"#,
            ),
        ];

        let (queue, _outbound, ingress) = ingress();
        let mut stats = IngressStats::default();
        for (topic, payload) in cases {
            assert!(ingress.ingest(topic, payload, &mut stats), "topic {topic}");
        }
        assert_eq!(stats.queued, 6);
        assert_eq!(queue.len(), 6);
    }
}

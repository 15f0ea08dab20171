//! # Hand Link
//!
//! Boundary glue between the network session layer (external) and the core.
//! Inbound: raw topic + payload bytes are routed to a command decoder and
//! the resulting `Command` is pushed onto the queue; malformed traffic is
//! absorbed here and never reaches the queue. Outbound: a bounded
//! in-memory buffer implements the non-blocking publish capability; the
//! transport drains it on its own thread.
//!
//! The session layer itself (connect/reconnect, subscribe, TLS) is out of
//! scope; it owns the other end of both interfaces.

pub mod ingress;
pub mod outbound;

pub use ingress::{CommandIngress, CommandRoute, DecodeError, IngressStats};
pub use outbound::{OutboundBuffer, OutboundFrame};

//! # Hand Core
//!
//! The concurrent data-exchange substrate of the hand firmware: the typed
//! shared-state store, the actuator command queue, and the periodic
//! telemetry sweep. Producer tasks (sensor polling, network decode) and
//! consumer tasks (control loop, telemetry) share exactly two mutable
//! resources, both defined here; everything else in the process is
//! task-local.
//!
//! # Module Structure
//!
//! - [`guard`] - Spin guard usable from task and interrupt-style contexts
//! - [`store`] - Coarse-locked typed state store, one slot vector per kind
//! - [`queue`] - Bounded FIFO command queue
//! - [`telemetry`] - Periodic per-instance state sweep into an outbound
//!   publish capability
//!
//! # Locking discipline
//!
//! The store uses one guard for all kinds. Hold it only for O(one instance)
//! work: acquire, read or write a single slot, release. Never serialize,
//! log, or touch a channel while holding it.

pub mod guard;
pub mod queue;
pub mod store;
pub mod telemetry;

pub use guard::{SpinGuard, YieldPolicy};
pub use queue::{COMMAND_QUEUE_DEPTH, CommandQueue, QueueError};
pub use store::{StateRecord, StateStore, StoreError, StoreHandle};
pub use telemetry::{
    MessageId, Outbound, OutboundError, PublishOptions, SweepStats, TelemetryPublisher,
};

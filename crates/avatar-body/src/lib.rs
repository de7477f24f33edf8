//! Body orchestration for Avatar.
//!
//! A body turns a configuration document into live devices and drives them
//! through one non-blocking facade:
//!
//! - [`registry`] builds the devices, one ordered collection per capability,
//! - [`actuation`] gives every device a single cancellable action slot,
//! - [`ranging`] runs the trigger/echo measurement loop of range finders,
//! - [`events`] fans samples out to subscribers,
//! - [`body`] is the position-indexed facade ([`CircuitBoard`]),
//! - [`tracker`] thins the distance stream out for persistence.
//!
//! # Architecture
//!
//! ```text
//! Configuration ──► Registry ──► CircuitBoard ──► ActionSlot per device
//!                                     │                 │
//!                                     │           measurement loops
//!                                     ▼                 │
//!                                  EventBus ◄───────────┘
//!                                     │
//!                          subscribers, DistanceTracker
//! ```
//!
//! Facade calls return immediately. Failures at dispatch time come back as
//! `false` or `None`; failures inside running actions are logged with
//! `tracing` and never surface to the caller.

pub mod actuation;
pub mod body;
pub mod error;
pub mod events;
pub mod ranging;
pub mod registry;
pub mod settings;
pub mod tracker;

pub use actuation::ActionSlot;
pub use body::CircuitBoard;
pub use error::{BodyError, Result};
pub use events::{EventBus, Topic};
pub use registry::{BuildReport, Registry, SkipReason};
pub use settings::BodySettings;
pub use tracker::{DistanceTracker, ReadingSink, TrackedParameter, TrackedReading, TracingSink};

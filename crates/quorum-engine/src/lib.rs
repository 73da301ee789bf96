//! # quorum-engine
//!
//! Availability aggregation and best common meeting window selection.
//!
//! Participants mark the half-hour slots they are free within an event's
//! window. The engine counts how many people are free per slot (the heat map)
//! and picks the contiguous block that keeps the most people together for the
//! longest time. Every computation is a pure function over canonical UTC slot
//! instants; local wall-clock pairs only exist at the edges, via the codec.
//!
//! ## Modules
//!
//! - [`slot`]: `SlotInstant`, `LocalSlot`, `EventWindow` and identifiers
//! - [`codec`]: local (day, minutes) ↔ canonical UTC slot conversion
//! - [`dst`]: DST gap policies used by the codec
//! - [`availability`]: availability sets, run-length blocks, source/sink traits
//! - [`heatmap`]: per-slot "how many are free" aggregation
//! - [`scheduler`]: best-window search and scoring
//! - [`error`]: Error types

pub mod availability;
pub mod codec;
pub mod dst;
pub mod error;
pub mod heatmap;
pub mod scheduler;
pub mod slot;

pub use availability::{
    encode_blocks, expand_blocks, AvailabilityBlock, AvailabilitySet, AvailabilitySink,
    AvailabilitySource, InMemoryStore,
};
pub use codec::SlotCodec;
pub use dst::DstPolicy;
pub use error::QuorumError;
pub use heatmap::{aggregate, aggregate_within, HeatCell, HeatMap};
pub use scheduler::{EventBlock, Scheduler, SchedulerConfig};
pub use slot::{
    EventId, EventWindow, LocalSlot, ParticipantId, SlotInstant, MAX_WINDOW_SLOTS, SLOT_MINUTES,
};

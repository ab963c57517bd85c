//! Domain events and their wire representation.
//!
//! This module provides the event types exchanged between services and
//! the machinery to move them across a broker:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    DomainEvent (enum)                     │
//! │  RecordIngested / RecordValidated / RecordProcessed      │
//! └──────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                     codec (wire format)                   │
//! │  flat JSON object + "event_type" discriminator           │
//! │  timestamps as ISO-8601 text                             │
//! └──────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                   EventTypeRegistry                       │
//! │  discriminator → typed decoder, populated at subscribe   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are immutable facts: every constructor assigns the identity and
//! occurrence timestamp once, and no mutating API exists afterwards.

mod codec;
mod events;
mod registry;

pub use codec::{decode, encode, CodecError, TYPE_FIELD};
pub use events::{DomainEvent, RecordIngested, RecordProcessed, RecordValidated};
pub use registry::{DecodeFn, EventDescriptor, EventTypeRegistry};

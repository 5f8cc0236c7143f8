//! Generic, domain-agnostic analytics event bus.
//!
//! Named events carry opaque JSON payloads. Delivery is gated on tracking
//! consent (and optionally a consumer readiness barrier); events published
//! before the gate opens are held in a FIFO queue and flushed, oldest first,
//! the moment delivery becomes possible.
//!
//! Zero knowledge of carts, storefronts, or any domain concept. Consumers
//! provide their own payload shapes that serialize to `serde_json::Value`.

pub mod bus;
pub mod consent;
pub mod types;

pub use bus::{EventBus, RegistrationHandle, SubscriptionHandle};
pub use consent::ConsentGate;
pub use types::{Event, EventCallback};

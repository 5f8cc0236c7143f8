//! EventBus — consent-gated publish/subscribe with a FIFO hold queue.
//!
//! Delivery ordering is guaranteed internally: an event published while the
//! gate is closed waits in the hold queue and is delivered before any event
//! published after it, across all event names. This is the bus's job.

use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;
use uuid::Uuid;

use crate::consent::ConsentGate;
use crate::types::{Event, EventCallback, EVENT_TIMESTAMP_KEY};

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Opaque handle identifying one subscription. Returned by `subscribe`,
/// required by `unsubscribe`. Two subscriptions registered with structurally
/// identical callbacks get distinct handles and are delivered independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: Uuid,
    event_name: String,
}

impl SubscriptionHandle {
    pub fn event_name(&self) -> &str {
        &self.event_name
    }
}

/// Opaque handle identifying one registered consumer in the readiness
/// barrier. Delivery is held until every registered consumer has called
/// `ready` with its handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationHandle {
    id: Uuid,
    name: String,
}

impl RegistrationHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

struct Subscriber {
    id: Uuid,
    callback: EventCallback,
}

struct Consumer {
    name: String,
    ready: bool,
}

#[derive(Default)]
struct BusState {
    subscribers: HashMap<String, Vec<Subscriber>>,
    hold_queue: VecDeque<Event>,
    consumers: HashMap<Uuid, Consumer>,
}

/// Process-wide publish/subscribe registry. Construct one instance at
/// application start and pass it by reference to every component that
/// publishes or subscribes; there is no ambient global.
pub struct EventBus {
    consent: Box<dyn ConsentGate>,
    state: Mutex<BusState>,
}

impl EventBus {
    pub fn new(consent: impl ConsentGate + 'static) -> Self {
        Self {
            consent: Box::new(consent),
            state: Mutex::new(BusState::default()),
        }
    }

    /// Register a callback for one event name.
    ///
    /// Registering the same callback (the same `Arc`) twice for one event is
    /// idempotent and returns the original handle — no duplicate deliveries.
    /// Distinct callbacks subscribe independently even when their bodies are
    /// structurally identical; identity is the `Arc`, never the code.
    pub fn subscribe(
        &self,
        event_name: impl Into<String>,
        callback: EventCallback,
    ) -> SubscriptionHandle {
        let event_name = event_name.into();

        let mut state = self.lock();
        let subs = state.subscribers.entry(event_name.clone()).or_default();
        if let Some(existing) = subs.iter().find(|s| Arc::ptr_eq(&s.callback, &callback)) {
            return SubscriptionHandle {
                id: existing.id,
                event_name,
            };
        }

        let id = Uuid::new_v4();
        subs.push(Subscriber { id, callback });

        SubscriptionHandle { id, event_name }
    }

    /// Remove one subscription. Unknown handles are a no-op.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut state = self.lock();
        if let Some(subs) = state.subscribers.get_mut(&handle.event_name) {
            subs.retain(|s| s.id != handle.id);
        }
    }

    /// Publish a named event.
    ///
    /// The payload gets an `eventTimestamp` (epoch ms) stamped in if the
    /// publisher didn't set one. If the gate is closed — consent denied, or
    /// a registered consumer not yet ready — the event joins the hold queue
    /// and no callback runs. If the gate is open, the hold queue is drained
    /// FIFO first, then this event is delivered.
    pub fn publish(&self, event_name: impl Into<String>, payload: Value) {
        let event = Event {
            name: event_name.into(),
            payload: stamp_timestamp(payload),
            published_at: Utc::now(),
        };

        {
            let mut state = self.lock();
            state.hold_queue.push_back(event);
            if !self.gate_open(&state) {
                return;
            }
        }

        self.flush();
    }

    /// Register a consumer in the readiness barrier. Until every registered
    /// consumer has called [`ready`](Self::ready), publishes are held.
    pub fn register(&self, name: impl Into<String>) -> RegistrationHandle {
        let name = name.into();
        let id = Uuid::new_v4();

        let mut state = self.lock();
        state.consumers.insert(
            id,
            Consumer {
                name: name.clone(),
                ready: false,
            },
        );

        RegistrationHandle { id, name }
    }

    /// Signal that a registered consumer is ready. When the last consumer
    /// reports in (and consent allows), held events flush immediately.
    pub fn ready(&self, handle: &RegistrationHandle) {
        {
            let mut state = self.lock();
            match state.consumers.get_mut(&handle.id) {
                Some(consumer) => consumer.ready = true,
                None => {
                    warn!(consumer = %handle.name, "ready() for unknown registration");
                    return;
                }
            }
        }

        self.flush();
    }

    /// Number of events currently waiting in the hold queue.
    pub fn held_events(&self) -> usize {
        self.lock().hold_queue.len()
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    /// Drain the hold queue while the gate stays open.
    ///
    /// One event is popped per iteration and its subscriber list snapshotted
    /// under the lock; the callbacks run with the lock released, so a
    /// subscriber may synchronously re-enter `publish` or `subscribe`. A
    /// re-entrant publish drains the remaining queue itself, which preserves
    /// global FIFO order; this loop then finds the queue empty.
    fn flush(&self) {
        loop {
            let (event, callbacks) = {
                let mut state = self.lock();
                if !self.gate_open(&state) {
                    return;
                }
                let Some(event) = state.hold_queue.pop_front() else {
                    return;
                };
                let callbacks: Vec<EventCallback> = state
                    .subscribers
                    .get(&event.name)
                    .map(|subs| subs.iter().map(|s| s.callback.clone()).collect())
                    .unwrap_or_default();
                (event, callbacks)
            };

            for callback in callbacks {
                if let Err(e) = callback(&event) {
                    warn!(event = %event.name, error = %e, "subscriber callback failed");
                }
            }
        }
    }

    /// Consent re-evaluated on every call, never cached — it can change
    /// between publishes while queued events await flush.
    fn gate_open(&self, state: &BusState) -> bool {
        self.consent.can_track() && state.consumers.values().all(|c| c.ready)
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        // No lock is held across a callback, so a poisoned state is still
        // structurally sound and delivery can continue.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stamp `eventTimestamp` (epoch milliseconds) into an object payload that
/// doesn't already carry one. Non-object payloads pass through untouched.
fn stamp_timestamp(mut payload: Value) -> Value {
    if let Value::Object(map) = &mut payload {
        map.entry(EVENT_TIMESTAMP_KEY)
            .or_insert_with(|| Value::from(Utc::now().timestamp_millis()));
    }
    payload
}

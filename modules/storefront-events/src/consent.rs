//! Tracking-consent policy hook.

/// Host-supplied answer to "may events be delivered right now?".
///
/// The bus re-evaluates this on every publish rather than caching the
/// answer, because consent can change while queued events await flush.
pub trait ConsentGate: Send + Sync {
    fn can_track(&self) -> bool;
}

impl<F> ConsentGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn can_track(&self) -> bool {
        self()
    }
}

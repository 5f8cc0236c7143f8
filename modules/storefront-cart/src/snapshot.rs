//! CartSnapshotStore — resolves possibly-deferred cart values and holds the
//! last two snapshot generations for the diff engine.

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::types::{CartSnapshot, RawCartSnapshot};

/// A cart value as supplied by the host on each refresh: either already
/// resolved, or a future still in flight (e.g. the cart mutation's response).
/// Awaiting the deferred form is the pipeline's only suspension point.
pub enum CartValue {
    Ready(Option<RawCartSnapshot>),
    Deferred(BoxFuture<'static, Option<RawCartSnapshot>>),
}

impl CartValue {
    pub fn deferred<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Option<RawCartSnapshot>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    pub async fn resolve(self) -> Option<RawCartSnapshot> {
        match self {
            Self::Ready(value) => value,
            Self::Deferred(future) => future.await,
        }
    }
}

impl From<RawCartSnapshot> for CartValue {
    fn from(snapshot: RawCartSnapshot) -> Self {
        Self::Ready(Some(snapshot))
    }
}

impl From<Option<RawCartSnapshot>> for CartValue {
    fn from(snapshot: Option<RawCartSnapshot>) -> Self {
        Self::Ready(snapshot)
    }
}

/// Holds the most recently observed snapshot and the one before it. Older
/// generations are discarded, never merged.
#[derive(Default)]
pub struct CartSnapshotStore {
    current: Option<CartSnapshot>,
    previous: Option<CartSnapshot>,
}

impl CartSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and install a resolved snapshot.
    ///
    /// Returns `true` if the snapshot became `current` (shifting the old
    /// current to `previous`). A snapshot whose `updatedAt` equals the held
    /// current's is discarded — an unchanged snapshot carries no new
    /// information. An invalid snapshot is logged and discarded without
    /// touching either generation.
    pub fn observe(&mut self, raw: RawCartSnapshot) -> bool {
        let snapshot = match raw.validate() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "discarding invalid cart snapshot");
                return false;
            }
        };

        if let Some(current) = &self.current {
            if current.updated_at == snapshot.updated_at {
                debug!(cart_id = %snapshot.id, "cart snapshot unchanged, skipping");
                return false;
            }
        }

        self.previous = self.current.take();
        self.current = Some(snapshot);
        true
    }

    pub fn current(&self) -> Option<&CartSnapshot> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&CartSnapshot> {
        self.previous.as_ref()
    }
}

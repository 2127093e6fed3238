//! Consumer side: fetch the latest document without ever failing.

use tracing::{debug, trace};

use crate::snapshot::BridgeDocument;
use crate::store::BridgeStore;

/// What a single poll found.
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    /// Nothing written yet.
    Missing,
    /// The store could not be read this time.
    Unavailable,
    /// Text was there but did not parse.
    Malformed,
    /// Same document as last time; nothing to apply.
    Unchanged,
    Updated(BridgeDocument),
}

pub struct BridgePoller<S: BridgeStore> {
    store: S,
    last_version: Option<u64>,
    last: Option<BridgeDocument>,
    misses: u64,
}

impl<S: BridgeStore> BridgePoller<S> {
    pub fn new(store: S) -> Self {
        BridgePoller { store, last_version: None, last: None, misses: 0 }
    }

    /// Last document that parsed, if any.
    pub fn last(&self) -> Option<&BridgeDocument> {
        self.last.as_ref()
    }

    /// Polls that produced nothing usable.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn poll(&mut self) -> PollOutcome {
        let body = match self.store.read() {
            Ok(Some(b)) => b,
            Ok(None) => {
                self.misses += 1;
                trace!("bridge document not present yet");
                return PollOutcome::Missing;
            }
            Err(e) => {
                self.misses += 1;
                trace!(error = %e, "bridge read failed");
                return PollOutcome::Unavailable;
            }
        };

        let doc = match BridgeDocument::parse(&body) {
            Ok(d) => d,
            Err(e) => {
                self.misses += 1;
                debug!(error = %e, "bridge document malformed; skipped");
                return PollOutcome::Malformed;
            }
        };

        // Unversioned documents are always applied.  A restarted producer
        // counts from 1 again, so an equal version only counts as unchanged
        // when the content matches too.
        if let Some(v) = doc.version {
            if self.last_version == Some(v) && self.last.as_ref() == Some(&doc) {
                return PollOutcome::Unchanged;
            }
            if self.last_version.is_some_and(|last| v < last) {
                debug!(version = v, "bridge version went backwards; producer restarted");
            }
            self.last_version = Some(v);
        }

        self.last = Some(doc.clone());
        PollOutcome::Updated(doc)
    }
}

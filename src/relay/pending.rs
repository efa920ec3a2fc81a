use std::sync::Arc;
use tracing::{debug, warn};

use super::error::Result;
use super::slot::{PendingSlot, StoredValue};
use super::store::SuiteStore;

/// Declared type for content-form payloads stored without one
const FALLBACK_CONTENT_TYPE: &str = "text/plain";

/// Keys the relay uses inside the suite store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayKeys {
    pub url: String,
    pub content: String,
    pub content_type: String,
}

impl Default for RelayKeys {
    fn default() -> Self {
        Self {
            url: "OpenWithURL".to_string(),
            content: "SharedContent".to_string(),
            content_type: "SharedContentType".to_string(),
        }
    }
}

/// Mailbox over a [`SuiteStore`]: one unconsumed slot per form
#[derive(Clone)]
pub struct PendingRelay {
    store: Arc<dyn SuiteStore>,
    keys: RelayKeys,
}

impl PendingRelay {
    pub fn new(store: Arc<dyn SuiteStore>, keys: RelayKeys) -> Self {
        Self { store, keys }
    }

    /// Persist a slot, overwriting any unconsumed slot of the same form
    pub fn store(&self, slot: &PendingSlot) -> Result<()> {
        match slot {
            PendingSlot::Url(uri) => {
                let value = StoredValue::now(uri.as_str()).encode()?;
                self.store.write(&[(self.keys.url.as_str(), value)])?;
            }
            PendingSlot::Content {
                content,
                content_type,
            } => {
                let content = StoredValue::now(content.as_str()).encode()?;
                let content_type = StoredValue::now(content_type.as_str()).encode()?;
                self.store.write(&[
                    (self.keys.content.as_str(), content),
                    (self.keys.content_type.as_str(), content_type),
                ])?;
            }
        }

        debug!(form = ?slot.form(), "Pending slot stored");
        Ok(())
    }

    /// Read and clear every pending slot: URL form first, then content form.
    ///
    /// The read and the clear are one atomic store operation, so a second
    /// call without an intervening `store` returns nothing.
    pub fn drain_pending(&self) -> Result<Vec<PendingSlot>> {
        let taken = self.store.take(&[
            self.keys.url.as_str(),
            self.keys.content.as_str(),
            self.keys.content_type.as_str(),
        ])?;

        let mut taken = taken.into_iter();
        let url = taken.next().flatten();
        let content = taken.next().flatten();
        let content_type = taken.next().flatten();

        let mut slots = Vec::new();

        if let Some(bytes) = url {
            match StoredValue::decode(&bytes) {
                Some((uri, stored_at)) => {
                    debug!(%uri, ?stored_at, "Drained URL slot");
                    slots.push(PendingSlot::Url(uri));
                }
                None => warn!(key = %self.keys.url, "Discarding undecodable URL slot"),
            }
        }

        let content_type = content_type.and_then(|bytes| StoredValue::decode(&bytes));
        match (content.map(|bytes| StoredValue::decode(&bytes)), content_type) {
            (Some(Some((content, stored_at))), content_type) => {
                let content_type = content_type
                    .map(|(value, _)| value)
                    .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
                debug!(%content_type, ?stored_at, "Drained content slot");
                slots.push(PendingSlot::Content {
                    content,
                    content_type,
                });
            }
            (Some(None), _) => {
                warn!(key = %self.keys.content, "Discarding undecodable content slot");
            }
            (None, Some((content_type, _))) => {
                warn!(%content_type, "Discarding content type without content");
            }
            (None, None) => {}
        }

        Ok(slots)
    }
}

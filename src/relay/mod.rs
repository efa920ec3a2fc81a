//! Pending-content relay
//!
//! A durable, suite-scoped mailbox shared between the sharing process and
//! the host application. It holds at most one unconsumed slot per form:
//!
//! - URL form: `OpenWithURL` -> URI
//! - content form: `SharedContent` + `SharedContentType`
//!
//! Writing a slot overwrites the previous unconsumed one of the same form.
//! Draining reads and clears every slot in one atomic step and returns them
//! URL form first, then content form.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sharebox::relay::{AppGroup, FjallSuiteStore, PendingRelay, PendingSlot, RelayKeys};
//!
//! let group = AppGroup::resolve("com.example.notes", "data/groups");
//! let store = FjallSuiteStore::open(group.path())?;
//! let relay = PendingRelay::new(Arc::new(store), RelayKeys::default());
//!
//! relay.store(&PendingSlot::url("file:///tmp/a.txt"))?;
//! let pending = relay.drain_pending()?;
//! ```

pub mod error;
pub mod group;
pub mod pending;
pub mod slot;
pub mod store;

pub use error::{RelayError, Result};
pub use group::{AppGroup, AppGroupStatus};
pub use pending::{PendingRelay, RelayKeys};
pub use slot::{PendingSlot, SlotForm, StoredValue};
pub use store::{FjallSuiteStore, MemorySuiteStore, SuiteStore};

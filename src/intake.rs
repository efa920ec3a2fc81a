//! Host-facing API: initialize, addHandler, verbosity, app group, `receivedFiles`
//!
//! [`ShareIntake`] wires the classifier, extractor, relay, readiness gate and
//! dispatcher together and exposes the operations a host application calls.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sharebox::config::Config;
//! use sharebox::intake::ShareIntake;
//!
//! let config = Config::load()?;
//! let intake = ShareIntake::new(&config);
//! let mut events = intake.subscribe();
//!
//! intake.initialize().await?;
//! intake.add_handler().await?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content::{
    BuiltinTypeRegistry, Classifier, ContentReference, ExtrasExtractor, FsResourceReader,
    ResourceError, ResourceReader, TypeRegistry,
};
use crate::dispatch::{Dispatcher, EventListener, ListenerError};
use crate::event::{NoSourceApp, ReceivedFiles, SourceAppProvider};
use crate::gate::{ReadinessGate, Submission};
use crate::observability::{Diagnostics, MetricsSnapshot, Verbosity};
use crate::relay::{
    AppGroup, AppGroupStatus, FjallSuiteStore, PendingRelay, PendingSlot, RelayError, RelayKeys,
    SuiteStore,
};

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("shared storage group '{group}' is not provisioned")]
    NotProvisioned { group: String },

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
}

pub type Result<T> = std::result::Result<T, IntakeError>;

/// Fan-out over every `receivedFiles` subscriber
#[derive(Debug, Default)]
pub struct ListenerSet {
    senders: StdMutex<Vec<mpsc::UnboundedSender<ReceivedFiles>>>,
}

impl ListenerSet {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ReceivedFiles> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<ReceivedFiles>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventListener for ListenerSet {
    fn on_received(&self, event: &ReceivedFiles) -> std::result::Result<(), ListenerError> {
        let mut senders = self.lock();
        senders.retain(|tx| tx.send(event.clone()).is_ok());

        if senders.is_empty() {
            Err(ListenerError::NoListener)
        } else {
            Ok(())
        }
    }
}

/// Where the suite store comes from
enum StoreSource {
    /// Fjall keyspace in the app group directory
    Group,
    /// Store supplied by the embedding platform
    Injected(Arc<dyn SuiteStore>),
}

enum IntakeState {
    /// References submitted here are already in the relay; `early` keeps
    /// their order for the gate built by `initialize`
    Uninitialized {
        handler_added: bool,
        early: Vec<ContentReference>,
    },
    Running(ReadinessGate),
}

impl Default for IntakeState {
    fn default() -> Self {
        IntakeState::Uninitialized {
            handler_added: false,
            early: Vec::new(),
        }
    }
}

/// Entry point for the host application
pub struct ShareIntake {
    group: AppGroup,
    keys: RelayKeys,
    store_source: StoreSource,
    reader: Arc<dyn ResourceReader>,
    registry: Arc<dyn TypeRegistry>,
    sources: Arc<dyn SourceAppProvider>,
    listeners: Arc<ListenerSet>,
    diagnostics: Arc<Diagnostics>,
    ports: StdMutex<Vec<AbortHandle>>,
    state: Mutex<IntakeState>,
}

impl ShareIntake {
    /// Intake backed by the Fjall suite store of the configured app group
    pub fn new(config: &Config) -> Self {
        Self::build(config, StoreSource::Group)
    }

    /// Intake over a store supplied by the platform; always provisioned
    pub fn with_store(config: &Config, store: Arc<dyn SuiteStore>) -> Self {
        Self::build(config, StoreSource::Injected(store))
    }

    fn build(config: &Config, store_source: StoreSource) -> Self {
        Self {
            group: AppGroup::resolve(&config.app.bundle_id, &config.relay.groups_root),
            keys: config.relay.keys(),
            store_source,
            reader: Arc::new(FsResourceReader::new(Duration::from_millis(
                config.extract.read_timeout_ms,
            ))),
            registry: Arc::new(BuiltinTypeRegistry::with_overrides(
                config.extract.type_overrides(),
            )),
            sources: Arc::new(NoSourceApp),
            listeners: Arc::new(ListenerSet::default()),
            diagnostics: Arc::new(Diagnostics::new(config.logging.verbosity)),
            ports: StdMutex::new(Vec::new()),
            state: Mutex::new(IntakeState::default()),
        }
    }

    /// Replace the source-application provider (before `initialize`)
    pub fn with_source_provider(mut self, sources: Arc<dyn SourceAppProvider>) -> Self {
        self.sources = sources;
        self
    }

    /// Replace the resource reader (before `initialize`)
    pub fn with_reader(mut self, reader: Arc<dyn ResourceReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Report the derived group identifier and whether it is usable
    pub fn app_group(&self) -> AppGroupStatus {
        match self.store_source {
            StoreSource::Group => self.group.status(),
            StoreSource::Injected(_) => AppGroupStatus {
                identifier: self.group.identifier().to_string(),
                provisioned: true,
            },
        }
    }

    pub fn set_verbosity(&self, level: i64) {
        self.diagnostics.set_verbosity(Verbosity::from_level(level));
    }

    pub fn verbosity(&self) -> Verbosity {
        self.diagnostics.verbosity()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.diagnostics.snapshot()
    }

    /// New receiver on the `receivedFiles` stream
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ReceivedFiles> {
        self.listeners.subscribe()
    }

    pub fn remove_all_listeners(&self) {
        self.listeners.clear();
    }

    /// Resolve the app group, open the relay and check for pending content.
    ///
    /// Fails only when the group is not provisioned. Calling it again after
    /// success just re-checks the relay.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        let (handler_added, early) = match &mut *state {
            IntakeState::Running(gate) => {
                let flushed = gate.flush_pending().await?;
                debug!(flushed, "Pending content re-checked");
                return Ok(());
            }
            IntakeState::Uninitialized {
                handler_added,
                early,
            } => (*handler_added, early),
        };

        let relay = self.open_relay()?;
        let mut gate = ReadinessGate::new(relay, self.dispatcher(), self.diagnostics.clone());
        gate.requeue(std::mem::take(early)).await;

        // A failed drain leaves the gate not ready with its queue intact
        let flushed = if handler_added {
            gate.mark_ready().await
        } else {
            Ok(0)
        };
        *state = IntakeState::Running(gate);
        flushed?;

        info!(group = %self.group.identifier(), "Share intake initialized");
        Ok(())
    }

    /// Deliver anything another process left in the relay since the last
    /// check. Returns 0 until `initialize` and `add_handler` have both run.
    pub async fn check_pending(&self) -> Result<usize> {
        let mut state = self.state.lock().await;

        match &mut *state {
            IntakeState::Uninitialized { .. } => Ok(0),
            IntakeState::Running(gate) => Ok(gate.flush_pending().await?),
        }
    }

    /// Register the host's readiness to receive events; idempotent
    pub async fn add_handler(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        match &mut *state {
            IntakeState::Uninitialized { handler_added, .. } => {
                *handler_added = true;
                if self.diagnostics.allows(Verbosity::Debug) {
                    debug!("Handler added before initialize");
                }
            }
            IntakeState::Running(gate) => {
                let flushed = gate.mark_ready().await?;
                if self.diagnostics.allows(Verbosity::Debug) {
                    debug!(flushed, "Handler added");
                }
            }
        }

        Ok(())
    }

    /// Feed one platform notification into the readiness gate.
    ///
    /// Before `initialize` the reference is stored in the relay and queued
    /// locally, exactly as a not-ready gate would.
    pub async fn submit(&self, reference: ContentReference) -> Result<Submission> {
        let mut state = self.state.lock().await;

        match &mut *state {
            IntakeState::Uninitialized { early, .. } => {
                self.open_relay()?
                    .store(&PendingSlot::Url(reference.uri.clone()))?;
                self.diagnostics.slot_buffered();
                if self.diagnostics.allows(Verbosity::Debug) {
                    debug!(uri = %reference.uri, "Not initialized yet, buffering");
                }
                early.push(reference);
                Ok(Submission::Buffered)
            }
            IntakeState::Running(gate) => Ok(gate.submit(reference).await?),
        }
    }

    /// Consume the notification port until it closes
    pub fn attach(
        self: &Arc<Self>,
        mut notifications: mpsc::Receiver<ContentReference>,
    ) -> JoinHandle<()> {
        let intake = Arc::clone(self);

        let port = tokio::spawn(async move {
            while let Some(reference) = notifications.recv().await {
                let uri = reference.uri.clone();
                if let Err(e) = intake.submit(reference).await {
                    warn!(%uri, error = %e, "Failed to submit shared content");
                }
            }
            debug!("Notification port closed");
        });

        self.lock_ports().push(port.abort_handle());
        port
    }

    /// Stop receiving: abort every attached notification port and drop all
    /// listeners. Slots already in the relay stay there for the next run.
    pub fn exit(&self) {
        let ports = std::mem::take(&mut *self.lock_ports());
        for port in &ports {
            port.abort();
        }
        self.listeners.clear();
        info!(ports = ports.len(), "Share intake stopped");
    }

    fn lock_ports(&self) -> std::sync::MutexGuard<'_, Vec<AbortHandle>> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Producer side: leave a slot in the relay for the host to pick up
    pub async fn deliver(&self, slot: PendingSlot) -> Result<()> {
        let state = self.state.lock().await;

        match &*state {
            IntakeState::Running(gate) => gate.relay().store(&slot)?,
            IntakeState::Uninitialized { .. } => self.open_relay()?.store(&slot)?,
        }

        debug!(form = ?slot.form(), "Slot delivered to relay");
        Ok(())
    }

    /// Read the referenced resource and return it base64-encoded
    pub async fn load(&self, reference: &ContentReference) -> Result<String> {
        let bytes = self.reader.read(reference).await?;
        Ok(STANDARD.encode(bytes))
    }

    fn open_relay(&self) -> Result<PendingRelay> {
        let store: Arc<dyn SuiteStore> = match &self.store_source {
            StoreSource::Injected(store) => store.clone(),
            StoreSource::Group => {
                if !self.group.is_provisioned() {
                    return Err(IntakeError::NotProvisioned {
                        group: self.group.identifier().to_string(),
                    });
                }
                Arc::new(FjallSuiteStore::open(self.group.path())?)
            }
        };

        Ok(PendingRelay::new(store, self.keys.clone()))
    }

    fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(
            Classifier::new(self.registry.clone()),
            ExtrasExtractor::new(self.reader.clone()),
            self.sources.clone(),
            self.listeners.clone(),
            self.diagnostics.clone(),
        ))
    }
}

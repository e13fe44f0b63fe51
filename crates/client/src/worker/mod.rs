//! Cache worker lifecycle.
//!
//! A [`Worker`] owns the partitions for one cache version and moves through
//! `Parsed → Installing → Installed → Activating → Activated`, ending in
//! `Redundant` after [`Worker::terminate`].
//!
//! - install: precache the static assets, then skip waiting.
//! - activate: delete every partition that is not current, then claim.
//! - fetch: GET on http(s) is routed to a strategy; anything else, or any
//!   request before activation, passes through.
//! - sweep: delete expired entries from every partition, on a timer and on
//!   `CLEAN_CACHE`.
//!
//! The process holds exactly one worker; `start` and `terminate` bound the
//! background sweep task so tests can run it deterministically.

pub mod message;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use swcache_core::{AppConfig, CacheStorage, Error, ExpiryPolicy, PartitionSet, Request, RequestClass, Response};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

use crate::classify::Classifier;
use crate::fetch::{Network, resolve_asset};
use crate::strategy::{Executor, Served, Strategy};

pub use message::{ControlMessage, MessagePort, VersionReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Result of offering a request to the worker.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the caller goes to the network itself.
    Passthrough,
    Handled { class: RequestClass, strategy: Strategy, served: Served },
}

/// Entry count of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub name: String,
    pub entries: u64,
    /// Whether the name belongs to the current cache version.
    pub current: bool,
}

pub struct Worker {
    storage: CacheStorage,
    executor: Executor,
    classifier: Classifier,
    partitions: PartitionSet,
    policy: ExpiryPolicy,
    origin: Url,
    static_assets: Vec<String>,
    sweep_interval: Duration,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn new(config: &AppConfig, storage: CacheStorage, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let offline_page =
            resolve_asset(&origin, &config.offline_page).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let partitions = config.partitions();
        let policy = config.expiry_policy();

        let executor = Executor::new(storage.clone(), network, partitions.clone(), policy.clone(), config.timeout())
            .with_offline_page(offline_page);

        Ok(Self {
            storage,
            executor,
            classifier: Classifier::from_config(config)?,
            partitions,
            policy,
            origin,
            static_assets: config.static_assets.clone(),
            sweep_interval: config.sweep_interval(),
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        })
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Version string reported to the page: the static partition name.
    pub fn version(&self) -> String {
        self.partitions.name(RequestClass::Static)
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    /// Install, activate and start the periodic sweep.
    ///
    /// Idempotent once activated. A terminated worker cannot be restarted.
    pub async fn start(self: &Arc<Self>) -> Result<(), Error> {
        if self.state().await == WorkerState::Redundant {
            return Err(Error::WorkerState("terminated worker cannot be restarted".into()));
        }
        if self.state().await == WorkerState::Parsed {
            self.install().await?;
        }
        if self.state().await == WorkerState::Installed {
            self.activate().await?;
        }
        self.start_sweeper().await;
        Ok(())
    }

    /// Precache the static assets and skip waiting.
    ///
    /// Individual asset failures are logged and skipped. Returns the number
    /// of assets cached.
    pub async fn install(&self) -> Result<usize, Error> {
        self.transition(&[WorkerState::Parsed], WorkerState::Installing).await?;
        tracing::info!(version = %self.version(), "installing cache worker");

        let partition = self.partitions.name(RequestClass::Static);
        if let Err(e) = self.storage.open_partition(&partition).await {
            tracing::warn!("failed to open {}: {}", partition, e);
        }

        let mut cached = 0;
        for asset in &self.static_assets {
            match self.precache(&partition, asset).await {
                Ok(()) => cached += 1,
                Err(e) => tracing::warn!("failed to precache {}: {}", asset, e),
            }
        }

        tracing::info!(cached, total = self.static_assets.len(), "static assets precached");
        *self.state.write().await = WorkerState::Installed;
        self.skip_waiting();
        Ok(cached)
    }

    async fn precache(&self, partition: &str, asset: &str) -> Result<(), Error> {
        let url = resolve_asset(&self.origin, asset).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let request = Request::get(url);
        let response = self.executor.fetch_network(&request).await?;
        if !response.ok() {
            return Err(Error::Network(format!("{} returned {}", request.url, response.status)));
        }
        self.storage.put(partition, &request, &response).await
    }

    /// Allow activation without waiting for old clients to go away.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    /// Delete stale partitions and take control.
    ///
    /// Returns the number of partitions deleted.
    pub async fn activate(&self) -> Result<usize, Error> {
        if !self.skip_waiting.load(Ordering::SeqCst) {
            return Err(Error::WorkerState("installed worker is waiting; send SKIP_WAITING".into()));
        }
        self.transition(&[WorkerState::Installed], WorkerState::Activating).await?;
        tracing::info!(version = %self.version(), "activating cache worker");

        let mut deleted = 0;
        match self.storage.partition_names().await {
            Ok(names) => {
                for name in names.iter().filter(|n| !self.partitions.contains(n)) {
                    match self.storage.delete_partition(name).await {
                        Ok(true) => {
                            tracing::info!(partition = %name, "deleted stale partition");
                            deleted += 1;
                        }
                        Ok(false) => {}
                        Err(e) => tracing::warn!("failed to delete partition {}: {}", name, e),
                    }
                }
            }
            Err(e) => tracing::warn!("failed to list partitions: {}", e),
        }

        *self.state.write().await = WorkerState::Activated;
        tracing::info!(deleted, "cache worker activated and claimed clients");
        Ok(deleted)
    }

    /// Offer a request to the worker.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        if !request.is_get() || !request.is_http() {
            return FetchOutcome::Passthrough;
        }
        if self.state().await != WorkerState::Activated {
            tracing::debug!("worker not active, passing through {}", request.url);
            return FetchOutcome::Passthrough;
        }

        let class = self.classifier.classify(&request.url);
        let strategy = Strategy::for_class(class);
        let served = self.executor.execute(strategy, class, request).await;
        tracing::debug!(
            url = %request.url,
            class = %class,
            status = served.response.status,
            source = ?served.source,
            "request served"
        );

        FetchOutcome::Handled { class, strategy, served }
    }

    /// Go straight to the network, for requests the worker passed through.
    pub async fn fetch_direct(&self, request: &Request) -> Result<Response, Error> {
        self.executor.fetch_network(request).await
    }

    /// Handle a control message from the page.
    pub async fn handle_message(&self, raw: &Value, port: Option<&MessagePort>) {
        match ControlMessage::parse(raw) {
            Some(ControlMessage::SkipWaiting) => {
                tracing::info!("received SKIP_WAITING");
                self.skip_waiting();
            }
            Some(ControlMessage::GetVersion) => match port {
                Some(port) => {
                    if !port.post(&VersionReply { version: self.version() }) {
                        tracing::warn!("GET_VERSION reply port is closed");
                    }
                }
                None => tracing::warn!("GET_VERSION received without a reply port"),
            },
            Some(ControlMessage::CleanCache) => match self.clean_expired().await {
                Ok(deleted) => tracing::info!(deleted, "expired entries removed on request"),
                Err(e) => tracing::warn!("cache cleanup failed: {}", e),
            },
            None => {
                let kind = raw.get("type").cloned().unwrap_or(Value::Null);
                tracing::warn!(message_type = %kind, "unrecognized control message");
            }
        }
    }

    /// Delete every expired entry in every partition.
    ///
    /// Storage failures on one partition or entry are logged and the sweep
    /// moves on. Returns the number of entries deleted.
    pub async fn clean_expired(&self) -> Result<u64, Error> {
        let now = Utc::now();
        let mut deleted = 0;

        for name in self.storage.partition_names().await? {
            let max_age = self.policy.max_age(self.partitions.class_of(&name));
            let entries = match self.storage.entries(&name).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("failed to read {} for sweep: {}", name, e);
                    continue;
                }
            };

            for entry in entries.iter().filter(|e| e.response.is_expired(max_age, now)) {
                match self.storage.delete_entry(&name, &entry.key_hash).await {
                    Ok(true) => {
                        tracing::debug!("expired {} from {}", entry.url, name);
                        deleted += 1;
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!("failed to expire {} from {}: {}", entry.url, name, e),
                }
            }
        }

        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<Vec<PartitionStats>, Error> {
        let mut stats = Vec::new();
        for name in self.storage.partition_names().await? {
            let entries = self.storage.entry_count(&name).await?;
            stats.push(PartitionStats { current: self.partitions.contains(&name), name, entries });
        }
        Ok(stats)
    }

    /// Start the periodic sweep if it is not already running.
    pub async fn start_sweeper(self: &Arc<Self>) {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let worker = Arc::downgrade(self);
        let interval = self.sweep_interval;
        *sweeper = Some(tokio::spawn(sweep_loop(worker, interval)));
        tracing::debug!(interval_secs = interval.as_secs(), "expiry sweep scheduled");
    }

    pub async fn is_sweeping(&self) -> bool {
        self.sweeper.lock().await.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the periodic sweep and retire the worker.
    pub async fn terminate(&self) {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }
        *self.state.write().await = WorkerState::Redundant;
        tracing::info!(version = %self.version(), "cache worker terminated");
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&state) {
            return Err(Error::WorkerState(format!("cannot move from {:?} to {:?}", *state, to)));
        }
        *state = to;
        Ok(())
    }
}

/// First tick of the sweep timer, or `None` if `period` overflows the clock.
fn first_sweep_at(period: Duration) -> Option<Instant> {
    Instant::now().checked_add(period)
}

async fn sweep_loop(worker: Weak<Worker>, period: Duration) {
    let Some(start) = first_sweep_at(period) else {
        tracing::error!(interval_secs = period.as_secs(), "sweep interval out of range, periodic sweep disabled");
        return;
    };
    let mut ticker = tokio::time::interval_at(start, period);
    loop {
        ticker.tick().await;
        let Some(worker) = worker.upgrade() else {
            break;
        };
        match worker.clean_expired().await {
            Ok(deleted) => tracing::info!(deleted, "periodic expiry sweep complete"),
            Err(e) => tracing::warn!("periodic expiry sweep failed: {}", e),
        }
    }
}

//! Periodically refreshed cache of the RSA keys published by a JWKS endpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::config::RotatorConfig;
use super::decoder::parse_key_set;
use super::error::{FetchError, Result};
use super::http_client::{BodyLimitExceeded, HttpClientError, HttpRequest, JwksHttpClient};
use super::stats::{RotationStats, RotationStatsSnapshot};
use super::types::{KeyMap, PublicKey};

/// Everything the refresh loop needs. Cloned into the spawned task so the
/// task never keeps the `KeyRotator` itself alive.
#[derive(Clone)]
struct RefreshWorker<C> {
    client: C,
    config: RotatorConfig,
    keys: Arc<RwLock<Arc<KeyMap>>>,
    /// Held from fetch to install so overlapping refreshes land in call order.
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
    stats: Arc<RotationStats>,
}

fn transport_error(err: HttpClientError) -> FetchError {
    match err.downcast::<BodyLimitExceeded>() {
        Ok(limit) => FetchError::BodyTooLarge { len: limit.len, max: limit.max },
        Err(other) => FetchError::Transport(other.to_string()),
    }
}

impl<C: JwksHttpClient> RefreshWorker<C> {
    /// Downloads and decodes the key set without touching the cache.
    #[instrument(skip(self), fields(endpoint = %self.config.endpoint()), level = "debug")]
    async fn fetch_key_map(&self) -> Result<KeyMap> {
        let timeout = self.config.effective_fetch_timeout();
        let max = self.config.effective_max_body_size();
        let request = HttpRequest::get(self.config.endpoint())
            .with_timeout(timeout)
            .with_max_body_size(max);
        let response = match tokio::time::timeout(timeout, self.client.execute(request)).await {
            Ok(result) => result.map_err(transport_error)?,
            Err(_) => return Err(FetchError::Timeout(timeout).into()),
        };
        if !response.is_success() {
            return Err(FetchError::Status(response.status).into());
        }
        // Clients are not required to honour the limit while reading.
        if response.body.len() > max {
            return Err(FetchError::BodyTooLarge { len: response.body.len(), max }.into());
        }
        parse_key_set(&response.body)
    }

    /// Replaces the cached map. The write lock covers only the pointer swap.
    fn install(&self, keys: KeyMap) -> usize {
        let count = keys.len();
        let fresh = Arc::new(keys);
        *self.keys.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        count
    }

    async fn refresh(&self) -> Result<usize> {
        let _serial = self.refresh_lock.lock().await;
        match self.fetch_key_map().await {
            Ok(keys) => {
                let count = self.install(keys);
                self.stats.record_success();
                Ok(count)
            }
            Err(err) => {
                self.stats.record_failure(&err.to_string());
                Err(err)
            }
        }
    }

    fn snapshot(&self) -> Arc<KeyMap> {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn run(self, interval: Duration, stop: CancellationToken, external: CancellationToken) {
        info!(endpoint = self.config.endpoint(), interval = ?interval, "JWKS rotation started");
        loop {
            if stop.is_cancelled() || external.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = external.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            self.stats.record_tick();
            let outcome = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = external.cancelled() => break,
                outcome = self.refresh() => outcome,
            };
            match outcome {
                Ok(key_count) => {
                    debug!(endpoint = self.config.endpoint(), key_count, "JWKS refreshed")
                }
                Err(err) => warn!(
                    endpoint = self.config.endpoint(),
                    error = %err,
                    "JWKS refresh failed, keeping previous keys"
                ),
            }
        }
        info!(endpoint = self.config.endpoint(), "JWKS rotation stopped");
    }
}

/// An owned, stoppable cache of the keys served by one JWKS endpoint.
///
/// Construction fetches the key set once; a rotator never exists without a
/// successfully decoded map. `start_rotation` adds a background task that
/// replaces the map on every tick, while `read_key_map` hands out immutable
/// snapshots to any number of concurrent readers.
///
/// Dropping the rotator cancels its refresh task. Use `shutdown` to also wait
/// for the task to finish.
pub struct KeyRotator<C> {
    worker: RefreshWorker<C>,
    rotating: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: JwksHttpClient> KeyRotator<C> {
    /// Fetches the key set described by `config` and returns a ready rotator.
    ///
    /// Fails with the fetch, parse or decode error of the initial download.
    #[instrument(skip(client, config), fields(endpoint = %config.endpoint()), level = "debug")]
    pub async fn new(client: C, config: RotatorConfig) -> Result<Self> {
        config.validate()?;
        let worker = RefreshWorker {
            client,
            config,
            keys: Arc::new(RwLock::new(Arc::new(KeyMap::new()))),
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
            stats: Arc::new(RotationStats::new()),
        };
        let keys = worker.fetch_key_map().await?;
        let key_count = worker.install(keys);
        info!(endpoint = worker.config.endpoint(), key_count, "JWKS loaded");
        Ok(Self {
            worker,
            rotating: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        })
    }

    /// Starts the background refresh loop. Only the first call has any effect.
    ///
    /// `interval` is raised to the configured minimum, if one is set; a zero
    /// interval always becomes one millisecond. Returns `true` if this
    /// call spawned the loop. Must be called from within a tokio runtime;
    /// outside of one nothing is started and `false` is returned.
    pub fn start_rotation(&self, interval: Duration) -> bool {
        self.spawn_loop(interval, CancellationToken::new())
    }

    /// Like `start_rotation`, but the loop also stops once `cancel` fires.
    pub fn start_rotation_until(&self, interval: Duration, cancel: CancellationToken) -> bool {
        self.spawn_loop(interval, cancel)
    }

    /// Starts rotation with the configured refresh interval.
    pub fn start_default_rotation(&self) -> bool {
        self.start_rotation(self.worker.config.effective_refresh_interval())
    }

    fn spawn_loop(&self, interval: Duration, external: CancellationToken) -> bool {
        if self
            .rotating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(endpoint = self.endpoint(), "JWKS rotation already started");
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(
                    endpoint = self.endpoint(),
                    error = %err,
                    "cannot start JWKS rotation outside a tokio runtime"
                );
                self.rotating.store(false, Ordering::Release);
                return false;
            }
        };
        let requested = interval;
        let interval = self.worker.config.clamp_interval(requested);
        if interval != requested {
            debug!(
                endpoint = self.endpoint(),
                requested = ?requested,
                interval = ?interval,
                "JWKS rotation interval raised to its floor"
            );
        }
        let worker = self.worker.clone();
        let stop = self.cancel.clone();
        let handle = runtime.spawn(worker.run(interval, stop, external));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        true
    }

    /// The current key set. Never blocks beyond taking the shared read lock.
    pub fn read_key_map(&self) -> Arc<KeyMap> {
        self.worker.snapshot()
    }

    /// Looks up one key in the current key set.
    pub fn get(&self, kid: &str) -> Option<PublicKey> {
        self.worker.snapshot().get(kid).cloned()
    }

    /// Fetches and installs the key set right away on the caller's task.
    ///
    /// Waits for an in-flight loop refresh first, so the result of this call
    /// is never overwritten by an older download.
    /// Unlike a loop tick, the error is returned to the caller. The cache is
    /// left untouched on failure. Returns the number of installed keys.
    pub async fn refresh_now(&self) -> Result<usize> {
        self.worker.refresh().await
    }

    /// Whether a refresh loop is currently running.
    pub fn is_rotating(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn endpoint(&self) -> &str {
        self.worker.config.endpoint()
    }

    pub fn config(&self) -> &RotatorConfig {
        &self.worker.config
    }

    pub fn stats(&self) -> RotationStatsSnapshot {
        self.worker.stats.snapshot()
    }

    /// Stops the refresh loop and waits for it to exit.
    ///
    /// The rotator keeps serving its last map afterwards, but rotation
    /// cannot be started again.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(
                    endpoint = self.endpoint(),
                    error = %err,
                    "JWKS rotation task ended abnormally"
                );
            }
        }
        // A stopped rotator stays stopped.
        self.rotating.store(true, Ordering::Release);
    }
}

#[cfg(feature = "reqwest")]
impl KeyRotator<super::http_client::ReqwestHttpClient> {
    /// Fetches `endpoint` with a default `reqwest` client and default settings.
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self> {
        let client = super::http_client::ReqwestHttpClient::new();
        Self::new(client, RotatorConfig::new(endpoint)).await
    }
}

impl<C> Drop for KeyRotator<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

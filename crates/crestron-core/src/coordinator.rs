// ── Polling coordinator ──
//
// Owns the refresh cycle for one hub connection: the device manager, the
// published snapshot, subscriber notification, the interval task and the
// optimistic-update suppression flags. Cheaply cloneable via `Arc`.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crestron_api::HubApi;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{self, Command};
use crate::config::{HubConfig, PollSettings};
use crate::error::CoreError;
use crate::manager::{ChangeSet, DeviceManager};
use crate::model::{EntityKey, Snapshot};

/// How long polled values are ignored for an entity after it sent a command.
pub const OPTIMISTIC_COOLDOWN: Duration = Duration::from_secs(2);

type RefreshResult = Result<Arc<Snapshot>, CoreError>;
type RefreshFuture = Shared<BoxFuture<'static, RefreshResult>>;
type Listener = Arc<dyn Fn() + Send + Sync>;

// ── RefreshState ─────────────────────────────────────────────────

/// Refresh cycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RefreshState {
    Idle,
    Refreshing,
    Published,
    Failed,
}

// ── Coordinator ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    api: Arc<dyn HubApi>,
    manager: Mutex<DeviceManager>,
    interval: Duration,
    snapshot: watch::Sender<Arc<Snapshot>>,
    state: watch::Sender<RefreshState>,
    in_flight: StdMutex<Option<RefreshFuture>>,
    listeners: StdMutex<Listeners>,
    health: StdMutex<Health>,
    suppressed: DashMap<EntityKey, Instant>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Default)]
struct Health {
    last_update_success: bool,
    last_error: Option<CoreError>,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Coordinator {
    /// Create a coordinator over an API client. Does NOT poll: call
    /// [`first_refresh()`](Self::first_refresh) and then [`start()`](Self::start).
    pub fn new(api: Arc<dyn HubApi>, settings: PollSettings) -> Self {
        let interval = settings.effective_interval();
        let manager = DeviceManager::new(Arc::clone(&api), settings);
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        let (state, _) = watch::channel(RefreshState::Idle);

        Self {
            inner: Arc::new(CoordinatorInner {
                api,
                manager: Mutex::new(manager),
                interval,
                snapshot,
                state,
                in_flight: StdMutex::new(None),
                listeners: StdMutex::new(Listeners::default()),
                health: StdMutex::new(Health::default()),
                suppressed: DashMap::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, run the first refresh and start the interval task.
    pub async fn connect(config: &HubConfig) -> Result<Self, CoreError> {
        let client = config.build_client()?;
        client.login().await.map_err(|e| CoreError::NotReady {
            source: Box::new(e.into()),
        })?;
        info!(host = %config.host, "logged in to hub");

        let coordinator = Self::new(Arc::new(client), config.poll.clone());
        coordinator.first_refresh().await?;
        coordinator.start().await;
        Ok(coordinator)
    }

    /// One-shot: log in, refresh once, run closure, shut down.
    ///
    /// No interval task is started.
    pub async fn oneshot<F, Fut, T>(config: &HubConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let client = config.build_client()?;
        client.login().await.map_err(|e| CoreError::NotReady {
            source: Box::new(e.into()),
        })?;
        let coordinator = Self::new(Arc::new(client), config.poll.clone());
        coordinator.first_refresh().await?;
        let result = f(coordinator.clone()).await;
        coordinator.shutdown().await;
        result
    }

    /// Spawn the periodic refresh task.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(refresh_task(
            coordinator,
            self.inner.interval,
            cancel,
        )));
        debug!(interval_secs = self.inner.interval.as_secs(), "refresh task started");
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("coordinator shut down");
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Initial refresh at setup. Any failure means the hub is not ready.
    pub async fn first_refresh(&self) -> RefreshResult {
        self.request_refresh()
            .await
            .map_err(|e| CoreError::NotReady {
                source: Box::new(e),
            })
    }

    /// Refresh now, or join the refresh already in flight.
    pub async fn request_refresh(&self) -> RefreshResult {
        let refresh = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(running) if running.peek().is_none() => {
                    debug!("joining in-flight refresh");
                    running.clone()
                }
                _ => {
                    let coordinator = self.clone();
                    let fresh = async move { coordinator.run_refresh().await }
                        .boxed()
                        .shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };
        refresh.await
    }

    async fn run_refresh(&self) -> RefreshResult {
        self.inner.state.send_replace(RefreshState::Refreshing);

        let result = {
            let mut manager = self.inner.manager.lock().await;
            manager.poll().await
        };

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.inner.snapshot.send_replace(Arc::clone(&snapshot));
                {
                    let mut health = lock(&self.inner.health);
                    health.last_update_success = true;
                    health.last_error = None;
                }
                self.inner.state.send_replace(RefreshState::Published);
                self.notify_listeners();
                self.inner.state.send_replace(RefreshState::Idle);
                Ok(snapshot)
            }
            Err(err) => {
                {
                    let mut health = lock(&self.inner.health);
                    health.last_update_success = false;
                    health.last_error = Some(err.clone());
                }
                self.inner.state.send_replace(RefreshState::Failed);
                self.inner.state.send_replace(RefreshState::Idle);
                Err(err)
            }
        }
    }

    // ── Subscribers ──────────────────────────────────────────────

    /// Register a listener called after every successful publish.
    ///
    /// The listener stays registered until the returned handle is dropped.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        let mut listeners = lock(&self.inner.listeners);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn notify_listeners(&self) {
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    // ── Optimistic suppression ───────────────────────────────────

    /// Ignore polled values for `key` for [`OPTIMISTIC_COOLDOWN`].
    pub fn suppress(&self, key: EntityKey) {
        self.inner
            .suppressed
            .insert(key, Instant::now() + OPTIMISTIC_COOLDOWN);
    }

    /// Whether polled values for `key` should currently be ignored.
    pub fn is_suppressed(&self, key: &EntityKey) -> bool {
        let now = Instant::now();
        self.inner.suppressed.remove_if(key, |_, until| *until <= now);
        self.inner.suppressed.contains_key(key)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Send a command to the hub, refreshing afterwards where it matters.
    pub async fn execute(&self, command: Command) -> Result<(), CoreError> {
        command::route(self.inner.api.as_ref(), &command).await?;
        if command.refreshes_after() {
            if let Err(e) = self.request_refresh().await {
                warn!(error = %e, "refresh after command failed");
            }
        }
        Ok(())
    }

    // ── State observation ────────────────────────────────────────

    pub fn api(&self) -> &Arc<dyn HubApi> {
        &self.inner.api
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.snapshot.borrow())
    }

    /// Subscribe to snapshot publications.
    pub fn watch_snapshot(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// Subscribe to refresh state transitions.
    pub fn refresh_state(&self) -> watch::Receiver<RefreshState> {
        self.inner.state.subscribe()
    }

    /// Whether the most recent refresh succeeded.
    pub fn last_update_success(&self) -> bool {
        lock(&self.inner.health).last_update_success
    }

    pub fn last_error(&self) -> Option<CoreError> {
        lock(&self.inner.health).last_error.clone()
    }

    /// Diff produced by the last successful poll.
    pub async fn last_changes(&self) -> ChangeSet {
        self.inner.manager.lock().await.last_changes().clone()
    }
}

// ── ListenerHandle ───────────────────────────────────────────────

/// Unregisters its listener when dropped.
#[must_use = "dropping the handle unsubscribes the listener"]
pub struct ListenerHandle {
    id: u64,
    inner: Weak<CoordinatorInner>,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner.listeners)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically refresh the snapshot until cancelled.
async fn refresh_task(coordinator: Coordinator, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = coordinator.request_refresh().await {
                    warn!(error = %e, "periodic refresh failed, serving stale data");
                }
            }
        }
    }
}

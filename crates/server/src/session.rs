//! Session management
//!
//! Sessions live in a concurrent map. Each one sits behind its own async mutex,
//! so a session handles one request at a time while different sessions proceed
//! independently.

use dashmap::DashMap;
use dealer_assist_agent::{SalesSession, SessionOptions};
use dealer_assist_config::DealerDomainConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex as AsyncMutex, MutexGuard};

use crate::ServerError;

/// A sales session plus what the server tracks for it
pub struct ManagedSession {
    pub session: SalesSession,
    /// Customer id once the record has been saved
    pub customer_id: Option<String>,
}

pub struct SessionEntry {
    inner: AsyncMutex<ManagedSession>,
    last_activity: Mutex<Instant>,
}

impl SessionEntry {
    fn new(session: SalesSession) -> Self {
        Self {
            inner: AsyncMutex::new(ManagedSession {
                session,
                customer_id: None,
            }),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Wait for exclusive access and mark the session active
    pub async fn lock(&self) -> MutexGuard<'_, ManagedSession> {
        let guard = self.inner.lock().await;
        *self.last_activity.lock() = Instant::now();
        guard
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }
}

pub struct SessionManager {
    sessions: DashMap<String, Arc<SessionEntry>>,
    /// Serialises the limit check with the insert
    create_lock: Mutex<()>,
    domain: Arc<DealerDomainConfig>,
    max_sessions: usize,
    rng_seed: Option<u64>,
    idle_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(domain: Arc<DealerDomainConfig>, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            create_lock: Mutex::new(()),
            domain,
            max_sessions,
            rng_seed: None,
            idle_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }

    pub fn with_rng_seed(mut self, seed: Option<u64>) -> Self {
        self.rng_seed = seed;
        self
    }

    pub fn with_timeouts(mut self, idle_timeout: Duration, cleanup_interval: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self.cleanup_interval = cleanup_interval;
        self
    }

    /// Create a session, optionally with a scenario already selected
    pub fn create(&self, scenario_id: Option<&str>) -> Result<Arc<SessionEntry>, ServerError> {
        let _slot = self.create_lock.lock();
        if self.sessions.len() >= self.max_sessions {
            return Err(ServerError::SessionLimit);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut session = SalesSession::new(
            id.clone(),
            self.domain.clone(),
            SessionOptions {
                rng_seed: self.rng_seed,
            },
        );
        if let Some(scenario_id) = scenario_id {
            session.select_scenario(scenario_id);
        }

        let entry = Arc::new(SessionEntry::new(session));
        self.sessions.insert(id.clone(), entry.clone());
        tracing::info!(session_id = %id, "Session created");
        Ok(entry)
    }

    pub fn get(&self, id: &str) -> Result<Arc<SessionEntry>, ServerError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session removed");
        }
        removed
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions idle past the timeout
    pub fn cleanup_expired(&self) -> usize {
        let before = self.sessions.len();
        let timeout = self.idle_timeout;
        self.sessions.retain(|_, entry| entry.idle_for() < timeout);
        before - self.sessions.len()
    }

    /// Periodically drop idle sessions until the returned sender sends `true`
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(removed, remaining = manager.count(), "Expired sessions removed");
                        }
                        crate::metrics::record_active_sessions(manager.count());
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Session cleanup task stopping");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

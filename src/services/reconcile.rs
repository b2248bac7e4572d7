//! Payment confirmation loop for PIX and BOLETO checkouts.
//!
//! After the invoice is opened the subscription stays PENDING until the
//! gateway sees the payment. The reconciler re-reads the subscription status
//! on a fixed cadence until it changes, a deadline passes or the owner
//! cancels it. Terminal transitions only happen from `Polling`, through a
//! single compare-and-set, so the listener is told at most once.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::models::subscription::SubscriptionStatus;

/// Where the loop reads the current subscription status from. `None` means
/// the user has no subscription mirror yet.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn current_status(&self) -> Result<Option<SubscriptionStatus>>;
}

/// Receives the outcome of a reconciliation. Called from the polling task.
pub trait ReconcileListener: Send + Sync {
    fn on_change(&self, status: SubscriptionStatus);

    fn on_timeout(&self) {}

    /// The API rejected the session while polling. The local session has
    /// already been cleared.
    fn on_session_expired(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    Polling,
    Confirmed(SubscriptionStatus),
    TimedOut,
    SessionExpired,
    Cancelled,
}

impl ReconcileState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReconcileState::Idle | ReconcileState::Polling)
    }
}

/// Result of a user-triggered "I already paid" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualCheck {
    /// The subscription is ACTIVE; the loop stopped and the listener was told.
    Confirmed(SubscriptionStatus),
    /// Not active yet. Polling carries on with its existing schedule.
    NotConfirmed(Option<SubscriptionStatus>),
    /// The loop had already finished.
    Finished(ReconcileState),
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Enters `Polling` and spawns the loop on the current tokio runtime.
    pub fn start(
        &self,
        source: Arc<dyn SubscriptionSource>,
        listener: Arc<dyn ReconcileListener>,
    ) -> ReconciliationHandle {
        let shared = Arc::new(Shared {
            id: Uuid::new_v4(),
            state: Mutex::new(ReconcileState::Polling),
            source,
            listener,
        });

        log::info!(
            "Reconciliation {} started (every {:?}, deadline {:?})",
            shared.id,
            self.config.poll_interval(),
            self.config.timeout()
        );

        let task = tokio::spawn(run(
            shared.clone(),
            Instant::now(),
            self.config.poll_interval(),
            self.config.timeout(),
        ));

        ReconciliationHandle { shared, task }
    }
}

struct Shared {
    id: Uuid,
    state: Mutex<ReconcileState>,
    source: Arc<dyn SubscriptionSource>,
    listener: Arc<dyn ReconcileListener>,
}

impl Shared {
    fn state(&self) -> ReconcileState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Moves `Polling` to `next`. Returns false if the loop already ended.
    fn finish(&self, next: ReconcileState) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *state != ReconcileState::Polling {
            return false;
        }
        *state = next;
        log::info!("Reconciliation {} -> {:?}", self.id, next);
        true
    }
}

async fn run(shared: Arc<Shared>, started: Instant, interval: Duration, timeout: Duration) {
    let mut ticker = time::interval_at(started + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut fetches = 0u32;

    loop {
        ticker.tick().await;
        if shared.state() != ReconcileState::Polling {
            return;
        }

        fetches += 1;
        match shared.source.current_status().await {
            Ok(Some(status)) if status != SubscriptionStatus::Pending => {
                if shared.finish(ReconcileState::Confirmed(status)) {
                    shared.listener.on_change(status);
                }
                return;
            }
            Ok(status) => {
                log::debug!(
                    "Reconciliation {} poll #{}: {:?}",
                    shared.id,
                    fetches,
                    status
                );
            }
            Err(e) if e.is_auth_error() => {
                if shared.finish(ReconcileState::SessionExpired) {
                    shared.listener.on_session_expired();
                }
                return;
            }
            Err(e) => {
                log::warn!(
                    "Reconciliation {} poll #{} failed, waiting for next tick: {}",
                    shared.id,
                    fetches,
                    e
                );
            }
        }

        if started.elapsed() >= timeout {
            if shared.finish(ReconcileState::TimedOut) {
                log::info!(
                    "Reconciliation {} gave up after {} polls without a status change",
                    shared.id,
                    fetches
                );
                shared.listener.on_timeout();
            }
            return;
        }
    }
}

/// Owner side of a running loop. Dropping the handle cancels the loop.
pub struct ReconciliationHandle {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl ReconciliationHandle {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> ReconcileState {
        self.shared.state()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ReconcileState::Polling
    }

    /// One immediate fetch outside the cadence. An auth error ends the loop
    /// as `SessionExpired` and is returned to the caller instead of being
    /// reported to the listener.
    pub async fn check_now(&self) -> Result<ManualCheck> {
        let state = self.shared.state();
        if state != ReconcileState::Polling {
            return Ok(ManualCheck::Finished(state));
        }

        let status = match self.shared.source.current_status().await {
            Ok(status) => status,
            Err(e) => {
                if e.is_auth_error() && self.shared.finish(ReconcileState::SessionExpired) {
                    self.task.abort();
                }
                return Err(e);
            }
        };

        match status {
            Some(SubscriptionStatus::Active) => {
                let active = SubscriptionStatus::Active;
                if self.shared.finish(ReconcileState::Confirmed(active)) {
                    self.task.abort();
                    self.shared.listener.on_change(active);
                    Ok(ManualCheck::Confirmed(active))
                } else {
                    Ok(ManualCheck::Finished(self.shared.state()))
                }
            }
            other => Ok(ManualCheck::NotConfirmed(other)),
        }
    }

    /// Stops the loop. Safe to call more than once; responses that land
    /// afterwards are discarded.
    pub fn cancel(&self) {
        if self.shared.finish(ReconcileState::Cancelled) {
            log::debug!("Reconciliation {} cancelled", self.shared.id);
        }
        self.task.abort();
    }
}

impl Drop for ReconciliationHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

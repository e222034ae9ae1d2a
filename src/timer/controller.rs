use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{modes::ModeCatalog, settings::FocusConfig};

use super::{TimerPhase, TimerSession, TimerSnapshot, Transition};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

/// Discrete notifications alongside the snapshot stream.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TimerEvent {
    SessionOpened {
        session_id: String,
        mode_id: String,
    },
    SessionClosed {
        session_id: String,
    },
    PhaseChanged {
        from: TimerPhase,
        to: TimerPhase,
    },
    StudyCompleted {
        mode_id: String,
        completed_count: u32,
        points_earned: u64,
    },
}

/// Armed clock for the live session. Dropping it disarms the clock, so
/// discarding the owning state is enough to stop any further ticks.
struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}

#[derive(Default)]
struct ControllerState {
    session: Option<TimerSession>,
    ticker: Option<Ticker>,
}

impl ControllerState {
    fn disarm(&mut self) {
        if self.ticker.take().is_some() {
            log_debug!("timer clock disarmed");
        }
    }
}

#[derive(Clone)]
struct Publisher {
    snapshots: Arc<watch::Sender<Option<TimerSnapshot>>>,
    events: broadcast::Sender<TimerEvent>,
}

impl Publisher {
    fn publish(&self, session: &TimerSession, transition: Transition) {
        if let Some((from, to)) = transition.phase_change() {
            self.emit(TimerEvent::PhaseChanged { from, to });
            if transition.completed_study() {
                self.emit(TimerEvent::StudyCompleted {
                    mode_id: session.mode().id.clone(),
                    completed_count: session.completed_count(),
                    points_earned: session.points_earned(),
                });
            }
        }
        self.snapshots.send_replace(Some(session.snapshot()));
    }

    fn clear(&self) {
        self.snapshots.send_replace(None);
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine; events are best-effort.
        let _ = self.events.send(event);
    }
}

/// Owns the timer view's session and the clock that drives it.
///
/// Every command and every tick runs to completion under one mutex, so a
/// session only ever sees one event at a time.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<ControllerState>>,
    catalog: ModeCatalog,
    tick_interval: Duration,
    publisher: Publisher,
}

impl TimerController {
    pub fn new(catalog: ModeCatalog, tick_interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            state: Arc::new(Mutex::new(ControllerState::default())),
            catalog,
            tick_interval,
            publisher: Publisher {
                snapshots: Arc::new(snapshot_tx),
                events: events_tx,
            },
        }
    }

    pub fn from_config(config: &FocusConfig) -> Result<Self> {
        Ok(Self::new(config.catalog()?, config.tick_interval()?))
    }

    pub fn catalog(&self) -> &ModeCatalog {
        &self.catalog
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TimerSnapshot>> {
        self.publisher.snapshots.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<TimerEvent> {
        self.publisher.events.subscribe()
    }

    /// `None` while choosing a mode.
    pub async fn snapshot(&self) -> Option<TimerSnapshot> {
        let guard = self.state.lock().await;
        guard.session.as_ref().map(TimerSession::snapshot)
    }

    pub async fn is_ticking(&self) -> bool {
        self.state.lock().await.ticker.is_some()
    }

    /// Opens the timer view, either on a mode picked during navigation or
    /// in mode selection when none was given.
    pub async fn open(&self, initial_mode: Option<&str>) -> Result<Option<TimerSnapshot>> {
        match initial_mode {
            Some(mode_id) => self.select_mode(mode_id).await.map(Some),
            None => {
                self.close().await;
                Ok(None)
            }
        }
    }

    /// Discards any current session and starts a fresh, idle one in `mode_id`.
    pub async fn select_mode(&self, mode_id: &str) -> Result<TimerSnapshot> {
        let mode = self
            .catalog
            .get(mode_id)
            .ok_or_else(|| anyhow!("unknown focus mode '{mode_id}'"))?;

        let mut guard = self.state.lock().await;
        self.discard_session(&mut guard);

        let session = TimerSession::new(mode);
        log_info!(
            "Opened {} session {} ({}s study)",
            session.mode().id,
            session.id(),
            session.selected_duration()
        );
        self.publisher.emit(TimerEvent::SessionOpened {
            session_id: session.id().to_string(),
            mode_id: session.mode().id.clone(),
        });
        self.publisher.publish(&session, Transition::Ignored);

        let snapshot = session.snapshot();
        guard.session = Some(session);
        Ok(snapshot)
    }

    /// Tears the view down: the clock is disarmed and the session dropped.
    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        self.discard_session(&mut guard);
        self.publisher.clear();
    }

    pub async fn start(&self) -> Transition {
        self.apply(TimerSession::start).await
    }

    pub async fn pause(&self) -> Transition {
        self.apply(TimerSession::pause).await
    }

    pub async fn resume(&self) -> Transition {
        self.apply(TimerSession::resume).await
    }

    pub async fn reset(&self) -> Transition {
        self.apply(TimerSession::reset).await
    }

    pub async fn skip_break(&self) -> Transition {
        self.apply(TimerSession::skip_break).await
    }

    pub async fn select_duration(&self, secs: u64) -> Transition {
        self.apply(|session| session.select_duration(secs)).await
    }

    async fn apply<F>(&self, command: F) -> Transition
    where
        F: FnOnce(&mut TimerSession) -> Transition,
    {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(session) = state.session.as_mut() else {
            log_debug!("timer command ignored: no session open");
            return Transition::Ignored;
        };

        let transition = command(session);
        if !transition.is_applied() {
            return transition;
        }

        let ticking = session.is_ticking();
        self.publisher.publish(session, transition);

        if ticking && state.ticker.is_none() {
            state.ticker = Some(self.spawn_ticker());
        } else if !ticking {
            state.disarm();
        }

        transition
    }

    fn discard_session(&self, state: &mut ControllerState) {
        state.disarm();
        if let Some(session) = state.session.take() {
            log_info!(
                "Closed {} session {} after {} completed study phase(s)",
                session.mode().id,
                session.id(),
                session.completed_count()
            );
            self.publisher.emit(TimerEvent::SessionClosed {
                session_id: session.id().to_string(),
            });
        }
    }

    fn spawn_ticker(&self) -> Ticker {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_ticker(
            Arc::downgrade(&self.state),
            token.clone(),
            self.tick_interval,
            self.publisher.clone(),
        ));
        log_debug!("timer clock armed ({:?} period)", self.tick_interval);

        Ticker { token, handle }
    }
}

async fn run_ticker(
    state: Weak<Mutex<ControllerState>>,
    token: CancellationToken,
    period: Duration,
    publisher: Publisher,
) {
    let mut interval = time::interval_at(time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(shared) = state.upgrade() else {
            break;
        };
        let mut guard = shared.lock().await;

        // A command may have disarmed this clock while we waited for the lock.
        if token.is_cancelled() {
            break;
        }

        let inner = &mut *guard;
        let Some(session) = inner.session.as_mut() else {
            log_warn!("timer clock fired without a session; disarming");
            inner.disarm();
            break;
        };

        let transition = session.tick();
        let still_ticking = session.is_ticking();
        if transition.is_applied() {
            publisher.publish(session, transition);
        }

        if let Some((from, to)) = transition.phase_change() {
            log_info!(
                "Session {} moved {} -> {} ({} completed)",
                session.id(),
                from.as_str(),
                to.as_str(),
                session.completed_count()
            );
        }

        if !still_ticking {
            // Dropping our own guard cancels this task at its next await.
            inner.disarm();
            break;
        }
    }
}

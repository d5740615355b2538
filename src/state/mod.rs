//! State management module for SpinFour.
//!
//! This module provides the core state types and managers:
//!
//! - `board` - Board cells and the per-move transform
//! - `rules` - Win and draw detection
//! - `lobby` - FIFO queue of waiting players
//! - `player` - Per-handle location state machine
//! - `connection` - Handle to session/color bindings
//! - `game` - Sessions and the live-session table
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             AppState                             │
//! │                                                                  │
//! │  ┌───────────────┐  ┌───────────────────┐  ┌──────────────────┐  │
//! │  │  MatchQueue   │  │ ConnectionManager │  │  SessionManager  │  │
//! │  │   (Mutex)     │  │     (RwLock)      │  │  (Arc<RwLock>)   │  │
//! │  │               │  │                   │  │                  │  │
//! │  │ oldest ..     │  │ handle →          │  │ session_id →     │  │
//! │  │   newest      │  │   {session,color} │  │  Arc<Mutex<      │  │
//! │  │               │  │                   │  │     Session>>    │  │
//! │  └───────────────┘  └───────────────────┘  └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locks are always taken in the order queue, connections, session table,
//! session. The session table is only held long enough to clone a session
//! handle out of it, so two sessions never contend with each other.

pub mod board;
pub mod connection;
pub mod game;
pub mod lobby;
pub mod player;
pub mod rules;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::GameConfig;

// Re-export commonly used types
pub use board::{Board, Cell, Color, Position, BOARD_SIZE, INNER, RING};
pub use connection::{Connection, ConnectionManager, Handle};
pub use game::{
    lock_session, EvictionTimer, GameError, MoveOutcome, Participant, PlayerNames, Session,
    SessionManager, SessionStatus, SessionView, SharedSession,
};
pub use lobby::{MatchQueue, WaitingEntry};
pub use player::{InvalidTransition, PlayerEvent, PlayerLocation, PlayerState};
pub use rules::{evaluate, Outcome, Winner};

/// Result of joining the match queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No one was waiting; the caller is now queued
    Waiting,
    /// Paired with the oldest waiting player
    SessionStarted(SessionView),
}

/// An accepted move and who should hear about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub session_id: String,
    /// White first
    pub participants: [Handle; 2],
    pub outcome: MoveOutcome,
}

/// A session that ended because a participant left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abandoned {
    pub session_id: String,
    pub remaining: Participant,
}

/// What a disconnect did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Removed from the waiting queue
    LeftQueue,
    /// Ended a live session
    Abandoned(Abandoned),
    /// Handle was not queued or playing
    Nothing,
}

/// Read-only status for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Sessions in the live table, including finished ones awaiting eviction
    pub active_session_count: usize,
    /// Sessions still being played
    pub playing_count: usize,
    pub waiting_count: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Combined game state: queue, bindings, and live sessions.
///
/// Shared by reference (typically inside an `Arc`) across every transport
/// task; all methods take `&self`.
#[derive(Debug, Default)]
pub struct AppState {
    config: GameConfig,
    queue: Mutex<MatchQueue>,
    connections: RwLock<ConnectionManager>,
    sessions: Arc<RwLock<SessionManager>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Join the match queue, or start a session with the oldest waiting
    /// player.
    ///
    /// The waiting player takes white and moves first.
    #[instrument(skip(self, name))]
    pub fn join(&self, handle: &str, name: &str) -> Result<JoinOutcome, GameError> {
        let name = self.config.display_name(name);
        let mut queue = lock(&self.queue);
        let mut connections = write(&self.connections);

        if !connections.is_idle(handle) {
            debug!("Join rejected, handle already waiting or playing");
            return Err(GameError::AlreadyJoined);
        }
        connections.upsert(handle, &name);

        let Some(opponent) = queue.pop_oldest() else {
            queue.push(WaitingEntry::new(handle, name));
            let _ = connections.apply(handle, PlayerEvent::Join);
            debug!(waiting = queue.len(), "Player queued");
            return Ok(JoinOutcome::Waiting);
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        let white = Participant::from(opponent);
        let black = Participant {
            handle: handle.to_string(),
            name,
        };

        for (participant, color) in [(&white, Color::White), (&black, Color::Black)] {
            let event = PlayerEvent::Pair {
                session_id: session_id.clone(),
                color,
            };
            if let Err(err) = connections.apply(&participant.handle, event) {
                warn!(handle = %participant.handle, %err, "Unexpected binding state while pairing");
            }
        }

        let session = Session::start(session_id.clone(), white, black);
        let view = session.view();
        write(&self.sessions).insert(session);

        info!(
            session_id = %session_id,
            white = %view.white.handle,
            black = %view.black.handle,
            "Session started"
        );
        Ok(JoinOutcome::SessionStarted(view))
    }

    /// Leave the waiting queue. Returns whether the handle was queued.
    #[instrument(skip(self))]
    pub fn leave(&self, handle: &str) -> bool {
        let mut queue = lock(&self.queue);
        if queue.remove(handle).is_none() {
            return false;
        }
        let _ = write(&self.connections).apply(handle, PlayerEvent::Leave);
        debug!(waiting = queue.len(), "Player left queue");
        true
    }

    /// Play a move in the caller's bound session.
    #[instrument(skip(self))]
    pub fn make_move(&self, handle: &str, pos: Position) -> Result<MoveReport, GameError> {
        let (session_id, color) = read(&self.connections)
            .session_of(handle)
            .ok_or(GameError::SessionNotFound)?;
        let shared = read(&self.sessions)
            .get(&session_id)
            .ok_or(GameError::SessionNotFound)?;

        let mut session = lock_session(&shared);
        let outcome = session.play(color, pos).map_err(|err| {
            debug!(session_id = %session_id, %err, "Move rejected");
            err
        })?;
        let participants = session.handles();

        if let MoveOutcome::Finished { winner, .. } = &outcome {
            let timer = self.schedule_eviction(&session_id);
            session.set_eviction(timer);
            drop(session);

            let mut connections = write(&self.connections);
            for handle in &participants {
                let _ = connections.apply(handle, PlayerEvent::SessionEnded);
            }
            info!(session_id = %session_id, %winner, "Session finished");
        } else {
            debug!(session_id = %session_id, %color, "Move accepted");
        }

        Ok(MoveReport {
            session_id,
            participants,
            outcome,
        })
    }

    /// Abandon the caller's live session.
    ///
    /// The session leaves the table immediately and both handles are
    /// released. No table-wide lock is held while waiting on the session.
    #[instrument(skip(self))]
    pub fn abandon(&self, handle: &str) -> Result<Abandoned, GameError> {
        let (session_id, _) = read(&self.connections)
            .session_of(handle)
            .ok_or(GameError::SessionNotFound)?;
        let shared = read(&self.sessions)
            .get(&session_id)
            .ok_or(GameError::SessionNotFound)?;

        let remaining = lock_session(&shared).abandon(handle)?;
        write(&self.sessions).remove(&session_id);

        let mut connections = write(&self.connections);
        for h in [handle, remaining.handle.as_str()] {
            if connections.session_of(h).map_or(false, |(id, _)| id == session_id) {
                let _ = connections.apply(h, PlayerEvent::SessionEnded);
            }
        }
        drop(connections);

        info!(session_id = %session_id, remaining = %remaining.handle, "Session abandoned");
        Ok(Abandoned {
            session_id,
            remaining,
        })
    }

    /// Handle a transport disconnect: leave the queue or abandon the
    /// session, then forget the handle.
    #[instrument(skip(self))]
    pub fn disconnect(&self, handle: &str) -> DisconnectOutcome {
        let outcome = if self.leave(handle) {
            DisconnectOutcome::LeftQueue
        } else {
            match self.abandon(handle) {
                Ok(abandoned) => DisconnectOutcome::Abandoned(abandoned),
                Err(_) => DisconnectOutcome::Nothing,
            }
        };
        write(&self.connections).remove(handle);
        outcome
    }

    /// Snapshot of a session, if still in the table.
    pub fn session(&self, session_id: &str) -> Option<SessionView> {
        let shared = read(&self.sessions).get(session_id)?;
        let view = lock_session(&shared).view();
        Some(view)
    }

    /// Where a handle currently is.
    pub fn location(&self, handle: &str) -> PlayerLocation {
        read(&self.connections)
            .get(handle)
            .map(|c| c.state.location().clone())
            .unwrap_or_default()
    }

    pub fn status(&self) -> StatusSnapshot {
        let waiting_count = lock(&self.queue).len();
        let (active_session_count, live) = {
            let sessions = read(&self.sessions);
            (sessions.count(), sessions.snapshot())
        };
        let playing_count = live
            .iter()
            .filter(|s| lock_session(s).status.is_active())
            .count();
        StatusSnapshot {
            active_session_count,
            playing_count,
            waiting_count,
        }
    }

    /// Evict finished sessions past their retention window.
    ///
    /// Only needed when no async runtime drives the eviction timers.
    pub fn sweep_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let live = read(&self.sessions).snapshot();
        let expired: Vec<String> = live
            .iter()
            .filter_map(|shared| {
                let session = lock_session(shared);
                session.is_expired(now).then(|| session.id.clone())
            })
            .collect();
        if expired.is_empty() {
            return expired;
        }

        // Finished is terminal, so the check above still holds here.
        let evicted = write(&self.sessions).remove_all(&expired);
        for id in &evicted {
            debug!(session_id = %id, "Evicted expired session");
        }
        evicted
    }

    /// Cancel all pending timers and drop every session and queue entry.
    pub fn shutdown(&self) -> usize {
        let dropped_waiting = lock(&self.queue).clear();
        let drained = write(&self.sessions).drain();
        let evicted: Vec<String> = drained
            .iter()
            .map(|shared| {
                let mut session = lock_session(shared);
                session.cancel_eviction();
                session.id.clone()
            })
            .collect();

        let mut connections = write(&self.connections);
        for handle in dropped_waiting {
            connections.remove(&handle);
        }
        for id in &evicted {
            for handle in connections.handles_in_session(id) {
                connections.remove(&handle);
            }
        }
        info!(sessions = evicted.len(), "State shut down");
        evicted.len()
    }

    /// Arm the retention timer for a finished session.
    ///
    /// The task only holds a weak reference to the session table, so it
    /// does nothing if the state has been dropped by the time it fires.
    fn schedule_eviction(&self, session_id: &str) -> EvictionTimer {
        let window = self.config.retention_window;
        let deadline = Instant::now() + window;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(session_id, "No async runtime; finished session waits for sweep_expired");
            return EvictionTimer::new(deadline, None);
        };

        let table = Arc::downgrade(&self.sessions);
        let id = session_id.to_string();
        let task = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(table) = table.upgrade() {
                evict_if_finished(&table, &id);
            }
        });
        EvictionTimer::new(deadline, Some(task.abort_handle()))
    }
}

/// Remove a session from the table if it is finished.
///
/// The status is read with the table released; the table is only locked
/// again for the removal.
fn evict_if_finished(table: &RwLock<SessionManager>, session_id: &str) -> bool {
    let Some(shared) = read(table).get(session_id) else {
        return false;
    };
    if lock_session(&shared).status != SessionStatus::Finished {
        return false;
    }
    let evicted = write(table).remove(session_id).is_some();
    if evicted {
        debug!(session_id, "Evicted finished session");
    }
    evicted
}

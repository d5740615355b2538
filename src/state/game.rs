//! Game session state.
//!
//! A session is created already `Playing` by the matchmaker and moves to
//! `Finished` or `Abandoned`, both terminal. Each session sits behind its
//! own mutex in the [`SessionManager`], so moves on one session never wait
//! on another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::AbortHandle;

use super::board::{Board, Color, Position};
use super::connection::Handle;
use super::lobby::WaitingEntry;
use super::rules::{self, Winner};

/// Default retention before a finished session is evicted.
pub const DEFAULT_RETENTION_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Session state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Game in progress
    Playing,
    /// Someone won or the board filled up
    Finished,
    /// A participant left mid-game
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Finished => "finished",
            Self::Abandoned => "abandoned",
        }
    }

    /// Check if session accepts moves.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Caller-visible errors. Each rejects one request and changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameError {
    #[error("Game not found")]
    SessionNotFound,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Cell already occupied")]
    CellOccupied,
    #[error("Invalid coordinate")]
    InvalidCoordinate,
    #[error("Already waiting or playing")]
    AlreadyJoined,
}

impl GameError {
    /// Stable code sent as the error reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::NotYourTurn => "not_your_turn",
            Self::CellOccupied => "cell_occupied",
            Self::InvalidCoordinate => "invalid_coordinate",
            Self::AlreadyJoined => "already_joined",
        }
    }
}

/// One of the two players bound to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub handle: Handle,
    pub name: String,
}

impl From<WaitingEntry> for Participant {
    fn from(entry: WaitingEntry) -> Self {
        Self {
            handle: entry.handle,
            name: entry.name,
        }
    }
}

/// Display names by color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerNames {
    pub white: String,
    pub black: String,
}

/// Result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Turn passed to the other color
    Continue { board: Board, turn: Color },
    /// Session is now finished
    Finished { board: Board, winner: Winner },
}

/// Deferred eviction of a finished session.
///
/// Holds the deadline and, when an async runtime was available, the task
/// that will evict the session. Dropping the timer aborts the task.
#[derive(Debug)]
pub struct EvictionTimer {
    deadline: Instant,
    task: Option<AbortHandle>,
}

impl EvictionTimer {
    pub fn new(deadline: Instant, task: Option<AbortHandle>) -> Self {
        Self { deadline, task }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for EvictionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Serializable point-in-time copy of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub board: Board,
    pub turn: Color,
    pub status: SessionStatus,
    pub winner: Option<Winner>,
    pub white: Participant,
    pub black: Participant,
    pub move_count: u32,
}

impl SessionView {
    pub fn names(&self) -> PlayerNames {
        PlayerNames {
            white: self.white.name.clone(),
            black: self.black.name.clone(),
        }
    }

    pub fn participant(&self, color: Color) -> &Participant {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }
}

/// Game session state.
#[derive(Debug)]
pub struct Session {
    /// Unique session ID
    pub id: String,

    /// Current board
    pub board: Board,

    /// Color to move
    pub turn: Color,

    /// Current status
    pub status: SessionStatus,

    /// Set once finished
    pub winner: Option<Winner>,

    /// Player who waited in the queue
    white: Participant,

    /// Player whose join completed the pairing
    black: Participant,

    /// Accepted moves so far
    pub move_count: u32,

    /// Pending eviction, set once finished
    eviction: Option<EvictionTimer>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Session {
    /// Start a session between two players. White moves first.
    pub fn start(id: String, white: Participant, black: Participant) -> Self {
        Self {
            id,
            board: Board::new(),
            turn: Color::White,
            status: SessionStatus::Playing,
            winner: None,
            white,
            black,
            move_count: 0,
            eviction: None,
            created_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    pub fn participant(&self, color: Color) -> &Participant {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Color bound to a handle, if it belongs to this session.
    pub fn color_of(&self, handle: &str) -> Option<Color> {
        if self.white.handle == handle {
            Some(Color::White)
        } else if self.black.handle == handle {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Both handles, white first.
    pub fn handles(&self) -> [Handle; 2] {
        [self.white.handle.clone(), self.black.handle.clone()]
    }

    /// Play a move for `color`.
    ///
    /// Checks run in a fixed order and the first failure is returned with
    /// the session untouched.
    pub fn play(&mut self, color: Color, pos: Position) -> Result<MoveOutcome, GameError> {
        if !self.status.is_active() {
            return Err(GameError::SessionNotFound);
        }
        if color != self.turn {
            return Err(GameError::NotYourTurn);
        }
        if !self.board.is_empty_at(pos) {
            return Err(GameError::CellOccupied);
        }

        self.board = self.board.apply(pos, color);
        self.move_count += 1;

        match rules::evaluate(&self.board).winner() {
            Some(winner) => {
                self.status = SessionStatus::Finished;
                self.winner = Some(winner);
                self.finished_at = Some(chrono::Utc::now());
                Ok(MoveOutcome::Finished {
                    board: self.board,
                    winner,
                })
            }
            None => {
                self.turn = self.turn.opponent();
                Ok(MoveOutcome::Continue {
                    board: self.board,
                    turn: self.turn,
                })
            }
        }
    }

    /// Abandon the session on behalf of `handle`.
    ///
    /// Returns the participant left behind. Any pending eviction is
    /// cancelled since the session is dropped right away.
    pub fn abandon(&mut self, handle: &str) -> Result<Participant, GameError> {
        if !self.status.is_active() {
            return Err(GameError::SessionNotFound);
        }
        let color = self.color_of(handle).ok_or(GameError::SessionNotFound)?;

        self.status = SessionStatus::Abandoned;
        self.finished_at = Some(chrono::Utc::now());
        self.cancel_eviction();

        Ok(self.participant(color.opponent()).clone())
    }

    /// Attach the eviction timer, replacing any earlier one.
    pub fn set_eviction(&mut self, timer: EvictionTimer) {
        self.eviction = Some(timer);
    }

    pub fn cancel_eviction(&mut self) {
        if let Some(mut timer) = self.eviction.take() {
            timer.cancel();
        }
    }

    /// Whether a finished session has outlived its retention window.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.status == SessionStatus::Finished
            && self.eviction.as_ref().map_or(false, |t| t.is_due(now))
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id.clone(),
            board: self.board,
            turn: self.turn,
            status: self.status,
            winner: self.winner,
            white: self.white.clone(),
            black: self.black.clone(),
            move_count: self.move_count,
        }
    }

    /// Convert session state to JSON snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": self.id,
            "status": self.status.as_str(),
            "board": self.board.to_json(),
            "turn": self.turn.as_str(),
            "winner": self.winner.map(|w| w.as_str()),
            "players": {
                "white": self.white.name,
                "black": self.black.name
            },
            "move_count": self.move_count,
            "created_at": self.created_at,
            "finished_at": self.finished_at
        })
    }
}

/// A session behind its own lock.
pub type SharedSession = Arc<Mutex<Session>>;

/// Lock a session, recovering the guard if a holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session manager - the live-session table.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<String, SharedSession>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session, returning its shared handle.
    pub fn insert(&mut self, session: Session) -> SharedSession {
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(id, Arc::clone(&shared));
        shared
    }

    /// Get a session.
    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.get(session_id).cloned()
    }

    /// Remove a session.
    pub fn remove(&mut self, session_id: &str) -> Option<SharedSession> {
        self.sessions.remove(session_id)
    }

    /// Shared handles to every session in the table.
    ///
    /// Callers lock the sessions after releasing the table.
    pub fn snapshot(&self) -> Vec<SharedSession> {
        self.sessions.values().cloned().collect()
    }

    /// Remove several sessions, returning the ids that were present.
    pub fn remove_all(&mut self, session_ids: &[String]) -> Vec<String> {
        session_ids
            .iter()
            .filter(|id| self.sessions.remove(id.as_str()).is_some())
            .cloned()
            .collect()
    }

    /// Empty the table, handing back the removed sessions.
    pub fn drain(&mut self) -> Vec<SharedSession> {
        self.sessions.drain().map(|(_, s)| s).collect()
    }

    /// Total sessions in the table, finished ones included.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

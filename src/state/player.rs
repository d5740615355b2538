//! Player location state machine.
//!
//! Tracks where a connection handle is in the matchmaking flow and
//! validates transitions.
//!
//! # State Diagram
//!
//! ```text
//! ┌──────────┐   join    ┌──────────┐
//! │   Idle   │──────────▶│  Queued  │
//! └──────────┘◀──────────└────┬─────┘
//!   ▲    │       leave        │
//!   │    │ pair               │ pair
//!   │    ▼                    │
//!   │  ┌──────────────────┐   │
//!   └──│     Playing      │◀──┘
//!      └──────────────────┘
//!        session_ended
//! ```
//!
//! A player who joins while someone is already waiting goes straight from
//! `Idle` to `Playing`.

use std::fmt;

use super::board::Color;

/// Where a handle currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlayerLocation {
    /// Known but neither queued nor playing
    #[default]
    Idle,

    /// Waiting in the match queue
    Queued,

    /// Bound to a live session with a color
    Playing { session_id: String, color: Color },
}

impl PlayerLocation {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Get the session ID and color if playing.
    pub fn session(&self) -> Option<(&str, Color)> {
        match self {
            Self::Playing { session_id, color } => Some((session_id, *color)),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Queued => write!(f, "Queued"),
            Self::Playing { session_id, color } => {
                write!(f, "Playing({}, {})", session_id, color)
            }
        }
    }
}

/// State transition events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Join,
    Leave,
    Pair { session_id: String, color: Color },
    SessionEnded,
}

/// Error when a state transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: PlayerLocation,
    pub event: PlayerEvent,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid transition from {} via {:?}: {}",
            self.from, self.event, self.reason
        )
    }
}

impl std::error::Error for InvalidTransition {}

/// Player state machine.
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    location: PlayerLocation,
}

impl PlayerState {
    /// Create a new idle player state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self) -> &PlayerLocation {
        &self.location
    }

    /// Apply an event, returning the new state or an error.
    pub fn apply(&self, event: PlayerEvent) -> Result<Self, InvalidTransition> {
        let location = self.transition(&event)?;
        Ok(Self { location })
    }

    /// Apply an event in place, returning error if invalid.
    pub fn apply_mut(&mut self, event: PlayerEvent) -> Result<(), InvalidTransition> {
        self.location = self.transition(&event)?;
        Ok(())
    }

    fn transition(&self, event: &PlayerEvent) -> Result<PlayerLocation, InvalidTransition> {
        use PlayerEvent::*;
        use PlayerLocation::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self.location.clone(),
            event: event.clone(),
            reason,
        };

        match (&self.location, event) {
            (Idle, Join) => Ok(Queued),
            (Queued, Join) => Err(invalid("Already waiting")),
            (Playing { .. }, Join) => Err(invalid("Already in a game")),

            (Queued, Leave) => Ok(Idle),
            (_, Leave) => Err(invalid("Not waiting")),

            (Idle | Queued, Pair { session_id, color }) => Ok(Playing {
                session_id: session_id.clone(),
                color: *color,
            }),
            (Playing { .. }, Pair { .. }) => Err(invalid("Already in a game")),

            (Playing { .. }, SessionEnded) => Ok(Idle),
            (_, SessionEnded) => Err(invalid("Not in a game")),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.location.is_idle()
    }

    pub fn session(&self) -> Option<(&str, Color)> {
        self.location.session()
    }
}

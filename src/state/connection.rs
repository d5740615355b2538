//! Connection bindings.
//!
//! Associates each transport handle with a display name and a location
//! (idle, queued, or bound to a session with a color). The transport keeps
//! no game state of its own; everything it needs to route an event is
//! looked up here.

use std::collections::HashMap;

use super::board::Color;
use super::player::{InvalidTransition, PlayerEvent, PlayerState};

/// Opaque per-connection identifier assigned by the transport.
pub type Handle = String;

/// Binding state for a single handle.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Transport handle
    pub handle: Handle,

    /// Display name given on the last join
    pub name: String,

    /// Location state machine
    pub state: PlayerState,
}

impl Connection {
    pub fn new(handle: impl Into<Handle>, name: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            name: name.into(),
            state: PlayerState::new(),
        }
    }

    /// Session ID and color if bound to a session.
    pub fn session(&self) -> Option<(&str, Color)> {
        self.state.session()
    }
}

/// Connection manager - handle to binding table.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: HashMap<Handle, Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a connection by handle.
    pub fn get(&self, handle: &str) -> Option<&Connection> {
        self.connections.get(handle)
    }

    /// Get or create the binding for a handle, updating its display name.
    pub fn upsert(&mut self, handle: &str, name: &str) -> &mut Connection {
        let conn = self
            .connections
            .entry(handle.to_string())
            .or_insert_with(|| Connection::new(handle, name));
        conn.name = name.to_string();
        conn
    }

    /// Apply a location event to a known handle.
    ///
    /// Unknown handles are created idle before the event is applied.
    pub fn apply(&mut self, handle: &str, event: PlayerEvent) -> Result<(), InvalidTransition> {
        self.connections
            .entry(handle.to_string())
            .or_insert_with(|| Connection::new(handle, ""))
            .state
            .apply_mut(event)
    }

    /// Check if a handle is free to join the queue.
    pub fn is_idle(&self, handle: &str) -> bool {
        self.connections
            .get(handle)
            .map_or(true, |c| c.state.is_idle())
    }

    /// Session binding for a handle.
    pub fn session_of(&self, handle: &str) -> Option<(String, Color)> {
        self.connections
            .get(handle)
            .and_then(|c| c.session())
            .map(|(id, color)| (id.to_string(), color))
    }

    /// Forget a handle entirely.
    pub fn remove(&mut self, handle: &str) -> Option<Connection> {
        self.connections.remove(handle)
    }

    /// Handles bound to a given session.
    pub fn handles_in_session(&self, session_id: &str) -> Vec<Handle> {
        self.connections
            .values()
            .filter(|c| c.session().map(|(id, _)| id) == Some(session_id))
            .map(|c| c.handle.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::player::PlayerLocation;

    fn pair(session_id: &str, color: Color) -> PlayerEvent {
        PlayerEvent::Pair {
            session_id: session_id.to_string(),
            color,
        }
    }

    #[test]
    fn test_unknown_handle_is_idle() {
        let manager = ConnectionManager::new();
        assert!(manager.is_idle("nobody"));
        assert!(manager.session_of("nobody").is_none());
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut manager = ConnectionManager::new();
        manager.upsert("h1", "Alice");
        manager.apply("h1", PlayerEvent::Join).unwrap();
        manager.apply("h1", pair("s-1", Color::White)).unwrap();
        manager.apply("h2", pair("s-1", Color::Black)).unwrap();

        assert_eq!(manager.session_of("h1"), Some(("s-1".to_string(), Color::White)));
        assert_eq!(manager.session_of("h2"), Some(("s-1".to_string(), Color::Black)));
        assert_eq!(manager.get("h1").unwrap().name, "Alice");

        let mut handles = manager.handles_in_session("s-1");
        handles.sort();
        assert_eq!(handles, vec!["h1".to_string(), "h2".to_string()]);
    }

    #[test]
    fn test_session_end_releases_binding() {
        let mut manager = ConnectionManager::new();
        manager.apply("h1", pair("s-1", Color::White)).unwrap();
        manager.apply("h1", PlayerEvent::SessionEnded).unwrap();

        assert!(manager.is_idle("h1"));
        assert!(manager.session_of("h1").is_none());
        assert_eq!(manager.get("h1").unwrap().state.location(), &PlayerLocation::Idle);
    }

    #[test]
    fn test_invalid_event_is_rejected() {
        let mut manager = ConnectionManager::new();
        assert!(manager.apply("h1", PlayerEvent::Leave).is_err());
        assert!(manager.is_idle("h1"));
    }

    #[test]
    fn test_remove() {
        let mut manager = ConnectionManager::new();
        manager.upsert("h1", "Alice");
        assert!(manager.remove("h1").is_some());
        assert!(manager.get("h1").is_none());
        assert!(manager.remove("h1").is_none());
    }
}

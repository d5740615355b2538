//! Wire events between the game core and the transport.
//!
//! The transport decodes each inbound message into a [`ClientEvent`], hands
//! it to [`AppState::handle_event`] with the sender's handle, and delivers
//! every returned [`Outbound`] to its recipient. Nothing here touches a
//! socket.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::{
    AppState, Board, Color, DisconnectOutcome, GameError, JoinOutcome, MoveOutcome, PlayerNames,
    Position, SessionView, StatusSnapshot, Winner,
};

/// Events a client can send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    Join {
        #[serde(default)]
        name: String,
    },
    /// Coordinates are kept raw so malformed ones can be reported as
    /// `InvalidCoordinate` rather than failing the whole message.
    Move {
        #[serde(default)]
        row: serde_json::Value,
        #[serde(default)]
        col: serde_json::Value,
    },
    Disconnect,
}

impl ClientEvent {
    pub fn join(name: impl Into<String>) -> Self {
        Self::Join { name: name.into() }
    }

    pub fn play(row: i64, col: i64) -> Self {
        Self::Move {
            row: row.into(),
            col: col.into(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Validated target of a move event.
    pub fn position(&self) -> Option<Result<Position, GameError>> {
        match self {
            Self::Move { row, col } => Some(match (row.as_i64(), col.as_i64()) {
                (Some(row), Some(col)) => Position::try_new(row, col),
                _ => Err(GameError::InvalidCoordinate),
            }),
            _ => None,
        }
    }
}

/// Events the core asks the transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Queued with no opponent yet
    Waiting,
    #[serde(rename_all = "camelCase")]
    GameStart {
        session_id: String,
        board: Board,
        turn: Color,
        participant_names: PlayerNames,
        your_color: Color,
    },
    GameUpdate {
        board: Board,
        turn: Color,
    },
    GameOver {
        winner: Winner,
        board: Board,
    },
    PlayerLeft,
    Error {
        reason: GameError,
        message: String,
    },
}

impl ServerEvent {
    pub fn error(err: GameError) -> Self {
        Self::Error {
            reason: err,
            message: err.to_string(),
        }
    }

    /// Event name as seen on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::GameStart { .. } => "gameStart",
            Self::GameUpdate { .. } => "gameUpdate",
            Self::GameOver { .. } => "gameOver",
            Self::PlayerLeft => "playerLeft",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// An event addressed to one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: String,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn new(to: impl Into<String>, event: ServerEvent) -> Self {
        Self {
            to: to.into(),
            event,
        }
    }
}

fn game_start(view: &SessionView) -> Vec<Outbound> {
    [Color::White, Color::Black]
        .into_iter()
        .map(|color| {
            Outbound::new(
                view.participant(color).handle.clone(),
                ServerEvent::GameStart {
                    session_id: view.id.clone(),
                    board: view.board,
                    turn: view.turn,
                    participant_names: view.names(),
                    your_color: color,
                },
            )
        })
        .collect()
}

impl AppState {
    /// Apply one inbound event and return what to deliver.
    ///
    /// Validation failures produce a single `error` for the sender and no
    /// other output.
    pub fn handle_event(&self, handle: &str, event: ClientEvent) -> Vec<Outbound> {
        let result = match &event {
            ClientEvent::Join { name } => self.join(handle, name).map(|outcome| match outcome {
                JoinOutcome::Waiting => vec![Outbound::new(handle, ServerEvent::Waiting)],
                JoinOutcome::SessionStarted(view) => game_start(&view),
            }),
            ClientEvent::Move { .. } => event
                .position()
                .unwrap_or(Err(GameError::InvalidCoordinate))
                .and_then(|pos| self.make_move(handle, pos))
                .map(|report| {
                    let event = match report.outcome {
                        MoveOutcome::Continue { board, turn } => {
                            ServerEvent::GameUpdate { board, turn }
                        }
                        MoveOutcome::Finished { board, winner } => {
                            ServerEvent::GameOver { winner, board }
                        }
                    };
                    report
                        .participants
                        .into_iter()
                        .map(|to| Outbound::new(to, event.clone()))
                        .collect()
                }),
            ClientEvent::Disconnect => Ok(match self.disconnect(handle) {
                DisconnectOutcome::Abandoned(abandoned) => {
                    vec![Outbound::new(abandoned.remaining.handle, ServerEvent::PlayerLeft)]
                }
                DisconnectOutcome::LeftQueue | DisconnectOutcome::Nothing => Vec::new(),
            }),
        };

        result.unwrap_or_else(|err| {
            debug!(handle, reason = err.code(), "Rejected client event");
            vec![Outbound::new(handle, ServerEvent::error(err))]
        })
    }

    /// Decode a raw JSON message and apply it.
    ///
    /// Messages that are not valid events at all are answered like a bad
    /// move, since coordinates are the only client-controlled payload.
    pub fn handle_json(&self, handle: &str, raw: &str) -> Vec<Outbound> {
        match ClientEvent::from_json(raw) {
            Ok(event) => self.handle_event(handle, event),
            Err(err) => {
                debug!(handle, %err, "Malformed client message");
                vec![Outbound::new(
                    handle,
                    ServerEvent::error(GameError::InvalidCoordinate),
                )]
            }
        }
    }

    /// Status snapshot as served to monitoring.
    pub fn status_json(&self) -> serde_json::Value {
        let status: StatusSnapshot = self.status();
        serde_json::to_value(status).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_events() {
        assert_eq!(
            ClientEvent::from_json(r#"{"type":"join","name":"Alice"}"#).unwrap(),
            ClientEvent::join("Alice")
        );
        assert_eq!(
            ClientEvent::from_json(r#"{"type":"join"}"#).unwrap(),
            ClientEvent::join("")
        );
        assert_eq!(
            ClientEvent::from_json(r#"{"type":"move","row":1,"col":2}"#).unwrap(),
            ClientEvent::play(1, 2)
        );
        assert_eq!(
            ClientEvent::from_json(r#"{"type":"disconnect"}"#).unwrap(),
            ClientEvent::Disconnect
        );
    }

    #[test]
    fn test_malformed_coordinates_normalize() {
        let cases = [
            r#"{"type":"move"}"#,
            r#"{"type":"move","row":1}"#,
            r#"{"type":"move","row":"1","col":2}"#,
            r#"{"type":"move","row":1.5,"col":2}"#,
            r#"{"type":"move","row":4,"col":0}"#,
            r#"{"type":"move","row":0,"col":-1}"#,
        ];
        for raw in cases {
            let event = ClientEvent::from_json(raw).unwrap();
            assert_eq!(event.position(), Some(Err(GameError::InvalidCoordinate)), "{}", raw);
        }
        assert_eq!(ClientEvent::Disconnect.position(), None);
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::GameStart {
            session_id: "s-1".to_string(),
            board: Board::new(),
            turn: Color::White,
            participant_names: PlayerNames {
                white: "Alice".to_string(),
                black: "Bob".to_string(),
            },
            your_color: Color::Black,
        };
        let json = event.to_json();
        assert_eq!(json["type"], "gameStart");
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["turn"], "white");
        assert_eq!(json["yourColor"], "black");
        assert_eq!(json["participantNames"]["white"], "Alice");
        assert_eq!(json["participantNames"]["black"], "Bob");
        assert!(json.get("players").is_none());
        assert_eq!(json["board"][3][3], serde_json::Value::Null);

        let json = ServerEvent::error(GameError::CellOccupied).to_json();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "error",
                "reason": "cell_occupied",
                "message": "Cell already occupied"
            })
        );

        assert_eq!(ServerEvent::Waiting.to_json(), serde_json::json!({"type": "waiting"}));
        assert_eq!(ServerEvent::PlayerLeft.name(), "playerLeft");
    }

    #[test]
    fn test_join_emits_waiting_then_game_start() {
        let app = AppState::new();

        let out = app.handle_event("p1", ClientEvent::join("Alice"));
        assert_eq!(out, vec![Outbound::new("p1", ServerEvent::Waiting)]);

        let out = app.handle_event("p2", ClientEvent::join("Bob"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].to, "p1");
        assert_eq!(out[1].to, "p2");
        match (&out[0].event, &out[1].event) {
            (
                ServerEvent::GameStart { your_color: first, participant_names, turn, .. },
                ServerEvent::GameStart { your_color: second, .. },
            ) => {
                assert_eq!(*first, Color::White);
                assert_eq!(*second, Color::Black);
                assert_eq!(*turn, Color::White);
                assert_eq!(participant_names.black, "Bob");
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn test_move_broadcasts_update_to_both() {
        let app = AppState::new();
        app.handle_event("p1", ClientEvent::join("Alice"));
        app.handle_event("p2", ClientEvent::join("Bob"));

        let out = app.handle_event("p1", ClientEvent::play(0, 0));
        let expected = ServerEvent::GameUpdate {
            board: Board::new().apply(Position::try_new(0, 0).unwrap(), Color::White),
            turn: Color::Black,
        };
        assert_eq!(
            out,
            vec![
                Outbound::new("p1", expected.clone()),
                Outbound::new("p2", expected),
            ]
        );
    }

    #[test]
    fn test_errors_go_only_to_sender() {
        let app = AppState::new();
        app.handle_event("p1", ClientEvent::join("Alice"));
        app.handle_event("p2", ClientEvent::join("Bob"));

        let out = app.handle_event("p2", ClientEvent::play(0, 0));
        assert_eq!(out, vec![Outbound::new("p2", ServerEvent::error(GameError::NotYourTurn))]);

        let out = app.handle_event("p1", ClientEvent::play(9, 0));
        assert_eq!(
            out,
            vec![Outbound::new("p1", ServerEvent::error(GameError::InvalidCoordinate))]
        );

        let out = app.handle_json("p1", "not json");
        assert_eq!(
            out,
            vec![Outbound::new("p1", ServerEvent::error(GameError::InvalidCoordinate))]
        );

        let out = app.handle_event("p3", ClientEvent::play(0, 0));
        assert_eq!(
            out,
            vec![Outbound::new("p3", ServerEvent::error(GameError::SessionNotFound))]
        );
    }

    #[test]
    fn test_status_json() {
        let app = AppState::new();
        app.handle_event("p1", ClientEvent::join("Alice"));
        assert_eq!(
            app.status_json(),
            serde_json::json!({"activeSessionCount": 0, "playingCount": 0, "waitingCount": 1})
        );
    }
}

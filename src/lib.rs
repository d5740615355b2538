//! SpinFour State Library
//!
//! This crate provides the game session core for SpinFour, a two-player
//! game on a 4x4 board whose inner block turns clockwise and whose outer
//! ring turns counter-clockwise after every move.
//!
//! # Overview
//!
//! - **Board Transform** - Pure `Board -> Board` function: place, rotate the
//!   inner zone, shift the outer ring.
//!
//! - **Win Detection** - Rows, then columns, then diagonals; a full board with
//!   no line is a draw.
//!
//! - **Matchmaking** - FIFO queue pairing anonymous players into sessions.
//!
//! - **Sessions** - Per-game state machine (`Playing -> Finished | Abandoned`)
//!   with deferred eviction of finished games.
//!
//! - **Protocol** - Inbound/outbound events exchanged with the transport.
//!
//! # Design Principles
//!
//! 1. **Boards are values** - Every transform returns a new board.
//!
//! 2. **One lock per session** - Moves in different sessions never contend.
//!
//! 3. **No networking** - The transport owns sockets; this crate only says
//!    what to send to whom.
//!
//! # Example
//!
//! ```rust
//! use spinfour_state::protocol::{ClientEvent, ServerEvent};
//! use spinfour_state::state::{AppState, Color};
//!
//! let app = AppState::new();
//!
//! // First player waits
//! let out = app.handle_event("conn-1", ClientEvent::join("Alice"));
//! assert_eq!(out[0].event, ServerEvent::Waiting);
//!
//! // Second player completes the pair; both get gameStart
//! let out = app.handle_event("conn-2", ClientEvent::join("Bob"));
//! assert_eq!(out.len(), 2);
//!
//! // White (the player who waited) moves first
//! let out = app.handle_event("conn-1", ClientEvent::play(0, 0));
//! match &out[0].event {
//!     ServerEvent::GameUpdate { turn, .. } => assert_eq!(*turn, Color::Black),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

pub mod config;
pub mod protocol;
pub mod state;

pub use config::GameConfig;
pub use protocol::{ClientEvent, Outbound, ServerEvent};
// Re-export everything from state module at crate root
pub use state::*;

//! Session state for phrasecast.
//!
//! - `connection` - opaque transport handles
//! - `player` - players and the colour palette
//! - `code` - session code candidates
//! - `session` - the per-session state machine
//! - `registry` - live sessions and the connection binding index
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      SessionRegistry                         │
//! │                                                              │
//! │   RwLock<Index>                         Mutex<CodeGenerator> │
//! │   ┌───────────────────────────────┐                          │
//! │   │ code -> Arc<Mutex<GameSession>>│                          │
//! │   │ connection -> code             │                          │
//! │   └───────────────────────────────┘                          │
//! │                                                              │
//! │   GameSession (one lock each)                                │
//! │                                                              │
//! │     Waiting ──start──▶ Playing ──correct guess──▶ Finished   │
//! │        ▲                  │  ▲                               │
//! │        └─guesser leaves───┘  └─add_word / wrong guess        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use phrasecast::state::{ConnectionId, Deal, SessionRegistry, SessionState};
//!
//! let registry = SessionRegistry::new();
//! let code = registry
//!     .create_session(ConnectionId(1), "Ava".to_string())
//!     .unwrap()
//!     .code()
//!     .to_string();
//! registry.join_session(&code, ConnectionId(2), "Ben".to_string()).unwrap();
//!
//! let session = registry
//!     .start_session(&code, ConnectionId(1), |_| Deal {
//!         subject: "Moon".to_string(),
//!         guesser_index: 0,
//!     })
//!     .unwrap();
//! assert_eq!(session.state(), SessionState::Playing);
//! ```

pub mod code;
pub mod connection;
pub mod player;
pub mod registry;
pub mod session;

pub use code::{CodeGenerator, DEFAULT_CODE_DIGITS};
pub use connection::{ConnectionId, ConnectionIds};
pub use player::{Player, PlayerColor, WINNING_SCORE};
pub use registry::{RemovalOutcome, SessionGuard, SessionRegistry, SharedSession};
pub use session::{
    Deal, Departure, GameSession, GuessOutcome, Rejection, SentenceEntry, SessionState, MIN_PLAYERS,
};

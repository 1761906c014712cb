//! Phrasecast
//!
//! A turn-based party game served over TCP. Players join a session with a
//! short numeric code; one of them is the guesser and the rest take turns
//! adding single words to a shared sentence that hints at a secret subject.
//! The guesser wins the round by naming the subject.
//!
//! # Layout
//!
//! - [`state`] - sessions, players and the registry that binds connections
//! - [`words`] - dictionary validation and the subject list
//! - [`dealer`] - subject and guesser selection
//! - [`protocol`] - the JSON line protocol in both directions
//! - [`router`] - applies inbound events and fans out the results
//! - [`server`] - the TCP listener and per-connection tasks
//! - [`bot`] - automated players
//! - [`config`] - command-line options and logging
//!
//! The state layer does no I/O. Everything above it reports failures to the
//! offending connection as an `error` event and keeps serving.

pub mod bot;
pub mod config;
pub mod dealer;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;
pub mod words;

pub use state::*;

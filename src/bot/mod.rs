//! Automated players.
//!
//! - `policy` - when to add a word and when to guess
//! - `signal` - what a server `error` means to a bot
//! - `generator` - where words and guesses come from, with retries
//! - `chat` - a generator backed by a chat-completions service
//! - `player` - the event loop over one TCP connection

pub mod chat;
pub mod generator;
pub mod player;
pub mod policy;
pub mod signal;

pub use chat::{ChatGenerator, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL};
pub use generator::{GuessPrompt, LexiconGenerator, Retry, TextGenerator, WordPrompt, FILLER_WORDS};
pub use player::{Bot, BotOutcome, BotSettings, BotState, Reaction};
pub use policy::{decide, guess_probability, Action};
pub use signal::ErrorSignal;

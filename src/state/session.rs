//! Game session state machine.
//!
//! A session moves `Waiting -> Playing -> Finished`. Every mutating method
//! checks all of its preconditions before touching any field, so a rejected
//! call leaves the session exactly as it was.
//!
//! # Turn rotation
//!
//! Turns follow join order and always skip the guesser. With two players the
//! only non-guesser therefore adds every word.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::connection::ConnectionId;
use super::player::{Player, PlayerColor, WINNING_SCORE};
use crate::words::WordValidator;

/// Players needed before the host may start.
pub const MIN_PLAYERS: usize = 2;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Accepting joins
    #[default]
    Waiting,
    /// Round in progress
    Playing,
    /// Subject guessed; the session is torn down right after
    Finished,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }
}

/// One word of the shared sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceEntry {
    pub word: String,
    pub player: String,
    pub color: PlayerColor,
}

/// Random choices made when a round starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub subject: String,
    pub guesser_index: usize,
}

/// Result of an accepted guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    Incorrect { guesser: String },
    Correct { winner: String },
}

/// What happened to the session when a player left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Nobody is left; the session must be destroyed
    Emptied,
    /// Left while waiting, or a word builder left mid-round
    Continued,
    /// The guesser left or too few players remain; back to `Waiting`
    RoundAbandoned,
}

/// Reasons an inbound action is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyInSession,
    SessionNotFound,
    NotWaiting,
    NotPlaying,
    NameTaken,
    NotHost,
    TooFewPlayers,
    NotYourTurn,
    NotGuesser,
    InvalidWordShape,
    UnknownWord,
    EmptyGuess,
    MalformedEvent,
    /// Every session code is in use
    ServerFull,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInSession => write!(f, "You are already in a game"),
            Self::SessionNotFound => write!(f, "Game not found"),
            Self::NotWaiting => write!(f, "Game has already started"),
            Self::NotPlaying => write!(f, "Game is not in playing state"),
            Self::NameTaken => write!(f, "Name already taken"),
            Self::NotHost => write!(f, "Only host can start the game"),
            Self::TooFewPlayers => write!(f, "Need at least 2 players to start"),
            Self::NotYourTurn => write!(f, "Not your turn"),
            Self::NotGuesser => write!(f, "You are not the guesser"),
            Self::InvalidWordShape => write!(f, "Invalid word - only letters are allowed"),
            Self::UnknownWord => write!(f, "Not a valid English word"),
            Self::EmptyGuess => write!(f, "Guess cannot be empty"),
            Self::MalformedEvent => write!(f, "Malformed event"),
            Self::ServerFull => write!(f, "Server is full, try again later"),
        }
    }
}

impl std::error::Error for Rejection {}

/// One game instance, keyed by its code.
#[derive(Debug, Clone)]
pub struct GameSession {
    code: String,

    /// Join order; also the turn rotation
    players: Vec<Player>,

    sentence: Vec<SentenceEntry>,

    current_turn_index: usize,

    /// Set while `Playing`/`Finished`
    guesser_index: Option<usize>,

    /// Hidden from the guesser; set iff `Playing`/`Finished`
    subject: Option<String>,

    state: SessionState,

    /// Set once the registry has dropped this session
    retired: bool,

    pub created_at: DateTime<Utc>,

    pub started_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// Create a waiting session whose only player is the host.
    pub fn new(code: String, host: ConnectionId, host_name: String) -> Self {
        Self {
            code,
            players: vec![Player::host(host, host_name)],
            sentence: Vec::new(),
            current_turn_index: 0,
            guesser_index: None,
            subject: None,
            state: SessionState::Waiting,
            retired: false,
            created_at: Utc::now(),
            started_at: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn sentence(&self) -> &[SentenceEntry] {
        &self.sentence
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    pub fn guesser_index(&self) -> Option<usize> {
        self.guesser_index
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Mark the session as dropped from the registry. Anyone still holding a
    /// handle treats it as gone.
    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn player_index(&self, connection: ConnectionId) -> Option<usize> {
        self.players.iter().position(|p| p.connection == connection)
    }

    pub fn player(&self, connection: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection == connection)
    }

    pub fn has_connection(&self, connection: ConnectionId) -> bool {
        self.player_index(connection).is_some()
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    /// Player whose turn it is to add a word.
    pub fn current_player(&self) -> Option<&Player> {
        match self.state {
            SessionState::Playing => self.players.get(self.current_turn_index),
            _ => None,
        }
    }

    pub fn guesser(&self) -> Option<&Player> {
        self.guesser_index.and_then(|i| self.players.get(i))
    }

    pub fn is_guesser(&self, connection: ConnectionId) -> bool {
        self.guesser().is_some_and(|p| p.connection == connection)
    }

    /// Every connection in the room, in join order.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.players.iter().map(|p| p.connection).collect()
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    /// The sentence as plain text.
    pub fn sentence_text(&self) -> String {
        self.sentence
            .iter()
            .map(|e| e.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn scores(&self) -> BTreeMap<String, u32> {
        self.players
            .iter()
            .map(|p| (p.name.clone(), p.score))
            .collect()
    }

    /// Check that `name` could join right now.
    pub fn check_joinable(&self, name: &str) -> Result<(), Rejection> {
        if self.state != SessionState::Waiting {
            return Err(Rejection::NotWaiting);
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(Rejection::NameTaken);
        }
        Ok(())
    }

    /// Append a player with the next palette colour.
    pub fn add_player(&mut self, connection: ConnectionId, name: String) -> Result<&Player, Rejection> {
        self.check_joinable(&name)?;
        let color = PlayerColor::for_position(self.players.len());
        self.players.push(Player::new(connection, name, color));
        Ok(&self.players[self.players.len() - 1])
    }

    /// Check that `connection` could start a round right now.
    pub fn check_startable(&self, connection: ConnectionId) -> Result<(), Rejection> {
        if !self.player(connection).is_some_and(|p| p.is_host) {
            return Err(Rejection::NotHost);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(Rejection::TooFewPlayers);
        }
        if self.state != SessionState::Waiting {
            return Err(Rejection::NotWaiting);
        }
        Ok(())
    }

    /// Begin a round. Only the host may start, and only with enough players.
    pub fn start(&mut self, connection: ConnectionId, deal: Deal) -> Result<(), Rejection> {
        self.check_startable(connection)?;

        let n = self.players.len();
        let guesser = deal.guesser_index % n;
        self.state = SessionState::Playing;
        self.subject = Some(deal.subject);
        self.guesser_index = Some(guesser);
        self.current_turn_index = (guesser + 1) % n;
        self.sentence.clear();
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Append a word for the player whose turn it is, then pass the turn.
    pub fn add_word(
        &mut self,
        connection: ConnectionId,
        word: &str,
        validator: &WordValidator,
    ) -> Result<&SentenceEntry, Rejection> {
        if self.state != SessionState::Playing {
            return Err(Rejection::NotPlaying);
        }
        let index = self
            .player_index(connection)
            .filter(|i| *i == self.current_turn_index)
            .ok_or(Rejection::NotYourTurn)?;
        let word = word.trim();
        validator.validate(word)?;

        let player = &self.players[index];
        self.sentence.push(SentenceEntry {
            word: word.to_string(),
            player: player.name.clone(),
            color: player.color,
        });
        self.advance_turn();
        Ok(&self.sentence[self.sentence.len() - 1])
    }

    /// Guess the subject. Matching is case-insensitive on the trimmed input.
    pub fn guess(&mut self, connection: ConnectionId, guess: &str) -> Result<GuessOutcome, Rejection> {
        if self.state != SessionState::Playing {
            return Err(Rejection::NotPlaying);
        }
        let index = self
            .player_index(connection)
            .filter(|i| Some(*i) == self.guesser_index)
            .ok_or(Rejection::NotGuesser)?;
        let guess = guess.trim();
        if guess.is_empty() {
            return Err(Rejection::EmptyGuess);
        }

        let correct = self
            .subject
            .as_deref()
            .is_some_and(|s| s.to_lowercase() == guess.to_lowercase());
        let player = &mut self.players[index];
        if !correct {
            return Ok(GuessOutcome::Incorrect {
                guesser: player.name.clone(),
            });
        }

        player.award(WINNING_SCORE);
        self.state = SessionState::Finished;
        Ok(GuessOutcome::Correct {
            winner: player.name.clone(),
        })
    }

    /// Drop the player on `connection`. Returns `None` if no such player.
    pub fn remove_player(&mut self, connection: ConnectionId) -> Option<Departure> {
        let removed = self.player_index(connection)?;
        let player = self.players.remove(removed);

        if self.players.is_empty() {
            return Some(Departure::Emptied);
        }
        if player.is_host {
            self.players[0].is_host = true;
        }

        if self.state != SessionState::Playing {
            self.current_turn_index = 0;
            return Some(Departure::Continued);
        }

        let guesser = match self.guesser_index {
            Some(g) if g != removed && self.players.len() >= MIN_PLAYERS => g,
            _ => {
                self.reset_round();
                return Some(Departure::RoundAbandoned);
            }
        };

        let n = self.players.len();
        let guesser = if removed < guesser { guesser - 1 } else { guesser };
        let turn = match removed.cmp(&self.current_turn_index) {
            std::cmp::Ordering::Less => self.current_turn_index - 1,
            std::cmp::Ordering::Equal => self.current_turn_index % n,
            std::cmp::Ordering::Greater => self.current_turn_index,
        };
        self.guesser_index = Some(guesser);
        self.current_turn_index = turn;
        self.skip_guesser();
        Some(Departure::Continued)
    }

    fn reset_round(&mut self) {
        self.state = SessionState::Waiting;
        self.subject = None;
        self.guesser_index = None;
        self.current_turn_index = 0;
        self.sentence.clear();
        self.started_at = None;
    }

    fn advance_turn(&mut self) {
        self.current_turn_index = (self.current_turn_index + 1) % self.players.len();
        self.skip_guesser();
    }

    /// Step past the guesser. Bounded by the player count.
    fn skip_guesser(&mut self) {
        let n = self.players.len();
        for _ in 0..n {
            if Some(self.current_turn_index) != self.guesser_index {
                break;
            }
            self.current_turn_index = (self.current_turn_index + 1) % n;
        }
    }
}

//! Inbound event dispatch.
//!
//! The router resolves the caller's session, lets the session check its own
//! preconditions, and then fans results out through an [`Outbox`]. Fan-out
//! happens while the session lock is still held, so every member of a room
//! sees that room's events in the order they were accepted.
//!
//! Rejections go back to the originating connection only and never touch
//! session state.

use parking_lot::Mutex;

use crate::dealer::{Dealer, RandomDealer};
use crate::protocol::{Inbound, Outbound};
use crate::state::{
    ConnectionId, GameSession, GuessOutcome, Rejection, RemovalOutcome, SessionRegistry,
};
use crate::words::Lexicon;

/// Delivery side of the transport.
pub trait Outbox {
    /// Queue `event` for `to`. Must not block; a connection that has already
    /// gone away simply drops the event.
    fn deliver(&self, to: ConnectionId, event: Outbound);
}

pub struct EventRouter {
    registry: SessionRegistry,
    lexicon: Lexicon,
    dealer: Mutex<Box<dyn Dealer>>,
}

impl EventRouter {
    pub fn new(lexicon: Lexicon) -> Self {
        Self::with_parts(SessionRegistry::new(), lexicon, RandomDealer::default())
    }

    pub fn with_parts(registry: SessionRegistry, lexicon: Lexicon, dealer: impl Dealer + 'static) -> Self {
        Self {
            registry,
            lexicon,
            dealer: Mutex::new(Box::new(dealer)),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Handle one raw text frame from `connection`.
    pub fn handle_frame(&self, connection: ConnectionId, frame: &str, outbox: &dyn Outbox) {
        match Inbound::parse(frame) {
            Ok(event) => self.handle(connection, event, outbox),
            Err(rejection) => {
                log::debug!("{}: unreadable frame {:?}", connection, frame);
                outbox.deliver(connection, Outbound::error(rejection));
            }
        }
    }

    /// Handle one parsed event from `connection`.
    pub fn handle(&self, connection: ConnectionId, event: Inbound, outbox: &dyn Outbox) {
        let name = event.name();
        let result = match event {
            Inbound::CreateGame { player_name } => self.create_game(connection, player_name, outbox),
            Inbound::JoinGame {
                game_code,
                player_name,
            } => self.join_game(connection, &game_code, player_name, outbox),
            Inbound::StartGame => self.start_game(connection, outbox),
            Inbound::AddWord { word } => self.add_word(connection, &word, outbox),
            Inbound::MakeGuess { guess } => self.make_guess(connection, &guess, outbox),
        };
        if let Err(rejection) = result {
            log::debug!("{} {} rejected: {}", connection, name, rejection);
            outbox.deliver(connection, Outbound::error(rejection));
        }
    }

    /// Transport reported `connection` closed. Idempotent.
    pub fn disconnect(&self, connection: ConnectionId, outbox: &dyn Outbox) {
        match self.registry.remove_connection(connection) {
            RemovalOutcome::NotBound => {}
            RemovalOutcome::SessionDestroyed { code } => {
                log::debug!("{} was the last player in {}", connection, code);
            }
            RemovalOutcome::PlayersRemaining { session, .. } => {
                broadcast(&session, outbox, Outbound::player_left(&session));
            }
        }
    }

    fn create_game(&self, connection: ConnectionId, name: String, outbox: &dyn Outbox) -> Result<(), Rejection> {
        let session = self.registry.create_session(connection, name)?;
        outbox.deliver(connection, Outbound::game_created(&session));
        Ok(())
    }

    fn join_game(
        &self,
        connection: ConnectionId,
        code: &str,
        name: String,
        outbox: &dyn Outbox,
    ) -> Result<(), Rejection> {
        let session = self.registry.join_session(code.trim(), connection, name)?;
        broadcast(&session, outbox, Outbound::player_joined(&session));
        Ok(())
    }

    fn start_game(&self, connection: ConnectionId, outbox: &dyn Outbox) -> Result<(), Rejection> {
        let code = self
            .registry
            .code_for(connection)
            .ok_or(Rejection::SessionNotFound)?;
        let session = self.registry.start_session(&code, connection, |players| {
            self.dealer.lock().deal(self.lexicon.targets(), players)
        })?;

        for recipient in session.connections() {
            outbox.deliver(recipient, Outbound::game_started(&session, recipient));
        }
        for recipient in session.connections() {
            outbox.deliver(recipient, Outbound::sentence_updated(&session, recipient));
        }
        Ok(())
    }

    fn add_word(&self, connection: ConnectionId, word: &str, outbox: &dyn Outbox) -> Result<(), Rejection> {
        let mut session = self
            .registry
            .resolve_session(connection)
            .ok_or(Rejection::SessionNotFound)?;
        session.add_word(connection, word, &self.lexicon.validator)?;
        if let Some(entry) = session.sentence().last() {
            log::debug!("{}: {} added {:?}", session.code(), entry.player, entry.word);
        }

        for recipient in session.connections() {
            outbox.deliver(recipient, Outbound::sentence_updated(&session, recipient));
        }
        Ok(())
    }

    fn make_guess(&self, connection: ConnectionId, guess: &str, outbox: &dyn Outbox) -> Result<(), Rejection> {
        let mut session = self
            .registry
            .resolve_session(connection)
            .ok_or(Rejection::SessionNotFound)?;
        match session.guess(connection, guess)? {
            GuessOutcome::Incorrect { guesser } => {
                log::debug!("{}: {} guessed {:?}", session.code(), guesser, guess.trim());
                broadcast(&session, outbox, Outbound::guess_result(guesser));
            }
            GuessOutcome::Correct { winner } => {
                log_finish(&session, &winner);
                broadcast(&session, outbox, Outbound::game_ended(&session, winner));
                self.registry.destroy_session(&mut session);
            }
        }
        Ok(())
    }
}

fn broadcast(session: &GameSession, outbox: &dyn Outbox, event: Outbound) {
    for recipient in session.connections() {
        outbox.deliver(recipient, event.clone());
    }
}

fn log_finish(session: &GameSession, winner: &str) {
    let seconds = session
        .started_at
        .map(|t| (chrono::Utc::now() - t).num_seconds())
        .unwrap_or_default();
    log::info!(
        "session {} won by {} after {} words in {}s",
        session.code(),
        winner,
        session.sentence().len(),
        seconds
    );
}

//! An automated player speaking the line protocol over TCP.
//!
//! [`BotState`] is the synchronous part: it folds server events into what
//! the bot knows and answers each one with a [`Reaction`]. [`Bot`] owns the
//! socket, the generator and the retry loops around both.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;

use super::generator::{compose_guess, compose_word, GuessPrompt, Retry, TextGenerator, WordPrompt};
use super::policy::{decide, Action};
use super::signal::ErrorSignal;
use crate::protocol::{Inbound, Outbound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotSettings {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl BotSettings {
    fn retry(&self) -> Retry {
        Retry {
            max_attempts: self.max_retries.max(1),
            delay: self.retry_delay,
        }
    }
}

/// What the driver should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    None,
    AddWord,
    Guess,
    /// A wrong guess; try again after the retry delay
    GuessAfterDelay,
    /// Join again under the (new) current name
    Rejoin,
    Disconnect,
    Finished { winner: String },
}

/// Everything a bot knows about its game.
#[derive(Debug, Clone, Default)]
pub struct BotState {
    base_name: String,
    pub name: String,
    pub game_code: String,
    pub joined: bool,
    pub is_guesser: bool,
    pub subject: Option<String>,
    pub sentence: Vec<String>,
    pub last_error: Option<String>,
    pub finished: bool,
}

impl BotState {
    pub fn new(name: String, game_code: String) -> Self {
        Self {
            base_name: name.clone(),
            name,
            game_code,
            ..Self::default()
        }
    }

    pub fn join_event(&self) -> Inbound {
        Inbound::JoinGame {
            game_code: self.game_code.clone(),
            player_name: self.name.clone(),
        }
    }

    pub fn word_prompt(&self) -> WordPrompt {
        WordPrompt {
            subject: self.subject.clone().unwrap_or_default(),
            sentence: self.sentence.join(" "),
            previous_error: self.last_error.clone(),
        }
    }

    pub fn guess_prompt(&self) -> GuessPrompt {
        GuessPrompt {
            sentence: self.sentence.join(" "),
            previous_error: self.last_error.clone(),
        }
    }

    /// Forget the round, e.g. after it was abandoned or the socket dropped.
    pub fn reset_round(&mut self) {
        self.is_guesser = false;
        self.subject = None;
        self.sentence.clear();
    }

    pub fn on_event<R: Rng>(&mut self, event: &Outbound, rng: &mut R) -> Reaction {
        match event {
            Outbound::GameCreated(_) => Reaction::None,
            Outbound::PlayerJoined(p) => {
                if p.players.iter().any(|v| v.name == self.name) {
                    self.joined = true;
                }
                Reaction::None
            }
            Outbound::GameStarted(p) => {
                self.joined = true;
                self.reset_round();
                self.is_guesser = p.is_guesser;
                self.subject = p.subject.clone();
                log::info!(
                    "{}: round started as {}",
                    self.name,
                    if p.is_guesser { "guesser" } else { "builder" }
                );
                // The opening sentence_updated that follows decides the first move
                Reaction::None
            }
            Outbound::SentenceUpdated(p) => {
                self.sentence = p.sentence.iter().map(|w| w.word.clone()).collect();
                if p.subject.is_some() {
                    self.subject = p.subject.clone();
                }
                let my_turn = p.current_turn == self.name;
                match decide(self.is_guesser, my_turn, self.sentence.len(), rng.random::<f64>()) {
                    Action::AddWord => Reaction::AddWord,
                    Action::Guess => Reaction::Guess,
                    Action::Wait => Reaction::None,
                }
            }
            Outbound::GuessResult(p) => {
                if !p.correct && p.guesser == self.name {
                    Reaction::GuessAfterDelay
                } else {
                    Reaction::None
                }
            }
            Outbound::GameEnded(p) => {
                self.finished = true;
                log::info!(
                    "{}: game over, {} found {:?} from {:?}",
                    self.name,
                    p.winner,
                    p.subject,
                    p.sentence
                );
                Reaction::Finished {
                    winner: p.winner.clone(),
                }
            }
            Outbound::PlayerLeft(p) => {
                if p.state == "waiting" {
                    self.reset_round();
                }
                Reaction::None
            }
            Outbound::Error(p) => {
                log::warn!("{}: server error: {}", self.name, p.message);
                self.last_error = Some(p.message.clone());
                match ErrorSignal::classify(&p.message) {
                    ErrorSignal::AlreadyInGame => {
                        self.joined = true;
                        Reaction::None
                    }
                    ErrorSignal::NameTaken => {
                        self.name = format!("{}_{}", self.base_name, rng.random_range(1..=999));
                        log::info!("{}: name taken, retrying as {}", self.base_name, self.name);
                        Reaction::Rejoin
                    }
                    signal if signal.is_fatal() => Reaction::Disconnect,
                    _ => Reaction::None,
                }
            }
        }
    }
}

/// How a bot's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotOutcome {
    Finished { winner: String },
    GaveUp { reason: String },
}

pub struct Bot<G: TextGenerator + ?Sized> {
    state: BotState,
    generator: Arc<G>,
    settings: BotSettings,
    rng: StdRng,
}

impl<G: TextGenerator + ?Sized> Bot<G> {
    pub fn new(name: String, game_code: String, generator: Arc<G>, settings: BotSettings) -> Self {
        Self {
            state: BotState::new(name, game_code),
            generator,
            settings,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    async fn connect(&self, addr: &str) -> anyhow::Result<TcpStream> {
        let attempts = self.settings.max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt < attempts => {
                    log::warn!("{}: connection attempt {} failed: {}", self.state.name, attempt, e);
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("connecting to {} after {} attempts", addr, attempts))
                }
            }
        }
    }

    /// Play until the game ends, reconnecting if the server drops us first.
    pub async fn run(mut self, addr: &str) -> anyhow::Result<BotOutcome> {
        let mut reconnects = 0;
        loop {
            let stream = self.connect(addr).await?;
            log::info!("{}: connected to {}", self.state.name, addr);
            if let Some(outcome) = self.session(stream).await? {
                return Ok(outcome);
            }
            reconnects += 1;
            if reconnects > self.settings.max_retries {
                return Ok(BotOutcome::GaveUp {
                    reason: "connection lost".to_string(),
                });
            }
            log::info!("{}: disconnected, reconnecting", self.state.name);
            self.state.joined = false;
            self.state.reset_round();
            tokio::time::sleep(self.settings.retry_delay).await;
        }
    }

    /// One connection's worth of play. `None` when the socket closed early.
    async fn session(&mut self, stream: TcpStream) -> anyhow::Result<Option<BotOutcome>> {
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        send(&mut write, &self.state.join_event()).await?;

        while let Some(line) = lines.next_line().await? {
            let event = match Outbound::parse(&line) {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("{}: unreadable frame: {}", self.state.name, e);
                    continue;
                }
            };
            log::debug!("{}: received {}", self.state.name, event.name());
            match self.state.on_event(&event, &mut self.rng) {
                Reaction::None => {}
                Reaction::AddWord => {
                    let word = compose_word(
                        self.generator.as_ref(),
                        &self.state.word_prompt(),
                        self.settings.retry(),
                        &mut self.rng,
                    )
                    .await;
                    log::info!("{}: adding {:?}", self.state.name, word);
                    send(&mut write, &Inbound::AddWord { word }).await?;
                    self.state.last_error = None;
                }
                Reaction::Guess => self.guess(&mut write).await?,
                Reaction::GuessAfterDelay => {
                    tokio::time::sleep(self.settings.retry_delay).await;
                    self.guess(&mut write).await?;
                }
                Reaction::Rejoin => send(&mut write, &self.state.join_event()).await?,
                Reaction::Disconnect => {
                    return Ok(Some(BotOutcome::GaveUp {
                        reason: self.state.last_error.clone().unwrap_or_default(),
                    }))
                }
                Reaction::Finished { winner } => return Ok(Some(BotOutcome::Finished { winner })),
            }
        }
        Ok(None)
    }

    async fn guess(&mut self, write: &mut OwnedWriteHalf) -> anyhow::Result<()> {
        match compose_guess(self.generator.as_ref(), &self.state.guess_prompt(), self.settings.retry()).await {
            Some(guess) => {
                log::info!("{}: guessing {:?}", self.state.name, guess);
                send(write, &Inbound::MakeGuess { guess }).await?;
                self.state.last_error = None;
            }
            None => log::warn!("{}: no guess this time", self.state.name),
        }
        Ok(())
    }
}

async fn send(write: &mut OwnedWriteHalf, event: &Inbound) -> anyhow::Result<()> {
    let mut line = event.to_line();
    line.push('\n');
    write
        .write_all(line.as_bytes())
        .await
        .with_context(|| format!("sending {}", event.name()))
}

//! Wire protocol.
//!
//! Every frame in either direction is a JSON envelope
//! `{"event": "<name>", "data": {...}}`. Inbound payload fields are
//! camelCase and optional on the wire; a missing field reads as empty and is
//! then refused by the normal validation path. Player names are the
//! exception: a blank name is refused here as a malformed event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{ConnectionId, GameSession, Rejection, SentenceEntry};

/// Raw frame before the event name is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Client-to-server events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    CreateGame { player_name: String },
    JoinGame { game_code: String, player_name: String },
    StartGame,
    AddWord { word: String },
    MakeGuess { guess: String },
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NamePayload {
    player_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JoinPayload {
    game_code: String,
    player_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WordPayload {
    word: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct GuessPayload {
    guess: String,
}

fn payload<T: serde::de::DeserializeOwned + Default>(data: serde_json::Value) -> Result<T, Rejection> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).map_err(|_| Rejection::MalformedEvent)
}

/// A blank name could not be told apart from "nobody" in turn announcements.
fn player_name(name: String) -> Result<String, Rejection> {
    if name.trim().is_empty() {
        Err(Rejection::MalformedEvent)
    } else {
        Ok(name)
    }
}

impl Inbound {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateGame { .. } => "create_game",
            Self::JoinGame { .. } => "join_game",
            Self::StartGame => "start_game",
            Self::AddWord { .. } => "add_word",
            Self::MakeGuess { .. } => "make_guess",
        }
    }

    /// Parse one text frame.
    pub fn parse(frame: &str) -> Result<Self, Rejection> {
        let envelope: Envelope = serde_json::from_str(frame).map_err(|_| Rejection::MalformedEvent)?;
        Self::try_from(envelope)
    }

    pub fn to_envelope(&self) -> Envelope {
        let data = match self {
            Self::CreateGame { player_name } => serde_json::json!({ "playerName": player_name }),
            Self::JoinGame {
                game_code,
                player_name,
            } => serde_json::json!({ "gameCode": game_code, "playerName": player_name }),
            Self::StartGame => serde_json::json!({}),
            Self::AddWord { word } => serde_json::json!({ "word": word }),
            Self::MakeGuess { guess } => serde_json::json!({ "guess": guess }),
        };
        Envelope {
            event: self.name().to_string(),
            data,
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(&self.to_envelope()).unwrap_or_default()
    }
}

impl TryFrom<Envelope> for Inbound {
    type Error = Rejection;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.event.as_str() {
            "create_game" => {
                let p: NamePayload = payload(envelope.data)?;
                Ok(Self::CreateGame {
                    player_name: player_name(p.player_name)?,
                })
            }
            "join_game" => {
                let p: JoinPayload = payload(envelope.data)?;
                Ok(Self::JoinGame {
                    game_code: p.game_code,
                    player_name: player_name(p.player_name)?,
                })
            }
            "start_game" => Ok(Self::StartGame),
            "add_word" => {
                let p: WordPayload = payload(envelope.data)?;
                Ok(Self::AddWord { word: p.word })
            }
            "make_guess" => {
                let p: GuessPayload = payload(envelope.data)?;
                Ok(Self::MakeGuess { guess: p.guess })
            }
            _ => Err(Rejection::MalformedEvent),
        }
    }
}

/// One player as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub name: String,
    pub color: String,
    pub is_host: bool,
    /// Present once a round has started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_guesser: Option<bool>,
}

impl PlayerView {
    /// Lobby view: names, colours and the host.
    pub fn roster(session: &GameSession) -> Vec<Self> {
        session
            .players()
            .iter()
            .map(|p| Self {
                name: p.name.clone(),
                color: p.color.to_string(),
                is_host: p.is_host,
                is_guesser: None,
            })
            .collect()
    }

    /// Round view: also marks the guesser.
    pub fn with_roles(session: &GameSession) -> Vec<Self> {
        let guesser = session.guesser_index();
        session
            .players()
            .iter()
            .enumerate()
            .map(|(i, p)| Self {
                name: p.name.clone(),
                color: p.color.to_string(),
                is_host: p.is_host,
                is_guesser: Some(Some(i) == guesser),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPayload {
    pub game_code: String,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedPayload {
    pub is_guesser: bool,
    pub subject: Option<String>,
    pub current_turn: String,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceWord {
    pub word: String,
    pub color: String,
    pub player: String,
}

impl From<&SentenceEntry> for SentenceWord {
    fn from(entry: &SentenceEntry) -> Self {
        Self {
            word: entry.word.clone(),
            color: entry.color.to_string(),
            player: entry.player.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentencePayload {
    pub sentence: Vec<SentenceWord>,
    pub current_turn: String,
    /// `None` for the guesser
    pub subject: Option<String>,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessResultPayload {
    pub correct: bool,
    pub guesser: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEndedPayload {
    pub winner: String,
    pub subject: String,
    /// Words joined with single spaces
    pub sentence: String,
    pub scores: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeftPayload {
    pub players: Vec<String>,
    /// Session state after the departure
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Outbound {
    GameCreated(RosterPayload),
    PlayerJoined(RosterPayload),
    GameStarted(GameStartedPayload),
    SentenceUpdated(SentencePayload),
    GuessResult(GuessResultPayload),
    GameEnded(GameEndedPayload),
    PlayerLeft(PlayerLeftPayload),
    Error(ErrorPayload),
}

impl Outbound {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GameCreated(_) => "game_created",
            Self::PlayerJoined(_) => "player_joined",
            Self::GameStarted(_) => "game_started",
            Self::SentenceUpdated(_) => "sentence_updated",
            Self::GuessResult(_) => "guess_result",
            Self::GameEnded(_) => "game_ended",
            Self::PlayerLeft(_) => "player_left",
            Self::Error(_) => "error",
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn parse(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }

    pub fn error(rejection: Rejection) -> Self {
        Self::Error(ErrorPayload {
            message: rejection.to_string(),
        })
    }

    pub fn game_created(session: &GameSession) -> Self {
        Self::GameCreated(RosterPayload {
            game_code: session.code().to_string(),
            players: PlayerView::roster(session),
        })
    }

    pub fn player_joined(session: &GameSession) -> Self {
        Self::PlayerJoined(RosterPayload {
            game_code: session.code().to_string(),
            players: PlayerView::roster(session),
        })
    }

    /// Role-specific start notice for `recipient`.
    pub fn game_started(session: &GameSession, recipient: ConnectionId) -> Self {
        let is_guesser = session.is_guesser(recipient);
        Self::GameStarted(GameStartedPayload {
            is_guesser,
            subject: subject_for(session, is_guesser),
            current_turn: current_turn(session),
            players: PlayerView::with_roles(session),
        })
    }

    /// Sentence state for `recipient`; the guesser never sees the subject.
    pub fn sentence_updated(session: &GameSession, recipient: ConnectionId) -> Self {
        let is_guesser = session.is_guesser(recipient);
        Self::SentenceUpdated(SentencePayload {
            sentence: session.sentence().iter().map(SentenceWord::from).collect(),
            current_turn: current_turn(session),
            subject: subject_for(session, is_guesser),
            players: PlayerView::with_roles(session),
        })
    }

    pub fn guess_result(guesser: String) -> Self {
        Self::GuessResult(GuessResultPayload {
            correct: false,
            guesser,
        })
    }

    pub fn game_ended(session: &GameSession, winner: String) -> Self {
        Self::GameEnded(GameEndedPayload {
            winner,
            subject: session.subject().unwrap_or_default().to_string(),
            sentence: session.sentence_text(),
            scores: session.scores(),
        })
    }

    pub fn player_left(session: &GameSession) -> Self {
        Self::PlayerLeft(PlayerLeftPayload {
            players: session.player_names(),
            state: session.state().as_str().to_string(),
        })
    }
}

fn current_turn(session: &GameSession) -> String {
    session
        .current_player()
        .map(|p| p.name.clone())
        .unwrap_or_default()
}

fn subject_for(session: &GameSession, is_guesser: bool) -> Option<String> {
    if is_guesser {
        None
    } else {
        session.subject().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Deal;
    use pretty_assertions::assert_eq;

    fn playing() -> GameSession {
        let mut session = GameSession::new("4242".to_string(), ConnectionId(1), "Ava".to_string());
        session.add_player(ConnectionId(2), "Ben".to_string()).unwrap();
        session
            .start(
                ConnectionId(1),
                Deal {
                    subject: "Moon".to_string(),
                    guesser_index: 0,
                },
            )
            .unwrap();
        session
    }

    #[test]
    fn test_parse_inbound() {
        let frame = r#"{"event":"join_game","data":{"gameCode":"4242","playerName":"Ben"}}"#;
        assert_eq!(
            Inbound::parse(frame),
            Ok(Inbound::JoinGame {
                game_code: "4242".to_string(),
                player_name: "Ben".to_string(),
            })
        );
        assert_eq!(Inbound::parse(r#"{"event":"start_game"}"#), Ok(Inbound::StartGame));
        assert_eq!(
            Inbound::parse(r#"{"event":"add_word","data":{}}"#),
            Ok(Inbound::AddWord { word: String::new() })
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(Inbound::parse("not json"), Err(Rejection::MalformedEvent));
        assert_eq!(Inbound::parse(r#"{"event":"dance"}"#), Err(Rejection::MalformedEvent));
        assert_eq!(
            Inbound::parse(r#"{"event":"add_word","data":{"word":7}}"#),
            Err(Rejection::MalformedEvent)
        );
    }

    #[test]
    fn test_blank_player_name_rejected() {
        assert_eq!(Inbound::parse(r#"{"event":"create_game","data":{}}"#), Err(Rejection::MalformedEvent));
        assert_eq!(
            Inbound::parse(r#"{"event":"create_game","data":{"playerName":"  "}}"#),
            Err(Rejection::MalformedEvent)
        );
        assert_eq!(
            Inbound::parse(r#"{"event":"join_game","data":{"gameCode":"4242"}}"#),
            Err(Rejection::MalformedEvent)
        );
    }

    #[test]
    fn test_inbound_line_parses_back() {
        let event = Inbound::MakeGuess {
            guess: "the moon".to_string(),
        };
        assert_eq!(Inbound::parse(&event.to_line()), Ok(event));
    }

    #[test]
    fn test_outbound_shape() {
        let session = playing();
        let line = Outbound::game_created(&session).to_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "game_created");
        assert_eq!(value["data"]["gameCode"], "4242");
        assert_eq!(value["data"]["players"][0]["isHost"], true);
        assert_eq!(value["data"]["players"][1]["color"], "#BAFFC9");
        assert!(value["data"]["players"][0].get("isGuesser").is_none());
    }

    #[test]
    fn test_guesser_never_sees_subject() {
        let session = playing();
        match Outbound::sentence_updated(&session, ConnectionId(1)) {
            Outbound::SentenceUpdated(p) => {
                assert_eq!(p.subject, None);
                assert_eq!(p.current_turn, "Ben");
            }
            other => panic!("unexpected {:?}", other),
        }
        match Outbound::game_started(&session, ConnectionId(2)) {
            Outbound::GameStarted(p) => {
                assert!(!p.is_guesser);
                assert_eq!(p.subject.as_deref(), Some("Moon"));
                assert_eq!(p.players[0].is_guesser, Some(true));
                assert_eq!(p.players[1].is_guesser, Some(false));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_event() {
        let line = Outbound::error(Rejection::NotYourTurn).to_line().unwrap();
        assert_eq!(line, r#"{"event":"error","data":{"message":"Not your turn"}}"#);
        assert_eq!(
            Outbound::parse(&line).unwrap(),
            Outbound::Error(ErrorPayload {
                message: "Not your turn".to_string()
            })
        );
    }
}

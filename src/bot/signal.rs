//! Classification of `error` events received by an automated player.

/// What an error message means to a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSignal {
    /// Our join already landed; carry on as a member
    AlreadyInGame,
    /// Wrong code; give up
    GameNotFound,
    /// Too late to join; give up
    AlreadyStarted,
    /// Pick another name and join again
    NameTaken,
    /// Our turn ended before the word arrived
    NotYourTurn,
    Other,
}

impl ErrorSignal {
    /// Match on the substrings the server's messages are known to contain.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("already in a game") {
            Self::AlreadyInGame
        } else if message.contains("game not found") {
            Self::GameNotFound
        } else if message.contains("game has already started") {
            Self::AlreadyStarted
        } else if message.contains("name already taken") {
            Self::NameTaken
        } else if message.contains("not your turn") {
            Self::NotYourTurn
        } else {
            Self::Other
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::GameNotFound | Self::AlreadyStarted)
    }
}

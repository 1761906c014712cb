//! Player entity.
//!
//! A player exists only inside a [`GameSession`](super::session::GameSession):
//! it is created when a connection creates or joins a session and dropped when
//! that connection leaves or the session is torn down.

use std::fmt;

use super::connection::ConnectionId;

/// Points awarded to the guesser for naming the subject.
pub const WINNING_SCORE: u32 = 10;

/// Pastel palette handed out in join order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerColor {
    Pink,
    Green,
    Blue,
    Yellow,
    Purple,
    Orange,
}

impl PlayerColor {
    pub const PALETTE: [PlayerColor; 6] = [
        Self::Pink,
        Self::Green,
        Self::Blue,
        Self::Yellow,
        Self::Purple,
        Self::Orange,
    ];

    /// Colour for the player joining at `position` (0-based). Wraps once the
    /// palette is exhausted, so colours may repeat in large sessions.
    pub fn for_position(position: usize) -> Self {
        Self::PALETTE[position % Self::PALETTE.len()]
    }

    pub fn as_hex(&self) -> &'static str {
        match self {
            Self::Pink => "#FFB3BA",
            Self::Green => "#BAFFC9",
            Self::Blue => "#BAE1FF",
            Self::Yellow => "#FFFFBA",
            Self::Purple => "#FFB3FF",
            Self::Orange => "#FFD9BA",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_hex())
    }
}

/// A participant in one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Transport handle this player acts through
    pub connection: ConnectionId,

    /// Display name, unique (case-sensitive) within the session
    pub name: String,

    pub score: u32,

    /// Exactly one player per session carries this
    pub is_host: bool,

    pub color: PlayerColor,
}

impl Player {
    pub fn new(connection: ConnectionId, name: String, color: PlayerColor) -> Self {
        Self {
            connection,
            name,
            score: 0,
            is_host: false,
            color,
        }
    }

    pub fn host(connection: ConnectionId, name: String) -> Self {
        Self {
            is_host: true,
            ..Self::new(connection, name, PlayerColor::for_position(0))
        }
    }

    pub fn award(&mut self, points: u32) {
        self.score += points;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        assert_eq!(PlayerColor::for_position(0), PlayerColor::Pink);
        assert_eq!(PlayerColor::for_position(5), PlayerColor::Orange);
        assert_eq!(PlayerColor::for_position(6), PlayerColor::Pink);
        assert_eq!(PlayerColor::for_position(13), PlayerColor::Green);
    }

    #[test]
    fn test_host_player() {
        let p = Player::host(ConnectionId(1), "Ava".to_string());
        assert!(p.is_host);
        assert_eq!(p.score, 0);
        assert_eq!(p.color, PlayerColor::Pink);
    }

    #[test]
    fn test_award() {
        let mut p = Player::new(ConnectionId(2), "Ben".to_string(), PlayerColor::Green);
        p.award(WINNING_SCORE);
        p.award(WINNING_SCORE);
        assert_eq!(p.score, 20);
        assert!(!p.is_host);
    }

    #[test]
    fn test_color_display() {
        assert_eq!(format!("{}", PlayerColor::Blue), "#BAE1FF");
    }
}

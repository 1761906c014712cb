//! Command-line configuration and logging setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::bot::chat::{DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL};
use crate::state::code::{CODE_DIGITS_RANGE, DEFAULT_CODE_DIGITS};

/// Game server options.
#[derive(Debug, Clone, Parser)]
#[command(name = "phrasecast-server", about = "Host sentence-guessing sessions over TCP")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub bind: String,

    /// Dictionary of acceptable words, one per line
    #[arg(long, default_value = "data/wordlist.txt")]
    pub wordlist: PathBuf,

    /// Subjects to draw from, one per line
    #[arg(long, default_value = "data/targets.txt")]
    pub targets: PathBuf,

    /// Digits per session code
    #[arg(long, default_value_t = DEFAULT_CODE_DIGITS, value_parser = parse_code_digits)]
    pub code_digits: u32,
}

fn parse_code_digits(raw: &str) -> Result<u32, String> {
    let digits: u32 = raw.parse().map_err(|e| format!("{e}"))?;
    if CODE_DIGITS_RANGE.contains(&digits) {
        Ok(digits)
    } else {
        Err(format!(
            "must be between {} and {}",
            CODE_DIGITS_RANGE.start(),
            CODE_DIGITS_RANGE.end()
        ))
    }
}

/// Automated player options.
#[derive(Debug, Clone, Parser)]
#[command(name = "phrasecast-bots", about = "Run automated players against a game server")]
pub struct BotConfig {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub server: String,

    /// Session code to join
    #[arg(long)]
    pub game_code: String,

    /// Number of bots to spawn
    #[arg(short = 'n', long, default_value_t = 4)]
    pub num_players: usize,

    /// Attempts per action before giving up
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Pause between attempts, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub retry_delay_ms: u64,

    /// Seed for the bots' random choices
    #[arg(long)]
    pub seed: Option<u64>,

    /// Dictionary the offline generator draws words from
    #[arg(long, default_value = "data/wordlist.txt")]
    pub wordlist: PathBuf,

    /// Subjects the offline generator guesses from
    #[arg(long, default_value = "data/targets.txt")]
    pub targets: PathBuf,

    /// Where words and guesses come from
    #[arg(long, value_enum, default_value_t = GeneratorKind::Lexicon)]
    pub generator: GeneratorKind,

    /// Chat-completions endpoint
    #[arg(long, default_value = DEFAULT_CHAT_URL)]
    pub chat_url: String,

    /// Model requested from the chat endpoint
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Bearer token for the chat endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout for the chat endpoint, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub chat_timeout_ms: u64,
}

/// Text source for the bots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorKind {
    /// Draw from the local word lists
    Lexicon,
    /// Ask a chat-completions service
    Chat,
}

impl BotConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_millis(self.chat_timeout_ms)
    }
}

/// Initialise `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::parse_from(["phrasecast-server"]);
        assert_eq!(config.bind, "127.0.0.1:5000");
        assert_eq!(config.code_digits, 6);
        assert_eq!(config.wordlist, PathBuf::from("data/wordlist.txt"));
    }

    #[test]
    fn test_code_digits_bounds() {
        assert!(ServerConfig::try_parse_from(["s", "--code-digits", "3"]).is_err());
        assert!(ServerConfig::try_parse_from(["s", "--code-digits", "abc"]).is_err());
        let config = ServerConfig::try_parse_from(["s", "--code-digits", "4"]).unwrap();
        assert_eq!(config.code_digits, 4);
    }

    #[test]
    fn test_bot_args() {
        let config = BotConfig::parse_from(["b", "--game-code", "123456", "-n", "2", "--retry-delay-ms", "10"]);
        assert_eq!(config.game_code, "123456");
        assert_eq!(config.num_players, 2);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay(), Duration::from_millis(10));
        assert!(BotConfig::try_parse_from(["b"]).is_err());
        assert_eq!(config.generator, GeneratorKind::Lexicon);
    }

    #[test]
    fn test_bot_chat_args() {
        let config = BotConfig::parse_from([
            "b",
            "--game-code",
            "123456",
            "--generator",
            "chat",
            "--chat-model",
            "small",
            "--api-key",
            "sk-test",
        ]);
        assert_eq!(config.generator, GeneratorKind::Chat);
        assert_eq!(config.chat_url, DEFAULT_CHAT_URL);
        assert_eq!(config.chat_model, "small");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.chat_timeout(), Duration::from_secs(10));
        assert!(BotConfig::try_parse_from(["b", "--game-code", "1", "--generator", "oracle"]).is_err());
    }
}

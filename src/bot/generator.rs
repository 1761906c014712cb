//! Text generation for automated players.
//!
//! Bots ask a [`TextGenerator`] for their next word or guess. Generators may
//! fail transiently; [`compose_word`] and [`compose_guess`] retry a bounded
//! number of times with a fixed pause.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::words::Lexicon;

/// Words used when generation keeps failing on our turn.
pub const FILLER_WORDS: [&str; 5] = ["the", "is", "a", "an", "it"];

/// Context for picking the next word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordPrompt {
    pub subject: String,
    pub sentence: String,
    /// Server message from the last refused attempt
    pub previous_error: Option<String>,
}

/// Context for guessing the subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuessPrompt {
    pub sentence: String,
    pub previous_error: Option<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn word(&self, prompt: &WordPrompt) -> anyhow::Result<String>;

    async fn guess(&self, prompt: &GuessPrompt) -> anyhow::Result<String>;
}

/// Retry policy shared by all bot actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Ask for a word, falling back to a filler word once every attempt failed.
pub async fn compose_word<G, R>(generator: &G, prompt: &WordPrompt, retry: Retry, rng: &mut R) -> String
where
    G: TextGenerator + ?Sized,
    R: Rng + ?Sized,
{
    for attempt in 1..=retry.max_attempts {
        match generator.word(prompt).await {
            Ok(word) if !word.trim().is_empty() => return word.trim().to_lowercase(),
            Ok(_) => log::warn!("generator returned an empty word (attempt {})", attempt),
            Err(e) => log::warn!("word generation failed (attempt {}): {}", attempt, e),
        }
        if attempt < retry.max_attempts {
            tokio::time::sleep(retry.delay).await;
        }
    }
    let filler = FILLER_WORDS.choose(rng).copied().unwrap_or("the");
    log::info!("using filler word {:?}", filler);
    filler.to_string()
}

/// Ask for a guess. `None` once every attempt failed.
pub async fn compose_guess<G>(generator: &G, prompt: &GuessPrompt, retry: Retry) -> Option<String>
where
    G: TextGenerator + ?Sized,
{
    for attempt in 1..=retry.max_attempts {
        match generator.guess(prompt).await {
            Ok(guess) if !guess.trim().is_empty() => return Some(guess.trim().to_lowercase()),
            Ok(_) => log::warn!("generator returned an empty guess (attempt {})", attempt),
            Err(e) => log::warn!("guess generation failed (attempt {}): {}", attempt, e),
        }
        if attempt < retry.max_attempts {
            tokio::time::sleep(retry.delay).await;
        }
    }
    None
}

/// Offline generator drawing from the server's own word lists.
///
/// Words are random dictionary entries. Guesses favour the target sharing the
/// most words with the sentence and otherwise pick at random.
#[derive(Debug)]
pub struct LexiconGenerator {
    words: Vec<String>,
    targets: Vec<String>,
    rng: Mutex<StdRng>,
}

impl LexiconGenerator {
    pub fn new(lexicon: &Lexicon, seed: Option<u64>) -> Self {
        let mut words: Vec<String> = lexicon.validator.words().map(str::to_string).collect();
        words.sort();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            words,
            targets: lexicon.targets().to_vec(),
            rng: Mutex::new(rng),
        }
    }

    fn overlap(target: &str, sentence: &HashSet<String>) -> usize {
        target
            .split_whitespace()
            .filter(|w| sentence.contains(&w.to_lowercase()))
            .count()
    }
}

#[async_trait]
impl TextGenerator for LexiconGenerator {
    async fn word(&self, _prompt: &WordPrompt) -> anyhow::Result<String> {
        self.words
            .choose(&mut *self.rng.lock())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("dictionary is empty"))
    }

    async fn guess(&self, prompt: &GuessPrompt) -> anyhow::Result<String> {
        let sentence: HashSet<String> = prompt
            .sentence
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let best = self
            .targets
            .iter()
            .map(|t| (Self::overlap(t, &sentence), t))
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, _)| *score)
            .map(|(_, t)| t.clone());
        match best {
            Some(target) => Ok(target),
            None => self
                .targets
                .choose(&mut *self.rng.lock())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("target list is empty")),
        }
    }
}

//! Word lists and word validation.
//!
//! Both lists are plain text, one entry per line, blank lines ignored. The
//! dictionary is lowercased on load; targets keep their original spelling
//! because they are shown to players.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use anyhow::Context;

use crate::state::Rejection;

/// Accepts words that are purely alphabetic and present in the dictionary.
#[derive(Debug, Clone, Default)]
pub struct WordValidator {
    dictionary: HashSet<String>,
}

impl WordValidator {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dictionary = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { dictionary }
    }

    pub fn from_reader(reader: impl BufRead) -> anyhow::Result<Self> {
        Ok(Self::from_words(read_lines(reader)?))
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening word list {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("reading word list {}", path.display()))
    }

    /// Non-empty and letters only.
    pub fn is_well_formed(&self, word: &str) -> bool {
        !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic())
    }

    /// Case-insensitive dictionary membership.
    pub fn is_known(&self, word: &str) -> bool {
        self.dictionary.contains(&word.to_lowercase())
    }

    /// Shape first, then the dictionary.
    pub fn validate(&self, word: &str) -> Result<(), Rejection> {
        if !self.is_well_formed(word) {
            return Err(Rejection::InvalidWordShape);
        }
        if !self.is_known(word) {
            return Err(Rejection::UnknownWord);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.dictionary.iter().map(String::as_str)
    }
}

/// Dictionary plus the subjects a round can draw from.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub validator: WordValidator,
    targets: Vec<String>,
}

impl Lexicon {
    /// Fails if there is nothing to draw a subject from.
    pub fn new(validator: WordValidator, targets: Vec<String>) -> anyhow::Result<Self> {
        anyhow::ensure!(!targets.is_empty(), "target list is empty");
        Ok(Self { validator, targets })
    }

    pub fn load(wordlist: impl AsRef<Path>, targets: impl AsRef<Path>) -> anyhow::Result<Self> {
        let validator = WordValidator::load(wordlist)?;
        let targets = targets.as_ref();
        let file = std::fs::File::open(targets)
            .with_context(|| format!("opening target list {}", targets.display()))?;
        let entries = read_lines(std::io::BufReader::new(file))
            .with_context(|| format!("reading target list {}", targets.display()))?;
        let lexicon = Self::new(validator, entries)?;
        log::info!(
            "loaded {} dictionary words and {} targets",
            lexicon.validator.len(),
            lexicon.targets.len()
        );
        Ok(lexicon)
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}

fn read_lines(reader: impl BufRead) -> anyhow::Result<Vec<String>> {
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            entries.push(trimmed.to_string());
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        let v = WordValidator::default();
        assert!(v.is_well_formed("river"));
        assert!(v.is_well_formed("RiVeR"));
        assert!(!v.is_well_formed(""));
        assert!(!v.is_well_formed("river2"));
        assert!(!v.is_well_formed("riv er"));
        assert!(!v.is_well_formed("don't"));
        assert!(!v.is_well_formed("café"));
    }

    #[test]
    fn test_known_is_case_insensitive() {
        let v = WordValidator::from_words(["River", " blue "]);
        assert!(v.is_known("river"));
        assert!(v.is_known("RIVER"));
        assert!(v.is_known("Blue"));
        assert!(!v.is_known("green"));
    }

    #[test]
    fn test_shape_wins_over_dictionary() {
        let v = WordValidator::from_words(["river2", "riv er"]);
        assert_eq!(v.validate("river2"), Err(Rejection::InvalidWordShape));
        assert_eq!(v.validate("riv er"), Err(Rejection::InvalidWordShape));
        assert_eq!(v.validate("river"), Err(Rejection::UnknownWord));
    }

    #[test]
    fn test_from_reader_skips_blank_lines() {
        let input = "Apple\n\n  banana  \n\t\ncherry\n";
        let v = WordValidator::from_reader(input.as_bytes()).unwrap();
        assert_eq!(v.len(), 3);
        assert!(v.is_known("apple"));
        assert!(v.is_known("BANANA"));
    }

    #[test]
    fn test_lexicon_requires_targets() {
        assert!(Lexicon::new(WordValidator::default(), Vec::new()).is_err());
        let lexicon = Lexicon::new(WordValidator::default(), vec!["Eiffel Tower".to_string()]).unwrap();
        assert_eq!(lexicon.targets(), ["Eiffel Tower".to_string()]);
    }

    #[test]
    fn test_targets_keep_case() {
        let entries = read_lines("Mount Everest\n\nthe Moon\n".as_bytes()).unwrap();
        assert_eq!(entries, vec!["Mount Everest", "the Moon"]);
    }
}

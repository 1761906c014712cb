//! When an automated player acts.
//!
//! Word builders act exactly on their own turn. The guesser stays quiet until
//! the sentence has two words and then guesses with a probability that grows
//! by 0.125 per additional word, reaching certainty at nine words.

/// Probability added per word beyond the first.
pub const GUESS_RAMP: f64 = 0.125;

/// Chance that the guesser guesses after a sentence update.
pub fn guess_probability(word_count: usize) -> f64 {
    if word_count < 2 {
        return 0.0;
    }
    ((word_count - 1) as f64 * GUESS_RAMP).min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddWord,
    Guess,
    Wait,
}

/// Decide what to do after a sentence update. `roll` is uniform in `[0, 1)`.
pub fn decide(is_guesser: bool, my_turn: bool, word_count: usize, roll: f64) -> Action {
    if is_guesser {
        if roll < guess_probability(word_count) {
            Action::Guess
        } else {
            Action::Wait
        }
    } else if my_turn {
        Action::AddWord
    } else {
        Action::Wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_probability_ramp() {
        assert_eq!(guess_probability(0), 0.0);
        assert_eq!(guess_probability(1), 0.0);
        assert_eq!(guess_probability(2), 0.125);
        assert_eq!(guess_probability(5), 0.5);
        assert_eq!(guess_probability(9), 1.0);
        assert_eq!(guess_probability(40), 1.0);
    }

    #[test]
    fn test_builder_acts_only_on_turn() {
        assert_eq!(decide(false, true, 0, 0.99), Action::AddWord);
        assert_eq!(decide(false, false, 10, 0.0), Action::Wait);
    }

    #[test]
    fn test_guesser_rolls() {
        assert_eq!(decide(true, false, 1, 0.0), Action::Wait);
        assert_eq!(decide(true, false, 3, 0.2), Action::Guess);
        assert_eq!(decide(true, false, 3, 0.3), Action::Wait);
        // A guesser never adds words, even if named as the current turn
        assert_eq!(decide(true, true, 0, 0.5), Action::Wait);
    }
}

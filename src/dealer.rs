//! Random choices made at round start.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::state::Deal;

/// Picks the subject and the guesser for a new round.
pub trait Dealer: Send {
    /// `targets` is never empty and `players` is at least 2.
    fn deal(&mut self, targets: &[String], players: usize) -> Deal;
}

/// Uniform draws over the target list and the player seats.
#[derive(Debug)]
pub struct RandomDealer {
    rng: StdRng,
}

impl Default for RandomDealer {
    fn default() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl RandomDealer {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Dealer for RandomDealer {
    fn deal(&mut self, targets: &[String], players: usize) -> Deal {
        let subject = targets.choose(&mut self.rng).cloned().unwrap_or_default();
        let guesser_index = self.rng.random_range(0..players.max(1));
        Deal {
            subject,
            guesser_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_in_range() {
        let targets = vec!["Moon".to_string(), "Sun".to_string()];
        let mut dealer = RandomDealer::seeded(3);
        for players in 2..8 {
            let deal = dealer.deal(&targets, players);
            assert!(deal.guesser_index < players);
            assert!(targets.contains(&deal.subject));
        }
    }

    #[test]
    fn test_every_seat_can_guess() {
        let targets = vec!["Moon".to_string()];
        let mut dealer = RandomDealer::seeded(11);
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[dealer.deal(&targets, 3).guesser_index] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}

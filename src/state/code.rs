//! Session code candidates.
//!
//! Codes are short zero-padded decimal strings that players read aloud to
//! each other. The generator only proposes candidates; the registry checks
//! them against live sessions and asks again on collision.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Digits per code unless configured otherwise.
pub const DEFAULT_CODE_DIGITS: u32 = 6;

/// Accepted digit counts.
pub const CODE_DIGITS_RANGE: std::ops::RangeInclusive<u32> = 4..=9;

#[derive(Debug)]
pub struct CodeGenerator {
    rng: SmallRng,
    digits: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_DIGITS)
    }
}

impl CodeGenerator {
    /// Generator seeded from the OS. `digits` is clamped into
    /// [`CODE_DIGITS_RANGE`].
    pub fn new(digits: u32) -> Self {
        Self::with_rng(SmallRng::from_os_rng(), digits)
    }

    pub fn seeded(seed: u64, digits: u32) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed), digits)
    }

    fn with_rng(rng: SmallRng, digits: u32) -> Self {
        let digits = digits.clamp(*CODE_DIGITS_RANGE.start(), *CODE_DIGITS_RANGE.end());
        Self { rng, digits }
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Number of distinct codes this generator can produce.
    pub fn space(&self) -> u64 {
        10u64.pow(self.digits)
    }

    /// Draw a candidate code.
    pub fn generate(&mut self) -> String {
        let value = self.draw();
        self.format(value)
    }

    /// Draw a raw value below [`space`](Self::space).
    pub fn draw(&mut self) -> u64 {
        self.rng.random_range(0..self.space())
    }

    /// Render `value` as a code of this generator's width.
    pub fn format(&self, value: u64) -> String {
        format!("{:0width$}", value % self.space(), width = self.digits as usize)
    }
}

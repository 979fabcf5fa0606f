//! Daily spin gate and reward wheel.

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::ports::PortError;

pub const DEFAULT_SPIN_REWARDS: [u64; 7] = [50, 100, 150, 200, 250, 300, 500];

/// True when no spin has been claimed on `today` or later.
///
/// Days are compared, not instants: a claim at 23:59 does not block a claim
/// at 00:01 the next day.
pub fn can_spin(last_spin: Option<NaiveDate>, today: NaiveDate) -> bool {
    last_spin.map_or(true, |day| day < today)
}

/// The finite set of XP amounts a spin can pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinWheel {
    rewards: Vec<u64>,
}

impl SpinWheel {
    pub fn new(rewards: Vec<u64>) -> Result<Self, PortError> {
        if rewards.is_empty() {
            return Err(PortError::Invalid("spin wheel needs at least one reward".to_string()));
        }
        Ok(Self { rewards })
    }

    pub fn rewards(&self) -> &[u64] {
        &self.rewards
    }

    /// Draws one reward uniformly at random.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        // The constructor guarantees a non-empty wheel.
        self.rewards.choose(rng).copied().unwrap_or(self.rewards[0])
    }
}

impl Default for SpinWheel {
    fn default() -> Self {
        Self {
            rewards: DEFAULT_SPIN_REWARDS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn never_spun_can_spin() {
        assert!(can_spin(None, day(2024, 1, 1)));
    }

    #[test]
    fn same_day_is_blocked() {
        assert!(!can_spin(Some(day(2024, 1, 1)), day(2024, 1, 1)));
    }

    #[test]
    fn next_day_is_allowed() {
        assert!(can_spin(Some(day(2023, 12, 31)), day(2024, 1, 1)));
    }

    #[test]
    fn future_claim_blocks() {
        assert!(!can_spin(Some(day(2024, 1, 2)), day(2024, 1, 1)));
    }

    #[test]
    fn draws_stay_on_the_wheel() {
        let wheel = SpinWheel::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let reward = wheel.draw(&mut rng);
            assert!(DEFAULT_SPIN_REWARDS.contains(&reward));
        }
    }

    #[test]
    fn empty_wheel_is_rejected() {
        assert!(SpinWheel::new(vec![]).is_err());
    }
}

//! Tick rates - event loop iterations per second

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Iterations per second, fixed for a machine's lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickRate(u8);

impl TickRate {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    /// Returns `None` outside `[MIN, MAX]`
    pub fn new(per_second: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&per_second)
            .then_some(TickRate(per_second))
    }

    /// Uniform draw over `[MIN, MAX]`
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        TickRate(rng.gen_range(Self::MIN..=Self::MAX))
    }

    #[inline]
    pub fn per_second(self) -> u8 {
        self.0
    }

    /// Loop period, `1 / rate` seconds
    pub fn period(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0 as f64)
    }
}

impl fmt::Display for TickRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bounds() {
        assert!(TickRate::new(0).is_none());
        assert!(TickRate::new(7).is_none());
        assert_eq!(TickRate::new(1).unwrap().per_second(), 1);
        assert_eq!(TickRate::new(6).unwrap().per_second(), 6);
    }

    #[test]
    fn test_period() {
        assert_eq!(TickRate::new(1).unwrap().period(), Duration::from_secs(1));
        assert_eq!(TickRate::new(4).unwrap().period(), Duration::from_millis(250));
    }

    #[test]
    fn test_random_covers_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 7];
        for _ in 0..500 {
            let rate = TickRate::random(&mut rng).per_second();
            assert!((1..=6).contains(&rate));
            seen[rate as usize] = true;
        }
        assert!(seen[1..].iter().all(|s| *s));
    }

    #[test]
    fn test_seeded_draw_is_reproducible() {
        let a = TickRate::random(&mut StdRng::seed_from_u64(42));
        let b = TickRate::random(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}

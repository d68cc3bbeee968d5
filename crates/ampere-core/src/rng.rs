//! Seeded PRNG for the few places machines roll dice, such as rounding
//! fractional experience.
//!
//! SplitMix64: 8 bytes of state, identical sequences on every platform for
//! a given seed.

use crate::fixed::Fixed64;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// `true` with probability `p`, clamped to [0, 1].
    pub fn chance(&mut self, p: Fixed64) -> bool {
        if p <= Fixed64::ZERO {
            return false;
        }
        if p >= Fixed64::ONE {
            return true;
        }
        // For p in (0, 1) the Q32.32 bits are the fraction scaled to 2^32.
        let roll = self.next_u64() >> 32;
        roll < p.to_bits() as u64
    }

    /// Round a non-negative value to a whole number, rounding up with
    /// probability equal to its fractional part. Negative values give 0.
    pub fn round_stochastic(&mut self, value: Fixed64) -> u32 {
        if value <= Fixed64::ZERO {
            return 0;
        }
        let whole = value.to_num::<i64>().clamp(0, u32::MAX as i64) as u32;
        let frac = value.frac();
        if frac > Fixed64::ZERO && self.chance(frac) {
            whole.saturating_add(1)
        } else {
            whole
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn chance_bounds() {
        let mut rng = SimRng::new(1);
        for _ in 0..100 {
            assert!(!rng.chance(Fixed64::ZERO));
            assert!(rng.chance(Fixed64::ONE));
            assert!(!rng.chance(f64_to_fixed64(-0.5)));
        }
    }

    #[test]
    fn chance_half_is_roughly_half() {
        let mut rng = SimRng::new(99);
        let hits = (0..10_000)
            .filter(|_| rng.chance(f64_to_fixed64(0.5)))
            .count();
        assert!((4_500..5_500).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn round_stochastic_whole_values_are_exact() {
        let mut rng = SimRng::new(3);
        assert_eq!(rng.round_stochastic(f64_to_fixed64(4.0)), 4);
        assert_eq!(rng.round_stochastic(Fixed64::ZERO), 0);
        assert_eq!(rng.round_stochastic(f64_to_fixed64(-2.0)), 0);
    }

    #[test]
    fn round_stochastic_stays_within_floor_and_ceil() {
        let mut rng = SimRng::new(5);
        let value = f64_to_fixed64(2.3);
        let mut saw = [false; 2];
        for _ in 0..1_000 {
            match rng.round_stochastic(value) {
                2 => saw[0] = true,
                3 => saw[1] = true,
                other => panic!("unexpected {other}"),
            }
        }
        assert!(saw[0] && saw[1]);
    }
}

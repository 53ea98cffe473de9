// Deterministic luck for world generation.
//
// Every generation decision in Geocoin Carrier (does this cell hold a cache,
// how many coins does it start with) is a pure function of a string key such
// as `"12,-7"` or `"12,-7,initialValue"`. The world is never stored; it is
// re-derived from grid coordinates whenever a neighborhood is rebuilt, so the
// same key must yield the same value on every platform and every run.
//
// `luck(key)` hashes the key with FNV-1a (64-bit), uses the hash to seed a
// xoshiro256++ generator (SplitMix64 state expansion), and returns the first
// `f64` draw in [0, 1). There is no shared seed state: two keys never
// influence each other, and call order is irrelevant.
//
// `GameRng` is exposed on its own for callers that want a reproducible stream
// from a key (e.g. several draws per cell).
//
// **Critical constraint: determinism.** Nothing in this crate may read the
// clock, OS entropy, or `std::collections::hash_map::RandomState`. The hash
// and generator are hand-rolled so the output is fixed by this source file.

/// Return a reproducible value in [0, 1) for `key`.
///
/// Identical keys always produce identical output, independent of any other
/// call made before or after.
pub fn luck(key: &str) -> f64 {
    GameRng::from_key(key).next_f64()
}

/// 64-bit FNV-1a over the UTF-8 bytes of `key`.
pub fn fnv1a_64(key: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    key.bytes()
        .fold(OFFSET_BASIS, |hash, b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// Xoshiro256++ PRNG.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a generator seeded from a `u64`.
    ///
    /// SplitMix64 expands the seed into the 256-bit state, so nearby seeds
    /// (as produced by hashing similar keys) still start far apart.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Create a generator whose stream is determined by a string key.
    pub fn from_key(key: &str) -> Self {
        Self::new(fnv1a_64(key))
    }

    /// Generate the next `u64` in the sequence.
    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Return `true` with probability `p`.
    ///
    /// `p <= 0.0` never succeeds and `p >= 1.0` always does.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luck_is_stable_for_same_key() {
        for key in ["0,0", "12,-7", "12,-7,initialValue", ""] {
            assert_eq!(luck(key), luck(key));
        }
    }

    #[test]
    fn luck_ignores_call_order() {
        let a_first = luck("3,4");
        let _ = luck("9,9");
        let _ = luck("-1,2,initialValue");
        assert_eq!(a_first, luck("3,4"));
    }

    #[test]
    fn luck_in_unit_range() {
        for i in -200..200 {
            for j in -5..5 {
                let v = luck(&format!("{i},{j}"));
                assert!((0.0..1.0).contains(&v), "luck out of range: {v}");
            }
        }
    }

    #[test]
    fn neighbouring_keys_differ() {
        // Adjacent cells must not share a value, or caches would cluster.
        assert_ne!(luck("0,0"), luck("0,1"));
        assert_ne!(luck("0,0"), luck("1,0"));
        assert_ne!(luck("0,0"), luck("0,0,initialValue"));
    }

    #[test]
    fn luck_spreads_roughly_uniformly() {
        let n = 20_000;
        let below_tenth = (0..n)
            .filter(|k| luck(&format!("{k},{}", k * 7)) < 0.1)
            .count();
        let pct = below_tenth as f64 / n as f64;
        assert!(
            (0.08..0.12).contains(&pct),
            "expected ~10% below 0.1, got {:.1}%",
            pct * 100.0
        );
    }

    #[test]
    fn fnv1a_reference_values() {
        // Published FNV-1a 64 test vectors.
        assert_eq!(fnv1a_64(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64("foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = GameRng::new(42);
        let mut b = GameRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn chance_extremes() {
        let mut rng = GameRng::from_key("extremes");
        for _ in 0..100 {
            assert!(!rng.chance(0.0));
            assert!(!rng.chance(-3.0));
            assert!(rng.chance(1.0));
            assert!(rng.chance(7.5));
        }
    }
}

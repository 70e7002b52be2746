//! Seeded pseudo-random numbers for the classifiers.
//!
//! A 64-bit LCG (Knuth MMIX constants). Statistically weak but fully
//! reproducible across platforms, which is what the hotspot model needs.

/// 64-bit linear congruential generator.
#[derive(Debug, Clone)]
pub struct Lcg64 {
    state: u64,
}

impl Lcg64 {
    const MULT: u64 = 6_364_136_223_846_793_005;
    const INC: u64 = 1_442_695_040_888_963_407;

    /// Create a new LCG seeded with the given value.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(Self::MULT).wrapping_add(Self::INC),
        }
    }

    /// Advance state and return raw `u64`.
    pub const fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(Self::MULT).wrapping_add(Self::INC);
        self.state
    }

    /// Uniform `f64` in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / ((1_u64 << 53) as f64)
    }

    /// Uniform index in `0..n`. `n` must be non-zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn below(&mut self, n: usize) -> usize {
        // High bits of the 128-bit product; the low LCG bits are weak.
        ((u128::from(self.next_u64()) * n as u128) >> 64) as usize
    }

    /// `k` distinct indices from `0..n` (partial Fisher-Yates), in draw
    /// order. Returns all of `0..n` shuffled when `k >= n`.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let k = k.min(n);
        for i in 0..k {
            let j = i + self.below(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }

    /// Bootstrap sample: `n` indices from `0..n` drawn with replacement.
    pub fn bootstrap(&mut self, n: usize) -> Vec<usize> {
        (0..n).map(|_| self.below(n)).collect()
    }
}

//! Deterministic random number generation for demo data.
//!
//! RULE: Demo seeding never calls a platform RNG. Each concern gets its own
//! stream derived from (seed XOR stream index), so adding a stream never
//! changes what the existing ones produce.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

pub struct DemoRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl DemoRng {
    /// The index must never change once assigned.
    pub fn new(seed: u64, stream: DemoStream) -> Self {
        let derived_seed = seed ^ ((stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: stream.name(),
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'s, T>(&mut self, items: &'s [T]) -> &'s T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries. Only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum DemoStream {
    Operators = 0,
    Availability = 1,
    WorkOrders = 2,
    Assignments = 3,
}

impl DemoStream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Operators => "operators",
            Self::Availability => "availability",
            Self::WorkOrders => "work_orders",
            Self::Assignments => "assignments",
        }
    }
}

//! The accumulator contract (spec §3, §4.5 Reduction correctness).
//!
//! An accumulator is an opaque user type with a zero value and an
//! associative (not necessarily commutative) merge. The core never
//! inspects its contents; it only folds.

use serde::{de::DeserializeOwned, Serialize};

pub trait Accumulator: Serialize + DeserializeOwned + Send + 'static {
    /// The identity element for `merge`.
    fn zero() -> Self;

    /// Associative merge. `self` is logically "earlier" than `other`,
    /// though callers must not depend on merge order being stable across
    /// runs (spec §5, Ordering guarantees).
    fn merge(self, other: Self) -> Self;
}

/// Fold a sequence of accumulators left-to-right with `zero` as the seed.
/// Used by executors after collecting per-item results.
pub fn accumulate<A: Accumulator>(items: impl IntoIterator<Item = A>) -> A {
    let mut acc = A::zero();
    for item in items {
        acc = acc.merge(item);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct Counter(pub i64);

    impl Accumulator for Counter {
        fn zero() -> Self {
            Counter(0)
        }
        fn merge(self, other: Self) -> Self {
            Counter(self.0 + other.0)
        }
    }

    #[test]
    fn accumulate_sums_in_order_independent_way() {
        let items = vec![Counter(1), Counter(2), Counter(3)];
        assert_eq!(accumulate(items), Counter(6));
    }

    #[test]
    fn accumulate_empty_is_zero() {
        assert_eq!(accumulate(Vec::<Counter>::new()), Counter(0));
    }
}

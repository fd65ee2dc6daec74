use std::collections::BTreeMap;

use rand::{Rng, RngCore};
use rand::seq::{SliceRandom, index};

use seedbed_core::Value;

/// How [`IdentifierRegistry::sample`] draws from a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// Independent draws; the same id may repeat. Used for many-to-one FKs.
    WithReplacement,
    /// Distinct ids. Asking for more than the pool holds returns the whole
    /// pool in random order.
    WithoutReplacement,
}

/// Primary keys produced (or preloaded) for each entity during a run.
///
/// The registry is append-only: pools only grow, in insertion order, and
/// sampling never mutates them.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRegistry {
    pools: BTreeMap<String, Vec<Value>>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entity: &str, ids: impl IntoIterator<Item = Value>) {
        self.pools
            .entry(entity.to_string())
            .or_default()
            .extend(ids);
    }

    /// Draw `k` identifiers from `entity`'s pool. An empty pool yields an
    /// empty vector; callers decide whether that is an error.
    pub fn sample(
        &self,
        entity: &str,
        k: usize,
        replacement: Replacement,
        rng: &mut dyn RngCore,
    ) -> Vec<Value> {
        let pool = self.pool(entity);
        if pool.is_empty() || k == 0 {
            return Vec::new();
        }

        match replacement {
            Replacement::WithReplacement => (0..k)
                .map(|_| pool[rng.random_range(0..pool.len())].clone())
                .collect(),
            Replacement::WithoutReplacement if k >= pool.len() => {
                let mut all = pool.to_vec();
                all.shuffle(rng);
                all
            }
            Replacement::WithoutReplacement => index::sample(rng, pool.len(), k)
                .into_iter()
                .map(|idx| pool[idx].clone())
                .collect(),
        }
    }

    pub fn pool(&self, entity: &str) -> &[Value] {
        self.pools.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, entity: &str) -> usize {
        self.pool(entity).len()
    }

    pub fn contains(&self, entity: &str, id: &Value) -> bool {
        self.pool(entity).contains(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn registry(n: i64) -> IdentifierRegistry {
        let mut registry = IdentifierRegistry::new();
        registry.append("users", (0..n).map(Value::Int));
        registry
    }

    #[test]
    fn sampling_is_pure_and_repeatable() {
        let registry = registry(10);
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);

        let first = registry.sample("users", 5, Replacement::WithReplacement, &mut a);
        let second = registry.sample("users", 5, Replacement::WithReplacement, &mut b);
        assert_eq!(first, second);
        assert_eq!(registry.len("users"), 10);
        assert!(first.iter().all(|id| registry.contains("users", id)));
    }

    #[test]
    fn without_replacement_returns_distinct_ids() {
        let registry = registry(15);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let picked = registry.sample("users", 5, Replacement::WithoutReplacement, &mut rng);
        let distinct: BTreeSet<String> = picked.iter().map(ToString::to_string).collect();
        assert_eq!(picked.len(), 5);
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn oversized_request_returns_whole_pool() {
        let registry = registry(3);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut picked = registry.sample("users", 10, Replacement::WithoutReplacement, &mut rng);
        picked.sort_by_key(|id| id.as_i64());
        assert_eq!(picked, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn empty_or_unknown_pool_samples_nothing() {
        let registry = IdentifierRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(
            registry
                .sample("ghosts", 3, Replacement::WithReplacement, &mut rng)
                .is_empty()
        );
        assert_eq!(registry.len("ghosts"), 0);
        assert_eq!(registry.entities().count(), 0);
    }

    #[test]
    fn append_preserves_order() {
        let mut registry = registry(2);
        registry.append("users", [Value::Int(9)]);
        assert_eq!(
            registry.pool("users"),
            &[Value::Int(0), Value::Int(1), Value::Int(9)]
        );
        assert_eq!(registry.total(), 3);
    }
}

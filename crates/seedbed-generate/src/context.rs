use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{Rng, RngCore};

use seedbed_core::{Cardinality, EntityDescriptor, Error, FanOut, Result, RowTarget, Value};

use crate::registry::{IdentifierRegistry, Replacement};
use crate::source::ValueSource;

/// Everything a generator may read while producing rows for one entity.
///
/// The registry is borrowed immutably: generation never changes it.
pub struct GenerationContext<'a> {
    pub descriptor: &'a EntityDescriptor,
    pub registry: &'a IdentifierRegistry,
    pub values: &'a dyn ValueSource,
    pub now: NaiveDateTime,
    /// Ids already handed out per one-to-one column in this batch.
    claimed: RefCell<BTreeMap<String, Vec<Value>>>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        descriptor: &'a EntityDescriptor,
        registry: &'a IdentifierRegistry,
        values: &'a dyn ValueSource,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            descriptor,
            registry,
            values,
            now,
            claimed: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Sample one target id for the FK `column`.
    ///
    /// An empty pool is an error for a required FK and NULL for a nullable one.
    /// One-to-one columns never repeat an id within the batch; once the pool
    /// is used up they behave as if it were empty.
    pub fn pick(&self, column: &str, rng: &mut dyn RngCore) -> Result<Value> {
        let reference = self.descriptor.foreign_ref(column).ok_or_else(|| {
            Error::configuration(format!(
                "'{}.{column}' is not a declared foreign key",
                self.descriptor.name
            ))
        })?;

        let picked = match reference.cardinality {
            Cardinality::ManyToOne => self
                .registry
                .sample(&reference.target, 1, Replacement::WithReplacement, rng)
                .pop(),
            Cardinality::OneToOne => self.claim(column, &reference.target, rng),
        };
        match picked {
            Some(id) => Ok(id),
            None if reference.nullable => Ok(Value::Null),
            None => Err(self.empty_reference(column, &reference.target)),
        }
    }

    /// Sample `k` distinct target ids for the FK `column` (fewer when the pool
    /// is smaller).
    pub fn pick_distinct(&self, column: &str, k: usize, rng: &mut dyn RngCore) -> Result<Vec<Value>> {
        let reference = self.descriptor.foreign_ref(column).ok_or_else(|| {
            Error::configuration(format!(
                "'{}.{column}' is not a declared foreign key",
                self.descriptor.name
            ))
        })?;
        let ids = self
            .registry
            .sample(&reference.target, k, Replacement::WithoutReplacement, rng);
        if ids.is_empty() && k > 0 && !reference.nullable {
            return Err(self.empty_reference(column, &reference.target));
        }
        Ok(ids)
    }

    /// Sample a FK only with probability `p`; NULL otherwise.
    pub fn pick_if(&self, p: f64, column: &str, rng: &mut dyn RngCore) -> Result<Value> {
        if self.values.chance(p, rng) {
            self.pick(column, rng)
        } else {
            Ok(Value::Null)
        }
    }

    /// `Some(f(rng))` with probability `p`.
    pub fn maybe<T>(
        &self,
        p: f64,
        rng: &mut dyn RngCore,
        f: impl FnOnce(&mut dyn RngCore) -> T,
    ) -> Option<T> {
        if self.values.chance(p, rng) {
            Some(f(rng))
        } else {
            None
        }
    }

    /// A timestamp between `min_days` and `max_days` days before now.
    pub fn days_ago(&self, min_days: i64, max_days: i64, rng: &mut dyn RngCore) -> NaiveDateTime {
        self.now - Duration::days(self.values.int_between(min_days, max_days, rng))
    }

    /// A timestamp between `min_days` and `max_days` days after now.
    pub fn days_ahead(&self, min_days: i64, max_days: i64, rng: &mut dyn RngCore) -> NaiveDateTime {
        self.now + Duration::days(self.values.int_between(min_days, max_days, rng))
    }

    fn claim(&self, column: &str, target: &str, rng: &mut dyn RngCore) -> Option<Value> {
        let mut claimed = self.claimed.borrow_mut();
        let taken = claimed.entry(column.to_string()).or_default();
        let free: Vec<&Value> = self
            .registry
            .pool(target)
            .iter()
            .filter(|id| !taken.contains(id))
            .collect();
        if free.is_empty() {
            return None;
        }
        let id = free[rng.random_range(0..free.len())].clone();
        taken.push(id.clone());
        Some(id)
    }

    fn empty_reference(&self, column: &str, target: &str) -> Error {
        Error::EmptyReference {
            entity: self.descriptor.name.clone(),
            column: column.to_string(),
            target: target.to_string(),
        }
    }
}

/// One unit of generation: an optional parent id and the number of rows to
/// produce for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub index: usize,
    pub parent: Option<Value>,
    pub count: u32,
}

/// Expand an entity's row target into slots.
///
/// `Fixed(n)` gives `n` parentless single-row slots. `PerParent` samples
/// `floor(pool × coverage)` distinct parents and draws a child count for each
/// from the fan-out distribution.
pub fn plan_slots(
    descriptor: &EntityDescriptor,
    registry: &IdentifierRegistry,
    rng: &mut dyn RngCore,
) -> Result<Vec<Slot>> {
    match &descriptor.target {
        RowTarget::Fixed { rows } => Ok((0..*rows as usize)
            .map(|index| Slot {
                index,
                parent: None,
                count: 1,
            })
            .collect()),
        RowTarget::PerParent {
            parent,
            coverage,
            fan_out,
        } => {
            let pool = registry.len(parent);
            if pool == 0 {
                let column = descriptor
                    .references
                    .iter()
                    .find(|reference| &reference.target == parent)
                    .map(|reference| reference.column.clone())
                    .unwrap_or_default();
                return Err(Error::EmptyReference {
                    entity: descriptor.name.clone(),
                    column,
                    target: parent.clone(),
                });
            }

            let selected = (pool as f64 * coverage).floor() as usize;
            let parents = registry.sample(parent, selected, Replacement::WithoutReplacement, rng);
            Ok(parents
                .into_iter()
                .enumerate()
                .map(|(index, parent)| Slot {
                    index,
                    parent: Some(parent),
                    count: draw_fan_out(fan_out, rng),
                })
                .collect())
        }
    }
}

/// Weighted draw of a child count.
pub fn draw_fan_out(fan_out: &FanOut, rng: &mut dyn RngCore) -> u32 {
    let total = fan_out.total_weight();
    if total == 0 {
        return fan_out.min();
    }
    let mut roll = rng.random_range(0..total);
    for (count, weight) in &fan_out.choices {
        let weight = *weight as u64;
        if roll < weight {
            return *count;
        }
        roll -= weight;
    }
    fan_out.max()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use seedbed_core::{ColumnDef, ColumnKind, ForeignRef};

    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::source::FakeValueSource;

    fn child(coverage: f64, fan_out: FanOut) -> EntityDescriptor {
        EntityDescriptor::new("addresses")
            .column(ColumnDef::required("id", ColumnKind::Uuid))
            .reference(ForeignRef::required("profile_id", "profiles"))
            .reference(ForeignRef::optional("verified_by_user_id", "users"))
            .target(RowTarget::per_parent("profiles", coverage, fan_out))
    }

    fn registry(profiles: i64) -> IdentifierRegistry {
        let mut registry = IdentifierRegistry::new();
        registry.append("profiles", (0..profiles).map(Value::Int));
        registry
    }

    #[test]
    fn fixed_target_yields_parentless_slots() {
        let descriptor = EntityDescriptor::new("users")
            .column(ColumnDef::required("id", ColumnKind::Uuid))
            .target(RowTarget::fixed(3));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let slots = plan_slots(&descriptor, &IdentifierRegistry::new(), &mut rng).expect("slots");
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|slot| slot.parent.is_none() && slot.count == 1));
    }

    #[test]
    fn coverage_selects_distinct_parents() {
        let descriptor = child(0.7, FanOut::uniform(1, 2));
        let registry = registry(120);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let slots = plan_slots(&descriptor, &registry, &mut rng).expect("slots");

        assert_eq!(slots.len(), 84);
        let mut parents: Vec<i64> = slots
            .iter()
            .filter_map(|slot| slot.parent.as_ref().and_then(Value::as_i64))
            .collect();
        parents.sort_unstable();
        parents.dedup();
        assert_eq!(parents.len(), 84);
        assert!(slots.iter().all(|slot| (1..=2).contains(&slot.count)));
    }

    #[test]
    fn empty_parent_pool_is_an_empty_reference() {
        let descriptor = child(1.0, FanOut::exactly(1));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = plan_slots(&descriptor, &IdentifierRegistry::new(), &mut rng)
            .expect_err("empty pool");
        assert!(matches!(
            err,
            Error::EmptyReference { ref column, .. } if column == "profile_id"
        ));
    }

    #[test]
    fn nullable_reference_on_empty_pool_is_null() {
        let descriptor = child(1.0, FanOut::exactly(1));
        let registry = registry(1);
        let values = FakeValueSource::default();
        let ctx = GenerationContext::new(
            &descriptor,
            &registry,
            &values,
            FixedClock::at_date(2024, 6, 1).now(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            ctx.pick("verified_by_user_id", &mut rng).expect("nullable"),
            Value::Null
        );
        assert_eq!(ctx.pick("profile_id", &mut rng).expect("required"), Value::Int(0));
        assert!(ctx.pick("landmark", &mut rng).is_err());
    }

    #[test]
    fn one_to_one_picks_never_repeat() {
        let descriptor = EntityDescriptor::new("bank_accounts")
            .column(ColumnDef::required("id", ColumnKind::Uuid))
            .reference(ForeignRef::required("profile_id", "profiles").one_to_one())
            .target(RowTarget::fixed(3));
        let registry = registry(3);
        let values = FakeValueSource::default();
        let ctx = GenerationContext::new(
            &descriptor,
            &registry,
            &values,
            FixedClock::at_date(2024, 6, 1).now(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let mut picked: Vec<i64> = (0..3)
            .map(|_| ctx.pick("profile_id", &mut rng).expect("free id"))
            .filter_map(|id| id.as_i64())
            .collect();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2]);
        assert!(matches!(
            ctx.pick("profile_id", &mut rng),
            Err(Error::EmptyReference { .. })
        ));
    }

    #[test]
    fn fan_out_draws_follow_weights() {
        let fan_out = FanOut::weighted(&[(1, 70), (2, 30)]);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let draws: Vec<u32> = (0..1000).map(|_| draw_fan_out(&fan_out, &mut rng)).collect();
        let ones = draws.iter().filter(|count| **count == 1).count();
        assert!(draws.iter().all(|count| *count == 1 || *count == 2));
        assert!((600..=800).contains(&ones), "ones = {ones}");
    }
}

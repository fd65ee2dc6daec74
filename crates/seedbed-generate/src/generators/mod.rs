use std::collections::BTreeMap;

use rand::RngCore;

use seedbed_core::{DependencyGraph, EntityDescriptor, Error, Result, Row};

use crate::context::{GenerationContext, Slot, plan_slots};

/// Produces synthetic rows for one entity.
///
/// Generators read the registry through the context and never write to it;
/// all randomness comes from the `rng` argument.
pub trait EntityGenerator: Send + Sync {
    fn entity(&self) -> &str;

    /// Build the `ordinal`-th row of a slot. Fan-out entities find their
    /// parent id in `slot.parent`; fixed entities number rows by `slot.index`.
    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row>;

    /// Build all rows of a slot. Override when siblings must differ, e.g.
    /// distinct skills per profile.
    fn group(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Row>> {
        (0..slot.count)
            .map(|ordinal| self.row(ctx, slot, ordinal, rng))
            .collect()
    }
}

/// Run slot planning and the generator for one entity.
pub fn generate(
    generator: &dyn EntityGenerator,
    ctx: &GenerationContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<Vec<Row>> {
    let entity = &ctx.descriptor.name;
    let slots = plan_slots(ctx.descriptor, ctx.registry, rng)?;
    let mut rows = Vec::with_capacity(slots.iter().map(|slot| slot.count as usize).sum());

    for slot in &slots {
        let group = generator.group(ctx, slot, rng)?;
        if group.len() != slot.count as usize {
            return Err(Error::configuration(format!(
                "generator for '{entity}' produced {} rows for a slot of {}",
                group.len(),
                slot.count
            )));
        }
        rows.extend(group);
    }

    let pk = &ctx.descriptor.primary_key;
    if let Some(position) = rows.iter().position(|row| row.value(pk).is_null()) {
        return Err(Error::configuration(format!(
            "generator for '{entity}' left primary key '{pk}' empty in row {position}"
        )));
    }

    Ok(rows)
}

/// Entity descriptors paired with their generators.
#[derive(Default)]
pub struct GeneratorCatalog {
    descriptors: Vec<EntityDescriptor>,
    generators: BTreeMap<String, Box<dyn EntityGenerator>>,
}

impl GeneratorCatalog {
    pub fn new(descriptors: Vec<EntityDescriptor>) -> Self {
        Self {
            descriptors,
            generators: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, generator: Box<dyn EntityGenerator>) {
        self.generators
            .insert(generator.entity().to_string(), generator);
    }

    pub fn with(mut self, generator: impl EntityGenerator + 'static) -> Self {
        self.register(Box::new(generator));
        self
    }

    pub fn descriptors(&self) -> &[EntityDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Option<&EntityDescriptor> {
        self.descriptors.iter().find(|entity| entity.name == name)
    }

    pub fn generator(&self, name: &str) -> Option<&dyn EntityGenerator> {
        self.generators.get(name).map(Box::as_ref)
    }

    pub fn has_generator(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Build and validate the dependency graph of the declared entities.
    pub fn graph(&self) -> Result<DependencyGraph> {
        DependencyGraph::new(self.descriptors.clone())
    }
}

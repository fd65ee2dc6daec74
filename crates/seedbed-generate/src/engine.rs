use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use seedbed_core::{EntityDescriptor, Error, InsertStrategy, Result, RowTarget};
use seedbed_store::{Connector, Store};

use crate::clock::{Clock, SystemClock};
use crate::context::GenerationContext;
use crate::generators::{GeneratorCatalog, generate};
use crate::model::{PreloadReport, RunReport, RunState, StepReport};
use crate::registry::IdentifierRegistry;
use crate::source::{FakeValueSource, ValueSource};
use crate::strategy::{InsertionFailure, InsertionOutcome, strategy_for};

/// Knobs for one run. Anything left empty falls back to the descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub seed: u64,
    /// Entities to populate; `None` means the whole catalog.
    pub only: Option<Vec<String>>,
    pub strategies: BTreeMap<String, InsertStrategy>,
    /// Row count overrides, valid only for fixed-count entities.
    pub counts: BTreeMap<String, u64>,
    /// Load existing ids for referenced entities outside the selection.
    pub preload_external: bool,
}

/// Shared flag checked between entities.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One entity step with overrides applied.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub descriptor: EntityDescriptor,
    pub strategy: InsertStrategy,
    pub dependencies: Vec<String>,
}

/// Resolved, validated order of work. Building it performs no I/O.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub seed: u64,
    pub steps: Vec<PlannedStep>,
    /// Referenced entities that are not part of the selection.
    pub external: Vec<String>,
}

impl RunPlan {
    pub fn entities(&self) -> Vec<&str> {
        self.steps
            .iter()
            .map(|step| step.descriptor.name.as_str())
            .collect()
    }
}

/// A run that stopped before completing every step.
#[derive(Debug, thiserror::Error)]
#[error("run stopped ({}): {}", .report.state, .error)]
pub struct RunFailure {
    pub report: RunReport,
    pub entity: Option<String>,
    #[source]
    pub error: Error,
}

struct Halt {
    entity: Option<String>,
    error: Error,
}

impl Halt {
    fn at(entity: &str) -> impl FnOnce(Error) -> Halt + '_ {
        move |error| Halt {
            entity: Some(entity.to_string()),
            error,
        }
    }
}

/// Walks the dependency order, generating and inserting one entity at a time.
pub struct Orchestrator {
    catalog: GeneratorCatalog,
    values: Box<dyn ValueSource>,
    clock: Box<dyn Clock>,
    options: RunOptions,
    cancel: CancelFlag,
    run_id: String,
}

impl Orchestrator {
    pub fn new(catalog: GeneratorCatalog, options: RunOptions) -> Self {
        Self {
            catalog,
            values: Box::new(FakeValueSource::default()),
            clock: Box::new(SystemClock::new()),
            options,
            cancel: CancelFlag::new(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_value_source(mut self, values: impl ValueSource + 'static) -> Self {
        self.values = Box::new(values);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn catalog(&self) -> &GeneratorCatalog {
        &self.catalog
    }

    /// Resolve selection and overrides against the catalog.
    pub fn plan(&self) -> Result<RunPlan> {
        let graph = self.catalog.graph()?;
        let ordered = match &self.options.only {
            Some(only) if only.is_empty() => {
                return Err(Error::configuration("entity selection is empty"));
            }
            Some(only) => graph.order_for(only)?,
            None => graph.topological_order(),
        };
        let selected: BTreeSet<&str> = ordered.iter().map(|entity| entity.name.as_str()).collect();

        let overridden = self
            .options
            .strategies
            .keys()
            .map(|name| ("strategy", name))
            .chain(self.options.counts.keys().map(|name| ("count", name)));
        for (what, name) in overridden {
            if !graph.contains(name) {
                return Err(Error::configuration(format!(
                    "{what} override for unknown entity '{name}'"
                )));
            }
            if !selected.contains(name.as_str()) {
                return Err(Error::configuration(format!(
                    "{what} override for '{name}', which is not selected"
                )));
            }
        }

        let mut steps = Vec::with_capacity(ordered.len());
        let mut external = BTreeSet::new();
        for entity in ordered {
            if !self.catalog.has_generator(&entity.name) {
                return Err(Error::configuration(format!(
                    "no generator registered for entity '{}'",
                    entity.name
                )));
            }

            let mut descriptor = entity.clone();
            if let Some(rows) = self.options.counts.get(&entity.name) {
                if !matches!(descriptor.target, RowTarget::Fixed { .. }) {
                    return Err(Error::configuration(format!(
                        "count override for '{}' but its row count derives from a parent",
                        entity.name
                    )));
                }
                descriptor.target = RowTarget::fixed(*rows);
            }
            let strategy = self
                .options
                .strategies
                .get(&entity.name)
                .copied()
                .unwrap_or(entity.strategy);
            descriptor.strategy = strategy;

            let dependencies: Vec<String> = graph
                .dependencies(&entity.name)
                .into_iter()
                .map(str::to_string)
                .collect();
            external.extend(
                dependencies
                    .iter()
                    .filter(|name| !selected.contains(name.as_str()))
                    .cloned(),
            );

            steps.push(PlannedStep {
                descriptor,
                strategy,
                dependencies,
            });
        }

        Ok(RunPlan {
            seed: self.options.seed,
            steps,
            external: external.into_iter().collect(),
        })
    }

    pub async fn run(&self, connector: &dyn Connector) -> std::result::Result<RunReport, RunFailure> {
        let mut registry = IdentifierRegistry::new();
        self.run_with_registry(connector, &mut registry).await
    }

    /// Run against a caller-owned registry, e.g. one seeded with ids that
    /// already exist in the database.
    pub async fn run_with_registry(
        &self,
        connector: &dyn Connector,
        registry: &mut IdentifierRegistry,
    ) -> std::result::Result<RunReport, RunFailure> {
        let started = Instant::now();
        let mut report = RunReport::new(self.run_id.clone(), self.options.seed);

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(error) => {
                return Err(self.fail(report, Halt { entity: None, error }, started));
            }
        };

        info!(
            run_id = %self.run_id,
            seed = self.options.seed,
            entities = plan.steps.len(),
            target = %connector.describe(),
            "run started"
        );

        let mut store = match connector.connect().await {
            Ok(store) => store,
            Err(err) => {
                let halt = Halt {
                    entity: None,
                    error: err.into(),
                };
                return Err(self.fail(report, halt, started));
            }
        };

        let outcome = self
            .execute(&plan, store.as_mut(), registry, &mut report)
            .await;

        if let Err(err) = store.close().await {
            warn!(run_id = %self.run_id, error = %err, "closing the connection failed");
        }

        match outcome {
            Ok(()) => {
                report.state = RunState::Completed;
                report.duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    run_id = %self.run_id,
                    requested = report.total_requested(),
                    inserted = report.total_inserted(),
                    rejected = report.total_rejected(),
                    duration_ms = report.duration_ms,
                    "run completed"
                );
                Ok(report)
            }
            Err(halt) => Err(self.fail(report, halt, started)),
        }
    }

    async fn execute(
        &self,
        plan: &RunPlan,
        store: &mut dyn Store,
        registry: &mut IdentifierRegistry,
        report: &mut RunReport,
    ) -> std::result::Result<(), Halt> {
        if self.options.preload_external {
            self.preload(plan, store, registry, report)
                .await
                .map_err(|error| Halt { entity: None, error })?;
        }

        let now = self.clock.now();
        for step in &plan.steps {
            let entity = step.descriptor.name.as_str();
            if self.cancel.is_cancelled() {
                return Err(Halt::at(entity)(Error::Cancelled(entity.to_string())));
            }
            let step_started = Instant::now();

            report.state = RunState::Generating(entity.to_string());
            let generator = self.catalog.generator(entity).ok_or_else(|| Halt {
                entity: Some(entity.to_string()),
                error: Error::configuration(format!("no generator registered for entity '{entity}'")),
            })?;
            let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(self.options.seed, entity));
            let rows = {
                let ctx = GenerationContext::new(&step.descriptor, registry, self.values.as_ref(), now);
                generate(generator, &ctx, &mut rng)
            };
            let rows = match rows {
                Ok(rows) => rows,
                Err(error) => {
                    report
                        .steps
                        .push(fatal_step(step, &InsertionOutcome::default(), step_started));
                    return Err(Halt::at(entity)(error));
                }
            };

            report.state = RunState::Inserting(entity.to_string());
            let outcome = match strategy_for(step.strategy)
                .insert(store, &step.descriptor, rows)
                .await
            {
                Ok(outcome) => outcome,
                Err(InsertionFailure { outcome, error }) => {
                    // Committed rows are reported but kept out of the registry.
                    report.steps.push(fatal_step(step, &outcome, step_started));
                    return Err(Halt::at(entity)(error));
                }
            };

            registry.append(entity, outcome.inserted_ids);
            let step_report = StepReport {
                entity: entity.to_string(),
                strategy: step.strategy,
                requested: outcome.requested,
                inserted: outcome.inserted,
                rejected: outcome.rejected,
                fatal: false,
                duration_ms: step_started.elapsed().as_millis() as u64,
                rejection_samples: outcome.rejection_samples,
            };
            info!(
                run_id = %self.run_id,
                entity,
                strategy = %step.strategy,
                requested = step_report.requested,
                inserted = step_report.inserted,
                rejected = step_report.rejected,
                duration_ms = step_report.duration_ms,
                "entity populated"
            );
            report.steps.push(step_report);
        }

        Ok(())
    }

    async fn preload(
        &self,
        plan: &RunPlan,
        store: &mut dyn Store,
        registry: &mut IdentifierRegistry,
        report: &mut RunReport,
    ) -> Result<()> {
        for name in &plan.external {
            if registry.len(name) > 0 {
                continue;
            }
            let descriptor = self.catalog.descriptor(name).ok_or_else(|| {
                Error::configuration(format!("referenced entity '{name}' is not declared"))
            })?;
            let pk = &descriptor.primary_key;
            let kind = descriptor
                .column_def(pk)
                .map(|column| column.kind.clone())
                .ok_or_else(|| {
                    Error::configuration(format!("entity '{name}' has no primary key column"))
                })?;

            let ids = store.fetch_ids(name, pk, &kind).await?;
            info!(run_id = %self.run_id, entity = %name, ids = ids.len(), "preloaded identifiers");
            report.preloaded.push(PreloadReport {
                entity: name.clone(),
                ids: ids.len() as u64,
            });
            registry.append(name, ids);
        }
        Ok(())
    }

    fn fail(&self, mut report: RunReport, halt: Halt, started: Instant) -> RunFailure {
        report.state = match halt.error {
            Error::Cancelled(_) => RunState::Cancelled,
            _ => RunState::FatallyFailed,
        };
        report.failed_entity = halt.entity.clone();
        report.error_kind = Some(halt.error.kind());
        report.error = Some(halt.error.to_string());
        report.duration_ms = started.elapsed().as_millis() as u64;

        warn!(
            run_id = %self.run_id,
            entity = halt.entity.as_deref().unwrap_or("-"),
            kind = ?halt.error.kind(),
            error = %halt.error,
            inserted = report.total_inserted(),
            "run stopped"
        );

        RunFailure {
            report,
            entity: halt.entity,
            error: halt.error,
        }
    }
}

fn fatal_step(step: &PlannedStep, outcome: &InsertionOutcome, started: Instant) -> StepReport {
    StepReport {
        entity: step.descriptor.name.clone(),
        strategy: step.strategy,
        requested: outcome.requested,
        inserted: outcome.inserted,
        rejected: outcome.rejected,
        fatal: true,
        duration_ms: started.elapsed().as_millis() as u64,
        rejection_samples: outcome.rejection_samples.clone(),
    }
}

/// Per-entity seed derived from the run seed (FNV-1a over the entity name).
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

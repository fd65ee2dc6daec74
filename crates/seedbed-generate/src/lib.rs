//! Generation and population engine for seedbed.
//!
//! Walks entity descriptors in dependency order, generates rows from an
//! injected value source, clock and seeded RNG, and inserts them through a
//! [`seedbed_store::Store`] with a per-entity insertion strategy.

pub mod clock;
pub mod context;
pub mod engine;
pub mod generators;
pub mod model;
pub mod registry;
pub mod source;
pub mod strategy;
pub mod workforce;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{GenerationContext, Slot, draw_fan_out, plan_slots};
pub use engine::{
    CancelFlag, Orchestrator, PlannedStep, RunFailure, RunOptions, RunPlan, hash_seed,
};
pub use generators::{EntityGenerator, GeneratorCatalog, generate};
pub use model::{MAX_REJECTION_SAMPLES, PreloadReport, RunReport, RunState, StepReport};
pub use registry::{IdentifierRegistry, Replacement};
pub use source::{FakeValueSource, Locale, ValueSource};
pub use strategy::{
    AtomicBatch, InsertionFailure, InsertionOutcome, InsertionStrategy, TolerantRows, strategy_for,
};

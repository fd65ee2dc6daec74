use std::fmt;

use serde::{Deserialize, Serialize};

use seedbed_core::{ErrorKind, InsertStrategy};

/// Rejection messages kept per step.
pub const MAX_REJECTION_SAMPLES: usize = 10;

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "entity", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Generating(String),
    Inserting(String),
    Completed,
    FatallyFailed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::FatallyFailed | RunState::Cancelled
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => f.write_str("not_started"),
            RunState::Generating(entity) => write!(f, "generating({entity})"),
            RunState::Inserting(entity) => write!(f, "inserting({entity})"),
            RunState::Completed => f.write_str("completed"),
            RunState::FatallyFailed => f.write_str("fatally_failed"),
            RunState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of one entity step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub entity: String,
    pub strategy: InsertStrategy,
    pub requested: u64,
    pub inserted: u64,
    pub rejected: u64,
    pub fatal: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejection_samples: Vec<String>,
}

/// Summary of a run, written to `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub seed: u64,
    pub state: RunState,
    pub steps: Vec<StepReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preloaded: Vec<PreloadReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Identifiers loaded from the database before the first step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreloadReport {
    pub entity: String,
    pub ids: u64,
}

impl RunReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            state: RunState::NotStarted,
            steps: Vec::new(),
            preloaded: Vec::new(),
            failed_entity: None,
            error_kind: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn step(&self, entity: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.entity == entity)
    }

    pub fn total_requested(&self) -> u64 {
        self.steps.iter().map(|step| step.requested).sum()
    }

    pub fn total_inserted(&self) -> u64 {
        self.steps.iter().map(|step| step.inserted).sum()
    }

    pub fn total_rejected(&self) -> u64 {
        self.steps.iter().map(|step| step.rejected).sum()
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::RngCore;

use seedbed_core::{
    ColumnDef, ColumnKind, EntityDescriptor, ErrorKind, ForeignRef, InsertStrategy, Result, Row,
    RowTarget, Value,
};
use seedbed_generate::{
    EntityGenerator, FixedClock, GenerationContext, GeneratorCatalog, IdentifierRegistry,
    Orchestrator, RunOptions, RunState, Slot, workforce,
};
use seedbed_store::{MemoryConnector, StoredRow};

fn options(seed: u64) -> RunOptions {
    RunOptions {
        seed,
        ..RunOptions::default()
    }
}

fn orchestrator(options: RunOptions) -> Orchestrator {
    Orchestrator::new(workforce::catalog(), options)
        .with_clock(FixedClock::at_date(2024, 6, 1))
        .with_run_id("test-run")
}

fn uuids(prefix: u8, count: u8) -> Vec<Value> {
    (0..count)
        .map(|idx| {
            let mut bytes = [0u8; 16];
            bytes[0] = prefix;
            bytes[1] = idx;
            Value::Uuid(uuid::Uuid::from_bytes(bytes))
        })
        .collect()
}

fn selection(names: &[&str]) -> Option<Vec<String>> {
    Some(names.iter().map(|name| name.to_string()).collect())
}

fn keys(rows: &[StoredRow], column: &str) -> BTreeSet<String> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null())
        .map(Value::to_string)
        .collect()
}

#[tokio::test]
async fn full_catalog_keeps_every_reference_intact() {
    let descriptors = workforce::descriptors();
    let connector = MemoryConnector::new().enforce_references(&descriptors);

    let report = orchestrator(options(42))
        .run(&connector)
        .await
        .expect("full run");

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.steps.len(), 22);
    assert_eq!(report.total_rejected(), 0);
    assert_eq!(report.total_inserted() as usize, connector.total_rows());

    for descriptor in &descriptors {
        let rows = connector.rows(&descriptor.name);
        let step = report.step(&descriptor.name).expect("step reported");
        assert_eq!(step.inserted as usize, rows.len(), "{}", descriptor.name);
        assert!(!rows.is_empty(), "{} is empty", descriptor.name);

        for reference in &descriptor.references {
            let targets = keys(&connector.rows(&reference.target), "id");
            for row in &rows {
                let value = row.get(&reference.column).cloned().unwrap_or(Value::Null);
                if value.is_null() {
                    assert!(
                        reference.nullable,
                        "{}.{} is NULL",
                        descriptor.name, reference.column
                    );
                    continue;
                }
                assert!(
                    targets.contains(&value.to_string()),
                    "{}.{} points at a missing {}",
                    descriptor.name,
                    reference.column,
                    reference.target
                );
            }
        }
    }
}

#[tokio::test]
async fn entities_are_populated_after_their_parents() {
    let connector = MemoryConnector::new();
    let report = orchestrator(options(1)).run(&connector).await.expect("run");

    let position: BTreeMap<&str, usize> = report
        .steps
        .iter()
        .enumerate()
        .map(|(idx, step)| (step.entity.as_str(), idx))
        .collect();
    for descriptor in workforce::descriptors() {
        for target in descriptor.targets() {
            assert!(
                position[target] < position[descriptor.name.as_str()],
                "{target} must precede {}",
                descriptor.name
            );
        }
    }
}

#[tokio::test]
async fn same_seed_same_database() {
    let first = MemoryConnector::new();
    let second = MemoryConnector::new();
    let third = MemoryConnector::new();

    orchestrator(options(7)).run(&first).await.expect("first");
    orchestrator(options(7)).run(&second).await.expect("second");
    orchestrator(options(8)).run(&third).await.expect("third");

    for table in ["users", "profiles", "profile_skills", "project_deployments"] {
        assert_eq!(first.rows(table), second.rows(table), "{table}");
    }
    assert_ne!(first.rows("profiles"), third.rows("profiles"));
}

struct Loop(&'static str);

impl EntityGenerator for Loop {
    fn entity(&self) -> &str {
        self.0
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        _slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        Ok(Row::new().with("id", ctx.values.unique_id(rng)))
    }
}

fn looped(name: &str, target: &str) -> EntityDescriptor {
    EntityDescriptor::new(name)
        .column(ColumnDef::required("id", ColumnKind::Uuid))
        .reference(ForeignRef::optional("other_id", target))
        .target(RowTarget::fixed(3))
}

#[tokio::test]
async fn cyclic_graph_fails_before_connecting() {
    let catalog = GeneratorCatalog::new(vec![looped("a", "b"), looped("b", "a")])
        .with(Loop("a"))
        .with(Loop("b"));
    let connector = MemoryConnector::new();

    let failure = Orchestrator::new(catalog, options(0))
        .run(&connector)
        .await
        .expect_err("cycle");

    assert_eq!(failure.report.state, RunState::FatallyFailed);
    assert_eq!(failure.report.error_kind, Some(ErrorKind::Configuration));
    assert!(failure.report.steps.is_empty());
    assert_eq!(connector.connects(), 0);
    assert_eq!(connector.total_rows(), 0);
}

#[tokio::test]
async fn bad_overrides_fail_before_connecting() {
    let connector = MemoryConnector::new();
    let cases = [
        RunOptions {
            counts: BTreeMap::from([("addresses".to_string(), 10)]),
            ..options(0)
        },
        RunOptions {
            counts: BTreeMap::from([("invoices".to_string(), 10)]),
            ..options(0)
        },
        RunOptions {
            only: selection(&["users"]),
            strategies: BTreeMap::from([("profiles".to_string(), InsertStrategy::Tolerant)]),
            ..options(0)
        },
        RunOptions {
            only: selection(&["users", "timesheets"]),
            ..options(0)
        },
    ];

    for options in cases {
        let failure = orchestrator(options).run(&connector).await.expect_err("rejected");
        assert_eq!(failure.error.kind(), ErrorKind::Configuration);
    }
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn profile_skills_fan_out_over_preloaded_parents() {
    let mut registry = IdentifierRegistry::new();
    registry.append("users", uuids(1, 10));
    registry.append("skill_categories", uuids(2, 15));
    let skills: BTreeSet<String> = registry
        .pool("skill_categories")
        .iter()
        .map(Value::to_string)
        .collect();

    let connector = MemoryConnector::new();
    let report = orchestrator(RunOptions {
        only: selection(&["profile_skills", "profiles"]),
        ..options(3)
    })
    .run_with_registry(&connector, &mut registry)
    .await
    .expect("run");

    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].entity, "profiles");
    assert_eq!(connector.row_count("profiles"), 120);

    let rows = connector.rows("profile_skills");
    assert!((240..=600).contains(&rows.len()), "{} skills", rows.len());

    let mut per_profile: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in &rows {
        let skill = row["skill_category_id"].to_string();
        assert!(skills.contains(&skill));
        per_profile
            .entry(row["profile_id"].to_string())
            .or_default()
            .push(skill);
    }
    assert_eq!(per_profile.len(), 120);
    for skills in per_profile.values() {
        assert!((2..=5).contains(&skills.len()));
        let distinct: BTreeSet<&String> = skills.iter().collect();
        assert_eq!(distinct.len(), skills.len());
    }
    assert_eq!(registry.len("profile_skills"), rows.len());
}

#[tokio::test]
async fn tolerant_requests_skip_rejected_rows() {
    let mut registry = IdentifierRegistry::new();
    registry.append("users", uuids(1, 10));
    registry.append("employers", uuids(3, 20));
    registry.append("projects", uuids(4, 25));

    let connector = MemoryConnector::new().reject_when(|table, row| {
        (table == "project_requests"
            && row.get("status").and_then(Value::as_str) == Some("rejected"))
        .then(|| "request_status_guard: rejected requests are archived".to_string())
    });

    let report = orchestrator(RunOptions {
        only: selection(&["project_requests"]),
        counts: BTreeMap::from([("project_requests".to_string(), 100)]),
        strategies: BTreeMap::from([("project_requests".to_string(), InsertStrategy::Tolerant)]),
        ..options(11)
    })
    .run_with_registry(&connector, &mut registry)
    .await
    .expect("tolerant run completes");

    let step = report.step("project_requests").expect("step");
    assert_eq!(step.requested, 100);
    assert_eq!(step.inserted + step.rejected, 100);
    assert!(step.rejected > 0);
    assert!(!step.rejection_samples.is_empty());
    assert_eq!(registry.len("project_requests") as u64, step.inserted);
    assert_eq!(connector.row_count("project_requests") as u64, step.inserted);
    assert!(
        connector
            .rows("project_requests")
            .iter()
            .all(|row| row.get("status").and_then(Value::as_str) != Some("rejected"))
    );
}

#[tokio::test]
async fn one_bad_row_rolls_back_the_whole_batch() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let connector = MemoryConnector::new().reject_when(move |table, _| {
        (table == "profiles" && counter.fetch_add(1, Ordering::SeqCst) == 16)
            .then(|| "profile_guard: duplicate aadhar number".to_string())
    });

    let mut registry = IdentifierRegistry::new();
    let failure = orchestrator(RunOptions {
        only: selection(&["profiles", "addresses"]),
        counts: BTreeMap::from([("profiles".to_string(), 50)]),
        ..options(5)
    })
    .run_with_registry(&connector, &mut registry)
    .await
    .expect_err("atomic rejection");

    assert_eq!(failure.error.kind(), ErrorKind::BatchRejected);
    assert_eq!(failure.entity.as_deref(), Some("profiles"));
    assert_eq!(failure.report.failed_entity.as_deref(), Some("profiles"));
    assert!(failure.report.step("profiles").is_some_and(|step| step.fatal));
    assert!(failure.report.step("addresses").is_none());
    assert_eq!(connector.row_count("profiles"), 0);
    assert_eq!(registry.len("profiles"), 0);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn committed_entities_survive_a_later_failure() {
    let connector = MemoryConnector::new().reject_when(|table, _| {
        (table == "employers").then(|| "employer_guard: registrations closed".to_string())
    });

    let failure = orchestrator(options(9))
        .run(&connector)
        .await
        .expect_err("employers rejected");

    assert_eq!(failure.report.state, RunState::FatallyFailed);
    assert_eq!(connector.row_count("users"), 10);
    assert_eq!(connector.row_count("employers"), 0);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn cancellation_stops_at_the_next_entity() {
    let connector = MemoryConnector::new();
    let orchestrator = orchestrator(options(2));
    orchestrator.cancel_flag().cancel();

    let failure = orchestrator.run(&connector).await.expect_err("cancelled");

    assert_eq!(failure.report.state, RunState::Cancelled);
    assert_eq!(failure.report.error_kind, Some(ErrorKind::Cancelled));
    assert_eq!(failure.entity.as_deref(), Some("users"));
    assert_eq!(connector.total_rows(), 0);
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn connection_loss_aborts_tolerant_insertion() {
    let mut registry = IdentifierRegistry::new();
    registry.append("users", uuids(1, 10));
    registry.append("employers", uuids(3, 20));

    let connector = MemoryConnector::new().fail_after_statements(12);
    let failure = orchestrator(RunOptions {
        only: selection(&["project_requests"]),
        strategies: BTreeMap::from([("project_requests".to_string(), InsertStrategy::Tolerant)]),
        ..options(4)
    })
    .run_with_registry(&connector, &mut registry)
    .await
    .expect_err("connection lost");

    assert_eq!(failure.error.kind(), ErrorKind::Connection);
    let step = failure.report.step("project_requests").expect("step");
    assert!(step.fatal);
    assert_eq!(step.requested, 30);
    assert_eq!(step.inserted, 12);
    assert_eq!(step.rejected, 0);
    assert_eq!(failure.report.total_inserted(), 12);
    assert_eq!(connector.row_count("project_requests"), 12);
    assert_eq!(registry.len("project_requests"), 0);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn preload_fills_external_pools_from_the_database() {
    let connector = MemoryConnector::new();
    orchestrator(options(21)).run(&connector).await.expect("seed run");
    let profiles_before = connector.row_count("profiles");

    let report = orchestrator(RunOptions {
        only: selection(&["batch_enrollments", "project_deployments"]),
        preload_external: true,
        ..options(22)
    })
    .run(&connector)
    .await
    .expect("final tables");

    let preloaded: BTreeSet<&str> = report
        .preloaded
        .iter()
        .map(|preload| preload.entity.as_str())
        .collect();
    assert_eq!(
        preloaded,
        BTreeSet::from(["profiles", "projects", "training_batches", "users"])
    );
    assert_eq!(connector.row_count("profiles"), profiles_before);
    assert!(report.step("batch_enrollments").is_some_and(|step| step.inserted == 84));
    assert!(report.step("project_deployments").is_some_and(|step| step.inserted == 72));
}

#[tokio::test]
async fn missing_parents_without_preload_is_an_empty_reference() {
    let connector = MemoryConnector::new();
    let failure = orchestrator(RunOptions {
        only: selection(&["addresses"]),
        ..options(0)
    })
    .run(&connector)
    .await
    .expect_err("no profiles");

    assert_eq!(failure.error.kind(), ErrorKind::EmptyReference);
    assert_eq!(failure.entity.as_deref(), Some("addresses"));
    assert_eq!(connector.closes(), 1);
}

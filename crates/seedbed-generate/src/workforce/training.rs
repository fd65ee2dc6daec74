use chrono::Duration;
use rand::RngCore;

use seedbed_core::ColumnKind::{Date, Int, Text};
use seedbed_core::{
    ColumnDef, EntityDescriptor, FanOut, ForeignRef, InsertStrategy, Result, Row, RowTarget,
};

use super::{
    CITIES, ENROLLMENT_STATUS, SKILLS, audited, entity, enum_kind, id, stamped, storage_url,
};
use crate::context::{GenerationContext, Slot};
use crate::generators::EntityGenerator;

pub(super) fn training_batches() -> EntityDescriptor {
    audited(
        entity("training_batches")
            .column(ColumnDef::required("batch_code", Text))
            .column(ColumnDef::required("batch_name", Text))
            .column(ColumnDef::nullable("training_program_name", Text))
            .column(ColumnDef::nullable("training_provider", Text))
            .column(ColumnDef::nullable("trainer_name", Text))
            .column(ColumnDef::required("start_date", Date))
            .column(ColumnDef::required("end_date", Date))
            .column(ColumnDef::nullable("duration_days", Int))
            .column(ColumnDef::nullable("max_capacity", Int))
            .column(ColumnDef::required("status", enum_kind("batch_status")))
            .column(ColumnDef::nullable("location", Text))
            .column(ColumnDef::nullable("description", Text)),
    )
    .reference(ForeignRef::required("created_by_user_id", "users"))
    .target(RowTarget::fixed(8))
}

/// Batch status follows from the dates: past batches are completed, running
/// ones ongoing, the rest upcoming.
pub struct TrainingBatches;

impl EntityGenerator for TrainingBatches {
    fn entity(&self) -> &str {
        "training_batches"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let start = ctx.days_ago(0, 180, rng);
        let duration = values.int_between(30, 90, rng);
        let end = start + Duration::days(duration);
        let status = if end < ctx.now {
            "completed"
        } else if start < ctx.now {
            "ongoing"
        } else {
            "upcoming"
        };

        let row = Row::new()
            .with("id", id(ctx, rng))
            .with("batch_code", format!("BATCH-{}", 2000 + slot.index))
            .with(
                "batch_name",
                format!(
                    "Batch {} - {} Training",
                    slot.index + 1,
                    values.choose(SKILLS, rng)
                ),
            )
            .with("training_program_name", values.choose(SKILLS, rng))
            .with("training_provider", values.company(rng))
            .with("trainer_name", values.full_name(rng))
            .with("start_date", start.date())
            .with("end_date", end.date())
            .with("duration_days", duration)
            .with("max_capacity", values.int_between(20, 50, rng))
            .with("status", status)
            .with("location", values.choose(CITIES, rng))
            .with("description", values.text(200, rng))
            .with("created_by_user_id", ctx.pick("created_by_user_id", rng)?);
        Ok(stamped(row, ctx))
    }
}

pub(super) fn batch_enrollments() -> EntityDescriptor {
    audited(
        entity("batch_enrollments")
            .column(ColumnDef::required("enrollment_date", Date))
            .column(ColumnDef::nullable("completion_date", Date))
            .column(ColumnDef::required("status", enum_kind("enrollment_status")))
            .column(ColumnDef::nullable("attendance_percentage", Int))
            .column(ColumnDef::nullable("score", Int))
            .column(ColumnDef::nullable("certificate_url", Text))
            .column(ColumnDef::nullable("notes", Text)),
    )
    .reference(ForeignRef::required("profile_id", "profiles"))
    .reference(ForeignRef::required("batch_id", "training_batches"))
    .reference(ForeignRef::required("enrolled_by_user_id", "users"))
    .strategy(InsertStrategy::Tolerant)
    .target(RowTarget::per_parent("profiles", 0.7, FanOut::exactly(1)))
}

/// One enrollment for 70% of profiles. Completion date, score and
/// certificate only exist for completed enrollments.
pub struct BatchEnrollments;

impl EntityGenerator for BatchEnrollments {
    fn entity(&self) -> &str {
        "batch_enrollments"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let batch = ctx.pick("batch_id", rng)?;
        let enrolled = ctx.days_ago(1, 90, rng);
        let status = values.choose(ENROLLMENT_STATUS, rng);

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("profile_id", slot.parent.clone())
            .with("batch_id", batch)
            .with("enrollment_date", enrolled.date())
            .with("status", status)
            .with(
                "attendance_percentage",
                ctx.maybe(0.7, rng, |rng| values.int_between(60, 100, rng)),
            )
            .with("notes", ctx.maybe(0.3, rng, |rng| values.text(100, rng)))
            .with("enrolled_by_user_id", ctx.pick("enrolled_by_user_id", rng)?);

        if status == "completed" {
            let completed = enrolled + Duration::days(values.int_between(30, 90, rng));
            row.set("completion_date", completed.date());
            row.set("score", values.int_between(50, 95, rng));
            row.set(
                "certificate_url",
                ctx.maybe(0.5, rng, |rng| storage_url(ctx, "certificates", "pdf", rng)),
            );
        }
        Ok(stamped(row, ctx))
    }
}

use chrono::Duration;
use rand::RngCore;

use seedbed_core::ColumnKind::{Bool, Date, Float, Int, Text, Timestamp};
use seedbed_core::{
    ColumnDef, EntityDescriptor, FanOut, ForeignRef, InsertStrategy, Result, Row, RowTarget, Value,
};

use super::people::distinct_refs;
use super::{
    CITIES, DEPLOYMENT_STATUS, PROJECT_STATUS, REQUEST_STATUS, audited, entity, enum_kind, id,
    phone, stamped,
};
use crate::context::{GenerationContext, Slot};
use crate::generators::EntityGenerator;

const PROJECT_TYPES: &[&str] = &["Residential", "Commercial", "Industrial", "Infrastructure"];

/// Weights for [`DEPLOYMENT_STATUS`], in order.
const DEPLOYMENT_WEIGHTS: &[u32] = &[40, 20, 30, 10];

pub(super) fn projects() -> EntityDescriptor {
    audited(
        entity("projects")
            .column(ColumnDef::required("project_code", Text))
            .column(ColumnDef::required("project_name", Text))
            .column(ColumnDef::nullable("project_number", Text))
            .column(ColumnDef::nullable("location", Text))
            .column(ColumnDef::nullable("phone_number", Text))
            .column(ColumnDef::nullable("deployment_date", Date))
            .column(ColumnDef::nullable("award_date", Date))
            .column(ColumnDef::nullable("start_date", Date))
            .column(ColumnDef::nullable("end_date", Date))
            .column(ColumnDef::nullable("revised_completion_date", Date))
            .column(ColumnDef::required("status", enum_kind("project_status")))
            .column(ColumnDef::nullable("required_workers", Int))
            .column(ColumnDef::nullable("project_manager", Text))
            .column(ColumnDef::nullable("description", Text))
            .column(ColumnDef::nullable("po_co_number", Text))
            .column(ColumnDef::nullable("contract_value_a", Int))
            .column(ColumnDef::nullable("revised_contract_value_b", Float))
            .column(ColumnDef::nullable("variation_order_value_c", Int))
            .column(ColumnDef::nullable("actual_cost_incurred_d", Int))
            .column(ColumnDef::nullable("misc_cost_e", Int))
            .column(ColumnDef::nullable("budget", Float))
            .column(ColumnDef::required("is_active", Bool))
            .column(ColumnDef::required("is_accommodation_provided", Bool))
            .column(ColumnDef::nullable("approved_at", Timestamp))
            .column(ColumnDef::nullable("approval_notes", Text))
            .column(ColumnDef::nullable("rejection_reason", Text))
            .column(ColumnDef::nullable("deleted_at", Timestamp)),
    )
    .reference(ForeignRef::required("employer_id", "employers"))
    .reference(ForeignRef::optional("approved_by_user_id", "users"))
    .reference(ForeignRef::required("created_by_user_id", "users"))
    .reference(ForeignRef::optional("deleted_by_user_id", "users"))
    .target(RowTarget::fixed(25))
}

/// Projects with contract figures derived from one contract value. Costs are
/// only incurred once a project is active or completed.
pub struct Projects;

impl EntityGenerator for Projects {
    fn entity(&self) -> &str {
        "projects"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let start = ctx.days_ago(0, 365, rng).date();
        let end = start + Duration::days(values.int_between(180, 730, rng));
        let status = values.choose(PROJECT_STATUS, rng);
        let contract = values.int_between(5_000_000, 50_000_000, rng);
        let actual_cost = if matches!(status, "active" | "completed") {
            values.int_between(0, contract * 8 / 10, rng)
        } else {
            0
        };

        let row = Row::new()
            .with("id", id(ctx, rng))
            .with("project_code", format!("PRJ-{}", 30000 + slot.index))
            .with(
                "project_name",
                format!(
                    "{} Project - {}",
                    values.choose(PROJECT_TYPES, rng),
                    values.street(rng)
                ),
            )
            .with(
                "project_number",
                format!("PN-{}", values.int_between(1000, 9999, rng)),
            )
            .with("location", values.choose(CITIES, rng))
            .with("phone_number", phone(ctx, rng))
            .with("deployment_date", ctx.maybe(0.7, rng, |_| start))
            .with("award_date", ctx.maybe(0.8, rng, |_| start))
            .with("start_date", start)
            .with("end_date", end)
            .with("revised_completion_date", ctx.maybe(0.5, rng, |_| end))
            .with("status", status)
            .with("required_workers", values.int_between(10, 100, rng))
            .with("project_manager", values.full_name(rng))
            .with("description", values.text(200, rng))
            .with(
                "po_co_number",
                format!("PO-{}", values.int_between(1000, 9999, rng)),
            )
            .with("contract_value_a", contract)
            .with(
                "revised_contract_value_b",
                ctx.maybe(0.5, rng, |rng| {
                    contract as f64 * values.float_between(0.9, 1.1, rng)
                }),
            )
            .with(
                "variation_order_value_c",
                values.int_between(0, contract / 10, rng),
            )
            .with("actual_cost_incurred_d", actual_cost)
            .with("misc_cost_e", values.int_between(0, contract / 20, rng))
            .with(
                "budget",
                ctx.maybe(0.5, rng, |rng| {
                    contract as f64 * values.float_between(0.95, 1.15, rng)
                }),
            )
            .with("is_active", true)
            .with("is_accommodation_provided", values.chance(0.5, rng))
            .with("approved_at", ctx.days_ago(1, 30, rng))
            .with(
                "approval_notes",
                ctx.maybe(0.5, rng, |rng| values.text(100, rng)),
            )
            .with("rejection_reason", None::<String>)
            .with("employer_id", ctx.pick("employer_id", rng)?)
            .with("approved_by_user_id", ctx.pick("approved_by_user_id", rng)?)
            .with("created_by_user_id", ctx.pick("created_by_user_id", rng)?)
            .with("deleted_at", None::<String>)
            .with("deleted_by_user_id", None::<String>);
        Ok(stamped(row, ctx))
    }
}

pub(super) fn project_resource_requirements() -> EntityDescriptor {
    audited(
        entity("project_resource_requirements")
            .column(ColumnDef::required("required_count", Int))
            .column(ColumnDef::nullable("notes", Text)),
    )
    .reference(ForeignRef::required("project_id", "projects"))
    .reference(ForeignRef::required("skill_category_id", "skill_categories"))
    .target(RowTarget::per_parent("projects", 1.0, FanOut::uniform(2, 5)))
}

/// Two to five distinct skills required per project.
pub struct ProjectResourceRequirements;

impl ProjectResourceRequirements {
    fn requirement(
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        skill: Value,
        rng: &mut dyn RngCore,
    ) -> Row {
        let values = ctx.values;
        let row = Row::new()
            .with("id", id(ctx, rng))
            .with("project_id", slot.parent.clone())
            .with("skill_category_id", skill)
            .with("required_count", values.int_between(5, 30, rng))
            .with("notes", ctx.maybe(0.3, rng, |rng| values.text(100, rng)));
        stamped(row, ctx)
    }
}

impl EntityGenerator for ProjectResourceRequirements {
    fn entity(&self) -> &str {
        "project_resource_requirements"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let skill = ctx.pick("skill_category_id", rng)?;
        Ok(Self::requirement(ctx, slot, skill, rng))
    }

    fn group(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Row>> {
        let skills = distinct_refs(ctx, "skill_category_id", slot.count, rng)?;
        Ok(skills
            .into_iter()
            .map(|skill| Self::requirement(ctx, slot, skill, rng))
            .collect())
    }
}

pub(super) fn project_deployments() -> EntityDescriptor {
    audited(
        entity("project_deployments")
            .column(ColumnDef::required("deployment_date", Date))
            .column(ColumnDef::nullable("expected_end_date", Date))
            .column(ColumnDef::nullable("actual_end_date", Date))
            .column(ColumnDef::required("status", enum_kind("deployment_status")))
            .column(ColumnDef::nullable("performance_rating", Int)),
    )
    .reference(ForeignRef::required("project_id", "projects"))
    .reference(ForeignRef::required("profile_id", "profiles"))
    .reference(ForeignRef::required("deployed_by_user_id", "users"))
    .strategy(InsertStrategy::Tolerant)
    .target(RowTarget::per_parent("profiles", 0.6, FanOut::exactly(1)))
}

/// Deploys 60% of profiles. `actual_end_date` only for completed deployments,
/// a rating only for active or completed ones.
pub struct ProjectDeployments;

impl EntityGenerator for ProjectDeployments {
    fn entity(&self) -> &str {
        "project_deployments"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let project = ctx.pick("project_id", rng)?;
        let deployed = ctx.days_ago(1, 180, rng).date();
        let expected_end = deployed + Duration::days(values.int_between(90, 365, rng));
        let weighted: Vec<(&str, u32)> = DEPLOYMENT_STATUS
            .iter()
            .copied()
            .zip(DEPLOYMENT_WEIGHTS.iter().copied())
            .collect();
        let status = values.weighted(&weighted, rng);

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("project_id", project)
            .with("profile_id", slot.parent.clone())
            .with("deployment_date", deployed)
            .with("expected_end_date", expected_end)
            .with("status", status)
            .with("deployed_by_user_id", ctx.pick("deployed_by_user_id", rng)?);

        if status == "completed" {
            row.set(
                "actual_end_date",
                deployed + Duration::days(values.int_between(90, 300, rng)),
            );
        }
        if matches!(status, "active" | "completed") {
            row.set("performance_rating", values.int_between(1, 5, rng));
        }
        Ok(stamped(row, ctx))
    }
}

pub(super) fn project_requests() -> EntityDescriptor {
    audited(
        entity("project_requests")
            .column(ColumnDef::required("project_title", Text))
            .column(ColumnDef::nullable("project_description", Text))
            .column(ColumnDef::nullable("location", Text))
            .column(ColumnDef::nullable("estimated_start_date", Date))
            .column(ColumnDef::nullable("estimated_duration_days", Int))
            .column(ColumnDef::nullable("estimated_budget", Int))
            .column(ColumnDef::nullable("required_workers_count", Int))
            .column(ColumnDef::nullable("additional_notes", Text))
            .column(ColumnDef::required("status", enum_kind("request_status")))
            .column(ColumnDef::nullable("reviewed_at", Timestamp)),
    )
    .reference(ForeignRef::required("employer_id", "employers"))
    .reference(ForeignRef::optional("project_id", "projects"))
    .reference(ForeignRef::optional("reviewed_by_user_id", "users"))
    .target(RowTarget::fixed(30))
}

/// Employer requests. Unreviewed requests stay pending; reviewed ones carry
/// the reviewer and review time.
pub struct ProjectRequests;

impl EntityGenerator for ProjectRequests {
    fn entity(&self) -> &str {
        "project_requests"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        _slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let is_reviewed = values.chance(0.7, rng);
        let status = if is_reviewed {
            values.choose(REQUEST_STATUS, rng)
        } else {
            "pending"
        };

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("employer_id", ctx.pick("employer_id", rng)?)
            .with("project_id", ctx.pick_if(0.5, "project_id", rng)?)
            .with("project_title", values.sentence(10, rng))
            .with("project_description", values.text(300, rng))
            .with("location", values.choose(CITIES, rng))
            .with("estimated_start_date", ctx.days_ahead(30, 180, rng).date())
            .with("estimated_duration_days", values.int_between(30, 365, rng))
            .with(
                "estimated_budget",
                values.int_between(5_000_000, 50_000_000, rng),
            )
            .with("required_workers_count", values.int_between(10, 100, rng))
            .with(
                "additional_notes",
                ctx.maybe(0.5, rng, |rng| values.text(200, rng)),
            )
            .with("status", status);

        if is_reviewed {
            row.set("reviewed_at", ctx.days_ago(1, 30, rng));
            row.set("reviewed_by_user_id", ctx.pick("reviewed_by_user_id", rng)?);
        }
        Ok(stamped(row, ctx))
    }
}

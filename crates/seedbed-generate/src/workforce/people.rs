use chrono::{Days, Duration};
use rand::RngCore;
use rand::seq::SliceRandom;

use seedbed_core::ColumnKind::{Bool, Date, Int, Text, Timestamp};
use seedbed_core::{ColumnDef, EntityDescriptor, Error, FanOut, ForeignRef, Result, Row, RowTarget};

use super::{
    ACCOUNT_TYPE, ADDRESS_TYPE, GENDER_TYPE, SKILLS, VERIFICATION_STATUS, audited, cycled,
    entity, enum_kind, id, password_hash, phone, postal_address, stamped, storage_url, uppercase,
};
use crate::context::{GenerationContext, Slot};
use crate::generators::EntityGenerator;
use crate::source::truncate;

const DOCUMENT_CATEGORIES: &[&str] = &["identity", "education", "employment", "financial"];
const DOCUMENT_TYPES: &[&str] = &[
    "aadhaar",
    "pan",
    "resume",
    "certificate",
    "photo",
    "police_verification",
];
const EXPIRING_DOCUMENTS: &[&str] = &["aadhaar", "pan", "police_verification"];
const STAGES: &[&str] = &[
    "new_join",
    "screening",
    "approved",
    "training",
    "benched",
    "deployed",
    "upskilling",
];

pub(super) fn users() -> EntityDescriptor {
    audited(
        entity("users")
            .column(ColumnDef::required("username", Text))
            .column(ColumnDef::required("email", Text))
            .column(ColumnDef::required("password_hash", Text))
            .column(ColumnDef::required("full_name", Text))
            .column(ColumnDef::nullable("phone_number", Text))
            .column(ColumnDef::required("is_active", Bool))
            .column(ColumnDef::nullable("last_login", Timestamp)),
    )
    .target(RowTarget::fixed(10))
}

pub struct Users;

impl EntityGenerator for Users {
    fn entity(&self) -> &str {
        "users"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let row = Row::new()
            .with("id", id(ctx, rng))
            .with("username", format!("user{}", slot.index + 1))
            .with("email", ctx.values.email(rng))
            .with("password_hash", password_hash(ctx, rng))
            .with("full_name", ctx.values.full_name(rng))
            .with("phone_number", phone(ctx, rng))
            .with("is_active", true)
            .with("last_login", ctx.days_ago(1, 30, rng));
        Ok(stamped(row, ctx))
    }
}

pub(super) fn skill_categories() -> EntityDescriptor {
    audited(
        entity("skill_categories")
            .column(ColumnDef::required("name", Text))
            .column(ColumnDef::nullable("description", Text))
            .column(ColumnDef::required("is_active", Bool))
            .column(ColumnDef::required("display_order", Int)),
    )
    .target(RowTarget::fixed(SKILLS.len() as u64))
}

pub struct SkillCategories;

impl EntityGenerator for SkillCategories {
    fn entity(&self) -> &str {
        "skill_categories"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let name = cycled(SKILLS, slot.index);
        let row = Row::new()
            .with("id", id(ctx, rng))
            .with(
                "description",
                format!("Professional {} services", name.to_lowercase()),
            )
            .with("name", name)
            .with("is_active", true)
            .with("display_order", slot.index as i64);
        Ok(stamped(row, ctx))
    }
}

pub(super) fn employers() -> EntityDescriptor {
    audited(
        entity("employers")
            .column(ColumnDef::required("employer_code", Text))
            .column(ColumnDef::required("company_name", Text))
            .column(ColumnDef::nullable("client_name", Text))
            .column(ColumnDef::required("email", Text))
            .column(ColumnDef::required("password_hash", Text))
            .column(ColumnDef::required("phone_number", Text))
            .column(ColumnDef::nullable("alternative_phone", Text))
            .column(ColumnDef::nullable("registered_address", Text))
            .column(ColumnDef::nullable("company_registration_number", Text))
            .column(ColumnDef::nullable("gst_number", Text))
            .column(ColumnDef::nullable("authorized_person_name", Text))
            .column(ColumnDef::nullable("authorized_person_designation", Text))
            .column(ColumnDef::nullable("authorized_person_email", Text))
            .column(ColumnDef::nullable("authorized_person_contact", Text))
            .column(ColumnDef::nullable("authorized_person_address", Text))
            .column(ColumnDef::required("is_approved", Bool))
            .column(ColumnDef::required("is_active", Bool))
            .column(ColumnDef::required("is_verified", Bool))
            .column(ColumnDef::nullable("verified_at", Timestamp))
            .column(ColumnDef::nullable("last_login", Timestamp))
            .column(ColumnDef::nullable("deleted_at", Timestamp)),
    )
    .reference(ForeignRef::optional("verified_by_user_id", "users"))
    .reference(ForeignRef::optional("deleted_by_user_id", "users"))
    .target(RowTarget::fixed(20))
}

pub struct Employers;

impl EntityGenerator for Employers {
    fn entity(&self) -> &str {
        "employers"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let is_approved = values.chance(0.5, rng);
        let is_verified = is_approved && values.chance(0.7, rng);

        let registration = ctx.maybe(0.7, rng, |rng| {
            format!(
                "{}{}{}",
                values.int_between(1_000_000, 9_999_999, rng),
                uppercase(ctx, 3, rng),
                values.int_between(1000, 9999, rng)
            )
        });
        let gst = ctx.maybe(0.5, rng, |rng| {
            format!(
                "{}{}{}{}{}{}{}",
                values.int_between(10, 35, rng),
                uppercase(ctx, 5, rng),
                values.int_between(1000, 9999, rng),
                uppercase(ctx, 1, rng),
                values.int_between(1, 9, rng),
                uppercase(ctx, 1, rng),
                values.int_between(1, 9, rng)
            )
        });

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("employer_code", format!("EMPLR-{}", 1000 + slot.index))
            .with("company_name", values.company(rng))
            .with("client_name", values.full_name(rng))
            .with("email", values.email(rng))
            .with("password_hash", password_hash(ctx, rng))
            .with("phone_number", phone(ctx, rng))
            .with("alternative_phone", ctx.maybe(0.5, rng, |rng| phone(ctx, rng)))
            .with("registered_address", postal_address(ctx, rng))
            .with("company_registration_number", registration)
            .with("gst_number", gst)
            .with("authorized_person_name", values.full_name(rng))
            .with(
                "authorized_person_designation",
                values.choose(&["CEO", "Director", "Manager", "HR Head"], rng),
            )
            .with("authorized_person_email", values.email(rng))
            .with("authorized_person_contact", phone(ctx, rng))
            .with(
                "authorized_person_address",
                ctx.maybe(0.5, rng, |rng| postal_address(ctx, rng)),
            )
            .with("is_approved", is_approved)
            .with("is_active", true)
            .with("is_verified", is_verified)
            .with("last_login", ctx.maybe(0.5, rng, |rng| ctx.days_ago(1, 30, rng)))
            .with("created_at", ctx.days_ago(30, 365, rng))
            .with("updated_at", ctx.now)
            .with("deleted_at", None::<String>)
            .with("deleted_by_user_id", None::<String>);

        if is_verified {
            row.set("verified_at", ctx.days_ago(1, 60, rng));
            row.set("verified_by_user_id", ctx.pick("verified_by_user_id", rng)?);
        }
        Ok(row)
    }
}

pub(super) fn profiles() -> EntityDescriptor {
    audited(
        entity("profiles")
            .column(ColumnDef::required("profile_code", Text))
            .column(ColumnDef::required("mobile_number", Text))
            .column(ColumnDef::nullable("alternative_whatsapp_number", Text))
            .column(ColumnDef::nullable("email", Text))
            .column(ColumnDef::required("first_name", Text))
            .column(ColumnDef::nullable("middle_name", Text))
            .column(ColumnDef::required("last_name", Text))
            .column(ColumnDef::nullable("fathers_name", Text))
            .column(ColumnDef::nullable("aadhar_number", Text))
            .column(ColumnDef::nullable("gender", enum_kind("gender_type")))
            .column(ColumnDef::nullable("date_of_birth", Date))
            .column(ColumnDef::required("is_active", Bool))
            .column(ColumnDef::nullable("employee_code", Text))
            .column(ColumnDef::required("is_blacklisted", Bool))
            .column(ColumnDef::nullable("blacklist_reason", Text))
            .column(ColumnDef::nullable("blacklisted_at", Timestamp))
            .column(ColumnDef::nullable("profile_photo_url", Text))
            .column(ColumnDef::nullable("deleted_at", Timestamp)),
    )
    .reference(ForeignRef::optional("blacklisted_by_user_id", "users"))
    .reference(ForeignRef::optional("deleted_by_user_id", "users"))
    .target(RowTarget::fixed(120))
}

pub struct Profiles;

impl EntityGenerator for Profiles {
    fn entity(&self) -> &str {
        "profiles"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let today = ctx.today();
        let oldest = today.checked_sub_days(Days::new(60 * 365)).unwrap_or(today);
        let youngest = today.checked_sub_days(Days::new(20 * 365)).unwrap_or(today);
        let is_blacklisted = values.chance(0.05, rng);

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("profile_code", format!("PRF-{}", 10000 + slot.index))
            .with("mobile_number", phone(ctx, rng))
            .with(
                "alternative_whatsapp_number",
                ctx.maybe(0.5, rng, |rng| phone(ctx, rng)),
            )
            .with("email", ctx.maybe(0.5, rng, |rng| values.email(rng)))
            .with("first_name", values.first_name(rng))
            .with("middle_name", ctx.maybe(0.5, rng, |rng| values.first_name(rng)))
            .with("last_name", values.last_name(rng))
            .with("fathers_name", values.full_name(rng))
            .with(
                "aadhar_number",
                values
                    .int_between(100_000_000_000, 999_999_999_999, rng)
                    .to_string(),
            )
            .with("gender", values.choose(GENDER_TYPE, rng))
            .with("date_of_birth", values.date_between(oldest, youngest, rng))
            .with("is_active", true)
            .with(
                "employee_code",
                ctx.maybe(0.7, rng, |_| format!("EMP-{}", 5000 + slot.index)),
            )
            .with("is_blacklisted", is_blacklisted)
            .with("created_at", ctx.days_ago(1, 180, rng))
            .with("updated_at", ctx.now)
            .with(
                "profile_photo_url",
                ctx.maybe(0.5, rng, |rng| storage_url(ctx, "photos", "jpg", rng)),
            )
            .with("deleted_at", None::<String>)
            .with("deleted_by_user_id", None::<String>);

        if is_blacklisted {
            row.set("blacklist_reason", values.sentence(6, rng));
            row.set("blacklisted_at", ctx.days_ago(1, 90, rng));
            row.set(
                "blacklisted_by_user_id",
                ctx.pick("blacklisted_by_user_id", rng)?,
            );
        }
        Ok(row)
    }
}

pub(super) fn addresses() -> EntityDescriptor {
    audited(
        entity("addresses")
            .column(ColumnDef::required("address_type", enum_kind("address_type")))
            .column(ColumnDef::nullable("house_number", Text))
            .column(ColumnDef::required("village_or_city", Text))
            .column(ColumnDef::required("state", Text))
            .column(ColumnDef::required("postal_code", Text))
            .column(ColumnDef::nullable("landmark", Text))
            .column(ColumnDef::nullable("police_station", Text))
            .column(ColumnDef::nullable("post_office", Text))
            .column(ColumnDef::required("is_current", Bool)),
    )
    .reference(ForeignRef::required("profile_id", "profiles"))
    .target(RowTarget::per_parent(
        "profiles",
        1.0,
        FanOut::weighted(&[(1, 70), (2, 30)]),
    ))
}

pub struct Addresses;

impl EntityGenerator for Addresses {
    fn entity(&self) -> &str {
        "addresses"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let address_type = ADDRESS_TYPE
            .get(ordinal as usize)
            .copied()
            .unwrap_or("permanent");
        let row = Row::new()
            .with("id", id(ctx, rng))
            .with("profile_id", slot.parent.clone())
            .with("address_type", address_type)
            .with("house_number", values.building_number(rng))
            .with("village_or_city", truncate(values.street(rng), 100))
            .with("state", truncate(values.state(rng), 50))
            .with("postal_code", truncate(values.postcode(rng), 10))
            .with("landmark", ctx.maybe(0.5, rng, |rng| values.city(rng)))
            .with("police_station", ctx.maybe(0.5, rng, |rng| values.city(rng)))
            .with("post_office", ctx.maybe(0.5, rng, |rng| values.city(rng)))
            .with("is_current", ordinal == 0);
        Ok(stamped(row, ctx))
    }
}

pub(super) fn bank_accounts() -> EntityDescriptor {
    audited(
        entity("bank_accounts")
            .column(ColumnDef::required("account_holder_name", Text))
            .column(ColumnDef::required("account_number", Text))
            .column(ColumnDef::required("ifsc_code", Text))
            .column(ColumnDef::required("bank_name", Text))
            .column(ColumnDef::nullable("branch_name", Text))
            .column(ColumnDef::required("account_type", enum_kind("account_type")))
            .column(ColumnDef::required("is_primary", Bool))
            .column(ColumnDef::required("is_verified", Bool))
            .column(ColumnDef::required(
                "verification_status",
                enum_kind("verification_status"),
            ))
            .column(ColumnDef::nullable("verified_at", Timestamp)),
    )
    .reference(ForeignRef::required("profile_id", "profiles").one_to_one())
    .reference(ForeignRef::optional("verified_by_user_id", "users"))
    .target(RowTarget::per_parent("profiles", 0.7, FanOut::exactly(1)))
}

pub struct BankAccounts;

impl EntityGenerator for BankAccounts {
    fn entity(&self) -> &str {
        "bank_accounts"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let is_verified = values.chance(0.7, rng);
        let verification_status = if is_verified {
            "approved"
        } else {
            values.choose(VERIFICATION_STATUS, rng)
        };

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("profile_id", slot.parent.clone())
            .with("account_holder_name", values.full_name(rng))
            .with(
                "account_number",
                values
                    .int_between(10_000_000_000, 99_999_999_999, rng)
                    .to_string(),
            )
            .with("ifsc_code", truncate(values.swift_code(rng), 11))
            .with("bank_name", truncate(values.company(rng), 50))
            .with("branch_name", truncate(values.street(rng), 100))
            .with("account_type", values.choose(ACCOUNT_TYPE, rng))
            .with("is_primary", true)
            .with("is_verified", is_verified)
            .with("verification_status", verification_status);

        if is_verified {
            row.set("verified_at", ctx.days_ago(1, 90, rng));
            row.set("verified_by_user_id", ctx.pick("verified_by_user_id", rng)?);
        }
        Ok(stamped(row, ctx))
    }
}

pub(super) fn qualifications() -> EntityDescriptor {
    entity("qualifications")
        .column(ColumnDef::required("qualification_type", Text))
        .column(ColumnDef::nullable("institution_name", Text))
        .column(ColumnDef::nullable("field_of_study", Text))
        .column(ColumnDef::nullable("year_of_completion", Int))
        .column(ColumnDef::nullable("percentage_or_grade", Text))
        .column(ColumnDef::nullable("certificate_url", Text))
        .column(ColumnDef::nullable("verified_at", Timestamp))
        .column(ColumnDef::required("created_at", Timestamp))
        .reference(ForeignRef::required("profile_id", "profiles"))
        .reference(ForeignRef::optional("verified_by_user_id", "users"))
        .target(RowTarget::per_parent(
            "profiles",
            0.6,
            FanOut::weighted(&[(1, 70), (2, 30)]),
        ))
}

pub struct Qualifications;

impl EntityGenerator for Qualifications {
    fn entity(&self) -> &str {
        "qualifications"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let is_verified = values.chance(0.5, rng);

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("profile_id", slot.parent.clone())
            .with(
                "qualification_type",
                values.choose(
                    &["10th", "12th", "ITI", "Diploma", "B.E", "B.Tech", "Certificate Course"],
                    rng,
                ),
            )
            .with(
                "institution_name",
                values.choose(
                    &[
                        "Government ITI",
                        "Industrial Training Center",
                        "Technical Institute",
                        "University",
                    ],
                    rng,
                ),
            )
            .with(
                "field_of_study",
                ctx.maybe(0.7, rng, |rng| {
                    values.choose(
                        &[
                            "Civil Engineering",
                            "Mechanical",
                            "Electrical",
                            "Electronics",
                            "Construction",
                        ],
                        rng,
                    )
                }),
            )
            .with("year_of_completion", values.int_between(2000, 2024, rng))
            .with(
                "percentage_or_grade",
                ctx.maybe(0.7, rng, |rng| format!("{}%", values.int_between(50, 95, rng))),
            )
            .with(
                "certificate_url",
                ctx.maybe(0.5, rng, |rng| storage_url(ctx, "certificates", "pdf", rng)),
            )
            .with("created_at", ctx.now);

        if is_verified {
            row.set("verified_at", ctx.days_ago(1, 60, rng));
            row.set("verified_by_user_id", ctx.pick("verified_by_user_id", rng)?);
        }
        Ok(row)
    }
}

pub(super) fn profile_skills() -> EntityDescriptor {
    audited(
        entity("profile_skills")
            .column(ColumnDef::nullable("years_of_experience", Int))
            .column(ColumnDef::required("is_primary", Bool))
            .column(ColumnDef::nullable("verified_at", Timestamp)),
    )
    .reference(ForeignRef::required("profile_id", "profiles"))
    .reference(ForeignRef::required("skill_category_id", "skill_categories"))
    .reference(ForeignRef::optional("verified_by_user_id", "users"))
    .target(RowTarget::per_parent("profiles", 1.0, FanOut::uniform(2, 5)))
}

/// Two to five skills per profile, never the same skill twice.
pub struct ProfileSkills;

impl EntityGenerator for ProfileSkills {
    fn entity(&self) -> &str {
        "profile_skills"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let skill = ctx.pick("skill_category_id", rng)?;
        skill_row(ctx, slot, ordinal, skill, rng)
    }

    fn group(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Row>> {
        let skills = distinct_refs(ctx, "skill_category_id", slot.count, rng)?;
        skills
            .into_iter()
            .zip(0..)
            .map(|(skill, ordinal)| skill_row(ctx, slot, ordinal, skill, rng))
            .collect()
    }
}

fn skill_row(
    ctx: &GenerationContext<'_>,
    slot: &Slot,
    ordinal: u32,
    skill: seedbed_core::Value,
    rng: &mut dyn RngCore,
) -> Result<Row> {
    let is_verified = ctx.values.chance(0.5, rng);
    let mut row = Row::new()
        .with("id", id(ctx, rng))
        .with("profile_id", slot.parent.clone())
        .with("skill_category_id", skill)
        .with("years_of_experience", ctx.values.int_between(0, 20, rng))
        .with("is_primary", ordinal == 0);
    if is_verified {
        row.set("verified_at", ctx.days_ago(1, 60, rng));
        row.set("verified_by_user_id", ctx.pick("verified_by_user_id", rng)?);
    }
    Ok(stamped(row, ctx))
}

/// `count` distinct ids for `column`; a pool smaller than `count` cannot
/// satisfy the slot.
pub(super) fn distinct_refs(
    ctx: &GenerationContext<'_>,
    column: &str,
    count: u32,
    rng: &mut dyn RngCore,
) -> Result<Vec<seedbed_core::Value>> {
    let ids = ctx.pick_distinct(column, count as usize, rng)?;
    if ids.len() < count as usize {
        return Err(Error::configuration(format!(
            "'{}.{column}' needs {count} distinct ids but only {} exist",
            ctx.descriptor.name,
            ids.len()
        )));
    }
    Ok(ids)
}

pub(super) fn stage_transitions() -> EntityDescriptor {
    entity("stage_transitions")
        .column(ColumnDef::nullable("from_stage", Text))
        .column(ColumnDef::required("to_stage", Text))
        .column(ColumnDef::required("transitioned_at", Timestamp))
        .column(ColumnDef::nullable("notes", Text))
        .reference(ForeignRef::required("profile_id", "profiles"))
        .reference(ForeignRef::required("transitioned_by_user_id", "users"))
        .target(RowTarget::per_parent("profiles", 1.0, FanOut::uniform(2, 5)))
}

/// Walks the stage ladder from `new_join`, one step per ordinal.
pub struct StageTransitions;

impl EntityGenerator for StageTransitions {
    fn entity(&self) -> &str {
        "stage_transitions"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let step = ordinal as usize;
        let from_stage = match STAGES.get(step) {
            Some(stage) if step + 1 < STAGES.len() => *stage,
            _ => values.choose(STAGES, rng),
        };
        let to_stage = match STAGES.get(step + 1) {
            Some(stage) => *stage,
            None => values.choose(STAGES, rng),
        };
        let latest = (150 - 20 * ordinal as i64).max(1);

        Ok(Row::new()
            .with("id", id(ctx, rng))
            .with("profile_id", slot.parent.clone())
            .with("from_stage", from_stage)
            .with("to_stage", to_stage)
            .with("transitioned_at", ctx.days_ago(1, latest, rng))
            .with("notes", ctx.maybe(0.5, rng, |rng| values.text(100, rng)))
            .with(
                "transitioned_by_user_id",
                ctx.pick("transitioned_by_user_id", rng)?,
            ))
    }
}

pub(super) fn documents() -> EntityDescriptor {
    entity("documents")
        .column(ColumnDef::required("document_category", Text))
        .column(ColumnDef::required("document_type", Text))
        .column(ColumnDef::nullable("document_number", Text))
        .column(ColumnDef::required("file_name", Text))
        .column(ColumnDef::required("file_url", Text))
        .column(ColumnDef::nullable("file_size", Int))
        .column(ColumnDef::required(
            "verification_status",
            enum_kind("verification_status"),
        ))
        .column(ColumnDef::nullable("verified_at", Timestamp))
        .column(ColumnDef::required("uploaded_at", Timestamp))
        .column(ColumnDef::nullable("expiry_date", Date))
        .column(ColumnDef::required("created_at", Timestamp))
        .reference(ForeignRef::required("profile_id", "profiles"))
        .reference(ForeignRef::required("uploaded_by_user_id", "users"))
        .reference(ForeignRef::optional("verified_by_user_id", "users"))
        .target(RowTarget::per_parent("profiles", 0.8, FanOut::uniform(2, 4)))
}

/// Two to four documents per profile, each of a different type.
pub struct Documents;

impl Documents {
    fn document(
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        document_type: &str,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let is_verified = values.chance(0.7, rng);
        let verification_status = if is_verified {
            "approved"
        } else {
            values.choose(VERIFICATION_STATUS, rng)
        };

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("profile_id", slot.parent.clone())
            .with("document_category", values.choose(DOCUMENT_CATEGORIES, rng))
            .with("document_type", document_type)
            .with(
                "document_number",
                ctx.maybe(0.5, rng, |rng| {
                    format!("DOC-{}", values.int_between(100_000, 999_999, rng))
                }),
            )
            .with(
                "file_name",
                format!("{document_type}_{}.pdf", values.unique_id(rng)),
            )
            .with("file_url", storage_url(ctx, "documents", "pdf", rng))
            .with("file_size", values.int_between(100_000, 5_000_000, rng))
            .with("verification_status", verification_status)
            .with("uploaded_at", ctx.days_ago(1, 90, rng))
            .with("created_at", ctx.now)
            .with("uploaded_by_user_id", ctx.pick("uploaded_by_user_id", rng)?);

        if EXPIRING_DOCUMENTS.contains(&document_type) {
            let expiry = ctx.today() + Duration::days(values.int_between(365, 3650, rng));
            row.set("expiry_date", expiry);
        }
        if is_verified {
            row.set("verified_at", ctx.days_ago(1, 60, rng));
            row.set("verified_by_user_id", ctx.pick("verified_by_user_id", rng)?);
        }
        Ok(row)
    }
}

impl EntityGenerator for Documents {
    fn entity(&self) -> &str {
        "documents"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let document_type = ctx.values.choose(DOCUMENT_TYPES, rng);
        Self::document(ctx, slot, document_type, rng)
    }

    fn group(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Row>> {
        let mut types = DOCUMENT_TYPES.to_vec();
        types.shuffle(rng);
        types
            .into_iter()
            .cycle()
            .take(slot.count as usize)
            .map(|document_type| Self::document(ctx, slot, document_type, rng))
            .collect()
    }
}

pub(super) fn interactions() -> EntityDescriptor {
    audited(
        entity("interactions")
            .column(ColumnDef::required("interaction_type", Text))
            .column(ColumnDef::required("interaction_date", Timestamp))
            .column(ColumnDef::nullable("subject", Text))
            .column(ColumnDef::nullable("description", Text))
            .column(ColumnDef::nullable("outcome", Text))
            .column(ColumnDef::nullable("next_follow_up_date", Date)),
    )
    .reference(ForeignRef::required("profile_id", "profiles"))
    .reference(ForeignRef::required("created_by_user_id", "users"))
    .target(RowTarget::per_parent("profiles", 0.5, FanOut::uniform(1, 3)))
}

pub struct Interactions;

impl EntityGenerator for Interactions {
    fn entity(&self) -> &str {
        "interactions"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let interaction_date = ctx.days_ago(1, 90, rng);
        let follow_up = ctx.maybe(0.5, rng, |rng| {
            interaction_date.date() + Duration::days(values.int_between(7, 30, rng))
        });

        let row = Row::new()
            .with("id", id(ctx, rng))
            .with("profile_id", slot.parent.clone())
            .with(
                "interaction_type",
                values.choose(
                    &["call", "email", "meeting", "site_visit", "interview", "follow_up"],
                    rng,
                ),
            )
            .with("interaction_date", interaction_date)
            .with("subject", values.sentence(6, rng))
            .with("description", values.text(200, rng))
            .with(
                "outcome",
                values.choose(&["positive", "negative", "neutral", "callback_requested"], rng),
            )
            .with("next_follow_up_date", follow_up)
            .with("created_by_user_id", ctx.pick("created_by_user_id", rng)?);
        Ok(stamped(row, ctx))
    }
}

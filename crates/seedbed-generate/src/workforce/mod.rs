//! Catalog for the workforce management schema: workers, employers,
//! training, projects and outreach content.
//!
//! Descriptors are declared in dependency-friendly order; the graph still
//! computes the real order.

mod content;
mod people;
mod projects;
mod training;

use rand::RngCore;
use uuid::Uuid;

use seedbed_core::{ColumnDef, ColumnKind, EntityDescriptor, Row};

use crate::context::GenerationContext;
use crate::generators::GeneratorCatalog;
use crate::source::truncate;

pub use content::{
    ActivityLogs, NewsUpdates, ScraperWebsites, SocialMediaPlatformPosts, SocialMediaPosts,
};
pub use people::{
    Addresses, BankAccounts, Documents, Employers, Interactions, ProfileSkills, Profiles,
    Qualifications, SkillCategories, StageTransitions, Users,
};
pub use projects::{ProjectDeployments, ProjectRequests, ProjectResourceRequirements, Projects};
pub use training::{BatchEnrollments, TrainingBatches};

pub const GENDER_TYPE: &[&str] = &["male", "female", "other"];
pub const ACCOUNT_TYPE: &[&str] = &["savings", "current"];
pub const ADDRESS_TYPE: &[&str] = &["permanent", "current", "temporary"];
pub const VERIFICATION_STATUS: &[&str] = &["pending", "approved", "rejected"];
pub const BATCH_STATUS: &[&str] = &["upcoming", "ongoing", "completed", "cancelled"];
pub const ENROLLMENT_STATUS: &[&str] = &["enrolled", "completed", "dropped"];
pub const PROJECT_STATUS: &[&str] = &["planning", "active", "completed", "on_hold", "archived"];
pub const DEPLOYMENT_STATUS: &[&str] = &["allocated", "active", "completed", "cancelled"];
pub const REQUEST_STATUS: &[&str] = &["pending", "approved", "rejected"];
pub const POST_STATUS: &[&str] = &["draft", "scheduled", "published", "failed"];
pub const PLATFORM_POST_STATUS: &[&str] = &["pending", "published", "failed"];
pub const PLATFORMS: &[&str] = &["facebook", "instagram", "twitter", "linkedin", "youtube"];

pub const SKILLS: &[&str] = &[
    "Carpentry",
    "Masonry",
    "Plumbing",
    "Electrical",
    "Welding",
    "Painting",
    "Tiling",
    "Steel Fixing",
    "Shuttering",
    "Machine Operation",
    "Heavy Equipment Operation",
    "Safety Management",
    "Site Supervision",
    "Quality Control",
    "Civil Engineering",
];

pub const CITIES: &[&str] = &[
    "Mumbai",
    "Delhi",
    "Bangalore",
    "Hyderabad",
    "Chennai",
    "Kolkata",
    "Pune",
    "Ahmedabad",
    "Jaipur",
    "Lucknow",
];

const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const STORAGE_HOST: &str = "https://storage.example.com";

/// All workforce descriptors, in declaration order.
pub fn descriptors() -> Vec<EntityDescriptor> {
    vec![
        people::users(),
        people::skill_categories(),
        people::employers(),
        people::profiles(),
        people::addresses(),
        people::bank_accounts(),
        people::qualifications(),
        people::profile_skills(),
        training::training_batches(),
        training::batch_enrollments(),
        projects::projects(),
        projects::project_resource_requirements(),
        projects::project_deployments(),
        people::stage_transitions(),
        people::documents(),
        people::interactions(),
        projects::project_requests(),
        content::activity_logs(),
        content::scraper_websites(),
        content::news_updates(),
        content::social_media_posts(),
        content::social_media_platform_posts(),
    ]
}

/// Descriptors paired with their generators.
pub fn catalog() -> GeneratorCatalog {
    GeneratorCatalog::new(descriptors())
        .with(Users)
        .with(SkillCategories)
        .with(Employers)
        .with(Profiles)
        .with(Addresses)
        .with(BankAccounts)
        .with(Qualifications)
        .with(ProfileSkills)
        .with(TrainingBatches)
        .with(BatchEnrollments)
        .with(Projects)
        .with(ProjectResourceRequirements)
        .with(ProjectDeployments)
        .with(StageTransitions)
        .with(Documents)
        .with(Interactions)
        .with(ProjectRequests)
        .with(ActivityLogs)
        .with(ScraperWebsites)
        .with(NewsUpdates)
        .with(SocialMediaPosts)
        .with(SocialMediaPlatformPosts)
}

fn enum_kind(type_name: &str) -> ColumnKind {
    ColumnKind::Enum(type_name.to_string())
}

/// Entity with a UUID `id` primary key.
fn entity(name: &str) -> EntityDescriptor {
    EntityDescriptor::new(name).column(ColumnDef::required("id", ColumnKind::Uuid))
}

/// Add `created_at` and `updated_at`.
fn audited(descriptor: EntityDescriptor) -> EntityDescriptor {
    descriptor
        .column(ColumnDef::required("created_at", ColumnKind::Timestamp))
        .column(ColumnDef::required("updated_at", ColumnKind::Timestamp))
}

fn stamped(row: Row, ctx: &GenerationContext<'_>) -> Row {
    row.with("created_at", ctx.now).with("updated_at", ctx.now)
}

fn password_hash(ctx: &GenerationContext<'_>, rng: &mut dyn RngCore) -> String {
    format!("$2b$10${}", ctx.values.chars_from(ALPHANUMERIC, 53, rng))
}

fn uppercase(ctx: &GenerationContext<'_>, len: usize, rng: &mut dyn RngCore) -> String {
    ctx.values.chars_from(UPPERCASE, len, rng)
}

fn storage_url(
    ctx: &GenerationContext<'_>,
    folder: &str,
    extension: &str,
    rng: &mut dyn RngCore,
) -> String {
    format!(
        "{STORAGE_HOST}/{folder}/{}.{extension}",
        ctx.values.unique_id(rng)
    )
}

fn phone(ctx: &GenerationContext<'_>, rng: &mut dyn RngCore) -> String {
    truncate(ctx.values.phone(rng), 15)
}

fn postal_address(ctx: &GenerationContext<'_>, rng: &mut dyn RngCore) -> String {
    format!(
        "{} {}, {}, {} {}",
        ctx.values.building_number(rng),
        ctx.values.street(rng),
        ctx.values.city(rng),
        ctx.values.state(rng),
        ctx.values.postcode(rng)
    )
}

fn id(ctx: &GenerationContext<'_>, rng: &mut dyn RngCore) -> Uuid {
    ctx.values.unique_id(rng)
}

/// Fixed list entry for `index`, suffixed once the list wraps around.
fn cycled(list: &[&str], index: usize) -> String {
    let base = list[index % list.len()];
    match index / list.len() {
        0 => base.to_string(),
        round => format!("{base} {}", round + 1),
    }
}

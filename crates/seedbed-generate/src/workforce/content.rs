use rand::RngCore;
use rand::seq::index;
use serde_json::json;

use seedbed_core::ColumnKind::{Bool, Int, Json, Text, TextArray, Timestamp};
use seedbed_core::{ColumnDef, EntityDescriptor, FanOut, ForeignRef, Result, Row, RowTarget};

use super::{
    CITIES, PLATFORM_POST_STATUS, PLATFORMS, POST_STATUS, audited, cycled, entity, enum_kind, id,
    stamped, storage_url,
};
use crate::context::{GenerationContext, Slot};
use crate::generators::EntityGenerator;

const ACTIONS: &[&str] = &[
    "profile_created",
    "profile_updated",
    "profile_deployed",
    "profile_verified",
    "project_created",
    "project_updated",
    "batch_created",
    "enrollment_added",
    "document_uploaded",
    "document_verified",
    "skill_verified",
    "user_login",
];
const MODULES: &[&str] = &["profiles", "projects", "batches", "documents", "auth", "deployments"];
const SECTORS: &[&str] = &["Infrastructure", "Residential", "Commercial", "Industrial", "Transport"];
const NEWS_STATUS: &[&str] = &["Announced", "In Progress", "Delayed", "Completed", "Cancelled"];
const TAGS: &[&str] = &[
    "construction",
    "hiring",
    "jobs",
    "infrastructure",
    "training",
    "skilled_workers",
];

/// (name, url, type)
const WEBSITES: &[(&str, &str, &str)] = &[
    (
        "Construction Weekly India",
        "https://constructionweeklyindia.com",
        "news",
    ),
    ("Government e-Marketplace", "https://gem.gov.in/tenders", "tender"),
    (
        "Ministry of Road Transport",
        "https://morth.gov.in/tenders",
        "government",
    ),
    ("NHAI Tenders", "https://nhai.gov.in/tenders", "tender"),
    (
        "Indian Railways Tenders",
        "https://indianrailways.gov.in/tenders",
        "government",
    ),
];

/// `count` distinct entries of `options`, in random order.
fn distinct<'a>(options: &[&'a str], count: usize, rng: &mut dyn RngCore) -> Vec<&'a str> {
    let count = count.min(options.len());
    index::sample(rng, options.len(), count)
        .into_iter()
        .map(|idx| options[idx])
        .collect()
}

pub(super) fn activity_logs() -> EntityDescriptor {
    entity("activity_logs")
        .column(ColumnDef::required("action", Text))
        .column(ColumnDef::required("module", Text))
        .column(ColumnDef::nullable("record_id", Int))
        .column(ColumnDef::nullable("old_value", Text))
        .column(ColumnDef::nullable("new_value", Text))
        .column(ColumnDef::nullable("ip_address", Text))
        .column(ColumnDef::nullable("user_agent", Text))
        .column(ColumnDef::required("created_at", Timestamp))
        .reference(ForeignRef::required("user_id", "users"))
        .target(RowTarget::fixed(200))
}

pub struct ActivityLogs;

impl EntityGenerator for ActivityLogs {
    fn entity(&self) -> &str {
        "activity_logs"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        _slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        Ok(Row::new()
            .with("id", id(ctx, rng))
            .with("action", values.choose(ACTIONS, rng))
            .with("module", values.choose(MODULES, rng))
            .with("record_id", values.int_between(1, 1000, rng))
            .with("old_value", ctx.maybe(0.5, rng, |rng| values.word(rng)))
            .with("new_value", ctx.maybe(0.5, rng, |rng| values.word(rng)))
            .with("ip_address", ctx.maybe(0.5, rng, |rng| values.ipv4(rng)))
            .with("user_agent", ctx.maybe(0.5, rng, |rng| values.user_agent(rng)))
            .with("created_at", ctx.days_ago(0, 180, rng))
            .with("user_id", ctx.pick("user_id", rng)?))
    }
}

pub(super) fn scraper_websites() -> EntityDescriptor {
    audited(
        entity("scraper_websites")
            .column(ColumnDef::required("url", Text))
            .column(ColumnDef::required("type", Text))
            .column(ColumnDef::required("is_active", Bool))
            .column(ColumnDef::required("name", Text)),
    )
    .target(RowTarget::fixed(WEBSITES.len() as u64))
}

/// The fixed list of scraped sites.
pub struct ScraperWebsites;

impl EntityGenerator for ScraperWebsites {
    fn entity(&self) -> &str {
        "scraper_websites"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let (_, url, site_type) = WEBSITES[slot.index % WEBSITES.len()];
        let names: Vec<&str> = WEBSITES.iter().map(|(name, _, _)| *name).collect();
        let round = slot.index / WEBSITES.len();
        let url = match round {
            0 => url.to_string(),
            round => format!("{url}?mirror={round}"),
        };

        let row = Row::new()
            .with("id", id(ctx, rng))
            .with("url", url)
            .with("type", site_type)
            .with("is_active", true)
            .with("name", cycled(&names, slot.index));
        Ok(stamped(row, ctx))
    }
}

pub(super) fn news_updates() -> EntityDescriptor {
    audited(
        entity("news_updates")
            .column(ColumnDef::required("project_name", Text))
            .column(ColumnDef::nullable("sector", Text))
            .column(ColumnDef::nullable("company_authority", Text))
            .column(ColumnDef::nullable("location", Text))
            .column(ColumnDef::nullable("value_cr", Int))
            .column(ColumnDef::nullable("status", Text))
            .column(ColumnDef::nullable("revised_budget", Int))
            .column(ColumnDef::nullable("revised_timeline", Text))
            .column(ColumnDef::nullable("delay_reason", Text))
            .column(ColumnDef::nullable("source_url", Text))
            .column(ColumnDef::nullable("source_type", Text))
            .column(ColumnDef::nullable("summary_remarks", Text))
            .column(ColumnDef::required("scraped_date", Timestamp)),
    )
    .target(RowTarget::fixed(50))
}

pub struct NewsUpdates;

impl EntityGenerator for NewsUpdates {
    fn entity(&self) -> &str {
        "news_updates"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        _slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let row = Row::new()
            .with("id", id(ctx, rng))
            .with(
                "project_name",
                format!(
                    "{} Project - {}",
                    values.choose(SECTORS, rng),
                    values.street(rng)
                ),
            )
            .with("sector", values.choose(SECTORS, rng))
            .with(
                "company_authority",
                ctx.maybe(0.7, rng, |rng| values.company(rng)),
            )
            .with("location", ctx.maybe(0.8, rng, |rng| values.choose(CITIES, rng)))
            .with("value_cr", values.int_between(10, 5000, rng))
            .with("status", ctx.maybe(0.7, rng, |rng| values.choose(NEWS_STATUS, rng)))
            .with(
                "revised_budget",
                ctx.maybe(0.5, rng, |rng| values.int_between(10, 5000, rng)),
            )
            .with(
                "revised_timeline",
                ctx.maybe(0.5, rng, |rng| {
                    format!("{} months", values.int_between(12, 60, rng))
                }),
            )
            .with("delay_reason", ctx.maybe(0.5, rng, |rng| values.text(200, rng)))
            .with(
                "source_url",
                format!("https://example.com/news/{}", values.unique_id(rng)),
            )
            .with(
                "source_type",
                values.choose(&["news_portal", "government_site", "company_website"], rng),
            )
            .with("summary_remarks", values.text(300, rng))
            .with("scraped_date", ctx.days_ago(0, 30, rng));
        Ok(stamped(row, ctx))
    }
}

pub(super) fn social_media_posts() -> EntityDescriptor {
    audited(
        entity("social_media_posts")
            .column(ColumnDef::required("title", Text))
            .column(ColumnDef::nullable("caption", Text))
            .column(ColumnDef::nullable("description", Text))
            .column(ColumnDef::required("content", Text))
            .column(ColumnDef::required("platforms", TextArray))
            .column(ColumnDef::required("tags", TextArray))
            .column(ColumnDef::nullable("image_url", Text))
            .column(ColumnDef::nullable("video_url", Text))
            .column(ColumnDef::required("media_urls", TextArray))
            .column(ColumnDef::nullable("project_name", Text))
            .column(ColumnDef::nullable("source_url", Text))
            .column(ColumnDef::required("status", enum_kind("post_status")))
            .column(ColumnDef::nullable("scheduled_at", Timestamp))
            .column(ColumnDef::nullable("published_at", Timestamp))
            .column(ColumnDef::nullable("make_response", Json))
            .column(ColumnDef::nullable("make_webhook_id", Text))
            .column(ColumnDef::nullable("platform_content", Json))
            .column(ColumnDef::nullable("youtube_category", Text))
            .column(ColumnDef::nullable("youtube_privacy", Text))
            .column(ColumnDef::nullable("youtube_thumbnail", Text))
            .column(ColumnDef::required("engagement", Json))
            .column(ColumnDef::nullable("created_by", Text)),
    )
    .target(RowTarget::fixed(30))
}

/// Posts targeting one to three platforms. Scheduled posts get a future
/// `scheduled_at`, published ones a past `published_at`; YouTube fields only
/// appear when YouTube is a target.
pub struct SocialMediaPosts;

impl EntityGenerator for SocialMediaPosts {
    fn entity(&self) -> &str {
        "social_media_posts"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        _slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let values = ctx.values;
        let platform_count = values.int_between(1, 3, rng) as usize;
        let platforms = distinct(PLATFORMS, platform_count, rng);
        let tag_count = values.int_between(2, 4, rng) as usize;
        let tags = distinct(TAGS, tag_count, rng);
        let on_youtube = platforms.contains(&"youtube");
        let status = values.choose(POST_STATUS, rng);

        let media_count = values.int_between(0, 3, rng);
        let media_urls: Vec<String> = (0..media_count)
            .map(|_| storage_url(ctx, "media", "jpg", rng))
            .collect();

        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("title", values.sentence(10, rng))
            .with("caption", ctx.maybe(0.5, rng, |rng| values.sentence(20, rng)))
            .with("description", ctx.maybe(0.5, rng, |rng| values.text(200, rng)))
            .with("content", values.text(500, rng))
            .with(
                "platforms",
                platforms.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            )
            .with("tags", tags.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .with(
                "image_url",
                ctx.maybe(0.5, rng, |rng| storage_url(ctx, "images", "jpg", rng)),
            )
            .with(
                "video_url",
                ctx.maybe(0.7, rng, |rng| storage_url(ctx, "videos", "mp4", rng)),
            )
            .with("media_urls", media_urls)
            .with("project_name", ctx.maybe(0.5, rng, |rng| values.sentence(8, rng)))
            .with(
                "source_url",
                ctx.maybe(0.5, rng, |rng| {
                    format!("https://example.com/source/{}", values.unique_id(rng))
                }),
            )
            .with("status", status)
            .with("make_response", None::<String>)
            .with("make_webhook_id", None::<String>)
            .with("platform_content", None::<String>)
            .with("youtube_privacy", "public")
            .with("engagement", json!({}))
            .with("created_by", values.full_name(rng));

        match status {
            "scheduled" => row.set("scheduled_at", ctx.days_ahead(1, 30, rng)),
            "published" => row.set("published_at", ctx.days_ago(1, 30, rng)),
            _ => {}
        }
        if on_youtube {
            row.set(
                "youtube_category",
                values.choose(&["Education", "Science & Technology", "People & Blogs"], rng),
            );
            row.set(
                "youtube_privacy",
                values.choose(&["public", "unlisted", "private"], rng),
            );
            row.set(
                "youtube_thumbnail",
                ctx.maybe(0.5, rng, |rng| storage_url(ctx, "thumbnails", "jpg", rng)),
            );
        }
        Ok(stamped(row, ctx))
    }
}

pub(super) fn social_media_platform_posts() -> EntityDescriptor {
    audited(
        entity("social_media_platform_posts")
            .column(ColumnDef::required("platform", Text))
            .column(ColumnDef::nullable("platform_post_id", Text))
            .column(ColumnDef::required(
                "status",
                enum_kind("platform_post_status"),
            ))
            .column(ColumnDef::nullable("published_at", Timestamp))
            .column(ColumnDef::nullable("error_message", Text))
            .column(ColumnDef::required("engagement", Json)),
    )
    .reference(ForeignRef::required("post_id", "social_media_posts"))
    .target(RowTarget::per_parent(
        "social_media_posts",
        1.0,
        FanOut::uniform(1, 3),
    ))
}

/// One row per platform a post was pushed to. Published rows carry the
/// platform's post id, publish time and engagement counters; failed rows an
/// error message.
pub struct SocialMediaPlatformPosts;

impl SocialMediaPlatformPosts {
    fn platform_post(
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        platform: &str,
        rng: &mut dyn RngCore,
    ) -> Row {
        let values = ctx.values;
        let status = values.choose(PLATFORM_POST_STATUS, rng);
        let mut row = Row::new()
            .with("id", id(ctx, rng))
            .with("post_id", slot.parent.clone())
            .with("platform", platform)
            .with("status", status)
            .with("engagement", json!({}));

        match status {
            "published" => {
                row.set(
                    "platform_post_id",
                    format!("{platform}_{}", values.unique_id(rng)),
                );
                row.set("published_at", ctx.days_ago(1, 30, rng));
                row.set(
                    "engagement",
                    json!({
                        "likes": values.int_between(0, 1000, rng),
                        "shares": values.int_between(0, 100, rng),
                        "comments": values.int_between(0, 50, rng),
                    }),
                );
            }
            "failed" => row.set("error_message", values.sentence(6, rng)),
            _ => {}
        }
        stamped(row, ctx)
    }
}

impl EntityGenerator for SocialMediaPlatformPosts {
    fn entity(&self) -> &str {
        "social_media_platform_posts"
    }

    fn row(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        _ordinal: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Row> {
        let platform = ctx.values.choose(PLATFORMS, rng);
        Ok(Self::platform_post(ctx, slot, platform, rng))
    }

    fn group(
        &self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Row>> {
        let platforms = distinct(PLATFORMS, slot.count as usize, rng);
        let mut rows: Vec<Row> = platforms
            .into_iter()
            .map(|platform| Self::platform_post(ctx, slot, platform, rng))
            .collect();
        while rows.len() < slot.count as usize {
            rows.push(self.row(ctx, slot, rows.len() as u32, rng)?);
        }
        Ok(rows)
    }
}

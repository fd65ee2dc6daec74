use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use seedbed_core::{Error, InsertStrategy, Result};
use seedbed_generate::{Locale, RunOptions};

/// A named run selection stored as TOML.
///
/// Every field is optional; anything unset falls back to the catalog defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunProfile {
    pub seed: Option<u64>,
    pub only: Option<Vec<String>>,
    pub strategies: BTreeMap<String, InsertStrategy>,
    pub counts: BTreeMap<String, u64>,
    pub preload_external: Option<bool>,
    pub locale: Option<String>,
}

impl RunProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::configuration(format!("cannot read profile {}: {err}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|err| Error::configuration(format!("profile {}: {err}", path.display())))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| Error::configuration(err.to_string()))
    }

    /// Layer `overrides` on top of `self`. Scalars in `overrides` win; map
    /// entries are merged key by key.
    pub fn merge(mut self, overrides: RunProfile) -> Self {
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
        if overrides.only.is_some() {
            self.only = overrides.only;
        }
        self.strategies.extend(overrides.strategies);
        self.counts.extend(overrides.counts);
        if overrides.preload_external.is_some() {
            self.preload_external = overrides.preload_external;
        }
        if overrides.locale.is_some() {
            self.locale = overrides.locale;
        }
        self
    }

    pub fn locale(&self) -> Result<Locale> {
        self.locale
            .as_deref()
            .map(str::parse::<Locale>)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            seed: self.seed.unwrap_or_default(),
            only: self.only.clone(),
            strategies: self.strategies.clone(),
            counts: self.counts.clone(),
            preload_external: self.preload_external.unwrap_or(false),
        }
    }
}

/// Parse `entity=value` from the command line.
pub fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    let (entity, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ENTITY=VALUE, got '{raw}'"))?;
    let entity = entity.trim();
    let value = value.trim();
    if entity.is_empty() || value.is_empty() {
        return Err(format!("expected ENTITY=VALUE, got '{raw}'"));
    }
    Ok((entity.to_string(), value.to_string()))
}

pub fn parse_strategy(raw: &str) -> std::result::Result<(String, InsertStrategy), String> {
    let (entity, value) = parse_assignment(raw)?;
    let strategy = value.parse().map_err(|err: Error| err.to_string())?;
    Ok((entity, strategy))
}

pub fn parse_count(raw: &str) -> std::result::Result<(String, u64), String> {
    let (entity, value) = parse_assignment(raw)?;
    let count = value
        .parse()
        .map_err(|_| format!("row count for '{entity}' is not a number: '{value}'"))?;
    Ok((entity, count))
}

#[cfg(test)]
mod tests {
    use seedbed_core::ErrorKind;

    use super::*;

    #[test]
    fn final_tables_profile_parses() {
        let profile = RunProfile::parse(
            r#"
            only = ["batch_enrollments", "project_deployments"]
            preload_external = true

            [strategies]
            batch_enrollments = "tolerant"
            project_deployments = "tolerant"
            "#,
        )
        .expect("profile");

        let options = profile.run_options();
        assert_eq!(options.seed, 0);
        assert!(options.preload_external);
        assert_eq!(
            options.only.as_deref(),
            Some(&["batch_enrollments".to_string(), "project_deployments".to_string()][..])
        );
        assert_eq!(
            options.strategies.get("project_deployments"),
            Some(&InsertStrategy::Tolerant)
        );
    }

    #[test]
    fn unknown_keys_and_bad_strategies_are_rejected() {
        let unknown = RunProfile::parse("sed = 4").expect_err("typo");
        assert_eq!(unknown.kind(), ErrorKind::Configuration);

        let strategy = RunProfile::parse("[strategies]\nusers = \"eventual\"").expect_err("strategy");
        assert_eq!(strategy.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn command_line_overrides_win() {
        let file = RunProfile::parse(
            r#"
            seed = 1
            locale = "pt_BR"
            [counts]
            users = 5
            projects = 10
            "#,
        )
        .expect("profile");
        let cli = RunProfile {
            seed: Some(7),
            counts: BTreeMap::from([("users".to_string(), 50)]),
            ..RunProfile::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.seed, Some(7));
        assert_eq!(merged.counts["users"], 50);
        assert_eq!(merged.counts["projects"], 10);
        assert_eq!(merged.locale().expect("locale"), Locale::PtBr);
    }

    #[test]
    fn locale_defaults_and_validates() {
        assert_eq!(RunProfile::default().locale().expect("default"), Locale::EnUs);
        let bad = RunProfile {
            locale: Some("fr_FR".to_string()),
            ..RunProfile::default()
        };
        assert!(bad.locale().is_err());
    }

    #[test]
    fn assignments_parse() {
        assert_eq!(
            parse_strategy("profile_skills=Tolerant"),
            Ok(("profile_skills".to_string(), InsertStrategy::Tolerant))
        );
        assert_eq!(parse_count("users = 25"), Ok(("users".to_string(), 25)));
        assert!(parse_count("users=many").is_err());
        assert!(parse_assignment("users").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn shipped_profiles_parse() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../profiles");
        for name in ["full.toml", "remaining.toml", "final.toml"] {
            RunProfile::load(&root.join(name)).expect(name);
        }
    }
}

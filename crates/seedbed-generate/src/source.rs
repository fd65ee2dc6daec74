use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use fake::Fake;
use fake::faker::{address, company, finance, internet, lorem, name, phone_number};
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use uuid::Uuid;

use seedbed_core::{Error, Result};

/// Locales supported by [`FakeValueSource`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    EnUs,
    PtBr,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::PtBr => "pt_BR",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "en_US" => Ok(Self::EnUs),
            "pt_BR" => Ok(Self::PtBr),
            other => Err(Error::configuration(format!(
                "unsupported locale '{other}' (expected en_US or pt_BR)"
            ))),
        }
    }
}

/// Field-level synthetic values. Every draw goes through the caller's RNG,
/// so a seeded RNG makes the whole sequence reproducible.
pub trait ValueSource: Send + Sync {
    fn locale(&self) -> Locale;

    fn first_name(&self, rng: &mut dyn RngCore) -> String;
    fn last_name(&self, rng: &mut dyn RngCore) -> String;
    fn full_name(&self, rng: &mut dyn RngCore) -> String;
    fn company(&self, rng: &mut dyn RngCore) -> String;
    fn email(&self, rng: &mut dyn RngCore) -> String;
    fn phone(&self, rng: &mut dyn RngCore) -> String;
    fn street(&self, rng: &mut dyn RngCore) -> String;
    fn city(&self, rng: &mut dyn RngCore) -> String;
    fn state(&self, rng: &mut dyn RngCore) -> String;
    fn postcode(&self, rng: &mut dyn RngCore) -> String;
    fn building_number(&self, rng: &mut dyn RngCore) -> String;
    fn swift_code(&self, rng: &mut dyn RngCore) -> String;
    fn ipv4(&self, rng: &mut dyn RngCore) -> String;
    fn user_agent(&self, rng: &mut dyn RngCore) -> String;
    fn word(&self, rng: &mut dyn RngCore) -> String;
    /// A sentence of roughly `words` words.
    fn sentence(&self, words: usize, rng: &mut dyn RngCore) -> String;
    /// Free text of at most `max_chars` characters.
    fn text(&self, max_chars: usize, rng: &mut dyn RngCore) -> String;

    fn unique_id(&self, rng: &mut dyn RngCore) -> Uuid {
        let bytes: [u8; 16] = rng.random();
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Integer in `min..=max`.
    fn int_between(&self, min: i64, max: i64, rng: &mut dyn RngCore) -> i64 {
        if min >= max {
            return min;
        }
        rng.random_range(min..=max)
    }

    /// Float in `min..max`.
    fn float_between(&self, min: f64, max: f64, rng: &mut dyn RngCore) -> f64 {
        if min >= max {
            return min;
        }
        rng.random_range(min..max)
    }

    /// Date in `start..=end`.
    fn date_between(&self, start: NaiveDate, end: NaiveDate, rng: &mut dyn RngCore) -> NaiveDate {
        let span = (end - start).num_days();
        if span <= 0 {
            return start;
        }
        start + Duration::days(rng.random_range(0..=span))
    }

    /// `true` with probability `p`.
    fn chance(&self, p: f64, rng: &mut dyn RngCore) -> bool {
        rng.random_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform choice; an empty slice yields an empty string.
    fn choose<'a>(&self, options: &[&'a str], rng: &mut dyn RngCore) -> &'a str {
        options.choose(rng).copied().unwrap_or_default()
    }

    /// Weighted choice over `(option, weight)` pairs.
    fn weighted<'a>(&self, options: &[(&'a str, u32)], rng: &mut dyn RngCore) -> &'a str {
        let total: u64 = options.iter().map(|(_, weight)| *weight as u64).sum();
        if total == 0 {
            return options.first().map(|(option, _)| *option).unwrap_or_default();
        }
        let mut roll = rng.random_range(0..total);
        for (option, weight) in options {
            let weight = *weight as u64;
            if roll < weight {
                return option;
            }
            roll -= weight;
        }
        options.last().map(|(option, _)| *option).unwrap_or_default()
    }

    /// `len` random characters drawn from `charset`.
    fn chars_from(&self, charset: &str, len: usize, rng: &mut dyn RngCore) -> String {
        let chars: Vec<char> = charset.chars().collect();
        (0..len)
            .filter_map(|_| chars.choose(rng).copied())
            .collect()
    }
}

/// [`ValueSource`] backed by the `fake` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeValueSource {
    locale: Locale,
}

impl FakeValueSource {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }
}

macro_rules! localized {
    ($locale:expr, $module:ident :: $faker:ident, $rng:expr) => {{
        let value: String = match $locale {
            Locale::EnUs => $module::en::$faker().fake_with_rng($rng),
            Locale::PtBr => $module::pt_br::$faker().fake_with_rng($rng),
        };
        value
    }};
}

impl ValueSource for FakeValueSource {
    fn locale(&self) -> Locale {
        self.locale
    }

    fn first_name(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, name::FirstName, rng)
    }

    fn last_name(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, name::LastName, rng)
    }

    fn full_name(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, name::Name, rng)
    }

    fn company(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, company::CompanyName, rng)
    }

    fn email(&self, rng: &mut dyn RngCore) -> String {
        internet::en::SafeEmail().fake_with_rng(rng)
    }

    fn phone(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, phone_number::PhoneNumber, rng)
    }

    fn street(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, address::StreetName, rng)
    }

    fn city(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, address::CityName, rng)
    }

    fn state(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, address::StateName, rng)
    }

    fn postcode(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, address::PostCode, rng)
    }

    fn building_number(&self, rng: &mut dyn RngCore) -> String {
        localized!(self.locale, address::BuildingNumber, rng)
    }

    fn swift_code(&self, rng: &mut dyn RngCore) -> String {
        finance::en::Bic().fake_with_rng(rng)
    }

    fn ipv4(&self, rng: &mut dyn RngCore) -> String {
        internet::en::IPv4().fake_with_rng(rng)
    }

    fn user_agent(&self, rng: &mut dyn RngCore) -> String {
        internet::en::UserAgent().fake_with_rng(rng)
    }

    fn word(&self, rng: &mut dyn RngCore) -> String {
        lorem::en::Word().fake_with_rng(rng)
    }

    fn sentence(&self, words: usize, rng: &mut dyn RngCore) -> String {
        let words = words.max(1);
        lorem::en::Sentence(words..words + 1).fake_with_rng(rng)
    }

    fn text(&self, max_chars: usize, rng: &mut dyn RngCore) -> String {
        let paragraph: String = lorem::en::Paragraph(1..4).fake_with_rng(rng);
        truncate_words(&paragraph, max_chars)
    }
}

/// Cut `text` to at most `max_chars` characters, at a word boundary when
/// one exists.
pub fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].trim_end_matches([',', ';']).to_string(),
        _ => cut,
    }
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    text.chars().take(max_chars).collect()
}

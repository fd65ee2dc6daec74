use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Source of "now" for generated timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock, pinned when constructed so a whole run shares one instant.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    pinned: NaiveDateTime,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            pinned: Utc::now().naive_utc(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        self.pinned
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Midnight UTC of the given date; invalid dates fall back to the epoch.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default();
        Self(date.and_hms_opt(0, 0, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

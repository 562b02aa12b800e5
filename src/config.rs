use std::env;

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;

use crate::stats::SubmissionRatePolicy;

/// WIB, the offset interns report in.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub rate_policy: SubmissionRatePolicy,
    pub utc_offset_hours: i32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

        let rate_policy = match env::var("MAGANG_RATE_POLICY") {
            Ok(value) => SubmissionRatePolicy::parse(&value)
                .ok_or_else(|| anyhow!("MAGANG_RATE_POLICY must be binary or since-joined, got {value:?}"))?,
            Err(_) => SubmissionRatePolicy::default(),
        };

        let utc_offset_hours = match env::var("MAGANG_UTC_OFFSET_HOURS") {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("MAGANG_UTC_OFFSET_HOURS is not a number: {value:?}"))?,
            Err(_) => DEFAULT_UTC_OFFSET_HOURS,
        };

        let config = Self {
            database_url,
            rate_policy,
            utc_offset_hours,
        };
        config.offset()?;
        Ok(config)
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        offset_from_hours(self.utc_offset_hours)
    }
}

pub fn offset_from_hours(hours: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| anyhow!("UTC offset of {hours} hours is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_within_a_day_are_accepted() {
        assert_eq!(offset_from_hours(7).unwrap().local_minus_utc(), 25_200);
        assert_eq!(offset_from_hours(-5).unwrap().local_minus_utc(), -18_000);
        assert!(offset_from_hours(30).is_err());
    }
}

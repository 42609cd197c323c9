use chrono::FixedOffset;
use error_stack::{Report, Result, ResultExt};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

use super::{Database, Logging, ParseError};
use crate::types::Timezone;
use crate::util::figment::FigmentErrorAttachable;

#[derive(Debug, Default, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub db: Database,
    #[serde(default)]
    pub logging: Logging,
    /// Fixed offset from UTC used to decide which calendar day
    /// a check-in belongs to, written as `+HH:MM` or `-HH:MM`.
    ///
    /// If it is not set, the local time zone of the host is used.
    ///
    /// **Environment variables**:
    /// - `ROLLCALL_UTC_OFFSET`
    pub utc_offset: Option<UtcOffset>,
}

impl Server {
    pub fn load() -> Result<Self, ParseError> {
        dotenvy::dotenv().ok();

        let config = Self::figment()
            .extract::<Self>()
            .map_err(|e| Report::new(ParseError).attach_figment_error(e))?;

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn timezone(&self) -> Timezone {
        self.utc_offset
            .map_or(Timezone::System, |offset| Timezone::Fixed(offset.0))
    }

    fn validate(&self) -> Result<(), ParseError> {
        if !self.db.url.as_str().starts_with("sqlite:") {
            return Err(Report::new(ParseError))
                .attach_printable("db.url: must be a SQLite connection URL (sqlite://...)");
        }
        Ok(())
    }
}

impl Server {
    const DEFAULT_CONFIG_FILE: &'static str = "rollcall.toml";

    /// Creates a default [`Figment`](figment::Figment) object to load
    /// server configuration. This function is there for loading and testing.
    pub(crate) fn figment() -> figment::Figment {
        use figment::{
            providers::{Env, Format, Toml},
            Figment,
        };

        Figment::new()
            .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
            // Fields with underscores in them need to be mapped by hand,
            // the env provider splits every underscore into a new key.
            .merge(Env::prefixed("ROLLCALL_").map(|v| match v.as_str() {
                "DB_MIN_IDLE" => "db.min_idle".into(),
                "DB_POOL_SIZE" => "db.pool_size".into(),
                "DB_TIMEOUT_SECS" => "db.timeout_secs".into(),
                "DB_CREATE_IF_MISSING" => "db.create_if_missing".into(),
                "UTC_OFFSET" => "utc_offset".into(),
                _ => v.as_str().replace('_', ".").into(),
            }))
            // Environment variable aliases
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL"])
                    .map(|_| "db.url".into()),
            )
    }
}

/// A fixed offset from UTC parsed from `+HH:MM`, `-HH:MM` or `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcOffset(pub FixedOffset);

#[derive(Debug, Error)]
#[error("invalid UTC offset {0:?}, expected +HH:MM or -HH:MM")]
pub struct InvalidUtcOffset(String);

impl FromStr for UtcOffset {
    type Err = InvalidUtcOffset;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || InvalidUtcOffset(s.to_string());
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
            return FixedOffset::east_opt(0).map(Self).ok_or_else(invalid);
        }

        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(invalid()),
        };

        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl<'de> Deserialize<'de> for UtcOffset {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::num::{NonZeroU32, NonZeroU64};

    #[test]
    fn env_aliases() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "sqlite://roster.db");

            jail.set_env("ROLLCALL_DB_MIN_IDLE", "2");
            jail.set_env("ROLLCALL_DB_POOL_SIZE", "10");
            jail.set_env("ROLLCALL_DB_TIMEOUT_SECS", "30");
            jail.set_env("ROLLCALL_DB_CREATE_IF_MISSING", "false");
            jail.set_env("ROLLCALL_LOGGING_STYLE", "json");
            jail.set_env("ROLLCALL_UTC_OFFSET", "+08:00");

            let config: Server = Server::figment().extract()?;
            assert_eq!(config.db.url.as_str(), "sqlite://roster.db");
            assert_eq!(config.db.min_idle, NonZeroU32::new(2));
            assert_eq!(config.db.pool_size, NonZeroU32::new(10).unwrap());
            assert_eq!(config.db.timeout_secs, NonZeroU64::new(30).unwrap());
            assert!(!config.db.create_if_missing);
            assert_eq!(config.logging.style, crate::config::LoggingStyle::Json);
            assert_eq!(
                config.timezone(),
                Timezone::Fixed(FixedOffset::east_opt(8 * 3600).unwrap())
            );

            Ok(())
        });
    }

    #[test]
    fn file_and_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "rollcall.toml",
                r#"
                utc_offset = "-05:30"

                [db]
                url = "sqlite://kiosk.db"
                "#,
            )?;

            let config: Server = Server::figment().extract()?;
            assert_eq!(config.db.url.as_str(), "sqlite://kiosk.db");
            assert_eq!(config.db.pool_size, NonZeroU32::new(5).unwrap());
            assert!(config.db.create_if_missing);
            assert_eq!(
                config.utc_offset,
                Some(UtcOffset(FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()))
            );

            Ok(())
        });
    }

    #[test]
    fn rejects_non_sqlite_urls() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://localhost/rollcall");
            assert!(Server::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn parse_utc_offsets() {
        assert_eq!("Z".parse::<UtcOffset>().unwrap().0.local_minus_utc(), 0);
        assert_eq!("+09".parse::<UtcOffset>().unwrap().0.local_minus_utc(), 9 * 3600);
        assert_eq!(
            "-03:15".parse::<UtcOffset>().unwrap().0.local_minus_utc(),
            -(3 * 3600 + 15 * 60)
        );
        assert!("08:00".parse::<UtcOffset>().is_err());
        assert!("+25:00".parse::<UtcOffset>().is_err());
    }
}

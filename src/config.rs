//! Runtime configuration
//!
//! Settings come from `JOURNAL_*` environment variables with fixed defaults.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local, Utc};

use crate::error::JournalError;

/// Default directory for the file-backed store
pub const DEFAULT_DATA_DIR: &str = ".synheart-journal";

/// Default log filter when neither `JOURNAL_LOG` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Clone, Debug, PartialEq)]
pub struct JournalConfig {
    pub data_dir: PathBuf,
    /// Offset used for local dates; the system offset when unset
    pub utc_offset: Option<FixedOffset>,
    pub log_filter: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            utc_offset: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl JournalConfig {
    pub fn from_env() -> Result<Self, JournalError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Read configuration through `get` so tests don't touch the process
    /// environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, JournalError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let data_dir = get("JOURNAL_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let utc_offset = match get("JOURNAL_UTC_OFFSET") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_offset(&raw)?),
            _ => None,
        };
        let log_filter = get("JOURNAL_LOG")
            .or_else(|| get("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            utc_offset,
            log_filter,
        })
    }

    /// Offset for local-date grouping
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset.unwrap_or_else(|| *Local::now().offset())
    }

    /// Current time in the configured offset
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset())
    }
}

/// Parse `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`
pub fn parse_offset(raw: &str) -> Result<FixedOffset, JournalError> {
    let raw = raw.trim();
    let invalid = || JournalError::Config(format!("invalid UTC offset '{raw}' (expected ±HH:MM)"));
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => return Err(invalid()),
    };
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_defaults() {
        let cfg = JournalConfig::from_env_with(|_| None).expect("cfg");
        assert_eq!(cfg, JournalConfig::default());
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "JOURNAL_DATA_DIR" => Some("/tmp/journal".into()),
            "JOURNAL_UTC_OFFSET" => Some("+05:30".into()),
            "JOURNAL_LOG" => Some("debug".into()),
            "RUST_LOG" => Some("trace".into()),
            _ => None,
        };
        let cfg = JournalConfig::from_env_with(get).expect("cfg");
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/journal"));
        assert_eq!(cfg.utc_offset, FixedOffset::east_opt(5 * 3600 + 1800));
        assert_eq!(cfg.log_filter, "debug");
    }

    #[test]
    fn from_env_falls_back_to_rust_log() {
        let get = |k: &str| match k {
            "RUST_LOG" => Some("info".into()),
            _ => None,
        };
        let cfg = JournalConfig::from_env_with(get).expect("cfg");
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn from_env_rejects_bad_offset() {
        let get = |k: &str| match k {
            "JOURNAL_UTC_OFFSET" => Some("five".into()),
            _ => None,
        };
        assert!(matches!(
            JournalConfig::from_env_with(get),
            Err(JournalError::Config(_))
        ));
    }

    #[test]
    fn parse_offset_forms() {
        assert_eq!(parse_offset("Z").ok(), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("-08:00").ok(), FixedOffset::west_opt(8 * 3600));
        assert_eq!(parse_offset("+0200").ok(), FixedOffset::east_opt(7200));
        assert!(parse_offset("+2:00").is_err());
        assert!(parse_offset("+02:75").is_err());
        assert!(parse_offset("+25:00").is_err());
        assert!(parse_offset("02:00").is_err());
        assert!(matches!(parse_offset("+1é1"), Err(JournalError::Config(_))));
    }

    #[test]
    fn fixed_offset_is_used_for_now() {
        let cfg = JournalConfig {
            utc_offset: FixedOffset::east_opt(3600),
            ..JournalConfig::default()
        };
        assert_eq!(cfg.now().offset().local_minus_utc(), 3600);
    }
}

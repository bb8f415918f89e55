//! Timestamp codec for stored records
//!
//! Records are written as RFC 3339 strings. Older backups stored epoch
//! milliseconds, so both forms are accepted on read.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
    Fractional(f64),
}

pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    rehydrate(RawTimestamp::deserialize(deserializer)?).map_err(D::Error::custom)
}

/// Parse a timestamp string (RFC 3339, or epoch milliseconds as digits)
pub fn parse(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(millis) = text.parse::<i64>() {
        return from_millis(millis);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{text}': {e}"))
}

fn rehydrate(raw: RawTimestamp) -> Result<DateTime<Utc>, String> {
    match raw {
        RawTimestamp::Text(text) => parse(&text),
        RawTimestamp::Millis(millis) => from_millis(millis),
        RawTimestamp::Fractional(millis) if millis.is_finite() => from_millis(millis as i64),
        RawTimestamp::Fractional(millis) => Err(format!("invalid timestamp {millis}")),
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| format!("timestamp out of range: {millis}"))
}

/// Same codec for optional timestamps
pub mod option {
    use super::*;

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => super::serialize(ts, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            Some(raw) => rehydrate(raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_accepts_rfc3339_and_millis() {
        let from_text: Stamped = serde_json::from_str(r#"{"at":"2024-01-15T08:30:00Z"}"#).unwrap();
        let from_millis: Stamped = serde_json::from_str(r#"{"at":1705307400000}"#).unwrap();
        assert_eq!(from_text, from_millis);
    }

    #[test]
    fn test_offset_is_normalized_to_utc() {
        let stamped: Stamped =
            serde_json::from_str(r#"{"at":"2024-01-15T10:30:00+02:00"}"#).unwrap();
        assert_eq!(stamped.at, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_round_trip_keeps_subsecond_precision() {
        let at = Utc.timestamp_nanos(1_705_307_400_123_456_789);
        let json = serde_json::to_string(&Stamped { at }).unwrap();
        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, at);
    }

    #[test]
    fn test_rejects_garbage() {
        let result: Result<Stamped, _> = serde_json::from_str(r#"{"at":"yesterday"}"#);
        assert!(result.is_err());
    }
}

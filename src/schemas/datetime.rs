use serde::de::Error as _;
use serde::Deserialize;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

pub(crate) fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Browsers' datetime-local inputs send no offset; treat those as UTC.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

pub(crate) fn deserialize_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

pub(crate) fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_offset_datetime_flexible;
    use time::macros::datetime;

    #[test]
    fn parses_rfc3339_with_offset() {
        let value = parse_offset_datetime_flexible("2025-03-01T12:00:00+03:00").expect("parsed");
        assert_eq!(value, datetime!(2025-03-01 09:00 UTC));
    }

    #[test]
    fn parses_datetime_local_without_seconds_as_utc() {
        let value = parse_offset_datetime_flexible("2025-03-01T09:30").expect("parsed");
        assert_eq!(value, datetime!(2025-03-01 09:30 UTC));
    }

    #[test]
    fn parses_space_separated_timestamp() {
        let value = parse_offset_datetime_flexible("2025-03-01 09:30:15").expect("parsed");
        assert_eq!(value, datetime!(2025-03-01 09:30:15 UTC));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_offset_datetime_flexible("next tuesday").is_none());
    }
}

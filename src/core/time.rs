use time::{
    format_description::well_known::Rfc3339, Duration, OffsetDateTime, PrimitiveDateTime, Time,
    UtcOffset,
};

/// Every timestamp column stores naive UTC.
pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Midnight (UTC) of the day containing `now`.
pub(crate) fn start_of_day(now: PrimitiveDateTime) -> PrimitiveDateTime {
    now.replace_time(Time::MIDNIGHT)
}

pub(crate) fn days_before(now: PrimitiveDateTime, days: i64) -> PrimitiveDateTime {
    now - Duration::days(days.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(datetime!(2025-01-02 10:20:30)), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn offsets_are_folded_into_utc() {
        let local = datetime!(2025-03-01 09:00).assume_offset(offset!(+8));
        assert_eq!(to_primitive_utc(local), datetime!(2025-03-01 01:00));
    }

    #[test]
    fn day_helpers() {
        let now = datetime!(2025-03-01 17:45:12);
        assert_eq!(start_of_day(now), datetime!(2025-03-01 00:00));
        assert_eq!(days_before(now, 7), datetime!(2025-02-22 17:45:12));
        assert_eq!(days_before(now, -3), now);
    }
}

//! UTC month-bucket helpers shared by the storage adapter, the cursor codec,
//! and the HTTP query API.
//!
//! `year_month` is always the 6-digit `YYYYMM` integer derived from a
//! millisecond timestamp interpreted in UTC (invariant V1 of the data
//! model).

use chrono::{DateTime, Datelike, Utc};

/// Derive the `YYYYMM` partition key component from a millisecond timestamp.
///
/// # Panics
///
/// Panics if `timestamp_ms` is outside the range chrono can represent as a
/// UTC instant; in practice this only happens for timestamps many millennia
/// from the present, which never occur in this system.
pub fn get_month(timestamp_ms: i64) -> u32 {
    let dt = DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .expect("timestamp_ms out of chrono's representable range");
    dt.year() as u32 * 100 + dt.month()
}

/// Roll a `YYYYMM` value forward by one month, handling the December to
/// January year rollover.
pub fn get_next_month(year_month: u32) -> u32 {
    let year = year_month / 100;
    let month = year_month % 100;
    if month >= 12 {
        (year + 1) * 100 + 1
    } else {
        year * 100 + (month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_year_month_from_millis() {
        // 2024-01-01T00:00:00Z
        assert_eq!(get_month(1704067200000), 202401);
        // 2024-01-31T23:59:59.000Z
        assert_eq!(get_month(1706745599000), 202401);
        // 2024-02-01T00:00:01.000Z
        assert_eq!(get_month(1706745601000), 202402);
    }

    #[test]
    fn rolls_over_december_to_january() {
        assert_eq!(get_next_month(202412), 202501);
        assert_eq!(get_next_month(202401), 202402);
        assert_eq!(get_next_month(202311), 202312);
    }
}

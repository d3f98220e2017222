//! RFC 1123 dates for Last-Modified / If-Modified-Since.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Length of an RFC 1123 date ("Thu, 01 Jan 1970 00:00:00 GMT").
pub const HTTP_DATE_LEN: usize = 29;

/// Length of the block produced by [`format_last_modified`].
pub const LAST_MODIFIED_LEN: usize = 48;

/// Formats a unix timestamp as an RFC 1123 date, always in GMT.
pub fn format_http_date(unix_time: u64) -> String {
    httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_secs(unix_time))
}

/// Formats the `Last-Modified` header line followed by the blank line that
/// terminates the header block.
pub fn format_last_modified(unix_time: u64) -> String {
    format!("Last-Modified: {}\r\n\r\n", format_http_date(unix_time))
}

const MONTHS: [&[u8; 3]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun", b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
];

fn digits(bytes: &[u8]) -> Option<i64> {
    bytes.iter().try_fold(0i64, |acc, b| {
        b.is_ascii_digit().then(|| acc * 10 + i64::from(b - b'0'))
    })
}

// Days since 1970-01-01 for a proleptic Gregorian date (month 1-12).
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Parses an RFC 1123 date into a unix timestamp.
///
/// Fields are read by position from the fixed 29-byte form
/// (`Wkd, DD Mon YYYY HH:MM:SS GMT`); the weekday is not checked. RFC 850
/// and asctime dates, malformed months or digits, and pre-epoch instants
/// yield `None`.
pub fn parse_http_date(bytes: &[u8]) -> Option<u64> {
    if bytes.len() != HTTP_DATE_LEN || bytes[3] != b',' {
        return None;
    }

    let day = digits(&bytes[5..7])?;
    let month = MONTHS.iter().position(|m| &bytes[8..11] == m.as_slice())? as i64 + 1;
    let year = digits(&bytes[12..16])?;
    let hour = digits(&bytes[17..19])?;
    let minute = digits(&bytes[20..22])?;
    let second = digits(&bytes[23..25])?;

    let secs = days_from_civil(year, month, day) * 86_400 + hour * 3_600 + minute * 60 + second;
    u64::try_from(secs).ok()
}

/// Seconds since the epoch for a file timestamp (0 for pre-epoch times).
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_formats_and_parses() {
        let block = format_last_modified(0);
        assert_eq!(block, "Last-Modified: Thu, 01 Jan 1970 00:00:00 GMT\r\n\r\n");
        assert_eq!(block.len(), LAST_MODIFIED_LEN);
        assert_eq!(parse_http_date(b"Thu, 01 Jan 1970 00:00:00 GMT"), Some(0));
    }

    #[test]
    fn roundtrip_fixed_instant() {
        let t = 1_627_627_215; // Fri, 30 Jul 2021 06:40:15 GMT
        let date = format_http_date(t);
        assert_eq!(date, "Fri, 30 Jul 2021 06:40:15 GMT");
        assert_eq!(parse_http_date(date.as_bytes()), Some(t));
    }

    #[test]
    fn every_month_parses() {
        let months = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        let mut last = 0;
        for (i, _) in months.iter().enumerate() {
            // The 1st of each month in 2001 (a non-leap year).
            let days_before: u64 = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334][i];
            let t = 978_307_200 + days_before * 86_400;
            let date = format_http_date(t);
            assert!(date.contains(months[i]), "{} should name {}", date, months[i]);
            let parsed = parse_http_date(date.as_bytes()).unwrap();
            assert_eq!(parsed, t);
            assert!(parsed > last);
            last = parsed;
        }
    }

    #[test]
    fn weekday_is_not_checked() {
        assert_eq!(parse_http_date(b"Fri, 01 Jan 1970 00:00:00 GMT"), Some(0));
        assert_eq!(parse_http_date(b"Mon, 30 Jul 2021 06:40:15 GMT"), Some(1_627_627_215));
    }

    #[test]
    fn leap_day_parses() {
        assert_eq!(parse_http_date(b"Thu, 29 Feb 2024 00:00:00 GMT"), Some(1_709_164_800));
    }

    #[test]
    fn rejects_other_formats() {
        assert_eq!(parse_http_date(b"Thursday, 01-Jan-70 00:00:00 GMT"), None);
        assert_eq!(parse_http_date(b"Thu Jan  1 00:00:00 1970"), None);
        assert_eq!(parse_http_date(b"Thu, 01 Foo 1970 00:00:00 GMT"), None);
        assert_eq!(parse_http_date(b""), None);
        assert_eq!(parse_http_date(b"Thu, 0x Jan 1970 00:00:00 GMT"), None);
        assert_eq!(parse_http_date(b"Wed, 31 Dec 1969 23:59:59 GMT"), None);
    }
}

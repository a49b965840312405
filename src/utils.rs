//! Small helpers.

use chrono::NaiveDate;

/// Parse the date formats seen in ledgers: ISO (`2024-01-19`), US
/// (`01/19/2024`, `1/19/24`), and datetime strings from the remote path
/// (date part only).
pub fn parse_ledger_date(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    if let Some(prefix) = t.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_and_us_formats() {
        let want = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();
        assert_eq!(parse_ledger_date("2024-01-19"), Some(want));
        assert_eq!(parse_ledger_date("01/19/2024"), Some(want));
        assert_eq!(parse_ledger_date(" 1/19/24 "), Some(want));
    }

    #[test]
    fn datetime_keeps_date_part() {
        let want = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();
        assert_eq!(parse_ledger_date("2024-01-19T00:00:00.000Z"), Some(want));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_ledger_date(""), None);
        assert_eq!(parse_ledger_date("not a date"), None);
    }
}

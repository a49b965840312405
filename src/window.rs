//! Map a selected transaction onto a bounded calendar window for the
//! follow-up price-history query.

use chrono::{Duration, NaiveDate};

/// Day spacing used when the configured value is non-positive.
pub const DEFAULT_DATE_SPACING: i64 = 10;

/// `[date - N, date + N]` around the selected transaction's date.
pub fn price_window(date: NaiveDate, spacing_days: i64) -> (NaiveDate, NaiveDate) {
    let n = if spacing_days > 0 {
        spacing_days
    } else {
        DEFAULT_DATE_SPACING
    };
    (date - Duration::days(n), date + Duration::days(n))
}

/// Transaction bars are labeled `<date> - <ticker>`; a selection hands the
/// ticker and date back for the price query.
pub fn selection_from_label(label: &str) -> Option<(String, String)> {
    let (date, ticker) = label.split_once(" - ")?;
    if ticker.trim().is_empty() {
        return None;
    }
    Some((date.trim().to_string(), ticker.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_spans_both_sides() {
        let (start, end) = price_window(d(2024, 1, 15), 10);
        assert_eq!(start, d(2024, 1, 5));
        assert_eq!(end, d(2024, 1, 25));
    }

    #[test]
    fn non_positive_spacing_falls_back_to_default() {
        let (start, end) = price_window(d(2024, 1, 15), 0);
        assert_eq!(start, d(2024, 1, 5));
        assert_eq!(end, d(2024, 1, 25));
        let (start, end) = price_window(d(2024, 1, 15), -3);
        assert_eq!((start, end), (d(2024, 1, 5), d(2024, 1, 25)));
    }

    #[test]
    fn window_crosses_month_boundaries() {
        let (start, end) = price_window(d(2024, 3, 5), 7);
        assert_eq!(start, d(2024, 2, 27));
        assert_eq!(end, d(2024, 3, 12));
    }

    #[test]
    fn labels_round_trip() {
        assert_eq!(
            selection_from_label("2024-01-15 - AAPL"),
            Some(("2024-01-15".to_string(), "AAPL".to_string()))
        );
        assert_eq!(selection_from_label("no separator"), None);
        assert_eq!(selection_from_label("2024-01-15 - "), None);
    }
}

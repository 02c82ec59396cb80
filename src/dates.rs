use chrono::{Datelike, Duration, Local, NaiveDate};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// ISO-8601 week key. The week belongs to the year of its Thursday, so
/// early-January days can land in the previous year's last week.
pub fn week_key(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year}-{month:02}")
}

pub fn days_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|date| date.month() == month)
        .collect()
}

/// Week keys touching the month, in calendar order, each listed once.
pub fn week_keys_for_month(year: i32, month: u32) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for date in days_in_month(year, month) {
        let key = week_key(date);
        if keys.last() != Some(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Every day from `start` to `end`, both inclusive.
pub fn day_span(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}

pub fn previous_day(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_signed(Duration::days(1))
}

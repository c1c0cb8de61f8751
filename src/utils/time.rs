use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// This is the standard way of converting a date to a string in focustrack.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    let next = date.date_naive() + Duration::days(1);
    day_start(next, &date.timezone())
}

/// First moment of `date` in `tz`. When midnight doesn't exist because of a daylight saving
/// shift the UTC midnight is used instead.
pub fn day_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// `[start, end)` of a local day, expressed in UTC.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day_start(date, tz);
    let end = next_day_start(start.clone());
    (start.to_utc(), end.to_utc())
}

/// Calendar day a moment belongs to in `tz`.
pub fn local_date<Tz: TimeZone>(moment: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    moment.with_timezone(tz).date_naive()
}

/// Every day of the month `first` belongs to.
pub fn month_days(first: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let month = first.month();
    first
        .with_day(1)
        .unwrap_or(first)
        .iter_days()
        .take_while(move |day| day.month() == month)
}

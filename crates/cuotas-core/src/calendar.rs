//! Calendar month arithmetic shared by installment generation and reports

use chrono::{Datelike, Months, NaiveDate};

/// Month names used for report and chart labels, January first
pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Name of a 1-based month, or `None` outside 1..=12
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// Advance a date by whole calendar months.
///
/// When the target month is shorter than the start day, the result is
/// clamped to the target month's last day (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Whole calendar months from `from` to `to`, ignoring the day of month.
///
/// Negative when `to` falls in an earlier month than `from`.
pub fn months_elapsed(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + (to.month() as i64 - from.month() as i64)
}

/// First and last day of a month
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = add_months(first, 1)?.pred_opt()?;
    Some((first, last))
}

/// First and last day of a year
pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// First day of the month after `date`
pub fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    add_months(date.with_day(1)?, 1)
}

// libs/scheduling-cell/src/services/view_range.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::models::{CalendarView, DateRange};

/// Resolves the date window to fetch and display for a calendar view.
/// Windows are inclusive of both boundary days, normalized to
/// [00:00:00, 23:59:59.999] clinic-local (stored UTC).
pub struct ViewRangeResolver;

impl ViewRangeResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_range(&self, view: CalendarView, reference: NaiveDate) -> DateRange {
        match view {
            CalendarView::Month => DateRange {
                start: start_of_day(month_first_day(reference)),
                end: end_of_day(month_last_day(reference)),
            },
            CalendarView::Week => {
                let week = reference.week(Weekday::Mon);
                DateRange {
                    start: start_of_day(week.first_day()),
                    end: end_of_day(week.last_day()),
                }
            }
            CalendarView::Day => DateRange {
                start: start_of_day(reference),
                end: end_of_day(reference),
            },
        }
    }

    /// The fetch window used by the composed calendar provider. For the
    /// month view it buffers one month on each side so adjacent-month cells
    /// already have their events when the user pages; the display contract
    /// of `resolve_range` is unchanged.
    pub fn resolve_fetch_window(&self, view: CalendarView, reference: NaiveDate) -> DateRange {
        match view {
            CalendarView::Month => {
                let prior = month_first_day(reference) - Duration::days(1);
                let next = month_last_day(reference) + Duration::days(1);
                DateRange {
                    start: start_of_day(month_first_day(prior)),
                    end: end_of_day(month_last_day(next)),
                }
            }
            CalendarView::Week | CalendarView::Day => self.resolve_range(view, reference),
        }
    }
}

impl Default for ViewRangeResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn month_first_day(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap()
}

fn month_last_day(date: NaiveDate) -> NaiveDate {
    let (next_year, next_month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap() - Duration::days(1)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc()
}

//! Calendar periods and day-count proration.
//!
//! Every interval in the planning tables is closed: both the start and the end date count as
//! covered days. Periods never overlap and always start on the first day of a month.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places kept on FTE figures that leave the aggregation layer.
pub const FTE_SCALE: u32 = 3;

/// Latest date a planning record may carry. Keeps period arithmetic inside chrono's range and
/// the ISO text columns lexically ordered.
pub const LATEST_SUPPORTED_DATE: NaiveDate = match NaiveDate::from_ymd_opt(9999, 12, 31) {
    Some(date) => date,
    None => NaiveDate::MIN,
};

/// Earliest date a planning record may carry.
pub const EARLIEST_SUPPORTED_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1, 1, 1) {
    Some(date) => date,
    None => NaiveDate::MIN,
};

pub fn is_supported_date(date: NaiveDate) -> bool {
    (EARLIEST_SUPPORTED_DATE..=LATEST_SUPPORTED_DATE).contains(&date)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PeriodGranularity {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl PeriodGranularity {
    pub const fn ordered() -> [Self; 3] {
        [Self::Monthly, Self::Quarterly, Self::Annual]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }

    pub const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Annual => 12,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Some(Self::Monthly),
            "quarterly" | "quarter" => Some(Self::Quarterly),
            "annual" | "annually" | "year" | "yearly" => Some(Self::Annual),
            _ => None,
        }
    }
}

/// How covered days are weighted when a record only partially spans a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProrationPolicy {
    /// Every calendar day carries equal weight.
    #[default]
    CalendarDays,
    /// Only Monday to Friday count; weekends carry no weight.
    WorkingDays,
}

impl ProrationPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CalendarDays => "calendar_days",
            Self::WorkingDays => "working_days",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "calendar_days" | "calendar" => Some(Self::CalendarDays),
            "working_days" | "working" | "weekdays" => Some(Self::WorkingDays),
            _ => None,
        }
    }

    /// Weight of the closed interval `[start, end]`; zero when `start > end`.
    pub fn weight(self, start: NaiveDate, end: NaiveDate) -> i64 {
        match self {
            Self::CalendarDays => days_inclusive(start, end),
            Self::WorkingDays => working_days_inclusive(start, end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: PeriodGranularity,
}

impl Period {
    /// The period of the given granularity that contains `date`.
    pub fn containing(granularity: PeriodGranularity, date: NaiveDate) -> Self {
        let mut start = first_of_month(date);
        let step = granularity.months();
        while (start.month() - 1) % step != 0 {
            start = first_of_month(start - Duration::days(1));
        }

        let end = end_of_span(start, step);
        Self {
            start,
            end,
            granularity,
        }
    }

    /// Periods overlapping the closed interval, in calendar order.
    pub fn covering(granularity: PeriodGranularity, start: NaiveDate, end: NaiveDate) -> Vec<Self> {
        let mut periods = Vec::new();
        if start > end {
            return periods;
        }

        let mut current = Some(Self::containing(granularity, start));
        while let Some(period) = current.filter(|period| period.start <= end) {
            periods.push(period);
            current = period.next();
        }
        periods
    }

    /// The following period, or `None` past the end of the calendar.
    pub fn next(&self) -> Option<Self> {
        let start = self.end.succ_opt()?;
        Some(Self::containing(self.granularity, start))
    }

    pub fn days(&self) -> i64 {
        days_inclusive(self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The part of `[start, end]` that falls inside this period, if any.
    pub fn overlap(&self, start: NaiveDate, end: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let from = start.max(self.start);
        let to = end.min(self.end);
        (from <= to).then_some((from, to))
    }

    pub fn label(&self) -> String {
        match self.granularity {
            PeriodGranularity::Monthly => self.start.format("%Y-%m").to_string(),
            PeriodGranularity::Quarterly => {
                format!("{}-Q{}", self.start.year(), (self.start.month() - 1) / 3 + 1)
            }
            PeriodGranularity::Annual => self.start.year().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("month {0} is outside 1..=12")]
    Month(u32),
    #[error("quarter {0} is outside 1..=4")]
    Quarter(u32),
    #[error("year {0} is outside the supported calendar")]
    Year(i32),
}

/// First and last day of the given month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), PeriodError> {
    if !(1..=12).contains(&month) {
        return Err(PeriodError::Month(month));
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or(PeriodError::Year(year))?;
    let period = Period::containing(PeriodGranularity::Monthly, start);
    Ok((period.start, period.end))
}

pub fn quarter_bounds(year: i32, quarter: u32) -> Result<(NaiveDate, NaiveDate), PeriodError> {
    if !(1..=4).contains(&quarter) {
        return Err(PeriodError::Quarter(quarter));
    }
    let start =
        NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1).ok_or(PeriodError::Year(year))?;
    let period = Period::containing(PeriodGranularity::Quarterly, start);
    Ok((period.start, period.end))
}

pub fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), PeriodError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(PeriodError::Year(year))?;
    let period = Period::containing(PeriodGranularity::Annual, start);
    Ok((period.start, period.end))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    end_of_span(first_of_month(date), 1)
}

/// Last day of the twelve-month window opening with the month of `start`.
pub fn default_window_end(start: NaiveDate) -> NaiveDate {
    end_of_span(first_of_month(start), 12)
}

/// Last day of the `months`-long span opening on `month_start`, clamped to the calendar end.
fn end_of_span(month_start: NaiveDate, months: u32) -> NaiveDate {
    month_start
        .checked_add_months(Months::new(months))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    (end - start).num_days() + 1
}

pub fn working_days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    let total = days_inclusive(start, end);
    let full_weeks = total / 7;
    let mut count = full_weeks * 5;

    let remainder = total % 7;
    if remainder == 0 {
        return count;
    }

    let first = start + Duration::days(full_weeks * 7);
    count += first
        .iter_days()
        .take(remainder as usize)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as i64;
    count
}

/// First day of every month touched by `[start, end]`.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    Period::covering(PeriodGranularity::Monthly, start, end)
        .into_iter()
        .map(|period| period.start)
        .collect()
}

/// Length of `[start, end]` in months, counting partial months by their covered days.
pub fn months_in_interval(start: NaiveDate, end: NaiveDate) -> Decimal {
    Period::covering(PeriodGranularity::Monthly, start, end)
        .into_iter()
        .filter_map(|month| {
            let (from, to) = month.overlap(start, end)?;
            Some(Decimal::from(days_inclusive(from, to)) / Decimal::from(month.days()))
        })
        .sum()
}

/// FTE-months delivered by a constant FTE over `[start, end]`.
pub fn fte_months(fte: Decimal, start: NaiveDate, end: NaiveDate) -> Decimal {
    (fte * months_in_interval(start, end)).round_dp(FTE_SCALE)
}

/// Month-by-month prorated FTE of a single record, rounded for display.
pub fn monthly_distribution(
    fte: Decimal,
    start: NaiveDate,
    end: NaiveDate,
    policy: ProrationPolicy,
) -> Vec<(Period, Decimal)> {
    Period::covering(PeriodGranularity::Monthly, start, end)
        .into_iter()
        .filter_map(|month| {
            let (from, to) = month.overlap(start, end)?;
            let weight = policy.weight(month.start, month.end);
            if weight == 0 {
                return Some((month, Decimal::ZERO));
            }
            let share = fte * Decimal::from(policy.weight(from, to)) / Decimal::from(weight);
            Some((month, share.round_dp(FTE_SCALE)))
        })
        .collect()
}

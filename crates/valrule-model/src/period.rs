//! Periods and period types
//!
//! A period is a calendar interval of a given type. Periods are identified by
//! ISO-style strings (`202401`, `2024Q1`, `2024W3`, ...), which is also how
//! they serialize.

use crate::{ModelError, ModelResult};
use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The calendar granularity of a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    BiMonthly,
    Quarterly,
    SixMonthly,
    Yearly,
}

impl PeriodType {
    /// All supported period types, shortest first
    pub const ALL: [PeriodType; 7] = [
        PeriodType::Daily,
        PeriodType::Weekly,
        PeriodType::Monthly,
        PeriodType::BiMonthly,
        PeriodType::Quarterly,
        PeriodType::SixMonthly,
        PeriodType::Yearly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PeriodType::Daily => "Daily",
            PeriodType::Weekly => "Weekly",
            PeriodType::Monthly => "Monthly",
            PeriodType::BiMonthly => "BiMonthly",
            PeriodType::Quarterly => "Quarterly",
            PeriodType::SixMonthly => "SixMonthly",
            PeriodType::Yearly => "Yearly",
        }
    }

    /// Approximate number of days in one period of this type
    pub fn frequency_order(&self) -> u32 {
        match self {
            PeriodType::Daily => 1,
            PeriodType::Weekly => 7,
            PeriodType::Monthly => 30,
            PeriodType::BiMonthly => 61,
            PeriodType::Quarterly => 91,
            PeriodType::SixMonthly => 182,
            PeriodType::Yearly => 365,
        }
    }

    /// The period of this type that contains `date`
    pub fn period_containing(&self, date: NaiveDate) -> Period {
        let (start, end) = match self {
            PeriodType::Daily => (date, date),
            PeriodType::Weekly => {
                let offset = i64::from(date.weekday().num_days_from_monday());
                let start = date - TimeDelta::days(offset);
                (start, start + TimeDelta::days(6))
            }
            PeriodType::Monthly => month_span(date.year(), date.month(), 1),
            PeriodType::BiMonthly => month_span(date.year(), (date.month() - 1) / 2 * 2 + 1, 2),
            PeriodType::Quarterly => month_span(date.year(), (date.month() - 1) / 3 * 3 + 1, 3),
            PeriodType::SixMonthly => month_span(date.year(), (date.month() - 1) / 6 * 6 + 1, 6),
            PeriodType::Yearly => month_span(date.year(), 1, 12),
        };
        Period {
            start,
            end,
            period_type: *self,
        }
    }

    /// Every period of this type lying fully inside `[start, end]`
    pub fn periods_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = self.period_containing(start);
        while current.start <= end {
            if current.start >= start && current.end <= end {
                periods.push(current);
            }
            current = current.next();
        }
        periods
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ModelResult<Self> {
        if start > end {
            return Err(ModelError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn day_count(&self) -> u32 {
        days_inclusive(self.start, self.end)
    }

    /// Whether `period` lies entirely inside this range
    pub fn contains_period(&self, period: &Period) -> bool {
        period.start >= self.start && period.end <= self.end
    }
}

/// A calendar interval of a given period type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
    period_type: PeriodType,
}

impl Period {
    /// The period of `period_type` containing `date`
    pub fn new(period_type: PeriodType, date: NaiveDate) -> Self {
        period_type.period_containing(date)
    }

    /// Parse an ISO period identifier
    pub fn parse(id: &str) -> ModelResult<Self> {
        let s = id.trim();
        let invalid = || ModelError::invalid_period(id);

        if let Some(body) = s.strip_suffix('B') {
            if body.len() != 6 || !all_digits(body) {
                return Err(invalid());
            }
            let year = parse_year(&body[..4]).ok_or_else(invalid)?;
            let index: u32 = body[4..].parse().map_err(|_| invalid())?;
            if !(1..=6).contains(&index) {
                return Err(invalid());
            }
            return Ok(Self::from_months(PeriodType::BiMonthly, year, (index - 1) * 2 + 1, 2));
        }

        for (marker, period_type) in [
            ('W', PeriodType::Weekly),
            ('Q', PeriodType::Quarterly),
            ('S', PeriodType::SixMonthly),
        ] {
            let Some((year, number)) = s.split_once(marker) else {
                continue;
            };
            if year.len() != 4 || number.is_empty() || number.len() > 2 || !all_digits(number) {
                return Err(invalid());
            }
            let year = parse_year(year).ok_or_else(invalid)?;
            let number: u32 = number.parse().map_err(|_| invalid())?;
            return match period_type {
                PeriodType::Weekly => NaiveDate::from_isoywd_opt(year, number, Weekday::Mon)
                    .map(|monday| PeriodType::Weekly.period_containing(monday))
                    .ok_or_else(invalid),
                PeriodType::Quarterly if (1..=4).contains(&number) => {
                    Ok(Self::from_months(period_type, year, (number - 1) * 3 + 1, 3))
                }
                PeriodType::SixMonthly if (1..=2).contains(&number) => {
                    Ok(Self::from_months(period_type, year, (number - 1) * 6 + 1, 6))
                }
                _ => Err(invalid()),
            };
        }

        if !all_digits(s) {
            return Err(invalid());
        }
        let year = parse_year(&s[..4.min(s.len())]).ok_or_else(invalid)?;
        match s.len() {
            4 => Ok(Self::from_months(PeriodType::Yearly, year, 1, 12)),
            6 => {
                let month: u32 = s[4..6].parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&month) {
                    return Err(invalid());
                }
                Ok(Self::from_months(PeriodType::Monthly, year, month, 1))
            }
            8 => {
                let month: u32 = s[4..6].parse().map_err(|_| invalid())?;
                let day: u32 = s[6..8].parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, month, day)
                    .map(|date| PeriodType::Daily.period_containing(date))
                    .ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }

    fn from_months(period_type: PeriodType, year: i32, first_month: u32, months: u32) -> Self {
        let (start, end) = month_span(year, first_month, months);
        Self {
            start,
            end,
            period_type,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn period_type(&self) -> PeriodType {
        self.period_type
    }

    /// Number of calendar days, both ends inclusive
    pub fn day_count(&self) -> u32 {
        days_inclusive(self.start, self.end)
    }

    /// Days of this period elapsed as of `as_of`, clamped to `0..=day_count`
    pub fn day_in_period(&self, as_of: NaiveDate) -> u32 {
        if as_of < self.start {
            return 0;
        }
        days_inclusive(self.start, as_of).min(self.day_count())
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Whether this period spans all of `other`
    pub fn covers(&self, other: &Period) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    pub fn next(&self) -> Period {
        let day_after = self.end.succ_opt().unwrap_or(self.end);
        self.period_type.period_containing(day_after)
    }

    pub fn previous(&self) -> Period {
        let day_before = self.start.pred_opt().unwrap_or(self.start);
        self.period_type.period_containing(day_before)
    }

    /// The period `offset` steps away (negative is earlier)
    pub fn shifted(&self, offset: i32) -> Period {
        let mut period = *self;
        for _ in 0..offset.unsigned_abs() {
            period = if offset < 0 {
                period.previous()
            } else {
                period.next()
            };
        }
        period
    }

    /// The ISO identifier of this period
    pub fn iso(&self) -> String {
        let year = self.start.year();
        let month = self.start.month();
        match self.period_type {
            PeriodType::Daily => self.start.format("%Y%m%d").to_string(),
            PeriodType::Weekly => {
                let week = self.start.iso_week();
                format!("{:04}W{}", week.year(), week.week())
            }
            PeriodType::Monthly => format!("{year:04}{month:02}"),
            PeriodType::BiMonthly => format!("{year:04}{:02}B", (month - 1) / 2 + 1),
            PeriodType::Quarterly => format!("{year:04}Q{}", (month - 1) / 3 + 1),
            PeriodType::SixMonthly => format!("{year:04}S{}", (month - 1) / 6 + 1),
            PeriodType::Yearly => format!("{year:04}"),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso())
    }
}

impl std::str::FromStr for Period {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s)
    }
}

impl TryFrom<String> for Period {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::parse(&value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.iso()
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() != 4 || !all_digits(s) {
        return None;
    }
    s.parse().ok()
}

fn days_inclusive(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days() + 1;
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Only years outside chrono's range fall back.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn month_span(year: i32, first_month: u32, months: u32) -> (NaiveDate, NaiveDate) {
    let start = first_of_month(year, first_month);
    let total = year * 12 + (first_month as i32 - 1) + months as i32;
    let next_start = first_of_month(total.div_euclid(12), total.rem_euclid(12) as u32 + 1);
    let end = next_start.pred_opt().unwrap_or(start);
    (start, end)
}

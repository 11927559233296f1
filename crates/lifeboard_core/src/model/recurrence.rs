//! Recurrence pattern model.
//!
//! # Responsibility
//! - Define the raw stored pattern shape (`RecurrenceSpec`) and the validated
//!   tagged form (`RecurrencePattern`).
//! - Define per-date completion records for recurring tasks and habits.
//!
//! # Invariants
//! - Decoding a `RecurrenceSpec` never fails, whatever JSON value it is given.
//!   Unreadable fields are kept in `malformed` and reported by `parse`.
//! - A parsed `RecurrencePattern` always carries the fields its frequency needs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Frequency string for daily patterns.
pub const FREQUENCY_DAILY: &str = "daily";
/// Frequency string for weekly patterns.
pub const FREQUENCY_WEEKLY: &str = "weekly";
/// Frequency string for monthly patterns.
pub const FREQUENCY_MONTHLY: &str = "monthly";
/// Frequency string for custom interval patterns.
pub const FREQUENCY_CUSTOM: &str = "custom";

const STORED_DATE_FORMAT: &str = "%Y-%m-%d";
const STORED_LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// One weekday entry as stored: index (0 = Sunday) or English name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeekdaySpec {
    Index(i64),
    Name(String),
}

impl WeekdaySpec {
    fn to_weekday(&self) -> Option<Weekday> {
        match self {
            Self::Index(index) => match index {
                0 => Some(Weekday::Sun),
                1 => Some(Weekday::Mon),
                2 => Some(Weekday::Tue),
                3 => Some(Weekday::Wed),
                4 => Some(Weekday::Thu),
                5 => Some(Weekday::Fri),
                6 => Some(Weekday::Sat),
                _ => None,
            },
            Self::Name(name) => name.trim().parse::<Weekday>().ok(),
        }
    }
}

impl From<Weekday> for WeekdaySpec {
    fn from(value: Weekday) -> Self {
        Self::Index(i64::from(value.num_days_from_sunday()))
    }
}

/// Stored field that could not be read as its expected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedField {
    /// Wire name of the field.
    pub field: &'static str,
    /// Offending value as JSON text.
    pub value: String,
}

/// Recurrence pattern as the store keeps it.
///
/// Decoding is lenient: numbers may arrive as numeric text, dates as
/// `YYYY-MM-DD` or as a full ISO instant (its UTC calendar day is used).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct RecurrenceSpec {
    pub frequency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<WeekdaySpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<i64>,
    /// Fields dropped while decoding; empty for specs built in code.
    #[serde(skip)]
    pub malformed: Vec<MalformedField>,
}

impl From<Value> for RecurrenceSpec {
    fn from(raw: Value) -> Self {
        let fields = match raw {
            Value::Object(fields) => fields,
            other => {
                return Self {
                    malformed: vec![MalformedField {
                        field: "recurrencePattern",
                        value: other.to_string(),
                    }],
                    ..Self::default()
                }
            }
        };

        let mut reader = FieldReader {
            fields: &fields,
            malformed: Vec::new(),
        };
        Self {
            frequency: reader.text("frequency").unwrap_or_default(),
            days_of_week: reader.weekdays("daysOfWeek"),
            day_of_month: reader.integer("dayOfMonth"),
            interval: reader.integer("interval"),
            unit: reader.text("unit"),
            start_date: reader.date("startDate"),
            end_date: reader.date("endDate"),
            repeat_count: reader.integer("repeatCount"),
            malformed: reader.malformed,
        }
    }
}

/// Reads pattern fields one by one, recording the ones it cannot use.
struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    malformed: Vec<MalformedField>,
}

impl<'a> FieldReader<'a> {
    /// `null` counts as absent.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|value| !value.is_null())
    }

    fn read<T>(&mut self, field: &'static str, convert: fn(&Value) -> Option<T>) -> Option<T> {
        let value = self.present(field)?;
        let converted = convert(value);
        if converted.is_none() {
            self.malformed.push(MalformedField {
                field,
                value: value.to_string(),
            });
        }
        converted
    }

    fn text(&mut self, field: &'static str) -> Option<String> {
        self.read(field, |value| value.as_str().map(str::to_string))
    }

    fn integer(&mut self, field: &'static str) -> Option<i64> {
        self.read(field, lenient_integer)
    }

    fn date(&mut self, field: &'static str) -> Option<NaiveDate> {
        self.read(field, lenient_date)
    }

    fn weekdays(&mut self, field: &'static str) -> Option<Vec<WeekdaySpec>> {
        self.read(field, |value| {
            value
                .as_array()?
                .iter()
                .map(lenient_weekday)
                .collect::<Option<Vec<_>>>()
        })
    }
}

fn lenient_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite() && float.fract() == 0.0)
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, STORED_DATE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|at| at.with_timezone(&Utc).date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, STORED_LOCAL_DATETIME_FORMAT)
                .ok()
                .map(|at| at.date())
        })
}

fn lenient_weekday(value: &Value) -> Option<WeekdaySpec> {
    match value {
        Value::String(text) => Some(match text.trim().parse::<i64>() {
            Ok(index) => WeekdaySpec::Index(index),
            Err(_) => WeekdaySpec::Name(text.clone()),
        }),
        other => lenient_integer(other).map(WeekdaySpec::Index),
    }
}

impl RecurrenceSpec {
    /// Creates a spec for `frequency` with no optional fields.
    pub fn new(frequency: impl Into<String>) -> Self {
        Self {
            frequency: frequency.into(),
            ..Self::default()
        }
    }

    /// Daily spec.
    pub fn daily() -> Self {
        Self::new(FREQUENCY_DAILY)
    }

    /// Weekly spec on the given weekdays.
    pub fn weekly(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            days_of_week: Some(days.into_iter().map(WeekdaySpec::from).collect()),
            ..Self::new(FREQUENCY_WEEKLY)
        }
    }

    /// Monthly spec anchored on an explicit day of month.
    pub fn monthly_on(day_of_month: u32) -> Self {
        Self {
            day_of_month: Some(i64::from(day_of_month)),
            ..Self::new(FREQUENCY_MONTHLY)
        }
    }

    /// Custom spec repeating every `interval` `unit`s from `start_date`.
    pub fn every(interval: u32, unit: RecurrenceUnit, start_date: NaiveDate) -> Self {
        Self {
            interval: Some(i64::from(interval)),
            unit: Some(unit.as_str().to_string()),
            start_date: Some(start_date),
            ..Self::new(FREQUENCY_CUSTOM)
        }
    }

    /// Validates the raw spec into its tagged form.
    ///
    /// # Errors
    /// - `MalformedField` when decoding had to drop a field.
    /// - `UnknownFrequency` when `frequency` is not one of the four supported values.
    /// - Field-level variants when the frequency's required fields are missing or invalid.
    pub fn parse(&self) -> Result<RecurrencePattern, PatternError> {
        if let Some(malformed) = self.malformed.first() {
            return Err(PatternError::MalformedField {
                field: malformed.field,
                value: malformed.value.clone(),
            });
        }
        let rule = match self.frequency.trim().to_ascii_lowercase().as_str() {
            FREQUENCY_DAILY => RecurrenceRule::Daily,
            FREQUENCY_WEEKLY => {
                let raw = self
                    .days_of_week
                    .as_deref()
                    .filter(|days| !days.is_empty())
                    .ok_or(PatternError::MissingDaysOfWeek)?;
                let mut days = BTreeSet::new();
                for entry in raw {
                    let day = entry
                        .to_weekday()
                        .ok_or_else(|| PatternError::InvalidWeekday(format!("{entry:?}")))?;
                    days.insert(day.num_days_from_monday());
                }
                RecurrenceRule::Weekly { days }
            }
            FREQUENCY_MONTHLY => {
                let day_of_month = match self.day_of_month {
                    Some(day) if (1..=31).contains(&day) => Some(day as u32),
                    Some(day) => return Err(PatternError::InvalidDayOfMonth(day)),
                    None => None,
                };
                RecurrenceRule::Monthly { day_of_month }
            }
            FREQUENCY_CUSTOM => {
                let interval = match self.interval {
                    Some(value) if value >= 1 && value <= i64::from(u32::MAX) => value as u32,
                    Some(value) => return Err(PatternError::InvalidInterval(value)),
                    None => return Err(PatternError::MissingInterval),
                };
                let unit = self
                    .unit
                    .as_deref()
                    .ok_or(PatternError::MissingUnit)
                    .and_then(RecurrenceUnit::parse)?;
                RecurrenceRule::Custom { interval, unit }
            }
            other => return Err(PatternError::UnknownFrequency(other.to_string())),
        };

        let repeat_count = match self.repeat_count {
            Some(count) if count >= 1 && count <= i64::from(u32::MAX) => Some(count as u32),
            Some(count) => return Err(PatternError::InvalidRepeatCount(count)),
            None => None,
        };

        Ok(RecurrencePattern {
            rule,
            start_date: self.start_date,
            end_date: self.end_date,
            repeat_count,
        })
    }
}

/// Unit of a custom recurrence interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceUnit {
    Day,
    Week,
    Month,
    Year,
}

impl RecurrenceUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Parses singular or plural unit names, case-insensitive.
    pub fn parse(value: &str) -> Result<Self, PatternError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(Self::Day),
            "week" | "weeks" => Ok(Self::Week),
            "month" | "months" => Ok(Self::Month),
            "year" | "years" => Ok(Self::Year),
            other => Err(PatternError::InvalidUnit(other.to_string())),
        }
    }
}

/// Frequency-specific part of a validated pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    Daily,
    /// Weekdays stored as `num_days_from_monday` values.
    Weekly { days: BTreeSet<u32> },
    /// `None` anchors on the schedule epoch's day.
    Monthly { day_of_month: Option<u32> },
    Custom { interval: u32, unit: RecurrenceUnit },
}

impl RecurrenceRule {
    /// Returns whether a weekly rule includes `day`.
    pub fn includes_weekday(&self, day: Weekday) -> bool {
        match self {
            Self::Weekly { days } => days.contains(&day.num_days_from_monday()),
            _ => false,
        }
    }
}

/// Validated recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrencePattern {
    pub rule: RecurrenceRule,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub repeat_count: Option<u32>,
}

/// Structural problems in a stored recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Recurring task has no pattern at all.
    MissingPattern,
    /// Stored field has the wrong JSON type or an unreadable value.
    MalformedField { field: &'static str, value: String },
    UnknownFrequency(String),
    MissingDaysOfWeek,
    InvalidWeekday(String),
    InvalidDayOfMonth(i64),
    MissingInterval,
    InvalidInterval(i64),
    MissingUnit,
    InvalidUnit(String),
    InvalidRepeatCount(i64),
    /// Rule needs an epoch but neither `startDate` nor task creation date exists.
    MissingEpoch(&'static str),
}

impl Display for PatternError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPattern => write!(f, "recurring task has no recurrence pattern"),
            Self::MalformedField { field, value } => {
                write!(f, "recurrence field `{field}` has unreadable value {value}")
            }
            Self::UnknownFrequency(value) => write!(f, "unknown recurrence frequency `{value}`"),
            Self::MissingDaysOfWeek => write!(f, "weekly pattern requires non-empty daysOfWeek"),
            Self::InvalidWeekday(value) => write!(f, "invalid weekday entry {value}"),
            Self::InvalidDayOfMonth(value) => {
                write!(f, "dayOfMonth ({value}) must be within 1..=31")
            }
            Self::MissingInterval => write!(f, "custom pattern requires interval"),
            Self::InvalidInterval(value) => write!(f, "interval ({value}) must be >= 1"),
            Self::MissingUnit => write!(f, "custom pattern requires unit"),
            Self::InvalidUnit(value) => {
                write!(f, "unsupported unit `{value}`; expected day|week|month|year")
            }
            Self::InvalidRepeatCount(value) => write!(f, "repeatCount ({value}) must be >= 1"),
            Self::MissingEpoch(reason) => {
                write!(f, "pattern requires startDate or task creation date: {reason}")
            }
        }
    }
}

impl Error for PatternError {}

/// One per-date completion of a recurring task or habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringCompletion {
    /// Calendar day the occurrence belongs to.
    pub date: NaiveDate,
    /// Instant the user checked it off.
    pub completed_at: DateTime<Utc>,
    /// Self-rated quality, 1..=5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecurringCompletion {
    pub fn new(date: NaiveDate, completed_at: DateTime<Utc>) -> Self {
        Self {
            date,
            completed_at,
            quality: None,
            duration_minutes: None,
            notes: None,
        }
    }
}

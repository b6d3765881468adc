// Copyright 2025 The Karmada Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Human readable descriptions of CronJob schedules.
//!
//! Expressions are validated with the `cron` crate; only the English rendering
//! of the standard five field syntax and the `@` macros lives here.

use std::str::FromStr;

use snafu::{ResultExt, Snafu, ensure};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cron expression is empty"))]
    Empty,

    #[snafu(display("expected 5 fields in cron expression '{}', got {}", expr, count))]
    FieldCount { expr: String, count: usize },

    #[snafu(display("invalid cron expression '{}': {}", expr, source))]
    Schedule {
        expr: String,
        source: ::cron::error::Error,
    },

    #[snafu(display("invalid value '{}' in {} field", value, field))]
    InvalidValue { field: &'static str, value: String },

    #[snafu(display("unknown cron macro '{}'", name))]
    UnknownMacro { name: String },
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Clone, Copy)]
enum FieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "day-of-month",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "day-of-week",
        }
    }

    fn value(self, raw: &str) -> Result<u32, Error> {
        let named = match self {
            FieldKind::Month => MONTHS
                .iter()
                .position(|m| m[..3].eq_ignore_ascii_case(raw))
                .map(|i| i as u32 + 1),
            FieldKind::DayOfWeek => WEEKDAYS
                .iter()
                .position(|d| d[..3].eq_ignore_ascii_case(raw))
                .map(|i| i as u32),
            _ => None,
        };
        match named {
            Some(v) => Ok(v),
            None => raw.parse::<u32>().map_err(|_| Error::InvalidValue {
                field: self.name(),
                value: raw.to_string(),
            }),
        }
    }

    fn label(self, value: u32) -> String {
        let named = match self {
            FieldKind::Month => value.checked_sub(1).and_then(|i| MONTHS.get(i as usize)),
            FieldKind::DayOfWeek => WEEKDAYS.get((value % 7) as usize),
            _ => None,
        };
        named.map_or_else(|| value.to_string(), |n| n.to_string())
    }
}

/// One comma separated element of a cron field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Any,
    Value(u32),
    Range(u32, u32),
    Step { start: Option<(u32, u32)>, every: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field(Vec<Part>);

impl Field {
    fn parse(kind: FieldKind, raw: &str) -> Result<Self, Error> {
        let parts = raw
            .split(',')
            .map(|part| parse_part(kind, part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Field(parts))
    }

    fn is_any(&self) -> bool {
        self.0.iter().all(|p| *p == Part::Any)
    }

    fn single(&self) -> Option<u32> {
        match self.0.as_slice() {
            [Part::Value(v)] => Some(*v),
            _ => None,
        }
    }

    fn step(&self) -> Option<u32> {
        match self.0.as_slice() {
            [Part::Step { start: None, every }] => Some(*every),
            _ => None,
        }
    }

    fn describe(&self, kind: FieldKind) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|part| match part {
                Part::Any => format!("every {}", kind.name()),
                Part::Value(v) => kind.label(*v),
                Part::Range(a, b) => format!("{} through {}", kind.label(*a), kind.label(*b)),
                Part::Step { start: None, every } => format!("every {}", every),
                Part::Step {
                    start: Some((a, b)),
                    every,
                } => format!(
                    "every {} from {} through {}",
                    every,
                    kind.label(*a),
                    kind.label(*b)
                ),
            })
            .collect();
        join_words(&parts)
    }
}

/// Splits an already validated element into its shape.
fn parse_part(kind: FieldKind, raw: &str) -> Result<Part, Error> {
    if let Some((base, every)) = raw.split_once('/') {
        let every = every.parse::<u32>().map_err(|_| Error::InvalidValue {
            field: kind.name(),
            value: raw.to_string(),
        })?;
        let start = match base {
            "*" => None,
            range => match range.split_once('-') {
                Some((a, b)) => Some((kind.value(a)?, kind.value(b)?)),
                None => {
                    let a = kind.value(range)?;
                    Some((a, last_value(kind)))
                }
            },
        };
        return Ok(Part::Step { start, every });
    }

    if raw == "*" || raw == "?" {
        return Ok(Part::Any);
    }

    if let Some((a, b)) = raw.split_once('-') {
        return Ok(Part::Range(kind.value(a)?, kind.value(b)?));
    }

    Ok(Part::Value(kind.value(raw)?))
}

fn last_value(kind: FieldKind) -> u32 {
    match kind {
        FieldKind::Minute => 59,
        FieldKind::Hour => 23,
        FieldKind::DayOfMonth => 31,
        FieldKind::Month => 12,
        FieldKind::DayOfWeek => 6,
    }
}

fn join_words(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [one] => one.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

fn plural(every: u32, unit: &str) -> String {
    if every == 1 {
        format!("every {}", unit)
    } else {
        format!("every {} {}s", every, unit)
    }
}

fn expand_macro(expr: &str) -> Result<&'static str, Error> {
    match expr.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => Ok("0 0 1 1 *"),
        "@monthly" => Ok("0 0 1 * *"),
        "@weekly" => Ok("0 0 * * 0"),
        "@daily" | "@midnight" => Ok("0 0 * * *"),
        "@hourly" => Ok("0 * * * *"),
        _ => UnknownMacroSnafu { name: expr }.fail(),
    }
}

/// Numeric weekdays count from Sunday = 0 in CronJob schedules but from
/// Sunday = 1 in the `cron` crate, so they are handed over by name.
fn weekday_names(field: &str) -> String {
    let name = |raw: &str| match raw.parse::<usize>() {
        Ok(n) if n <= 7 => WEEKDAYS[n % 7][..3].to_string(),
        _ => raw.to_string(),
    };

    field
        .split(',')
        .map(|part| {
            let (base, step) = match part.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (part, None),
            };
            let base = match base.split_once('-') {
                Some((a, b)) => format!("{}-{}", name(a), name(b)),
                None => name(base),
            };
            match step {
                Some(step) => format!("{}/{}", base, step),
                None => base,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn validate(expr: &str, fields: &[&str]) -> Result<(), Error> {
    let zero_step = fields
        .iter()
        .flat_map(|f| f.split(','))
        .any(|part| part.split_once('/').is_some_and(|(_, s)| s == "0"));
    ensure!(
        !zero_step,
        InvalidValueSnafu {
            field: "step",
            value: expr,
        }
    );

    let six_fields = format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        weekday_names(fields[4])
    );
    ::cron::Schedule::from_str(&six_fields).context(ScheduleSnafu { expr })?;
    Ok(())
}

/// Describes a cron schedule in English, e.g. `*/5 * * * *` becomes "Every 5 minutes".
pub fn describe(expr: &str) -> Result<String, Error> {
    // CronJob schedules may carry a timezone prefix which does not change the cadence.
    let expr = expr
        .split_whitespace()
        .filter(|f| !f.starts_with("TZ=") && !f.starts_with("CRON_TZ="))
        .collect::<Vec<_>>()
        .join(" ");
    ensure!(!expr.is_empty(), EmptySnafu);

    let expr = if expr.starts_with('@') {
        expand_macro(&expr)?.to_string()
    } else {
        expr
    };

    let fields: Vec<&str> = expr.split_whitespace().collect();
    ensure!(
        fields.len() == 5,
        FieldCountSnafu {
            expr: expr.as_str(),
            count: fields.len(),
        }
    );
    validate(&expr, &fields)?;

    let minute = Field::parse(FieldKind::Minute, fields[0])?;
    let hour = Field::parse(FieldKind::Hour, fields[1])?;
    let dom = Field::parse(FieldKind::DayOfMonth, fields[2])?;
    let month = Field::parse(FieldKind::Month, fields[3])?;
    let dow = Field::parse(FieldKind::DayOfWeek, fields[4])?;

    let mut description = describe_time(&minute, &hour);

    if !dom.is_any() {
        description.push_str(&format!(
            ", on day {} of the month",
            dom.describe(FieldKind::DayOfMonth)
        ));
    }
    if !dow.is_any() {
        let prefix = if dom.is_any() { "only on" } else { "and on" };
        description.push_str(&format!(", {} {}", prefix, dow.describe(FieldKind::DayOfWeek)));
    }
    if !month.is_any() {
        description.push_str(&format!(", in {}", month.describe(FieldKind::Month)));
    }

    Ok(description)
}

fn describe_time(minute: &Field, hour: &Field) -> String {
    if let (Some(m), Some(h)) = (minute.single(), hour.single()) {
        return format!("At {:02}:{:02}", h, m);
    }

    let cadence = if minute.is_any() {
        Some("Every minute".to_string())
    } else {
        minute.step().map(|every| capitalize(&plural(every, "minute")))
    };

    match cadence {
        Some(cadence) if hour.is_any() => cadence,
        Some(cadence) => format!("{}, {}", cadence, hour_window(hour)),
        None if hour.is_any() => match minute.single() {
            Some(m) => format!("At minute {} past every hour", m),
            None => format!("At minute {}", minute.describe(FieldKind::Minute)),
        },
        None => match hour.step() {
            Some(every) => format!(
                "At minute {} past {}",
                minute.describe(FieldKind::Minute),
                plural(every, "hour")
            ),
            None => format!(
                "At minute {} past hour {}",
                minute.describe(FieldKind::Minute),
                hour.describe(FieldKind::Hour)
            ),
        },
    }
}

/// The hours during which a sub-hourly cadence runs.
fn hour_window(hour: &Field) -> String {
    if let Some(h) = hour.single() {
        return format!("between {:02}:00 and {:02}:59", h, h);
    }
    match hour.step() {
        Some(every) => format!("during {}", plural(every, "hour")),
        None => format!("during hour {}", hour.describe(FieldKind::Hour)),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_cadences() {
        assert_eq!(describe("* * * * *").unwrap(), "Every minute");
        assert_eq!(describe("*/5 * * * *").unwrap(), "Every 5 minutes");
        assert_eq!(describe("*/1 * * * *").unwrap(), "Every minute");
        assert_eq!(describe("15 * * * *").unwrap(), "At minute 15 past every hour");
        assert_eq!(describe("30 2 * * *").unwrap(), "At 02:30");
        assert_eq!(describe("0 */2 * * *").unwrap(), "At minute 0 past every 2 hours");
    }

    #[test]
    fn test_sub_hourly_cadence_within_hours() {
        assert_eq!(
            describe("*/5 9 * * *").unwrap(),
            "Every 5 minutes, between 09:00 and 09:59"
        );
        assert_eq!(
            describe("* 9 * * *").unwrap(),
            "Every minute, between 09:00 and 09:59"
        );
        assert_eq!(
            describe("*/15 8-18 * * 1-5").unwrap(),
            "Every 15 minutes, during hour 8 through 18, only on Monday through Friday"
        );
        assert_eq!(
            describe("* */3 * * *").unwrap(),
            "Every minute, during every 3 hours"
        );
    }

    #[test]
    fn test_days_and_months() {
        assert_eq!(
            describe("0 9 * * 1-5").unwrap(),
            "At 09:00, only on Monday through Friday"
        );
        assert_eq!(
            describe("0 0 1,15 * *").unwrap(),
            "At 00:00, on day 1 and 15 of the month"
        );
        assert_eq!(
            describe("0 12 * jan,jul sun").unwrap(),
            "At 12:00, only on Sunday, in January and July"
        );
        assert_eq!(describe("0 0 * * 7").unwrap(), "At 00:00, only on Sunday");
        assert_eq!(describe("0 0 * * 0").unwrap(), "At 00:00, only on Sunday");
    }

    #[test]
    fn test_macros() {
        assert_eq!(describe("@hourly").unwrap(), "At minute 0 past every hour");
        assert_eq!(describe("@daily").unwrap(), "At 00:00");
        assert_eq!(describe("@weekly").unwrap(), "At 00:00, only on Sunday");
        assert_eq!(
            describe("@yearly").unwrap(),
            "At 00:00, on day 1 of the month, in January"
        );
    }

    #[test]
    fn test_timezone_prefix_is_ignored() {
        assert_eq!(describe("CRON_TZ=UTC 0 6 * * *").unwrap(), "At 06:00");
        assert_eq!(describe("CRON_TZ=UTC @daily").unwrap(), "At 00:00");
        assert_eq!(describe("TZ=Asia/Shanghai @hourly").unwrap(), "At minute 0 past every hour");
    }

    #[test]
    fn test_lists_and_ranges_of_minutes() {
        assert_eq!(
            describe("0,30 8-18 * * *").unwrap(),
            "At minute 0 and 30 past hour 8 through 18"
        );
        assert_eq!(describe("10-20 * * * *").unwrap(), "At minute 10 through 20");
    }

    #[test]
    fn test_weekday_names() {
        assert_eq!(weekday_names("0,3-5"), "Sun,Wed-Fri");
        assert_eq!(weekday_names("*/2"), "*/2");
        assert_eq!(weekday_names("1/2"), "Mon/2");
        assert_eq!(weekday_names("SAT"), "SAT");
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(matches!(describe("  "), Err(Error::Empty)));
        assert!(matches!(describe("CRON_TZ=UTC"), Err(Error::Empty)));
        assert!(matches!(
            describe("* * * *"),
            Err(Error::FieldCount { count: 4, .. })
        ));
        assert!(matches!(describe("61 * * * *"), Err(Error::Schedule { .. })));
        assert!(matches!(describe("0 25 * * *"), Err(Error::Schedule { .. })));
        assert!(matches!(describe("0 0 * foo *"), Err(Error::Schedule { .. })));
        assert!(matches!(
            describe("*/0 * * * *"),
            Err(Error::InvalidValue { field: "step", .. })
        ));
        assert!(matches!(describe("@reboot"), Err(Error::UnknownMacro { .. })));
    }
}

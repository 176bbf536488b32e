//! Standard 5-field cron expression parsing and evaluation.
//!
//! Fields are `minute hour day-of-month month day-of-week`, each supporting
//! `*`, step (`*/n`), lists (`a,b,c`) and ranges (`a-b`), combined freely
//! (`1-5/2`, `1,3,5-7`). Day-of-month and day-of-week are ORed together when
//! both are restricted, matching standard cron semantics. Evaluation is
//! UTC-only; no seconds, no years, no `@hourly`-style shorthands.

mod field;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use field::Field;
use std::fmt;

/// A fully parsed 5-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
    // true when both day-of-month and day-of-week are restricted (not `*`),
    // in which case cron semantics OR the two instead of ANDing them.
    dom_and_dow_restricted: bool,
}

/// Failure to parse a cron expression.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// The expression did not split into exactly 5 whitespace-separated fields.
    #[error("expected 5 whitespace-separated fields, found {found}")]
    WrongFieldCount {
        /// The number of fields actually found.
        found: usize,
    },
    /// One field's value did not parse under cron field syntax.
    #[error("invalid {field} field {value:?}: {reason}")]
    InvalidField {
        /// Name of the offending field, e.g. `"minute"`.
        field: &'static str,
        /// The raw, unparsed field text.
        value: String,
        /// Human-readable description of why it failed to parse.
        reason: String,
    },
    /// Every field parsed, but no calendar date can ever satisfy the
    /// day-of-month/month combination (e.g. `30 2` — February never has a
    /// 30th), so the schedule would never fire.
    #[error("schedule can never fire: {reason}")]
    Unsatisfiable {
        /// Human-readable description of why no date can match.
        reason: String,
    },
}

impl Schedule {
    /// Parses a standard 5-field cron expression.
    pub fn parse(expr: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(ParseError::WrongFieldCount { found: parts.len() });
        }
        let minute = Field::parse("minute", parts[0], 0, 59)?;
        let hour = Field::parse("hour", parts[1], 0, 23)?;
        let day_of_month = Field::parse("day-of-month", parts[2], 1, 31)?;
        let month = Field::parse("month", parts[3], 1, 12)?;
        let mut day_of_week = Field::parse("day-of-week", parts[4], 0, 7)?;
        day_of_week.fold_sunday_alias();

        let dom_and_dow_restricted = !day_of_month.is_wildcard() && !day_of_week.is_wildcard();

        // When day-of-week is wildcard (or both fields are restricted and
        // thus ORed, in which case day-of-week alone already recurs every
        // week), a restricted day-of-month must actually occur in some
        // allowed month, or the schedule can never fire — e.g. `30 2` pins
        // the day to February's 30th, which never exists.
        if !day_of_month.is_wildcard() && day_of_week.is_wildcard() {
            let satisfiable = (1..=12).any(|m| month.contains(m) && (1..=days_in_month_max(m)).any(|d| day_of_month.contains(d)));
            if !satisfiable {
                return Err(ParseError::Unsatisfiable {
                    reason: format!("day-of-month {day_of_month} never occurs in any allowed month {month}"),
                });
            }
        }

        Ok(Schedule {
            minute,
            hour,
            day_of_month,
            month,
            day_of_week,
            dom_and_dow_restricted,
        })
    }

    fn matches(&self, dt: &DateTime<Utc>) -> bool {
        if !self.minute.contains(dt.minute())
            || !self.hour.contains(dt.hour())
            || !self.month.contains(dt.month())
        {
            return false;
        }
        // chrono weekday: Mon=0..Sun=6; cron weekday: Sun=0..Sat=6 (7 also means Sun).
        let dow = (dt.weekday().num_days_from_sunday()) % 7;
        let dom_match = self.day_of_month.contains(dt.day());
        let dow_match = self.day_of_week.contains(dow);

        if self.dom_and_dow_restricted {
            dom_match || dow_match
        } else {
            dom_match && dow_match
        }
    }

    /// The smallest trigger instant strictly greater than `after`, truncated
    /// to minute granularity (cron has no sub-minute resolution).
    ///
    /// `Schedule::parse` rejects day-of-month/month combinations that can
    /// never occur (§ `ParseError::Unsatisfiable`), so every `Schedule` that
    /// exists is guaranteed to repeat within a four-year leap cycle. This
    /// bounds the search to that cycle regardless, so a gap in that
    /// validation fails loudly instead of hanging the reconcile worker.
    pub fn next(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let mut candidate = truncate_to_minute(after) + Duration::minutes(1);
        let deadline = candidate + Duration::days(4 * 366);
        loop {
            if self.matches(&candidate) {
                return candidate;
            }
            candidate += Duration::minutes(1);
            if candidate > deadline {
                unreachable!(
                    "schedule {self} matched no minute within 4 years of {after}; \
                     this should have been rejected by Schedule::parse"
                );
            }
        }
    }

    /// Every trigger instant `t` with `from < t <= to`, in ascending order.
    ///
    /// Returns an empty vector if `to <= from`.
    pub fn triggers(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        if to <= from {
            return out;
        }
        let mut t = self.next(from);
        while t <= to {
            out.push(t);
            t = self.next(t);
        }
        out
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}

/// The most days a given month can ever have (29 for February, since leap
/// years recur inside any multi-year search window).
fn days_in_month_max(month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => 29,
        _ => 0,
    }
}

fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(dt.year(), dt.month(), dt.day()).expect("valid calendar date from DateTime");
    date.and_hms_opt(dt.hour(), dt.minute(), 0)
        .expect("valid time from DateTime")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn every_minute() {
        let s = Schedule::parse("* * * * *").unwrap();
        let after = dt(2024, 1, 1, 0, 0);
        assert_eq!(s.next(after), dt(2024, 1, 1, 0, 1));
    }

    #[test]
    fn step_minutes() {
        let s = Schedule::parse("*/15 * * * *").unwrap();
        let after = dt(2024, 1, 1, 0, 1);
        assert_eq!(s.next(after), dt(2024, 1, 1, 0, 15));
    }

    #[test]
    fn list_hours() {
        let s = Schedule::parse("0 3,9,15 * * *").unwrap();
        let after = dt(2024, 1, 1, 4, 0);
        assert_eq!(s.next(after), dt(2024, 1, 1, 9, 0));
    }

    #[test]
    fn range_and_step_combined() {
        let s = Schedule::parse("0 9-17/4 * * *").unwrap();
        // matches 9 and 13 and 17
        let after = dt(2024, 1, 1, 9, 30);
        assert_eq!(s.next(after), dt(2024, 1, 1, 13, 0));
    }

    #[test]
    fn dom_dow_are_ored_when_both_restricted() {
        // 1st of month OR Friday, at midnight.
        let s = Schedule::parse("0 0 1 * 5").unwrap();
        // 2024-01-01 is a Monday (matches dom); 2024-01-05 is a Friday (matches dow).
        let triggers = s.triggers(dt(2024, 1, 1, 0, 0), dt(2024, 1, 6, 0, 0));
        assert_eq!(triggers, vec![dt(2024, 1, 5, 0, 0), dt(2024, 1, 6, 0, 0)]);
    }

    #[test]
    fn triggers_open_interval() {
        let s = Schedule::parse("* * * * *").unwrap();
        let from = dt(2024, 1, 1, 0, 0);
        let to = dt(2024, 1, 1, 0, 3);
        let got = s.triggers(from, to);
        assert_eq!(got, vec![
            dt(2024, 1, 1, 0, 1),
            dt(2024, 1, 1, 0, 2),
            dt(2024, 1, 1, 0, 3),
        ]);
    }

    #[test]
    fn triggers_empty_window() {
        let s = Schedule::parse("* * * * *").unwrap();
        let t = dt(2024, 1, 1, 0, 0);
        assert!(s.triggers(t, t).is_empty());
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            Schedule::parse("* * * *"),
            Err(ParseError::WrongFieldCount { found: 4 })
        );
    }

    #[test]
    fn rejects_out_of_range_value() {
        assert!(Schedule::parse("60 * * * *").is_err());
        assert!(Schedule::parse("* 24 * * *").is_err());
        assert!(Schedule::parse("* * 32 * *").is_err());
        assert!(Schedule::parse("* * * 13 *").is_err());
        assert!(Schedule::parse("* * * * 8").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Schedule::parse("*/0 * * * *").is_err());
        assert!(Schedule::parse("a-b * * * *").is_err());
    }

    #[test]
    fn rejects_unsatisfiable_day_of_month_for_february() {
        assert_eq!(
            Schedule::parse("0 0 30 2 *"),
            Err(ParseError::Unsatisfiable {
                reason: "day-of-month 30 never occurs in any allowed month 2".to_string(),
            })
        );
        assert!(Schedule::parse("0 0 31 2 *").is_err());
    }

    #[test]
    fn rejects_unsatisfiable_day_of_month_across_30_day_months() {
        // April, June, September and November all top out at 30 days.
        assert!(Schedule::parse("0 0 31 4,6,9,11 *").is_err());
    }

    #[test]
    fn accepts_day_of_month_ored_with_day_of_week() {
        // 30th of February is still unsatisfiable on its own, but ORed with
        // a weekday it recurs every week via that weekday, so this is fine.
        assert!(Schedule::parse("0 0 30 2 5").is_ok());
    }

    #[test]
    fn accepts_leap_day_in_february() {
        assert!(Schedule::parse("0 0 29 2 *").is_ok());
    }
}

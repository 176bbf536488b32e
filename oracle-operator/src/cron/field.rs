//! A single cron field: a bitset over its valid range, built from
//! comma-separated combinations of `*`, `*/n`, `a`, `a-b`, and `a-b/n`.

use super::ParseError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Field {
    // bit i set means value (min + i) is allowed; sized to the field's range.
    allowed: Vec<bool>,
    min: u32,
    wildcard: bool,
}

impl Field {
    pub(super) fn parse(name: &'static str, raw: &str, min: u32, max: u32) -> Result<Self, ParseError> {
        let mut allowed = vec![false; (max - min + 1) as usize];
        let mut wildcard = false;

        for part in raw.split(',') {
            if part.is_empty() {
                return Err(invalid(name, raw, "empty list entry"));
            }
            let (range_part, step) = match part.split_once('/') {
                Some((r, s)) => {
                    let step: u32 = s
                        .parse()
                        .map_err(|_| invalid(name, raw, format!("invalid step {s:?}")))?;
                    if step == 0 {
                        return Err(invalid(name, raw, "step cannot be zero"));
                    }
                    (r, step)
                }
                None => (part, 1),
            };

            let (lo, hi) = if range_part == "*" {
                wildcard = wildcard || step == 1;
                (min, max)
            } else if let Some((a, b)) = range_part.split_once('-') {
                let lo: u32 = a
                    .parse()
                    .map_err(|_| invalid(name, raw, format!("invalid range start {a:?}")))?;
                let hi: u32 = b
                    .parse()
                    .map_err(|_| invalid(name, raw, format!("invalid range end {b:?}")))?;
                if lo > hi {
                    return Err(invalid(name, raw, format!("range start {lo} > end {hi}")));
                }
                (lo, hi)
            } else {
                let v: u32 = range_part
                    .parse()
                    .map_err(|_| invalid(name, raw, format!("invalid value {range_part:?}")))?;
                (v, v)
            };

            if lo < min || hi > max {
                return Err(invalid(
                    name,
                    raw,
                    format!("value out of range {min}..={max}"),
                ));
            }

            let mut v = lo;
            while v <= hi {
                allowed[(v - min) as usize] = true;
                v += step;
            }
        }

        Ok(Field {
            allowed,
            min,
            wildcard: wildcard && raw == "*",
        })
    }

    pub(super) fn contains(&self, value: u32) -> bool {
        value
            .checked_sub(self.min)
            .and_then(|idx| self.allowed.get(idx as usize).copied())
            .unwrap_or(false)
    }

    pub(super) fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Day-of-week accepts both `0` and `7` for Sunday; fold the `7` bit
    /// (index 7, since `min` is 0) into the `0` bit so lookups with either
    /// representation agree.
    pub(super) fn fold_sunday_alias(&mut self) {
        if let Some(&sunday_seven) = self.allowed.get(7) {
            if sunday_seven {
                self.allowed[0] = true;
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            return write!(f, "*");
        }
        let values: Vec<String> = self
            .allowed
            .iter()
            .enumerate()
            .filter(|(_, &set)| set)
            .map(|(i, _)| (i as u32 + self.min).to_string())
            .collect();
        write!(f, "{}", values.join(","))
    }
}

fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidField {
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}

//! Deterministic parsing of free-text genealogical dates.
//!
//! The parser never guesses between day-first and month-first readings: a
//! numeric date whose first two parts are both valid months (and differ) is
//! reported as ambiguous with no normalized value. Rules are tried in a fixed
//! order:
//!
//! 1. numeric `a/b/yyyy` with `a, b <= 12` and `a != b` → ambiguous
//! 2. `BET x AND y` → range, confidence 0.7
//! 3. day, month and year in one of several orderings → day, confidence 0.95
//! 4. month and year → month, confidence 0.85
//! 5. a year anywhere → year, confidence 0.6 if qualified else 0.7
//! 6. anything else → unparseable (and flagged ambiguous)
//!
//! A leading qualifier (`ABT`, `BEF`, `AFT`, …) is extracted first and the
//! remainder is parsed normally; `BET` alone switches to range parsing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{graph::EntityKind, similarity::extract_year};

pub const DAY_CONFIDENCE: f64 = 0.95;
pub const MONTH_CONFIDENCE: f64 = 0.85;
pub const RANGE_CONFIDENCE: f64 = 0.7;
pub const YEAR_CONFIDENCE: f64 = 0.7;
pub const QUALIFIED_YEAR_CONFIDENCE: f64 = 0.6;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Granularity of a parsed date.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Precision {
  Day,
  Month,
  Year,
  Range,
}

/// A modifier that changes how a date is read without changing its
/// precision. Stored as the GEDCOM token.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
pub enum Qualifier {
  #[serde(rename = "abt")]
  #[strum(serialize = "abt")]
  About,
  #[serde(rename = "bef")]
  #[strum(serialize = "bef")]
  Before,
  #[serde(rename = "aft")]
  #[strum(serialize = "aft")]
  After,
  #[serde(rename = "bet")]
  #[strum(serialize = "bet")]
  Between,
}

impl Qualifier {
  /// Recognise a leading qualifier token (already upper-cased).
  pub fn from_token(token: &str) -> Option<Self> {
    match token.trim_end_matches('.') {
      "ABT" | "ABOUT" | "CIRCA" | "CA" | "C" | "EST" | "ESTIMATED" | "CAL"
      | "CALC" | "CALCULATED" => Some(Self::About),
      "BEF" | "BEFORE" => Some(Self::Before),
      "AFT" | "AFTER" => Some(Self::After),
      "BET" | "BETWEEN" => Some(Self::Between),
      _ => None,
    }
  }
}

/// Outcome of [`parse_date`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDate {
  /// `YYYY-MM-DD`, `YYYY-MM`, `YYYY` or `YYYY/YYYY`; `None` when the input
  /// could not be read unambiguously.
  pub normalized:   Option<String>,
  pub precision:    Option<Precision>,
  pub qualifier:    Option<Qualifier>,
  pub confidence:   f64,
  pub is_ambiguous: bool,
}

impl ParsedDate {
  fn unparseable(qualifier: Option<Qualifier>) -> Self {
    Self {
      normalized: None,
      precision: None,
      qualifier,
      confidence: 0.0,
      is_ambiguous: true,
    }
  }

  fn day(date: NaiveDate, qualifier: Option<Qualifier>) -> Self {
    Self {
      normalized: Some(date.format("%Y-%m-%d").to_string()),
      precision: Some(Precision::Day),
      qualifier,
      confidence: DAY_CONFIDENCE,
      is_ambiguous: false,
    }
  }

  fn month(year: i32, month: u32, qualifier: Option<Qualifier>) -> Self {
    Self {
      normalized: Some(format!("{year:04}-{month:02}")),
      precision: Some(Precision::Month),
      qualifier,
      confidence: MONTH_CONFIDENCE,
      is_ambiguous: false,
    }
  }

  fn year(year: i32, qualifier: Option<Qualifier>) -> Self {
    Self {
      normalized: Some(format!("{year:04}")),
      precision: Some(Precision::Year),
      qualifier,
      confidence: if qualifier.is_some() {
        QUALIFIED_YEAR_CONFIDENCE
      } else {
        YEAR_CONFIDENCE
      },
      is_ambiguous: false,
    }
  }

  /// `true` when the raw text already equals its normalized form.
  pub fn is_canonical(&self, raw: &str) -> bool {
    !self.is_ambiguous && self.normalized.as_deref() == Some(raw.trim())
  }
}

/// Which raw date column a value was read from.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DateField {
  BirthDate,
  DeathDate,
  /// `Event.date_raw`.
  Date,
  MarriageDate,
}

impl DateField {
  pub fn belongs_to(self, kind: EntityKind) -> bool {
    matches!(
      (kind, self),
      (EntityKind::Person, Self::BirthDate | Self::DeathDate)
        | (EntityKind::Event, Self::Date)
        | (EntityKind::Family, Self::MarriageDate)
    )
  }
}

/// A persisted parse result, unique per `(entity_type, entity_id, raw_value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateNormalization {
  pub entity_type:  EntityKind,
  pub entity_id:    Uuid,
  pub raw_value:    String,
  pub normalized:   Option<String>,
  pub precision:    Option<Precision>,
  pub qualifier:    Option<Qualifier>,
  pub confidence:   f64,
  pub is_ambiguous: bool,
}

impl DateNormalization {
  pub fn from_parsed(
    entity_type: EntityKind,
    entity_id: Uuid,
    raw_value: &str,
    parsed: &ParsedDate,
  ) -> Self {
    Self {
      entity_type,
      entity_id,
      raw_value: raw_value.to_owned(),
      normalized: parsed.normalized.clone(),
      precision: parsed.precision,
      qualifier: parsed.qualifier,
      confidence: parsed.confidence,
      is_ambiguous: parsed.is_ambiguous,
    }
  }
}

// ─── Parser ──────────────────────────────────────────────────────────────────

const MONTHS: [&str; 12] = [
  "JANUARY",
  "FEBRUARY",
  "MARCH",
  "APRIL",
  "MAY",
  "JUNE",
  "JULY",
  "AUGUST",
  "SEPTEMBER",
  "OCTOBER",
  "NOVEMBER",
  "DECEMBER",
];

/// Parse a raw date string. Never fails; unreadable input is reported as
/// unparseable with zero confidence.
pub fn parse_date(raw: &str) -> ParsedDate {
  let upper = raw.trim().to_uppercase();
  let tokens: Vec<&str> = upper.split_whitespace().collect();

  let (qualifier, rest) = match tokens.split_first() {
    Some((first, rest)) => match Qualifier::from_token(first) {
      Some(q) => (Some(q), rest),
      None => (None, tokens.as_slice()),
    },
    None => return ParsedDate::unparseable(None),
  };

  if qualifier == Some(Qualifier::Between) {
    return parse_range(rest);
  }

  let body = rest.join(" ");
  if body.is_empty() {
    return ParsedDate::unparseable(qualifier);
  }

  if let Some(parsed) = parse_numeric(&body, qualifier) {
    return parsed;
  }
  if let Some(parsed) = parse_textual(&body, qualifier) {
    return parsed;
  }
  match extract_year(Some(&body)) {
    Some(year) => ParsedDate::year(year, qualifier),
    None => ParsedDate::unparseable(qualifier),
  }
}

/// `BET x AND y` with the leading `BET` already consumed.
fn parse_range(rest: &[&str]) -> ParsedDate {
  let split = rest.iter().position(|t| *t == "AND" || *t == "&");
  let years = split.and_then(|at| {
    let start = extract_year(Some(&rest[..at].join(" ")))?;
    let end = extract_year(Some(&rest[at + 1..].join(" ")))?;
    Some((start, end))
  });

  match years {
    Some((start, end)) => ParsedDate {
      normalized:   Some(format!("{start:04}/{end:04}")),
      precision:    Some(Precision::Range),
      qualifier:    Some(Qualifier::Between),
      confidence:   RANGE_CONFIDENCE,
      is_ambiguous: false,
    },
    None => ParsedDate::unparseable(Some(Qualifier::Between)),
  }
}

/// All-digit forms separated by `/`, `-`, `.` or spaces. Returns `None` when
/// the body is not purely numeric so later rules can try it.
fn parse_numeric(body: &str, qualifier: Option<Qualifier>) -> Option<ParsedDate> {
  let parts: Vec<&str> = body
    .split(|c: char| matches!(c, '/' | '-' | '.') || c.is_whitespace())
    .filter(|p| !p.is_empty())
    .collect();
  if parts.len() < 2 || !parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())) {
    return None;
  }

  let num = |s: &str| s.parse::<u32>().ok();
  let lens: Vec<usize> = parts.iter().map(|p| p.len()).collect();

  let parsed = match lens.as_slice() {
    // a/b/yyyy: day-first or month-first.
    [1 | 2, 1 | 2, 4] => {
      let (a, b, year) = (num(parts[0])?, num(parts[1])?, num(parts[2])? as i32);
      let (day, month) = if a <= 12 && b <= 12 && a != b {
        return Some(ParsedDate::unparseable(qualifier));
      } else if a > 12 {
        (a, b)
      } else {
        (b, a)
      };
      NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| ParsedDate::day(d, qualifier))
        .unwrap_or_else(|| ParsedDate::unparseable(qualifier))
    }
    // yyyy-mm-dd
    [4, 1 | 2, 1 | 2] => {
      let (year, month, day) = (num(parts[0])? as i32, num(parts[1])?, num(parts[2])?);
      NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| ParsedDate::day(d, qualifier))
        .unwrap_or_else(|| ParsedDate::unparseable(qualifier))
    }
    // mm/yyyy
    [1 | 2, 4] => month_year(num(parts[1])? as i32, num(parts[0])?, qualifier),
    // yyyy-mm
    [4, 1 | 2] => month_year(num(parts[0])? as i32, num(parts[1])?, qualifier),
    _ => return None,
  };
  Some(parsed)
}

fn month_year(year: i32, month: u32, qualifier: Option<Qualifier>) -> ParsedDate {
  if (1..=12).contains(&month) {
    ParsedDate::month(year, month, qualifier)
  } else {
    ParsedDate::unparseable(qualifier)
  }
}

/// Forms with a month name: `1 JAN 1900`, `JAN 1 1900`, `January 1, 1900`,
/// `1900 JAN 1`, `01-JAN-1900`, `JAN 1900`.
fn parse_textual(body: &str, qualifier: Option<Qualifier>) -> Option<ParsedDate> {
  let tokens: Vec<&str> = body
    .split(|c: char| matches!(c, ',' | '-' | '/') || c.is_whitespace())
    .filter(|t| !t.is_empty())
    .collect();

  let day = |t: &str| {
    let digits = t.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    (1..=2).contains(&digits.len()).then(|| digits.parse::<u32>().ok()).flatten()
  };
  let year = |t: &str| {
    (t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))
      .then(|| t.parse::<i32>().ok())
      .flatten()
  };

  let (y, m, d) = match tokens.as_slice() {
    [a, b, c] => {
      if let (Some(d), Some(m), Some(y)) = (day(a), month_number(b), year(c)) {
        (y, m, Some(d))
      } else if let (Some(m), Some(d), Some(y)) = (month_number(a), day(b), year(c)) {
        (y, m, Some(d))
      } else if let (Some(y), Some(m), Some(d)) = (year(a), month_number(b), day(c)) {
        (y, m, Some(d))
      } else {
        return None;
      }
    }
    [a, b] => {
      if let (Some(m), Some(y)) = (month_number(a), year(b)) {
        (y, m, None)
      } else {
        return None;
      }
    }
    _ => return None,
  };

  Some(match d {
    Some(d) => NaiveDate::from_ymd_opt(y, m, d)
      .map(|date| ParsedDate::day(date, qualifier))
      .unwrap_or_else(|| ParsedDate::unparseable(qualifier)),
    None => ParsedDate::month(y, m, qualifier),
  })
}

/// Month number for a name or an abbreviation of at least three letters.
fn month_number(token: &str) -> Option<u32> {
  let token = token.trim_end_matches('.');
  if token.len() < 3 || !token.bytes().all(|b| b.is_ascii_alphabetic()) {
    return None;
  }
  MONTHS
    .iter()
    .position(|name| name.starts_with(token))
    .map(|i| i as u32 + 1)
}

/// The first calendar day covered by a normalized value (`YYYY`, `YYYY-MM`
/// or `YYYY-MM-DD`). Ranges and malformed values yield `None`.
pub fn canonical_date(normalized: &str) -> Option<NaiveDate> {
  let parts: Vec<&str> = normalized.trim().split('-').collect();
  let field = |i: usize| parts.get(i).map(|p| p.parse::<u32>().ok());

  let year: i32 = parts.first()?.parse().ok()?;
  if parts[0].len() != 4 {
    return None;
  }
  let month = match field(1) {
    Some(m) => m?,
    None => 1,
  };
  let day = match field(2) {
    Some(d) => d?,
    None => 1,
  };
  if parts.len() > 3 {
    return None;
  }
  NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn check(raw: &str) -> (Option<String>, Option<Precision>, Option<Qualifier>) {
    let p = parse_date(raw);
    (p.normalized, p.precision, p.qualifier)
  }

  #[test]
  fn day_month_year() {
    assert_eq!(
      check("1 JAN 1900"),
      (Some("1900-01-01".into()), Some(Precision::Day), None)
    );
    assert_eq!(parse_date("1 JAN 1900").confidence, DAY_CONFIDENCE);
    assert_eq!(check("January 5, 1900").0.as_deref(), Some("1900-01-05"));
    assert_eq!(check("1900 MAR 3").0.as_deref(), Some("1900-03-03"));
    assert_eq!(check("01-Sep-1881").0.as_deref(), Some("1881-09-01"));
    assert_eq!(check("1881-03-04").0.as_deref(), Some("1881-03-04"));
  }

  #[test]
  fn month_year() {
    assert_eq!(check("JAN 1900"), (Some("1900-01".into()), Some(Precision::Month), None));
    assert_eq!(check("03/1881").0.as_deref(), Some("1881-03"));
    assert_eq!(parse_date("Mar 1881").confidence, MONTH_CONFIDENCE);
  }

  #[test]
  fn year_only() {
    let bare = parse_date("1900");
    assert_eq!(bare.normalized.as_deref(), Some("1900"));
    assert_eq!(bare.precision, Some(Precision::Year));
    assert_eq!(bare.confidence, YEAR_CONFIDENCE);
  }

  #[test]
  fn qualifier_does_not_block_parsing() {
    let p = parse_date("ABT 1900");
    assert_eq!(p.normalized.as_deref(), Some("1900"));
    assert_eq!(p.qualifier, Some(Qualifier::About));
    assert_eq!(p.qualifier.map(|q| q.to_string()).as_deref(), Some("abt"));
    assert_eq!(p.confidence, QUALIFIED_YEAR_CONFIDENCE);

    let p = parse_date("bef. 12 mar 1850");
    assert_eq!(p.normalized.as_deref(), Some("1850-03-12"));
    assert_eq!(p.qualifier, Some(Qualifier::Before));
  }

  #[test]
  fn between_is_a_range() {
    let p = parse_date("BET 1900 AND 1905");
    assert_eq!(p.normalized.as_deref(), Some("1900/1905"));
    assert_eq!(p.precision, Some(Precision::Range));
    assert_eq!(p.qualifier, Some(Qualifier::Between));
    assert_eq!(p.confidence, RANGE_CONFIDENCE);

    let broken = parse_date("BET 1900");
    assert!(broken.is_ambiguous);
    assert!(broken.normalized.is_none());
  }

  #[test]
  fn numeric_day_first_when_unambiguous() {
    let p = parse_date("13/02/1900");
    assert_eq!(p.normalized.as_deref(), Some("1900-02-13"));
    assert!(!p.is_ambiguous);

    let p = parse_date("02/13/1900");
    assert_eq!(p.normalized.as_deref(), Some("1900-02-13"));

    let same = parse_date("05/05/1900");
    assert_eq!(same.normalized.as_deref(), Some("1900-05-05"));
  }

  #[test]
  fn numeric_ambiguous_yields_no_value() {
    let p = parse_date("02/03/1900");
    assert!(p.is_ambiguous);
    assert!(p.normalized.is_none());
    assert_eq!(p.confidence, 0.0);
  }

  #[test]
  fn garbage_is_unparseable() {
    let p = parse_date("sometime in spring");
    assert!(p.normalized.is_none());
    assert!(p.is_ambiguous);
    assert!(parse_date("   ").normalized.is_none());
    assert!(parse_date("31/02/1900").normalized.is_none());
  }

  #[test]
  fn canonical_dates_tolerate_granularity() {
    assert_eq!(canonical_date("1900"), NaiveDate::from_ymd_opt(1900, 1, 1));
    assert_eq!(canonical_date("1900-03"), NaiveDate::from_ymd_opt(1900, 3, 1));
    assert_eq!(canonical_date("1900-03-04"), NaiveDate::from_ymd_opt(1900, 3, 4));
    assert_eq!(canonical_date("1900/1905"), None);
    assert_eq!(canonical_date("1900-13"), None);
  }
}

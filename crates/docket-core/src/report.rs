//! The two aggregate reports.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::{Error, Result, model::Person, store::RecordStore};

/// Calendar format accepted by the report forms.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A whole-day inclusive interval of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl DateRange {
  pub fn parse(start: &str, end: &str) -> Result<Self> {
    Ok(Self { start: parse_date(start)?, end: parse_date(end)? })
  }

  /// Midnight at the beginning of `start`.
  pub fn lower_bound(&self) -> DateTime<Utc> {
    self.start.and_time(NaiveTime::MIN).and_utc()
  }

  /// The last representable instant of `end`, 23:59:59.999999.
  pub fn upper_bound(&self) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
      .unwrap_or(NaiveTime::MIN);
    self.end.and_time(last).and_utc()
  }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
  let s = s.trim();
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|_| Error::InvalidDate(s.to_owned()))
}

/// Count incidents registered on any day of `range`.
pub async fn incident_count_in_range<S: RecordStore>(
  store: &S,
  range: &DateRange,
) -> Result<u64, S::Error> {
  store
    .count_incidents_between(range.lower_bound(), range.upper_bound())
    .await
}

/// Outcome of the per-person report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersonIncidentCount {
  Found { person: Person, count: u64 },
  /// No person carries that registration number.
  UnknownPerson,
}

/// Resolve a person by registration number and count their participations.
pub async fn person_incident_count<S: RecordStore>(
  store: &S,
  reg_number: &str,
) -> Result<PersonIncidentCount, S::Error> {
  let Some(person) = store
    .find_person_by_reg_number(reg_number.trim().to_owned())
    .await?
  else {
    return Ok(PersonIncidentCount::UnknownPerson);
  };

  let count = store.count_participations_for_person(person.id).await?;
  Ok(PersonIncidentCount::Found { person, count })
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Timelike};

  use super::*;

  #[test]
  fn single_day_range_covers_the_whole_day() {
    let range = DateRange::parse("2024-01-01", "2024-01-01").unwrap();
    assert_eq!(
      range.lower_bound(),
      Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    );
    let upper = range.upper_bound();
    assert_eq!(upper.date_naive(), range.end);
    assert_eq!((upper.hour(), upper.minute(), upper.second()), (23, 59, 59));
    assert!(Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap() <= upper);
    assert!(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() > upper);
  }

  #[test]
  fn malformed_dates_are_rejected() {
    assert_eq!(
      DateRange::parse("01.01.2024", "2024-01-02"),
      Err(Error::InvalidDate("01.01.2024".into()))
    );
    assert_eq!(
      DateRange::parse("2024-01-01", "2024-02-30"),
      Err(Error::InvalidDate("2024-02-30".into()))
    );
    assert!(DateRange::parse("", "").is_err());
  }
}

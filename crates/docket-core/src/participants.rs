//! Replace-all editing of an incident's participants.
//!
//! The edit form submits one `"<person_id>:<role>"` string per row. Rows are
//! parsed here, unknown persons are filtered out by the store, and the
//! surviving rows replace the incident's participant set in one transaction.
//! Every row that did not make it is reported back with a reason.

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

use crate::{model::Participation, store::RecordStore};

/// Separates the person id from the role label in a submitted row.
pub const DELIMITER: char = ':';

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One syntactically valid row of the participants form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantEntry {
  pub person_id: i64,
  pub role:      String,
}

impl fmt::Display for ParticipantEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.person_id, DELIMITER, self.role)
  }
}

/// Why a submitted row could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
  #[error("expected <person id>:<role>")]
  WrongArity,
  #[error("{0:?} is not a person id")]
  InvalidPersonId(String),
  #[error("role is empty")]
  EmptyRole,
}

impl FromStr for ParticipantEntry {
  type Err = EntryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut parts = s.split(DELIMITER);
    let (Some(id), Some(role), None) = (parts.next(), parts.next(), parts.next())
    else {
      return Err(EntryError::WrongArity);
    };

    let id = id.trim();
    let person_id = id
      .parse()
      .map_err(|_| EntryError::InvalidPersonId(id.to_owned()))?;

    let role = role.trim();
    if role.is_empty() {
      return Err(EntryError::EmptyRole);
    }

    Ok(Self { person_id, role: role.to_owned() })
  }
}

// ─── Rejections ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
  #[error("malformed entry: {0}")]
  Malformed(EntryError),
  #[error("unknown person {0}")]
  UnknownPerson(i64),
}

/// A submitted row that was left out of the stored set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
  pub raw:    String,
  pub reason: RejectReason,
}

impl fmt::Display for RejectedEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}: {}", self.raw, self.reason)
  }
}

/// Split raw rows into parsed entries and malformed rejections, preserving
/// submission order. Blank rows are dropped without comment.
pub fn parse_submission<I, T>(raw: I) -> (Vec<ParticipantEntry>, Vec<RejectedEntry>)
where
  I: IntoIterator<Item = T>,
  T: AsRef<str>,
{
  let mut entries = Vec::new();
  let mut rejected = Vec::new();

  for row in raw {
    let row = row.as_ref();
    if row.trim().is_empty() {
      continue;
    }
    match row.parse::<ParticipantEntry>() {
      Ok(entry) => entries.push(entry),
      Err(e) => rejected.push(RejectedEntry {
        raw:    row.to_owned(),
        reason: RejectReason::Malformed(e),
      }),
    }
  }

  (entries, rejected)
}

// ─── Workflow ────────────────────────────────────────────────────────────────

/// Result of a replace-all edit.
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
  /// The incident's participant set as now stored.
  pub participants: Vec<Participation>,
  pub rejected:     Vec<RejectedEntry>,
}

/// Replace the participants of `incident_id` with the rows in `raw`.
///
/// Fails with the store's not-found error if the incident does not exist; in
/// that case nothing is written.
pub async fn edit_participants<S, I, T>(
  store: &S,
  incident_id: i64,
  raw: I,
) -> Result<ReplaceOutcome, S::Error>
where
  S: RecordStore,
  I: IntoIterator<Item = T>,
  T: AsRef<str>,
{
  let (entries, mut rejected) = parse_submission(raw);
  let replaced = store.replace_participants(incident_id, entries).await?;

  rejected.extend(replaced.unknown.into_iter().map(|entry| RejectedEntry {
    reason: RejectReason::UnknownPerson(entry.person_id),
    raw:    entry.to_string(),
  }));

  Ok(ReplaceOutcome { participants: replaced.stored, rejected })
}

//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision, so string comparison in SQL agrees with time order. Role names
//! are stored in their lowercase form.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, Utc};
use docket_core::{
  access::RoleName,
  model::{Incident, Participation, Person, Role, Session, User},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── RoleName ────────────────────────────────────────────────────────────────

pub fn encode_role_name(name: RoleName) -> &'static str { name.as_str() }

pub fn decode_role_name(s: &str) -> Result<RoleName> {
  RoleName::from_str(s).map_err(|_| Error::Decode {
    column: "roles.name",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Select list matching [`RawUser`]; joins the user's role.
pub const USER_COLUMNS: &str = "
  u.id, u.username, u.password_hash, u.first_name, u.last_name, u.middle_name,
  r.id, r.name, r.description
  FROM users u JOIN roles r ON r.id = u.role_id";

/// Raw values read from a `users` row joined with its role.
pub struct RawUser {
  pub id:               i64,
  pub username:         String,
  pub password_hash:    String,
  pub first_name:       String,
  pub last_name:        String,
  pub middle_name:      Option<String>,
  pub role_id:          i64,
  pub role_name:        String,
  pub role_description: Option<String>,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      username:         row.get(1)?,
      password_hash:    row.get(2)?,
      first_name:       row.get(3)?,
      last_name:        row.get(4)?,
      middle_name:      row.get(5)?,
      role_id:          row.get(6)?,
      role_name:        row.get(7)?,
      role_description: row.get(8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      username:      self.username,
      password_hash: self.password_hash,
      first_name:    self.first_name,
      last_name:     self.last_name,
      middle_name:   self.middle_name,
      role:          Role {
        id:          self.role_id,
        name:        decode_role_name(&self.role_name)?,
        description: self.role_description,
      },
    })
  }
}

/// Raw values read from a `sessions` row.
pub struct RawSession {
  pub session_id: String,
  pub user_id:    i64,
  pub created_at: String,
  pub expires_at: String,
  pub persistent: bool,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id: self.session_id,
      user_id:    self.user_id,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
      persistent: self.persistent,
    })
  }
}

pub const PERSON_COLUMNS: &str = "id, reg_number, first_name, last_name, \
                                  patronymic, address, convictions_count";

/// Raw values read from a `persons` row.
pub struct RawPerson {
  pub id:                i64,
  pub reg_number:        String,
  pub first_name:        String,
  pub last_name:         String,
  pub patronymic:        Option<String>,
  pub address:           Option<String>,
  pub convictions_count: i64,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      reg_number:        row.get(1)?,
      first_name:        row.get(2)?,
      last_name:         row.get(3)?,
      patronymic:        row.get(4)?,
      address:           row.get(5)?,
      convictions_count: row.get(6)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    let convictions_count =
      u32::try_from(self.convictions_count).map_err(|_| Error::Decode {
        column: "persons.convictions_count",
        value:  self.convictions_count.to_string(),
      })?;
    Ok(Person {
      id: self.id,
      reg_number: self.reg_number,
      first_name: self.first_name,
      last_name: self.last_name,
      patronymic: self.patronymic,
      address: self.address,
      convictions_count,
    })
  }
}

pub const INCIDENT_COLUMNS: &str = "id, reg_number, registration_date, \
                                    short_description, decision_status, \
                                    case_reg_number";

/// Raw values read from an `incidents` row.
pub struct RawIncident {
  pub id:                i64,
  pub reg_number:        String,
  pub registration_date: String,
  pub short_description: String,
  pub decision_status:   Option<String>,
  pub case_reg_number:   Option<String>,
}

impl RawIncident {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      reg_number:        row.get(1)?,
      registration_date: row.get(2)?,
      short_description: row.get(3)?,
      decision_status:   row.get(4)?,
      case_reg_number:   row.get(5)?,
    })
  }

  pub fn into_incident(self) -> Result<Incident> {
    Ok(Incident {
      id:                self.id,
      reg_number:        self.reg_number,
      registration_date: decode_dt(&self.registration_date)?,
      short_description: self.short_description,
      decision_status:   self.decision_status,
      case_reg_number:   self.case_reg_number,
    })
  }
}

pub fn participation_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<Participation> {
  Ok(Participation {
    id:          row.get(0)?,
    incident_id: row.get(1)?,
    person_id:   row.get(2)?,
    role:        row.get(3)?,
  })
}

/// True for a `UNIQUE` constraint failure.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

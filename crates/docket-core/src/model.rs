//! Records kept in the register, and the validated field sets used to write
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, access::RoleName};

// ─── Accounts ────────────────────────────────────────────────────────────────

/// A row of the `roles` reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub id:          i64,
  pub name:        RoleName,
  pub description: Option<String>,
}

/// An account that can sign in. The role is resolved on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:            i64,
  pub username:      String,
  /// argon2 PHC string. Never rendered.
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub middle_name:   Option<String>,
  pub role:          Role,
}

impl User {
  pub fn is_administrator(&self) -> bool {
    self.role.name == RoleName::Administrator
  }
}

/// Input to [`crate::store::RecordStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub middle_name:   Option<String>,
  pub role:          RoleName,
}

/// A server-side login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub session_id: String,
  pub user_id:    i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  /// Set when the user asked to be remembered.
  pub persistent: bool,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}

// ─── Persons ─────────────────────────────────────────────────────────────────

/// A real-world individual referenced by incidents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:                i64,
  pub reg_number:        String,
  pub first_name:        String,
  pub last_name:         String,
  pub patronymic:        Option<String>,
  pub address:           Option<String>,
  pub convictions_count: u32,
}

/// Validated values for creating or updating a [`Person`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonFields {
  pub reg_number:        String,
  pub first_name:        String,
  pub last_name:         String,
  pub patronymic:        Option<String>,
  pub address:           Option<String>,
  pub convictions_count: u32,
}

/// Raw person form input, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonDraft {
  pub reg_number:        String,
  pub first_name:        String,
  pub last_name:         String,
  pub patronymic:        String,
  pub address:           String,
  pub convictions_count: String,
}

impl PersonDraft {
  pub fn validate(&self) -> Result<PersonFields> {
    Ok(PersonFields {
      reg_number:        required("reg_number", &self.reg_number)?,
      first_name:        required("first_name", &self.first_name)?,
      last_name:         required("last_name", &self.last_name)?,
      patronymic:        optional(&self.patronymic),
      address:           optional(&self.address),
      convictions_count: convictions(&self.convictions_count)?,
    })
  }
}

impl From<&Person> for PersonDraft {
  fn from(p: &Person) -> Self {
    Self {
      reg_number:        p.reg_number.clone(),
      first_name:        p.first_name.clone(),
      last_name:         p.last_name.clone(),
      patronymic:        p.patronymic.clone().unwrap_or_default(),
      address:           p.address.clone().unwrap_or_default(),
      convictions_count: p.convictions_count.to_string(),
    }
  }
}

// ─── Incidents ───────────────────────────────────────────────────────────────

/// A registered incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
  pub id:                i64,
  pub reg_number:        String,
  pub registration_date: DateTime<Utc>,
  pub short_description: String,
  /// Outcome of the review, e.g. "criminal case opened".
  pub decision_status:   Option<String>,
  /// Registration number of the resulting criminal case, if any.
  pub case_reg_number:   Option<String>,
}

/// Validated values for creating or updating an [`Incident`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentFields {
  pub reg_number:        String,
  pub short_description: String,
  pub decision_status:   Option<String>,
  pub case_reg_number:   Option<String>,
}

/// Input to [`crate::store::RecordStore::add_incident`].
#[derive(Debug, Clone)]
pub struct NewIncident {
  pub fields:            IncidentFields,
  /// Defaults to the time of insertion.
  pub registration_date: Option<DateTime<Utc>>,
}

impl From<IncidentFields> for NewIncident {
  fn from(fields: IncidentFields) -> Self {
    Self { fields, registration_date: None }
  }
}

/// Raw incident form input, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentDraft {
  pub reg_number:        String,
  pub short_description: String,
  pub decision_status:   String,
  pub case_reg_number:   String,
}

impl IncidentDraft {
  pub fn validate(&self) -> Result<IncidentFields> {
    Ok(IncidentFields {
      reg_number:        required("reg_number", &self.reg_number)?,
      short_description: required(
        "short_description",
        &self.short_description,
      )?,
      decision_status:   optional(&self.decision_status),
      case_reg_number:   optional(&self.case_reg_number),
    })
  }
}

impl From<&Incident> for IncidentDraft {
  fn from(i: &Incident) -> Self {
    Self {
      reg_number:        i.reg_number.clone(),
      short_description: i.short_description.clone(),
      decision_status:   i.decision_status.clone().unwrap_or_default(),
      case_reg_number:   i.case_reg_number.clone().unwrap_or_default(),
    }
  }
}

// ─── Participation ───────────────────────────────────────────────────────────

/// One (incident, person, role) fact. The same pair may appear more than once
/// with different roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
  pub id:          i64,
  pub incident_id: i64,
  pub person_id:   i64,
  /// Free-text label such as "witness" or "victim".
  pub role:        String,
}

/// Input to [`crate::store::RecordStore::add_participation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipation {
  pub incident_id: i64,
  pub person_id:   i64,
  pub role:        String,
}

/// Raw single-participation form input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipationDraft {
  pub incident_id: String,
  pub person_id:   String,
  pub role:        String,
}

impl ParticipationDraft {
  pub fn validate(&self) -> Result<NewParticipation> {
    Ok(NewParticipation {
      incident_id: id_field("incident_id", &self.incident_id)?,
      person_id:   id_field("person_id", &self.person_id)?,
      role:        required("role", &self.role)?,
    })
  }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

fn required(field: &'static str, value: &str) -> Result<String> {
  let value = value.trim();
  if value.is_empty() {
    Err(Error::MissingField(field))
  } else {
    Ok(value.to_owned())
  }
}

fn optional(value: &str) -> Option<String> {
  let value = value.trim();
  (!value.is_empty()).then(|| value.to_owned())
}

fn convictions(value: &str) -> Result<u32> {
  let value = value.trim();
  if value.is_empty() {
    return Ok(0);
  }
  value.parse().map_err(|_| Error::InvalidField {
    field:  "convictions_count",
    reason: "must be a non-negative whole number".into(),
  })
}

fn id_field(field: &'static str, value: &str) -> Result<i64> {
  let value = value.trim();
  if value.is_empty() {
    return Err(Error::MissingField(field));
  }
  value.parse().map_err(|_| Error::InvalidField {
    field,
    reason: format!("{value:?} is not a valid id"),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn incident_requires_reg_number_and_description() {
    let draft = IncidentDraft {
      short_description: "Theft".into(),
      ..Default::default()
    };
    assert_eq!(draft.validate(), Err(Error::MissingField("reg_number")));

    let draft = IncidentDraft {
      reg_number: "INC-001".into(),
      short_description: "   ".into(),
      ..Default::default()
    };
    assert_eq!(
      draft.validate(),
      Err(Error::MissingField("short_description"))
    );
  }

  #[test]
  fn incident_optional_fields_default_to_none() {
    let fields = IncidentDraft {
      reg_number: " INC-001 ".into(),
      short_description: "Theft".into(),
      decision_status: "  ".into(),
      case_reg_number: String::new(),
    }
    .validate()
    .unwrap();
    assert_eq!(fields.reg_number, "INC-001");
    assert_eq!(fields.decision_status, None);
    assert_eq!(fields.case_reg_number, None);
  }

  #[test]
  fn person_convictions_default_to_zero() {
    let fields = PersonDraft {
      reg_number: "P-1".into(),
      first_name: "Ivan".into(),
      last_name: "Petrov".into(),
      ..Default::default()
    }
    .validate()
    .unwrap();
    assert_eq!(fields.convictions_count, 0);
    assert_eq!(fields.patronymic, None);
  }

  #[test]
  fn person_rejects_negative_convictions() {
    let draft = PersonDraft {
      reg_number: "P-1".into(),
      first_name: "Ivan".into(),
      last_name: "Petrov".into(),
      convictions_count: "-1".into(),
      ..Default::default()
    };
    assert!(matches!(
      draft.validate(),
      Err(Error::InvalidField { field: "convictions_count", .. })
    ));
  }

  #[test]
  fn person_requires_names() {
    let draft = PersonDraft {
      reg_number: "P-1".into(),
      last_name: "Petrov".into(),
      ..Default::default()
    };
    assert_eq!(draft.validate(), Err(Error::MissingField("first_name")));
  }

  #[test]
  fn participation_draft_parses_ids() {
    let draft = ParticipationDraft {
      incident_id: "3".into(),
      person_id: "x".into(),
      role: "witness".into(),
    };
    assert!(matches!(
      draft.validate(),
      Err(Error::InvalidField { field: "person_id", .. })
    ));

    let ok = ParticipationDraft {
      person_id: " 7 ".into(),
      ..draft
    }
    .validate()
    .unwrap();
    assert_eq!(ok, NewParticipation {
      incident_id: 3,
      person_id:   7,
      role:        "witness".into(),
    });
  }
}

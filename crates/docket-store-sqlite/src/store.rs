//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use docket_core::{
  access::RoleName,
  model::{
    Incident, IncidentFields, NewIncident, NewParticipation, NewUser,
    Participation, Person, PersonFields, Role, Session, User,
  },
  participants::ParticipantEntry,
  store::{RecordStore, ReplacedParticipants},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  Error, Result,
  encode::{
    INCIDENT_COLUMNS, PERSON_COLUMNS, RawIncident, RawPerson, RawSession,
    RawUser, USER_COLUMNS, decode_role_name, encode_dt, encode_role_name,
    is_unique_violation, participation_from_row,
  },
  schema::SCHEMA,
};

/// Outcome of a write that can trip over a unique key or a missing row.
enum Write<T> {
  Done(T),
  Duplicate,
  Missing,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Docket record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn require_person(&self, id: i64) -> Result<Person> {
    self
      .get_person(id)
      .await?
      .ok_or(Error::Core(docket_core::Error::PersonNotFound(id)))
  }

  async fn require_incident(&self, id: i64) -> Result<Incident> {
    self
      .get_incident(id)
      .await?
      .ok_or(Error::Core(docket_core::Error::IncidentNotFound(id)))
  }
}

fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  id: i64,
) -> rusqlite::Result<bool> {
  conn.prepare_cached(sql)?.exists(rusqlite::params![id])
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Roles and users ───────────────────────────────────────────────────────

  async fn ensure_role(
    &self,
    name: RoleName,
    description: Option<String>,
  ) -> Result<Role> {
    let name_str = encode_role_name(name);

    let (id, stored_name, description): (i64, String, Option<String>) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO roles (name, description) VALUES (?1, ?2)",
          rusqlite::params![name_str, description],
        )?;
        Ok(conn.query_row(
          "SELECT id, name, description FROM roles WHERE name = ?1",
          rusqlite::params![name_str],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?)
      })
      .await?;

    Ok(Role { id, name: decode_role_name(&stored_name)?, description })
  }

  async fn add_user(&self, user: NewUser) -> Result<User> {
    let role_str = encode_role_name(user.role);
    let username = user.username.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let role_id: Option<i64> = conn
          .query_row(
            "SELECT id FROM roles WHERE name = ?1",
            rusqlite::params![role_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(role_id) = role_id else {
          return Ok(Write::Missing);
        };

        let inserted = conn.execute(
          "INSERT INTO users (
             username, password_hash, first_name, last_name, middle_name, role_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            user.username,
            user.password_hash,
            user.first_name,
            user.last_name,
            user.middle_name,
            role_id,
          ],
        );
        match inserted {
          Ok(_) => Ok(Write::Done(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Done(id) => self
        .get_user(id)
        .await?
        .ok_or(Error::Core(docket_core::Error::UserNotFound(id))),
      Write::Duplicate => {
        Err(docket_core::Error::DuplicateUsername(username).into())
      }
      Write::Missing => {
        Err(docket_core::Error::RoleNotFound(role_str.to_owned()).into())
      }
    }
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} WHERE u.id = ?1"),
              rusqlite::params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_username(&self, username: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} WHERE u.username = ?1"),
              rusqlite::params![username],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn count_users(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
      })
      .await?;
    Ok(n.unsigned_abs())
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: Session) -> Result<()> {
    let created_str = encode_dt(session.created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (session_id, user_id, created_at, expires_at, persistent)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            session.session_id,
            session.user_id,
            created_str,
            expires_str,
            session.persistent,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_session(&self, session_id: String) -> Result<Option<Session>> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT session_id, user_id, created_at, expires_at, persistent
               FROM sessions WHERE session_id = ?1",
              rusqlite::params![session_id],
              |row| {
                Ok(RawSession {
                  session_id: row.get(0)?,
                  user_id:    row.get(1)?,
                  created_at: row.get(2)?,
                  expires_at: row.get(3)?,
                  persistent: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn delete_session(&self, session_id: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE session_id = ?1",
          rusqlite::params![session_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
    let now_str = encode_dt(now);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;
    Ok(removed as u64)
  }

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn add_person(&self, fields: PersonFields) -> Result<Person> {
    let reg_number = fields.reg_number.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO persons (
             reg_number, first_name, last_name, patronymic, address, convictions_count
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            fields.reg_number,
            fields.first_name,
            fields.last_name,
            fields.patronymic,
            fields.address,
            fields.convictions_count,
          ],
        );
        match inserted {
          Ok(_) => Ok(Write::Done(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Done(id) => self.require_person(id).await,
      Write::Duplicate | Write::Missing => {
        Err(docket_core::Error::DuplicateRegNumber(reg_number).into())
      }
    }
  }

  async fn update_person(&self, id: i64, fields: PersonFields) -> Result<Person> {
    let reg_number = fields.reg_number.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let updated = conn.execute(
          "UPDATE persons
           SET reg_number = ?2, first_name = ?3, last_name = ?4,
               patronymic = ?5, address = ?6, convictions_count = ?7
           WHERE id = ?1",
          rusqlite::params![
            id,
            fields.reg_number,
            fields.first_name,
            fields.last_name,
            fields.patronymic,
            fields.address,
            fields.convictions_count,
          ],
        );
        match updated {
          Ok(0) => Ok(Write::Missing),
          Ok(_) => Ok(Write::Done(())),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Done(()) => self.require_person(id).await,
      Write::Duplicate => {
        Err(docket_core::Error::DuplicateRegNumber(reg_number).into())
      }
      Write::Missing => Err(docket_core::Error::PersonNotFound(id).into()),
    }
  }

  async fn get_person(&self, id: i64) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1"),
              rusqlite::params![id],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn find_person_by_reg_number(
    &self,
    reg_number: String,
  ) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {PERSON_COLUMNS} FROM persons WHERE reg_number = ?1"
              ),
              rusqlite::params![reg_number],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn list_persons(&self) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons ORDER BY last_name, first_name, id"
        ))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  // ── Incidents ─────────────────────────────────────────────────────────────

  async fn add_incident(&self, incident: NewIncident) -> Result<Incident> {
    let NewIncident { fields, registration_date } = incident;
    let reg_number = fields.reg_number.clone();
    let registered_str = encode_dt(registration_date.unwrap_or_else(Utc::now));

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO incidents (
             reg_number, registration_date, short_description,
             decision_status, case_reg_number
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            fields.reg_number,
            registered_str,
            fields.short_description,
            fields.decision_status,
            fields.case_reg_number,
          ],
        );
        match inserted {
          Ok(_) => Ok(Write::Done(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Done(id) => self.require_incident(id).await,
      Write::Duplicate | Write::Missing => {
        Err(docket_core::Error::DuplicateRegNumber(reg_number).into())
      }
    }
  }

  async fn update_incident(
    &self,
    id: i64,
    fields: IncidentFields,
  ) -> Result<Incident> {
    let reg_number = fields.reg_number.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let updated = conn.execute(
          "UPDATE incidents
           SET reg_number = ?2, short_description = ?3,
               decision_status = ?4, case_reg_number = ?5
           WHERE id = ?1",
          rusqlite::params![
            id,
            fields.reg_number,
            fields.short_description,
            fields.decision_status,
            fields.case_reg_number,
          ],
        );
        match updated {
          Ok(0) => Ok(Write::Missing),
          Ok(_) => Ok(Write::Done(())),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Done(()) => self.require_incident(id).await,
      Write::Duplicate => {
        Err(docket_core::Error::DuplicateRegNumber(reg_number).into())
      }
      Write::Missing => Err(docket_core::Error::IncidentNotFound(id).into()),
    }
  }

  async fn get_incident(&self, id: i64) -> Result<Option<Incident>> {
    let raw: Option<RawIncident> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"),
              rusqlite::params![id],
              RawIncident::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIncident::into_incident).transpose()
  }

  async fn list_incidents(&self) -> Result<Vec<Incident>> {
    let raws: Vec<RawIncident> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INCIDENT_COLUMNS} FROM incidents
           ORDER BY registration_date DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map([], RawIncident::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIncident::into_incident).collect()
  }

  // ── Participation ─────────────────────────────────────────────────────────

  async fn add_participation(
    &self,
    input: NewParticipation,
  ) -> Result<Participation> {
    let NewParticipation { incident_id, person_id, role } = input;

    let outcome = self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM incidents WHERE id = ?1", incident_id)? {
          return Ok(Err(docket_core::Error::IncidentNotFound(incident_id)));
        }
        if !exists(conn, "SELECT 1 FROM persons WHERE id = ?1", person_id)? {
          return Ok(Err(docket_core::Error::PersonNotFound(person_id)));
        }
        conn.execute(
          "INSERT INTO incident_persons (incident_id, person_id, role)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![incident_id, person_id, role],
        )?;
        Ok(Ok(Participation {
          id: conn.last_insert_rowid(),
          incident_id,
          person_id,
          role,
        }))
      })
      .await?;

    Ok(outcome?)
  }

  async fn list_participants(&self, incident_id: i64) -> Result<Vec<Participation>> {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, incident_id, person_id, role FROM incident_persons
           WHERE incident_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![incident_id], participation_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn replace_participants(
    &self,
    incident_id: i64,
    entries: Vec<ParticipantEntry>,
  ) -> Result<ReplacedParticipants> {
    let replaced = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front; dropping the transaction
        // on any early return rolls it back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !exists(&tx, "SELECT 1 FROM incidents WHERE id = ?1", incident_id)? {
          return Ok(None);
        }

        let mut accepted = Vec::with_capacity(entries.len());
        let mut unknown = Vec::new();
        for entry in entries {
          if exists(&tx, "SELECT 1 FROM persons WHERE id = ?1", entry.person_id)? {
            accepted.push(entry);
          } else {
            unknown.push(entry);
          }
        }

        tx.execute(
          "DELETE FROM incident_persons WHERE incident_id = ?1",
          rusqlite::params![incident_id],
        )?;

        let mut stored = Vec::with_capacity(accepted.len());
        {
          let mut insert = tx.prepare(
            "INSERT INTO incident_persons (incident_id, person_id, role)
             VALUES (?1, ?2, ?3)",
          )?;
          for entry in accepted {
            insert.execute(rusqlite::params![
              incident_id,
              entry.person_id,
              entry.role
            ])?;
            stored.push(Participation {
              id: tx.last_insert_rowid(),
              incident_id,
              person_id: entry.person_id,
              role: entry.role,
            });
          }
        }

        tx.commit()?;
        Ok(Some(ReplacedParticipants { stored, unknown }))
      })
      .await?;

    replaced.ok_or(Error::Core(docket_core::Error::IncidentNotFound(incident_id)))
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn count_incidents_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<u64> {
    let from_str = encode_dt(from);
    let to_str = encode_dt(to);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM incidents
           WHERE registration_date >= ?1 AND registration_date <= ?2",
          rusqlite::params![from_str, to_str],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(n.unsigned_abs())
  }

  async fn count_participations_for_person(&self, person_id: i64) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM incident_persons WHERE person_id = ?1",
          rusqlite::params![person_id],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(n.unsigned_abs())
  }
}

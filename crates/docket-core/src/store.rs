//! The `RecordStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `docket-store-sqlite`).
//! The web layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  access::RoleName,
  model::{
    Incident, IncidentFields, NewIncident, NewParticipation, NewUser,
    Participation, Person, PersonFields, Role, Session, User,
  },
  participants::ParticipantEntry,
};

/// Errors raised by a [`RecordStore`].
///
/// Backends wrap domain failures (missing rows, duplicate keys) in their own
/// error type; `domain` hands them back so callers can tell a bad request
/// from a storage failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

/// What [`RecordStore::replace_participants`] wrote.
#[derive(Debug, Clone, Default)]
pub struct ReplacedParticipants {
  /// The incident's participants after the replacement, in insertion order.
  pub stored:  Vec<Participation>,
  /// Entries whose person does not exist; not written.
  pub unknown: Vec<ParticipantEntry>,
}

/// Abstraction over a Docket storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: StoreError;

  // ── Roles and users ───────────────────────────────────────────────────

  /// Insert the role if it is missing; return the stored row either way.
  fn ensure_role(
    &self,
    name: RoleName,
    description: Option<String>,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  /// Persist a new user. Fails with `DuplicateUsername` or `RoleNotFound`.
  fn add_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Exact, case-sensitive username lookup.
  fn find_user_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn count_users(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_session(
    &self,
    session_id: String,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Remove a session. Removing an unknown session is not an error.
  fn delete_session(
    &self,
    session_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove every session that expired before `now`; returns how many.
  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Persons ───────────────────────────────────────────────────────────

  /// Fails with `DuplicateRegNumber` if the registration number is taken.
  fn add_person(
    &self,
    fields: PersonFields,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Fails with `PersonNotFound` or `DuplicateRegNumber`.
  fn update_person(
    &self,
    id: i64,
    fields: PersonFields,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn find_person_by_reg_number(
    &self,
    reg_number: String,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn list_persons(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  // ── Incidents ─────────────────────────────────────────────────────────

  /// Fails with `DuplicateRegNumber` if the registration number is taken.
  fn add_incident(
    &self,
    incident: NewIncident,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  /// Updates everything but the registration date. Fails with
  /// `IncidentNotFound` or `DuplicateRegNumber`.
  fn update_incident(
    &self,
    id: i64,
    fields: IncidentFields,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  fn get_incident(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + '_;

  fn list_incidents(
    &self,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  // ── Participation ─────────────────────────────────────────────────────

  /// Record one participation. Both ends must exist.
  fn add_participation(
    &self,
    input: NewParticipation,
  ) -> impl Future<Output = Result<Participation, Self::Error>> + Send + '_;

  fn list_participants(
    &self,
    incident_id: i64,
  ) -> impl Future<Output = Result<Vec<Participation>, Self::Error>> + Send + '_;

  /// Atomically replace every participation of `incident_id` with `entries`.
  ///
  /// Entries naming a missing person are skipped and returned in
  /// [`ReplacedParticipants::unknown`]. Concurrent readers observe either the
  /// old set or the new one. Fails with `IncidentNotFound` without writing
  /// anything.
  fn replace_participants(
    &self,
    incident_id: i64,
    entries: Vec<ParticipantEntry>,
  ) -> impl Future<Output = Result<ReplacedParticipants, Self::Error>> + Send + '_;

  // ── Aggregates ────────────────────────────────────────────────────────

  /// Incidents with `from <= registration_date <= to`.
  fn count_incidents_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Participation rows referencing `person_id`.
  fn count_participations_for_person(
    &self,
    person_id: i64,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

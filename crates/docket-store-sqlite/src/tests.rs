//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use docket_core::{
  access::RoleName,
  model::{
    IncidentFields, NewIncident, NewParticipation, NewUser, PersonFields,
    Session,
  },
  participants::{RejectReason, edit_participants},
  report::{
    DateRange, PersonIncidentCount, incident_count_in_range,
    person_incident_count,
  },
  store::{RecordStore, StoreError as _},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person(reg_number: &str) -> PersonFields {
  PersonFields {
    reg_number:        reg_number.into(),
    first_name:        "Ivan".into(),
    last_name:         "Petrov".into(),
    patronymic:        None,
    address:           None,
    convictions_count: 0,
  }
}

fn incident(reg_number: &str) -> IncidentFields {
  IncidentFields {
    reg_number:        reg_number.into(),
    short_description: "Theft".into(),
    decision_status:   None,
    case_reg_number:   None,
  }
}

fn domain(e: &Error) -> docket_core::Error {
  e.domain().cloned().expect("domain error")
}

// ─── Roles and users ─────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_role_is_idempotent() {
  let s = store().await;
  let first = s
    .ensure_role(RoleName::Administrator, Some("all access".into()))
    .await
    .unwrap();
  let second = s.ensure_role(RoleName::Administrator, None).await.unwrap();
  assert_eq!(first, second);
  assert_eq!(second.description.as_deref(), Some("all access"));
}

#[tokio::test]
async fn add_user_resolves_role() {
  let s = store().await;
  s.ensure_role(RoleName::User, None).await.unwrap();

  let user = s
    .add_user(NewUser {
      username:      "viewer".into(),
      password_hash: "hash".into(),
      first_name:    "Ekaterina".into(),
      last_name:     "Baranova".into(),
      middle_name:   None,
      role:          RoleName::User,
    })
    .await
    .unwrap();
  assert_eq!(user.role.name, RoleName::User);

  let found = s
    .find_user_by_username("viewer".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.id, user.id);
  assert_eq!(found.password_hash, "hash");
  assert!(
    s.find_user_by_username("Viewer".into())
      .await
      .unwrap()
      .is_none(),
    "username lookup is case-sensitive"
  );
  assert_eq!(s.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn add_user_rejects_duplicates_and_unknown_roles() {
  let s = store().await;
  let new_user = NewUser {
    username:      "admin".into(),
    password_hash: "hash".into(),
    first_name:    "Polina".into(),
    last_name:     "Filippova".into(),
    middle_name:   None,
    role:          RoleName::Administrator,
  };

  let err = s.add_user(new_user.clone()).await.unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::RoleNotFound("administrator".into())
  );

  s.ensure_role(RoleName::Administrator, None).await.unwrap();
  s.add_user(new_user.clone()).await.unwrap();
  let err = s.add_user(new_user).await.unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::DuplicateUsername("admin".into())
  );
}

// ─── Sessions ────────────────────────────────────────────────────────────────

async fn user_id(s: &SqliteStore) -> i64 {
  s.ensure_role(RoleName::User, None).await.unwrap();
  s.add_user(NewUser {
    username:      "u".into(),
    password_hash: "h".into(),
    first_name:    "F".into(),
    last_name:     "L".into(),
    middle_name:   None,
    role:          RoleName::User,
  })
  .await
  .unwrap()
  .id
}

#[tokio::test]
async fn session_lifecycle() {
  let s = store().await;
  let uid = user_id(&s).await;
  let now = Utc::now();
  let session = Session {
    session_id: "abc".into(),
    user_id:    uid,
    created_at: now,
    expires_at: now + Duration::hours(2),
    persistent: true,
  };

  s.create_session(session.clone()).await.unwrap();
  let fetched = s.get_session("abc".into()).await.unwrap().unwrap();
  assert_eq!(fetched.user_id, uid);
  assert!(fetched.persistent);

  s.delete_session("abc".into()).await.unwrap();
  assert!(s.get_session("abc".into()).await.unwrap().is_none());
  // Deleting again is a no-op.
  s.delete_session("abc".into()).await.unwrap();
}

#[tokio::test]
async fn purge_removes_only_expired_sessions() {
  let s = store().await;
  let uid = user_id(&s).await;
  let now = Utc::now();
  for (id, offset) in [("old", -1), ("fresh", 1)] {
    s.create_session(Session {
      session_id: id.into(),
      user_id:    uid,
      created_at: now - Duration::hours(3),
      expires_at: now + Duration::hours(offset),
      persistent: false,
    })
    .await
    .unwrap();
  }

  assert_eq!(s.purge_expired_sessions(now).await.unwrap(), 1);
  assert!(s.get_session("old".into()).await.unwrap().is_none());
  assert!(s.get_session("fresh".into()).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_a_user_ends_their_sessions() {
  let s = store().await;
  let uid = user_id(&s).await;
  let now = Utc::now();
  s.create_session(Session {
    session_id: "orphan".into(),
    user_id:    uid,
    created_at: now,
    expires_at: now + Duration::hours(2),
    persistent: false,
  })
  .await
  .unwrap();

  s.connection()
    .call(move |conn| {
      conn.execute("DELETE FROM users WHERE id = ?1", [uid])?;
      Ok(())
    })
    .await
    .unwrap();

  assert!(s.get_user(uid).await.unwrap().is_none());
  assert!(s.get_session("orphan".into()).await.unwrap().is_none());
}

// ─── Persons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_update_and_find_person() {
  let s = store().await;
  let created = s.add_person(person("P-001")).await.unwrap();
  assert_eq!(created.convictions_count, 0);

  let mut fields = person("P-002");
  fields.convictions_count = 3;
  fields.address = Some("Main st. 1".into());
  let updated = s.update_person(created.id, fields).await.unwrap();
  assert_eq!(updated.reg_number, "P-002");
  assert_eq!(updated.convictions_count, 3);

  assert!(
    s.find_person_by_reg_number("P-001".into())
      .await
      .unwrap()
      .is_none()
  );
  let found = s
    .find_person_by_reg_number("P-002".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found, updated);
}

#[tokio::test]
async fn duplicate_person_reg_number_leaves_store_unchanged() {
  let s = store().await;
  s.add_person(person("P-001")).await.unwrap();

  let mut other = person("P-001");
  other.first_name = "Someone".into();
  let err = s.add_person(other).await.unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::DuplicateRegNumber("P-001".into())
  );
  assert!(domain(&err).is_validation());

  let all = s.list_persons().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].first_name, "Ivan");
}

#[tokio::test]
async fn update_person_errors() {
  let s = store().await;
  let a = s.add_person(person("P-A")).await.unwrap();
  s.add_person(person("P-B")).await.unwrap();

  let err = s.update_person(a.id, person("P-B")).await.unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::DuplicateRegNumber("P-B".into())
  );

  let err = s.update_person(999, person("P-C")).await.unwrap_err();
  assert_eq!(domain(&err), docket_core::Error::PersonNotFound(999));
}

// ─── Incidents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_incident_defaults_registration_date_to_now() {
  let s = store().await;
  let before = Utc::now();
  let created = s.add_incident(incident("INC-001").into()).await.unwrap();
  let after = Utc::now();

  assert_eq!(created.reg_number, "INC-001");
  assert_eq!(created.short_description, "Theft");
  assert!(created.registration_date >= before - Duration::seconds(1));
  assert!(created.registration_date <= after);
}

#[tokio::test]
async fn duplicate_incident_reg_number_is_rejected() {
  let s = store().await;
  s.add_incident(incident("INC-001").into()).await.unwrap();
  let err = s.add_incident(incident("INC-001").into()).await.unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::DuplicateRegNumber("INC-001".into())
  );
  assert_eq!(s.list_incidents().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_incident_keeps_registration_date() {
  let s = store().await;
  let created = s.add_incident(incident("INC-001").into()).await.unwrap();

  let mut fields = incident("INC-001");
  fields.decision_status = Some("case opened".into());
  fields.case_reg_number = Some("CASE-7".into());
  let updated = s.update_incident(created.id, fields).await.unwrap();

  assert_eq!(updated.registration_date, created.registration_date);
  assert_eq!(updated.decision_status.as_deref(), Some("case opened"));
  assert_eq!(updated.case_reg_number.as_deref(), Some("CASE-7"));

  let err = s
    .update_incident(created.id + 1, incident("INC-X"))
    .await
    .unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::IncidentNotFound(created.id + 1)
  );
}

// ─── Participation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn add_participation_checks_both_ends() {
  let s = store().await;
  let inc = s.add_incident(incident("INC-001").into()).await.unwrap();
  let p = s.add_person(person("P-001")).await.unwrap();

  let err = s
    .add_participation(NewParticipation {
      incident_id: inc.id,
      person_id:   p.id + 10,
      role:        "witness".into(),
    })
    .await
    .unwrap_err();
  assert_eq!(domain(&err), docket_core::Error::PersonNotFound(p.id + 10));

  let err = s
    .add_participation(NewParticipation {
      incident_id: inc.id + 10,
      person_id:   p.id,
      role:        "witness".into(),
    })
    .await
    .unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::IncidentNotFound(inc.id + 10)
  );

  // The same pair may be recorded with several roles.
  for role in ["victim", "witness"] {
    s.add_participation(NewParticipation {
      incident_id: inc.id,
      person_id:   p.id,
      role:        role.into(),
    })
    .await
    .unwrap();
  }
  let roles: Vec<_> = s
    .list_participants(inc.id)
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.role)
    .collect();
  assert_eq!(roles, ["victim", "witness"]);
}

#[tokio::test]
async fn edit_participants_keeps_only_valid_rows() {
  let s = store().await;
  let inc = s.add_incident(incident("INC-001").into()).await.unwrap();
  let first = s.add_person(person("P-001")).await.unwrap();
  let second = s.add_person(person("P-002")).await.unwrap();
  assert_eq!(second.id, 2);

  s.add_participation(NewParticipation {
    incident_id: inc.id,
    person_id:   first.id,
    role:        "suspect".into(),
  })
  .await
  .unwrap();

  let outcome = edit_participants(&s, inc.id, [
    "2:witness",
    "abc:victim",
    "99:suspect",
  ])
  .await
  .unwrap();

  assert_eq!(outcome.participants.len(), 1);
  assert_eq!(outcome.participants[0].person_id, 2);
  assert_eq!(outcome.participants[0].role, "witness");

  let reasons: Vec<_> = outcome.rejected.iter().map(|r| &r.reason).collect();
  assert_eq!(reasons.len(), 2);
  assert!(matches!(reasons[0], RejectReason::Malformed(_)));
  assert_eq!(reasons[1], &RejectReason::UnknownPerson(99));
  assert_eq!(outcome.rejected[1].raw, "99:suspect");

  let stored = s.list_participants(inc.id).await.unwrap();
  assert_eq!(stored, outcome.participants);
}

#[tokio::test]
async fn replace_on_missing_incident_writes_nothing() {
  let s = store().await;
  let inc = s.add_incident(incident("INC-001").into()).await.unwrap();
  let p = s.add_person(person("P-001")).await.unwrap();
  s.add_participation(NewParticipation {
    incident_id: inc.id,
    person_id:   p.id,
    role:        "victim".into(),
  })
  .await
  .unwrap();

  let err = edit_participants(&s, inc.id + 1, [format!("{}:witness", p.id)])
    .await
    .unwrap_err();
  assert_eq!(
    domain(&err),
    docket_core::Error::IncidentNotFound(inc.id + 1)
  );
  assert_eq!(s.list_participants(inc.id).await.unwrap().len(), 1);
  assert_eq!(s.count_participations_for_person(p.id).await.unwrap(), 1);
}

#[tokio::test]
async fn replace_with_empty_submission_clears_participants() {
  let s = store().await;
  let inc = s.add_incident(incident("INC-001").into()).await.unwrap();
  let p = s.add_person(person("P-001")).await.unwrap();
  edit_participants(&s, inc.id, [format!("{}:victim", p.id)])
    .await
    .unwrap();

  let outcome = edit_participants(&s, inc.id, Vec::<String>::new())
    .await
    .unwrap();
  assert!(outcome.participants.is_empty());
  assert!(outcome.rejected.is_empty());
  assert!(s.list_participants(inc.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_replace_keeps_the_previous_set() {
  let s = store().await;
  let inc = s.add_incident(incident("INC-001").into()).await.unwrap();
  let first = s.add_person(person("P-001")).await.unwrap();
  let second = s.add_person(person("P-002")).await.unwrap();
  edit_participants(&s, inc.id, [format!("{}:witness", first.id)])
    .await
    .unwrap();

  // Make the second insert of the next replacement fail after the delete has
  // already run inside the transaction.
  s.connection()
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER reject_suspects BEFORE INSERT ON incident_persons
         WHEN NEW.role = 'suspect'
         BEGIN SELECT RAISE(ABORT, 'suspects rejected'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = edit_participants(&s, inc.id, [
    format!("{}:victim", first.id),
    format!("{}:suspect", second.id),
  ])
  .await
  .unwrap_err();
  assert!(err.domain().is_none());

  let stored = s.list_participants(inc.id).await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].person_id, first.id);
  assert_eq!(stored[0].role, "witness");
}

#[tokio::test]
async fn referenced_rows_cannot_be_deleted() {
  let s = store().await;
  let inc = s.add_incident(incident("INC-001").into()).await.unwrap();
  let p = s.add_person(person("P-001")).await.unwrap();
  s.add_participation(NewParticipation {
    incident_id: inc.id,
    person_id:   p.id,
    role:        "victim".into(),
  })
  .await
  .unwrap();

  let (inc_id, p_id) = (inc.id, p.id);
  let result = s
    .connection()
    .call(move |conn| {
      let incident_delete =
        conn.execute("DELETE FROM incidents WHERE id = ?1", [inc_id]);
      let person_delete =
        conn.execute("DELETE FROM persons WHERE id = ?1", [p_id]);
      Ok((incident_delete.is_err(), person_delete.is_err()))
    })
    .await
    .unwrap();
  assert_eq!(result, (true, true));
  assert!(s.get_incident(inc.id).await.unwrap().is_some());
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn range_count_includes_the_whole_end_day() {
  let s = store().await;
  let at = |d, h, m, sec| Utc.with_ymd_and_hms(2024, 1, d, h, m, sec).unwrap();
  for (reg, when) in [
    ("INC-1", at(1, 0, 0, 0)),
    ("INC-2", at(1, 23, 0, 0)),
    ("INC-3", at(1, 23, 59, 59)),
    ("INC-4", at(2, 0, 0, 0)),
  ] {
    s.add_incident(NewIncident {
      fields:            incident(reg),
      registration_date: Some(when),
    })
    .await
    .unwrap();
  }

  let day = DateRange::parse("2024-01-01", "2024-01-01").unwrap();
  assert_eq!(incident_count_in_range(&s, &day).await.unwrap(), 3);

  let both = DateRange::parse("2024-01-01", "2024-01-02").unwrap();
  assert_eq!(incident_count_in_range(&s, &both).await.unwrap(), 4);

  let before = DateRange::parse("2023-12-01", "2023-12-31").unwrap();
  assert_eq!(incident_count_in_range(&s, &before).await.unwrap(), 0);
}

#[tokio::test]
async fn single_incident_late_in_the_day_is_counted() {
  let s = store().await;
  s.add_incident(NewIncident {
    fields:            incident("INC-001"),
    registration_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap()),
  })
  .await
  .unwrap();

  let day = DateRange::parse("2024-01-01", "2024-01-01").unwrap();
  assert_eq!(incident_count_in_range(&s, &day).await.unwrap(), 1);
}

#[tokio::test]
async fn person_count_distinguishes_unknown_from_zero() {
  let s = store().await;
  let p = s.add_person(person("P-001")).await.unwrap();

  assert_eq!(
    person_incident_count(&s, "P-404").await.unwrap(),
    PersonIncidentCount::UnknownPerson
  );
  assert_eq!(
    person_incident_count(&s, "P-001").await.unwrap(),
    PersonIncidentCount::Found { person: p.clone(), count: 0 }
  );

  for reg in ["INC-1", "INC-2"] {
    let inc = s.add_incident(incident(reg).into()).await.unwrap();
    s.add_participation(NewParticipation {
      incident_id: inc.id,
      person_id:   p.id,
      role:        "witness".into(),
    })
    .await
    .unwrap();
  }
  assert_eq!(
    person_incident_count(&s, " P-001 ").await.unwrap(),
    PersonIncidentCount::Found { person: p, count: 2 }
  );
}

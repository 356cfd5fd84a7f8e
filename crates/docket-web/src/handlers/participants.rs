//! Linking persons to incidents: the single-record form and the replace-all
//! participant editor.

use axum::{
  Form,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::Response,
};
use bytes::Bytes;
use docket_core::{
  model::{Incident, ParticipationDraft},
  participants::{RejectedEntry, edit_participants},
  store::RecordStore,
};
use minijinja::context;
use serde::Serialize;

use crate::{
  AppState,
  error::Error,
  flash::{self, Flash},
  guard::Admin,
};

/// Form field carrying one `"<person_id>:<role>"` row; repeated per row.
const PARTICIPANTS_FIELD: &str = "participants";

/// Empty rows offered below the current participants.
const BLANK_ROWS: usize = 3;

// ─── Single record ───────────────────────────────────────────────────────────

async fn add_page<S: RecordStore>(
  state: &AppState<S>,
  headers: &HeaderMap,
  principal: &Admin,
  status: StatusCode,
  draft: &ParticipationDraft,
  error: Option<String>,
) -> Result<Response, Error> {
  let incidents = state
    .store
    .list_incidents()
    .await
    .map_err(Error::from_store)?;
  let persons = state
    .store
    .list_persons()
    .await
    .map_err(Error::from_store)?;

  state.templates.page(
    headers,
    Some(&principal.user),
    status,
    "participants/add.html",
    context! {
      incidents => incidents,
      persons => persons,
      draft => draft,
      error => error,
    },
  )
}

/// `GET /incident_person/add`
pub async fn add_form<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  add_page(
    &state,
    &headers,
    &principal,
    StatusCode::OK,
    &ParticipationDraft::default(),
    None,
  )
  .await
}

/// `POST /incident_person/add`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  headers: HeaderMap,
  Form(draft): Form<ParticipationDraft>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let created = match draft.validate() {
    Ok(input) => state
      .store
      .add_participation(input)
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match created {
    Ok(participation) => {
      tracing::info!(
        incident = participation.incident_id,
        person = participation.person_id,
        role = %participation.role,
        by = %principal.user.username,
        "participation recorded"
      );
      Ok(flash::redirect("/incidents", vec![Flash::success(
        "Participation recorded.",
      )]))
    }
    Err(e) => {
      let Some(message) = e.user_message() else {
        return Err(e);
      };
      add_page(
        &state,
        &headers,
        &principal,
        StatusCode::UNPROCESSABLE_ENTITY,
        &draft,
        Some(message),
      )
      .await
    }
  }
}

// ─── Replace-all editor ──────────────────────────────────────────────────────

async fn load<S: RecordStore>(
  state: &AppState<S>,
  id: i64,
) -> Result<Incident, Error> {
  state
    .store
    .get_incident(id)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| docket_core::Error::IncidentNotFound(id).into())
}

fn edit_path(incident_id: i64) -> String {
  format!("/incident/{incident_id}/edit_participants")
}

/// A submitted row that was not stored, as shown on the editor.
#[derive(Serialize)]
struct RejectedRow {
  raw:    String,
  reason: String,
}

impl From<&RejectedEntry> for RejectedRow {
  fn from(entry: &RejectedEntry) -> Self {
    Self { raw: entry.raw.clone(), reason: entry.reason.to_string() }
  }
}

/// Render the editor with the incident's stored participants, the rows that
/// were just rejected (if any) and a count of what was saved.
async fn edit_page<S: RecordStore>(
  state: &AppState<S>,
  headers: &HeaderMap,
  principal: &Admin,
  status: StatusCode,
  incident: Incident,
  saved: Option<usize>,
  rejected: &[RejectedEntry],
) -> Result<Response, Error> {
  let participants = state
    .store
    .list_participants(incident.id)
    .await
    .map_err(Error::from_store)?;
  let persons = state
    .store
    .list_persons()
    .await
    .map_err(Error::from_store)?;

  let rows: Vec<String> = participants
    .iter()
    .map(|p| format!("{}:{}", p.person_id, p.role))
    .chain(std::iter::repeat_n(String::new(), BLANK_ROWS))
    .collect();
  let rejected: Vec<RejectedRow> =
    rejected.iter().map(RejectedRow::from).collect();

  state.templates.page(
    headers,
    Some(&principal.user),
    status,
    "participants/edit.html",
    context! {
      action => edit_path(incident.id),
      incident => incident,
      participants => participants,
      persons => persons,
      rows => rows,
      saved => saved,
      rejected => rejected,
    },
  )
}

/// `GET /incident/{id}/edit_participants`
pub async fn edit_form<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  Path(id): Path<i64>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let incident = load(&state, id).await?;
  edit_page(&state, &headers, &principal, StatusCode::OK, incident, None, &[])
    .await
}

/// `POST /incident/{id}/edit_participants`
///
/// The body is read by hand because `participants` repeats once per row.
/// When every row is stored the browser goes back to the incident list;
/// otherwise the editor is shown again, listing each rejected row with its
/// reason.
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  Path(id): Path<i64>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let rows: Vec<String> = url::form_urlencoded::parse(&body)
    .filter(|(key, _)| key == PARTICIPANTS_FIELD)
    .map(|(_, value)| value.into_owned())
    .collect();

  let outcome = edit_participants(state.store.as_ref(), id, &rows)
    .await
    .map_err(Error::from_store)?;

  tracing::info!(
    incident = id,
    stored = outcome.participants.len(),
    rejected = outcome.rejected.len(),
    by = %principal.user.username,
    "participants replaced"
  );

  let saved = outcome.participants.len();
  if outcome.rejected.is_empty() {
    return Ok(flash::redirect("/incidents", vec![Flash::success(format!(
      "Saved {saved} participant(s)."
    ))]));
  }

  let incident = load(&state, id).await?;
  edit_page(
    &state,
    &headers,
    &principal,
    StatusCode::UNPROCESSABLE_ENTITY,
    incident,
    Some(saved),
    &outcome.rejected,
  )
  .await
}

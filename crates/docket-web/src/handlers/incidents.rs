//! `/incidents` list, create and edit pages.

use axum::{
  Form,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::Response,
};
use docket_core::{
  model::{Incident, IncidentDraft, NewIncident},
  store::RecordStore,
};
use minijinja::context;

use super::form_message;
use crate::{
  AppState,
  error::Error,
  flash::{self, Flash},
  guard::{Admin, Authenticated},
};

/// `GET /incidents`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  principal: Authenticated,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let incidents = state
    .store
    .list_incidents()
    .await
    .map_err(Error::from_store)?;

  state.templates.page(
    &headers,
    Some(&principal.user),
    StatusCode::OK,
    "incidents/list.html",
    context! {
      incidents => incidents,
      can_edit => principal.user.is_administrator(),
    },
  )
}

/// The create/edit form. `incident` is set when editing.
fn form_page<S: RecordStore>(
  state: &AppState<S>,
  headers: &HeaderMap,
  principal: &Admin,
  status: StatusCode,
  incident: Option<&Incident>,
  draft: &IncidentDraft,
  error: Option<String>,
) -> Result<Response, Error> {
  let action = match incident {
    Some(incident) => format!("/incidents/edit/{}", incident.id),
    None => "/incidents/add".to_string(),
  };
  state.templates.page(
    headers,
    Some(&principal.user),
    status,
    "incidents/form.html",
    context! {
      action => action,
      incident => incident,
      draft => draft,
      error => error,
    },
  )
}

/// `GET /incidents/add`
pub async fn add_form<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  form_page(
    &state,
    &headers,
    &principal,
    StatusCode::OK,
    None,
    &IncidentDraft::default(),
    None,
  )
}

/// `POST /incidents/add`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  headers: HeaderMap,
  Form(draft): Form<IncidentDraft>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let created = match draft.validate() {
    Ok(fields) => state
      .store
      .add_incident(NewIncident::from(fields))
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match created {
    Ok(incident) => {
      tracing::info!(
        incident = incident.id,
        reg_number = %incident.reg_number,
        by = %principal.user.username,
        "incident created"
      );
      Ok(flash::redirect("/incidents", vec![Flash::success(format!(
        "Incident {} registered.",
        incident.reg_number
      ))]))
    }
    Err(e) => {
      let message = form_message(e)?;
      form_page(
        &state,
        &headers,
        &principal,
        StatusCode::UNPROCESSABLE_ENTITY,
        None,
        &draft,
        Some(message),
      )
    }
  }
}

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

/// `GET /incidents/edit/{id}`
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
  form_page(
    &state,
    &headers,
    &principal,
    StatusCode::OK,
    Some(&incident),
    &IncidentDraft::from(&incident),
    None,
  )
}

/// `POST /incidents/edit/{id}`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  Path(id): Path<i64>,
  headers: HeaderMap,
  Form(draft): Form<IncidentDraft>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let incident = load(&state, id).await?;

  let updated = match draft.validate() {
    Ok(fields) => state
      .store
      .update_incident(id, fields)
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match updated {
    Ok(incident) => {
      tracing::info!(
        incident = incident.id,
        by = %principal.user.username,
        "incident updated"
      );
      Ok(flash::redirect("/incidents", vec![Flash::success(format!(
        "Incident {} updated.",
        incident.reg_number
      ))]))
    }
    Err(e) => {
      let message = form_message(e)?;
      form_page(
        &state,
        &headers,
        &principal,
        StatusCode::UNPROCESSABLE_ENTITY,
        Some(&incident),
        &draft,
        Some(message),
      )
    }
  }
}

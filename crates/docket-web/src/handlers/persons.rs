//! `/persons` list, create and edit pages.

use axum::{
  Form,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::Response,
};
use docket_core::{
  model::{Person, PersonDraft},
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

/// `GET /persons`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  principal: Authenticated,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let persons = state
    .store
    .list_persons()
    .await
    .map_err(Error::from_store)?;

  state.templates.page(
    &headers,
    Some(&principal.user),
    StatusCode::OK,
    "persons/list.html",
    context! {
      persons => persons,
      can_edit => principal.user.is_administrator(),
    },
  )
}

/// The create/edit form. `person` is set when editing.
fn form_page<S: RecordStore>(
  state: &AppState<S>,
  headers: &HeaderMap,
  principal: &Admin,
  status: StatusCode,
  person: Option<&Person>,
  draft: &PersonDraft,
  error: Option<String>,
) -> Result<Response, Error> {
  let action = match person {
    Some(person) => format!("/persons/edit/{}", person.id),
    None => "/persons/add".to_string(),
  };
  state.templates.page(
    headers,
    Some(&principal.user),
    status,
    "persons/form.html",
    context! {
      action => action,
      person => person,
      draft => draft,
      error => error,
    },
  )
}

/// `GET /persons/add`
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
    &PersonDraft::default(),
    None,
  )
}

/// `POST /persons/add`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  headers: HeaderMap,
  Form(draft): Form<PersonDraft>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let created = match draft.validate() {
    Ok(fields) => state
      .store
      .add_person(fields)
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match created {
    Ok(person) => {
      tracing::info!(
        person = person.id,
        reg_number = %person.reg_number,
        by = %principal.user.username,
        "person created"
      );
      Ok(flash::redirect("/persons", vec![Flash::success(format!(
        "{} {} added.",
        person.first_name, person.last_name
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
) -> Result<Person, Error> {
  state
    .store
    .get_person(id)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| docket_core::Error::PersonNotFound(id).into())
}

/// `GET /persons/edit/{id}`
pub async fn edit_form<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  Path(id): Path<i64>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let person = load(&state, id).await?;
  form_page(
    &state,
    &headers,
    &principal,
    StatusCode::OK,
    Some(&person),
    &PersonDraft::from(&person),
    None,
  )
}

/// `POST /persons/edit/{id}`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  principal: Admin,
  Path(id): Path<i64>,
  headers: HeaderMap,
  Form(draft): Form<PersonDraft>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let person = load(&state, id).await?;

  let updated = match draft.validate() {
    Ok(fields) => state
      .store
      .update_person(id, fields)
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match updated {
    Ok(person) => {
      tracing::info!(
        person = person.id,
        by = %principal.user.username,
        "person updated"
      );
      Ok(flash::redirect("/persons", vec![Flash::success(format!(
        "{} {} updated.",
        person.first_name, person.last_name
      ))]))
    }
    Err(e) => {
      let message = form_message(e)?;
      form_page(
        &state,
        &headers,
        &principal,
        StatusCode::UNPROCESSABLE_ENTITY,
        Some(&person),
        &draft,
        Some(message),
      )
    }
  }
}

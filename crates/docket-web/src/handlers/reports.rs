//! The two report pages.

use axum::{
  Form,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::Response,
};
use docket_core::{
  report::{
    DateRange, PersonIncidentCount, incident_count_in_range,
    person_incident_count as count_for_person,
  },
  store::RecordStore,
};
use minijinja::context;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::Error, guard::Authenticated};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRangeForm {
  pub start_date: String,
  pub end_date:   String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonForm {
  pub person_reg_number: String,
}

// ─── Incidents in a date range ───────────────────────────────────────────────

/// `GET /reports/incident_count`
pub async fn incident_count_form<S>(
  State(state): State<AppState<S>>,
  principal: Authenticated,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  state.templates.page(
    &headers,
    Some(&principal.user),
    StatusCode::OK,
    "reports/incident_count.html",
    context! { form => DateRangeForm::default() },
  )
}

/// `POST /reports/incident_count`
pub async fn incident_count<S>(
  State(state): State<AppState<S>>,
  principal: Authenticated,
  headers: HeaderMap,
  Form(form): Form<DateRangeForm>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let range = match DateRange::parse(&form.start_date, &form.end_date) {
    Ok(range) => range,
    Err(e) => {
      return state.templates.page(
        &headers,
        Some(&principal.user),
        StatusCode::UNPROCESSABLE_ENTITY,
        "reports/incident_count.html",
        context! { form => form, error => e.to_string() },
      );
    }
  };

  let count = incident_count_in_range(state.store.as_ref(), &range)
    .await
    .map_err(Error::from_store)?;

  state.templates.page(
    &headers,
    Some(&principal.user),
    StatusCode::OK,
    "reports/incident_count.html",
    context! {
      form => form,
      count => count,
      start => range.start.to_string(),
      end => range.end.to_string(),
    },
  )
}

// ─── Incidents per person ────────────────────────────────────────────────────

/// `GET /reports/person_incident_count`
pub async fn person_incident_count_form<S>(
  State(state): State<AppState<S>>,
  principal: Authenticated,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  state.templates.page(
    &headers,
    Some(&principal.user),
    StatusCode::OK,
    "reports/person_incident_count.html",
    context! { form => PersonForm::default() },
  )
}

/// `POST /reports/person_incident_count`
pub async fn person_incident_count<S>(
  State(state): State<AppState<S>>,
  principal: Authenticated,
  headers: HeaderMap,
  Form(form): Form<PersonForm>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  if form.person_reg_number.trim().is_empty() {
    return state.templates.page(
      &headers,
      Some(&principal.user),
      StatusCode::UNPROCESSABLE_ENTITY,
      "reports/person_incident_count.html",
      context! {
        form => form,
        error => docket_core::Error::MissingField("person_reg_number").to_string(),
      },
    );
  }

  let result = count_for_person(state.store.as_ref(), &form.person_reg_number)
    .await
    .map_err(Error::from_store)?;

  let ctx = match &result {
    PersonIncidentCount::Found { person, count } => context! {
      form => form,
      person => person,
      count => count,
    },
    PersonIncidentCount::UnknownPerson => context! {
      form => form,
      unknown => true,
    },
  };

  state.templates.page(
    &headers,
    Some(&principal.user),
    StatusCode::OK,
    "reports/person_incident_count.html",
    ctx,
  )
}

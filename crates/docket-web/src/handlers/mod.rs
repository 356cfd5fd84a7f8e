//! Route handlers, one module per area of the site.

pub mod incidents;
pub mod login;
pub mod participants;
pub mod persons;
pub mod reports;

use axum::{
  extract::State,
  http::{HeaderMap, StatusCode},
  response::Response,
};
use docket_core::store::RecordStore;
use minijinja::context;

use crate::{AppState, error::Error, guard::Authenticated};

/// `GET /`
pub async fn index<S>(
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
    "index.html",
    context! {},
  )
}

/// Split a failed write into a message for the submitted form, or pass the
/// error on if the user cannot fix it by editing the form.
pub(crate) fn form_message(e: Error) -> Result<String, Error> {
  match e {
    Error::Validation(message) => Ok(message),
    e => Err(e),
  }
}

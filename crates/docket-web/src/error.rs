//! Error types and axum `IntoResponse` implementation.
//!
//! Handlers catch validation and not-found errors themselves and re-render
//! the originating form. Whatever reaches `into_response` is turned into a
//! redirect (denials) or a plain error page; storage failures are logged and
//! never shown to the user.

use axum::{
  http::StatusCode,
  response::{Html, IntoResponse, Response},
};
use docket_core::{access::Denial, store::StoreError};
use thiserror::Error;

use crate::flash::{self, Flash};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid username or password")]
  InvalidCredentials,
  #[error(transparent)]
  Denied(#[from] Denial),
  #[error("{0}")]
  Validation(String),
  #[error("{0}")]
  NotFound(String),
  #[error("password hashing error: {0}")]
  PasswordHash(String),
  #[error("template error: {0}")]
  Template(#[from] minijinja::Error),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Classify a store failure: domain errors become user-facing variants,
  /// everything else is a storage error.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    match e.domain() {
      Some(d) if d.is_validation() => Self::Validation(d.to_string()),
      Some(d) if d.is_not_found() => Self::NotFound(d.to_string()),
      _ => Self::Store(Box::new(e)),
    }
  }

  /// Message shown on the form that caused this error, if it is one a user
  /// can correct.
  pub fn user_message(&self) -> Option<String> {
    match self {
      Self::Validation(m) | Self::NotFound(m) => Some(m.clone()),
      _ => None,
    }
  }
}

impl From<docket_core::Error> for Error {
  fn from(e: docket_core::Error) -> Self {
    if e.is_not_found() {
      Self::NotFound(e.to_string())
    } else {
      Self::Validation(e.to_string())
    }
  }
}

fn error_page(status: StatusCode, title: &str) -> Response {
  let body = format!(
    "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
     </head><body><h1>{title}</h1><p><a href=\"/\">Back to the start page</a>\
     </p></body></html>"
  );
  (status, Html(body)).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Denied(Denial::AuthenticationRequired) => flash::redirect(
        "/login",
        vec![Flash::info("Please sign in to access this page.")],
      ),
      Error::Denied(Denial::InsufficientPrivileges) => flash::redirect(
        "/",
        vec![Flash::warning(
          "Insufficient privileges: you may not perform this action.",
        )],
      ),
      Error::InvalidCredentials => flash::redirect(
        "/login",
        vec![Flash::danger(
          "Unable to sign in with the given username and password.",
        )],
      ),
      Error::Validation(_) => {
        error_page(StatusCode::UNPROCESSABLE_ENTITY, "Invalid input")
      }
      Error::NotFound(_) => error_page(StatusCode::NOT_FOUND, "Not found"),
      e @ (Error::PasswordHash(_) | Error::Template(_) | Error::Store(_)) => {
        tracing::error!(error = %e, "request failed");
        error_page(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
      }
    }
  }
}

/// Failures while building [`crate::AppState`] at startup.
#[derive(Debug, Error)]
pub enum SetupError {
  #[error("secret_key must be at least 32 bytes long")]
  SecretTooShort,
  #[error("invalid secret key: {0}")]
  InvalidKey(#[from] hmac::digest::InvalidLength),
  #[error("failed to compile templates: {0}")]
  Templates(#[from] minijinja::Error),
}

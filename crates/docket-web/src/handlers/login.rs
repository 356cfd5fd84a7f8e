//! `/login` and `/logout`.

use axum::{
  Form,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::Response,
};
use docket_core::store::RecordStore;
use minijinja::context;
use serde::Deserialize;

use crate::{
  AppState, auth,
  error::Error,
  flash::{self, Flash},
  guard::MaybeUser,
  session::{self, SESSION_COOKIE, expired_cookie},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
  pub username:    String,
  pub password:    String,
  /// Present (usually as `"on"`) when the box is ticked.
  pub remember_me: Option<String>,
}

/// `GET /login`
pub async fn form<S>(
  State(state): State<AppState<S>>,
  MaybeUser(user): MaybeUser,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  if user.is_some() {
    return Ok(flash::redirect("/", Vec::new()));
  }
  state.templates.page(
    &headers,
    None,
    StatusCode::OK,
    "login.html",
    context! { username => "" },
  )
}

/// `POST /login`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Form(form): Form<LoginForm>,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let username = form.username.as_str();
  let remember = form.remember_me.is_some();

  match auth::login(&state, username, &form.password, remember).await {
    Ok(logged_in) => {
      // A session the browser already held is replaced, not left behind.
      if let Some(previous) = session::session_id(&state, &headers) {
        auth::logout(&state, &previous).await?;
      }
      tracing::info!(
        user = %logged_in.user.username,
        role = %logged_in.user.role.name,
        persistent = remember,
        "user signed in"
      );
      let mut response = flash::redirect("/", vec![Flash::success(format!(
        "Welcome, {}!",
        logged_in.user.first_name
      ))]);
      flash::append_cookie(&mut response, &logged_in.cookie);
      Ok(response)
    }
    Err(Error::InvalidCredentials) => {
      tracing::warn!(user = %username, "failed sign-in attempt");
      state.templates.page(
        &headers,
        None,
        StatusCode::OK,
        "login.html",
        context! {
          username => username,
          error => "Unable to sign in with the given username and password.",
        },
      )
    }
    Err(e) => Err(e),
  }
}

/// `GET /logout`
///
/// Always clears the session cookie, even when the session behind it is
/// already gone.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + 'static,
{
  let Some(session_id) = session::session_id(&state, &headers) else {
    let mut response = flash::redirect("/login", Vec::new());
    if session::cookie_value(&headers, SESSION_COOKIE).is_some() {
      flash::append_cookie(&mut response, &expired_cookie(SESSION_COOKIE));
    }
    return Ok(response);
  };

  let principal = session::current_principal(&state, &headers).await?;
  auth::logout(&state, &session_id).await?;
  let flashes = match principal {
    Some((_, user)) => {
      tracing::info!(user = %user.username, "user signed out");
      vec![Flash::info("You have been signed out.")]
    }
    None => {
      tracing::debug!("cleared a stale session cookie");
      Vec::new()
    }
  };

  let mut response = flash::redirect("/login", flashes);
  flash::append_cookie(&mut response, &expired_cookie(SESSION_COOKIE));
  Ok(response)
}

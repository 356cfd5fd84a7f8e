//! HTML rendering with minijinja.
//!
//! Templates are compiled into the binary. Every page gets `current_user` and
//! the pending `flashes` merged into its context.

use axum::{
  http::{HeaderMap, StatusCode},
  response::{Html, IntoResponse, Response},
};
use docket_core::model::User;
use minijinja::{Environment, Value, context};

use crate::{
  error::Error,
  flash::{self, FLASH_COOKIE},
  session::cookie_value,
};

const TEMPLATES: &[(&str, &str)] = &[
  ("base.html", include_str!("../templates/base.html")),
  ("index.html", include_str!("../templates/index.html")),
  ("login.html", include_str!("../templates/login.html")),
  ("incidents/list.html", include_str!("../templates/incidents/list.html")),
  ("incidents/form.html", include_str!("../templates/incidents/form.html")),
  ("persons/list.html", include_str!("../templates/persons/list.html")),
  ("persons/form.html", include_str!("../templates/persons/form.html")),
  ("participants/add.html", include_str!("../templates/participants/add.html")),
  (
    "participants/edit.html",
    include_str!("../templates/participants/edit.html"),
  ),
  (
    "reports/incident_count.html",
    include_str!("../templates/reports/incident_count.html"),
  ),
  (
    "reports/person_incident_count.html",
    include_str!("../templates/reports/person_incident_count.html"),
  ),
];

/// The compiled template set.
pub struct Templates {
  env: Environment<'static>,
}

impl Templates {
  pub fn load() -> Result<Self, minijinja::Error> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
      env.add_template(name, source)?;
    }
    Ok(Self { env })
  }

  pub fn render(&self, name: &str, ctx: Value) -> Result<String, Error> {
    Ok(self.env.get_template(name)?.render(ctx)?)
  }

  /// Render `name` as a full page for `user`, consuming any pending flash
  /// messages on the request.
  pub fn page(
    &self,
    headers: &HeaderMap,
    user: Option<&User>,
    status: StatusCode,
    name: &str,
    ctx: Value,
  ) -> Result<Response, Error> {
    let flashes = flash::take(headers);
    let html = self.render(
      name,
      context! {
        current_user => user,
        flashes => flashes,
        ..ctx
      },
    )?;

    let mut response = (status, Html(html)).into_response();
    if cookie_value(headers, FLASH_COOKIE).is_some() {
      flash::append_cookie(&mut response, &flash::clear_cookie());
    }
    Ok(response)
  }
}

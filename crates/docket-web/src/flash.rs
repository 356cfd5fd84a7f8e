//! One-shot messages carried across a redirect in a cookie.

use axum::{
  http::{HeaderMap, HeaderValue, header},
  response::{IntoResponse, Redirect, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use serde::{Deserialize, Serialize};

use crate::session::{cookie_value, expired_cookie};

pub const FLASH_COOKIE: &str = "docket_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Info,
  Success,
  Warning,
  Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
  pub level:   Level,
  pub message: String,
}

impl Flash {
  pub fn info(message: impl Into<String>) -> Self {
    Self { level: Level::Info, message: message.into() }
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self { level: Level::Success, message: message.into() }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self { level: Level::Warning, message: message.into() }
  }

  pub fn danger(message: impl Into<String>) -> Self {
    Self { level: Level::Danger, message: message.into() }
  }
}

fn encode(flashes: &[Flash]) -> Option<String> {
  serde_json::to_vec(flashes).ok().map(|json| B64.encode(json))
}

fn decode(value: &str) -> Option<Vec<Flash>> {
  let json = B64.decode(value).ok()?;
  serde_json::from_slice(&json).ok()
}

/// Pending messages on this request. Unreadable cookies yield nothing.
pub fn take(headers: &HeaderMap) -> Vec<Flash> {
  cookie_value(headers, FLASH_COOKIE)
    .and_then(decode)
    .unwrap_or_default()
}

/// `Set-Cookie` value that clears the pending messages.
pub fn clear_cookie() -> String { expired_cookie(FLASH_COOKIE) }

/// Append a `Set-Cookie` header if `cookie` is a valid header value.
pub fn append_cookie(response: &mut Response, cookie: &str) {
  if let Ok(value) = HeaderValue::from_str(cookie) {
    response.headers_mut().append(header::SET_COOKIE, value);
  }
}

/// 303 redirect to `to`, carrying `flashes` to the next page.
pub fn redirect(to: &str, flashes: Vec<Flash>) -> Response {
  let mut response = Redirect::to(to).into_response();
  if flashes.is_empty() {
    return response;
  }
  if let Some(encoded) = encode(&flashes) {
    append_cookie(
      &mut response,
      &format!("{FLASH_COOKIE}={encoded}; Path=/; HttpOnly; SameSite=Lax"),
    );
  }
  response
}

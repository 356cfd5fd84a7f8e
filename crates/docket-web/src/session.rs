//! Signed session cookies.
//!
//! The cookie carries `<session_id>.<hex HMAC-SHA256(secret_key, session_id)>`.
//! The session row itself lives in the store; the signature only stops a
//! client from probing for session ids.

use axum::http::{HeaderMap, header};
use chrono::Utc;
use docket_core::{
  model::{Session, User},
  store::RecordStore,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{AppState, error::Error};

pub const SESSION_COOKIE: &str = "docket_session";

type HmacSha256 = Hmac<Sha256>;

// ─── Signing ─────────────────────────────────────────────────────────────────

/// Signs and verifies session tokens with the configured secret.
#[derive(Clone)]
pub struct SessionKey {
  mac: HmacSha256,
}

impl SessionKey {
  pub fn new(secret: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
    Ok(Self { mac: HmacSha256::new_from_slice(secret)? })
  }

  /// `"<id>.<hex signature>"`.
  pub fn sign(&self, session_id: &str) -> String {
    let mut mac = self.mac.clone();
    mac.update(session_id.as_bytes());
    let sig = hex::encode(mac.finalize().into_bytes());
    format!("{session_id}.{sig}")
  }

  /// The session id inside `token`, if the signature matches.
  pub fn verify(&self, token: &str) -> Option<String> {
    let (session_id, sig) = token.rsplit_once('.')?;
    let sig = hex::decode(sig).ok()?;
    let mut mac = self.mac.clone();
    mac.update(session_id.as_bytes());
    mac.verify_slice(&sig).ok()?;
    Some(session_id.to_owned())
  }
}

// ─── Cookie headers ──────────────────────────────────────────────────────────

/// Value of the cookie `name` in the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v)
}

/// `Set-Cookie` value for a freshly issued session. Persistent sessions get a
/// `Max-Age`; the others end with the browser session.
pub fn session_cookie(token: &str, max_age_secs: Option<i64>) -> String {
  let mut cookie =
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
  if let Some(secs) = max_age_secs {
    cookie.push_str(&format!("; Max-Age={secs}"));
  }
  cookie
}

/// `Set-Cookie` value that removes `name` from the browser.
pub fn expired_cookie(name: &str) -> String {
  format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// ─── Principal ───────────────────────────────────────────────────────────────

/// The session id carried by the request's cookie, if its signature is valid.
/// The session itself may be unknown or expired.
pub fn session_id<S: RecordStore>(
  state: &AppState<S>,
  headers: &HeaderMap,
) -> Option<String> {
  cookie_value(headers, SESSION_COOKIE)
    .and_then(|token| state.sessions.verify(token))
}

/// Resolve the session and user behind the request's session cookie.
///
/// Yields `None` for a missing or forged cookie, an unknown or expired
/// session, or a user that no longer exists. Expired sessions are deleted on
/// sight.
pub async fn current_principal<S: RecordStore>(
  state: &AppState<S>,
  headers: &HeaderMap,
) -> Result<Option<(Session, User)>, Error> {
  let Some(session_id) = session_id(state, headers) else {
    return Ok(None);
  };

  let Some(session) = state
    .store
    .get_session(session_id)
    .await
    .map_err(Error::from_store)?
  else {
    return Ok(None);
  };

  if session.is_expired(Utc::now()) {
    state
      .store
      .delete_session(session.session_id)
      .await
      .map_err(Error::from_store)?;
    return Ok(None);
  }

  let user = state
    .store
    .get_user(session.user_id)
    .await
    .map_err(Error::from_store)?;
  Ok(user.map(|user| (session, user)))
}

//! Password hashing, login and logout.

use std::sync::LazyLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use chrono::{Duration, Utc};
use docket_core::{
  model::{Session, User},
  store::RecordStore,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{AppState, error::Error, session};

/// Hash `password` into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Check `password` against a stored PHC string. Unparseable hashes never
/// match.
pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// Verified against when the username is unknown, so both failure paths cost
/// one argon2 verification. Built by [`warm_up`] at startup rather than on
/// the first failed login.
static DUMMY_HASH: LazyLock<String> =
  LazyLock::new(|| hash_password("docket-dummy-password").unwrap_or_default());

/// Compute the hash used for unknown usernames.
pub(crate) fn warm_up() { LazyLock::force(&DUMMY_HASH); }

/// A successful login.
pub struct LoggedIn {
  pub session: Session,
  pub user:    User,
  /// `Set-Cookie` value for the session cookie.
  pub cookie:  String,
}

/// Authenticate `username`/`password` and open a session.
///
/// Both an unknown username and a wrong password yield
/// [`Error::InvalidCredentials`].
pub async fn login<S: RecordStore>(
  state: &AppState<S>,
  username: &str,
  password: &str,
  remember: bool,
) -> Result<LoggedIn, Error> {
  let user = state
    .store
    .find_user_by_username(username.to_owned())
    .await
    .map_err(Error::from_store)?;

  let user = match user {
    Some(user) if verify_password(password, &user.password_hash) => user,
    Some(_) => return Err(Error::InvalidCredentials),
    None => {
      verify_password(password, &DUMMY_HASH);
      return Err(Error::InvalidCredentials);
    }
  };

  let now = Utc::now();
  let purged = state
    .store
    .purge_expired_sessions(now)
    .await
    .map_err(Error::from_store)?;
  if purged > 0 {
    tracing::debug!(purged, "removed expired sessions");
  }

  let (lifetime, max_age) = if remember {
    let lifetime = Duration::days(state.config.remember_days);
    (lifetime, Some(lifetime.num_seconds()))
  } else {
    (Duration::minutes(state.config.session_ttl_minutes), None)
  };

  let session = Session {
    session_id: Uuid::new_v4().to_string(),
    user_id:    user.id,
    created_at: now,
    expires_at: now + lifetime,
    persistent: remember,
  };
  state
    .store
    .create_session(session.clone())
    .await
    .map_err(Error::from_store)?;

  let cookie = session::session_cookie(
    &state.sessions.sign(&session.session_id),
    max_age,
  );
  Ok(LoggedIn { session, user, cookie })
}

/// End `session_id`. Ending a session that no longer exists is not an error.
pub async fn logout<S: RecordStore>(
  state: &AppState<S>,
  session_id: &str,
) -> Result<(), Error> {
  state
    .store
    .delete_session(session_id.to_owned())
    .await
    .map_err(Error::from_store)
}

//! Role-gated extractors.
//!
//! A handler states who may call it in its signature: taking an
//! [`Authenticated`] admits any signed-in user, taking an [`Admin`] admits
//! administrators only. Rejected requests never reach the handler body, so a
//! denied request cannot write anything.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use docket_core::{
  access::{RoleSet, require_role},
  model::{Session, User},
  store::RecordStore,
};

use crate::{AppState, error::Error, session::current_principal};

/// The roles an endpoint admits.
pub trait Policy {
  const ALLOWED: RoleSet;
}

pub struct AnyRole;

impl Policy for AnyRole {
  const ALLOWED: RoleSet = RoleSet::ANY;
}

pub struct AdministratorOnly;

impl Policy for AdministratorOnly {
  const ALLOWED: RoleSet = RoleSet::ADMINISTRATORS;
}

/// A principal admitted by `P`.
pub struct Authorized<P> {
  pub user:    User,
  pub session: Session,
  _policy:     PhantomData<P>,
}

pub type Authenticated = Authorized<AnyRole>;
pub type Admin = Authorized<AdministratorOnly>;

impl<S, P> FromRequestParts<AppState<S>> for Authorized<P>
where
  S: RecordStore + Clone + 'static,
  P: Policy,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let principal = current_principal(state, &parts.headers).await?;
    if let Err(denial) =
      require_role(principal.as_ref().map(|(_, user)| user), P::ALLOWED)
    {
      tracing::info!(
        path = %parts.uri.path(),
        user = principal.as_ref().map(|(_, u)| u.username.as_str()),
        %denial,
        "request denied"
      );
      return Err(denial.into());
    }
    let Some((session, user)) = principal else {
      return Err(docket_core::access::Denial::AuthenticationRequired.into());
    };
    Ok(Self { user, session, _policy: PhantomData })
  }
}

/// The signed-in user, if any. Never rejects.
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<AppState<S>> for MaybeUser
where
  S: RecordStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let principal = current_principal(state, &parts.headers).await?;
    Ok(Self(principal.map(|(_, user)| user)))
  }
}

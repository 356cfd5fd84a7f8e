//! Role names and the role gate applied to every protected operation.
//!
//! Roles form a closed set. Each endpoint declares the roles it admits as a
//! [`RoleSet`] constant, and [`require_role`] decides whether a principal may
//! proceed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::User;

// ─── Role names ──────────────────────────────────────────────────────────────

/// The roles a user can hold. Stored by name in the `roles` table.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoleName {
  /// Full access, including every create and edit screen.
  Administrator,
  /// Read-only access to lists and reports.
  User,
}

impl RoleName {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Description seeded alongside the role.
  pub fn default_description(self) -> &'static str {
    match self {
      Self::Administrator => "Superuser with full access to the system",
      Self::User => "Can view records and reports",
    }
  }

  const fn bit(self) -> u8 {
    match self {
      Self::Administrator => 1 << 0,
      Self::User => 1 << 1,
    }
  }
}

// ─── Role sets ───────────────────────────────────────────────────────────────

/// A set of [`RoleName`]s, buildable in `const` context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
  pub const EMPTY: Self = Self(0);
  /// Every role; used by endpoints that only need an authenticated user.
  pub const ANY: Self = Self::of(&[RoleName::Administrator, RoleName::User]);
  pub const ADMINISTRATORS: Self = Self::of(&[RoleName::Administrator]);

  pub const fn of(roles: &[RoleName]) -> Self {
    let mut bits = 0;
    let mut i = 0;
    while i < roles.len() {
      bits |= roles[i].bit();
      i += 1;
    }
    Self(bits)
  }

  pub const fn contains(self, role: RoleName) -> bool {
    self.0 & role.bit() != 0
  }
}

// ─── Gate ────────────────────────────────────────────────────────────────────

/// Why a principal was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
  #[error("authentication required")]
  AuthenticationRequired,
  #[error("insufficient privileges")]
  InsufficientPrivileges,
}

/// Admit `principal` if it is present and holds one of `allowed`.
pub fn require_role(
  principal: Option<&User>,
  allowed: RoleSet,
) -> Result<(), Denial> {
  let user = principal.ok_or(Denial::AuthenticationRequired)?;
  if allowed.contains(user.role.name) {
    Ok(())
  } else {
    Err(Denial::InsufficientPrivileges)
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;
  use crate::model::Role;

  fn user_with(role: RoleName) -> User {
    User {
      id:            1,
      username:      "someone".into(),
      password_hash: String::new(),
      first_name:    "Some".into(),
      last_name:     "One".into(),
      middle_name:   None,
      role:          Role {
        id:          1,
        name:        role,
        description: None,
      },
    }
  }

  #[test]
  fn anonymous_is_told_to_authenticate() {
    for allowed in [RoleSet::ANY, RoleSet::ADMINISTRATORS, RoleSet::EMPTY] {
      assert_eq!(
        require_role(None, allowed),
        Err(Denial::AuthenticationRequired)
      );
    }
  }

  #[test]
  fn administrator_only_gate() {
    let admin = user_with(RoleName::Administrator);
    let viewer = user_with(RoleName::User);
    assert_eq!(require_role(Some(&admin), RoleSet::ADMINISTRATORS), Ok(()));
    assert_eq!(
      require_role(Some(&viewer), RoleSet::ADMINISTRATORS),
      Err(Denial::InsufficientPrivileges)
    );
  }

  #[test]
  fn any_role_admits_every_authenticated_user() {
    for role in RoleName::iter() {
      assert_eq!(require_role(Some(&user_with(role)), RoleSet::ANY), Ok(()));
    }
  }

  #[test]
  fn denial_messages() {
    assert_eq!(
      Denial::AuthenticationRequired.to_string(),
      "authentication required"
    );
    assert_eq!(
      Denial::InsufficientPrivileges.to_string(),
      "insufficient privileges"
    );
  }

  #[test]
  fn role_names_round_trip_through_strings() {
    assert_eq!(RoleName::Administrator.as_str(), "administrator");
    assert_eq!(RoleName::from_str("user").unwrap(), RoleName::User);
    assert!(RoleName::from_str("Administrator").is_err());
  }
}

//! Error types for `docket-core`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("{field}: {reason}")]
  InvalidField {
    field:  &'static str,
    reason: String,
  },

  #[error("duplicate registration number: {0}")]
  DuplicateRegNumber(String),

  #[error("username already taken: {0}")]
  DuplicateUsername(String),

  #[error("incident not found: {0}")]
  IncidentNotFound(i64),

  #[error("person not found: {0}")]
  PersonNotFound(i64),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("role not found: {0}")]
  RoleNotFound(String),

  #[error("invalid date {0:?}; expected YYYY-MM-DD")]
  InvalidDate(String),
}

impl Error {
  /// Bad or missing input, including duplicate unique keys.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::MissingField(_)
        | Self::InvalidField { .. }
        | Self::DuplicateRegNumber(_)
        | Self::DuplicateUsername(_)
        | Self::InvalidDate(_)
    )
  }

  /// A referenced row does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::IncidentNotFound(_)
        | Self::PersonNotFound(_)
        | Self::UserNotFound(_)
        | Self::RoleNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

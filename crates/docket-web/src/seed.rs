//! First-run population: the roles and the two default accounts.

use docket_core::{access::RoleName, model::NewUser, store::RecordStore};
use strum::IntoEnumIterator;

use crate::{auth::hash_password, error::Error};

struct DefaultAccount {
  username:    &'static str,
  password:    &'static str,
  first_name:  &'static str,
  last_name:   &'static str,
  middle_name: &'static str,
  role:        RoleName,
}

const DEFAULT_ACCOUNTS: &[DefaultAccount] = &[
  DefaultAccount {
    username:    "admin",
    password:    "admin",
    first_name:  "Polina",
    last_name:   "Filippova",
    middle_name: "Vladimirovna",
    role:        RoleName::Administrator,
  },
  DefaultAccount {
    username:    "user",
    password:    "user",
    first_name:  "Ekaterina",
    last_name:   "Baranova",
    middle_name: "Ivanovna",
    role:        RoleName::User,
  },
];

/// What [`populate`] created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Seeded {
  pub users: usize,
}

/// Ensure every role exists, and create the default accounts if the store has
/// no users at all. Safe to run on every start.
pub async fn populate<S: RecordStore>(store: &S) -> Result<Seeded, Error> {
  for name in RoleName::iter() {
    store
      .ensure_role(name, Some(name.default_description().to_owned()))
      .await
      .map_err(Error::from_store)?;
  }

  if store.count_users().await.map_err(Error::from_store)? > 0 {
    tracing::debug!("users present, skipping default accounts");
    return Ok(Seeded::default());
  }

  for account in DEFAULT_ACCOUNTS {
    store
      .add_user(NewUser {
        username:      account.username.to_owned(),
        password_hash: hash_password(account.password)?,
        first_name:    account.first_name.to_owned(),
        last_name:     account.last_name.to_owned(),
        middle_name:   Some(account.middle_name.to_owned()),
        role:          account.role,
      })
      .await
      .map_err(Error::from_store)?;
    tracing::info!(
      user = account.username,
      role = %account.role,
      "created default account"
    );
  }

  Ok(Seeded { users: DEFAULT_ACCOUNTS.len() })
}

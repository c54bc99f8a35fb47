//! The users file: username → argon2 PHC hash.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::RwLock,
};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;

use crate::error::ApiError;

/// Credentials accepted by `POST /token`, loaded from a JSON file mapping
/// usernames to argon2 PHC strings. Plaintext passwords never touch disk.
pub struct UserRegistry {
  path:  Option<PathBuf>,
  users: RwLock<HashMap<String, String>>,
}

impl UserRegistry {
  /// Load the users file; a missing file yields an empty registry that
  /// `add_user` will create on first write.
  pub fn load(path: &Path) -> Result<Self, ApiError> {
    let users = if path.exists() {
      let raw = std::fs::read_to_string(path)
        .map_err(|e| ApiError::Internal(format!("reading users file: {e}")))?;
      serde_json::from_str(&raw)
        .map_err(|e| ApiError::Internal(format!("parsing users file: {e}")))?
    } else {
      HashMap::new()
    };
    Ok(Self {
      path:  Some(path.to_path_buf()),
      users: RwLock::new(users),
    })
  }

  /// An in-memory registry; `add_user` mutates only the cache. Used by
  /// tests and by deployments that provision users out of band.
  pub fn from_entries(entries: HashMap<String, String>) -> Self {
    Self { path: None, users: RwLock::new(entries) }
  }

  /// Produce an argon2 PHC string for a password.
  pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(
      Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("argon2: {e}")))?
        .to_string(),
    )
  }

  /// Constant-shape credential check: unknown user and wrong password are
  /// indistinguishable to the caller.
  pub fn verify(&self, username: &str, password: &str) -> bool {
    let users = match self.users.read() {
      Ok(guard) => guard,
      Err(_) => return false,
    };
    let Some(hash) = users.get(username) else {
      return false;
    };
    let Ok(parsed) = PasswordHash::new(hash) else {
      return false;
    };
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  }

  /// Register a new user, hashing the password and persisting the file when
  /// one is configured. Fails with `Conflict` if the login is taken.
  pub fn add_user(&self, username: &str, password: &str) -> Result<(), ApiError> {
    let hash = Self::hash_password(password)?;
    {
      let mut users = self
        .users
        .write()
        .map_err(|_| ApiError::Internal("users lock poisoned".to_string()))?;
      if users.contains_key(username) {
        return Err(ApiError::Conflict(format!("user {username:?} already exists")));
      }
      users.insert(username.to_string(), hash);
    }
    self.save()
  }

  fn save(&self) -> Result<(), ApiError> {
    let Some(path) = &self.path else {
      return Ok(());
    };
    let users = self
      .users
      .read()
      .map_err(|_| ApiError::Internal("users lock poisoned".to_string()))?;
    let body = serde_json::to_string_pretty(&*users)
      .map_err(|e| ApiError::Internal(e.to_string()))?;
    std::fs::write(path, body)
      .map_err(|e| ApiError::Internal(format!("writing users file: {e}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registry_with(username: &str, password: &str) -> UserRegistry {
    let mut entries = HashMap::new();
    entries.insert(
      username.to_string(),
      UserRegistry::hash_password(password).unwrap(),
    );
    UserRegistry::from_entries(entries)
  }

  #[test]
  fn verify_accepts_the_right_password_only() {
    let registry = registry_with("alice", "secret");
    assert!(registry.verify("alice", "secret"));
    assert!(!registry.verify("alice", "wrong"));
    assert!(!registry.verify("bob", "secret"));
  }

  #[test]
  fn add_user_rejects_taken_logins() {
    let registry = registry_with("alice", "secret");
    assert!(registry.add_user("bob", "hunter2").is_ok());
    assert!(registry.verify("bob", "hunter2"));
    assert!(matches!(
      registry.add_user("alice", "again"),
      Err(ApiError::Conflict(_))
    ));
  }
}

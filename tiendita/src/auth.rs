//! Password hashing and the optional seed-users file.
//!
//! Passwords are stored as argon2id PHC strings (salt embedded); verification
//! is the one-way comparison, never an equality check against a stored value.
//!
//! ## Seed file format
//!
//! **Single user (flat):**
//! ```toml
//! username = "admin"
//! password = "secret"
//! ```
//!
//! **Multiple users (array):**
//! ```toml
//! [[users]]
//! username = "alice"
//! password = "pw1"
//!
//! [[users]]
//! username = "bob"
//! password = "pw2"
//! ```
//!
//! Both can be combined; the single `username`/`password` pair is merged with
//! `[[users]]`. Duplicate usernames are deduplicated (last wins). Empty
//! usernames or passwords are skipped.
//!
//! **Security:** Use `chmod 600` on the seed file. The server warns if it is
//! world-readable (Unix).

use std::collections::BTreeMap;
use std::path::Path;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to hash password")]
    Hash,
}

/// Hash a password into an argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hash)
}

/// Verify a password against a stored PHC string. An unparseable stored hash
/// counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("stored credential is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum SeedFileError {
    #[error("failed to read users file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid users file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("users file {path} does not define valid credentials")]
    EmptyCredentials { path: String },
}

#[derive(Debug, Default, Deserialize)]
struct SeedFile {
    username: Option<String>,
    password: Option<String>,
    users: Option<Vec<SeedUserEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
struct SeedUserEntry {
    username: String,
    password: String,
}

/// Load seed users from a TOML file. Requires at least one valid credential.
/// Warns if the file is world-readable (Unix only).
pub fn load_seed_users(path: &Path) -> Result<Vec<SeedUser>, SeedFileError> {
    check_seed_file_permissions(path);

    let raw = std::fs::read_to_string(path).map_err(|source| SeedFileError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let parsed: SeedFile = toml::from_str(&raw).map_err(|source| SeedFileError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let mut entries = Vec::new();
    if let (Some(username), Some(password)) = (parsed.username, parsed.password) {
        entries.push(SeedUser { username, password });
    }
    if let Some(more) = parsed.users {
        entries.extend(more.into_iter().map(|entry| SeedUser {
            username: entry.username,
            password: entry.password,
        }));
    }

    let users = merge_seed_users(entries);
    if users.is_empty() {
        return Err(SeedFileError::EmptyCredentials {
            path: path.display().to_string(),
        });
    }
    Ok(users)
}

/// Trim, drop blank entries, deduplicate by username (last wins).
fn merge_seed_users(entries: Vec<SeedUser>) -> Vec<SeedUser> {
    let mut mapped = BTreeMap::new();
    for entry in entries {
        let username = entry.username.trim().to_string();
        let password = entry.password.trim().to_string();
        if username.is_empty() || password.is_empty() {
            continue;
        }
        mapped.insert(username, password);
    }

    mapped
        .into_iter()
        .map(|(username, password)| SeedUser { username, password })
        .collect::<Vec<_>>()
}

/// Warn if the seed file is world-readable. No-op on non-Unix.
#[cfg(unix)]
fn check_seed_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = std::fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o004 != 0 {
            warn!(
                path = %path.display(),
                "users file is world-readable; consider chmod 600"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_seed_file_permissions(_path: &Path) {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{hash_password, load_seed_users, merge_seed_users, verify_password, SeedUser};

    #[test]
    fn hashed_password_verifies_and_rejects_wrong_input() -> Result<()> {
        let hash = hash_password("correct horse")?;

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        Ok(())
    }

    #[test]
    fn verify_rejects_malformed_stored_hash() {
        assert!(!verify_password("anything", "plaintext-not-a-hash"));
    }

    #[test]
    fn merge_deduplicates_users_last_wins() {
        let users = merge_seed_users(vec![
            SeedUser {
                username: String::from("alice"),
                password: String::from("pw1"),
            },
            SeedUser {
                username: String::from("alice"),
                password: String::from("pw2"),
            },
            SeedUser {
                username: String::from("bob"),
                password: String::from("pw3"),
            },
        ]);

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].password, "pw2");
        assert_eq!(users[1].username, "bob");
    }

    #[test]
    fn seed_file_parses_single_and_list_users() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("users.toml");
        std::fs::write(
            &path,
            "username = \"alice\"\npassword = \"pw1\"\n[[users]]\nusername = \"bob\"\npassword = \"pw2\"\n",
        )?;

        let users = load_seed_users(&path)?;

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].password, "pw1");
        assert_eq!(users[1].username, "bob");
        assert_eq!(users[1].password, "pw2");
        Ok(())
    }

    #[test]
    fn seed_file_rejects_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.toml");
        std::fs::write(&path, "").unwrap();

        assert!(load_seed_users(&path).is_err());
    }

    #[test]
    fn seed_file_rejects_only_blank_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.toml");
        std::fs::write(&path, "username = \"\"\npassword = \"\"\n").unwrap();

        assert!(load_seed_users(&path).is_err());
    }
}

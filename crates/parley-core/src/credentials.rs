//! Credential store — an append-only, line-oriented text file.
//!
//! One `username:cipheredSecret` pair per line. Secrets are obscured with
//! the shared substitution codec before they hit disk; that is obfuscation,
//! not hashing, and the file must not be treated as secure storage.
//!
//! A missing file reads as an empty store.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cipher;

/// Separator between username and secret on each line.
const FIELD_SEP: char = ':';

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to append to {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("username {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("username may not be empty or contain {FIELD_SEP:?}")]
    BadUsername,
}

/// Handle on the credential file. Cheap to construct, stateless between calls.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    shift: u8,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, shift: u8) -> Self {
        Self {
            path: path.into(),
            shift,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Is this username already registered?
    pub fn exists(&self, username: &str) -> Result<bool, CredentialError> {
        Ok(self.lookup(username)?.is_some())
    }

    /// Check a username/password pair against the stored ciphered secret.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        match self.lookup(username)? {
            Some(ciphered) => Ok(cipher::decode(&ciphered, self.shift) == password),
            None => Ok(false),
        }
    }

    /// Append a new user, ciphering the secret before it is written.
    pub fn register(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        if username.is_empty() || username.contains(FIELD_SEP) {
            return Err(CredentialError::BadUsername);
        }
        if self.exists(username)? {
            return Err(CredentialError::AlreadyRegistered(username.to_string()));
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CredentialError::WriteFailed(self.path.clone(), e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CredentialError::WriteFailed(self.path.clone(), e))?;
        let ciphered = cipher::encode(password, self.shift);
        writeln!(file, "{username}{FIELD_SEP}{ciphered}")
            .map_err(|e| CredentialError::WriteFailed(self.path.clone(), e))?;
        Ok(())
    }

    /// Find the stored (still ciphered) secret for a username.
    fn lookup(&self, username: &str) -> Result<Option<String>, CredentialError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CredentialError::ReadFailed(self.path.clone(), e)),
        };
        for line in text.lines() {
            if let Some((name, secret)) = line.split_once(FIELD_SEP) {
                if name == username {
                    return Ok(Some(secret.to_string()));
                }
            }
        }
        Ok(None)
    }
}

//! Persistent holder for the bearer token and the signed-in username.

use std::error::Error;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use keyring::Entry;

use crate::core::constants::{KEYRING_SERVICE, TOKEN_ACCOUNT, USERNAME_ACCOUNT};

/// A snapshot of what the store currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub token: Option<String>,
    pub username: Option<String>,
}

/// Describes failures when reading or writing the credential backend.
///
/// Recoverable errors mean the platform keychain was temporarily
/// unavailable (for example a locked secret service). Permanent errors
/// surface the underlying cause so callers can report it.
#[derive(Debug)]
pub enum CredentialError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl CredentialError {
    fn inner(&self) -> &keyring::Error {
        match self {
            CredentialError::Recoverable(err) | CredentialError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, CredentialError::Recoverable(_))
    }
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                CredentialError::Recoverable(err)
            }
            other => CredentialError::Permanent(other),
        }
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credential store: {}", self.inner())
    }
}

impl Error for CredentialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Get/set/clear access to the stored credential.
///
/// Writers are login (set), logout (clear) and the request layer's purge on
/// a rejected credential (clear); each is a plain last-writer-wins overwrite.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Result<Option<String>, CredentialError>;
    fn username(&self) -> Result<Option<String>, CredentialError>;
    fn set_token(&self, token: &str) -> Result<(), CredentialError>;
    fn set_username(&self, username: &str) -> Result<(), CredentialError>;
    fn clear_token(&self) -> Result<(), CredentialError>;
    fn clear_username(&self) -> Result<(), CredentialError>;

    fn credential(&self) -> Result<Credential, CredentialError> {
        Ok(Credential {
            token: self.token()?,
            username: self.username()?,
        })
    }

    /// Remove both token and username. Both removals are attempted even if
    /// the first one fails; the first error is returned.
    fn clear(&self) -> Result<(), CredentialError> {
        let token = self.clear_token();
        let username = self.clear_username();
        token.and(username)
    }
}

/// Credentials kept in the platform keychain.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn read(&self, account: &str) -> Result<Option<String>, CredentialError> {
        let entry = Entry::new(&self.service, account)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        let entry = Entry::new(&self.service, account)?;
        entry.set_password(value)?;
        Ok(())
    }

    fn remove(&self, account: &str) -> Result<(), CredentialError> {
        let entry = Entry::new(&self.service, account)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        self.read(TOKEN_ACCOUNT)
    }

    fn username(&self) -> Result<Option<String>, CredentialError> {
        self.read(USERNAME_ACCOUNT)
    }

    fn set_token(&self, token: &str) -> Result<(), CredentialError> {
        self.write(TOKEN_ACCOUNT, token)
    }

    fn set_username(&self, username: &str) -> Result<(), CredentialError> {
        self.write(USERNAME_ACCOUNT, username)
    }

    fn clear_token(&self) -> Result<(), CredentialError> {
        self.remove(TOKEN_ACCOUNT)
    }

    fn clear_username(&self) -> Result<(), CredentialError> {
        self.remove(USERNAME_ACCOUNT)
    }
}

/// Process-local credentials that never touch the keychain.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            inner: Mutex::new(credential),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Credential)) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut *guard);
    }

    fn snapshot(&self) -> Credential {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.snapshot().token)
    }

    fn username(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.snapshot().username)
    }

    fn set_token(&self, token: &str) -> Result<(), CredentialError> {
        self.update(|credential| credential.token = Some(token.to_string()));
        Ok(())
    }

    fn set_username(&self, username: &str) -> Result<(), CredentialError> {
        self.update(|credential| credential.username = Some(username.to_string()));
        Ok(())
    }

    fn clear_token(&self) -> Result<(), CredentialError> {
        self.update(|credential| credential.token = None);
        Ok(())
    }

    fn clear_username(&self) -> Result<(), CredentialError> {
        self.update(|credential| credential.username = None);
        Ok(())
    }

    fn credential(&self) -> Result<Credential, CredentialError> {
        Ok(self.snapshot())
    }
}

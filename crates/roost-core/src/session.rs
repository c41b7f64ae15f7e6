//! Keyring-backed storage for the signed-in session.
//!
//! The hosted backend issues an access token (and usually a refresh
//! token) at login. Both live in the OS credential store rather than in
//! config files or process arguments.

use keyring::Entry;

const SERVICE_NAME: &str = "com.roost.client";
const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";

/// Tokens issued by the backend at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("credential store error: {0}")]
    Keyring(#[from] keyring::Error),
}

fn entry(name: &str) -> Result<Entry, SessionStoreError> {
    Ok(Entry::new(SERVICE_NAME, name)?)
}

fn delete_entry(name: &str) -> Result<(), SessionStoreError> {
    match entry(name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Persist the session after login, replacing any previous one.
pub fn store(tokens: &SessionTokens) -> Result<(), SessionStoreError> {
    entry(ACCESS_TOKEN)?.set_password(&tokens.access_token)?;
    match &tokens.refresh_token {
        Some(token) => entry(REFRESH_TOKEN)?.set_password(token)?,
        // A login without a refresh token invalidates any stale one.
        None => delete_entry(REFRESH_TOKEN)?,
    }
    Ok(())
}

/// Load the stored session. `None` when no one is signed in.
pub fn load() -> Result<Option<SessionTokens>, SessionStoreError> {
    let access_token = match entry(ACCESS_TOKEN)?.get_password() {
        Ok(token) => token,
        Err(keyring::Error::NoEntry) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let refresh_token = match entry(REFRESH_TOKEN)?.get_password() {
        Ok(token) => Some(token),
        Err(keyring::Error::NoEntry) => None,
        Err(err) => return Err(err.into()),
    };
    Ok(Some(SessionTokens {
        access_token,
        refresh_token,
    }))
}

/// Drop the stored session on sign-out. Already-absent entries are fine.
pub fn clear() -> Result<(), SessionStoreError> {
    delete_entry(ACCESS_TOKEN)?;
    delete_entry(REFRESH_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_roundtrip() {
        clear().unwrap();
        assert_eq!(load().unwrap(), None);

        let tokens = SessionTokens {
            access_token: "access_123".to_string(),
            refresh_token: Some("refresh_456".to_string()),
        };
        store(&tokens).unwrap();
        assert_eq!(load().unwrap(), Some(tokens));

        // A re-login without a refresh token drops the stale one.
        let bare = SessionTokens {
            access_token: "access_789".to_string(),
            refresh_token: None,
        };
        store(&bare).unwrap();
        assert_eq!(load().unwrap(), Some(bare));

        clear().unwrap();
        assert_eq!(load().unwrap(), None);
    }
}

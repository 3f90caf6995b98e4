//! Session context handed to the timetable feed.

use std::fmt;
use std::future::Future;

use chrono::Utc;

use crate::domain::AuthRef;

use super::error::FetchError;

/// Authentication context for one fetch.
///
/// The credential is opaque to this crate and never logged; `Debug` redacts
/// it. Snapshots record only the `AuthRef`.
#[derive(Clone)]
pub struct SessionContext {
    auth_ref: AuthRef,
    credential: String,
}

impl SessionContext {
    pub fn new(auth_ref: AuthRef, credential: impl Into<String>) -> Self {
        Self {
            auth_ref,
            credential: credential.into(),
        }
    }

    pub fn auth_ref(&self) -> &AuthRef {
        &self.auth_ref
    }

    /// The raw credential (e.g., a session cookie header value).
    pub fn credential(&self) -> &str {
        &self.credential
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("auth_ref", &self.auth_ref)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Supplies the session used for fetching.
pub trait SessionProvider: Send + Sync {
    fn session(&self) -> impl Future<Output = Result<SessionContext, FetchError>> + Send;
}

/// Session provider with a fixed credential from configuration.
///
/// Acquiring or renewing sessions happens outside this process.
#[derive(Debug, Clone)]
pub struct StaticSession {
    context: Option<SessionContext>,
}

impl StaticSession {
    /// Use `credential` for every fetch.
    pub fn new(credential: impl Into<String>) -> Self {
        let auth_ref = AuthRef::new(format!("static-session@{}", Utc::now().to_rfc3339()));
        Self {
            context: Some(SessionContext::new(auth_ref, credential)),
        }
    }

    /// A provider with no credential, for feeds that need none.
    pub fn anonymous() -> Self {
        Self { context: None }
    }
}

impl SessionProvider for StaticSession {
    async fn session(&self) -> Result<SessionContext, FetchError> {
        Ok(self
            .context
            .clone()
            .unwrap_or_else(|| SessionContext::new(AuthRef::new("anonymous"), "")))
    }
}

//! Bearer credential and the process-wide authorization channel.
//!
//! The channel has two halves. [`AuthWriter`] is owned by the session manager and is
//! the only way to change which credential outgoing requests carry. [`AuthChannel`] is
//! a read-only handle cloned into every request issuer, which reads it each time it
//! builds a request.

use std::fmt;
use std::sync::{Arc, RwLock};

/// Opaque bearer token issued by the service at sign-up or sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

type Slot = Arc<RwLock<Option<Credential>>>;

/// Create a fresh, unarmed channel.
pub fn auth_channel() -> (AuthWriter, AuthChannel) {
    let slot: Slot = Arc::new(RwLock::new(None));
    (
        AuthWriter { slot: slot.clone() },
        AuthChannel { slot },
    )
}

/// Read side of the authorization channel.
#[derive(Clone)]
pub struct AuthChannel {
    slot: Slot,
}

impl AuthChannel {
    /// Token to attach as `Authorization: Bearer ...`, if any.
    pub fn bearer(&self) -> Option<String> {
        let guard = self.slot.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.as_ref().map(|c| c.as_str().to_string())
    }

    pub fn is_armed(&self) -> bool {
        self.bearer().is_some()
    }
}

/// Write side of the authorization channel. Not `Clone`: there is exactly one.
pub struct AuthWriter {
    slot: Slot,
}

impl AuthWriter {
    pub(crate) fn arm(&self, credential: Credential) {
        let mut guard = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(credential);
    }

    pub(crate) fn disarm(&self) {
        let mut guard = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }

    #[cfg(test)]
    pub(crate) fn reader(&self) -> AuthChannel {
        AuthChannel {
            slot: self.slot.clone(),
        }
    }
}

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{
    AuthResponse, AuthWriter, Credential, DocChatApi, LoginRequest, SignupRequest, UserIdentity,
};
use crate::error::ClientError;
use crate::storage::StorageManager;

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    /// Credential present, identity not yet confirmed by the service
    Verifying,
    Authenticated,
}

/// Outcome of asking whether protected content may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate<'a> {
    /// Not yet decidable; hold gated content back
    Pending,
    Allowed(&'a UserIdentity),
    Denied,
}

/// Authentication state derived from the credential and the verified identity.
///
/// `identity` is only ever `Some` while `credential` is `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<Credential>,
    identity: Option<UserIdentity>,
    verifying: bool,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        match (&self.credential, &self.identity) {
            (None, _) => SessionStatus::Unauthenticated,
            (Some(_), Some(_)) if !self.verifying => SessionStatus::Authenticated,
            (Some(_), _) => SessionStatus::Verifying,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }
}

/// Owns the credential, keeps it in sync with durable storage and the
/// authorization channel, and exposes the verified identity.
///
/// This is the only holder of the channel's [`AuthWriter`].
pub struct SessionManager<A: DocChatApi> {
    api: Arc<A>,
    storage: StorageManager,
    auth: AuthWriter,
    session: Session,
}

impl<A: DocChatApi> SessionManager<A> {
    pub fn new(api: Arc<A>, storage: StorageManager, auth: AuthWriter) -> Self {
        Self {
            api,
            storage,
            auth,
            session: Session::default(),
        }
    }

    /// Restore a stored credential, if any, and verify it.
    pub async fn init(&mut self) -> SessionStatus {
        match self.storage.load_token() {
            Ok(Some(credential)) => {
                debug!("restored stored credential");
                self.install(credential, None);
                self.verify_identity().await
            }
            Ok(None) => SessionStatus::Unauthenticated,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "could not read stored credential");
                SessionStatus::Unauthenticated
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.session.identity()
    }

    pub fn gate(&self) -> Gate<'_> {
        match self.session.status() {
            SessionStatus::Verifying => Gate::Pending,
            SessionStatus::Authenticated => match self.session.identity() {
                Some(identity) => Gate::Allowed(identity),
                None => Gate::Denied,
            },
            SessionStatus::Unauthenticated => Gate::Denied,
        }
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(Credential, UserIdentity), ClientError> {
        if full_name.trim().is_empty() {
            return Err(ClientError::validation("Full name is required"));
        }
        require_credentials(email, password)?;

        let request = SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        let response = self.api.sign_up(&request).await?;
        self.establish(response)
    }

    pub async fn sign_in(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<(Credential, UserIdentity), ClientError> {
        require_credentials(email, password)?;

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.api.sign_in(&request).await?;
        self.establish(response)
    }

    /// Drop the credential everywhere. Never touches the network and is safe to
    /// call repeatedly.
    pub fn sign_out(&mut self) {
        self.invalidate();
    }

    /// Confirm the current credential against the service. Any failure signs
    /// the user out.
    pub async fn verify_identity(&mut self) -> SessionStatus {
        if self.session.credential.is_none() {
            return SessionStatus::Unauthenticated;
        }

        self.session.verifying = true;
        match self.api.current_user().await {
            Ok(identity) => {
                info!(user = %identity.id, "session verified");
                self.session.identity = Some(identity);
                self.session.verifying = false;
            }
            Err(e) => {
                warn!(error = %e, "identity check failed, signing out");
                self.invalidate();
            }
        }
        self.session.status()
    }

    fn establish(
        &mut self,
        response: AuthResponse,
    ) -> Result<(Credential, UserIdentity), ClientError> {
        let credential = Credential::new(response.token);
        self.storage
            .save_token(&credential)
            .map_err(|e| ClientError::storage(format!("{:#}", e)))?;

        self.install(credential.clone(), Some(response.user.clone()));
        info!(user = %response.user.id, "signed in");
        Ok((credential, response.user))
    }

    /// Replace the in-memory credential and re-point the channel in one step.
    fn install(&mut self, credential: Credential, identity: Option<UserIdentity>) {
        self.auth.arm(credential.clone());
        self.session = Session {
            verifying: identity.is_none(),
            credential: Some(credential),
            identity,
        };
    }

    fn invalidate(&mut self) {
        if let Err(e) = self.storage.clear_token() {
            warn!(error = %format!("{:#}", e), "could not remove stored credential");
        }
        self.auth.disarm();
        self.session = Session::default();
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), ClientError> {
    if email.trim().is_empty() {
        return Err(ClientError::validation("Email is required"));
    }
    if password.is_empty() {
        return Err(ClientError::validation("Password is required"));
    }
    Ok(())
}

//! Session management for authenticated directory identities.
//!
//! A session is either fully anonymous or fully authenticated: `login`
//! installs the bearer token, its expiry instant, and the authenticated
//! user together, and every other transition clears them together. A
//! one-shot expiry task invalidates the session when the token lifetime
//! elapses; a lazy check covers tokens that expired before the task
//! fired.

use crate::client::DirectoryClient;
use crate::models::{Resource, TokenGrant};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hdap_core::credentials::Credentials;
use hdap_core::notify::MessageSink;
use hdap_core::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

const SESSION_EXPIRED_MESSAGE: &str = "Session expired";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait DirectoryGateway: Send + Sync {
    async fn authenticate(&self, id: &str, password: &str) -> Result<TokenGrant>;
    async fn read_as(&self, id: &str, credentials: &Credentials) -> Result<Resource>;
    async fn read_root(&self) -> Result<Resource>;
}

#[async_trait]
impl DirectoryGateway for DirectoryClient {
    async fn authenticate(&self, id: &str, password: &str) -> Result<TokenGrant> {
        DirectoryClient::authenticate(self, id, password).await
    }

    async fn read_as(&self, id: &str, credentials: &Credentials) -> Result<Resource> {
        self.read(id, None, Some(credentials)).await
    }

    async fn read_root(&self) -> Result<Resource> {
        self.read("", None, None).await
    }
}

/// Serializable snapshot of session state, for rehydration across
/// process restarts.
///
/// The token is carried in the clear because the persisting layer is an
/// opaque key/value store outside this crate; treat snapshots as
/// sensitive material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Resource of the authenticated user, if one was read.
    pub authenticated_user: Option<Resource>,
    /// The bearer token.
    pub token: Option<String>,
    /// Instant at which the token expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Human-readable name for the authenticated user.
    pub friendly_name: Option<String>,
}

#[derive(Default)]
struct SessionState {
    authenticated_user: Option<Resource>,
    token: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
    friendly_name: Option<String>,
    generation: u64,
    expiry_task: Option<JoinHandle<()>>,
}

impl SessionState {
    /// Clear every session field and supersede any scheduled expiry.
    ///
    /// Bumping the generation makes an already-spawned expiry task a
    /// no-op when it eventually fires.
    fn clear(&mut self) {
        if let Some(task) = self.expiry_task.take() {
            task.abort();
        }
        self.authenticated_user = None;
        self.token = None;
        self.expires_at = None;
        self.friendly_name = None;
        self.generation += 1;
    }
}

/// Owns the authenticated identity and its bearer token, and drives
/// login, logout, and automatic expiry.
///
/// Cloning shares the session: all clones observe the same state.
#[derive(Clone)]
pub struct SessionManager {
    gateway: Arc<dyn DirectoryGateway>,
    state: Arc<RwLock<SessionState>>,
    sink: MessageSink,
    logout_hook: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl SessionManager {
    /// Create an anonymous session backed by the given client.
    ///
    /// The session shares the client's notification sink, so expiry
    /// messages and request failures land in the same slot.
    #[must_use]
    pub fn new(client: DirectoryClient) -> Self {
        let sink = client.message_sink().clone();
        Self {
            gateway: Arc::new(client),
            state: Arc::new(RwLock::new(SessionState::default())),
            sink,
            logout_hook: None,
        }
    }

    #[cfg(test)]
    fn with_gateway(gateway: Arc<dyn DirectoryGateway>, sink: MessageSink) -> Self {
        Self {
            gateway,
            state: Arc::new(RwLock::new(SessionState::default())),
            sink,
            logout_hook: None,
        }
    }

    /// Install a hook invoked after an explicit `logout`, typically to
    /// navigate back to a landing page.
    #[must_use]
    pub fn with_logout_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.logout_hook = Some(Arc::new(hook));
        self
    }

    /// Authenticate and populate the session, returning the
    /// authenticated user resource.
    ///
    /// On success the bearer token, its expiry instant, and the user
    /// resource are installed together and a one-shot expiry task is
    /// scheduled, superseding any previous session. The friendly name
    /// prefers `cn`, falls back to `mail`, then to the raw identifier.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier or password is empty. Any
    /// failure from `authenticate` or the follow-up user read aborts
    /// back to the anonymous state; no partial session is retained.
    pub async fn login(&self, id: &str, password: &str) -> Result<Resource> {
        if id.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier and the password".to_string(),
            ));
        }

        let grant = self.gateway.authenticate(id, password).await?;
        let credentials = Credentials::bearer(grant.access_token.expose_secret());
        let generation = self.install_token(grant);

        // Read the authenticated user with the credential snapshot just
        // taken; a concurrent logout or re-login invalidates this
        // generation and the result is discarded.
        match self.gateway.read_as(id, &credentials).await {
            Ok(user) => {
                let friendly_name = friendly_name_for(&user, id);
                let mut state = self.state.write().unwrap();
                if state.generation == generation {
                    state.authenticated_user = Some(user.clone());
                    state.friendly_name = Some(friendly_name);
                }
                drop(state);
                self.sink.clear();
                Ok(user)
            }
            Err(err) => {
                let mut state = self.state.write().unwrap();
                if state.generation == generation {
                    state.clear();
                }
                drop(state);
                Err(err)
            }
        }
    }

    /// Reset to the anonymous state immediately and synchronously.
    pub fn logout(&self) {
        self.state.write().unwrap().clear();
        self.sink.clear();
        if let Some(hook) = &self.logout_hook {
            hook();
        }
    }

    /// Return the bearer credential for the current session, or `None`
    /// when anonymous or expired.
    ///
    /// An expired-but-unfired token is never handed out: the expiry
    /// check runs here as well as in the scheduled task, and a token
    /// found expired clears the session silently. Callers must treat
    /// `None` as "proceed anonymously", never as an error.
    #[must_use]
    pub fn get_credentials(&self) -> Option<Credentials> {
        let mut state = self.state.write().unwrap();
        let expired = matches!(state.expires_at, Some(expires_at) if Utc::now() >= expires_at);
        if expired {
            state.clear();
            return None;
        }
        state
            .token
            .as_ref()
            .map(|token| Credentials::bearer(token.expose_secret()))
    }

    /// Returns true while a live, unexpired session exists.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.get_credentials().is_some()
    }

    /// Return the resource of the authenticated user, or `None` when
    /// anonymous.
    #[must_use]
    pub fn who_am_i(&self) -> Option<Resource> {
        self.state.read().unwrap().authenticated_user.clone()
    }

    /// Return the most human-readable name for the authenticated user.
    #[must_use]
    pub fn friendly_name(&self) -> Option<String> {
        self.state.read().unwrap().friendly_name.clone()
    }

    /// Return the instant the current token expires, if authenticated.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().unwrap().expires_at
    }

    /// Return the last user-facing message, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.sink.last()
    }

    /// Read the server's capabilities from the root entry, including
    /// operational attributes.
    ///
    /// # Errors
    ///
    /// Surfaces the underlying read failure.
    pub async fn server_capabilities(&self) -> Result<Resource> {
        self.gateway.read_root().await
    }

    /// Capture the current session fields for persistence.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().unwrap();
        SessionSnapshot {
            authenticated_user: state.authenticated_user.clone(),
            token: state
                .token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
            expires_at: state.expires_at,
            friendly_name: state.friendly_name.clone(),
        }
    }

    /// Rehydrate session fields from a persisted snapshot.
    ///
    /// The lazy expiry check applies: restoring a snapshot whose token
    /// has already expired leaves the session anonymous. A valid
    /// snapshot schedules a fresh expiry task for the remaining
    /// lifetime, so this must run inside a Tokio runtime.
    pub fn restore(&self, snapshot: SessionSnapshot) {
        let mut state = self.state.write().unwrap();
        state.clear();

        let (Some(token), Some(expires_at)) = (snapshot.token, snapshot.expires_at) else {
            return;
        };
        let now = Utc::now();
        if expires_at <= now {
            return;
        }

        let generation = state.generation;
        let lifetime = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
        state.token = Some(SecretString::from(token));
        state.expires_at = Some(expires_at);
        state.authenticated_user = snapshot.authenticated_user;
        state.friendly_name = snapshot.friendly_name;
        state.expiry_task = Some(self.spawn_expiry_task(generation, lifetime));
    }

    /// Store the grant and schedule its expiry, superseding any previous
    /// session; returns the generation owning the new session.
    fn install_token(&self, grant: TokenGrant) -> u64 {
        let mut state = self.state.write().unwrap();
        state.clear();
        let generation = state.generation;
        let lifetime = Duration::from_secs(grant.expires_in);
        let expires_at = i64::try_from(grant.expires_in)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        state.token = Some(grant.access_token);
        state.expires_at = Some(expires_at);
        state.expiry_task = Some(self.spawn_expiry_task(generation, lifetime));
        generation
    }

    /// Spawn the one-shot task that invalidates this generation of the
    /// session once the token lifetime elapses.
    fn spawn_expiry_task(&self, generation: u64, lifetime: Duration) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let sink = self.sink.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            let mut state = state.write().unwrap();
            if state.generation == generation {
                state.clear();
                sink.publish(SESSION_EXPIRED_MESSAGE);
            }
        })
    }
}

fn friendly_name_for(user: &Resource, id: &str) -> String {
    user.first_str("cn")
        .or_else(|| user.first_str("mail"))
        .map_or_else(|| id.to_string(), ToString::to_string)
}

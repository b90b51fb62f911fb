//! Session store shared by the API client and the realtime channel.
//!
//! Holds the access/refresh token pair. Any clone of [`SessionStore`] sees the
//! same state; the last successful write wins. Changes are published on a
//! `watch` channel (current value) and a `broadcast` channel (discrete events).

use crate::persistence;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use splitter_core::{AuthResponse, UserProfile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    TokensRefreshed,
    LoggedOut,
    /// The session could not be recovered; the host should show its login entry point.
    RedirectToLogin { route: String },
}

#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Option<Session>>>,
    events: broadcast::Sender<SessionEvent>,
    persist_path: Option<PathBuf>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("persist_path", &self.persist_path)
            .finish()
    }
}

impl SessionStore {
    /// In-memory store, starting signed out.
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// In-memory store seeded with a session.
    pub fn with_session(session: Session) -> Self {
        Self::build(Some(session), None)
    }

    /// Store backed by a session file. A previously saved session is restored;
    /// an unreadable file is logged and ignored.
    pub fn restore(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = match persistence::load(&path) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Ignoring unreadable session file");
                None
            }
        };
        if session.is_some() {
            tracing::info!(path = %path.display(), "Restored persisted session");
        }
        Self::build(session, Some(path))
    }

    fn build(session: Option<Session>, persist_path: Option<PathBuf>) -> Self {
        let (state, _) = watch::channel(session);
        let (events, _) = broadcast::channel(32);
        Self {
            state: Arc::new(state),
            events,
            persist_path,
        }
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|s| s.refresh_token.clone())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().as_ref().and_then(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Start a session from a login or registration response.
    pub fn sign_in(&self, response: &AuthResponse) {
        let session = Session {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: expiry(response),
            user: response.profile(),
        };
        self.replace(Some(session));
        let _ = self.events.send(SessionEvent::SignedIn);
    }

    /// Store a refreshed token pair, keeping the user profile.
    pub fn set_tokens(&self, response: &AuthResponse) {
        let expires_at = expiry(response);
        self.state.send_modify(|state| {
            let user = state.as_ref().and_then(|s| s.user.clone());
            *state = Some(Session {
                access_token: response.access_token.clone(),
                refresh_token: response.refresh_token.clone(),
                expires_at,
                user,
            });
        });
        self.persist();
        let _ = self.events.send(SessionEvent::TokensRefreshed);
    }

    pub fn logout(&self) {
        self.replace(None);
        let _ = self.events.send(SessionEvent::LoggedOut);
    }

    pub fn redirect_to_login(&self, route: &str) {
        let _ = self.events.send(SessionEvent::RedirectToLogin {
            route: route.to_string(),
        });
    }

    /// Follow the current session value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Follow discrete session events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn replace(&self, session: Option<Session>) {
        self.state.send_replace(session);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let result = match self.current() {
            Some(session) => persistence::save(path, &session),
            None => persistence::clear(path),
        };
        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "Failed to persist session");
        }
    }
}

fn expiry(response: &AuthResponse) -> Option<DateTime<Utc>> {
    response
        .expires_in
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
}

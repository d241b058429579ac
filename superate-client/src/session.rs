//! Session store: the single source of the current [`AuthState`].
//!
//! Consumers subscribe to a `tokio::sync::watch` channel and react to every
//! change (dashboard redirect, route guard, heartbeat).

use std::sync::Arc;

use superate_core::{AuthState, Role, Session};
use tokio::sync::watch;

/// Shared handle to the auth state. Clones publish to the same channel.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<AuthState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Start in the loading state while a persisted session is restored.
    pub fn new() -> Self {
        Self::with_state(AuthState::loading())
    }

    pub fn with_state(state: AuthState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub fn sign_in(&self, session: Session) {
        tracing::info!(
            user_id = %session.user_id,
            role = ?session.role,
            "Session established"
        );
        self.tx.send_replace(AuthState::signed_in(session));
    }

    pub fn sign_out(&self) {
        tracing::info!("Session ended");
        self.tx.send_replace(AuthState::signed_out());
    }

    /// Mark the state as loading again (e.g. while a token refresh is in flight).
    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|state| state.loading = loading);
    }

    /// Update the role once the user's profile has been read.
    ///
    /// Does nothing without a session.
    pub fn set_role(&self, role: Option<Role>) {
        self.tx.send_if_modified(|state| match state.session.as_mut() {
            Some(session) if session.role != role => {
                session.role = role;
                true
            }
            _ => false,
        });
    }
}

//! Session context: the one place that holds the signed-in user's auth
//! state.
//!
//! Exactly two writers exist: identity-provider change notifications
//! ([`Session::identity_changed`]) and the poller's terminal detection
//! ([`Session::mark_verified`]). Everything else only reads or watches.

use std::sync::Arc;

use tokio::sync::watch;

use crate::VerificationSnapshot;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
    /// The identity provider has not reported yet.
    #[default]
    Loading,
    Unauthenticated,
    AuthenticatedUnverified,
    AuthenticatedVerified,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            Self::AuthenticatedUnverified | Self::AuthenticatedVerified
        )
    }
}

/// Shared session context. Clones observe and write the same state.
#[derive(Clone)]
pub struct Session {
    tx: Arc<watch::Sender<AuthState>>,
}

impl Session {
    /// A session in [`AuthState::Loading`].
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AuthState::Loading);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> AuthState {
        *self.tx.borrow()
    }

    /// Watch for state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    /// The identity provider reported a sign-in (with the user's stored
    /// verification status) or a sign-out (`None`).
    pub fn identity_changed(&self, user: Option<VerificationSnapshot>) {
        let next = match user {
            None => AuthState::Unauthenticated,
            Some(s) if s.is_verified_21 => AuthState::AuthenticatedVerified,
            Some(_) => AuthState::AuthenticatedUnverified,
        };
        self.tx.send_if_modified(|state| {
            let changed = *state != next;
            *state = next;
            changed
        });
    }

    /// Record that verification completed. Only an authenticated, unverified
    /// session moves; returns whether this call made the transition.
    pub fn mark_verified(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == AuthState::AuthenticatedUnverified {
                *state = AuthState::AuthenticatedVerified;
                true
            } else {
                false
            }
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

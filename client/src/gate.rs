//! Access gate for protected views.
//!
//! `allowed = authenticated && (!requires_verification || verified)`, with
//! a loading answer while the session is still resolving.

use tokio::sync::watch;

use crate::{AuthState, Session};

/// Where a blocked visitor is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Sign-in page; `return_to` is where to go after signing in.
    SignIn { return_to: String },
    /// Entry point of the verification flow.
    Verification,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Show a placeholder; no decision yet.
    Loading,
    Allow,
    RedirectTo(Route),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether a visitor in `state` may open `target`.
pub fn decide(state: AuthState, requires_verification: bool, target: &str) -> Decision {
    match state {
        AuthState::Loading => Decision::Loading,
        AuthState::Unauthenticated => Decision::RedirectTo(Route::SignIn {
            return_to: target.to_string(),
        }),
        AuthState::AuthenticatedUnverified if requires_verification => {
            Decision::RedirectTo(Route::Verification)
        }
        AuthState::AuthenticatedUnverified | AuthState::AuthenticatedVerified => Decision::Allow,
    }
}

/// Re-evaluates the gate for one protected view whenever the session
/// changes.
pub struct GateWatcher {
    rx: watch::Receiver<AuthState>,
    requires_verification: bool,
    target: String,
}

impl GateWatcher {
    pub fn new(session: &Session, requires_verification: bool, target: impl Into<String>) -> Self {
        Self {
            rx: session.subscribe(),
            requires_verification,
            target: target.into(),
        }
    }

    /// The decision for the current session state.
    pub fn current(&mut self) -> Decision {
        let state = *self.rx.borrow_and_update();
        decide(state, self.requires_verification, &self.target)
    }

    /// Wait for the next session change and return the new decision.
    /// Returns `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<Decision> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VerificationSnapshot;

    #[test]
    fn decision_table() {
        for requires in [false, true] {
            assert_eq!(decide(AuthState::Loading, requires, "/feed"), Decision::Loading);
            assert_eq!(
                decide(AuthState::Unauthenticated, requires, "/feed"),
                Decision::RedirectTo(Route::SignIn {
                    return_to: "/feed".into()
                })
            );
            assert_eq!(
                decide(AuthState::AuthenticatedVerified, requires, "/feed"),
                Decision::Allow
            );
        }
        assert_eq!(
            decide(AuthState::AuthenticatedUnverified, false, "/profile"),
            Decision::Allow
        );
        assert_eq!(
            decide(AuthState::AuthenticatedUnverified, true, "/feed"),
            Decision::RedirectTo(Route::Verification)
        );
    }

    #[tokio::test]
    async fn watcher_follows_session() {
        let session = Session::new();
        let mut gate = GateWatcher::new(&session, true, "/feed");
        assert_eq!(gate.current(), Decision::Loading);

        session.identity_changed(Some(VerificationSnapshot::pending()));
        assert_eq!(
            gate.changed().await,
            Some(Decision::RedirectTo(Route::Verification))
        );

        session.mark_verified();
        assert_eq!(gate.changed().await, Some(Decision::Allow));

        session.identity_changed(None);
        assert_eq!(
            gate.changed().await,
            Some(Decision::RedirectTo(Route::SignIn {
                return_to: "/feed".into()
            }))
        );
    }

    #[tokio::test]
    async fn watcher_ends_with_session() {
        let session = Session::new();
        let mut gate = GateWatcher::new(&session, false, "/");
        drop(session);
        assert_eq!(gate.changed().await, None);
    }
}

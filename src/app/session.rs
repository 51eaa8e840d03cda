//! Signed-in state of the application.
//!
//! [`SessionState`] mirrors the auth provider's session into a
//! [`tokio::sync::watch`] channel. The provider's change notifications are
//! the only writer of the identity; the operations here only forward
//! credentials, report outcomes and toggle the loading flag.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::notify::{Notice, Notifier};
use super::routes::{Navigation, Route};
use crate::model::{AuthEvent, Identity, Session, SignOutScope, SignUp};
use crate::provider::{AuthProvider, Subscription};
use crate::FileShareError;

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The signed-in user, if any.
    pub identity: Option<Identity>,
    /// The provider session, if any.
    pub session: Option<Session>,
    /// Whether the session is still being determined or an operation runs.
    pub loading: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            identity: None,
            session: None,
            loading: true,
        }
    }
}

impl SessionSnapshot {
    fn apply(&mut self, session: Option<Session>) {
        self.identity = session.as_ref().map(|s| s.user.clone());
        self.session = session;
        self.loading = false;
    }
}

/// Resets the loading flag when an operation ends, however it ends.
struct LoadingGuard<'a>(&'a watch::Sender<SessionSnapshot>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|s| s.loading = false);
    }
}

/// Session state shared by the application.
pub struct SessionState {
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionState {
    /// Create the state. Nothing is read from the provider until
    /// [`SessionState::start`].
    pub fn new(auth: Arc<dyn AuthProvider>, notifier: Arc<dyn Notifier>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self {
            auth,
            notifier,
            state: Arc::new(tx),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to session changes, then read the existing session.
    ///
    /// The subscription is made once and kept for the lifetime of the state.
    pub async fn start(&self) {
        {
            let mut subscription = self.subscription.lock();
            if subscription.is_none() {
                let state = self.state.clone();
                *subscription = Some(self.auth.on_auth_state_change(Arc::new(
                    move |event: AuthEvent, session: Option<&Session>| {
                        debug!(?event, "Session changed");
                        let session = session.cloned();
                        state.send_modify(|s| s.apply(session));
                    },
                )));
            }
        }

        match self.auth.get_session().await {
            Ok(session) => self.state.send_modify(|s| s.apply(session)),
            Err(e) => {
                warn!("Failed to read the existing session: {}", e);
                self.state.send_modify(|s| s.loading = false);
            }
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// The signed-in user.
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver that observes every snapshot change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Sign in with email and password.
    ///
    /// Returns where to navigate on success.
    pub async fn sign_in(&self, email: &str, password: &str) -> Option<Navigation> {
        let _loading = self.begin_loading();
        self.auth.clear_local_session();

        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "Signed in");
                self.notifier.notify(Notice::success("Signed in successfully"));
                Some(Navigation::Push(Route::Dashboard))
            }
            Err(e) => {
                warn!("Error signing in: {}", e);
                self.notifier
                    .notify(Notice::error(failure_message(&e, "Failed to sign in")));
                None
            }
        }
    }

    /// Register and, on success, sign in with the same credentials.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Option<Navigation> {
        let _loading = self.begin_loading();
        self.auth.clear_local_session();

        let request = SignUp {
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.to_string(),
        };

        match self.auth.sign_up(&request).await {
            Ok(Some(identity)) => {
                info!(user_id = %identity.id, "Account created");
                self.notifier.notify(Notice::success(
                    "Account created successfully! Signing you in...",
                ));
                self.sign_in(email, password).await
            }
            Ok(None) => {
                warn!("Sign-up returned no user");
                self.notifier
                    .notify(Notice::error("Something went wrong during signup"));
                None
            }
            Err(e) => {
                warn!("Error signing up: {}", e);
                self.notifier
                    .notify(Notice::error(failure_message(&e, "Failed to sign up")));
                None
            }
        }
    }

    /// Revoke every session of the user and drop local session data.
    ///
    /// Returns a full reload of the login screen on success.
    pub async fn sign_out(&self) -> Option<Navigation> {
        let _loading = self.begin_loading();

        let result = self.auth.sign_out(SignOutScope::Global).await;
        self.auth.clear_local_session();

        match result {
            Ok(()) => {
                info!("Signed out");
                self.notifier.notify(Notice::success("Signed out successfully"));
                Some(Navigation::Reload(Route::Login))
            }
            Err(e) => {
                warn!("Error signing out: {}", e);
                self.notifier
                    .notify(Notice::error(failure_message(&e, "Failed to sign out")));
                None
            }
        }
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.state.send_modify(|s| s.loading = true);
        LoadingGuard(&self.state)
    }
}

/// Provider message, or `fallback` when it has none.
pub(crate) fn failure_message(err: &FileShareError, fallback: &str) -> String {
    let message = err.message();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

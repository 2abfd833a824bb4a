// ── Session state ──
//
// Tracks the logged-in user. The session cookie and CSRF token live in
// the RestClient; this layer only knows who is signed in and tells
// interested parties when that changes.

use std::sync::{Arc, RwLock};

use galleria_api::RestClient;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{EntityKind, Model, Pk};
use crate::observer::{ObserverHandle, ObserverSet};
use crate::registry::Registry;
use crate::store::ModelService;

/// The logged-in user and the login/logout lifecycle.
pub struct UserSession {
    service: Arc<ModelService>,
    http: Arc<RestClient>,
    current: RwLock<Option<Model>>,
    /// Fires once when a persisted session is recovered at startup.
    initial_user_observers: ObserverSet<Model>,
    login_observers: ObserverSet<Model>,
    logout_observers: ObserverSet<()>,
}

impl UserSession {
    pub fn new(registry: &Arc<Registry>) -> Result<Self, CoreError> {
        Ok(Self {
            service: registry.service(EntityKind::User)?,
            http: Arc::clone(registry.http()),
            current: RwLock::new(None),
            initial_user_observers: ObserverSet::new(),
            login_observers: ObserverSet::new(),
            logout_observers: ObserverSet::new(),
        })
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn current_user(&self) -> Option<Model> {
        self.current.read().expect("session lock poisoned").clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }

    /// Whether the logged-in user may edit content.
    pub fn is_staff(&self) -> bool {
        self.current_user()
            .is_some_and(|user| user.has_value_for_any_of(&["isStaff"]))
    }

    fn set_current(&self, user: Option<Model>) {
        *self.current.write().expect("session lock poisoned") = user;
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Recover a persisted session at startup by fetching `user/self`.
    ///
    /// Not being logged in is normal, so a failure resolves to `None`
    /// rather than an error.
    pub async fn load(&self) -> Option<Model> {
        match self.service.retrieve(&Pk::from("self")).await {
            Ok(user) => {
                self.set_current(Some(user.clone()));
                self.initial_user_observers.emit(&user);
                Some(user)
            }
            Err(e) => {
                debug!("no persisted session: {}", e.detail());
                None
            }
        }
    }

    /// Authenticate with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Model, CoreError> {
        let row: serde_json::Value = self
            .http
            .post("login", &serde_json::json!({ "email": email, "password": password }))
            .await
            .map_err(CoreError::from)?;

        let user = self.service.local_instance(&row)?;
        self.set_current(Some(user.clone()));
        self.login_observers.emit(&user);
        Ok(user)
    }

    /// End the session on the server and forget the current user.
    pub async fn logout(&self) -> Result<(), CoreError> {
        self.http.post_empty("logout").await.map_err(CoreError::from)?;
        self.set_current(None);
        self.logout_observers.emit(&());
        Ok(())
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn observe_initial_user(
        &self,
        callback: impl Fn(&Model) + Send + Sync + 'static,
    ) -> ObserverHandle {
        self.initial_user_observers.register(callback)
    }

    pub fn observe_login(
        &self,
        callback: impl Fn(&Model) + Send + Sync + 'static,
    ) -> ObserverHandle {
        self.login_observers.register(callback)
    }

    pub fn observe_logout(&self, callback: impl Fn() + Send + Sync + 'static) -> ObserverHandle {
        self.logout_observers.register(move |()| callback())
    }
}

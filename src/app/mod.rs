use std::sync::Arc;

use crate::config::AppConfig;
use crate::folders::RecipeDataManager;
use crate::profile::UserProfileManager;
use crate::signup::{AuthError, AuthSession, Authenticator, SignupError, SignupFlow, SignupRequest};
use crate::storage::{MemoryStore, SnapshotStore};

mod actions;

pub use actions::ActionDispatcher;

/// One user session: both managers share a snapshot store and are owned
/// here rather than living in globals. Front ends borrow what they need.
pub struct App {
    pub config: Arc<AppConfig>,
    folders: RecipeDataManager,
    profile: UserProfileManager,
    authenticator: Authenticator,
    session: Option<AuthSession>,
}

impl App {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SnapshotStore>) -> Self {
        let folders = RecipeDataManager::load(store.clone());
        let profile = UserProfileManager::load(store, config.seed_demo_data);
        let authenticator = Authenticator::from_options(&config.auth);
        Self {
            config,
            folders,
            profile,
            authenticator,
            session: None,
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn folders(&self) -> &RecipeDataManager {
        &self.folders
    }

    pub fn folders_mut(&mut self) -> &mut RecipeDataManager {
        &mut self.folders
    }

    pub fn profile(&self) -> &UserProfileManager {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut UserProfileManager {
        &mut self.profile
    }

    pub fn actions(&mut self) -> ActionDispatcher<'_> {
        ActionDispatcher::new(&mut self.folders, &mut self.profile)
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<&AuthSession, AuthError> {
        let session = self.authenticator.login(username, password)?;
        tracing::info!(username = %session.username, "signed in");
        Ok(self.session.insert(session))
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(username = %session.username, "signed out");
        }
    }

    /// Finishes a signup flow: the chosen diet labels are merged into the
    /// profile's dietary preferences and the session becomes authenticated.
    pub fn complete_signup(&mut self, flow: SignupFlow) -> Result<SignupRequest, SignupError> {
        let request = flow.complete()?;
        for label in request.preferences.labels() {
            self.profile.add_dietary_preference(label);
        }
        self.session = Some(AuthSession {
            username: request.email.clone(),
            authenticated_at: time::OffsetDateTime::now_utc(),
        });
        tracing::info!(email = %request.email, "account created");
        Ok(request)
    }
}

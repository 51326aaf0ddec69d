//! `MockUsers` — an in-memory test double for `UserStore`.
//!
//! Useful where a real `user` table is irrelevant, or to simulate a
//! collaborator that fails.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{FunctionsError, UserModel, UserSettings, UserStore, UserUpdate};

/// Behaviour injected into `MockUsers` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Serve users from the in-memory map.
    Serve,
    /// Fail every call with `FunctionsError::UserStore`.
    Fail(String),
}

/// In-memory users keyed by id; records every update it receives.
#[derive(Debug, Clone)]
pub struct MockUsers {
    pub behaviour: MockBehaviour,
    users: Arc<Mutex<HashMap<String, UserModel>>>,
    /// All `(user_id, update)` pairs seen, in call order.
    pub updates: Arc<Mutex<Vec<(String, UserUpdate)>>>,
}

impl MockUsers {
    /// A store with no users that serves requests normally.
    pub fn new() -> Self {
        Self {
            behaviour: MockBehaviour::Serve,
            users: Arc::new(Mutex::new(HashMap::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A store that fails every call with `msg`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            behaviour: MockBehaviour::Fail(msg.into()),
            ..Self::new()
        }
    }

    /// Add (or replace) a user with the given settings.
    pub async fn with_user(self, id: impl Into<String>, settings: UserSettings) -> Self {
        let id = id.into();
        let user = UserModel {
            id: id.clone(),
            name: id.clone(),
            email: format!("{id}@example.com"),
            settings,
            created_at: 0,
            updated_at: 0,
        };
        self.users.lock().await.insert(id, user);
        self
    }

    /// Current settings of `id`, if the user exists.
    pub async fn settings_of(&self, id: &str) -> Option<UserSettings> {
        self.users.lock().await.get(id).map(|u| u.settings.clone())
    }

    /// Number of updates received so far.
    pub async fn update_count(&self) -> usize {
        self.updates.lock().await.len()
    }

    fn check(&self) -> Result<(), FunctionsError> {
        match &self.behaviour {
            MockBehaviour::Serve => Ok(()),
            MockBehaviour::Fail(msg) => Err(FunctionsError::UserStore(msg.clone())),
        }
    }
}

impl Default for MockUsers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MockUsers {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserModel>, FunctionsError> {
        self.check()?;
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn update_user_by_id(
        &self,
        id: &str,
        update: UserUpdate,
    ) -> Result<Option<UserModel>, FunctionsError> {
        self.updates.lock().await.push((id.to_owned(), update.clone()));
        self.check()?;

        let mut users = self.users.lock().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(settings) = update.settings {
            user.settings = settings;
        }
        Ok(Some(user.clone()))
    }
}

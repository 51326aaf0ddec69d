//! The Users collaborator: the only way this crate touches user records.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use db::{DbError, DbPool, models::{UserChanges, UserRow}};
use db::repository::users as user_repo;

use crate::{FunctionsError, UserModel, UserUpdate};

/// Read/write access to user records.
///
/// `FunctionsTable` only needs these two calls; whatever owns the user table
/// implements them.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user, or `Ok(None)` if no user has this id.
    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserModel>, FunctionsError>;

    /// Apply `update` and return the stored user, or `Ok(None)` if no user has this id.
    async fn update_user_by_id(
        &self,
        id: &str,
        update: UserUpdate,
    ) -> Result<Option<UserModel>, FunctionsError>;
}

/// `UserStore` backed by the `user` table.
#[derive(Debug, Clone)]
pub struct Users {
    pool: DbPool,
}

impl Users {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a user with an empty settings document.
    pub async fn insert_new_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
    ) -> Result<UserModel, FunctionsError> {
        let now = Utc::now().timestamp();
        let row = UserRow {
            id: id.to_owned(),
            name: name.to_owned(),
            email: email.to_owned(),
            settings: None,
            created_at: now,
            updated_at: now,
        };
        let stored = user_repo::insert_user(&self.pool, &row).await?;
        debug!(user_id = %stored.id, "user created");
        UserModel::try_from(stored)
    }
}

#[async_trait]
impl UserStore for Users {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserModel>, FunctionsError> {
        match user_repo::get_user(&self.pool, id).await {
            Ok(row) => Ok(Some(UserModel::try_from(row)?)),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_user_by_id(
        &self,
        id: &str,
        update: UserUpdate,
    ) -> Result<Option<UserModel>, FunctionsError> {
        let changes = UserChanges::try_from(update)?;
        match user_repo::update_user(&self.pool, id, &changes, Utc::now().timestamp()).await {
            Ok(row) => Ok(Some(UserModel::try_from(row)?)),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

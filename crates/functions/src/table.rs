//! `FunctionsTable` — the repository object for functions.
//!
//! Internally failures are typed (`FunctionsError`).  The public surface
//! collapses any failure to `None`, an empty `Vec`, or `false` after logging
//! the cause; callers never see which kind of failure occurred.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, instrument, warn};

use db::DbPool;
use db::models::{FunctionChanges, FunctionRow};
use db::repository::functions as fn_repo;

use crate::{
    FunctionForm, FunctionModel, FunctionUpdate, FunctionsError, UserStore, UserUpdate, Valves,
};

/// Log the failure and turn it into `None`.
fn collapse<T>(op: &'static str, result: Result<T, FunctionsError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(op = op, error = %e, "functions operation failed");
            None
        }
    }
}

/// Functions persisted in the `function` table, plus per-user valves kept in
/// each user's settings document.
pub struct FunctionsTable {
    pool: DbPool,
    users: Arc<dyn UserStore>,
}

impl FunctionsTable {
    /// Create a table over an already-migrated pool.
    pub fn new(pool: DbPool, users: Arc<dyn UserStore>) -> Self {
        Self { pool, users }
    }

    // -----------------------------------------------------------------------
    // Function records
    // -----------------------------------------------------------------------

    /// Store a new function owned by `user_id`.
    ///
    /// Returns `None` on any persistence error, including a duplicate id.
    #[instrument(skip(self, form), fields(function_id = %form.id))]
    pub async fn insert_new_function(
        &self,
        user_id: &str,
        kind: &str,
        form: FunctionForm,
    ) -> Option<FunctionModel> {
        collapse("insert_new_function", self.try_insert(user_id, kind, form).await)
    }

    /// Fetch a function; `None` if it does not exist or the read failed.
    #[instrument(skip(self))]
    pub async fn get_function_by_id(&self, id: &str) -> Option<FunctionModel> {
        match fn_repo::get_function(&self.pool, id).await {
            Ok(row) => collapse("get_function_by_id", FunctionModel::try_from(row)),
            Err(db::DbError::NotFound) => {
                debug!("function not found");
                None
            }
            Err(e) => collapse("get_function_by_id", Err(e.into())),
        }
    }

    /// Every function, in storage order.
    #[instrument(skip(self))]
    pub async fn get_functions(&self) -> Vec<FunctionModel> {
        let rows = fn_repo::list_functions(&self.pool).await;
        collapse("get_functions", Self::into_models(rows)).unwrap_or_default()
    }

    /// Every function of the given type, in storage order.
    #[instrument(skip(self))]
    pub async fn get_functions_by_type(&self, kind: &str) -> Vec<FunctionModel> {
        let rows = fn_repo::list_functions_by_type(&self.pool, kind).await;
        collapse("get_functions_by_type", Self::into_models(rows)).unwrap_or_default()
    }

    /// Apply a partial update and refresh `updated_at`.
    ///
    /// Returns the stored record, or `None` if the id is unknown or the write failed.
    #[instrument(skip(self, update))]
    pub async fn update_function_by_id(
        &self,
        id: &str,
        update: FunctionUpdate,
    ) -> Option<FunctionModel> {
        collapse("update_function_by_id", self.try_update(id, update).await)
    }

    /// Delete a function.
    ///
    /// `true` whenever the delete ran, including when nothing matched.
    #[instrument(skip(self))]
    pub async fn delete_function_by_id(&self, id: &str) -> bool {
        match fn_repo::delete_function(&self.pool, id).await {
            Ok(removed) => {
                debug!(removed = removed, "function delete executed");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to delete function");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // User valves
    // -----------------------------------------------------------------------

    /// The valves `user_id` has set for function `id`; an empty map if none.
    ///
    /// `None` only when the user is missing or the Users collaborator failed.
    #[instrument(skip(self))]
    pub async fn get_user_valves_by_id_and_user_id(
        &self,
        id: &str,
        user_id: &str,
    ) -> Option<Valves> {
        collapse(
            "get_user_valves_by_id_and_user_id",
            self.try_get_user_valves(id, user_id).await,
        )
    }

    /// Store `valves` for function `id` in `user_id`'s settings and return them.
    ///
    /// The rest of the settings document is written back unchanged.
    #[instrument(skip(self, valves))]
    pub async fn update_user_valves_by_id_and_user_id(
        &self,
        id: &str,
        user_id: &str,
        valves: Valves,
    ) -> Option<Valves> {
        collapse(
            "update_user_valves_by_id_and_user_id",
            self.try_set_user_valves(id, user_id, valves).await,
        )
    }

    // -----------------------------------------------------------------------
    // Internal: fallible implementations
    // -----------------------------------------------------------------------

    async fn try_insert(
        &self,
        user_id: &str,
        kind: &str,
        form: FunctionForm,
    ) -> Result<FunctionModel, FunctionsError> {
        let now = Utc::now().timestamp();
        let function = FunctionModel {
            id: form.id,
            user_id: user_id.to_owned(),
            name: form.name,
            kind: kind.to_owned(),
            content: form.content,
            meta: form.meta,
            updated_at: now,
            created_at: now,
        };

        let row = FunctionRow::try_from(&function)?;
        if let Err(e) = fn_repo::insert_function(&self.pool, &row).await {
            if e.is_unique_violation() {
                warn!("function id already taken");
            }
            return Err(e.into());
        }
        debug!(kind = kind, "function created");
        Ok(function)
    }

    async fn try_update(
        &self,
        id: &str,
        update: FunctionUpdate,
    ) -> Result<FunctionModel, FunctionsError> {
        let changes = FunctionChanges::try_from(update)?;
        let row = fn_repo::update_function(&self.pool, id, &changes, Utc::now().timestamp()).await?;
        FunctionModel::try_from(row)
    }

    async fn try_get_user_valves(&self, id: &str, user_id: &str) -> Result<Valves, FunctionsError> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| FunctionsError::UserNotFound(user_id.to_owned()))?;

        Ok(user.settings.function_valves(id))
    }

    async fn try_set_user_valves(
        &self,
        id: &str,
        user_id: &str,
        valves: Valves,
    ) -> Result<Valves, FunctionsError> {
        let mut settings = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| FunctionsError::UserNotFound(user_id.to_owned()))?
            .settings;

        settings.set_function_valves(id, valves);

        let update = UserUpdate {
            settings: Some(settings),
            ..Default::default()
        };
        let stored = self
            .users
            .update_user_by_id(user_id, update)
            .await?
            .ok_or_else(|| FunctionsError::UserNotFound(user_id.to_owned()))?;

        debug!("user valves updated");
        Ok(stored.settings.function_valves(id))
    }

    fn into_models(
        rows: Result<Vec<FunctionRow>, db::DbError>,
    ) -> Result<Vec<FunctionModel>, FunctionsError> {
        rows?.into_iter().map(FunctionModel::try_from).collect()
    }
}

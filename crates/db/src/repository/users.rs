//! User row operations needed by the functions layer.

use serde_json::Value;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    DbError, DbPool,
    models::{UserChanges, UserRow},
};

/// Insert a new user row.
pub async fn insert_user(pool: &DbPool, row: &UserRow) -> Result<UserRow, DbError> {
    let inserted = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO "user" (id, name, email, settings, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, name, email, settings, created_at, updated_at
        "#,
    )
    .bind(&row.id)
    .bind(&row.name)
    .bind(&row.email)
    .bind(&row.settings)
    .bind(row.created_at)
    .bind(row.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

/// Fetch a single user by primary key.
pub async fn get_user(pool: &DbPool, id: &str) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, name, email, settings, created_at, updated_at FROM "user" WHERE id = ?"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Apply `changes` to a user and stamp it with `updated_at`.
///
/// `settings` replaces the whole document.  Returns `DbError::NotFound` if no
/// row matched `id`.
pub async fn update_user(
    pool: &DbPool,
    id: &str,
    changes: &UserChanges,
    updated_at: i64,
) -> Result<UserRow, DbError> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(r#"UPDATE "user" SET updated_at = "#);
    qb.push_bind(updated_at);

    if let Some(name) = &changes.name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(email) = &changes.email {
        qb.push(", email = ").push_bind(email);
    }
    if let Some(settings) = &changes.settings {
        qb.push(", settings = ").push_bind(Json::<&Value>(settings));
    }

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING id, name, email, settings, created_at, updated_at");

    let row = qb
        .build_query_as::<UserRow>()
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row)
}

//! Function CRUD operations.

use serde_json::Value;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    DbError, DbPool,
    models::{FunctionChanges, FunctionRow},
};

const FUNCTION_COLUMNS: &str =
    r#"id, user_id, name, "type", content, meta, created_at, updated_at"#;

/// Insert a new function row.
///
/// The caller supplies the timestamps.  A duplicate `id` surfaces as
/// `DbError::Sqlx` (see [`DbError::is_unique_violation`]).
pub async fn insert_function(pool: &DbPool, row: &FunctionRow) -> Result<FunctionRow, DbError> {
    let inserted = sqlx::query_as::<_, FunctionRow>(&format!(
        r#"
        INSERT INTO "function" ({FUNCTION_COLUMNS})
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {FUNCTION_COLUMNS}
        "#
    ))
    .bind(&row.id)
    .bind(&row.user_id)
    .bind(&row.name)
    .bind(&row.kind)
    .bind(&row.content)
    .bind(&row.meta)
    .bind(row.created_at)
    .bind(row.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

/// Fetch a single function by its primary key.
pub async fn get_function(pool: &DbPool, id: &str) -> Result<FunctionRow, DbError> {
    let row = sqlx::query_as::<_, FunctionRow>(&format!(
        r#"SELECT {FUNCTION_COLUMNS} FROM "function" WHERE id = ?"#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return every function in storage order.
pub async fn list_functions(pool: &DbPool) -> Result<Vec<FunctionRow>, DbError> {
    let rows = sqlx::query_as::<_, FunctionRow>(&format!(
        r#"SELECT {FUNCTION_COLUMNS} FROM "function""#
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Return every function whose `type` column equals `kind`, in storage order.
pub async fn list_functions_by_type(pool: &DbPool, kind: &str) -> Result<Vec<FunctionRow>, DbError> {
    let rows = sqlx::query_as::<_, FunctionRow>(&format!(
        r#"SELECT {FUNCTION_COLUMNS} FROM "function" WHERE "type" = ?"#
    ))
    .bind(kind)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Apply `changes` to a function and stamp it with `updated_at`.
///
/// Returns `DbError::NotFound` if no row matched `id`.
pub async fn update_function(
    pool: &DbPool,
    id: &str,
    changes: &FunctionChanges,
    updated_at: i64,
) -> Result<FunctionRow, DbError> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(r#"UPDATE "function" SET updated_at = "#);
    qb.push_bind(updated_at);

    if let Some(user_id) = &changes.user_id {
        qb.push(", user_id = ").push_bind(user_id);
    }
    if let Some(name) = &changes.name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(kind) = &changes.kind {
        qb.push(r#", "type" = "#).push_bind(kind);
    }
    if let Some(content) = &changes.content {
        qb.push(", content = ").push_bind(content);
    }
    if let Some(meta) = &changes.meta {
        qb.push(", meta = ").push_bind(Json::<&Value>(meta));
    }

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {FUNCTION_COLUMNS}"));

    let row = qb
        .build_query_as::<FunctionRow>()
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Delete a function by its primary key.
///
/// Returns the number of rows removed (`0` when the id was unknown).
pub async fn delete_function(pool: &DbPool, id: &str) -> Result<u64, DbError> {
    let result = sqlx::query(r#"DELETE FROM "function" WHERE id = ?"#)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pool::{create_pool, run_migrations};

    async fn test_pool() -> DbPool {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn row(id: &str, kind: &str) -> FunctionRow {
        FunctionRow {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: format!("{id} name"),
            kind: kind.to_string(),
            content: "class Filter: pass".to_string(),
            meta: Json(json!({ "description": "test" })),
            created_at: 100,
            updated_at: 100,
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let pool = test_pool().await;
        insert_function(&pool, &row("f1", "filter")).await.unwrap();

        let got = get_function(&pool, "f1").await.unwrap();
        assert_eq!(got.kind, "filter");
        assert_eq!(got.meta.0["description"], "test");
        assert_eq!(got.created_at, 100);
    }

    #[tokio::test]
    async fn duplicate_id_is_a_unique_violation() {
        let pool = test_pool().await;
        insert_function(&pool, &row("f1", "filter")).await.unwrap();

        let err = insert_function(&pool, &row("f1", "action")).await.unwrap_err();
        assert!(err.is_unique_violation(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let pool = test_pool().await;
        assert!(matches!(get_function(&pool, "nope").await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn list_by_type_filters() {
        let pool = test_pool().await;
        insert_function(&pool, &row("a", "filter")).await.unwrap();
        insert_function(&pool, &row("b", "action")).await.unwrap();
        insert_function(&pool, &row("c", "filter")).await.unwrap();

        assert_eq!(list_functions(&pool).await.unwrap().len(), 3);

        let mut ids: Vec<_> = list_functions_by_type(&pool, "filter")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn update_touches_only_given_columns() {
        let pool = test_pool().await;
        insert_function(&pool, &row("f1", "filter")).await.unwrap();

        let changes = FunctionChanges {
            name: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = update_function(&pool, "f1", &changes, 200).await.unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.kind, "filter");
        assert_eq!(updated.content, "class Filter: pass");
        assert_eq!(updated.created_at, 100);
        assert_eq!(updated.updated_at, 200);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let pool = test_pool().await;
        let res = update_function(&pool, "nope", &FunctionChanges::default(), 1).await;
        assert!(matches!(res, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn delete_reports_rows_affected() {
        let pool = test_pool().await;
        insert_function(&pool, &row("f1", "filter")).await.unwrap();

        assert_eq!(delete_function(&pool, "f1").await.unwrap(), 1);
        assert_eq!(delete_function(&pool, "f1").await.unwrap(), 0);
    }
}

//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `functions` crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// function
// ---------------------------------------------------------------------------

/// A persisted function row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FunctionRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Category tag (`filter`, `action`, …).
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    /// Source text of the function.
    pub content: String,
    /// Free-form JSON metadata (`{"description": …}`).
    pub meta: Json<Value>,
    /// Epoch seconds.
    pub created_at: i64,
    /// Epoch seconds.
    pub updated_at: i64,
}

/// Column changes for a partial `function` update.
///
/// `None` leaves the column untouched.  `id` and `created_at` are immutable.
#[derive(Debug, Clone, Default)]
pub struct FunctionChanges {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub content: Option<String>,
    pub meta: Option<Value>,
}

// ---------------------------------------------------------------------------
// user
// ---------------------------------------------------------------------------

/// A persisted user row (only the columns this layer reads or writes).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Whole user settings document; `NULL` until first written.
    pub settings: Option<Json<Value>>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Column changes for a partial `user` update.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub settings: Option<Value>,
}

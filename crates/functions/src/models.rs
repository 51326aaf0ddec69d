//! Domain models for functions and the slice of the user record they touch.
//!
//! These are the types callers see.  They convert to and from the row
//! structs of the `db` crate; JSON columns are decoded here.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;

use db::models::{FunctionChanges, FunctionRow, UserChanges, UserRow};

use crate::FunctionsError;

/// Per-user override configuration for one function: an arbitrary JSON object.
pub type Valves = Map<String, Value>;

/// Decode a JSON object into `T`; anything else (`null`, scalars, arrays)
/// yields `T::default()`.
fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).map_err(D::Error::custom),
        _ => Ok(T::default()),
    }
}

// ---------------------------------------------------------------------------
// Function
// ---------------------------------------------------------------------------

/// Structured metadata stored alongside a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMeta {
    #[serde(default)]
    pub description: Option<String>,
}

/// A complete function record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionModel {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Category tag, e.g. `filter` or `action`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Source text of the function.
    pub content: String,
    pub meta: FunctionMeta,
    /// Epoch seconds.
    pub updated_at: i64,
    /// Epoch seconds.
    pub created_at: i64,
}

impl TryFrom<FunctionRow> for FunctionModel {
    type Error = FunctionsError;

    fn try_from(row: FunctionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            meta: serde_json::from_value(row.meta.0)?,
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            kind: row.kind,
            content: row.content,
            updated_at: row.updated_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<&FunctionModel> for FunctionRow {
    type Error = FunctionsError;

    fn try_from(model: &FunctionModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id.clone(),
            user_id: model.user_id.clone(),
            name: model.name.clone(),
            kind: model.kind.clone(),
            content: model.content.clone(),
            meta: Json(serde_json::to_value(&model.meta)?),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// A function as listed to clients: everything except `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub meta: FunctionMeta,
    pub updated_at: i64,
    pub created_at: i64,
}

impl From<FunctionModel> for FunctionResponse {
    fn from(model: FunctionModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            name: model.name,
            meta: model.meta,
            updated_at: model.updated_at,
            created_at: model.created_at,
        }
    }
}

/// Payload for creating a function.  Owner and type are supplied separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionForm {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub meta: FunctionMeta,
}

/// Partial update of a function.  `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionUpdate {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub meta: Option<FunctionMeta>,
}

impl TryFrom<FunctionUpdate> for FunctionChanges {
    type Error = FunctionsError;

    fn try_from(update: FunctionUpdate) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: update.user_id,
            name: update.name,
            kind: update.kind,
            content: update.content,
            meta: update.meta.as_ref().map(serde_json::to_value).transpose()?,
        })
    }
}

// ---------------------------------------------------------------------------
// User settings
// ---------------------------------------------------------------------------

/// The `functions` section of a user's settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSettings {
    /// Function id → that user's valves for it.  Entries are kept as raw
    /// JSON; only the one being read is interpreted.
    #[serde(default, deserialize_with = "object_or_default")]
    pub valves: BTreeMap<String, Value>,

    /// Keys this layer does not own; written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user's settings document.
///
/// Only `functions` is interpreted; every other key round-trips as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default, deserialize_with = "object_or_default")]
    pub functions: FunctionSettings,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserSettings {
    /// Valves stored for `function_id`, or an empty map if unset or not an object.
    pub fn function_valves(&self, function_id: &str) -> Valves {
        self.functions
            .valves
            .get(function_id)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the valves stored for `function_id`.
    pub fn set_function_valves(&mut self, function_id: impl Into<String>, valves: Valves) {
        self.functions.valves.insert(function_id.into(), Value::Object(valves));
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The user record as seen by the functions layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub settings: UserSettings,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<UserRow> for UserModel {
    type Error = FunctionsError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let settings = match row.settings {
            Some(Json(value @ Value::Object(_))) => serde_json::from_value(value)?,
            _ => UserSettings::default(),
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            settings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<&UserModel> for UserRow {
    type Error = FunctionsError;

    fn try_from(model: &UserModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id.clone(),
            name: model.name.clone(),
            email: model.email.clone(),
            settings: Some(Json(serde_json::to_value(&model.settings)?)),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Partial update of a user.  `settings` replaces the whole document.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub settings: Option<UserSettings>,
}

impl TryFrom<UserUpdate> for UserChanges {
    type Error = FunctionsError;

    fn try_from(update: UserUpdate) -> Result<Self, Self::Error> {
        Ok(Self {
            name: update.name,
            email: update.email,
            settings: update.settings.as_ref().map(serde_json::to_value).transpose()?,
        })
    }
}

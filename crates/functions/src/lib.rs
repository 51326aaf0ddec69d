//! `functions` crate — domain models and the `FunctionsTable` repository.
//!
//! `FunctionsTable` owns the `function` table and reaches into each user's
//! settings document (`settings.functions.valves`) through the [`UserStore`]
//! collaborator.

pub mod models;
pub mod error;
pub mod users;
pub mod mock;
pub mod table;

pub use models::{
    FunctionForm, FunctionMeta, FunctionModel, FunctionResponse, FunctionSettings, FunctionUpdate,
    UserModel, UserSettings, UserUpdate, Valves,
};
pub use error::FunctionsError;
pub use users::{UserStore, Users};
pub use table::FunctionsTable;

//! `functions-admin` CLI entry-point.
//!
//! Available sub-commands:
//! - `migrate` — run pending database migrations.
//! - `list`    — list functions, optionally filtered by type.
//! - `get`     — print one function including its content.
//! - `create`  — store a function from a source file.
//! - `update`  — change selected fields of a function.
//! - `delete`  — remove a function.
//! - `valves`  — read or write a user's valves for a function.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use functions::{
    FunctionForm, FunctionMeta, FunctionResponse, FunctionUpdate, FunctionsTable, Users, Valves,
};

#[derive(Parser)]
#[command(
    name = "functions-admin",
    about = "Inspect and manage stored functions and per-user valves",
    version
)]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(subcommand)]
    command: Command,
}

/// Connection settings, taken from flags or the environment.
#[derive(Args)]
struct DatabaseArgs {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://webui.db", global = true)]
    database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    max_connections: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending database migrations.
    Migrate,
    /// List functions (without their content).
    List {
        /// Only list functions of this type.
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Print a single function.
    Get { id: String },
    /// Store a new function.
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        /// Owner of the function.
        #[arg(long)]
        user: String,
        #[arg(long = "type")]
        kind: String,
        /// File holding the function source.
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change selected fields of a function.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        /// Replace the source with the contents of this file.
        #[arg(long)]
        content_file: Option<PathBuf>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a function.
    Delete { id: String },
    /// Per-user valves.
    Valves {
        #[command(subcommand)]
        command: ValvesCommand,
    },
}

#[derive(Subcommand)]
enum ValvesCommand {
    /// Print the valves a user has set for a function.
    Get {
        id: String,
        #[arg(long)]
        user: String,
    },
    /// Replace the valves a user has set for a function.
    Set {
        id: String,
        #[arg(long)]
        user: String,
        /// A JSON object.
        #[arg(long)]
        json: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pool = db::pool::create_pool(&cli.database.database_url, cli.database.max_connections)
        .await
        .context("failed to connect to database")?;

    let table = FunctionsTable::new(pool.clone(), Arc::new(Users::new(pool.clone())));

    match cli.command {
        Command::Migrate => {
            info!("Running migrations against {}", cli.database.database_url);
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
        }
        Command::List { kind } => {
            let list = match kind {
                Some(kind) => table.get_functions_by_type(&kind).await,
                None => table.get_functions().await,
            };
            let list: Vec<FunctionResponse> = list.into_iter().map(Into::into).collect();
            print_json(&list)?;
        }
        Command::Get { id } => match table.get_function_by_id(&id).await {
            Some(function) => print_json(&function)?,
            None => bail!("function '{id}' not found"),
        },
        Command::Create { id, name, user, kind, file, description } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read file {}", file.display()))?;
            let form = FunctionForm {
                id: id.clone(),
                name,
                content,
                meta: FunctionMeta { description },
            };
            match table.insert_new_function(&user, &kind, form).await {
                Some(function) => print_json(&FunctionResponse::from(function))?,
                None => bail!("could not create function '{id}'"),
            }
        }
        Command::Update { id, name, kind, content_file, description } => {
            let content = content_file
                .map(|path| {
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("cannot read file {}", path.display()))
                })
                .transpose()?;
            let update = FunctionUpdate {
                name,
                kind,
                content,
                meta: description.map(|d| FunctionMeta { description: Some(d) }),
                ..Default::default()
            };
            match table.update_function_by_id(&id, update).await {
                Some(function) => print_json(&FunctionResponse::from(function))?,
                None => bail!("could not update function '{id}'"),
            }
        }
        Command::Delete { id } => {
            if !table.delete_function_by_id(&id).await {
                bail!("could not delete function '{id}'");
            }
            info!("function '{id}' deleted");
        }
        Command::Valves { command } => match command {
            ValvesCommand::Get { id, user } => {
                match table.get_user_valves_by_id_and_user_id(&id, &user).await {
                    Some(valves) => print_json(&valves)?,
                    None => bail!("could not read valves of '{id}' for user '{user}'"),
                }
            }
            ValvesCommand::Set { id, user, json } => {
                let valves: Valves =
                    serde_json::from_str(&json).context("valves must be a JSON object")?;
                match table.update_user_valves_by_id_and_user_id(&id, &user, valves).await {
                    Some(valves) => print_json(&valves)?,
                    None => bail!("could not write valves of '{id}' for user '{user}'"),
                }
            }
        },
    }

    Ok(())
}

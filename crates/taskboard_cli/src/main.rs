//! Command line entry point for the task board.
//!
//! # Responsibility
//! - Map subcommands onto `BoardApi` calls.
//! - Print the response envelope as JSON; exit non-zero when `ok=false`.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use taskboard_api::{ApiResponse, BoardApi, CreateTaskRequest, UpdateTaskRequest};
use taskboard_core::{init_from_config, BoardConfig, MoveIntent};

/// Task board CLI
#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Manage tasks on a single ordered board", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config and environment)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sample board when the store is empty
    Init,

    /// Print the board with ordered columns and tasks
    Board,

    /// Append a task to a column
    Create {
        /// Column ID
        #[arg(long)]
        column: String,

        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Change a task's title and/or description
    Update {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// Empty string clears the description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },

    /// Move a task within or across columns
    Move {
        /// Task ID
        id: String,

        /// Column the task is currently in
        #[arg(long)]
        from: String,

        /// Destination column
        #[arg(long)]
        to: String,

        /// Insertion index in the destination
        #[arg(long, default_value_t = 0)]
        index: usize,
    },

    /// Renumber a column's positions to 0..n-1
    Compact {
        /// Column ID
        column: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match BoardConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("taskboard: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Err(err) = init_from_config(&config) {
        eprintln!("taskboard: logging disabled: {err}");
    }

    let api = BoardApi::new(config);
    match cli.command {
        Commands::Init => print_response(&api.seed()),
        Commands::Board => print_response(&api.get_board()),
        Commands::Create {
            column,
            title,
            description,
        } => print_response(&api.create(&CreateTaskRequest {
            column_id: column,
            title,
            description,
        })),
        Commands::Update {
            id,
            title,
            description,
        } => print_response(&api.update(&UpdateTaskRequest {
            task_id: id,
            title,
            description,
        })),
        Commands::Delete { id } => print_response(&api.delete(&id)),
        Commands::Move {
            id,
            from,
            to,
            index,
        } => print_response(&api.move_task(&MoveIntent::new(id, from, to, index))),
        Commands::Compact { column } => print_response(&api.compact_column(&column)),
    }
}

fn print_response<T: Serialize>(response: &ApiResponse<T>) -> ExitCode {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("taskboard: failed to encode response: {err}");
            return ExitCode::FAILURE;
        }
    }
    if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

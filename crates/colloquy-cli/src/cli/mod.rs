//! CLI command definitions and dispatch for the `clq` binary.
//!
//! Uses clap derive macros for argument parsing. All commands are thin
//! surfaces over the orchestrator and stores; none carry business logic.

pub mod chat;
pub mod list;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Persistent LLM chat sessions with call auditing.
#[derive(Parser)]
#[command(name = "clq", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new chat and print its id.
    New,

    /// Send a user message to a chat and print the assistant reply.
    Send {
        /// Chat to send into.
        chat_id: Uuid,
        /// Message text.
        text: String,
        /// Model to use (defaults to the configured default model).
        #[arg(long)]
        model: Option<String>,
        /// Send only this message instead of the full history.
        #[arg(long)]
        no_history: bool,
    },

    /// Set the chat's single system message.
    System {
        chat_id: Uuid,
        text: String,
    },

    /// Print the ordered message history of a chat.
    History {
        chat_id: Uuid,
    },

    /// List resources.
    #[command(alias = "ls")]
    List {
        #[command(subcommand)]
        resource: ListResource,
    },

    /// Delete a chat along with its messages and call records.
    #[command(alias = "rm")]
    Delete {
        chat_id: Uuid,
        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ListResource {
    /// Chats with their cumulative token totals.
    Chats,

    /// Provider call records.
    Calls {
        /// Only show calls belonging to this chat.
        #[arg(long)]
        chat: Option<Uuid>,
    },
}

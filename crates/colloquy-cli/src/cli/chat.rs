//! Chat CLI commands: new, send, system, history, delete.

use std::collections::HashMap;

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use tracing::{debug, info};
use uuid::Uuid;

use colloquy_core::actor::ActorStore;
use colloquy_core::chat::conversation::Conversation;
use colloquy_core::chat::store::ChatStore;
use colloquy_infra::sqlite::actor::SqliteActorStore;
use colloquy_infra::sqlite::chat::SqliteChatStore;
use colloquy_types::chat::MessageRole;

use crate::state::AppState;

type CliConversation = Conversation<SqliteChatStore, SqliteActorStore>;

async fn resume(state: &AppState, chat_id: Uuid) -> Result<CliConversation> {
    Conversation::resume(state.chat_store(), state.actor_store(), chat_id)
        .await
        .with_context(|| format!("Chat '{chat_id}' not found"))
}

/// Create a new chat and print its id.
pub async fn new_chat(state: &AppState, json: bool) -> Result<()> {
    let conv = Conversation::create(state.chat_store(), state.actor_store()).await?;
    let chat = conv.chat();
    info!(chat_id = %chat.id, "Chat created");

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({"chat_id": chat.id}))?
        );
    } else {
        println!();
        println!(
            "  {} Chat created: {}",
            style("+").green().bold(),
            style(chat.id).cyan()
        );
        println!();
    }

    Ok(())
}

/// Send a user message through the full turn workflow.
pub async fn send(
    state: &AppState,
    chat_id: Uuid,
    text: &str,
    model: Option<String>,
    no_history: bool,
    json: bool,
) -> Result<()> {
    let provider = state.provider()?;
    let mut conv = resume(state, chat_id).await?;

    let model = model.unwrap_or_else(|| state.config.default_model.clone());
    debug!(chat_id = %chat_id, model = %model, include_history = !no_history, "Sending user message");
    let turn = conv
        .send_user_message(&provider, &model, text, None, !no_history)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turn)?);
        return Ok(());
    }

    println!();
    println!("{}", turn.assistant.body);
    println!();
    println!(
        "  {}",
        style(format!(
            "{} | {} in / {} out | chat total {} in / {} out",
            model,
            turn.call.input_tokens,
            turn.call.output_tokens,
            conv.chat().input_tokens_total,
            conv.chat().output_tokens_total,
        ))
        .dim()
    );
    println!();

    Ok(())
}

/// Set the chat's single system message.
pub async fn system_message(state: &AppState, chat_id: Uuid, text: &str, json: bool) -> Result<()> {
    let conv = resume(state, chat_id).await?;
    let message = conv.create_system_message(text, None).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&message)?);
    } else {
        println!(
            "  {} System message set for chat {}",
            style("+").green().bold(),
            style(chat_id).cyan()
        );
    }

    Ok(())
}

/// Print the ordered message history of a chat.
pub async fn history(state: &AppState, chat_id: Uuid, json: bool) -> Result<()> {
    let conv = resume(state, chat_id).await?;
    let messages = conv.history().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} Chat {} has no messages yet.",
            style("i").blue().bold(),
            style(chat_id).cyan()
        );
        println!();
        return Ok(());
    }

    // Resolve author handles once per actor.
    let actors = state.actor_store();
    let mut handles: HashMap<String, String> = HashMap::new();
    for message in &messages {
        let key = message.actor_id.to_string();
        if !handles.contains_key(&key) {
            let handle = actors
                .get_actor(&message.actor_id)
                .await?
                .map(|a| a.handle)
                .unwrap_or_else(|| "(unknown)".to_string());
            handles.insert(key, handle);
        }
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Author").fg(Color::White),
        Cell::new("Text").fg(Color::White),
    ]);

    for message in &messages {
        let role_cell = match message.role {
            MessageRole::User => Cell::new("user").fg(Color::Green),
            MessageRole::Assistant => Cell::new("assistant").fg(Color::Cyan),
            MessageRole::System => Cell::new("system").fg(Color::Yellow),
        };
        let handle = handles
            .get(&message.actor_id.to_string())
            .cloned()
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(message.created_at.format("%Y-%m-%d %H:%M:%S").to_string())
                .fg(Color::DarkGrey),
            role_cell,
            Cell::new(handle).fg(Color::DarkGrey),
            Cell::new(&message.body),
        ]);
    }

    println!();
    println!("  History for chat {}", style(chat_id).cyan().bold());
    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Delete a chat with confirmation.
pub async fn delete_chat(state: &AppState, chat_id: Uuid, force: bool, json: bool) -> Result<()> {
    let store = state.chat_store();
    let chat = store
        .get_chat(&chat_id)
        .await?
        .with_context(|| format!("Chat '{chat_id}' not found"))?;

    let message_count = store.count_messages(&chat_id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete chat {} ({} messages)?",
                style(chat.id).red().bold(),
                message_count
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    store.delete_chat(&chat_id).await?;
    info!(chat_id = %chat_id, messages = message_count, "Chat deleted");

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": true, "chat_id": chat_id.to_string()})
        );
    } else {
        println!(
            "  {} Chat {} deleted.",
            style("x").red().bold(),
            style(chat_id).cyan()
        );
    }

    Ok(())
}

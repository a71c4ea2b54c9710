//! Read-only admin list views over chats and call records.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use uuid::Uuid;

use colloquy_core::chat::store::ChatStore;
use colloquy_types::chat::CallStatus;

use crate::state::AppState;

/// List chats with their cumulative token totals, newest first.
pub async fn list_chats(state: &AppState, json: bool) -> Result<()> {
    let chats = state.chat_store().list_chats(None, None).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chats)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!();
        println!(
            "  {} No chats yet. Start one with: {}",
            style("i").blue().bold(),
            style("clq new").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Created").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Tokens in").fg(Color::White),
        Cell::new("Tokens out").fg(Color::White),
    ]);

    for chat in &chats {
        table.add_row(vec![
            Cell::new(chat.id.to_string()).fg(Color::Cyan),
            Cell::new(chat.created_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(chat.updated_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
            Cell::new(chat.input_tokens_total.to_string()),
            Cell::new(chat.output_tokens_total.to_string()),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} chat{}",
        style(chats.len()).bold(),
        if chats.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// List provider call records, optionally filtered to one chat.
pub async fn list_calls(state: &AppState, chat: Option<Uuid>, json: bool) -> Result<()> {
    let calls = state
        .chat_store()
        .list_calls(chat.as_ref(), None, None)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&calls)?);
        return Ok(());
    }

    if calls.is_empty() {
        println!();
        println!("  {} No call records.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Chat").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Tokens in").fg(Color::White),
        Cell::new("Tokens out").fg(Color::White),
        Cell::new("Response").fg(Color::White),
    ]);

    for call in &calls {
        let status_cell = match call.status {
            CallStatus::New => Cell::new("new").fg(Color::Yellow),
            CallStatus::GenerationInProgress => {
                Cell::new("generation_in_progress").fg(Color::Blue)
            }
            CallStatus::GenerationCompleted => {
                Cell::new("generation_completed").fg(Color::Green)
            }
        };
        let response_cell = if call.response_data.is_some() {
            Cell::new("archived").fg(Color::DarkGrey)
        } else {
            Cell::new("-").fg(Color::DarkGrey)
        };

        table.add_row(vec![
            Cell::new(call.id.to_string()).fg(Color::Cyan),
            Cell::new(call.chat_id.to_string()).fg(Color::DarkGrey),
            status_cell,
            Cell::new(call.input_tokens.to_string()),
            Cell::new(call.output_tokens.to_string()),
            response_cell,
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} call{}",
        style(calls.len()).bold(),
        if calls.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

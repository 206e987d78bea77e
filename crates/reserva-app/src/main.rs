//! Terminal demo for the booking widget.
//!
//! Wires the in-process dialogue engine into the orchestrator and drives a
//! conversation over stdin, rendering agent replies and their chips as
//! plain text. Chip selection is simulated by typing the chip label (or
//! `/confirmar` for the booking confirmation).

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use reserva_core::catalog::Catalog;
use reserva_core::config::WidgetConfig;
use reserva_core::types::{slot_label, MessageMetadata, MessageSender};
use reserva_dialogue::DialogueEngine;
use reserva_widget::{ChatOrchestrator, LocalBackend, WidgetCallbacks};

/// Resolve the config file path (RESERVA_CONFIG env, or ./reserva.toml).
fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("RESERVA_CONFIG") {
        return PathBuf::from(p);
    }
    PathBuf::from("reserva.toml")
}

/// Print every message not yet shown, returning the new high-water mark.
fn print_new_messages(orchestrator: &ChatOrchestrator, printed: usize) -> usize {
    let state = orchestrator.state();
    for message in &state.messages[printed..] {
        let prefix = match message.sender {
            MessageSender::User => "tú    ",
            MessageSender::Agent => "agente",
            MessageSender::System => "sistema",
        };
        println!("[{}] {}", prefix, message.text);
        match &message.metadata {
            Some(MessageMetadata::ServiceChips { services }) => {
                for service in services {
                    println!("        · {} ({} min)", service.name, service.duration_minutes);
                }
            }
            Some(MessageMetadata::ProviderChips { providers }) => {
                for provider in providers {
                    println!("        · {}", provider.name);
                }
            }
            Some(MessageMetadata::TimeSlots { time_slots }) => {
                for slot in time_slots {
                    println!("        · {}", slot_label(slot));
                }
            }
            Some(MessageMetadata::OptionChips { options }) => {
                for option in options {
                    println!("        · {} [{}]", option.label, option.value);
                }
            }
            Some(MessageMetadata::BookingConfirmation { booking: Some(b) }) => {
                println!("        · reserva {} ({})", b.id, b.status);
            }
            _ => {}
        }
    }
    state.messages.len()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting reserva demo v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = config_path();
    let config = WidgetConfig::load_or_default(&config_file);

    // Engine, local backend, orchestrator.
    let engine = Arc::new(DialogueEngine::from_config(Catalog::demo(), &config));
    let backend = Box::new(LocalBackend::new(Arc::clone(&engine), &config));
    let callbacks = WidgetCallbacks::new()
        .on_ready(|| tracing::info!("Widget ready"))
        .on_open(|| tracing::debug!("Widget opened"))
        .on_close(|| tracing::debug!("Widget closed"))
        .on_booking_created(|booking| {
            tracing::info!(booking_id = %booking.id, "Booking created")
        })
        .on_error(|error| tracing::warn!(code = error.code(), "{}", error));
    let orchestrator = ChatOrchestrator::new(backend, config, callbacks);

    orchestrator.initialize().await?;
    orchestrator.open();

    let mut printed = print_new_messages(&orchestrator, 0);
    println!();
    println!("Escribe tu mensaje ('/confirmar' confirma la reserva, Ctrl-D sale):");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let result = if text == "/confirmar" {
            orchestrator.select_option("confirm").await
        } else {
            orchestrator.send_message(text).await
        };
        if let Err(e) = result {
            tracing::debug!("Turn rejected: {}", e);
        }
        printed = print_new_messages(&orchestrator, printed);
    }

    orchestrator.close();
    tracing::info!(
        active_sessions = engine.sessions().len(),
        "Demo finished"
    );
    Ok(())
}

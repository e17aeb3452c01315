//! helpdesk-bridge - chat front-end for a ticketing backend
//!
//! Translates free-text chat turns into ticket-management API calls and
//! routes the backend's asynchronous update notifications back to the right
//! chat peer.

mod address_book;
mod api;
mod chat;
mod config;
mod messages;
mod runtime;
mod state_machine;
mod ticketing;
mod webhook;

use address_book::AddressBook;
use api::{create_router, AppState};
use chat::{ChatSender, ConsoleChat, InboundMessage, MessageBody};
use config::Config;
use runtime::{Engine, TimerRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use ticketing::RestTicketing;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhook::{SuppressionRegistry, WebhookCoalescer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_bridge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
        .init();

    let config = Config::from_env();

    tracing::info!(path = %config.address_book_path, "Loading address book");
    let address_book = Arc::new(AddressBook::load(&config.address_book_path)?);

    let timers = Arc::new(TimerRegistry::new());
    let suppression = Arc::new(SuppressionRegistry::new(config.suppression_cooldown));
    let gateway = Arc::new(RestTicketing::new(
        &config.backend_url,
        &config.app_token,
        &config.user_token,
    ));

    // No transport adapter configured: outbound messages go to the log.
    let chat_sender = Arc::new(ConsoleChat);

    let engine = Engine::new(
        config.clone(),
        gateway,
        chat_sender.clone(),
        address_book.clone(),
        suppression.clone(),
        timers.clone(),
    );

    let coalescer = Arc::new(WebhookCoalescer::new(
        config.webhook_delay,
        chat_sender as Arc<dyn ChatSender>,
        address_book,
        suppression,
        timers,
    ));

    // Local console transport: each stdin line is one chat turn from a demo
    // user. A real transport adapter calls `engine.on_message` the same way.
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                engine
                    .on_message(InboundMessage {
                        sender: "console:local".to_string(),
                        display_name: "Console".to_string(),
                        body: MessageBody::Text(line),
                    })
                    .await;
            }
        });
    }

    let app = create_router(AppState { coalescer });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    tracing::info!("Webhook ingress listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

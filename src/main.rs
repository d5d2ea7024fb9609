use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use dotenvy::dotenv;
use teloxide::dispatching::dialogue::{serializer::Json, SqliteStorage};
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::level_filters;
use tracing_subscriber::fmt::format::FmtSpan;

use olympiadquizbot::config::Config;
use olympiadquizbot::database::connection::Connection;
use olympiadquizbot::schema::schema;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level_filters::LevelFilter::from_level(log_level))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_ansi(true)
        .with_line_number(true)
        .with_target(false)
        .init();

    let config = Arc::new(Config::from_env().expect("invalid configuration"));
    let connection = Arc::new(
        Connection::open(&config.database_path)
            .await
            .expect("failed to open the question store"),
    );
    let storage = SqliteStorage::open(&config.sessions_path, Json)
        .await
        .expect("failed to open the session store");

    let bot = Bot::new(config.bot_token.clone());
    log::info!("Starting the quiz bot...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![storage, connection, config.clone()])
        .enable_ctrlc_handler()
        .build();

    match &config.webhook_url {
        Some(base_url) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            // The bot token doubles as the secret path segment.
            let url = base_url
                .join(&format!("webhook/{}", config.bot_token))
                .expect("WEBHOOK_URL cannot carry the webhook path");
            let (listener, stop_flag, router) =
                webhooks::axum_to_router(bot, Options::new(addr, url))
                    .await
                    .expect("failed to register the webhook");
            let router = router.route("/health", get(|| async { StatusCode::OK }));

            tokio::spawn(async move {
                let tcp = tokio::net::TcpListener::bind(addr)
                    .await
                    .expect("failed to bind the webhook port");
                if let Err(error) = axum::serve(tcp, router)
                    .with_graceful_shutdown(stop_flag)
                    .await
                {
                    log::error!("webhook server stopped: {error}");
                }
            });

            dispatcher
                .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
                .await
        }
        None => dispatcher.dispatch().await,
    }
}

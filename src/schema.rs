//! The dptree update schema and the thin endpoints that bridge Telegram
//! updates into conversation-engine events.

use std::sync::Arc;

use teloxide::dispatching::dialogue::{self, serializer::Json, SqliteStorage};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::net::Download;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::Document;
use tracing::instrument;

use crate::commands::{self, Command};
use crate::config::Config;
use crate::database::connection::{Connection, QuizStore};
use crate::engine::{self, Actor, Event};
use crate::keyboard;
use crate::state::State;
use crate::{HandlerResult, UserDialogue};

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler =
        teloxide::filter_command::<Command, _>().endpoint(commands::dispatch::<Connection>);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| msg.document().is_some())
                .endpoint(received_document::<Connection>),
        )
        .endpoint(received_text::<Connection>);

    dialogue::enter::<Update, SqliteStorage<Json>, State, _>().branch(message_handler)
}

#[instrument(level = "info", skip(bot, dialogue, connection, config))]
pub(crate) async fn received_text<S: QuizStore>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    connection: Arc<S>,
    config: Arc<Config>,
) -> HandlerResult {
    match msg.text() {
        Some(text) => {
            let event = Event::Text(text.to_owned());
            drive(&bot, &dialogue, &msg, &config, connection.as_ref(), event).await
        }
        None => {
            bot.send_message(
                msg.chat.id,
                "I can only work with text messages and XLS/XLSX documents.",
            )
            .await?;
            Ok(())
        }
    }
}

#[instrument(level = "info", skip(bot, dialogue, connection, config))]
pub(crate) async fn received_document<S: QuizStore>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    connection: Arc<S>,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(document) = msg.document() else {
        return Ok(());
    };
    let file_name = document
        .file_name
        .clone()
        .unwrap_or_else(|| "unnamed".to_owned());

    // The payload is only worth fetching while an admin upload is pending;
    // everywhere else the engine ignores the document anyway.
    let awaiting = matches!(
        dialogue.get().await?.unwrap_or_default(),
        State::AdminAwaitingUploadFile | State::AdminAwaitingAppendFile
    );
    let payload = if awaiting {
        match fetch_document(&bot, document).await {
            Ok(bytes) => bytes,
            Err(error) => {
                log::error!("failed to download '{file_name}': {error}");
                bot.send_message(
                    msg.chat.id,
                    "I could not download that file. Please try sending it again.",
                )
                .await?;
                return Ok(());
            }
        }
    } else {
        Vec::new()
    };

    let event = Event::Document { file_name, payload };
    drive(&bot, &dialogue, &msg, &config, connection.as_ref(), event).await
}

async fn fetch_document(
    bot: &Bot,
    document: &Document,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let file = bot.get_file(document.file.id.clone()).await?;
    let mut payload = Vec::new();
    bot.download_file(&file.path, &mut payload).await?;
    Ok(payload)
}

/// Loads the sender's dialogue state, runs one engine transition, persists
/// the resulting state and sends the emitted replies.
pub(crate) async fn drive<S: QuizStore>(
    bot: &Bot,
    dialogue: &UserDialogue,
    msg: &Message,
    config: &Config,
    store: &S,
    event: Event,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        log::warn!("ignoring an update without a sender in chat {}", msg.chat.id);
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let actor = Actor {
        id: user_id,
        first_name: user.first_name.clone(),
        username: user.username.clone(),
        is_admin: config.is_admin(user_id),
    };

    let state = dialogue.get().await?.unwrap_or_default();
    match engine::step(state, event, &actor, store).await {
        Ok(outcome) => {
            dialogue.update(outcome.next).await?;
            for reply in outcome.replies {
                let mut request = bot.send_message(msg.chat.id, reply.text);
                if let Some(kb) = reply.keyboard {
                    request = request.reply_markup(keyboard::markup(kb));
                }
                request.await?;
            }
        }
        Err(error) => {
            log::error!("{user_id}: store failure: {error}");
            bot.send_message(
                msg.chat.id,
                "Something went wrong on our side. Please try again later.",
            )
            .await?;
        }
    }

    Ok(())
}

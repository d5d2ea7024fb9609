use std::sync::Arc;

use teloxide::types::Message;
use teloxide::utils::command::BotCommands;
use teloxide::Bot;
use tracing::instrument;

use crate::config::Config;
use crate::database::connection::QuizStore;
use crate::engine::Event;
use crate::schema::drive;
use crate::{HandlerResult, UserDialogue};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "show the topic menu.")]
    Start,
    #[command(description = "show a hint for the current question.")]
    Hint,
    #[command(description = "show the answer to the current question.")]
    Answer,
    #[command(description = "move on to the next question.")]
    Next,
    #[command(description = "leave the current quiz.")]
    Cancel,
    #[command(description = "open the admin panel (administrators only).")]
    Admin,
    #[command(description = "display this help.")]
    Help,
}

#[instrument(level = "info", skip(bot, dialogue, connection, config))]
pub(crate) async fn dispatch<S: QuizStore>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    cmd: Command,
    connection: Arc<S>,
    config: Arc<Config>,
) -> HandlerResult {
    drive(
        &bot,
        &dialogue,
        &msg,
        &config,
        connection.as_ref(),
        Event::Command(cmd),
    )
    .await
}

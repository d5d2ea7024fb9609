//! The conversation engine: an explicit transition function over
//! `(State, Event)` pairs.
//!
//! Handlers in `schema.rs` translate Telegram updates into [`Event`]s and
//! send whatever [`Reply`]s come back; everything the bot *decides* happens
//! here, against the [`QuizStore`] trait, which keeps the whole dialog
//! testable without a network or a real database.

use teloxide::utils::command::BotCommands;

use crate::commands::Command;
use crate::database::connection::{QuizStore, StoreError};
use crate::database::model::{Question, Topic, UserProfile};
use crate::importer::{self, ImportBatch};
use crate::state::State;

pub const BTN_UPLOAD: &str = "📁 Upload new bank";
pub const BTN_APPEND: &str = "➕ Append to bank";
pub const BTN_CLEAR: &str = "🧹 Clear bank";
pub const BTN_EXIT: &str = "↩️ Exit admin mode";
pub const BTN_CANCEL: &str = "↩️ Cancel";

const COLUMNS_NOTE: &str = "Columns: Topic, Question, Hint, Answer, Difficulty (optional).";

/// The sender of the update, resolved by the dispatcher.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub enum Event {
    Command(Command),
    Text(String),
    Document { file_name: String, payload: Vec<u8> },
}

/// A keyboard to attach to a reply; mapped to teloxide markup in `keyboard.rs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    Remove,
    Topics(Vec<String>),
    QuizActions,
    AdminMenu,
    UploadCancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub next: State,
    pub replies: Vec<Reply>,
}

impl Outcome {
    fn new(next: State, replies: Vec<Reply>) -> Self {
        Self { next, replies }
    }

    fn stay(state: State, reply: Reply) -> Self {
        Self::new(state, vec![reply])
    }
}

/// Runs one transition. Import failures are ordinary replies (the file is
/// rejected, the state stays put); only store failures surface as `Err`.
pub async fn step<S: QuizStore>(
    state: State,
    event: Event,
    actor: &Actor,
    store: &S,
) -> Result<Outcome, StoreError> {
    match (state, event) {
        (_, Event::Command(Command::Start)) => start(actor, store).await,

        (_, Event::Command(Command::Cancel)) => Ok(Outcome::stay(
            State::Idle,
            Reply::with_keyboard("Cancelled. Send /start whenever you want to play again.", Keyboard::Remove),
        )),

        (state, Event::Command(Command::Help)) => Ok(Outcome::stay(
            state,
            Reply::text(Command::descriptions().to_string()),
        )),

        (state, Event::Command(Command::Admin)) => {
            if actor.is_admin {
                log::info!("{} opened the admin panel", actor.id);
                Ok(Outcome::stay(State::AdminMenu, admin_menu()))
            } else {
                log::warn!("{} tried /admin without being an administrator", actor.id);
                Ok(Outcome::stay(
                    state,
                    Reply::text("❌ Access denied: this command is for administrators."),
                ))
            }
        }

        (State::InQuiz { topic, questions, current }, Event::Command(Command::Hint)) => {
            let reply = Reply::with_keyboard(
                format!("💡 Hint: {}", questions[current].hint),
                Keyboard::QuizActions,
            );
            Ok(Outcome::stay(State::InQuiz { topic, questions, current }, reply))
        }

        (State::InQuiz { topic, questions, current }, Event::Command(Command::Answer)) => {
            let reply = Reply::with_keyboard(
                format!("✅ Answer: {}", questions[current].answer),
                Keyboard::QuizActions,
            );
            Ok(Outcome::stay(State::InQuiz { topic, questions, current }, reply))
        }

        (State::InQuiz { topic, questions, current }, Event::Command(Command::Next)) => {
            let next = current + 1;
            if next < questions.len() {
                let card = question_card(&topic, &questions, next);
                Ok(Outcome::stay(State::InQuiz { topic, questions, current: next }, card))
            } else {
                log::info!("{} finished the '{}' topic", actor.id, topic);
                let topics = store.list_topics().await?;
                Ok(Outcome::new(
                    State::BrowsingTopics,
                    vec![
                        Reply::text("🎉 That was the last question in this topic!"),
                        topic_menu(&topics),
                    ],
                ))
            }
        }

        (State::BrowsingTopics, Event::Command(Command::Hint | Command::Answer | Command::Next)) => {
            Ok(Outcome::stay(
                State::BrowsingTopics,
                Reply::text("Choose a topic first."),
            ))
        }

        (state, Event::Command(Command::Hint | Command::Answer | Command::Next)) => {
            Ok(not_applicable(state))
        }

        (State::BrowsingTopics, Event::Text(text)) => select_topic(text, store).await,

        (State::AdminMenu, Event::Text(text)) => admin_menu_choice(&text, store).await,

        (state @ (State::AdminAwaitingUploadFile | State::AdminAwaitingAppendFile), Event::Text(text)) => {
            if text == BTN_CANCEL {
                Ok(Outcome::stay(State::AdminMenu, admin_menu()))
            } else {
                Ok(Outcome::stay(
                    state,
                    Reply::with_keyboard(
                        "Please send an XLS/XLSX document, or cancel.",
                        Keyboard::UploadCancel,
                    ),
                ))
            }
        }

        (state @ State::InQuiz { .. }, Event::Text(_)) => Ok(Outcome::stay(
            state,
            Reply::with_keyboard(
                "Use /hint, /answer or /next — or /cancel to leave the quiz.",
                Keyboard::QuizActions,
            ),
        )),

        (State::Idle, Event::Text(_)) => Ok(Outcome::stay(
            State::Idle,
            Reply::text("Send /start to begin."),
        )),

        (State::AdminAwaitingUploadFile, Event::Document { file_name, payload }) => {
            apply_import(ImportMode::Replace, &file_name, &payload, store).await
        }

        (State::AdminAwaitingAppendFile, Event::Document { file_name, payload }) => {
            apply_import(ImportMode::Append, &file_name, &payload, store).await
        }

        (state, Event::Document { .. }) => Ok(not_applicable(state)),
    }
}

fn not_applicable(state: State) -> Outcome {
    Outcome::stay(
        state,
        Reply::text("That is not applicable right now. Send /help to see the available commands."),
    )
}

async fn start<S: QuizStore>(actor: &Actor, store: &S) -> Result<Outcome, StoreError> {
    store
        .upsert_user(&UserProfile {
            telegram_id: actor.id,
            first_name: actor.first_name.clone(),
            username: actor.username.clone(),
        })
        .await?;

    let topics = store.list_topics().await?;
    let greeting = format!("Hi, {}! I am a quiz bot.", actor.first_name);

    let replies = if topics.is_empty() {
        vec![
            Reply::text(greeting),
            Reply::with_keyboard(
                "The question bank is empty. Ask an administrator to upload one.",
                Keyboard::Remove,
            ),
        ]
    } else {
        vec![
            Reply::text(greeting),
            topic_menu(&topics),
        ]
    };

    Ok(Outcome::new(State::BrowsingTopics, replies))
}

async fn select_topic<S: QuizStore>(name: String, store: &S) -> Result<Outcome, StoreError> {
    let questions = store.list_questions(&name).await?;
    if questions.is_empty() {
        let topics = store.list_topics().await?;
        let known = topics
            .iter()
            .any(|topic| topic.name.to_lowercase() == name.to_lowercase());
        let text = if known {
            format!("The topic '{name}' has no questions yet.")
        } else {
            format!("I don't know the topic '{name}'. Pick one from the menu:")
        };
        return Ok(Outcome::new(
            State::BrowsingTopics,
            vec![Reply::text(text), topic_menu(&topics)],
        ));
    }

    let card = question_card(&name, &questions, 0);
    Ok(Outcome::stay(
        State::InQuiz {
            topic: name,
            questions,
            current: 0,
        },
        card,
    ))
}

async fn admin_menu_choice<S: QuizStore>(choice: &str, store: &S) -> Result<Outcome, StoreError> {
    match choice {
        BTN_UPLOAD => Ok(Outcome::stay(
            State::AdminAwaitingUploadFile,
            Reply::with_keyboard(
                format!("📥 Send an XLS/XLSX file to REPLACE the question bank.\n{COLUMNS_NOTE}"),
                Keyboard::UploadCancel,
            ),
        )),
        BTN_APPEND => Ok(Outcome::stay(
            State::AdminAwaitingAppendFile,
            Reply::with_keyboard(
                format!("📥 Send an XLS/XLSX file to APPEND to the question bank.\n{COLUMNS_NOTE}"),
                Keyboard::UploadCancel,
            ),
        )),
        BTN_CLEAR => {
            store.clear_all().await?;
            log::info!("the question bank was cleared");
            Ok(Outcome::stay(
                State::AdminMenu,
                Reply::with_keyboard("🧹 The question bank is now empty.", Keyboard::AdminMenu),
            ))
        }
        BTN_EXIT => Ok(Outcome::stay(
            State::Idle,
            Reply::with_keyboard("You left the admin panel.", Keyboard::Remove),
        )),
        _ => Ok(Outcome::stay(State::AdminMenu, admin_menu())),
    }
}

enum ImportMode {
    Replace,
    Append,
}

async fn apply_import<S: QuizStore>(
    mode: ImportMode,
    file_name: &str,
    payload: &[u8],
    store: &S,
) -> Result<Outcome, StoreError> {
    let batch: ImportBatch = match importer::parse(file_name, payload) {
        Ok(batch) => batch,
        Err(error) => {
            log::warn!("import of '{file_name}' rejected: {error}");
            let stay = match mode {
                ImportMode::Replace => State::AdminAwaitingUploadFile,
                ImportMode::Append => State::AdminAwaitingAppendFile,
            };
            return Ok(Outcome::stay(
                stay,
                Reply::with_keyboard(
                    format!("❌ Import rejected: {error}. The question bank was not changed."),
                    Keyboard::UploadCancel,
                ),
            ));
        }
    };

    let stats = match mode {
        ImportMode::Replace => store.replace_all(&batch).await?,
        ImportMode::Append => store.append_all(&batch).await?,
    };
    log::info!(
        "imported {} questions across {} topics from '{file_name}'",
        stats.questions,
        stats.topics
    );

    Ok(Outcome::stay(
        State::AdminMenu,
        Reply::with_keyboard(
            format!(
                "✅ Imported {} questions across {} new topics.",
                stats.questions, stats.topics
            ),
            Keyboard::AdminMenu,
        ),
    ))
}

fn question_card(topic: &str, questions: &[Question], index: usize) -> Reply {
    let question = &questions[index];
    Reply::with_keyboard(
        format!(
            "📚 Topic: {topic}\n💡 Difficulty: {}\n\n❓ Question {}/{}: {}\n\n\
             /hint — show the hint\n/answer — show the answer\n/next — next question",
            question.difficulty,
            index + 1,
            questions.len(),
            question.text,
        ),
        Keyboard::QuizActions,
    )
}

fn topic_menu(topics: &[Topic]) -> Reply {
    if topics.is_empty() {
        return Reply::with_keyboard("The question bank is empty.", Keyboard::Remove);
    }
    let names = topics.iter().map(|topic| topic.name.clone()).collect();
    Reply::with_keyboard("Please choose a topic:", Keyboard::Topics(names))
}

fn admin_menu() -> Reply {
    Reply::with_keyboard("🛡️ Admin panel. Choose an action:", Keyboard::AdminMenu)
}

use state::State;
use teloxide::dispatching::dialogue::{serializer::Json, SqliteStorage};
use teloxide::prelude::Dialogue;

pub mod commands;
pub mod config;
pub mod database;
pub mod engine;
pub mod importer;
pub mod keyboard;
pub mod schema;
pub mod state;

pub type UserDialogue = Dialogue<State, SqliteStorage<Json>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

use serde::{Deserialize, Serialize};

use crate::database::model::Question;

/// Per-user dialogue state, persisted between restarts in the session store.
///
/// `Idle` is both the initial state and the state `/cancel` returns to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum State {
    #[default]
    Idle,
    /// The topic menu was shown; the next text message selects a topic.
    BrowsingTopics,
    /// Inside a quiz. The question sequence of the selected topic is cached
    /// here so `/hint` and `/answer` never re-query the store; `current`
    /// stays strictly below `questions.len()`.
    InQuiz {
        topic: String,
        questions: Vec<Question>,
        current: usize,
    },
    AdminMenu,
    AdminAwaitingUploadFile,
    AdminAwaitingAppendFile,
}

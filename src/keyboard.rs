use teloxide::types::{KeyboardButton, KeyboardMarkup, ReplyMarkup};

use crate::engine::{Keyboard, BTN_APPEND, BTN_CANCEL, BTN_CLEAR, BTN_EXIT, BTN_UPLOAD};

pub(crate) fn markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Remove => ReplyMarkup::kb_remove(),
        Keyboard::Topics(names) => ReplyMarkup::Keyboard(topics_keyboard(&names)),
        Keyboard::QuizActions => ReplyMarkup::Keyboard(quiz_actions_keyboard()),
        Keyboard::AdminMenu => ReplyMarkup::Keyboard(admin_menu_keyboard()),
        Keyboard::UploadCancel => ReplyMarkup::Keyboard(upload_cancel_keyboard()),
    }
}

fn topics_keyboard(topics: &[String]) -> KeyboardMarkup {
    let keyboard = topics
        .iter()
        .map(|topic| vec![KeyboardButton::new(topic)]);

    KeyboardMarkup::new(keyboard)
}

fn quiz_actions_keyboard() -> KeyboardMarkup {
    let keyboard = vec![
        vec![
            KeyboardButton::new("/hint"),
            KeyboardButton::new("/answer"),
            KeyboardButton::new("/next"),
        ],
        vec![KeyboardButton::new("/cancel")],
    ];

    KeyboardMarkup::new(keyboard)
}

fn admin_menu_keyboard() -> KeyboardMarkup {
    let keyboard = vec![
        vec![KeyboardButton::new(BTN_UPLOAD), KeyboardButton::new(BTN_APPEND)],
        vec![KeyboardButton::new(BTN_CLEAR)],
        vec![KeyboardButton::new(BTN_EXIT)],
    ];

    KeyboardMarkup::new(keyboard)
}

fn upload_cancel_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_CANCEL)]])
}

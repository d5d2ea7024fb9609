//! End-to-end import flow: workbook bytes through the importer into the
//! question store.

use olympiadquizbot::database::connection::{Connection, QuizStore};
use olympiadquizbot::database::model::Difficulty;
use olympiadquizbot::importer::{self, ImportError};
use rust_xlsxwriter::Workbook;

fn workbook_bytes(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

#[tokio::test]
async fn uploaded_workbook_round_trips_through_the_store() {
    let bytes = workbook_bytes(&[
        &["Topic", "Question", "Hint", "Answer", "Difficulty"],
        &["Math", "2+2?", "count", "4", "easy"],
        &["Math", "3*3?", "square", "9", ""],
        &["History", "First man in space?", "1961", "Gagarin", "hard"],
    ]);

    let batch = importer::parse("bank.xlsx", &bytes).unwrap();
    let store = Connection::open_in_memory().await.unwrap();
    let stats = store.replace_all(&batch).await.unwrap();
    assert_eq!(stats.topics, 2);
    assert_eq!(stats.questions, 3);

    let math = store.list_questions("Math").await.unwrap();
    assert_eq!(math.len(), 2);
    assert_eq!(math[0].text, "2+2?");
    assert_eq!(math[0].hint, "count");
    assert_eq!(math[0].answer, "4");
    assert_eq!(math[0].difficulty, Difficulty::Easy);
    assert_eq!(math[1].difficulty, Difficulty::Medium);

    let history = store.list_questions("History").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].difficulty, Difficulty::Hard);
}

#[tokio::test]
async fn workbook_with_an_empty_question_is_rejected_and_store_untouched() {
    let store = Connection::open_in_memory().await.unwrap();
    let good = workbook_bytes(&[
        &["Topic", "Question", "Hint", "Answer"],
        &["Math", "2+2?", "count", "4"],
    ]);
    store
        .replace_all(&importer::parse("bank.xlsx", &good).unwrap())
        .await
        .unwrap();

    let bad = workbook_bytes(&[
        &["Topic", "Question", "Hint", "Answer"],
        &["Math", "", "count", "4"],
    ]);
    match importer::parse("bank.xlsx", &bad) {
        Err(ImportError::IncompleteRows(rows)) => assert_eq!(rows, vec![2]),
        other => panic!("expected an incomplete rows error, got {other:?}"),
    }

    // The failed parse never reached the store.
    assert_eq!(store.list_questions("Math").await.unwrap().len(), 1);
}

//! Parses an uploaded Excel workbook into a topic/question batch.
//!
//! The first sheet is read; the first row must carry the column headers.
//! Validation is all-or-nothing: a single row with an empty required field
//! rejects the whole file, reporting the offending Excel row numbers.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use thiserror::Error;

use crate::database::model::Difficulty;

// Header aliases. The bot historically shipped with Russian column names.
const TOPIC_HEADERS: &[&str] = &["Topic", "Тема"];
const QUESTION_HEADERS: &[&str] = &["Question", "Вопрос"];
const HINT_HEADERS: &[&str] = &["Hint", "Подсказка"];
const ANSWER_HEADERS: &[&str] = &["Answer", "Ответ"];
const DIFFICULTY_HEADERS: &[&str] = &["Difficulty", "Сложность"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file type '{0}': expected an .xls or .xlsx document")]
    UnsupportedFile(String),
    #[error("could not read the workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("the workbook has no sheets")]
    NoSheet,
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("rows with empty required fields: {}", format_rows(.0))]
    IncompleteRows(Vec<u32>),
    #[error("no data rows found below the header")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub topic: String,
    pub question: String,
    pub hint: String,
    pub answer: String,
    pub difficulty: Difficulty,
}

/// Topics deduplicated by name in first-seen order, plus every question row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub topics: Vec<String>,
    pub rows: Vec<ImportRow>,
}

pub fn parse(file_name: &str, payload: &[u8]) -> Result<ImportBatch, ImportError> {
    let lowered = file_name.to_lowercase();
    if !lowered.ends_with(".xls") && !lowered.ends_with(".xlsx") {
        return Err(ImportError::UnsupportedFile(file_name.to_owned()));
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(payload))?;
    let range = workbook.worksheet_range_at(0).ok_or(ImportError::NoSheet)??;

    parse_range(&range)
}

fn parse_range(range: &Range<Data>) -> Result<ImportBatch, ImportError> {
    let mut rows = range.rows();
    let header: Vec<String> = rows.next().ok_or(ImportError::Empty)?.iter().map(cell_text).collect();

    let topic_col = find_column(&header, TOPIC_HEADERS).ok_or(ImportError::MissingColumn("Topic"))?;
    let question_col =
        find_column(&header, QUESTION_HEADERS).ok_or(ImportError::MissingColumn("Question"))?;
    let hint_col = find_column(&header, HINT_HEADERS).ok_or(ImportError::MissingColumn("Hint"))?;
    let answer_col =
        find_column(&header, ANSWER_HEADERS).ok_or(ImportError::MissingColumn("Answer"))?;
    let difficulty_col = find_column(&header, DIFFICULTY_HEADERS);

    let mut batch = ImportBatch::default();
    let mut incomplete = Vec::new();

    for (offset, row) in rows.enumerate() {
        // The header occupies Excel row 1, so data starts at row 2.
        let row_number = (offset + 2) as u32;

        if row.iter().all(|cell| cell_text(cell).is_empty()) {
            continue;
        }

        let topic = field(row, topic_col);
        let question = field(row, question_col);
        let hint = field(row, hint_col);
        let answer = field(row, answer_col);

        if topic.is_empty() || question.is_empty() || hint.is_empty() || answer.is_empty() {
            incomplete.push(row_number);
            continue;
        }

        let difficulty = difficulty_col
            .map(|col| Difficulty::parse(&field(row, col)))
            .unwrap_or_default();

        if !batch.topics.iter().any(|name| name == &topic) {
            batch.topics.push(topic.clone());
        }
        batch.rows.push(ImportRow {
            topic,
            question,
            hint,
            answer,
            difficulty,
        });
    }

    if !incomplete.is_empty() {
        return Err(ImportError::IncompleteRows(incomplete));
    }
    if batch.rows.is_empty() {
        return Err(ImportError::Empty);
    }

    Ok(batch)
}

fn field(row: &[Data], column: usize) -> String {
    row.get(column).map(cell_text).unwrap_or_default()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_owned(),
        // Whole numbers render without the trailing ".0" an Excel float carries.
        Data::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        other => other.to_string().trim().to_owned(),
    }
}

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|name| aliases.iter().any(|alias| name.to_lowercase() == alias.to_lowercase()))
}

fn format_rows(rows: &[u32]) -> String {
    rows.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
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

    const HEADER: &[&str] = &["Topic", "Question", "Hint", "Answer", "Difficulty"];

    #[test]
    fn parses_rows_and_dedupes_topics() {
        let bytes = workbook_bytes(&[
            HEADER,
            &["Math", "2+2?", "count", "4", "easy"],
            &["Math", "3*3?", "square", "9", "hard"],
            &["History", "First man in space?", "1961", "Gagarin", ""],
        ]);

        let batch = parse("bank.xlsx", &bytes).unwrap();
        assert_eq!(batch.topics, vec!["Math".to_owned(), "History".to_owned()]);
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.rows[0].answer, "4");
        assert_eq!(batch.rows[0].difficulty, Difficulty::Easy);
        assert_eq!(batch.rows[1].difficulty, Difficulty::Hard);
        assert_eq!(batch.rows[2].difficulty, Difficulty::Medium);
    }

    #[test]
    fn unrecognized_difficulty_defaults_to_medium() {
        let bytes = workbook_bytes(&[HEADER, &["Math", "2+2?", "count", "4", "brutal"]]);
        let batch = parse("bank.xlsx", &bytes).unwrap();
        assert_eq!(batch.rows[0].difficulty, Difficulty::Medium);
    }

    #[test]
    fn difficulty_column_is_optional() {
        let bytes = workbook_bytes(&[
            &["Topic", "Question", "Hint", "Answer"],
            &["Math", "2+2?", "count", "4"],
        ]);
        let batch = parse("bank.xlsx", &bytes).unwrap();
        assert_eq!(batch.rows[0].difficulty, Difficulty::Medium);
    }

    #[test]
    fn accepts_russian_headers() {
        let bytes = workbook_bytes(&[
            &["Тема", "Вопрос", "Подсказка", "Ответ", "Сложность"],
            &["Математика", "2+2?", "посчитай", "4", "easy"],
        ]);
        let batch = parse("bank.xlsx", &bytes).unwrap();
        assert_eq!(batch.topics, vec!["Математика".to_owned()]);
        assert_eq!(batch.rows[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn rejects_missing_required_column() {
        let bytes = workbook_bytes(&[
            &["Topic", "Question", "Answer"],
            &["Math", "2+2?", "4"],
        ]);
        match parse("bank.xlsx", &bytes) {
            Err(ImportError::MissingColumn(name)) => assert_eq!(name, "Hint"),
            other => panic!("expected a missing column error, got {other:?}"),
        }
    }

    #[test]
    fn reports_offending_row_numbers() {
        let bytes = workbook_bytes(&[
            HEADER,
            &["Math", "2+2?", "count", "4", ""],
            &["Math", "", "square", "9", ""],
            &["", "", "", "", ""],
            &["History", "First man in space?", "", "Gagarin", ""],
        ]);

        match parse("bank.xlsx", &bytes) {
            Err(ImportError::IncompleteRows(rows)) => {
                assert_eq!(rows, vec![3, 5]);
            }
            other => panic!("expected an incomplete rows error, got {other:?}"),
        }
    }

    #[test]
    fn error_message_names_the_rows() {
        let error = ImportError::IncompleteRows(vec![3, 5]);
        assert!(error.to_string().contains("3, 5"));
    }

    #[test]
    fn rejects_header_only_file() {
        let bytes = workbook_bytes(&[HEADER]);
        assert!(matches!(parse("bank.xlsx", &bytes), Err(ImportError::Empty)));
    }

    #[test]
    fn rejects_unsupported_extension() {
        assert!(matches!(
            parse("bank.csv", b"Topic,Question"),
            Err(ImportError::UnsupportedFile(_))
        ));
    }
}

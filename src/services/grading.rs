//! Answer matching for every question type.
//!
//! Stored keys come in several encodings: JSON lists of letters (`["A","C"]`), lists of
//! option indexes (`[0,2]`), bare strings (`"B"`) and comma lists (`"A,C"`). Students
//! submit the same variety. Everything is normalised to upper-case option letters before
//! comparison so the encodings are interchangeable.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::db::models::{ExamQuestionDetail, Question};
use crate::db::types::QuestionType;

pub(crate) const MISSING_KEY_MESSAGE: &str = "No correct answer configured";

const JUDGE_TRUE: &[&str] = &["true", "t", "正确", "对"];
const JUDGE_FALSE: &[&str] = &["false", "f", "错误", "错"];

/// Borrowed view of a question's answer key.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AnswerKey<'a> {
    pub(crate) question_type: QuestionType,
    pub(crate) correct_answers: Option<&'a Value>,
    pub(crate) correct_answer: Option<&'a str>,
}

impl<'a> AnswerKey<'a> {
    pub(crate) fn from_question(question: &'a Question) -> Self {
        Self {
            question_type: question.question_type,
            correct_answers: question.correct_answers.as_ref().map(|json| &json.0),
            correct_answer: question.correct_answer.as_deref(),
        }
    }

    pub(crate) fn from_detail(detail: &'a ExamQuestionDetail) -> Self {
        Self {
            question_type: detail.question_type,
            correct_answers: detail.correct_answers.as_ref().map(|json| &json.0),
            correct_answer: detail.correct_answer.as_deref(),
        }
    }

    fn answer_text(&self) -> Option<&'a str> {
        self.correct_answer.map(str::trim).filter(|value| !value.is_empty())
    }

    fn choice_tokens(&self) -> Vec<String> {
        let from_list = self.correct_answers.map(value_choice_tokens).unwrap_or_default();
        if !from_list.is_empty() {
            return from_list;
        }
        self.answer_text().map(choice_tokens).unwrap_or_default()
    }

    fn list_entries(&self) -> Vec<String> {
        match self.correct_answers {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(value) => scalar_text(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// Returns whether `answer` satisfies the key. Blank answers never do.
pub(crate) fn is_correct(key: &AnswerKey<'_>, answer: &str) -> bool {
    let answer = answer.trim();
    if answer.is_empty() {
        return false;
    }

    match key.question_type {
        QuestionType::Single => {
            let expected = key.choice_tokens();
            let given = choice_tokens(answer);
            expected.len() == 1 && given.len() == 1 && expected[0] == given[0]
        }
        QuestionType::Multiple => {
            let expected: BTreeSet<String> = key.choice_tokens().into_iter().collect();
            let given: BTreeSet<String> = choice_tokens(answer).into_iter().collect();
            !expected.is_empty() && expected == given
        }
        QuestionType::Judge => match key.answer_text() {
            Some(expected) => judge_matches(expected, answer),
            None => key.list_entries().iter().any(|expected| judge_matches(expected, answer)),
        },
        QuestionType::Fill | QuestionType::Essay => match key.answer_text() {
            Some(expected) => text_matches(expected, answer),
            None => key.list_entries().iter().any(|expected| text_matches(expected, answer)),
        },
    }
}

/// Grading fallback once the question itself is gone: compare against the snapshot
/// stored with the answer.
pub(crate) fn matches_snapshot(snapshot: Option<&str>, answer: &str) -> bool {
    let answer = answer.trim();
    match snapshot.map(str::trim) {
        Some(expected) if !expected.is_empty() && !answer.is_empty() => {
            expected.to_lowercase() == answer.to_lowercase()
        }
        _ => false,
    }
}

/// Correct-answer text copied onto each stored student answer.
pub(crate) fn snapshot(key: &AnswerKey<'_>) -> Option<String> {
    let list = key.correct_answers.filter(|value| !is_empty_value(value)).map(Value::to_string);
    let text = key.answer_text().map(str::to_string);

    if key.question_type.is_choice() {
        list.or(text)
    } else {
        text.or(list)
    }
}

/// Human-readable key for answer feedback. `None` when nothing is configured.
pub(crate) fn display_correct_answer(key: &AnswerKey<'_>) -> Option<String> {
    if key.question_type.is_choice() {
        let tokens = key.choice_tokens();
        return (!tokens.is_empty()).then(|| tokens.join(", "));
    }

    if let Some(text) = key.answer_text() {
        return Some(text.to_string());
    }

    let entries = key.list_entries();
    (!entries.is_empty()).then(|| entries.join(", "))
}

/// Flattens a submitted JSON answer into the stored text form.
pub(crate) fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn choice_tokens(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') || trimmed.starts_with('"') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value_choice_tokens(&value);
        }
    }

    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .filter_map(normalize_choice_token)
        .collect()
}

fn value_choice_tokens(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_text)
            .filter_map(|item| normalize_choice_token(&item))
            .collect(),
        Value::String(text) => choice_tokens(text),
        Value::Number(number) => normalize_choice_token(&number.to_string()).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn normalize_choice_token(raw: &str) -> Option<String> {
    let token = raw.trim().trim_matches(|ch| ch == '"' || ch == '\'').trim();
    if token.is_empty() {
        return None;
    }

    if let Ok(index) = token.parse::<u8>() {
        if index < 26 {
            return Some(char::from(b'A' + index).to_string());
        }
    }

    Some(token.to_uppercase())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn judge_class(value: &str) -> Option<bool> {
    if JUDGE_TRUE.contains(&value) {
        Some(true)
    } else if JUDGE_FALSE.contains(&value) {
        Some(false)
    } else {
        None
    }
}

fn judge_matches(expected: &str, answer: &str) -> bool {
    let expected = expected.trim().to_lowercase();
    let answer = answer.trim().to_lowercase();

    match (judge_class(&expected), judge_class(&answer)) {
        (Some(left), Some(right)) => left == right,
        _ => expected == answer,
    }
}

fn text_matches(expected: &str, answer: &str) -> bool {
    let expected = expected.trim().to_lowercase();
    let answer = answer.trim().to_lowercase();

    if expected.contains(',') {
        expected.split(',').any(|alternative| alternative.trim() == answer)
    } else {
        expected == answer
    }
}

pub(crate) mod dashboard;
pub(crate) mod exam_questions;
pub(crate) mod exam_records;
pub(crate) mod exams;
pub(crate) mod health;
pub(crate) mod questions;
pub(crate) mod student_answers;
pub(crate) mod students;
pub(crate) mod users;

/// Lowercased `%keyword%` pattern for `lower(column) LIKE`. Wildcards typed by the user
/// match literally; a backslash is the default LIKE escape in Postgres.
pub(crate) fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

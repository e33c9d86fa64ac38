mod create;
mod list;
mod manage;
mod questions;

pub(super) use create::create_exam;
pub(super) use list::{
    list_active_exams, list_exam_records, list_exams, list_finished_exams, list_upcoming_exams,
};
pub(super) use manage::{
    delete_exam, exam_statistics, get_exam, update_exam, update_exam_status,
};
pub(super) use questions::{
    add_exam_question, list_exam_questions, remove_exam_question, update_exam_question_score,
};

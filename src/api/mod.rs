pub(crate) mod admin_students;
pub(crate) mod admin_users;
pub(crate) mod answers;
pub(crate) mod auth;
pub(crate) mod dashboard;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod questions;
pub(crate) mod records;
pub(crate) mod router;
pub(crate) mod student;
pub(crate) mod validation;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Student;
use crate::db::types::ActiveStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[serde(alias = "studentNumber")]
    #[validate(length(min = 1, max = 50, message = "student_number must be 1..=50 characters"))]
    pub(crate) student_number: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1..=100 characters"))]
    pub(crate) name: String,
    pub(crate) password: String,
    #[serde(default)]
    #[validate(email(message = "email is invalid"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default, alias = "className")]
    pub(crate) class_name: Option<String>,
    #[serde(default)]
    pub(crate) major: Option<String>,
    #[serde(default)]
    pub(crate) grade: Option<String>,
    #[serde(default = "default_status")]
    pub(crate) status: ActiveStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) student_number: String,
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) class_name: Option<String>,
    pub(crate) major: Option<String>,
    pub(crate) grade: Option<String>,
    pub(crate) status: ActiveStatus,
    pub(crate) last_login_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            student_number: student.student_number,
            name: student.name,
            email: student.email,
            phone: student.phone,
            class_name: student.class_name,
            major: student.major,
            grade: student.grade,
            status: student.status,
            last_login_at: student.last_login_at.map(format_primitive),
            created_at: format_primitive(student.created_at),
            updated_at: format_primitive(student.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct BatchDeleteRequest {
    #[validate(length(min = 1, message = "ids must not be empty"))]
    pub(crate) ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchDeleteResponse {
    pub(crate) deleted: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentStatisticsResponse {
    pub(crate) total: i64,
    pub(crate) active: i64,
    pub(crate) inactive: i64,
}

fn default_status() -> ActiveStatus {
    ActiveStatus::Enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_never_contains_password_hash() {
        let student = Student {
            id: "s-1".to_string(),
            student_number: "20250001".to_string(),
            name: "Ada".to_string(),
            hashed_password: "$argon2id$secret".to_string(),
            email: None,
            phone: None,
            class_name: Some("CS-1".to_string()),
            major: None,
            grade: None,
            status: ActiveStatus::Enabled,
            last_login_at: None,
            created_at: time::macros::datetime!(2025-01-01 00:00),
            updated_at: time::macros::datetime!(2025-01-01 00:00),
        };

        let body = serde_json::to_value(StudentResponse::from_db(student)).expect("json");
        assert!(body.get("hashed_password").is_none());
        assert_eq!(body["class_name"], json!("CS-1"));
    }

    #[test]
    fn create_validates_email() {
        let payload: StudentCreate = serde_json::from_value(json!({
            "studentNumber": "20250001",
            "name": "Ada",
            "password": "password123",
            "email": "not-an-email"
        }))
        .expect("payload");
        assert!(payload.validate().is_err());
    }
}

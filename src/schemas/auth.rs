use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminLogin {
    /// Username or e-mail.
    #[serde(alias = "identifier", alias = "email")]
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub(crate) username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentLogin {
    /// Student number or e-mail.
    #[serde(alias = "studentNumber", alias = "student_number")]
    #[validate(length(min = 1, message = "identifier must not be empty"))]
    pub(crate) identifier: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse<P> {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: P,
}

impl<P> TokenResponse<P> {
    pub(crate) fn bearer(access_token: String, user: P) -> Self {
        Self { access_token, token_type: "bearer".to_string(), user }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AvailabilityResponse {
    pub(crate) available: bool,
}

use crate::api::errors::ApiError;

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

/// Trims optional free-text filters, dropping blank ones.
pub(crate) fn clean_filter(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn validation_error(err: validator::ValidationErrors) -> ApiError {
    ApiError::BadRequest(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password_len("12345").is_err());
        assert!(validate_password_len("123456").is_ok());
    }

    #[test]
    fn blank_filters_are_dropped() {
        assert_eq!(clean_filter(Some("  ")), None);
        assert_eq!(clean_filter(Some(" rust ")), Some("rust"));
        assert_eq!(clean_filter(None), None);
    }
}

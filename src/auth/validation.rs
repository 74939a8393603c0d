// Local login-form validation, run before any request is sent.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));

/// Inline messages for the login form. A `None` field passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginErrors {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// Check the login form. Both fields are checked so every message can be
/// shown at once.
pub fn validate_login(email: &str, password: &str, min_password_len: usize) -> Result<(), LoginErrors> {
    let mut errors = LoginErrors::default();

    let email = email.trim();
    if email.is_empty() {
        errors.email = Some("Email is required".into());
    } else if !EMAIL_PATTERN.is_match(email) {
        errors.email = Some("Email address is invalid".into());
    }

    if password.is_empty() {
        errors.password = Some("Password is required".into());
    } else if password.chars().count() < min_password_len {
        errors.password = Some(format!(
            "Password must be at least {min_password_len} characters"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

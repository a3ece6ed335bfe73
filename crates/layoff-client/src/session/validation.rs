//! Client-side checks run before any credential leaves the process.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254;
const MIN_LOGIN_PASSWORD: usize = 6;
const MIN_REGISTER_PASSWORD: usize = 8;
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$") {
            Ok(re) => Some(re),
            Err(e) => {
                log::error!("Invalid email pattern: {}", e);
                None
            }
        })
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && email_pattern().is_some_and(|re| re.is_match(email))
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    let email = email.trim();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_valid_email(email) {
        errors.push("Please enter a valid email address".to_string());
    }
}

fn check_password(password: &str, min: usize, errors: &mut Vec<String>) {
    if password.is_empty() {
        errors.push("Password is required".to_string());
    } else if password.chars().count() < min {
        errors.push(format!("Password must be at least {} characters", min));
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    check_email(email, &mut errors);
    check_password(password, MIN_LOGIN_PASSWORD, &mut errors);
    finish(errors)
}

pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    let name_len = name.trim().chars().count();
    if name_len == 0 {
        errors.push("Name is required".to_string());
    } else if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name_len) {
        errors.push(format!(
            "Name must be between {} and {} characters",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        ));
    }

    check_email(email, &mut errors);
    check_password(password, MIN_REGISTER_PASSWORD, &mut errors);
    finish(errors)
}

fn finish(errors: Vec<String>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(errors))
    }
}

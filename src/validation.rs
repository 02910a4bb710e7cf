use crate::errors::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").expect("valid regex"));

pub const DEFAULT_MAX_LEN: usize = 128;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// At least 8 characters with upper, lower and a digit, and no whitespace.
pub fn is_strong_password(password: &str) -> bool {
    if password.chars().count() < 8 {
        return false;
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_space = password.chars().any(char::is_whitespace);
    has_upper && has_lower && has_digit && !has_space
}

pub fn clamp_len(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

/// Checks sign-up input before it is handed to the authentication service
/// and returns the normalized email.
pub fn check_sign_up(email: &str, password: &str) -> AppResult<String> {
    let email = normalize_email(clamp_len(email, DEFAULT_MAX_LEN));
    if !is_valid_email(&email) {
        return Err(AppError::Validation(friendly_auth_error(Some("auth/invalid-email")).to_string()));
    }
    if !is_strong_password(clamp_len(password, DEFAULT_MAX_LEN)) {
        return Err(AppError::Validation(
            "Password needs 8+ characters with upper case, lower case and a digit.".to_string(),
        ));
    }
    Ok(email)
}

/// Maps provider auth error codes to user-facing text. Credential failures
/// share one message so accounts cannot be enumerated.
pub fn friendly_auth_error(code: Option<&str>) -> &'static str {
    match code {
        Some("auth/wrong-password") | Some("auth/invalid-credential") | Some("auth/user-not-found") => {
            "Invalid email or password."
        }
        Some("auth/too-many-requests") => "Too many attempts. Try again shortly.",
        Some("auth/network-request-failed") => "Network failure. Check your connection.",
        Some("auth/invalid-email") => "Invalid email.",
        _ => "Could not complete the request. Try again.",
    }
}

//! Field validators shared by the site's forms.
//!
//! Each validator returns `Err(message)` with a user-facing message. Use
//! [`FormErrors`](super::FormErrors) to collect them per field.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    /// Regex for validating email addresses (local@domain.tld)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$"
    ).unwrap();

    /// Regex for validating phone numbers (digits with common separators)
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9][0-9 ()./-]{5,22}[0-9]$"
    ).unwrap();
}

/// Reject blank values
pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}

/// Validate an upper bound on length, counted in characters
pub fn validate_max_length(value: &str, label: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} is too long (max {} characters)", label, max));
    }
    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

/// Validate an absolute http(s) URL
pub fn validate_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is required".to_string());
    }

    if url.len() > 2048 {
        return Err("URL is too long (max 2048 characters)".to_string());
    }

    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(())
        }
        _ => Err("Invalid URL. Must be an http(s) address".to_string()),
    }
}

/// Validate a phone number
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    if !PHONE_REGEX.is_match(phone) {
        return Err("Invalid phone number".to_string());
    }

    Ok(())
}

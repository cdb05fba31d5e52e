//! Form inputs and their validation rules.
//!
//! Every form deserializes from `application/x-www-form-urlencoded` with all
//! fields defaulted, so a missing field surfaces as a "required" error on the
//! re-rendered page rather than as an extractor rejection.

pub mod validation;

use serde::Deserialize;
use std::collections::BTreeMap;

use validation::{
    validate_email, validate_max_length, validate_phone, validate_required, validate_url,
};

pub const MAX_TITLE_LENGTH: usize = 250;
pub const MAX_NAME_LENGTH: usize = 100;

/// Field-level validation errors, collected while checking a form
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the outcome of a validator against `field`
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// First message for a field, used by the templates
    pub fn first(&self, field: &str) -> Option<&str> {
        self.errors
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    #[cfg(test)]
    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Return Ok(()) if no errors, or Err(self) if there are errors
    pub fn finish(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), FormErrors>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.check("name", validate_required(&self.name, "Name"));
        errors.check("name", validate_max_length(&self.name, "Name", MAX_NAME_LENGTH));
        errors.check("email", validate_email(&self.email));
        errors.check("password", validate_required(&self.password, "Password"));
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.check("email", validate_email(&self.email));
        errors.check("password", validate_required(&self.password, "Password"));
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub comment_text: String,
}

impl Validate for CommentForm {
    fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.check("comment_text", validate_required(&self.comment_text, "Comment"));
        errors.finish()
    }
}

/// Used both to create and to edit a post
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub img_url: String,
    pub body: String,
}

impl Validate for PostForm {
    fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.check("title", validate_required(&self.title, "Blog post title"));
        errors.check("title", validate_max_length(&self.title, "Blog post title", MAX_TITLE_LENGTH));
        errors.check("subtitle", validate_required(&self.subtitle, "Subtitle"));
        errors.check("subtitle", validate_max_length(&self.subtitle, "Subtitle", MAX_TITLE_LENGTH));
        errors.check("img_url", validate_url(&self.img_url));
        errors.check("body", validate_required(&self.body, "Blog content"));
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub message: String,
}

impl Validate for ContactForm {
    fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.check("name", validate_required(&self.name, "Name"));
        errors.check("name", validate_max_length(&self.name, "Name", MAX_NAME_LENGTH));
        errors.check("email", validate_email(&self.email));
        errors.check("phone_number", validate_phone(&self.phone_number));
        errors.check("message", validate_required(&self.message, "Message"));
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_errors_collects_per_field() {
        let mut errors = FormErrors::new();
        errors.add("name", "Name is required");
        errors.add("email", "Invalid email address");
        errors.add("name", "Name is too short");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.first("name"), Some("Name is required"));
        assert!(errors.has("email"));
        assert!(errors.first("password").is_none());
        assert!(errors.finish().is_err());
        assert!(FormErrors::new().finish().is_ok());
    }

    #[test]
    fn test_register_form() {
        let form = RegisterForm {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
        };
        assert!(form.validate().is_ok());

        let errors = RegisterForm::default().validate().unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("email"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_login_form_rejects_bad_email() {
        let form = LoginForm {
            email: "ada".to_string(),
            password: "pw".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.first("email"), Some("Invalid email address"));
        assert!(!errors.has("password"));
    }

    #[test]
    fn test_comment_form_requires_text() {
        assert!(CommentForm { comment_text: "hi".to_string() }.validate().is_ok());
        assert!(CommentForm { comment_text: " \n".to_string() }.validate().is_err());
    }

    #[test]
    fn test_post_form() {
        let mut form = PostForm {
            title: "Title".to_string(),
            subtitle: "Sub".to_string(),
            img_url: "https://example.com/cover.png".to_string(),
            body: "<p>Hello</p>".to_string(),
        };
        assert!(form.validate().is_ok());

        form.img_url = "cover.png".to_string();
        form.title = "x".repeat(MAX_TITLE_LENGTH + 1);
        let errors = form.validate().unwrap_err();
        assert!(errors.has("img_url"));
        assert!(errors.first("title").unwrap().contains("too long"));
    }

    #[test]
    fn test_contact_form() {
        let form = ContactForm {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "+44 20 7946 0018".to_string(),
            message: "Hello there".to_string(),
        };
        assert!(form.validate().is_ok());

        let errors = ContactForm {
            phone_number: "nope".to_string(),
            ..form
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has("phone_number"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let form: ContactForm = serde_json::from_str(r#"{"name": "Ada"}"#).unwrap();
        assert_eq!(form.name, "Ada");
        assert!(form.message.is_empty());
    }
}

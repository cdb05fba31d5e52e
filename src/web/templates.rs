// Askama template definitions

use askama::Template;
use sha2::{Digest, Sha256};

use super::cookies::FlashMessage;
use crate::db::{CommentWithAuthor, PostWithAuthor, User, UserView};
use crate::forms::{CommentForm, ContactForm, FormErrors, LoginForm, PostForm, RegisterForm};

// What the shared layout needs on every page
#[derive(Debug, Default, Clone)]
pub struct PageContext {
    pub current_user: Option<UserView>,
    pub flashes: Vec<FlashMessage>,
    /// Echoed back by every form as the `csrf_token` field
    pub csrf_token: String,
}

impl PageContext {
    pub fn new(user: Option<&User>, flashes: Vec<FlashMessage>, csrf_token: String) -> Self {
        Self {
            current_user: user.map(UserView::from),
            flashes,
            csrf_token,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.current_user.as_ref().map(|u| u.is_admin).unwrap_or(false)
    }
}

/// Gravatar avatar for an email address (SHA-256 of the trimmed,
/// lowercased address); unknown addresses fall back to the "retro" image.
pub fn gravatar_url(email: &str, size: u32) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?s={}&d=retro&r=g",
        hex::encode(digest),
        size
    )
}

// A comment as the post page shows it
#[derive(Debug, Clone)]
pub struct CommentView {
    pub text: String,
    pub author_name: String,
    pub avatar_url: String,
    pub created_at: String,
}

impl From<CommentWithAuthor> for CommentView {
    fn from(comment: CommentWithAuthor) -> Self {
        Self {
            avatar_url: gravatar_url(&comment.author_email, 100),
            text: comment.text,
            author_name: comment.author_name,
            created_at: comment.created_at,
        }
    }
}

// Post listing (home page)
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub ctx: PageContext,
    pub posts: Vec<PostWithAuthor>,
}

// Single post with its comments
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub ctx: PageContext,
    pub post: PostWithAuthor,
    pub comments: Vec<CommentView>,
    pub form: CommentForm,
    pub errors: FormErrors,
}

// Create / edit post form
#[derive(Template)]
#[template(path = "make-post.html")]
pub struct MakePostTemplate {
    pub ctx: PageContext,
    pub form: PostForm,
    pub errors: FormErrors,
    pub is_edit: bool,
    pub action: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub form: RegisterForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub form: LoginForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub ctx: PageContext,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub ctx: PageContext,
    pub form: ContactForm,
    pub errors: FormErrors,
    pub msg_sent: bool,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub ctx: PageContext,
    pub status: u16,
    pub title: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_hashes_normalized_email() {
        let a = gravatar_url("Ada@Example.com ", 100);
        let b = gravatar_url("ada@example.com", 100);
        assert_eq!(a, b);
        assert!(a.starts_with("https://www.gravatar.com/avatar/"));
        assert!(a.ends_with("?s=100&d=retro&r=g"));

        let hash = a
            .trim_start_matches("https://www.gravatar.com/avatar/")
            .split('?')
            .next()
            .unwrap();
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_page_context_admin_flag() {
        let admin = User {
            id: 1,
            email: "a@example.com".to_string(),
            name: "Ada".to_string(),
            password_hash: String::new(),
            created_at: String::new(),
        };
        assert!(PageContext::new(Some(&admin), vec![], String::new()).is_admin());
        assert!(!PageContext::default().is_admin());
    }

    #[test]
    fn test_error_template_renders() {
        let html = ErrorTemplate {
            ctx: PageContext::default(),
            status: 404,
            title: "Page not found".to_string(),
            message: "<gone>".to_string(),
        }
        .render()
        .unwrap();
        assert!(html.contains("404"));
        assert!(html.contains("&lt;gone&gt;"));
    }
}

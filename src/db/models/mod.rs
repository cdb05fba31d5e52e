//! Database models split into domain-specific modules.

pub mod comment;
pub mod post;
pub mod user;

pub use comment::*;
pub use post::*;
pub use user::*;

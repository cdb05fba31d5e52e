//! Post pages: listing, reading and commenting, plus the admin-only
//! create / edit / delete handlers.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::extract::verify_csrf;
use super::{
    page, render, CommentView, Cookies, CsrfForm, FlashLevel, IndexTemplate, MakePostTemplate,
    PathId, PostTemplate, WebError,
};
use crate::auth::{AdminUser, CurrentUser};
use crate::db::{BlogPost, Comment, PostContent, PostWithAuthor, User};
use crate::forms::{CommentForm, FormErrors, PostForm, Validate};
use crate::AppState;

const LOGIN_TO_COMMENT: &str = "You need to login or register to comment.";
const DUPLICATE_TITLE: &str = "A post with this title already exists";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn post_content(form: &PostForm) -> PostContent<'_> {
    PostContent {
        title: form.title.trim(),
        subtitle: form.subtitle.trim(),
        body: &form.body,
        img_url: form.img_url.trim(),
    }
}

/// Date stamp shown on a post, e.g. "August 24, 2024"
fn today() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
) -> Result<Response, WebError> {
    let posts = BlogPost::list_with_authors(&state.db).await?;
    let (cookies, ctx) = page(cookies, user.as_ref());
    Ok((cookies, render(&IndexTemplate { ctx, posts })?).into_response())
}

async fn render_post(
    state: &AppState,
    cookies: Cookies,
    user: Option<&User>,
    post: PostWithAuthor,
    form: CommentForm,
    errors: FormErrors,
) -> Result<Response, WebError> {
    let comments = Comment::list_for_post(&state.db, post.id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();

    let (cookies, ctx) = page(cookies, user);
    let template = PostTemplate {
        ctx,
        post,
        comments,
        form,
        errors,
    };
    Ok((cookies, render(&template)?).into_response())
}

pub async fn show_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
    PathId(id): PathId,
) -> Result<Response, WebError> {
    let post = BlogPost::get_with_author(&state.db, id)
        .await?
        .ok_or(WebError::NotFound)?;

    render_post(
        &state,
        cookies,
        user.as_ref(),
        post,
        CommentForm::default(),
        FormErrors::new(),
    )
    .await
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
    PathId(id): PathId,
    CsrfForm(form): CsrfForm<CommentForm>,
) -> Result<Response, WebError> {
    let post = BlogPost::get_with_author(&state.db, id)
        .await?
        .ok_or(WebError::NotFound)?;

    if let Err(errors) = form.validate() {
        return render_post(&state, cookies, user.as_ref(), post, form, errors).await;
    }

    let author = match user {
        Some(user) => user,
        None => {
            debug!(post_id = id, "Anonymous comment rejected");
            let cookies = cookies.flash(FlashLevel::Info, LOGIN_TO_COMMENT);
            return Ok((cookies, Redirect::to("/login")).into_response());
        }
    };

    let comment = Comment::create(&state.db, post.id, author.id, &form.comment_text).await?;
    info!(comment_id = comment.id, post_id = post.id, user_id = author.id, "Comment added");

    render_post(
        &state,
        cookies,
        Some(&author),
        post,
        CommentForm::default(),
        FormErrors::new(),
    )
    .await
}

fn post_form_page(
    cookies: Cookies,
    admin: &User,
    form: PostForm,
    errors: FormErrors,
    edit_id: Option<i64>,
) -> Result<Response, WebError> {
    let (cookies, ctx) = page(cookies, Some(admin));
    let action = match edit_id {
        Some(id) => format!("/edit-post/{}", id),
        None => "/new-post".to_string(),
    };
    let template = MakePostTemplate {
        ctx,
        form,
        errors,
        is_edit: edit_id.is_some(),
        action,
    };
    Ok((cookies, render(&template)?).into_response())
}

fn duplicate_title_errors() -> FormErrors {
    let mut errors = FormErrors::new();
    errors.add("title", DUPLICATE_TITLE);
    errors
}

pub async fn new_post_form(
    Extension(AdminUser(admin)): Extension<AdminUser>,
    cookies: Cookies,
) -> Result<Response, WebError> {
    post_form_page(cookies, &admin, PostForm::default(), FormErrors::new(), None)
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    cookies: Cookies,
    CsrfForm(form): CsrfForm<PostForm>,
) -> Result<Response, WebError> {
    if let Err(errors) = form.validate() {
        return post_form_page(cookies, &admin, form, errors, None);
    }

    let created = BlogPost::create(&state.db, admin.id, &today(), &post_content(&form)).await;
    let post = match created {
        Ok(post) => post,
        Err(e) if is_unique_violation(&e) => {
            return post_form_page(cookies, &admin, form, duplicate_title_errors(), None);
        }
        Err(e) => return Err(e.into()),
    };

    info!(post_id = post.id, title = %post.title, "Post created");
    Ok((cookies, Redirect::to("/")).into_response())
}

pub async fn edit_post_form(
    State(state): State<Arc<AppState>>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    cookies: Cookies,
    PathId(id): PathId,
) -> Result<Response, WebError> {
    let post = BlogPost::get_by_id(&state.db, id)
        .await?
        .ok_or(WebError::NotFound)?;

    let form = PostForm {
        title: post.title,
        subtitle: post.subtitle,
        img_url: post.img_url,
        body: post.body,
    };
    post_form_page(cookies, &admin, form, FormErrors::new(), Some(id))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    cookies: Cookies,
    PathId(id): PathId,
    CsrfForm(form): CsrfForm<PostForm>,
) -> Result<Response, WebError> {
    if BlogPost::get_by_id(&state.db, id).await?.is_none() {
        return Err(WebError::NotFound);
    }

    if let Err(errors) = form.validate() {
        return post_form_page(cookies, &admin, form, errors, Some(id));
    }

    let updated = BlogPost::update(&state.db, id, &post_content(&form)).await;
    match updated {
        Ok(true) => {}
        Ok(false) => return Err(WebError::NotFound),
        Err(e) if is_unique_violation(&e) => {
            return post_form_page(cookies, &admin, form, duplicate_title_errors(), Some(id));
        }
        Err(e) => return Err(e.into()),
    }

    info!(post_id = id, "Post updated");
    Ok((cookies, Redirect::to(&format!("/post/{}", id))).into_response())
}

/// Delete links carry the CSRF token in the query string
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteParams {
    pub csrf_token: String,
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    PathId(id): PathId,
    Query(params): Query<DeleteParams>,
) -> Result<Redirect, WebError> {
    verify_csrf(&cookies, Some(params.csrf_token.as_str()))?;

    if !BlogPost::delete(&state.db, id).await? {
        return Err(WebError::NotFound);
    }

    info!(post_id = id, "Post deleted");
    Ok(Redirect::to("/"))
}

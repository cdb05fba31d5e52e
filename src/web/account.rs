//! Registration, login and logout.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    page, render, Cookies, CsrfForm, FlashLevel, LoginTemplate, RegisterTemplate, WebError,
};
use crate::auth::{end_session, start_session, CurrentUser};
use crate::db::User;
use crate::forms::{FormErrors, LoginForm, RegisterForm, Validate};
use crate::AppState;

const ALREADY_REGISTERED: &str = "You've already signed up with that email, log in instead!";
const UNKNOWN_EMAIL: &str = "That email does not exist, please try again.";
const WRONG_PASSWORD: &str = "Password incorrect, please try again.";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub async fn register_form(
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
) -> Result<Response, WebError> {
    let (cookies, ctx) = page(cookies, user.as_ref());
    let template = RegisterTemplate {
        ctx,
        form: RegisterForm::default(),
        errors: FormErrors::new(),
    };
    Ok((cookies, render(&template)?).into_response())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
    CsrfForm(form): CsrfForm<RegisterForm>,
) -> Result<Response, WebError> {
    if let Err(errors) = form.validate() {
        let (cookies, ctx) = page(cookies, user.as_ref());
        let template = RegisterTemplate {
            ctx,
            form: RegisterForm {
                password: String::new(),
                ..form
            },
            errors,
        };
        return Ok((cookies, render(&template)?).into_response());
    }

    let email = form.email.trim();
    if User::get_by_email(&state.db, email).await?.is_some() {
        info!(email = %email, "Registration attempted with an existing email");
        let cookies = cookies.flash(FlashLevel::Info, ALREADY_REGISTERED);
        return Ok((cookies, Redirect::to("/login")).into_response());
    }

    let password_hash = state.hasher.hash(&form.password)?;
    let new_user = match User::create(&state.db, email, form.name.trim(), &password_hash).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration of the same email
        Err(e) if is_unique_violation(&e) => {
            let cookies = cookies.flash(FlashLevel::Info, ALREADY_REGISTERED);
            return Ok((cookies, Redirect::to("/login")).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = new_user.id, email = %new_user.email, "User registered");

    let cookies = start_session(&state, cookies, &new_user).await?;
    Ok((cookies, Redirect::to("/")).into_response())
}

pub async fn login_form(
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
) -> Result<Response, WebError> {
    let (cookies, ctx) = page(cookies, user.as_ref());
    let template = LoginTemplate {
        ctx,
        form: LoginForm::default(),
        errors: FormErrors::new(),
    };
    Ok((cookies, render(&template)?).into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
    CsrfForm(form): CsrfForm<LoginForm>,
) -> Result<Response, WebError> {
    if let Err(errors) = form.validate() {
        let (cookies, ctx) = page(cookies, user.as_ref());
        let template = LoginTemplate {
            ctx,
            form: LoginForm {
                password: String::new(),
                ..form
            },
            errors,
        };
        return Ok((cookies, render(&template)?).into_response());
    }

    let email = form.email.trim();
    let user = match User::get_by_email(&state.db, email).await? {
        Some(user) => user,
        None => {
            warn!(email = %email, "Login failed: unknown email");
            let cookies = cookies.flash(FlashLevel::Info, UNKNOWN_EMAIL);
            return Ok((cookies, Redirect::to("/login")).into_response());
        }
    };

    if !state.hasher.verify(&form.password, &user.password_hash) {
        warn!(user_id = user.id, "Login failed: wrong password");
        let cookies = cookies.flash(FlashLevel::Info, WRONG_PASSWORD);
        return Ok((cookies, Redirect::to("/login")).into_response());
    }

    info!(user_id = user.id, "User logged in");
    let cookies = start_session(&state, cookies, &user).await?;
    Ok((cookies, Redirect::to("/")).into_response())
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
) -> Result<Response, WebError> {
    if let Some(user) = &user {
        info!(user_id = user.id, "User logged out");
    }
    let cookies = end_session(&state, cookies).await?;
    Ok((cookies, Redirect::to("/")).into_response())
}

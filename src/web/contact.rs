// Contact page: validates the form and hands it to the mail relay

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::error;

use super::{page, render, ContactTemplate, Cookies, CsrfForm, FlashLevel, WebError};
use crate::auth::CurrentUser;
use crate::forms::{ContactForm, FormErrors, Validate};
use crate::mail::ContactMessage;
use crate::AppState;

const SENT: &str = "Your message has been sent successfully!";
const SEND_FAILED: &str = "An unexpected error occurred. Please try again later";

pub async fn contact_form(
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
) -> Result<Response, WebError> {
    let (cookies, ctx) = page(cookies, user.as_ref());
    let template = ContactTemplate {
        ctx,
        form: ContactForm::default(),
        errors: FormErrors::new(),
        msg_sent: false,
    };
    Ok((cookies, render(&template)?).into_response())
}

pub async fn send_contact(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    cookies: Cookies,
    CsrfForm(form): CsrfForm<ContactForm>,
) -> Result<Response, WebError> {
    if let Err(errors) = form.validate() {
        let (cookies, ctx) = page(cookies, user.as_ref());
        let template = ContactTemplate {
            ctx,
            form,
            errors,
            msg_sent: false,
        };
        return Ok((cookies, render(&template)?).into_response());
    }

    let message = ContactMessage::from(form);
    let cookies = match state.mailer.send(&message).await {
        Ok(()) => cookies.flash(FlashLevel::Success, SENT),
        Err(e) => {
            error!(error = %e, "Failed to relay contact message");
            cookies.flash(FlashLevel::Danger, SEND_FAILED)
        }
    };

    Ok((cookies, Redirect::to("/contact")).into_response())
}

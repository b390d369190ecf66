use crate::{
    auth::{GateSession, backend::GateAuthCredentials},
    data::user::User,
    error::GateResult,
    maud_conveniences::{form_submit_button, simple_form_element, title},
    state::GateState,
};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::html;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginOptions {
    pub user: Option<String>,
    pub login_failed: Option<bool>,
}

pub async fn get_login(
    State(state): State<GateState>,
    session: GateSession,
    Query(LoginOptions { user, login_failed }): Query<LoginOptions>,
) -> Response {
    if session.user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    let Some(user) = user.as_deref().and_then(User::find_staff) else {
        return Redirect::to("/").into_response();
    };
    let login_failed = login_failed.unwrap_or(false);

    state.render(&session, html! {
        div class="bg-gray-800 shadow-md rounded px-8 pt-6 pb-8 mb-4 w-full max-w-sm" {
            div class="flex items-center space-x-4 mb-4" {
                img src=(user.avatar) alt="" class="w-12 h-12 rounded-full bg-gray-600" {}
                (title(html! {(user) " (" (user.role) ")"}))
            }
            @if login_failed {
                div role="alert" class="bg-red-100 border border-red-400 text-red-700 px-4 py-4 rounded relative mb-4" {
                    strong class="font-bold" {"Invalid Authorization Key"}
                }
            }

            form method="post" action="/login" {
                input type="hidden" name="user_id" value=(user.id) {}
                @if user.role.requires_phrase() {
                    (simple_form_element("phrase", "Authorization Key", true, Some("password"), None))
                }
                (form_submit_button(Some("Sign In")))
            }
            a href="/" class="block mt-4 text-sm text-gray-400 hover:text-gray-200" {"Back to the gateway"}
        }
    }).into_response()
}

#[derive(Deserialize)]
pub struct LoginForm {
    user_id: String,
    phrase: Option<SecretString>,
}

pub async fn post_login(
    mut session: GateSession,
    Form(LoginForm { user_id, phrase }): Form<LoginForm>,
) -> GateResult<Redirect> {
    let phrase = phrase.filter(|phrase| !phrase.expose_secret().is_empty());

    match session
        .authenticate(GateAuthCredentials {
            user_id: user_id.clone(),
            phrase,
        })
        .await?
    {
        Some(user) => {
            session.login(&user).await?;
            info!(user = user.id, role = %user.role, "staff signed in");
            Ok(Redirect::to("/dashboard"))
        }
        None => Ok(match User::find_staff(&user_id) {
            Some(user) => Redirect::to(&format!("/login?user={}&login_failed=true", user.id)),
            None => Redirect::to("/"),
        }),
    }
}

pub async fn post_logout(mut session: GateSession) -> GateResult<impl IntoResponse> {
    session.logout().await?;
    Ok(Redirect::to("/"))
}

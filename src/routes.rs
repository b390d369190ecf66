use crate::{auth::GateSession, data::user::User};
use axum::response::{IntoResponse, Redirect, Response};
use maud::{Markup, html};

pub mod dashboard;
pub mod devices;
pub mod emergency;
pub mod gate;
pub mod index;
pub mod login;
pub mod requests;
pub mod sse;
pub mod student_portal;

///the signed-in staff member, or a redirect back to the gateway
pub fn staff_or_redirect(session: &GateSession) -> Result<&User, Response> {
    session
        .user
        .as_ref()
        .ok_or_else(|| Redirect::to("/").into_response())
}

pub fn notice(text: impl AsRef<str>) -> Markup {
    html! {
        div role="status" class="bg-green-100 border border-green-400 text-green-800 px-4 py-3 rounded mb-4" {
            (text.as_ref())
        }
    }
}

pub fn flash_area() -> Markup {
    html! {
        div id="flash" {}
    }
}

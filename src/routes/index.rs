use crate::{
    auth::GateSession,
    data::user::STAFF_USERS,
    maud_conveniences::{subtitle, title},
    state::GateState,
};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use maud::html;

/// The access gateway: pick a staff identity, or head to the student portal.
pub async fn get_index_route(State(state): State<GateState>, session: GateSession) -> Response {
    if session.user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    state.render(&session, html! {
        div class="bg-gray-800 p-8 rounded shadow-md max-w-2xl w-full" {
            (title("SecureLeave Access Gateway"))
            p class="text-gray-400 mb-6" {"Select your identity to continue."}

            (subtitle("Staff"))
            div class="grid grid-cols-1 sm:grid-cols-2 gap-4 mb-8" {
                @for user in &STAFF_USERS {
                    @if user.role.requires_phrase() {
                        a href={"/login?user=" (user.id)} class="flex items-center space-x-4 rounded-lg shadow-md p-4 bg-gray-700 hover:bg-gray-600" {
                            img src=(user.avatar) alt="" class="w-12 h-12 rounded-full bg-gray-600" {}
                            div {
                                p class="font-semibold" {(user)}
                                p class="text-sm text-gray-400" {(user.role) " · key required"}
                            }
                        }
                    } @else {
                        form method="post" action="/login" {
                            input type="hidden" name="user_id" value=(user.id) {}
                            button type="submit" class="w-full flex items-center space-x-4 rounded-lg shadow-md p-4 bg-gray-700 hover:bg-gray-600 text-left" {
                                img src=(user.avatar) alt="" class="w-12 h-12 rounded-full bg-gray-600" {}
                                div {
                                    p class="font-semibold" {(user)}
                                    p class="text-sm text-gray-400" {(user.role)}
                                }
                            }
                        }
                    }
                }
            }

            (subtitle("Students"))
            a href="/s" class="block text-center bg-blue-600 hover:bg-blue-800 font-bold py-3 px-4 rounded" {
                "Open the Student Portal"
            }
        }
    }).into_response()
}

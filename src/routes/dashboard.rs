use crate::{
    auth::GateSession,
    config::school::SchoolConfig,
    data::{
        filters::{ALL, unique_classes},
        leave_request::{LeaveType, RequestStatus},
        user::{Role, User},
    },
    error::GateResult,
    maud_conveniences::{select_element, subtitle, title},
    routes::{emergency::emergency_form, flash_area, gate::gate_panel, staff_or_redirect},
    state::GateState,
};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};

fn portal_link(school: &SchoolConfig) -> Markup {
    let url = school.portal_url();
    html! {
        div class="rounded bg-gray-700 p-4" {
            p class="text-sm text-gray-400" {"Student portal link"}
            a href=(url) target="_blank" class="font-mono text-blue-300 hover:text-blue-100 underline break-all" {(url)}
        }
    }
}

fn greeting(user: &User) -> Markup {
    html! {
        (title(html! {"Welcome, " (user)}))
    }
}

fn filter_form(classes: &[String]) -> Markup {
    let statuses = std::iter::once((ALL, "All Statuses")).chain(
        RequestStatus::ALL
            .iter()
            .map(|status| (status.as_str(), status.tab_label())),
    );
    let types = [
        (ALL, "All Types"),
        (LeaveType::Normal.as_str(), "Normal"),
        (LeaveType::Emergency.as_str(), "Emergency"),
    ];
    let class_options =
        std::iter::once((ALL, "All Classes")).chain(classes.iter().map(|c| (c.as_str(), c.as_str())));

    html! {
        form id="request_filters" hx-get="/internal/requests" hx-target="#all_requests" hx-trigger="change, input delay:300ms from:#search" class="grid grid-cols-1 md:grid-cols-5 gap-4 items-end" {
            (select_element("status", "Status", statuses, ALL))
            (select_element("leave_type", "Type", types, ALL))
            (select_element("class", "Class", class_options, ALL))
            div class="mb-4" {
                label for="search" class="block text-sm font-bold mb-2 text-gray-300" {"Search"}
                input id="search" type="search" name="search" placeholder="Name, admission no. or reason" class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600" {}
            }
            //a GET outside the form's own trigger sends no values, so this fetches the unfiltered table
            button id="reset_filters" type="reset" hx-get="/internal/requests" hx-target="#all_requests" class="mb-4 bg-gray-600 hover:bg-gray-500 font-bold py-2 px-4 rounded" {
                "Reset Filters"
            }
        }
    }
}

async fn admin_dashboard(state: &GateState, user: &User) -> GateResult<Markup> {
    let classes = unique_classes(&state.gatehouse().all_requests().await?);

    Ok(html! {
        div class="mx-auto bg-gray-800 p-8 rounded shadow-md max-w-6xl w-full flex flex-col space-y-6" hx-ext="sse" sse-connect="/sse_feed" {
            (greeting(user))
            (flash_area())
            div id="stats" hx-get="/internal/stats" hx-trigger="sse:requests,load" {}

            div class="grid grid-cols-1 md:grid-cols-2 gap-4" {
                (portal_link(&state.school()))
                div class="rounded bg-gray-700 p-4" {
                    div class="flex items-center justify-between mb-2" {
                        p class="text-sm text-gray-400" {"Executive insights"}
                        button hx-post="/insights" hx-target="#insights" hx-indicator="#insights_loading" class="bg-indigo-600 hover:bg-indigo-800 font-bold py-1 px-3 rounded text-sm" {
                            "Generate"
                        }
                    }
                    span id="insights_loading" class="htmx-indicator text-sm text-gray-400" {"Analysing..."}
                    div id="insights" {}
                }
            }

            div {
                (subtitle("Leave Records"))
                (filter_form(&classes))
                div id="all_requests" hx-get="/internal/requests" hx-include="#request_filters" hx-trigger="sse:requests,load" {}
            }

            (gate_panel())
        }
    })
}

fn teacher_dashboard(user: &User) -> Markup {
    html! {
        div class="mx-auto bg-gray-800 p-8 rounded shadow-md max-w-5xl w-full flex flex-col space-y-4" hx-ext="sse" sse-connect="/sse_feed" {
            (greeting(user))
            (flash_area())
            div id="teacher_queue" hx-get="/internal/teacher_queue" hx-trigger="sse:requests,load" {}
        }
    }
}

fn security_dashboard(user: &User) -> Markup {
    html! {
        div class="mx-auto bg-gray-800 p-8 rounded shadow-md max-w-4xl w-full flex flex-col space-y-4" hx-ext="sse" sse-connect="/sse_feed" {
            (greeting(user))
            (flash_area())
            (gate_panel())
        }
    }
}

fn nurse_dashboard(state: &GateState, user: &User) -> Markup {
    html! {
        div class="mx-auto bg-gray-800 p-8 rounded shadow-md max-w-2xl w-full flex flex-col space-y-4" {
            (greeting(user))
            (flash_area())
            (emergency_form())
            (portal_link(&state.school()))
        }
    }
}

pub async fn get_dashboard(
    State(state): State<GateState>,
    session: GateSession,
) -> GateResult<Response> {
    let user = match staff_or_redirect(&session) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let body = match user.role {
        Role::Admin => admin_dashboard(&state, user).await?,
        Role::Teacher => teacher_dashboard(user),
        Role::Security => security_dashboard(user),
        Role::Nurse => nurse_dashboard(&state, user),
        Role::Student => return Ok(Redirect::to("/s").into_response()),
    };

    Ok(state.render(&session, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_offer_every_class_and_a_reset() {
        let form = filter_form(&["Form 2A".to_string(), "Form 3B".to_string()]).into_string();

        assert!(form.contains(r#"id="reset_filters""#));
        assert!(form.contains(r#"type="reset""#));
        assert!(form.contains("Reset Filters"));
        assert!(form.contains("Form 2A"));
        assert!(form.contains("Form 3B"));
        assert!(form.contains("All Statuses"));
    }
}

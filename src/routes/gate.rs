use crate::{
    auth::{AuthUtilities, GateSession, PermissionsTarget},
    config::school::SchoolConfig,
    data::{filters::gate_list, leave_request::LeaveRequest, user::User},
    error::GateResult,
    maud_conveniences::{render_table, title},
    routes::requests::request_actions,
    state::GateState,
};
use axum::extract::{Query, State};
use maud::{Markup, html};
use serde::Deserialize;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct GateSearch {
    search: String,
}

/// The search box plus the live list it drives. Admin gets the same list without the buttons.
pub fn gate_panel() -> Markup {
    html! {
        div {
            (title("Gate Clearance"))
            input id="gate_search" type="search" name="search" placeholder="Search by name or admission number"
                hx-get="/internal/gate" hx-target="#gate_list" hx-trigger="input changed delay:300ms, search"
                class="shadow appearance-none border rounded w-full py-2 px-3 mb-4 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600" {}
            div id="gate_list" hx-get="/internal/gate" hx-include="#gate_search" hx-trigger="sse:requests,load" {}
        }
    }
}

fn approval_cell(school: &SchoolConfig, request: &LeaveRequest) -> Markup {
    let approver = request.approved_by.as_deref().map_or("staff", User::display_name);

    html! {
        @if let Some(approved_at) = request.approved_at {
            p {(school.time_only(approved_at)) " by " (approver)}
        }
    }
}

pub async fn internal_get_gate(
    State(state): State<GateState>,
    session: GateSession,
    Query(GateSearch { search }): Query<GateSearch>,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::VIEW_GATE)?;

    let all = state.gatehouse().all_requests().await?;
    let cleared = gate_list(&all, &search);
    let school = state.school();

    let rows = cleared
        .iter()
        .map(|request| {
            [
                html! {
                    span class="font-mono text-lg tracking-widest bg-gray-700 px-2 py-1 rounded" {(request.gate_token())}
                },
                html! {
                    p class="font-semibold" {(request.student_name)}
                    p class="text-xs text-gray-400" {"ADM " (request.student_adm_no)}
                },
                html! {(request.student_class)},
                approval_cell(&school, request),
                html! {(school.short(request.expected_return_at))},
                request_actions(&session, request),
            ]
        })
        .collect();

    Ok(render_table(
        html! {"Cleared to Leave (" (cleared.len()) ")"},
        ["Gate Token", "Student", "Class", "Approved", "Expected Back", "Actions"],
        rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::leave_request::{EmergencyDispatch, Transition};
    use jiff::Timestamp;

    #[test]
    fn approver_is_shown_by_name() {
        let school = SchoolConfig::new("UTC".into(), String::new()).unwrap();
        let mut request = LeaveRequest::from_dispatch(
            EmergencyDispatch {
                name: "Amani Otieno".into(),
                adm_no: "102".into(),
                class: "Form 3B".into(),
                condition: "Fever".into(),
            },
            Timestamp::from_second(1_750_000_000).unwrap(),
        )
        .unwrap();
        request
            .apply(
                Transition::Approve,
                "admin1",
                Timestamp::from_second(1_750_000_600).unwrap(),
            )
            .unwrap();

        let cell = approval_cell(&school, &request).into_string();
        assert!(cell.contains("15:16 by Geraid Mutegi"), "{cell}");
    }
}

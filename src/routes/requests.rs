use crate::{
    auth::{AuthUtilities, GateSession, PermissionsTarget},
    config::school::SchoolConfig,
    data::{
        IdPath,
        filters::{LeaveStats, RequestFilter, RequestFilterQuery, teacher_queue},
        leave_request::{LeaveRequest, RequestStatus, Transition},
    },
    error::{GateResult, MissingStaffMemberSnafu},
    maud_conveniences::{
        action_button, leave_type_badge, render_table, stat_card, status_badge, subtitle,
    },
    routes::notice,
    state::GateState,
};
use axum::extract::{Path, Query, State};
use maud::{Markup, html};
use snafu::OptionExt;

///buttons for whatever the viewer is allowed to do to this request next
pub fn request_actions(session: &GateSession, request: &LeaveRequest) -> Markup {
    let base = format!("/requests/{}", request.id);
    let can_review = request.status == RequestStatus::Pending
        && session.can(PermissionsTarget::REVIEW_REQUESTS);
    let can_clear = request.status == RequestStatus::Approved
        && session.can(PermissionsTarget::CONFIRM_EXIT);
    let can_sign_in = request.status == RequestStatus::Exited
        && session.can(PermissionsTarget::CONFIRM_RETURN);

    html! {
        div class="flex flex-row space-x-2" {
            @if can_review {
                (action_button(&format!("{base}/approve"), "Approve", "bg-green-600 hover:bg-green-800", None))
                (action_button(&format!("{base}/reject"), "Reject", "bg-red-600 hover:bg-red-800", Some("Reject this request?")))
            }
            @if can_clear {
                (action_button(&format!("{base}/exit"), "Confirm Exit", "bg-blue-600 hover:bg-blue-800", None))
            }
            @if can_sign_in {
                (action_button(&format!("{base}/return"), "Confirm Return", "bg-purple-600 hover:bg-purple-800", None))
            }
        }
    }
}

fn student_cell(request: &LeaveRequest) -> Markup {
    html! {
        p class="font-semibold" {(request.student_name)}
        p class="text-xs text-gray-400" {"ADM " (request.student_adm_no) " · " (request.student_class)}
    }
}

fn request_row(session: &GateSession, school: &SchoolConfig, request: &LeaveRequest) -> [Markup; 6] {
    [
        student_cell(request),
        leave_type_badge(request.leave_type),
        html! {(request.reason)},
        status_badge(request.status),
        html! {
            p {(school.short(request.requested_at))}
            p class="text-xs text-gray-400" {"back by " (school.short(request.expected_return_at))}
        },
        request_actions(session, request),
    ]
}

fn request_rows(
    session: &GateSession,
    school: &SchoolConfig,
    requests: &[&LeaveRequest],
) -> Vec<[Markup; 6]> {
    requests
        .iter()
        .map(|request| request_row(session, school, request))
        .collect()
}

///which device filed the request, so it can be matched against the registry
fn device_cell(request: &LeaveRequest) -> Markup {
    html! {
        @if let Some(device) = &request.device_fingerprint {
            p class="font-mono text-xs" {(device)}
            p class="text-xs text-green-400" {"Verified Device"}
        } @else {
            p class="font-mono text-xs text-gray-500" {"LEGACY-REQ"}
        }
    }
}

pub async fn internal_get_requests(
    State(state): State<GateState>,
    session: GateSession,
    Query(query): Query<RequestFilterQuery>,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::VIEW_ALL_REQUESTS)?;

    let filter = RequestFilter::try_from(query)?;
    let all = state.gatehouse().all_requests().await?;
    let shown = filter.apply(&all);
    let school = state.school();

    let rows = shown
        .iter()
        .map(|request| {
            let [student, kind, reason, status, timing, actions] =
                request_row(&session, &school, request);
            [student, kind, reason, status, timing, device_cell(request), actions]
        })
        .collect();

    Ok(html! {
        p class="text-sm text-gray-400 mb-2" {"Displaying " (shown.len()) " of " (all.len()) " records"}
        (render_table(
            "Leave Records",
            ["Student", "Type", "Reason", "Status", "Timing", "Device", "Actions"],
            rows,
        ))
    })
}

pub async fn internal_get_stats(
    State(state): State<GateState>,
    session: GateSession,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::VIEW_ALL_REQUESTS)?;

    let stats = LeaveStats::from_requests(&state.gatehouse().all_requests().await?);

    Ok(html! {
        div class="grid grid-cols-2 md:grid-cols-4 gap-4" {
            (stat_card("Pending", stats.pending, "bg-yellow-700"))
            (stat_card("Off-Campus", stats.exited, "bg-blue-700"))
            (stat_card("Returned", stats.returned, "bg-gray-700"))
            (stat_card("Emergencies", stats.emergency, "bg-red-700"))
        }
    })
}

pub async fn internal_get_teacher_queue(
    State(state): State<GateState>,
    session: GateSession,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::REVIEW_REQUESTS)?;

    let all = state.gatehouse().all_requests().await?;
    let (pending, off_campus) = teacher_queue(&all);
    let school = state.school();

    Ok(html! {
        div class="flex flex-col space-y-8" {
            (render_table(
                html! {"Awaiting Decision (" (pending.len()) ")"},
                ["Student", "Type", "Reason", "Status", "Timing", "Actions"],
                request_rows(&session, &school, &pending),
            ))
            div {
                (subtitle("Off-Campus"))
                (render_table(
                    html! {"Awaiting Return (" (off_campus.len()) ")"},
                    ["Student", "Type", "Reason", "Status", "Timing", "Actions"],
                    request_rows(&session, &school, &off_campus),
                ))
            }
        }
    })
}

async fn move_request(
    state: &GateState,
    session: &GateSession,
    id: uuid::Uuid,
    transition: Transition,
    needed: PermissionsTarget,
) -> GateResult<Markup> {
    session.ensure_can(needed)?;
    let actor = session.user.as_ref().context(MissingStaffMemberSnafu {
        id: "<signed out>".to_string(),
    })?;

    let request = state
        .gatehouse()
        .transition(id, transition, actor.id)
        .await?;

    Ok(notice(format!(
        "{} ({}) is now {}.",
        request.student_name,
        request.student_adm_no,
        request.status.tab_label()
    )))
}

pub async fn post_approve(
    State(state): State<GateState>,
    session: GateSession,
    Path(IdPath { id }): Path<IdPath>,
) -> GateResult<Markup> {
    move_request(
        &state,
        &session,
        id,
        Transition::Approve,
        PermissionsTarget::REVIEW_REQUESTS,
    )
    .await
}

pub async fn post_reject(
    State(state): State<GateState>,
    session: GateSession,
    Path(IdPath { id }): Path<IdPath>,
) -> GateResult<Markup> {
    move_request(
        &state,
        &session,
        id,
        Transition::Reject,
        PermissionsTarget::REVIEW_REQUESTS,
    )
    .await
}

pub async fn post_confirm_exit(
    State(state): State<GateState>,
    session: GateSession,
    Path(IdPath { id }): Path<IdPath>,
) -> GateResult<Markup> {
    move_request(
        &state,
        &session,
        id,
        Transition::ConfirmExit,
        PermissionsTarget::CONFIRM_EXIT,
    )
    .await
}

pub async fn post_confirm_return(
    State(state): State<GateState>,
    session: GateSession,
    Path(IdPath { id }): Path<IdPath>,
) -> GateResult<Markup> {
    move_request(
        &state,
        &session,
        id,
        Transition::ConfirmReturn,
        PermissionsTarget::CONFIRM_RETURN,
    )
    .await
}

pub async fn post_insights(
    State(state): State<GateState>,
    session: GateSession,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::RUN_INSIGHTS)?;

    let requests = state.gatehouse().all_requests().await?;
    let summary = state.insights().summarise(&requests).await;

    Ok(html! {
        div class="bg-gray-700 rounded p-4 whitespace-pre-line text-gray-100" {
            (summary)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        device::DeviceFingerprint,
        leave_request::{EmergencyDispatch, StudentSubmission},
    };
    use jiff::Timestamp;

    fn now() -> Timestamp {
        Timestamp::from_second(1_750_000_000).unwrap()
    }

    #[test]
    fn student_requests_show_their_device() {
        let request = LeaveRequest::from_submission(
            StudentSubmission {
                name: "Amani Otieno".into(),
                adm_no: "102".into(),
                class: "Form 3B".into(),
                reason: "Dentist appointment".into(),
                expected_return_at: now(),
            },
            DeviceFingerprint::from("DEV-AAAA0001"),
            now(),
        )
        .unwrap();

        let cell = device_cell(&request).into_string();
        assert!(cell.contains("DEV-AAAA0001"));
        assert!(cell.contains("Verified Device"));
        assert!(!cell.contains("LEGACY-REQ"));
    }

    #[test]
    fn dispatches_have_no_device() {
        let request = LeaveRequest::from_dispatch(
            EmergencyDispatch {
                name: "Amani Otieno".into(),
                adm_no: "102".into(),
                class: "Form 3B".into(),
                condition: "Fever".into(),
            },
            now(),
        )
        .unwrap();

        let cell = device_cell(&request).into_string();
        assert!(cell.contains("LEGACY-REQ"));
        assert!(!cell.contains("Verified Device"));
    }
}

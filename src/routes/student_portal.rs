use crate::{
    auth::GateSession,
    config::school::SchoolConfig,
    data::{
        device::DeviceFingerprint,
        filters::split_active,
        leave_request::{LeaveRequest, RequestStatus, StudentSubmission},
    },
    error::{GateError, GateResult, TowerSessionSnafu},
    maud_conveniences::{
        errors_list, form_element, form_submit_button, leave_type_badge, render_table,
        simple_form_element, status_badge, subtitle, title,
    },
    state::GateState,
};
use axum::{Form, extract::State};
use maud::{Markup, html};
use serde::Deserialize;
use snafu::ResultExt;

const DEVICE_KEY: &str = "sl_device_fingerprint";

/// The fingerprint this browser submits under, minted on first visit.
async fn device_for(session: &GateSession) -> GateResult<DeviceFingerprint> {
    if let Some(device) = session
        .session
        .get::<DeviceFingerprint>(DEVICE_KEY)
        .await
        .context(TowerSessionSnafu)?
    {
        return Ok(device);
    }

    let device = DeviceFingerprint::generate();
    session
        .session
        .insert(DEVICE_KEY, &device)
        .await
        .context(TowerSessionSnafu)?;
    info!(%device, "issued device fingerprint");
    Ok(device)
}

const fn headline(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "Awaiting Approval",
        RequestStatus::Approved => "Cleared to Leave",
        RequestStatus::Exited => "Out of Bounds",
        RequestStatus::Rejected => "Request Denied",
        RequestStatus::Returned => "Back on Campus",
    }
}

pub async fn get_student_portal(
    State(state): State<GateState>,
    session: GateSession,
) -> GateResult<Markup> {
    let device = device_for(&session).await?;

    Ok(state.render(&session, html! {
        div class="mx-auto bg-gray-800 p-8 rounded shadow-md max-w-3xl w-full flex flex-col space-y-4" hx-ext="sse" sse-connect="/sse_feed" {
            (title("Student Portal"))
            p class="text-xs text-gray-500" {"This device: " span class="font-mono" {(device)}}
            div id="student_status" hx-get="/internal/student" hx-trigger="sse:requests,load" {}
            div id="in_focus" {}
        }
    }))
}

fn active_card(school: &SchoolConfig, request: &LeaveRequest) -> Markup {
    html! {
        div class="rounded-lg shadow-md p-6 bg-gray-700 text-center" {
            p class="text-sm uppercase tracking-wide text-gray-400" {"Current Status"}
            p class="text-3xl font-bold my-2" {(headline(request.status))}
            (status_badge(request.status))
            p class="mt-4 text-gray-300" {(request.reason)}
            p class="text-gray-300" {"Expected back: " span class="font-semibold" {(school.short(request.expected_return_at))}}
            @if request.status == RequestStatus::Approved {
                div class="mt-6" {
                    p class="text-sm text-gray-400" {"Show this code at the gate"}
                    p class="font-mono text-4xl tracking-widest bg-gray-900 rounded py-3 mt-2" {(request.gate_token())}
                }
            }
        }
    }
}

pub async fn internal_get_student(
    State(state): State<GateState>,
    session: GateSession,
) -> GateResult<Markup> {
    let device = device_for(&session).await?;
    let requests = state.gatehouse().requests_for_device(device).await?;
    let (active, history) = split_active(&requests);
    let school = state.school();

    let rows = history
        .iter()
        .map(|request| {
            [
                html! {(school.date_only(request.requested_at))},
                leave_type_badge(request.leave_type),
                html! {(request.reason)},
                status_badge(request.status),
            ]
        })
        .collect();

    Ok(html! {
        div class="flex flex-col space-y-6" {
            @if let Some(active) = active {
                (active_card(&school, active))
            } @else {
                div class="text-center" {
                    p class="text-gray-400 mb-4" {"You have no active leave request."}
                    button hx-get="/s/apply" hx-target="#in_focus" class="bg-blue-600 hover:bg-blue-800 font-bold py-2 px-4 rounded" {
                        "Apply for Leave"
                    }
                }
            }
            (render_table("History", ["Date", "Type", "Reason", "Status"], rows))
        }
    })
}

#[derive(Deserialize, Default)]
pub struct ApplyForm {
    name: String,
    adm_no: String,
    class: String,
    reason: String,
    expected_return: String,
}

fn apply_form(previous: &ApplyForm, problem: Option<&str>) -> Markup {
    html! {
        (subtitle("Apply for Leave"))
        @if let Some(problem) = problem {
            (errors_list([problem]))
        }
        form hx-post="/s/apply" hx-target="#in_focus" class="p-4" {
            (simple_form_element("name", "Full Name", true, None, Some(previous.name.as_str())))
            (simple_form_element("adm_no", "Admission Number", true, None, Some(previous.adm_no.as_str())))
            (simple_form_element("class", "Class", true, None, Some(previous.class.as_str())))
            (form_element("reason", "Reason for Leave", html! {
                textarea id="reason" name="reason" rows="3" required class="w-full bg-gray-700 text-gray-100 rounded px-4 py-2 border border-gray-600 focus:outline-none focus:ring focus:ring-blue-500 placeholder-gray-400 resize-y" {(previous.reason)}
            }))
            (simple_form_element("expected_return", "Expected Return", true, Some("datetime-local"), Some(previous.expected_return.as_str())))
            (form_submit_button(Some("Submit Request")))
        }
    }
}

pub async fn get_apply() -> Markup {
    apply_form(&ApplyForm::default(), None)
}

pub async fn post_apply(
    State(state): State<GateState>,
    session: GateSession,
    Form(form): Form<ApplyForm>,
) -> GateResult<Markup> {
    let device = device_for(&session).await?;

    let outcome = match state.school().parse_local(&form.expected_return) {
        Ok(expected_return_at) => {
            let submission = StudentSubmission {
                name: form.name.clone(),
                adm_no: form.adm_no.clone(),
                class: form.class.clone(),
                reason: form.reason.clone(),
                expected_return_at,
            };
            state.gatehouse().submit(submission, device).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(request) => Ok(html! {
            div role="status" class="bg-green-100 border border-green-400 text-green-800 px-4 py-3 rounded" {
                "Request submitted for " (request.student_name) ". Watch this page for approval."
            }
        }),
        Err(
            e @ (GateError::DeviceBoundElsewhere { .. }
            | GateError::DeviceClaimed { .. }
            | GateError::ActiveRequestExists { .. }
            | GateError::EmptyField { .. }
            | GateError::ParseTime { .. }),
        ) => Ok(apply_form(&form, Some(&e.to_string()))),
        Err(e) => Err(e),
    }
}

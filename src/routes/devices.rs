use crate::{
    auth::{AuthUtilities, GateSession, PermissionsTarget},
    error::GateResult,
    maud_conveniences::{render_table, title},
    routes::{flash_area, notice, staff_or_redirect},
    state::GateState,
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

pub async fn get_devices(State(state): State<GateState>, session: GateSession) -> GateResult<Response> {
    if let Err(redirect) = staff_or_redirect(&session) {
        return Ok(redirect);
    }
    session.ensure_can(PermissionsTarget::MANAGE_DEVICES)?;

    Ok(state.render(&session, html! {
        div class="mx-auto bg-gray-800 p-8 rounded shadow-md max-w-5xl w-full flex flex-col space-y-4" hx-ext="sse" sse-connect="/sse_feed" {
            (title("Security Audit"))
            p class="text-gray-400" {"Each admission number may only submit from the one device it first used. Resetting lets the student bind a new device."}
            (flash_area())
            div id="all_devices" hx-get="/internal/devices" hx-trigger="sse:registry,load" {}
        }
    }).into_response())
}

pub async fn internal_get_devices(
    State(state): State<GateState>,
    session: GateSession,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::MANAGE_DEVICES)?;

    let devices = state.gatehouse().all_devices().await?;
    let school = state.school();

    let rows = devices
        .iter()
        .map(|record| {
            [
                html! { span class="font-semibold" {(record.adm_no)} },
                html! { span class="font-mono" {(record.device_id)} },
                html! {(school.short(record.registered_at))},
                html! {(school.short(record.last_used_at))},
                html! {
                    button hx-delete={"/devices/" (record.adm_no)} hx-target="#flash" hx-confirm={"Reset the device binding for ADM " (record.adm_no) "?"}
                        class="bg-red-600 hover:bg-red-800 font-bold py-1 px-3 rounded text-sm" {
                        "Reset"
                    }
                },
            ]
        })
        .collect();

    Ok(render_table(
        html! {"Device Registry (" (devices.len()) ")"},
        ["Admission No.", "Device", "Registered", "Last Used", "Actions"],
        rows,
    ))
}

pub async fn delete_device(
    State(state): State<GateState>,
    session: GateSession,
    Path(adm_no): Path<String>,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::MANAGE_DEVICES)?;

    Ok(if state.gatehouse().reset_binding(adm_no.clone()).await? {
        notice(format!("Binding for ADM {adm_no} reset."))
    } else {
        notice(format!("ADM {adm_no} had no device binding."))
    })
}

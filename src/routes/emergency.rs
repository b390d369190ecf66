use crate::{
    auth::{AuthUtilities, GateSession, PermissionsTarget},
    data::leave_request::EmergencyDispatch,
    error::GateResult,
    gatehouse::Gatehouse,
    maud_conveniences::{form_element, form_submit_button, simple_form_element, title},
    routes::notice,
    state::GateState,
};
use axum::{Form, extract::State};
use maud::{Markup, html};

pub fn emergency_form() -> Markup {
    html! {
        (title("Emergency Dispatch"))
        form hx-post="/emergency" hx-target="#flash" class="p-4" {
            (simple_form_element("name", "Student Name", true, None, None))
            (simple_form_element("adm_no", "Admission Number", true, None, None))
            (simple_form_element("class", "Class", true, None, None))
            (form_element("condition", "Medical Condition", html! {
                textarea id="condition" name="condition" rows="2" required class="w-full bg-gray-700 text-gray-100 rounded px-4 py-2 border border-gray-600 focus:outline-none focus:ring focus:ring-blue-500 placeholder-gray-400 resize-y" {}
            }))
            (form_submit_button(Some("Dispatch Emergency Exit")))
        }
    }
}

pub async fn post_emergency(
    State(state): State<GateState>,
    session: GateSession,
    Form(dispatch): Form<EmergencyDispatch>,
) -> GateResult<Markup> {
    session.ensure_can(PermissionsTarget::DISPATCH_EMERGENCY)?;

    send_dispatch(state.gatehouse(), dispatch).await
}

async fn send_dispatch(gatehouse: &Gatehouse, dispatch: EmergencyDispatch) -> GateResult<Markup> {
    let request = gatehouse.dispatch_emergency(dispatch).await?;

    Ok(notice(format!(
        "Emergency exit for {} ({}) sent to the administrator for approval.",
        request.student_name, request.student_adm_no
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLeaveStore;
    use axum::{http::StatusCode, response::IntoResponse};
    use std::sync::Arc;

    fn dispatch(condition: &str) -> EmergencyDispatch {
        EmergencyDispatch {
            name: "Amani Otieno".into(),
            adm_no: "102".into(),
            class: "Form 3B".into(),
            condition: condition.into(),
        }
    }

    async fn body_of(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn blank_condition_comes_back_as_an_alert() {
        let gatehouse = Gatehouse::spawn(Arc::new(MemoryLeaveStore::new()));

        let response = send_dispatch(&gatehouse, dispatch("   "))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert!(body.contains(r#"role="alert""#), "{body}");
        assert!(body.contains("The condition field must not be empty"), "{body}");
        assert!(gatehouse.all_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accepted_dispatch_is_confirmed() {
        let gatehouse = Gatehouse::spawn(Arc::new(MemoryLeaveStore::new()));

        let response = send_dispatch(&gatehouse, dispatch("Fever"))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_of(response).await;
        assert!(body.contains("Emergency exit for Amani Otieno (102)"), "{body}");
    }
}

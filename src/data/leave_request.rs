use crate::{
    data::device::DeviceFingerprint,
    error::{EmptyFieldSnafu, GateError, GateResult, InvalidTransitionSnafu},
};
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "leave_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Exited,
    Returned,
}

impl RequestStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Exited,
        Self::Returned,
    ];

    ///the only legal moves are PENDING -> {APPROVED, REJECTED}, APPROVED -> EXITED, EXITED -> RETURNED
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::Exited)
                | (Self::Exited, Self::Returned)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Returned)
    }

    ///still occupies the student's single request slot
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Exited => "EXITED",
            Self::Returned => "RETURNED",
        }
    }

    ///label used on the admin tabs
    pub const fn tab_label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Authorized",
            Self::Rejected => "Denied",
            Self::Exited => "Off-Campus",
            Self::Returned => "Completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GateError::UnknownVariant {
                kind: "status",
                provided: s.to_string(),
            })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "leave_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Normal,
    Emergency,
}

impl LeaveType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveType {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Self::Normal),
            "EMERGENCY" => Ok(Self::Emergency),
            _ => Err(GateError::UnknownVariant {
                kind: "leave type",
                provided: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub student_class: String,
    pub student_adm_no: String,
    pub leave_type: LeaveType,
    pub reason: String,
    pub requested_at: Timestamp,
    pub expected_return_at: Timestamp,
    pub status: RequestStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub exited_at: Option<Timestamp>,
    pub exited_confirmed_by: Option<String>,
    pub returned_at: Option<Timestamp>,
    pub returned_confirmed_by: Option<String>,
    pub device_fingerprint: Option<DeviceFingerprint>,
}

/// What a student types into the portal form.
#[derive(Debug, Clone)]
pub struct StudentSubmission {
    pub name: String,
    pub adm_no: String,
    pub class: String,
    pub reason: String,
    pub expected_return_at: Timestamp,
}

/// What the nurse types in when sending a student home.
#[derive(Debug, Clone, Deserialize)]
pub struct EmergencyDispatch {
    pub name: String,
    pub adm_no: String,
    pub class: String,
    pub condition: String,
}

///how long an emergency dispatch is expected to keep the student away
pub const EMERGENCY_EXPECTED_ABSENCE: SignedDuration = SignedDuration::from_hours(3);

fn required(value: String, field: &'static str) -> GateResult<String> {
    let trimmed = value.trim();
    snafu::ensure!(!trimmed.is_empty(), EmptyFieldSnafu { field });
    Ok(trimmed.to_string())
}

impl LeaveRequest {
    #[allow(clippy::too_many_arguments)]
    fn pending(
        name: String,
        adm_no: String,
        class: String,
        reason: String,
        leave_type: LeaveType,
        requested_at: Timestamp,
        expected_return_at: Timestamp,
        device_fingerprint: Option<DeviceFingerprint>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: format!("s_{adm_no}"),
            student_name: name,
            student_class: class,
            student_adm_no: adm_no,
            leave_type,
            reason,
            requested_at,
            expected_return_at,
            status: RequestStatus::Pending,
            approved_by: None,
            approved_at: None,
            exited_at: None,
            exited_confirmed_by: None,
            returned_at: None,
            returned_confirmed_by: None,
            device_fingerprint,
        }
    }

    pub fn from_submission(
        submission: StudentSubmission,
        device: DeviceFingerprint,
        now: Timestamp,
    ) -> GateResult<Self> {
        let StudentSubmission {
            name,
            adm_no,
            class,
            reason,
            expected_return_at,
        } = submission;

        Ok(Self::pending(
            required(name, "name")?,
            required(adm_no, "admission number")?,
            required(class, "class")?,
            required(reason, "reason")?,
            LeaveType::Normal,
            now,
            expected_return_at,
            Some(device),
        ))
    }

    pub fn from_dispatch(dispatch: EmergencyDispatch, now: Timestamp) -> GateResult<Self> {
        let EmergencyDispatch {
            name,
            adm_no,
            class,
            condition,
        } = dispatch;
        let condition = required(condition, "condition")?;

        Ok(Self::pending(
            required(name, "name")?,
            required(adm_no, "admission number")?,
            required(class, "class")?,
            format!("MEDICAL URGENCY: {condition}"),
            LeaveType::Emergency,
            now,
            now + EMERGENCY_EXPECTED_ABSENCE,
            None,
        ))
    }

    ///short code the guard can read off the student's screen
    pub fn gate_token(&self) -> String {
        let simple = self.id.simple().to_string();
        simple[simple.len() - 8..].to_ascii_uppercase()
    }

    /// Moves the request along its lifecycle, stamping the acting staff member.
    ///
    /// Fails without touching `self` if the current status does not allow the move.
    pub fn apply(&mut self, transition: Transition, actor: &str, now: Timestamp) -> GateResult<()> {
        let target = transition.target();
        snafu::ensure!(
            self.status.can_become(target),
            InvalidTransitionSnafu {
                id: self.id,
                from: self.status,
                to: target,
            }
        );

        match transition {
            Transition::Approve => {
                self.approved_by = Some(actor.to_string());
                self.approved_at = Some(now);
            }
            Transition::Reject => {}
            Transition::ConfirmExit => {
                self.exited_at = Some(now);
                self.exited_confirmed_by = Some(actor.to_string());
            }
            Transition::ConfirmReturn => {
                self.returned_at = Some(now);
                self.returned_confirmed_by = Some(actor.to_string());
            }
        }
        self.status = target;

        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    ConfirmExit,
    ConfirmReturn,
}

impl Transition {
    pub const fn target(self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Reject => RequestStatus::Rejected,
            Self::ConfirmExit => RequestStatus::Exited,
            Self::ConfirmReturn => RequestStatus::Returned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(adm_no: &str) -> StudentSubmission {
        StudentSubmission {
            name: " Amani Otieno ".into(),
            adm_no: adm_no.into(),
            class: "Form 3B".into(),
            reason: "Dentist appointment".into(),
            expected_return_at: Timestamp::from_second(1_750_000_000).unwrap(),
        }
    }

    fn fresh() -> LeaveRequest {
        LeaveRequest::from_submission(
            submission("102"),
            DeviceFingerprint::from("DEV-AAAA0001"),
            Timestamp::from_second(1_749_990_000).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn only_the_documented_moves_are_legal() {
        use RequestStatus::*;

        let legal = [
            (Pending, Approved),
            (Pending, Rejected),
            (Approved, Exited),
            (Exited, Returned),
        ];
        for from in RequestStatus::ALL {
            for to in RequestStatus::ALL {
                assert_eq!(
                    from.can_become(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for from in [RequestStatus::Rejected, RequestStatus::Returned] {
            assert!(from.is_terminal());
            assert!(RequestStatus::ALL.iter().all(|to| !from.can_become(*to)));
        }
    }

    #[test]
    fn submission_is_trimmed_and_pending() {
        let request = fresh();
        assert_eq!(request.student_name, "Amani Otieno");
        assert_eq!(request.student_id, "s_102");
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.leave_type, LeaveType::Normal);
        assert_eq!(
            request.device_fingerprint.as_ref().map(DeviceFingerprint::as_str),
            Some("DEV-AAAA0001")
        );
    }

    #[test]
    fn blank_reason_is_refused() {
        let mut blank = submission("102");
        blank.reason = "   ".into();
        let err = LeaveRequest::from_submission(
            blank,
            DeviceFingerprint::from("DEV-AAAA0001"),
            Timestamp::UNIX_EPOCH,
        )
        .unwrap_err();
        assert!(matches!(err, GateError::EmptyField { field: "reason" }));
    }

    #[test]
    fn dispatch_is_an_emergency_due_back_in_three_hours() {
        let now = Timestamp::from_second(1_750_000_000).unwrap();
        let request = LeaveRequest::from_dispatch(
            EmergencyDispatch {
                name: "Baraka Mwangi".into(),
                adm_no: "311".into(),
                class: "Form 1A".into(),
                condition: "High fever".into(),
            },
            now,
        )
        .unwrap();

        assert_eq!(request.leave_type, LeaveType::Emergency);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.reason, "MEDICAL URGENCY: High fever");
        assert_eq!(request.expected_return_at, now + SignedDuration::from_hours(3));
        assert!(request.device_fingerprint.is_none());
    }

    #[test]
    fn full_lifecycle_stamps_each_actor() {
        let mut request = fresh();
        let now = Timestamp::from_second(1_750_000_100).unwrap();

        request.apply(Transition::Approve, "teacher1", now).unwrap();
        assert_eq!(request.approved_by.as_deref(), Some("teacher1"));
        assert_eq!(request.approved_at, Some(now));

        request.apply(Transition::ConfirmExit, "sec1", now).unwrap();
        assert_eq!(request.status, RequestStatus::Exited);
        assert_eq!(request.exited_confirmed_by.as_deref(), Some("sec1"));
        assert_eq!(request.exited_at, Some(now));

        request.apply(Transition::ConfirmReturn, "admin1", now).unwrap();
        assert_eq!(request.status, RequestStatus::Returned);
        assert_eq!(request.returned_confirmed_by.as_deref(), Some("admin1"));
        assert_eq!(request.returned_at, Some(now));
    }

    #[test]
    fn exit_before_approval_is_refused_and_changes_nothing() {
        let mut request = fresh();
        let before = request.clone();

        let err = request
            .apply(Transition::ConfirmExit, "sec1", Timestamp::UNIX_EPOCH)
            .unwrap_err();

        assert!(matches!(
            err,
            GateError::InvalidTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::Exited,
                ..
            }
        ));
        assert_eq!(request, before);
    }

    #[test]
    fn gate_token_is_eight_upper_hex_chars() {
        let token = fresh().gate_token();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!("exited".parse::<RequestStatus>().unwrap(), RequestStatus::Exited);
        assert_eq!("Emergency".parse::<LeaveType>().unwrap(), LeaveType::Emergency);
        assert!("LOST".parse::<RequestStatus>().is_err());
    }
}

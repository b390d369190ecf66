use crate::{
    auth::{PermissionsTarget, backend::GateAuthBackend},
    data::leave_request::RequestStatus,
};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use maud::html;
use snafu::Snafu;
use std::num::ParseIntError;
use uuid::Uuid;

pub type GateResult<T> = Result<T, GateError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GateError {
    #[snafu(display("Error opening database"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error getting db connection"))]
    GetDatabaseConnection { source: sqlx::Error },
    #[snafu(display("Error making SQL query"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("Error commiting SQL transaction"))]
    CommitTransaction { source: sqlx::Error },
    #[snafu(display("Error migrating DB schema"))]
    Migrate { source: sqlx::migrate::MigrateError },
    #[snafu(display("Error serialising with rmp_serde"))]
    RmpSerdeEncode { source: rmp_serde::encode::Error },
    #[snafu(display("Error deserialising with rmp_serde"))]
    RmpSerdeDecode { source: rmp_serde::decode::Error },
    #[snafu(display("Error serialising insight payload"))]
    SerdeJson { source: serde_json::Error },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse IP port"))]
    ParsePort { source: ParseIntError },
    #[snafu(display("Unknown time zone {:?}", tz))]
    InvalidTimezone { source: jiff::Error, tz: String },
    #[snafu(display("Unable to parse date {:?}", original))]
    ParseTime {
        source: jiff::Error,
        original: String,
    },
    #[snafu(display("Stored timestamp {} is out of range", millis))]
    InvalidStoredTime { source: jiff::Error, millis: i64 },
    #[snafu(display("Unable to find leave request with UUID: {}", id))]
    MissingRequest { id: Uuid },
    #[snafu(display("Unable to find staff member with ID: {}", id))]
    MissingStaffMember { id: String },
    #[snafu(display("Cannot move request {} from {} to {}", id, from, to))]
    InvalidTransition {
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    },
    #[snafu(display("Security Violation: Student {} is bound to a different device.", adm_no))]
    DeviceBoundElsewhere { adm_no: String },
    #[snafu(display("Hardware Conflict: This device is bound to ADM: {}.", bound_to))]
    DeviceClaimed { bound_to: String },
    #[snafu(display("This device already has an active request ({})", status))]
    ActiveRequestExists { status: RequestStatus },
    #[snafu(display("The {} field must not be empty", field))]
    EmptyField { field: &'static str },
    #[snafu(display("Unknown {} value {:?}", kind, provided))]
    UnknownVariant {
        kind: &'static str,
        provided: String,
    },
    #[snafu(display("Error with hashing/phrase verification"))]
    Bcrypt { source: bcrypt::BcryptError },
    #[snafu(display("Error joining blocking task"))]
    JoinBlocking { source: tokio::task::JoinError },
    #[snafu(display("Error with sessions"))]
    TowerSession {
        source: axum_login::tower_sessions::session::Error,
    },
    #[snafu(display("Tried to {:?}, only had {:?}", needed.iter_names().collect::<Vec<_>>(), found.iter_names().collect::<Vec<_>>()))]
    IncorrectPermissions {
        needed: PermissionsTarget,
        found: PermissionsTarget,
    },
    #[snafu(display("The gatehouse is no longer running"))]
    GatehouseStopped,
    #[snafu(display("No insight API key configured"))]
    MissingInsightKey,
    #[snafu(display("Error calling the insight endpoint"))]
    InsightRequest { source: reqwest::Error },
    #[snafu(display("Insight endpoint answered with {}", status))]
    InsightStatus { status: reqwest::StatusCode },
}

impl From<axum_login::Error<GateAuthBackend>> for GateError {
    fn from(value: axum_login::Error<GateAuthBackend>) -> Self {
        match value {
            axum_login::Error::Session(source) => Self::TowerSession { source },
            axum_login::Error::Backend(backend) => backend,
        }
    }
}

impl IntoResponse for GateError {
    #[allow(clippy::match_same_arms)]
    fn into_response(self) -> Response {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const NA: StatusCode = StatusCode::FORBIDDEN; //not allowed
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input
        const CF: StatusCode = StatusCode::CONFLICT; //conflict with current state

        let basic_error = |desc| {
            html! {
                div class="bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded relative mb-4" role="alert" {
                    strong class="font-bold" {"SecureLeave Error "}
                    span {(desc)}
                }
            }
        };

        let status_code = match &self {
            Self::OpenDatabase { .. } | Self::GetDatabaseConnection { .. } => ISE,
            Self::MakeQuery { source } => match source {
                sqlx::Error::RowNotFound => NF,
                _ => ISE,
            },
            Self::CommitTransaction { .. } | Self::Migrate { .. } => ISE,
            Self::RmpSerdeEncode { .. } => ISE,
            Self::RmpSerdeDecode { .. } => BI,
            Self::SerdeJson { .. } => ISE,
            Self::BadEnvVar { .. } | Self::ParsePort { .. } | Self::InvalidTimezone { .. } => ISE,
            Self::ParseTime { .. } => BI,
            Self::InvalidStoredTime { .. } => ISE,
            Self::MissingRequest { .. } | Self::MissingStaffMember { .. } => NF,
            Self::InvalidTransition { .. } => CF,
            Self::DeviceBoundElsewhere { .. } | Self::DeviceClaimed { .. } => CF,
            Self::ActiveRequestExists { .. } => CF,
            Self::EmptyField { .. } | Self::UnknownVariant { .. } => BI,
            Self::Bcrypt { .. } | Self::JoinBlocking { .. } => ISE,
            Self::TowerSession { .. } => ISE,
            Self::IncorrectPermissions { .. } => NA,
            Self::GatehouseStopped => ISE,
            Self::MissingInsightKey | Self::InsightRequest { .. } | Self::InsightStatus { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };

        error!(?self, "Error!");
        (status_code, Html(basic_error(self.to_string()).into_string())).into_response()
    }
}

use serde::Deserialize;
use uuid::Uuid;

pub mod device;
pub mod filters;
pub mod leave_request;
pub mod user;

#[derive(Deserialize)]
pub struct IdPath {
    pub id: Uuid,
}

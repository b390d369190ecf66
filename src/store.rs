use crate::{
    data::{
        device::{DeviceFingerprint, DeviceRecord},
        leave_request::LeaveRequest,
    },
    error::GateResult,
};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Persistence for both collections. Only the gatehouse task holds one.
#[async_trait]
pub trait LeaveStore: Send + Sync {
    ///newest first
    async fn all_requests(&self) -> GateResult<Vec<LeaveRequest>>;
    async fn get_request(&self, id: Uuid) -> GateResult<Option<LeaveRequest>>;
    async fn requests_for_device(
        &self,
        device: &DeviceFingerprint,
    ) -> GateResult<Vec<LeaveRequest>>;
    ///stores the new request, and upserts `binding` alongside it atomically when given
    async fn record_request(
        &self,
        request: &LeaveRequest,
        binding: Option<&DeviceRecord>,
    ) -> GateResult<()>;
    async fn update_request(&self, request: &LeaveRequest) -> GateResult<()>;

    async fn all_devices(&self) -> GateResult<Vec<DeviceRecord>>;
    async fn device_by_adm_no(&self, adm_no: &str) -> GateResult<Option<DeviceRecord>>;
    async fn device_by_fingerprint(
        &self,
        device: &DeviceFingerprint,
    ) -> GateResult<Option<DeviceRecord>>;
    ///returns whether anything was bound to `adm_no`
    async fn remove_device(&self, adm_no: &str) -> GateResult<bool>;
}

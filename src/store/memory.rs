use crate::{
    data::{
        device::{DeviceFingerprint, DeviceRecord},
        leave_request::LeaveRequest,
    },
    error::{GateResult, MissingRequestSnafu},
    store::LeaveStore,
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    requests: Vec<LeaveRequest>,
    devices: HashMap<String, DeviceRecord>,
}

/// Keeps both collections in memory, for exercising the gatehouse without a database.
#[derive(Default)]
pub struct MemoryLeaveStore {
    inner: Mutex<Inner>,
}

impl MemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().devices = devices
            .into_iter()
            .map(|record| (record.adm_no.clone(), record))
            .collect();
        store
    }
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn all_requests(&self) -> GateResult<Vec<LeaveRequest>> {
        let mut requests = self.inner.lock().unwrap().requests.clone();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    async fn get_request(&self, id: Uuid) -> GateResult<Option<LeaveRequest>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .requests
            .iter()
            .find(|request| request.id == id)
            .cloned())
    }

    async fn requests_for_device(
        &self,
        device: &DeviceFingerprint,
    ) -> GateResult<Vec<LeaveRequest>> {
        Ok(self
            .all_requests()
            .await?
            .into_iter()
            .filter(|request| request.device_fingerprint.as_ref() == Some(device))
            .collect())
    }

    async fn record_request(
        &self,
        request: &LeaveRequest,
        binding: Option<&DeviceRecord>,
    ) -> GateResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(binding) = binding {
            inner
                .devices
                .entry(binding.adm_no.clone())
                .and_modify(|existing| existing.last_used_at = binding.last_used_at)
                .or_insert_with(|| binding.clone());
        }
        inner.requests.push(request.clone());
        Ok(())
    }

    async fn update_request(&self, request: &LeaveRequest) -> GateResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .requests
            .iter_mut()
            .find(|existing| existing.id == request.id)
            .ok_or_else(|| MissingRequestSnafu { id: request.id }.build())?;
        *slot = request.clone();
        Ok(())
    }

    async fn all_devices(&self) -> GateResult<Vec<DeviceRecord>> {
        let mut devices: Vec<_> = self.inner.lock().unwrap().devices.values().cloned().collect();
        devices.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(devices)
    }

    async fn device_by_adm_no(&self, adm_no: &str) -> GateResult<Option<DeviceRecord>> {
        Ok(self.inner.lock().unwrap().devices.get(adm_no).cloned())
    }

    async fn device_by_fingerprint(
        &self,
        device: &DeviceFingerprint,
    ) -> GateResult<Option<DeviceRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .devices
            .values()
            .find(|record| &record.device_id == device)
            .cloned())
    }

    async fn remove_device(&self, adm_no: &str) -> GateResult<bool> {
        Ok(self.inner.lock().unwrap().devices.remove(adm_no).is_some())
    }
}

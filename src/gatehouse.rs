//! The single writer for requests and device bindings.
//!
//! Every command goes through one task in arrival order, so binding checks and
//! status transitions never interleave. Observers learn about changes through
//! [`Subscription`]s.

use crate::{
    data::{
        device::{BindingCheck, DeviceFingerprint, DeviceRecord},
        leave_request::{EmergencyDispatch, LeaveRequest, StudentSubmission, Transition},
    },
    error::{
        ActiveRequestExistsSnafu, DeviceBoundElsewhereSnafu, DeviceClaimedSnafu, GateError,
        GateResult, MissingRequestSnafu,
    },
    store::LeaveStore,
};
use futures::{Stream, StreamExt, stream};
use jiff::Timestamp;
use snafu::OptionExt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use uuid::Uuid;

const COMMAND_BUFFER: usize = 64;
const FEED_BUFFER: usize = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    RequestsChanged,
    RegistryChanged,
}

impl FeedEvent {
    pub const ALL: [Self; 2] = [Self::RequestsChanged, Self::RegistryChanged];

    ///name of the SSE event the pages listen for
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::RequestsChanged => "requests",
            Self::RegistryChanged => "registry",
        }
    }
}

type Reply<T> = oneshot::Sender<GateResult<T>>;

enum Command {
    Submit {
        submission: StudentSubmission,
        device: DeviceFingerprint,
        reply: Reply<LeaveRequest>,
    },
    Dispatch {
        dispatch: EmergencyDispatch,
        reply: Reply<LeaveRequest>,
    },
    Transition {
        id: Uuid,
        transition: Transition,
        actor: String,
        reply: Reply<LeaveRequest>,
    },
    ResetBinding {
        adm_no: String,
        reply: Reply<bool>,
    },
    AllRequests {
        reply: Reply<Vec<LeaveRequest>>,
    },
    RequestsForDevice {
        device: DeviceFingerprint,
        reply: Reply<Vec<LeaveRequest>>,
    },
    AllDevices {
        reply: Reply<Vec<DeviceRecord>>,
    },
}

#[derive(Clone, Debug)]
pub struct Gatehouse {
    commands: mpsc::Sender<Command>,
    feed: broadcast::Sender<FeedEvent>,
}

impl Gatehouse {
    pub fn spawn(store: Arc<dyn LeaveStore>) -> Self {
        let (commands, mut rx) = mpsc::channel(COMMAND_BUFFER);
        let (feed, _) = broadcast::channel(FEED_BUFFER);

        let worker = Worker {
            store,
            feed: feed.clone(),
        };
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                worker.handle(command).await;
            }
            info!("gatehouse stopped");
        });

        Self { commands, feed }
    }

    async fn ask<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> GateResult<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| GateError::GatehouseStopped)?;
        rx.await.map_err(|_| GateError::GatehouseStopped)?
    }

    pub async fn submit(
        &self,
        submission: StudentSubmission,
        device: DeviceFingerprint,
    ) -> GateResult<LeaveRequest> {
        self.ask(|reply| Command::Submit {
            submission,
            device,
            reply,
        })
        .await
    }

    pub async fn dispatch_emergency(&self, dispatch: EmergencyDispatch) -> GateResult<LeaveRequest> {
        self.ask(|reply| Command::Dispatch { dispatch, reply }).await
    }

    pub async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
        actor: impl Into<String>,
    ) -> GateResult<LeaveRequest> {
        let actor = actor.into();
        self.ask(|reply| Command::Transition {
            id,
            transition,
            actor,
            reply,
        })
        .await
    }

    pub async fn reset_binding(&self, adm_no: impl Into<String>) -> GateResult<bool> {
        let adm_no = adm_no.into();
        self.ask(|reply| Command::ResetBinding { adm_no, reply })
            .await
    }

    pub async fn all_requests(&self) -> GateResult<Vec<LeaveRequest>> {
        self.ask(|reply| Command::AllRequests { reply }).await
    }

    pub async fn requests_for_device(
        &self,
        device: DeviceFingerprint,
    ) -> GateResult<Vec<LeaveRequest>> {
        self.ask(|reply| Command::RequestsForDevice { device, reply })
            .await
    }

    pub async fn all_devices(&self) -> GateResult<Vec<DeviceRecord>> {
        self.ask(|reply| Command::AllDevices { reply }).await
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.feed.subscribe(),
        }
    }
}

/// A live view of gatehouse changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<FeedEvent>,
}

impl Subscription {
    #[cfg(test)]
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = FeedEvent> + Send + 'static {
        BroadcastStream::new(self.rx).flat_map(|event| {
            let events: &'static [FeedEvent] = match event {
                Ok(FeedEvent::RequestsChanged) => &[FeedEvent::RequestsChanged],
                Ok(FeedEvent::RegistryChanged) => &[FeedEvent::RegistryChanged],
                //missed something, so every page refreshes whatever it shows
                Err(BroadcastStreamRecvError::Lagged(_)) => &FeedEvent::ALL,
            };
            stream::iter(events.iter().copied())
        })
    }
}

struct Worker {
    store: Arc<dyn LeaveStore>,
    feed: broadcast::Sender<FeedEvent>,
}

impl Worker {
    fn publish(&self, event: FeedEvent) {
        //no subscribers is fine
        let _ = self.feed.send(event);
    }

    async fn handle(&self, command: Command) {
        //a caller that went away before the reply is not our problem
        match command {
            Command::Submit {
                submission,
                device,
                reply,
            } => {
                let _ = reply.send(self.submit(submission, device).await);
            }
            Command::Dispatch { dispatch, reply } => {
                let _ = reply.send(self.dispatch(dispatch).await);
            }
            Command::Transition {
                id,
                transition,
                actor,
                reply,
            } => {
                let _ = reply.send(self.transition(id, transition, &actor).await);
            }
            Command::ResetBinding { adm_no, reply } => {
                let _ = reply.send(self.reset_binding(&adm_no).await);
            }
            Command::AllRequests { reply } => {
                let _ = reply.send(self.store.all_requests().await);
            }
            Command::RequestsForDevice { device, reply } => {
                let _ = reply.send(self.store.requests_for_device(&device).await);
            }
            Command::AllDevices { reply } => {
                let _ = reply.send(self.store.all_devices().await);
            }
        }
    }

    async fn submit(
        &self,
        submission: StudentSubmission,
        device: DeviceFingerprint,
    ) -> GateResult<LeaveRequest> {
        let now = Timestamp::now();
        let request = LeaveRequest::from_submission(submission, device.clone(), now)?;

        if let Some(active) = self
            .store
            .requests_for_device(&device)
            .await?
            .into_iter()
            .find(|existing| existing.status.is_active())
        {
            warn!(%device, id = %active.id, "refused second active request");
            return ActiveRequestExistsSnafu {
                status: active.status,
            }
            .fail();
        }

        let adm_no = &request.student_adm_no;
        let by_adm_no = self.store.device_by_adm_no(adm_no).await?;
        let by_device = self.store.device_by_fingerprint(&device).await?;

        let (binding, is_new_binding) = match BindingCheck::evaluate(
            adm_no,
            &device,
            by_adm_no.as_ref(),
            by_device.as_ref(),
        ) {
            BindingCheck::StudentOnOtherDevice => {
                warn!(%adm_no, %device, "student is bound to another device");
                return DeviceBoundElsewhereSnafu {
                    adm_no: adm_no.clone(),
                }
                .fail();
            }
            BindingCheck::DeviceOwnedBy(bound_to) => {
                warn!(%adm_no, %device, %bound_to, "device is bound to another student");
                return DeviceClaimedSnafu { bound_to }.fail();
            }
            BindingCheck::New => (
                DeviceRecord {
                    adm_no: adm_no.clone(),
                    device_id: device.clone(),
                    registered_at: now,
                    last_used_at: now,
                },
                true,
            ),
            BindingCheck::Known => (
                DeviceRecord {
                    adm_no: adm_no.clone(),
                    device_id: device.clone(),
                    registered_at: by_adm_no.map_or(now, |existing| existing.registered_at),
                    last_used_at: now,
                },
                false,
            ),
        };

        self.store.record_request(&request, Some(&binding)).await?;
        info!(id = %request.id, %adm_no, %device, "leave request submitted");

        self.publish(FeedEvent::RequestsChanged);
        if is_new_binding {
            info!(%adm_no, %device, "device bound");
            self.publish(FeedEvent::RegistryChanged);
        }

        Ok(request)
    }

    async fn dispatch(&self, dispatch: EmergencyDispatch) -> GateResult<LeaveRequest> {
        let request = LeaveRequest::from_dispatch(dispatch, Timestamp::now())?;

        self.store.record_request(&request, None).await?;
        info!(id = %request.id, adm_no = %request.student_adm_no, "emergency dispatched");
        self.publish(FeedEvent::RequestsChanged);

        Ok(request)
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
        actor: &str,
    ) -> GateResult<LeaveRequest> {
        let mut request = self
            .store
            .get_request(id)
            .await?
            .context(MissingRequestSnafu { id })?;

        request.apply(transition, actor, Timestamp::now())?;
        self.store.update_request(&request).await?;
        info!(%id, ?transition, %actor, status = %request.status, "request moved");
        self.publish(FeedEvent::RequestsChanged);

        Ok(request)
    }

    async fn reset_binding(&self, adm_no: &str) -> GateResult<bool> {
        let removed = self.store.remove_device(adm_no).await?;
        if removed {
            info!(%adm_no, "device binding reset");
            self.publish(FeedEvent::RegistryChanged);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::leave_request::{LeaveType, RequestStatus},
        store::memory::MemoryLeaveStore,
    };

    fn gatehouse() -> (Gatehouse, Arc<MemoryLeaveStore>) {
        let store = Arc::new(MemoryLeaveStore::new());
        (Gatehouse::spawn(store.clone()), store)
    }

    fn submission(adm_no: &str) -> StudentSubmission {
        StudentSubmission {
            name: "Amani Otieno".into(),
            adm_no: adm_no.into(),
            class: "Form 3B".into(),
            reason: "Dentist appointment".into(),
            expected_return_at: Timestamp::now() + jiff::SignedDuration::from_hours(4),
        }
    }

    fn dispatch(adm_no: &str) -> EmergencyDispatch {
        EmergencyDispatch {
            name: "Baraka Njoroge".into(),
            adm_no: adm_no.into(),
            class: "Form 1A".into(),
            condition: "High fever".into(),
        }
    }

    #[tokio::test]
    async fn first_submission_binds_the_device() {
        let (gatehouse, _) = gatehouse();

        let request = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.leave_type, LeaveType::Normal);

        let devices = gatehouse.all_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].adm_no, "102");
        assert_eq!(devices[0].device_id.as_str(), "DEV-A");
    }

    #[tokio::test]
    async fn student_on_a_second_device_is_refused_without_writes() {
        let (gatehouse, _) = gatehouse();
        let first = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();
        gatehouse
            .transition(first.id, Transition::Reject, "teacher1")
            .await
            .unwrap();
        let devices_before = gatehouse.all_devices().await.unwrap();

        let err = gatehouse
            .submit(submission("102"), "DEV-B".into())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Security Violation: Student 102 is bound to a different device."
        );

        assert_eq!(gatehouse.all_requests().await.unwrap().len(), 1);
        assert_eq!(gatehouse.all_devices().await.unwrap(), devices_before);
    }

    #[tokio::test]
    async fn device_owned_by_another_student_is_refused() {
        let (gatehouse, _) = gatehouse();
        let first = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();
        gatehouse
            .transition(first.id, Transition::Reject, "teacher1")
            .await
            .unwrap();

        let err = gatehouse
            .submit(submission("205"), "DEV-A".into())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Hardware Conflict: This device is bound to ADM: 102."
        );
        assert_eq!(gatehouse.all_devices().await.unwrap().len(), 1);
        assert_eq!(gatehouse.all_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn returning_student_refreshes_the_binding() {
        let (gatehouse, _) = gatehouse();
        let first = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();
        let registered = gatehouse.all_devices().await.unwrap()[0].clone();
        gatehouse
            .transition(first.id, Transition::Reject, "teacher1")
            .await
            .unwrap();

        gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();

        let devices = gatehouse.all_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].registered_at, registered.registered_at);
        assert!(devices[0].last_used_at >= registered.last_used_at);
    }

    #[tokio::test]
    async fn active_request_blocks_a_second_one() {
        let (gatehouse, _) = gatehouse();
        gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();

        let err = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::ActiveRequestExists {
                status: RequestStatus::Pending
            }
        ));
        assert_eq!(gatehouse.all_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_fields_write_nothing() {
        let (gatehouse, _) = gatehouse();
        let mut blank = submission("102");
        blank.reason = "   ".into();

        let err = gatehouse.submit(blank, "DEV-A".into()).await.unwrap_err();
        assert!(matches!(err, GateError::EmptyField { field: "reason" }));
        assert!(gatehouse.all_requests().await.unwrap().is_empty());
        assert!(gatehouse.all_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn emergency_dispatch_is_visible_and_announced() {
        let (gatehouse, _) = gatehouse();
        let mut subscription = gatehouse.subscribe();

        let request = gatehouse.dispatch_emergency(dispatch("330")).await.unwrap();
        assert_eq!(subscription.recv().await, Some(FeedEvent::RequestsChanged));

        let all = gatehouse.all_requests().await.unwrap();
        assert_eq!(all, vec![request.clone()]);
        assert_eq!(request.leave_type, LeaveType::Emergency);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.reason, "MEDICAL URGENCY: High fever");
        assert!(request.device_fingerprint.is_none());
        assert!(gatehouse.all_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_lifecycle_stamps_each_step() {
        let (gatehouse, _) = gatehouse();
        let request = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();

        gatehouse
            .transition(request.id, Transition::Approve, "teacher1")
            .await
            .unwrap();
        let exited = gatehouse
            .transition(request.id, Transition::ConfirmExit, "sec1")
            .await
            .unwrap();
        assert_eq!(exited.status, RequestStatus::Exited);
        assert!(exited.exited_at.is_some());
        assert_eq!(exited.exited_confirmed_by.as_deref(), Some("sec1"));

        let returned = gatehouse
            .transition(request.id, Transition::ConfirmReturn, "teacher1")
            .await
            .unwrap();
        assert_eq!(returned.status, RequestStatus::Returned);
        assert!(returned.returned_at.is_some());
        assert_eq!(returned.returned_confirmed_by.as_deref(), Some("teacher1"));

        let mine = gatehouse
            .requests_for_device("DEV-A".into())
            .await
            .unwrap();
        assert_eq!(mine, vec![returned]);
    }

    #[tokio::test]
    async fn illegal_transition_leaves_the_record_alone() {
        let (gatehouse, _) = gatehouse();
        let request = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();

        let err = gatehouse
            .transition(request.id, Transition::ConfirmExit, "sec1")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidTransition { .. }));

        let stored = gatehouse.all_requests().await.unwrap();
        assert_eq!(stored, vec![request]);
    }

    #[tokio::test]
    async fn unknown_request_is_missing() {
        let (gatehouse, _) = gatehouse();
        let err = gatehouse
            .transition(Uuid::new_v4(), Transition::Approve, "teacher1")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::MissingRequest { .. }));
    }

    #[tokio::test]
    async fn racing_approvals_have_one_winner() {
        let (gatehouse, _) = gatehouse();
        let request = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            gatehouse.transition(request.id, Transition::Approve, "teacher1"),
            gatehouse.transition(request.id, Transition::Reject, "admin1"),
        );
        assert_ne!(a.is_ok(), b.is_ok());
        let loser = a.err().or(b.err()).unwrap();
        assert!(matches!(loser, GateError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn reset_binding_frees_the_student() {
        let (gatehouse, _) = gatehouse();
        let first = gatehouse
            .submit(submission("102"), "DEV-A".into())
            .await
            .unwrap();
        gatehouse
            .transition(first.id, Transition::Reject, "teacher1")
            .await
            .unwrap();

        let mut subscription = gatehouse.subscribe();
        assert!(gatehouse.reset_binding("102").await.unwrap());
        assert_eq!(subscription.recv().await, Some(FeedEvent::RegistryChanged));
        assert!(!gatehouse.reset_binding("102").await.unwrap());

        gatehouse
            .submit(submission("102"), "DEV-B".into())
            .await
            .unwrap();
        let devices = gatehouse.all_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_id.as_str(), "DEV-B");
    }

    #[tokio::test]
    async fn preloaded_registry_is_respected() {
        let store = Arc::new(MemoryLeaveStore::with_devices([DeviceRecord {
            adm_no: "102".into(),
            device_id: "DEV-A".into(),
            registered_at: Timestamp::UNIX_EPOCH,
            last_used_at: Timestamp::UNIX_EPOCH,
        }]));
        let gatehouse = Gatehouse::spawn(store);

        assert!(matches!(
            gatehouse
                .submit(submission("102"), "DEV-B".into())
                .await
                .unwrap_err(),
            GateError::DeviceBoundElsewhere { .. }
        ));
    }

    #[tokio::test]
    async fn lagging_stream_refreshes_every_fragment() {
        let (tx, rx) = broadcast::channel(1);
        tx.send(FeedEvent::RequestsChanged).unwrap();
        tx.send(FeedEvent::RequestsChanged).unwrap();
        tx.send(FeedEvent::RegistryChanged).unwrap();
        drop(tx);

        let events: Vec<FeedEvent> = Subscription { rx }.into_stream().collect().await;
        assert_eq!(
            events,
            vec![
                FeedEvent::RequestsChanged,
                FeedEvent::RegistryChanged,
                FeedEvent::RegistryChanged,
            ]
        );
    }

    #[tokio::test]
    async fn stream_passes_events_through_in_order() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(FeedEvent::RegistryChanged).unwrap();
        tx.send(FeedEvent::RequestsChanged).unwrap();
        drop(tx);

        let events: Vec<FeedEvent> = Subscription { rx }.into_stream().collect().await;
        assert_eq!(
            events,
            vec![FeedEvent::RegistryChanged, FeedEvent::RequestsChanged]
        );
    }
}

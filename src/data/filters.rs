use crate::{
    data::leave_request::{LeaveRequest, LeaveType, RequestStatus},
    error::GateResult,
};
use serde::Deserialize;
use std::{collections::BTreeSet, str::FromStr};

///sentinel select value meaning "don't filter on this"
pub const ALL: &str = "ALL";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LeaveStats {
    pub pending: usize,
    pub exited: usize,
    pub returned: usize,
    pub emergency: usize,
}

impl LeaveStats {
    pub fn from_requests(requests: &[LeaveRequest]) -> Self {
        requests.iter().fold(Self::default(), |mut stats, request| {
            match request.status {
                RequestStatus::Pending => stats.pending += 1,
                RequestStatus::Exited => stats.exited += 1,
                RequestStatus::Returned => stats.returned += 1,
                RequestStatus::Approved | RequestStatus::Rejected => {}
            }
            if request.leave_type == LeaveType::Emergency {
                stats.emergency += 1;
            }
            stats
        })
    }
}

/// Raw query string from the admin filter bar.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestFilterQuery {
    pub status: String,
    pub leave_type: String,
    pub class: String,
    pub search: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub leave_type: Option<LeaveType>,
    pub class: Option<String>,
    ///already trimmed and lowercased
    pub search: String,
}

fn all_or<T: FromStr>(value: &str) -> Result<Option<T>, T::Err> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

impl TryFrom<RequestFilterQuery> for RequestFilter {
    type Error = crate::error::GateError;

    fn try_from(query: RequestFilterQuery) -> GateResult<Self> {
        Ok(Self {
            status: all_or(&query.status)?,
            leave_type: all_or(&query.leave_type)?,
            class: all_or::<String>(&query.class).unwrap_or_default(),
            search: query.search.trim().to_lowercase(),
        })
    }
}

fn matches_search(request: &LeaveRequest, search: &str) -> bool {
    search.is_empty()
        || request.student_name.to_lowercase().contains(search)
        || request.student_adm_no.contains(search)
        || request.reason.to_lowercase().contains(search)
}

impl RequestFilter {
    pub fn matches(&self, request: &LeaveRequest) -> bool {
        self.status.is_none_or(|status| request.status == status)
            && self
                .leave_type
                .is_none_or(|leave_type| request.leave_type == leave_type)
            && self
                .class
                .as_ref()
                .is_none_or(|class| &request.student_class == class)
            && matches_search(request, &self.search)
    }

    pub fn apply<'a>(&self, requests: &'a [LeaveRequest]) -> Vec<&'a LeaveRequest> {
        requests
            .iter()
            .filter(|request| self.matches(request))
            .collect()
    }
}

///every class seen in the requests, sorted
pub fn unique_classes(requests: &[LeaveRequest]) -> Vec<String> {
    requests
        .iter()
        .map(|request| request.student_class.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// What a teacher has to act on: pending decisions, then students waiting to be signed back in.
pub fn teacher_queue(requests: &[LeaveRequest]) -> (Vec<&LeaveRequest>, Vec<&LeaveRequest>) {
    let pending = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Pending)
        .collect();
    let off_campus = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Exited)
        .collect();
    (pending, off_campus)
}

/// Approved requests the guard might be looking for.
pub fn gate_list<'a>(requests: &'a [LeaveRequest], search: &str) -> Vec<&'a LeaveRequest> {
    let search = search.trim().to_lowercase();
    requests
        .iter()
        .filter(|request| request.status == RequestStatus::Approved)
        .filter(|request| {
            request.student_name.to_lowercase().contains(&search)
                || request.student_adm_no.contains(&search)
        })
        .collect()
}

/// Splits a device's requests into the one still in flight (if any) and the rest.
pub fn split_active(requests: &[LeaveRequest]) -> (Option<&LeaveRequest>, Vec<&LeaveRequest>) {
    let active = requests.iter().find(|request| request.status.is_active());
    let history = requests
        .iter()
        .filter(|request| active.is_none_or(|active| active.id != request.id))
        .collect();
    (active, history)
}

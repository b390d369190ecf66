use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pseudo-identity for a student's browser, e.g. `DEV-3F9A01C2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(format!("DEV-{}", simple[..8].to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceFingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DeviceFingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub adm_no: String,
    pub device_id: DeviceFingerprint,
    pub registered_at: Timestamp,
    pub last_used_at: Timestamp,
}

/// Outcome of checking a submission against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingCheck {
    ///neither side is bound yet
    New,
    ///admission number and device are already bound to each other
    Known,
    StudentOnOtherDevice,
    DeviceOwnedBy(String),
}

impl BindingCheck {
    /// `by_adm_no` is the registry entry for the submitted admission number,
    /// `by_device` the entry holding the submitting device.
    pub fn evaluate(
        adm_no: &str,
        device: &DeviceFingerprint,
        by_adm_no: Option<&DeviceRecord>,
        by_device: Option<&DeviceRecord>,
    ) -> Self {
        if let Some(existing) = by_adm_no {
            if &existing.device_id != device {
                return Self::StudentOnOtherDevice;
            }
        }

        if let Some(existing) = by_device {
            if existing.adm_no != adm_no {
                return Self::DeviceOwnedBy(existing.adm_no.clone());
            }
        }

        if by_adm_no.is_some() {
            Self::Known
        } else {
            Self::New
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(adm_no: &str, device: &str) -> DeviceRecord {
        DeviceRecord {
            adm_no: adm_no.into(),
            device_id: device.into(),
            registered_at: Timestamp::UNIX_EPOCH,
            last_used_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn generated_fingerprints_look_right() {
        let fp = DeviceFingerprint::generate();
        let (prefix, rest) = fp.as_str().split_at(4);
        assert_eq!(prefix, "DEV-");
        assert_eq!(rest.len(), 8);
        assert!(rest.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(fp, DeviceFingerprint::generate());
    }

    #[test]
    fn empty_registry_is_new() {
        let check = BindingCheck::evaluate("102", &"DEV-A".into(), None, None);
        assert_eq!(check, BindingCheck::New);
    }

    #[test]
    fn same_pair_is_known() {
        let existing = record("102", "DEV-A");
        let check =
            BindingCheck::evaluate("102", &"DEV-A".into(), Some(&existing), Some(&existing));
        assert_eq!(check, BindingCheck::Known);
    }

    #[test]
    fn student_on_a_new_device_is_refused() {
        let existing = record("102", "DEV-A");
        let check = BindingCheck::evaluate("102", &"DEV-B".into(), Some(&existing), None);
        assert_eq!(check, BindingCheck::StudentOnOtherDevice);
    }

    #[test]
    fn device_reused_for_another_student_is_refused() {
        let existing = record("102", "DEV-A");
        let check = BindingCheck::evaluate("205", &"DEV-A".into(), None, Some(&existing));
        assert_eq!(check, BindingCheck::DeviceOwnedBy("102".into()));
    }
}

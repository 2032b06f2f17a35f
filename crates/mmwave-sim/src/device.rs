//! Remote device identity
//!
//! Measurements are keyed by a stable opaque [`DeviceId`] rather than by a
//! handle to the device itself, so the measurement table never keeps a device
//! alive. The host resolves ids through its own registry; [`DeviceRegistry`]
//! is a minimal one for scenarios and tests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, comparable identifier of a remote network device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// Role of a device in the access procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// Base station sweeping SS blocks
    Gnb,
    /// User equipment scanning for base stations
    Ue,
}

/// Device information held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub label: String,
    pub role: DeviceRole,
}

/// Allocates device ids and resolves them back to device information.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, DeviceInfo>,
    next_id: u64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and return its id.
    pub fn register(&mut self, label: impl Into<String>, role: DeviceRole) -> DeviceId {
        let id = DeviceId(self.next_id);
        self.next_id += 1;
        self.devices.insert(
            id,
            DeviceInfo {
                id,
                label: label.into(),
                role,
            },
        );
        id
    }

    /// Forget a device. Ids are never reused.
    pub fn remove(&mut self, id: DeviceId) -> Option<DeviceInfo> {
        self.devices.remove(&id)
    }

    pub fn get(&self, id: DeviceId) -> Option<&DeviceInfo> {
        self.devices.get(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices with the given role, in registration order.
    pub fn with_role(&self, role: DeviceRole) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.values().filter(move |d| d.role == role)
    }
}

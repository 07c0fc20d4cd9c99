//! Remote resource lifecycle manager.
//!
//! [`ImageFactory`] creates, attaches, detaches, snapshots, registers-as-image,
//! and destroys block-storage resources through an injected [`CloudApi`]
//! client, polling the provider for asynchronous state transitions and rolling
//! back partially-created volumes on failure.
//!
//! One logical thread of control per invocation: every operation blocks the
//! calling task, including the polling waits. Invocations against distinct
//! resource identifiers may run concurrently; invocations against the same
//! identifier must be serialized by the caller (see
//! [`ImageFactory::allocate_device`]).

use std::time::Duration;

use crate::api::{CloudApi, Labels};

mod device;
mod error;
mod find;
mod image;
mod sweep;
mod tag;
mod volume_create;
mod volume_detach;
mod wait;

pub use device::DeviceRange;
pub use error::FactoryError;
pub use sweep::SweepSummary;

const POLL_INTERVAL: Duration = Duration::from_millis(1500);
const WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Parameters for creating and attaching a build volume.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeSpec {
    /// Instance that receives the new volume.
    pub instance_id: String,
    /// Volume size in GiB.
    pub size_gib: u32,
    /// Placement location (subregion) for the volume.
    pub location: String,
    /// Labels applied to the volume once it is available.
    pub labels: Labels,
}

/// Outcome of a successful volume creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachedVolume {
    /// Identifier of the created volume.
    pub volume_id: String,
    /// Device name under which the volume is attached.
    pub device: String,
}

/// Parameters for turning a detached volume into a machine image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageSpec {
    /// Image name, unique per account.
    pub name: String,
    /// Identifier of the detached source volume.
    pub volume_id: String,
    /// CPU architecture tag recorded on the image.
    pub architecture: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Labels applied to both the snapshot and the image.
    pub labels: Labels,
    /// Root device path recorded in the image's block-device mapping.
    pub root_device: String,
}

/// Outcome of a successful image registration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisteredImage {
    /// Identifier of the registered image.
    pub image_id: String,
    /// Identifier of the snapshot backing the image.
    pub snapshot_id: String,
}

/// Lifecycle manager for volumes, snapshots, and images.
#[derive(Clone, Debug)]
pub struct ImageFactory<C> {
    api: C,
    poll_interval: Duration,
    wait_timeout: Duration,
    device_range: DeviceRange,
}

impl<C: CloudApi> ImageFactory<C> {
    /// Constructs a lifecycle manager around a cloud API client with the
    /// default polling bounds (1.5 s interval, 600 s wait) and device span.
    pub fn new(api: C) -> Self {
        Self {
            api,
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
            device_range: DeviceRange::default(),
        }
    }

    /// Overrides the interval between state polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the maximum time spent waiting for a state transition.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Overrides the device name span used by the allocator.
    #[must_use]
    pub fn with_device_range(mut self, range: DeviceRange) -> Self {
        self.device_range = range;
        self
    }
}

#[cfg(test)]
mod tests;

//! Cloud API client abstraction and the block-storage resource model.
//!
//! The lifecycle manager never talks to the provider directly; it goes
//! through the [`CloudApi`] trait so that tests can substitute a scripted
//! fake and so that the thin HTTP client stays replaceable.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Key/value labels applied to provider resources. Keys are unique and
/// iteration order is deterministic.
pub type Labels = BTreeMap<String, String>;

/// Provider lifecycle state of a block-storage volume.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VolumeState {
    /// The provider is still provisioning the volume.
    Creating,
    /// The volume exists and is not attached to an instance.
    Available,
    /// The volume is attached to an instance.
    InUse,
    /// The provider is deleting the volume.
    Deleting,
    /// The provider reported the volume as failed.
    Error,
}

impl VolumeState {
    /// Returns the provider wire representation of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Available => "available",
            Self::InUse => "in-use",
            Self::Deleting => "deleting",
            Self::Error => "error",
        }
    }

    /// Parses a provider state string, returning `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "creating" => Some(Self::Creating),
            "available" => Some(Self::Available),
            "in-use" => Some(Self::InUse),
            "deleting" => Some(Self::Deleting),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a point-in-time snapshot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SnapshotStatus {
    /// The snapshot is still being captured.
    Pending,
    /// The snapshot is durable and usable as an image backing store.
    Completed,
    /// The provider reported the snapshot as failed.
    Error,
}

impl SnapshotStatus {
    /// Returns the provider wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Parses a provider status string, returning `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" | "in-queue" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote block-storage volume as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Volume {
    /// Provider-assigned volume identifier.
    pub id: String,
    /// Capacity in GiB.
    pub size_gib: u32,
    /// Placement location (subregion) of the volume.
    pub location: String,
    /// Current lifecycle state.
    pub state: VolumeState,
    /// Instance the volume is attached to, when attached.
    pub instance_id: Option<String>,
    /// Device name exposed inside the instance, set only while attached.
    pub device: Option<String>,
    /// Labels applied to the volume.
    pub labels: Labels,
}

impl Volume {
    /// Returns `true` when the volume is attached to an instance.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.device.is_some()
    }
}

/// A point-in-time copy of a volume's contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    /// Provider-assigned snapshot identifier.
    pub id: String,
    /// Identifier of the source volume.
    pub volume_id: String,
    /// Current capture status.
    pub status: SnapshotStatus,
    /// Labels applied to the snapshot.
    pub labels: Labels,
}

/// Filter for volume lookups. Whichever fields are set are applied together.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VolumeFilter {
    /// Match a specific volume identifier.
    pub volume_id: Option<String>,
    /// Match volumes attached to a specific instance.
    pub instance_id: Option<String>,
    /// Match volumes carrying a specific label, as a `(key, value)` pair.
    pub label: Option<(String, String)>,
}

impl VolumeFilter {
    /// Builds a filter matching a single volume identifier.
    #[must_use]
    pub fn by_id(volume_id: impl Into<String>) -> Self {
        Self {
            volume_id: Some(volume_id.into()),
            ..Self::default()
        }
    }

    /// Builds a filter matching volumes attached to an instance.
    #[must_use]
    pub fn by_instance(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: Some(instance_id.into()),
            ..Self::default()
        }
    }

    /// Builds a filter matching volumes labelled `key=value`.
    #[must_use]
    pub fn by_label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: Some((key.into(), value.into())),
            ..Self::default()
        }
    }
}

impl fmt::Display for VolumeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self
            .label
            .as_ref()
            .map_or_else(|| String::from("-"), |(key, value)| format!("{key}={value}"));
        write!(
            f,
            "volume_id={} instance_id={} label={}",
            self.volume_id.as_deref().unwrap_or("-"),
            self.instance_id.as_deref().unwrap_or("-"),
            label
        )
    }
}

/// Parameters for registering a machine image from a completed snapshot.
///
/// The root-device mapping supports exactly one entry: `root_device` backed
/// by `snapshot_id`. Multi-volume images are out of scope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterImageRequest {
    /// Image name, unique per account.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// CPU architecture tag (for example `x86_64`).
    pub architecture: String,
    /// Root device path (for example `/dev/sda1`).
    pub root_device: String,
    /// Identifier of the completed snapshot backing the root device.
    pub snapshot_id: String,
}

/// Failure surfaced by the cloud API client. Client- and server-side errors
/// are treated identically as immediate operation failure.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("provider error: {message}")]
pub struct ProviderError {
    /// Message reported by the provider or the transport.
    pub message: String,
}

impl ProviderError {
    /// Wraps a provider or transport failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Future returned by cloud API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Region-scoped cloud API handle used by the lifecycle manager.
pub trait CloudApi: Send + Sync {
    /// Lists volumes matching the filter. An empty result is not an error at
    /// this layer.
    fn list_volumes<'a>(&'a self, filter: &'a VolumeFilter) -> ApiFuture<'a, Vec<Volume>>;

    /// Creates a volume of the given size in the given location.
    fn create_volume<'a>(&'a self, size_gib: u32, location: &'a str) -> ApiFuture<'a, Volume>;

    /// Deletes a volume. The volume must be unattached.
    fn delete_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()>;

    /// Attaches a volume to an instance under the given device name.
    fn attach_volume<'a>(
        &'a self,
        volume_id: &'a str,
        instance_id: &'a str,
        device: &'a str,
    ) -> ApiFuture<'a, ()>;

    /// Detaches a volume from whichever instance it is attached to.
    fn detach_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()>;

    /// Creates a snapshot of a volume with the given description.
    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        description: &'a str,
    ) -> ApiFuture<'a, Snapshot>;

    /// Refreshes the observable status of a snapshot.
    fn read_snapshot<'a>(&'a self, snapshot_id: &'a str) -> ApiFuture<'a, Snapshot>;

    /// Registers a machine image and returns its identifier.
    fn register_image<'a>(&'a self, request: &'a RegisterImageRequest) -> ApiFuture<'a, String>;

    /// Applies labels to a resource in one batched call.
    fn create_tags<'a>(&'a self, resource_id: &'a str, labels: &'a Labels) -> ApiFuture<'a, ()>;
}

//! Error types for the lifecycle manager.

use thiserror::Error;

use crate::api::{ProviderError, VolumeFilter};

/// Errors raised by lifecycle operations.
///
/// Provider failures are wrapped transparently; everything else carries the
/// identifiers needed to diagnose the failing step without replaying it.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FactoryError {
    /// Raised when a resource does not reach the target state within the
    /// bounded wait.
    #[error("timeout waiting for {resource_id} to reach state {target}")]
    Timeout {
        /// Identifier of the resource being polled.
        resource_id: String,
        /// State that was never observed.
        target: String,
    },
    /// Raised when a volume lookup matches no resources.
    #[error("no volumes matched filter ({filter})")]
    NotFound {
        /// Filter that produced the empty result.
        filter: VolumeFilter,
    },
    /// Raised when every device name in the configured span is taken.
    #[error("no free device names in {prefix}{first}..{prefix}{last}")]
    DeviceExhausted {
        /// Device name prefix (for example `/dev/sd`).
        prefix: String,
        /// First letter of the scanned span.
        first: char,
        /// Last letter of the scanned span.
        last: char,
    },
    /// Raised when detaching a volume that is already unattached. Succeeding
    /// silently here could mask a caller bug expecting an attached volume.
    #[error("volume {volume_id} is already detached")]
    AlreadyDetached {
        /// Identifier of the unattached volume.
        volume_id: String,
    },
    /// Failure surfaced by the cloud API client.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

//! Device name allocation for volume attachment.

use std::collections::BTreeSet;

use crate::api::{CloudApi, VolumeFilter};

use super::{FactoryError, ImageFactory};

/// Span of device names scanned by the allocator: `<prefix><letter>` for each
/// letter from `first` to `last` inclusive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceRange {
    /// Device name prefix (for example `/dev/sd`).
    pub prefix: String,
    /// First letter of the span.
    pub first: char,
    /// Last letter of the span.
    pub last: char,
}

impl Default for DeviceRange {
    /// `/dev/sdb` through `/dev/sdz`, leaving `a` to the root device.
    fn default() -> Self {
        Self {
            prefix: String::from("/dev/sd"),
            first: 'b',
            last: 'z',
        }
    }
}

/// Returns the first device name in `range` absent from `used`.
pub(crate) fn first_free_device(
    range: &DeviceRange,
    used: &BTreeSet<String>,
) -> Result<String, FactoryError> {
    for letter in range.first..=range.last {
        let candidate = format!("{}{letter}", range.prefix);
        if !used.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(FactoryError::DeviceExhausted {
        prefix: range.prefix.clone(),
        first: range.first,
        last: range.last,
    })
}

impl<C: CloudApi> ImageFactory<C> {
    /// Computes the next free device name for `instance_id`, excluding the
    /// instance's currently attached devices and the caller's blacklist.
    ///
    /// A failed attachment lookup is deliberately tolerated and treated as
    /// "no attached volumes", so a transient provider hiccup never blocks
    /// allocation. The name is not reserved; callers must serialize
    /// allocations against the same instance.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::DeviceExhausted`] when every name in the
    /// configured span is taken.
    pub async fn allocate_device(
        &self,
        instance_id: &str,
        blacklist: &BTreeSet<String>,
    ) -> Result<String, FactoryError> {
        let attached = match self
            .find_volumes(&VolumeFilter::by_instance(instance_id))
            .await
        {
            Ok(volumes) => volumes,
            Err(lookup_err) => {
                tracing::warn!(
                    %instance_id,
                    error = %lookup_err,
                    "attachment lookup failed; assuming no attached volumes"
                );
                Vec::new()
            }
        };

        let mut used: BTreeSet<String> = attached
            .into_iter()
            .filter_map(|volume| volume.device)
            .collect();
        used.extend(blacklist.iter().cloned());

        first_free_device(&self.device_range, &used)
    }
}

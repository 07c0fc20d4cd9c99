//! Volume creation and the failure cleanup cascade.

use std::collections::BTreeSet;

use crate::api::{CloudApi, VolumeState};

use super::{AttachedVolume, FactoryError, ImageFactory, VolumeSpec};

impl<C: CloudApi> ImageFactory<C> {
    /// Creates a volume and attaches it to the instance named in `spec`.
    ///
    /// Sequence: create, wait for `available`, tag, allocate a device name,
    /// attach, wait for `available` again (post-attach settle). If any step
    /// fails after the provider has assigned a volume identifier, the
    /// partially-created volume is destroyed before the original error is
    /// returned; no usable resource remains on failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step: [`FactoryError::Timeout`]
    /// when a wait elapses, [`FactoryError::DeviceExhausted`] when no device
    /// name is free, or [`FactoryError::Provider`] for client failures.
    pub async fn create_volume(&self, spec: &VolumeSpec) -> Result<AttachedVolume, FactoryError> {
        tracing::info!(
            instance_id = %spec.instance_id,
            size_gib = spec.size_gib,
            location = %spec.location,
            "creating volume"
        );
        let volume = self
            .api
            .create_volume(spec.size_gib, &spec.location)
            .await?;
        let volume_id = volume.id;

        match self.provision_attached(&volume_id, spec).await {
            Ok(device) => Ok(AttachedVolume { volume_id, device }),
            Err(step_err) => {
                tracing::error!(
                    %volume_id,
                    instance_id = %spec.instance_id,
                    error = %step_err,
                    "could not attach new volume"
                );
                self.cleanup_partial_volume(&volume_id).await;
                Err(step_err)
            }
        }
    }

    async fn provision_attached(
        &self,
        volume_id: &str,
        spec: &VolumeSpec,
    ) -> Result<String, FactoryError> {
        self.wait_for_volume_state(volume_id, VolumeState::Available)
            .await?;
        self.apply_tags(volume_id, &spec.labels).await?;

        tracing::info!(%volume_id, "allocating device name");
        let device = self
            .allocate_device(&spec.instance_id, &BTreeSet::new())
            .await?;

        tracing::info!(%volume_id, instance_id = %spec.instance_id, %device, "attaching volume");
        self.api
            .attach_volume(volume_id, &spec.instance_id, &device)
            .await?;
        // Post-attach settle: the provider reports the volume available again
        // once the attachment has registered.
        self.wait_for_volume_state(volume_id, VolumeState::Available)
            .await?;

        Ok(device)
    }

    /// Tears down a partially-created volume. A cleanup failure is reported
    /// on the logging stream only; the triggering error is what the caller
    /// ultimately sees.
    async fn cleanup_partial_volume(&self, volume_id: &str) {
        if let Err(cleanup_err) = self.destroy_volume(volume_id).await {
            tracing::error!(
                %volume_id,
                error = %cleanup_err,
                "could not clean up volume after failed creation"
            );
        }
    }
}

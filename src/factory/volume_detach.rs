//! Volume detachment and destruction.

use crate::api::{CloudApi, VolumeState};

use super::{FactoryError, ImageFactory};

impl<C: CloudApi> ImageFactory<C> {
    /// Detaches a volume and waits until it is unattached.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::AlreadyDetached`] when the volume is already
    /// in the unattached state; detach is deliberately not idempotent.
    /// Returns [`FactoryError::NotFound`] when the volume does not exist and
    /// [`FactoryError::Timeout`] when it never settles.
    pub async fn detach_volume(&self, volume_id: &str) -> Result<(), FactoryError> {
        let volume = self.find_volume(volume_id).await?;
        if volume.state == VolumeState::Available {
            tracing::error!(%volume_id, "volume appears to be already detached");
            return Err(FactoryError::AlreadyDetached {
                volume_id: volume_id.to_owned(),
            });
        }

        tracing::info!(%volume_id, "detaching volume");
        self.api.detach_volume(volume_id).await?;
        self.wait_for_volume_state(volume_id, VolumeState::Available)
            .await
    }

    /// Destroys a volume, detaching it first when it is still attached.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::NotFound`] when the volume does not exist; a
    /// missing volume is reported, never treated as success.
    pub async fn destroy_volume(&self, volume_id: &str) -> Result<(), FactoryError> {
        let volume = self.find_volume(volume_id).await?;
        if volume.state != VolumeState::Available {
            tracing::info!(%volume_id, "detaching volume before destroying");
            self.api.detach_volume(volume_id).await?;
            self.wait_for_volume_state(volume_id, VolumeState::Available)
                .await?;
        }

        tracing::info!(%volume_id, "destroying volume");
        self.api.delete_volume(volume_id).await?;
        Ok(())
    }
}

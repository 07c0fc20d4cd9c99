//! Machine image registration from a build volume.

use crate::api::{CloudApi, RegisterImageRequest, SnapshotStatus};

use super::{FactoryError, ImageFactory, ImageSpec, RegisteredImage};

impl<C: CloudApi> ImageFactory<C> {
    /// Snapshots a detached volume and registers a machine image backed by
    /// that snapshot.
    ///
    /// The caller must have detached the volume beforehand; this operation
    /// does not detach on the caller's behalf. Sequence: find volume, create
    /// snapshot, wait for `completed`, tag snapshot, register the image with
    /// a single-entry root-device mapping, tag image. A completed snapshot is
    /// never rolled back on later failure: it remains independently useful.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::NotFound`] when the source volume does not
    /// exist, [`FactoryError::Timeout`] when the snapshot never completes,
    /// or [`FactoryError::Provider`] for client failures.
    pub async fn create_image(&self, spec: &ImageSpec) -> Result<RegisteredImage, FactoryError> {
        let volume = self.find_volume(&spec.volume_id).await?;

        tracing::info!(volume_id = %volume.id, image_name = %spec.name, "creating snapshot");
        let description = format!(
            "Backing image '{}' created from volume {}",
            spec.name, volume.id
        );
        let snapshot = self.api.create_snapshot(&volume.id, &description).await?;
        self.wait_for_snapshot_status(&snapshot.id, SnapshotStatus::Completed)
            .await?;
        self.apply_tags(&snapshot.id, &spec.labels).await?;

        tracing::info!(
            snapshot_id = %snapshot.id,
            root_device = %spec.root_device,
            "registering image from snapshot"
        );
        let request = RegisterImageRequest {
            name: spec.name.clone(),
            description: spec.description.clone(),
            architecture: spec.architecture.clone(),
            root_device: spec.root_device.clone(),
            snapshot_id: snapshot.id.clone(),
        };
        let image_id = self.api.register_image(&request).await?;
        self.apply_tags(&image_id, &spec.labels).await?;

        Ok(RegisteredImage {
            image_id,
            snapshot_id: snapshot.id,
        })
    }
}

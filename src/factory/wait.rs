//! Bounded polling for asynchronous provider state transitions.
//!
//! The provider exposes no event stream, so each wait refreshes the
//! resource's observable state, sleeps between polls, and fails with
//! [`FactoryError::Timeout`] once the bound elapses. A resource that is never
//! observed at all also surfaces as a timeout; only a refresh call that
//! itself errors propagates immediately.

use std::time::Instant;

use tokio::time::sleep;

use crate::api::{CloudApi, SnapshotStatus, Volume, VolumeFilter, VolumeState};

use super::{FactoryError, ImageFactory};

impl<C: CloudApi> ImageFactory<C> {
    pub(crate) async fn fetch_volume(
        &self,
        volume_id: &str,
    ) -> Result<Option<Volume>, FactoryError> {
        // First match, same selection rule as find_volume.
        let volumes = self
            .api
            .list_volumes(&VolumeFilter::by_id(volume_id))
            .await?;
        Ok(volumes.into_iter().next())
    }

    pub(crate) async fn wait_for_volume_state(
        &self,
        volume_id: &str,
        target: VolumeState,
    ) -> Result<(), FactoryError> {
        let deadline = Instant::now() + self.wait_timeout;
        tracing::info!(%volume_id, %target, "waiting for volume state");
        loop {
            if let Some(volume) = self.fetch_volume(volume_id).await? {
                tracing::debug!(%volume_id, state = %volume.state, "polled volume");
                if volume.state == target {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(FactoryError::Timeout {
                    resource_id: volume_id.to_owned(),
                    target: target.to_string(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    pub(crate) async fn wait_for_snapshot_status(
        &self,
        snapshot_id: &str,
        target: SnapshotStatus,
    ) -> Result<(), FactoryError> {
        let deadline = Instant::now() + self.wait_timeout;
        tracing::info!(%snapshot_id, %target, "waiting for snapshot status");
        loop {
            let snapshot = self.api.read_snapshot(snapshot_id).await?;
            tracing::debug!(%snapshot_id, status = %snapshot.status, "polled snapshot");
            if snapshot.status == target {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(FactoryError::Timeout {
                    resource_id: snapshot_id.to_owned(),
                    target: target.to_string(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

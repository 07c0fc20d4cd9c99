//! Volume lookup helpers.

use crate::api::{CloudApi, Volume, VolumeFilter};

use super::{FactoryError, ImageFactory};

impl<C: CloudApi> ImageFactory<C> {
    /// Returns all volumes matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::NotFound`] when the result set is empty; an
    /// empty list is never returned as success.
    pub async fn find_volumes(&self, filter: &VolumeFilter) -> Result<Vec<Volume>, FactoryError> {
        let volumes = self.api.list_volumes(filter).await?;
        if volumes.is_empty() {
            return Err(FactoryError::NotFound {
                filter: filter.clone(),
            });
        }
        Ok(volumes)
    }

    pub(crate) async fn find_volume(&self, volume_id: &str) -> Result<Volume, FactoryError> {
        let filter = VolumeFilter::by_id(volume_id);
        let volumes = self.find_volumes(&filter).await?;
        volumes
            .into_iter()
            .next()
            .ok_or(FactoryError::NotFound { filter })
    }
}

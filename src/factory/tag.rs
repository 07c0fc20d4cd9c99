//! Resource labelling.

use crate::api::{CloudApi, Labels};

use super::{FactoryError, ImageFactory};

impl<C: CloudApi> ImageFactory<C> {
    /// Applies `labels` to `resource_id` in one batched call. An empty map
    /// issues no network call at all. Failures propagate to the lifecycle
    /// step that invoked the tagging.
    pub(crate) async fn apply_tags(
        &self,
        resource_id: &str,
        labels: &Labels,
    ) -> Result<(), FactoryError> {
        if labels.is_empty() {
            return Ok(());
        }
        tracing::info!(%resource_id, count = labels.len(), "tagging resource");
        self.api.create_tags(resource_id, labels).await?;
        Ok(())
    }
}

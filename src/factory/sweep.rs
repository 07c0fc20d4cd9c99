//! Tag-filtered cleanup sweep for leftover build volumes.
//!
//! Failed builds can leave volumes behind. The sweep finds every volume
//! carrying a given label and destroys each in turn, continuing past
//! individual failures so one stuck volume does not shield the rest.

use crate::api::{CloudApi, VolumeFilter};

use super::{FactoryError, ImageFactory};

/// Outcome of a cleanup sweep.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SweepSummary {
    /// Number of volumes that matched the label.
    pub matched: usize,
    /// Number of matched volumes that were destroyed.
    pub destroyed: usize,
}

impl<C: CloudApi> ImageFactory<C> {
    /// Destroys every volume labelled `key=value`.
    ///
    /// A volume that resists destruction is logged and skipped; the sweep
    /// carries on with the remaining matches. With `dry_run` set, matching
    /// volumes are reported but kept. A label that matches nothing yields an
    /// empty sweep, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Provider`] when the volume listing itself
    /// fails; nothing has been destroyed at that point.
    pub async fn sweep_volumes(
        &self,
        key: &str,
        value: &str,
        dry_run: bool,
    ) -> Result<SweepSummary, FactoryError> {
        let filter = VolumeFilter::by_label(key, value);
        tracing::info!(%filter, "searching for leftover volumes");
        let matched = self.api.list_volumes(&filter).await?;

        let mut summary = SweepSummary {
            matched: matched.len(),
            destroyed: 0,
        };
        for volume in matched {
            if dry_run {
                tracing::info!(volume_id = %volume.id, "dry run, keeping volume");
                continue;
            }
            match self.destroy_volume(&volume.id).await {
                Ok(()) => summary.destroyed += 1,
                Err(destroy_err) => {
                    tracing::error!(
                        volume_id = %volume.id,
                        error = %destroy_err,
                        "could not destroy swept volume"
                    );
                }
            }
        }

        tracing::info!(
            matched = summary.matched,
            destroyed = summary.destroyed,
            "volume sweep finished"
        );
        Ok(summary)
    }
}

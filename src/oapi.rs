//! Thin JSON client for the Outscale-compatible API.
//!
//! One POST per operation against `{base_url}/{Action}` with a JSON body,
//! authenticated with the configured secret key as a bearer token. Request
//! signing beyond that is deliberately out of scope; the lifecycle manager
//! only depends on the [`CloudApi`] seam, so a signing client can be swapped
//! in without touching it.

use std::sync::LazyLock;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::{
    ApiFuture, CloudApi, Labels, ProviderError, RegisterImageRequest, Snapshot, SnapshotStatus,
    Volume, VolumeFilter, VolumeState,
};
use crate::config::{ConfigError, FactoryConfig};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_INSTANCE_ID_URL: &str = "http://169.254.169.254/latest/meta-data/instance-id";

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Region-scoped client for the provider's JSON API.
#[derive(Clone, Debug)]
pub struct OapiClient {
    base_url: String,
    secret_key: String,
}

impl OapiClient {
    /// Constructs a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the configuration fails
    /// validation.
    pub fn new(config: &FactoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            base_url: config.api_base_url(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn call<B, R>(&self, action: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{action}", self.base_url);
        let response = HTTP_CLIENT
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::new(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ProviderError::new(err.to_string()))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes).into_owned();
            return Err(ProviderError::new(format!("{action} failed ({status}): {message}")));
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| ProviderError::new(format!("{action} returned invalid JSON: {err}")))
    }
}

/// Reads the calling instance's identifier from the link-local metadata
/// endpoint. Only meaningful when running on a provider instance.
///
/// # Errors
///
/// Returns [`ProviderError`] when the endpoint is unreachable or returns a
/// non-success status.
pub async fn local_instance_id() -> Result<String, ProviderError> {
    let response = HTTP_CLIENT
        .get(METADATA_INSTANCE_ID_URL)
        .send()
        .await
        .map_err(|err| ProviderError::new(err.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ProviderError::new(err.to_string()))?;
    if !status.is_success() {
        return Err(ProviderError::new(format!(
            "metadata lookup failed ({status}): {body}"
        )));
    }
    Ok(body.trim().to_owned())
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ApiTag {
    key: String,
    value: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ApiLinkedVolume {
    vm_id: String,
    device_name: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ApiVolume {
    volume_id: String,
    size: u32,
    subregion_name: String,
    state: String,
    linked_volumes: Vec<ApiLinkedVolume>,
    tags: Vec<ApiTag>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ApiSnapshot {
    snapshot_id: String,
    volume_id: String,
    state: String,
    tags: Vec<ApiTag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateVolumeBody<'a> {
    size: u32,
    subregion_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateVolumeResponse {
    volume: ApiVolume,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "PascalCase")]
struct VolumeFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_volume_vm_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadVolumesBody {
    filters: VolumeFilters,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ReadVolumesResponse {
    volumes: Vec<ApiVolume>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteVolumeBody<'a> {
    volume_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LinkVolumeBody<'a> {
    volume_id: &'a str,
    vm_id: &'a str,
    device_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UnlinkVolumeBody<'a> {
    volume_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSnapshotBody<'a> {
    volume_id: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSnapshotResponse {
    snapshot: ApiSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SnapshotFilters {
    snapshot_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReadSnapshotsBody {
    filters: SnapshotFilters,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ReadSnapshotsResponse {
    snapshots: Vec<ApiSnapshot>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Bsu<'a> {
    snapshot_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BlockDeviceMapping<'a> {
    device_name: &'a str,
    bsu: Bsu<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateImageBody<'a> {
    image_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    architecture: &'a str,
    root_device_name: &'a str,
    block_device_mappings: Vec<BlockDeviceMapping<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiImage {
    image_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateImageResponse {
    image: ApiImage,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateTagsBody {
    resource_ids: Vec<String>,
    tags: Vec<ApiTag>,
}

#[derive(Deserialize)]
struct EmptyResponse {}

fn labels_from(tags: Vec<ApiTag>) -> Labels {
    tags.into_iter().map(|tag| (tag.key, tag.value)).collect()
}

fn volume_from_api(api: ApiVolume) -> Result<Volume, ProviderError> {
    let state = VolumeState::parse(&api.state)
        .ok_or_else(|| ProviderError::new(format!("unknown volume state '{}'", api.state)))?;
    let link = api.linked_volumes.into_iter().next();
    Ok(Volume {
        id: api.volume_id,
        size_gib: api.size,
        location: api.subregion_name,
        state,
        instance_id: link.as_ref().map(|l| l.vm_id.clone()),
        device: link.map(|l| l.device_name),
        labels: labels_from(api.tags),
    })
}

fn snapshot_from_api(api: ApiSnapshot) -> Result<Snapshot, ProviderError> {
    let status = SnapshotStatus::parse(&api.state)
        .ok_or_else(|| ProviderError::new(format!("unknown snapshot state '{}'", api.state)))?;
    Ok(Snapshot {
        id: api.snapshot_id,
        volume_id: api.volume_id,
        status,
        labels: labels_from(api.tags),
    })
}

impl CloudApi for OapiClient {
    fn list_volumes<'a>(&'a self, filter: &'a VolumeFilter) -> ApiFuture<'a, Vec<Volume>> {
        Box::pin(async move {
            let body = ReadVolumesBody {
                filters: VolumeFilters {
                    volume_ids: filter.volume_id.clone().map(|id| vec![id]),
                    link_volume_vm_ids: filter.instance_id.clone().map(|id| vec![id]),
                    tags: filter
                        .label
                        .as_ref()
                        .map(|(key, value)| vec![format!("{key}={value}")]),
                },
            };
            let response: ReadVolumesResponse = self.call("ReadVolumes", &body).await?;
            response.volumes.into_iter().map(volume_from_api).collect()
        })
    }

    fn create_volume<'a>(&'a self, size_gib: u32, location: &'a str) -> ApiFuture<'a, Volume> {
        Box::pin(async move {
            let body = CreateVolumeBody {
                size: size_gib,
                subregion_name: location,
            };
            let response: CreateVolumeResponse = self.call("CreateVolume", &body).await?;
            volume_from_api(response.volume)
        })
    }

    fn delete_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let _: EmptyResponse = self
                .call("DeleteVolume", &DeleteVolumeBody { volume_id })
                .await?;
            Ok(())
        })
    }

    fn attach_volume<'a>(
        &'a self,
        volume_id: &'a str,
        instance_id: &'a str,
        device: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let body = LinkVolumeBody {
                volume_id,
                vm_id: instance_id,
                device_name: device,
            };
            let _: EmptyResponse = self.call("LinkVolume", &body).await?;
            Ok(())
        })
    }

    fn detach_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let _: EmptyResponse = self
                .call("UnlinkVolume", &UnlinkVolumeBody { volume_id })
                .await?;
            Ok(())
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        description: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let body = CreateSnapshotBody {
                volume_id,
                description,
            };
            let response: CreateSnapshotResponse = self.call("CreateSnapshot", &body).await?;
            snapshot_from_api(response.snapshot)
        })
    }

    fn read_snapshot<'a>(&'a self, snapshot_id: &'a str) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let body = ReadSnapshotsBody {
                filters: SnapshotFilters {
                    snapshot_ids: vec![snapshot_id.to_owned()],
                },
            };
            let response: ReadSnapshotsResponse = self.call("ReadSnapshots", &body).await?;
            let api = response
                .snapshots
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::new(format!("no such snapshot {snapshot_id}")))?;
            snapshot_from_api(api)
        })
    }

    fn register_image<'a>(&'a self, request: &'a RegisterImageRequest) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let body = CreateImageBody {
                image_name: &request.name,
                description: request.description.as_deref(),
                architecture: &request.architecture,
                root_device_name: &request.root_device,
                block_device_mappings: vec![BlockDeviceMapping {
                    device_name: &request.root_device,
                    bsu: Bsu {
                        snapshot_id: &request.snapshot_id,
                    },
                }],
            };
            let response: CreateImageResponse = self.call("CreateImage", &body).await?;
            Ok(response.image.image_id)
        })
    }

    fn create_tags<'a>(&'a self, resource_id: &'a str, labels: &'a Labels) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let body = CreateTagsBody {
                resource_ids: vec![resource_id.to_owned()],
                tags: labels
                    .iter()
                    .map(|(key, value)| ApiTag {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            };
            let _: EmptyResponse = self.call("CreateTags", &body).await?;
            Ok(())
        })
    }
}

//! Unit tests for the lifecycle manager, driven by a scripted fake client.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::api::{
    ApiFuture, CloudApi, Labels, ProviderError, RegisterImageRequest, Snapshot, SnapshotStatus,
    Volume, VolumeFilter, VolumeState,
};
use crate::factory::{FactoryError, ImageFactory, VolumeSpec};

mod volume;

/// Scripted in-memory provider. Each volume and snapshot carries a queue of
/// states; every refresh advances the queue until one state remains, which
/// then repeats forever.
#[derive(Clone, Default)]
pub(super) struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    volumes: BTreeMap<String, FakeVolume>,
    snapshots: BTreeMap<String, FakeSnapshot>,
    tags: BTreeMap<String, Labels>,
    images: Vec<RegisterImageRequest>,
    tag_calls: usize,
    next_volume: u32,
    next_snapshot: u32,
    next_image: u32,
    fail_list: Option<String>,
    fail_attach: Option<String>,
    fail_delete: Option<String>,
    fail_tags: Option<String>,
    fail_register: Option<String>,
}

struct FakeVolume {
    volume: Volume,
    states: VecDeque<VolumeState>,
}

struct FakeSnapshot {
    snapshot: Snapshot,
    statuses: VecDeque<SnapshotStatus>,
}

fn advance<T: Copy>(queue: &mut VecDeque<T>, fallback: T) -> T {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or(fallback)
    } else {
        queue.front().copied().unwrap_or(fallback)
    }
}

impl FakeApi {
    pub(super) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds a volume with a scripted state sequence and optional attachment.
    pub(super) fn seed_volume(
        &self,
        volume_id: &str,
        states: &[VolumeState],
        attachment: Option<(&str, &str)>,
    ) {
        let mut state = self.lock();
        state.volumes.insert(
            volume_id.to_owned(),
            FakeVolume {
                volume: Volume {
                    id: volume_id.to_owned(),
                    size_gib: 10,
                    location: String::from("zone-a"),
                    state: states.first().copied().unwrap_or(VolumeState::Available),
                    instance_id: attachment.map(|(instance, _)| instance.to_owned()),
                    device: attachment.map(|(_, device)| device.to_owned()),
                    labels: Labels::new(),
                },
                states: states.iter().copied().collect(),
            },
        );
    }

    /// Applies labels directly to a seeded volume.
    pub(super) fn label_volume(&self, volume_id: &str, labels: &Labels) {
        let mut state = self.lock();
        if let Some(fake) = state.volumes.get_mut(volume_id) {
            fake.volume
                .labels
                .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    pub(super) fn volume_exists(&self, volume_id: &str) -> bool {
        self.lock().volumes.contains_key(volume_id)
    }

    pub(super) fn tags_for(&self, resource_id: &str) -> Labels {
        self.lock().tags.get(resource_id).cloned().unwrap_or_default()
    }

    pub(super) fn tag_call_count(&self) -> usize {
        self.lock().tag_calls
    }

    pub(super) fn snapshot_count(&self) -> usize {
        self.lock().snapshots.len()
    }

    pub(super) fn registered_images(&self) -> Vec<RegisterImageRequest> {
        self.lock().images.clone()
    }

    pub(super) fn fail_list(&self, message: &str) {
        self.lock().fail_list = Some(message.to_owned());
    }

    pub(super) fn fail_attach(&self, message: &str) {
        self.lock().fail_attach = Some(message.to_owned());
    }

    pub(super) fn fail_delete(&self, message: &str) {
        self.lock().fail_delete = Some(message.to_owned());
    }

    pub(super) fn fail_tags(&self, message: &str) {
        self.lock().fail_tags = Some(message.to_owned());
    }

    pub(super) fn fail_register(&self, message: &str) {
        self.lock().fail_register = Some(message.to_owned());
    }
}

impl CloudApi for FakeApi {
    fn list_volumes<'a>(&'a self, filter: &'a VolumeFilter) -> ApiFuture<'a, Vec<Volume>> {
        Box::pin(async move {
            let mut state = self.lock();
            if let Some(message) = state.fail_list.clone() {
                return Err(ProviderError::new(message));
            }
            let mut matched = Vec::new();
            for fake in state.volumes.values_mut() {
                let id_ok = filter
                    .volume_id
                    .as_ref()
                    .is_none_or(|wanted| *wanted == fake.volume.id);
                let instance_ok = filter
                    .instance_id
                    .as_ref()
                    .is_none_or(|wanted| fake.volume.instance_id.as_ref() == Some(wanted));
                let label_ok = filter
                    .label
                    .as_ref()
                    .is_none_or(|(key, value)| fake.volume.labels.get(key) == Some(value));
                if id_ok && instance_ok && label_ok {
                    let current = advance(&mut fake.states, VolumeState::Available);
                    fake.volume.state = current;
                    matched.push(fake.volume.clone());
                }
            }
            Ok(matched)
        })
    }

    fn create_volume<'a>(&'a self, size_gib: u32, location: &'a str) -> ApiFuture<'a, Volume> {
        Box::pin(async move {
            let mut state = self.lock();
            state.next_volume += 1;
            let volume = Volume {
                id: format!("vol-{}", state.next_volume),
                size_gib,
                location: location.to_owned(),
                state: VolumeState::Creating,
                instance_id: None,
                device: None,
                labels: Labels::new(),
            };
            state.volumes.insert(
                volume.id.clone(),
                FakeVolume {
                    volume: volume.clone(),
                    states: VecDeque::from(vec![VolumeState::Creating, VolumeState::Available]),
                },
            );
            Ok(volume)
        })
    }

    fn delete_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            if let Some(message) = state.fail_delete.clone() {
                return Err(ProviderError::new(message));
            }
            if state.volumes.remove(volume_id).is_none() {
                return Err(ProviderError::new(format!("no such volume {volume_id}")));
            }
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
            let mut state = self.lock();
            if let Some(message) = state.fail_attach.clone() {
                return Err(ProviderError::new(message));
            }
            let Some(fake) = state.volumes.get_mut(volume_id) else {
                return Err(ProviderError::new(format!("no such volume {volume_id}")));
            };
            fake.volume.instance_id = Some(instance_id.to_owned());
            fake.volume.device = Some(device.to_owned());
            Ok(())
        })
    }

    fn detach_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            let Some(fake) = state.volumes.get_mut(volume_id) else {
                return Err(ProviderError::new(format!("no such volume {volume_id}")));
            };
            fake.volume.instance_id = None;
            fake.volume.device = None;
            fake.states = VecDeque::from(vec![VolumeState::Available]);
            Ok(())
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        _description: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let mut state = self.lock();
            state.next_snapshot += 1;
            let snapshot = Snapshot {
                id: format!("snap-{}", state.next_snapshot),
                volume_id: volume_id.to_owned(),
                status: SnapshotStatus::Pending,
                labels: Labels::new(),
            };
            state.snapshots.insert(
                snapshot.id.clone(),
                FakeSnapshot {
                    snapshot: snapshot.clone(),
                    statuses: VecDeque::from(vec![
                        SnapshotStatus::Pending,
                        SnapshotStatus::Completed,
                    ]),
                },
            );
            Ok(snapshot)
        })
    }

    fn read_snapshot<'a>(&'a self, snapshot_id: &'a str) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let mut state = self.lock();
            let Some(fake) = state.snapshots.get_mut(snapshot_id) else {
                return Err(ProviderError::new(format!("no such snapshot {snapshot_id}")));
            };
            let current = advance(&mut fake.statuses, SnapshotStatus::Completed);
            fake.snapshot.status = current;
            Ok(fake.snapshot.clone())
        })
    }

    fn register_image<'a>(&'a self, request: &'a RegisterImageRequest) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let mut state = self.lock();
            if let Some(message) = state.fail_register.clone() {
                return Err(ProviderError::new(message));
            }
            state.next_image += 1;
            state.images.push(request.clone());
            Ok(format!("ami-{}", state.next_image))
        })
    }

    fn create_tags<'a>(&'a self, resource_id: &'a str, labels: &'a Labels) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            state.tag_calls += 1;
            if let Some(message) = state.fail_tags.clone() {
                return Err(ProviderError::new(message));
            }
            state
                .tags
                .entry(resource_id.to_owned())
                .or_default()
                .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
            if let Some(fake) = state.volumes.get_mut(resource_id) {
                fake.volume
                    .labels
                    .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Ok(())
        })
    }
}

/// Lifecycle manager fixture with millisecond polling bounds.
pub(super) fn factory(api: FakeApi) -> ImageFactory<FakeApi> {
    ImageFactory::new(api)
        .with_poll_interval(Duration::from_millis(1))
        .with_wait_timeout(Duration::from_millis(100))
}

pub(super) fn spec(instance_id: &str) -> VolumeSpec {
    VolumeSpec {
        instance_id: instance_id.to_owned(),
        size_gib: 10,
        location: String::from("zone-a"),
        labels: Labels::new(),
    }
}

#[tokio::test]
async fn find_volumes_never_returns_empty_success() {
    let api = FakeApi::new();
    let manager = factory(api);
    let result = manager.find_volumes(&VolumeFilter::by_id("vol-missing")).await;
    assert!(
        matches!(result, Err(FactoryError::NotFound { .. })),
        "unexpected find outcome: {result:?}"
    );
}

#[tokio::test]
async fn find_volumes_matches_by_instance() {
    let api = FakeApi::new();
    api.seed_volume(
        "vol-1",
        &[VolumeState::InUse],
        Some(("i-123", "/dev/sdb")),
    );
    api.seed_volume("vol-2", &[VolumeState::Available], None);
    let manager = factory(api);

    let found = manager
        .find_volumes(&VolumeFilter::by_instance("i-123"))
        .await
        .unwrap_or_else(|err| panic!("lookup should succeed: {err}"));
    assert_eq!(found.len(), 1);
    assert_eq!(found.first().map(|v| v.id.as_str()), Some("vol-1"));
}

#[tokio::test]
async fn apply_tags_skips_network_call_for_empty_labels() {
    let api = FakeApi::new();
    api.seed_volume("vol-1", &[VolumeState::Available], None);
    let probe = api.clone();
    let manager = factory(api);

    manager
        .apply_tags("vol-1", &Labels::new())
        .await
        .unwrap_or_else(|err| panic!("empty tagging should succeed: {err}"));
    assert_eq!(probe.tag_call_count(), 0);
}

pub(super) fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

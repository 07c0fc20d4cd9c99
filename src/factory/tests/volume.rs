//! Tests for the volume lifecycle and the cleanup cascade.

use crate::api::{VolumeFilter, VolumeState};
use crate::factory::{FactoryError, VolumeSpec};

use super::{FakeApi, factory, labels, spec};

#[tokio::test]
async fn create_attaches_fresh_volume_on_first_device() {
    let api = FakeApi::new();
    let probe = api.clone();
    let manager = factory(api);

    let attached = manager
        .create_volume(&spec("i-123"))
        .await
        .unwrap_or_else(|err| panic!("creation should succeed: {err}"));

    assert_eq!(attached.volume_id, "vol-1");
    assert_eq!(attached.device, "/dev/sdb");
    assert!(probe.volume_exists("vol-1"));
}

#[tokio::test]
async fn create_applies_labels_to_the_volume() {
    let api = FakeApi::new();
    let probe = api.clone();
    let manager = factory(api);

    let wanted = labels(&[("project", "omi"), ("stage", "build")]);
    let request = VolumeSpec {
        labels: wanted.clone(),
        ..spec("i-123")
    };
    manager
        .create_volume(&request)
        .await
        .unwrap_or_else(|err| panic!("creation should succeed: {err}"));

    assert_eq!(probe.tags_for("vol-1"), wanted);
}

#[tokio::test]
async fn failed_attach_destroys_the_provisioned_volume() {
    let api = FakeApi::new();
    api.fail_attach("attach exploded");
    let probe = api.clone();
    let manager = factory(api.clone());

    let result = manager.create_volume(&spec("i-123")).await;
    assert!(
        matches!(
            result,
            Err(FactoryError::Provider(ref err)) if err.message == "attach exploded"
        ),
        "the original error must survive cleanup, got {result:?}"
    );
    assert!(!probe.volume_exists("vol-1"));

    let find = manager.find_volumes(&VolumeFilter::by_id("vol-1")).await;
    assert!(
        matches!(find, Err(FactoryError::NotFound { .. })),
        "cleaned-up volume should be unfindable, got {find:?}"
    );
}

#[tokio::test]
async fn failed_tagging_also_triggers_the_cleanup_cascade() {
    let api = FakeApi::new();
    api.fail_tags("tagging broke");
    let probe = api.clone();
    let manager = factory(api);

    let request = VolumeSpec {
        labels: labels(&[("project", "omi")]),
        ..spec("i-123")
    };
    let result = manager.create_volume(&request).await;
    assert!(
        matches!(
            result,
            Err(FactoryError::Provider(ref err)) if err.message == "tagging broke"
        ),
        "unexpected creation outcome: {result:?}"
    );
    assert!(!probe.volume_exists("vol-1"));
}

#[tokio::test]
async fn detach_of_unattached_volume_is_a_caller_error() {
    let api = FakeApi::new();
    api.seed_volume("vol-1", &[VolumeState::Available], None);
    let manager = factory(api);

    let result = manager.detach_volume("vol-1").await;
    assert!(
        matches!(
            result,
            Err(FactoryError::AlreadyDetached { ref volume_id }) if volume_id == "vol-1"
        ),
        "detach must not be idempotent, got {result:?}"
    );
}

#[tokio::test]
async fn detach_of_attached_volume_waits_until_unattached() {
    let api = FakeApi::new();
    api.seed_volume("vol-1", &[VolumeState::InUse], Some(("i-123", "/dev/sdb")));
    let probe = api.clone();
    let manager = factory(api);

    manager
        .detach_volume("vol-1")
        .await
        .unwrap_or_else(|err| panic!("detach should succeed: {err}"));
    assert!(probe.volume_exists("vol-1"));
}

#[tokio::test]
async fn destroy_detaches_attached_volume_first() {
    let api = FakeApi::new();
    api.seed_volume("vol-1", &[VolumeState::InUse], Some(("i-123", "/dev/sdb")));
    let probe = api.clone();
    let manager = factory(api);

    manager
        .destroy_volume("vol-1")
        .await
        .unwrap_or_else(|err| panic!("destroy should succeed: {err}"));
    assert!(!probe.volume_exists("vol-1"));
}

#[tokio::test]
async fn destroy_of_missing_volume_reports_not_found() {
    let api = FakeApi::new();
    let manager = factory(api);

    let result = manager.destroy_volume("vol-missing").await;
    assert!(
        matches!(result, Err(FactoryError::NotFound { .. })),
        "a missing volume is an error, not success, got {result:?}"
    );
}

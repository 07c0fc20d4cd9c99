//! Core library for the omi-factory image build tool.
//!
//! The crate exposes a cloud API abstraction over block-storage volumes,
//! snapshots, and machine images, plus the lifecycle manager that powers the
//! image pipeline (create volume → attach → snapshot → register image →
//! destroy), with bounded polling for asynchronous state transitions and
//! rollback of partially-created resources.

pub mod api;
pub mod config;
pub mod factory;
pub mod oapi;
pub mod runner;

pub use api::{
    CloudApi, Labels, ProviderError, RegisterImageRequest, Snapshot, SnapshotStatus, Volume,
    VolumeFilter, VolumeState,
};
pub use config::{ConfigError, FactoryConfig};
pub use factory::{
    AttachedVolume, DeviceRange, FactoryError, ImageFactory, ImageSpec, RegisteredImage,
    SweepSummary, VolumeSpec,
};
pub use oapi::{OapiClient, local_instance_id};
pub use runner::{CommandOutput, CommandRunner, ProcessCommandRunner, RunnerError};

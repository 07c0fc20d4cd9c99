//! Command-line interface definitions for the `omi-factory` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `omi-factory` binary.
#[derive(Debug, Parser)]
#[command(
    name = "omi-factory",
    about = "Create and tear down machine images via block-storage volumes and snapshots",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Enable debug-level diagnostics on stderr.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    /// Lifecycle operation to perform.
    #[command(subcommand)]
    pub(crate) command: FactoryCommand,
}

/// Lifecycle subcommands.
#[derive(Debug, Parser)]
pub(crate) enum FactoryCommand {
    /// Create a volume and attach it to an instance.
    #[command(
        name = "create-volume",
        about = "Create a volume and attach it to an instance"
    )]
    CreateVolume(CreateVolumeCommand),
    /// Snapshot a volume and register a machine image from it.
    #[command(
        name = "create-image",
        about = "Snapshot a volume and register a machine image from it"
    )]
    CreateImage(CreateImageCommand),
    /// Detach (if needed) and delete a volume.
    #[command(name = "destroy-volume", about = "Detach (if needed) and delete a volume")]
    DestroyVolume(DestroyVolumeCommand),
    /// Destroy leftover volumes matching labels.
    #[command(name = "cleanup", about = "Destroy leftover volumes matching labels")]
    Cleanup(CleanupCommand),
}

/// Arguments for the `create-volume` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CreateVolumeCommand {
    /// Instance that receives the volume. Defaults to the calling instance,
    /// discovered via the link-local metadata endpoint.
    #[arg(long, value_name = "VM_ID")]
    pub(crate) instance_id: Option<String>,
    /// Placement location for the new volume. Defaults to the configured
    /// volume location.
    #[arg(long, value_name = "LOCATION")]
    pub(crate) volume_location: Option<String>,
    /// Labels to apply to the volume, as a JSON object of strings.
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub(crate) tags: String,
    /// Volume size in GiB.
    #[arg(value_name = "SIZE_GIB")]
    pub(crate) volume_size: u32,
}

/// Arguments for the `create-image` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CreateImageCommand {
    /// Volume holding the image content. The volume is detached before the
    /// snapshot is taken.
    #[arg(long, value_name = "VOLUME_ID")]
    pub(crate) volume_id: String,
    /// Free-form description recorded on the image.
    #[arg(long, value_name = "TEXT")]
    pub(crate) image_description: Option<String>,
    /// CPU architecture recorded on the image. Defaults to the configured
    /// architecture.
    #[arg(long, value_name = "ARCH")]
    pub(crate) image_arch: Option<String>,
    /// Root device path recorded on the image. Defaults to the configured
    /// root device.
    #[arg(long, value_name = "DEVICE")]
    pub(crate) root_device: Option<String>,
    /// Labels to apply to the snapshot and the image, as a JSON object of
    /// strings.
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub(crate) tags: String,
    /// Name of the image to register.
    #[arg(value_name = "IMAGE_NAME")]
    pub(crate) image_name: String,
}

/// Arguments for the `destroy-volume` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct DestroyVolumeCommand {
    /// Volume to detach and delete.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: String,
}

/// Arguments for the `cleanup` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CleanupCommand {
    /// Labels identifying leftover volumes, as a JSON object of strings.
    /// Each key/value pair is swept in turn.
    #[arg(long, value_name = "JSON")]
    pub(crate) tags: String,
    /// List matching volumes without destroying them.
    #[arg(long)]
    pub(crate) dry_run: bool,
}

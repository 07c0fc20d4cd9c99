//! Binary entry point for the `omi-factory` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use omi_factory::{
    ConfigError, FactoryConfig, FactoryError, ImageFactory, ImageSpec, Labels, OapiClient,
    ProviderError, VolumeSpec, local_instance_id,
};

mod cli;

use cli::{
    CleanupCommand, Cli, CreateImageCommand, CreateVolumeCommand, DestroyVolumeCommand,
    FactoryCommand,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("lifecycle error: {0}")]
    Factory(#[from] FactoryError),
    #[error("instance discovery failed: {0}")]
    InstanceDiscovery(ProviderError),
    #[error("invalid --tags value: {0}")]
    InvalidLabels(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "omi_factory=debug" } else { "omi_factory=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let config = FactoryConfig::load_without_cli_args()?;
    match cli.command {
        FactoryCommand::CreateVolume(command) => create_volume(&config, command).await,
        FactoryCommand::CreateImage(command) => create_image(&config, command).await,
        FactoryCommand::DestroyVolume(command) => destroy_volume(&config, command).await,
        FactoryCommand::Cleanup(command) => cleanup(&config, command).await,
    }
}

async fn create_volume(
    config: &FactoryConfig,
    command: CreateVolumeCommand,
) -> Result<i32, CliError> {
    let labels = parse_labels(&command.tags)?;
    let instance_id = match command.instance_id {
        Some(id) => id,
        None => local_instance_id()
            .await
            .map_err(CliError::InstanceDiscovery)?,
    };

    let manager = ImageFactory::new(OapiClient::new(config)?);
    let spec = VolumeSpec {
        instance_id,
        size_gib: command.volume_size,
        location: command
            .volume_location
            .unwrap_or_else(|| config.volume_location.clone()),
        labels,
    };
    let attached = manager.create_volume(&spec).await?;

    let mut stdout = io::stdout();
    writeln!(stdout, "VOLUME_ID={}", attached.volume_id).ok();
    writeln!(stdout, "DEVICE={}", attached.device).ok();
    Ok(0)
}

async fn create_image(
    config: &FactoryConfig,
    command: CreateImageCommand,
) -> Result<i32, CliError> {
    let labels = parse_labels(&command.tags)?;
    let manager = ImageFactory::new(OapiClient::new(config)?);

    // The snapshot must be taken from a quiesced, unattached volume. A volume
    // that is already detached is a caller error and aborts the build.
    manager.detach_volume(&command.volume_id).await?;

    let spec = ImageSpec {
        name: command.image_name,
        volume_id: command.volume_id,
        architecture: command
            .image_arch
            .unwrap_or_else(|| config.image_architecture.clone()),
        description: command.image_description,
        labels,
        root_device: command
            .root_device
            .unwrap_or_else(|| config.root_device.clone()),
    };
    let registered = manager.create_image(&spec).await?;

    let mut stdout = io::stdout();
    writeln!(stdout, "IMAGE_ID={}", registered.image_id).ok();
    writeln!(stdout, "SNAPSHOT_ID={}", registered.snapshot_id).ok();
    Ok(0)
}

async fn destroy_volume(
    config: &FactoryConfig,
    command: DestroyVolumeCommand,
) -> Result<i32, CliError> {
    let manager = ImageFactory::new(OapiClient::new(config)?);
    manager.destroy_volume(&command.volume_id).await?;
    Ok(0)
}

async fn cleanup(config: &FactoryConfig, command: CleanupCommand) -> Result<i32, CliError> {
    let labels = parse_labels(&command.tags)?;
    let manager = ImageFactory::new(OapiClient::new(config)?);
    for (key, value) in &labels {
        manager
            .sweep_volumes(key, value, command.dry_run)
            .await?;
    }
    Ok(0)
}

fn parse_labels(raw: &str) -> Result<Labels, CliError> {
    serde_json::from_str(raw).map_err(|err| {
        CliError::InvalidLabels(format!(
            "expected a JSON object of string values, got {raw:?}: {err}"
        ))
    })
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

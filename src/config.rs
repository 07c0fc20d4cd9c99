//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Factory configuration derived from defaults, configuration files, and
/// environment variables. There is no hidden global: callers load this once
/// and pass it into the components that need it.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "OMI")]
pub struct FactoryConfig {
    /// Access key for the provider account. Captured for audit logging; not
    /// required for API calls.
    pub access_key: Option<String>,
    /// Secret key used to authenticate API calls. Required.
    pub secret_key: String,
    /// Provider region. Defaults to `eu-west-1`.
    #[ortho_config(default = "eu-west-1".to_owned())]
    pub region: String,
    /// Placement location used for new volumes. Defaults to `eu-west-1a`.
    #[ortho_config(default = "eu-west-1a".to_owned())]
    pub volume_location: String,
    /// Root device path recorded on registered images. Defaults to
    /// `/dev/sda1`.
    #[ortho_config(default = "/dev/sda1".to_owned())]
    pub root_device: String,
    /// CPU architecture recorded on registered images. Defaults to `x86_64`.
    #[ortho_config(default = "x86_64".to_owned())]
    pub image_architecture: String,
    /// Optional API base URL override, mainly for test endpoints.
    pub endpoint: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error
/// messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl FactoryConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to omi-factory.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("omi-factory")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the API base URL, honouring the `endpoint` override.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://api.{}.outscale.com/api/v1", self.region))
    }

    /// Performs semantic validation on required fields. Messages include
    /// guidance on how to supply missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.secret_key,
            &FieldMetadata::new("API secret key", "OMI_SECRET_KEY", "secret_key"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("provider region", "OMI_REGION", "region"),
        )?;
        Self::require_field(
            &self.volume_location,
            &FieldMetadata::new("volume location", "OMI_VOLUME_LOCATION", "volume_location"),
        )?;
        Self::require_field(
            &self.root_device,
            &FieldMetadata::new("root device path", "OMI_ROOT_DEVICE", "root_device"),
        )?;
        Self::require_field(
            &self.image_architecture,
            &FieldMetadata::new(
                "image architecture",
                "OMI_IMAGE_ARCHITECTURE",
                "image_architecture",
            ),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

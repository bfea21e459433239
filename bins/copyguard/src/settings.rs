//! Layered configuration for the CLI.
//!
//! Sources, later ones winning: built-in defaults, a TOML file (explicit
//! `--config`, else `<config dir>/copyguard/config.toml` when present), then
//! `COPYGUARD__<SECTION>__<FIELD>` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use copyguard_core::config::{BandConfig, DetectionConfig};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub detection: DetectionConfig,
    pub band: BandConfig,
}

impl Settings {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("COPYGUARD")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("copyguard").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        self.detection
            .validate()
            .context("invalid [detection] settings")?;
        self.band.validate().context("invalid [band] settings")?;
        Ok(())
    }
}

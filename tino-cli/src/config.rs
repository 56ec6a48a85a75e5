use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use log::debug;
use serde::{Deserialize, Serialize};
use tino_core::BuildOptions;

pub const DEFAULT_CONFIG_FILE: &str = "tino.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TinoConfig {
    pub build: BuildOptions,
    pub serve: ServeConfig,
}

/// Development server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub open: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            open: false,
        }
    }
}

impl TinoConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (TINO_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .ok()
            .flatten()
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG_FILE);

        let mut builder =
            ConfigBuilder::builder().add_source(ConfigBuilder::try_from(&Self::default())?);

        if Path::new(config_file).exists() {
            debug!("Reading configuration from {config_file}");
            builder = builder.add_source(File::from(Path::new(config_file)));
        }

        builder = builder.add_source(
            Environment::with_prefix("TINO")
                .prefix_separator("_")
                .separator("__"),
        );

        // Only override with CLI args that are actually defined for this command
        if let Some(source) = string_arg(args, "source") {
            builder = builder.set_override("build.source", source)?;
        }
        if let Some(output) = string_arg(args, "output") {
            builder = builder.set_override("build.output", output)?;
        }
        if flag(args, "exclude-content") {
            builder = builder.set_override("build.exclude_content", true)?;
        }
        if flag(args, "no-tag-lists") {
            builder = builder.set_override("build.tag_lists", false)?;
        }
        if flag(args, "no-clean") {
            builder = builder.set_override("build.clean", false)?;
        }
        if let Some(host) = string_arg(args, "host") {
            builder = builder.set_override("serve.host", host)?;
        }
        if let Some(port) = args.try_get_one::<u16>("port").ok().flatten() {
            builder = builder.set_override("serve.port", i64::from(*port))?;
        }
        if flag(args, "open") {
            builder = builder.set_override("serve.open", true)?;
        }

        let config: TinoConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

fn string_arg(args: &ArgMatches, name: &str) -> Option<String> {
    args.try_get_one::<String>(name).ok().flatten().cloned()
}

fn flag(args: &ArgMatches, name: &str) -> bool {
    args.try_get_one::<bool>(name)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

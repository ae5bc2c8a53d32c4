//! Persistence layer for console configuration.
//!
//! Saves archived variables and aliases to RON and applies them back.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    CommandArgs, CommandResult, ConCommand, ConVar, ConsoleError, ConsoleSession,
};

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "console.ron";

/// Variable holding the file `writeconfig` and `loadconfig` use by default.
pub const CONFIG_FILE_VAR: &str = "con-config-file";

/// Serializable console configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConsoleConfigFile {
    /// Variable values as console text.
    #[serde(default)]
    pub convars: BTreeMap<String, String>,
    /// Alias templates.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl ConsoleConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archived variables and every alias of `session`.
    pub fn snapshot(session: &ConsoleSession) -> Self {
        let registry = session.registry();
        Self {
            convars: registry
                .archive_vars()
                .map(|var| (var.name().to_owned(), var.value().to_string()))
                .collect(),
            aliases: registry
                .aliases()
                .map(|alias| (alias.name().to_owned(), alias.template().to_owned()))
                .collect(),
        }
    }

    /// Load config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            error,
        })?;

        ron::from_str(&contents).map_err(|error| ConfigError::Parse {
            path: path.display().to_string(),
            error,
        })
    }

    /// Save config to a RON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|error| ConfigError::Io {
                path: parent.display().to_string(),
                error,
            })?;
        }

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let contents = ron::ser::to_string_pretty(self, pretty)?;

        fs::write(path, contents).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            error,
        })
    }

    /// Load config from file, returning default if file doesn't exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Set the variables unforced and define the aliases.
    ///
    /// Entries that can't be applied are logged and skipped. Returns how many
    /// entries were applied.
    pub fn apply(&self, session: &mut ConsoleSession) -> usize {
        let mut applied = 0;

        for (name, value) in &self.convars {
            match session.set_var(name, value, false) {
                Ok(()) => {
                    debug!("Loaded convar: {} = \"{}\"", name, value);
                    applied += 1;
                }
                Err(err) => warn!("Skipped convar '{}': {}", name, err),
            }
        }

        for (name, template) in &self.aliases {
            match session.register_alias(name, template.as_str()) {
                Ok(()) => {
                    debug!("Loaded alias: {} -> {}", name, template);
                    applied += 1;
                }
                Err(err) => warn!("Skipped alias '{}': {}", name, err),
            }
        }

        applied
    }
}

/// Errors that can occur during config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not access '{path}': {error}")]
    Io {
        path: String,
        #[source]
        error: io::Error,
    },

    #[error("Could not parse '{path}': {error}")]
    Parse {
        path: String,
        #[source]
        error: ron::error::SpannedError,
    },

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

/// Resource naming the config file loaded at startup.
#[derive(Resource, Debug, Clone)]
pub struct ConfigPath(pub String);

impl Default for ConfigPath {
    fn default() -> Self {
        Self(DEFAULT_CONFIG_FILE.to_string())
    }
}

/// Save archived variables and aliases to `path`.
pub fn save_config(session: &ConsoleSession, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    ConsoleConfigFile::snapshot(session).save(path)
}

/// Apply the config at `path`. Returns how many entries were applied.
pub fn load_config(session: &mut ConsoleSession, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
    let config = ConsoleConfigFile::load(path)?;
    Ok(config.apply(session))
}

/// Register `writeconfig`, `loadconfig` and the config file variable.
pub fn register_persist_commands(session: &mut ConsoleSession) {
    if let Err(err) = session.register_var(
        ConVar::new(CONFIG_FILE_VAR, DEFAULT_CONFIG_FILE.to_owned())
            .description("File used by writeconfig and loadconfig without an argument"),
    ) {
        error!("Console: failed to register '{}': {}", CONFIG_FILE_VAR, err);
    }

    let commands = [
        ConCommand::new("writeconfig", write_config_cmd)
            .signature("*")
            .description("Save archived variables and aliases to a config file"),
        ConCommand::new("loadconfig", load_config_cmd)
            .signature("*")
            .description("Apply a config file written by writeconfig"),
    ];
    for cmd in commands {
        let name = cmd.name().to_owned();
        if let Err(err) = session.register_cmd(cmd) {
            error!("Console: failed to register '{}': {}", name, err);
        }
    }
}

fn config_file(session: &ConsoleSession, args: &CommandArgs) -> String {
    args.get(0)
        .map(str::to_owned)
        .or_else(|| session.get_string(CONFIG_FILE_VAR))
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_owned())
}

fn write_config_cmd(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let path = config_file(session, args);
    save_config(session, &path).map_err(|err| ConsoleError::Failed(err.to_string()))?;
    info!("Saved config to '{}'", path);
    session.post(format!("Saved config to '{path}'."));
    Ok(())
}

fn load_config_cmd(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let path = config_file(session, args);
    let applied =
        load_config(session, &path).map_err(|err| ConsoleError::Failed(err.to_string()))?;
    session.post(format!("Applied {applied} entries from '{path}'."));
    Ok(())
}

/// System to load config on startup.
pub fn load_config_on_startup(mut session: ResMut<ConsoleSession>, config_path: Res<ConfigPath>) {
    let path = &config_path.0;
    if let Err(err) = session.set_var(CONFIG_FILE_VAR, path, false) {
        warn!("Could not record config path: {}", err);
    }

    if !Path::new(path).exists() {
        info!("No config file found at '{}', using defaults", path);
        return;
    }

    match ConsoleConfigFile::load(path) {
        Ok(config) => {
            info!("Loading config from '{}'", path);
            let applied = config.apply(&mut session);
            info!(
                "Loaded {} of {} convars and aliases",
                applied,
                config.convars.len() + config.aliases.len()
            );
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
        }
    }
}

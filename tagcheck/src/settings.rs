//! Resolved settings of one invocation.
//!
//! Settings are assembled once, in layers:
//! 1. Flag values (including clap defaults)
//! 2. `PLUGIN_<FLAG>` environment variables, which override the flag
//!
//! The environment is read through an injected lookup function so the
//! overlay can be exercised without touching the process environment.

use crate::cli::{CommonArgs, ExistsArgs, TagsArgs};
use crate::commands::CommandError;
use crate::context::{AppContext, VerbosityLevel};
use crate::format::{ColorChoice, OutputFormat};
use libtagcheck::{Config, Credentials, TagCheckError};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix of the environment variables that override flags.
pub const ENV_PREFIX: &str = "PLUGIN_";

const COMMON_FLAGS: &[&str] = &[
    "image",
    "username",
    "username_file",
    "password",
    "password_file",
    "config",
    "format",
    "verbose",
    "color",
];

const EXISTS_FLAGS: &[&str] = &["outfile", "exit_code"];

/// Returns the environment variable that overrides `flag`.
pub fn env_key(flag: &str) -> String {
    format!("{}{}", ENV_PREFIX, flag.to_uppercase())
}

/// Settings shared by both commands, after flags and environment are merged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub image: String,
    pub username: String,
    pub username_file: Option<PathBuf>,
    pub password: String,
    pub password_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub verbosity: VerbosityLevel,
    pub color: ColorChoice,
}

/// Settings of `image-exists`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistsSettings {
    pub common: Settings,
    pub outfile: Option<PathBuf>,
    /// Exit code for a definitive "not found"
    pub exit_code: i32,
}

impl ExistsSettings {
    /// Resolves the settings of `image-exists`.
    pub fn from_args<F>(args: ExistsArgs, lookup: F) -> Result<Self, CommandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut common = Settings::from_common(args.common);
        common.apply_env(COMMON_FLAGS, &lookup)?;

        let mut settings = Self {
            common,
            outfile: args.outfile,
            exit_code: args.exit_code,
        };
        for flag in EXISTS_FLAGS {
            if let Some(value) = lookup(&env_key(flag)) {
                settings.set(flag, value)?;
            }
        }
        Ok(settings)
    }

    fn set(&mut self, flag: &str, value: String) -> Result<(), CommandError> {
        match flag {
            "outfile" => self.outfile = non_empty_path(value),
            "exit_code" => self.exit_code = parse_number(flag, &value)?,
            _ => {}
        }
        Ok(())
    }
}

impl Settings {
    /// Resolves the settings of `list-tags`.
    pub fn from_tags_args<F>(args: TagsArgs, lookup: F) -> Result<Self, CommandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::from_common(args.common);
        settings.apply_env(COMMON_FLAGS, &lookup)?;
        Ok(settings)
    }

    fn from_common(args: CommonArgs) -> Self {
        Self {
            image: args.image,
            username: args.username,
            username_file: args.username_file,
            password: args.password,
            password_file: args.password_file,
            config: args.config,
            format: OutputFormat::from(args.format.as_str()),
            verbosity: VerbosityLevel::from_count(args.verbose),
            color: ColorChoice::from(args.color.as_str()),
        }
    }

    fn apply_env<F>(&mut self, flags: &[&str], lookup: &F) -> Result<(), CommandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for flag in flags {
            if let Some(value) = lookup(&env_key(flag)) {
                self.set(flag, value)?;
            }
        }
        Ok(())
    }

    fn set(&mut self, flag: &str, value: String) -> Result<(), CommandError> {
        match flag {
            "image" => self.image = value,
            "username" => self.username = value,
            "username_file" => self.username_file = non_empty_path(value),
            "password" => self.password = value,
            "password_file" => self.password_file = non_empty_path(value),
            "config" => self.config = non_empty_path(value),
            "format" => self.format = OutputFormat::from(value.as_str()),
            "verbose" => self.verbosity = VerbosityLevel::from_count(parse_verbose(&value)?),
            "color" => self.color = ColorChoice::from(value.as_str()),
            _ => {}
        }
        Ok(())
    }

    /// Output context for these settings.
    pub fn context(&self) -> AppContext {
        AppContext::build(self.color, self.verbosity)
    }

    /// Builds the registry credentials.
    ///
    /// A credential file replaces the literal value; one trailing line
    /// ending is stripped from its contents.
    pub fn credentials(&self) -> Result<Credentials, CommandError> {
        let username = match &self.username_file {
            Some(path) => read_secret(path)?,
            None => self.username.clone(),
        };
        let password = match &self.password_file {
            Some(path) => read_secret(path)?,
            None => self.password.clone(),
        };
        Ok(Credentials::from_parts(&username, &password))
    }

    /// Loads the configuration file.
    ///
    /// An explicit `--config` must exist. Otherwise
    /// `<config dir>/tagcheck/config.yaml` is used when present, and the
    /// defaults when not.
    pub fn load_config(&self) -> Result<Config, CommandError> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => default_config_path().filter(|p| p.is_file()),
        };
        Ok(Config::load(path.as_deref())?)
    }
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tagcheck").join("config.yaml"))
}

fn non_empty_path(value: String) -> Option<PathBuf> {
    if value.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn parse_number<T: FromStr>(flag: &str, value: &str) -> Result<T, CommandError> {
    value.trim().parse::<T>().map_err(|_| {
        CommandError::Input(format!(
            "Invalid value '{}' for {}: expected a number",
            value,
            env_key(flag)
        ))
    })
}

fn parse_verbose(value: &str) -> Result<u8, CommandError> {
    match value.trim().to_lowercase().as_str() {
        "" | "false" => Ok(0),
        "true" => Ok(1),
        _ => parse_number("verbose", value),
    }
}

fn read_secret(path: &Path) -> Result<String, CommandError> {
    let content = fs::read_to_string(path)
        .map_err(|e| TagCheckError::io(path.display().to_string(), e))?;
    Ok(strip_line_ending(content))
}

/// Removes one trailing `\n` or `\r\n`.
fn strip_line_ending(mut value: String) -> String {
    if value.ends_with('\n') {
        value.pop();
        if value.ends_with('\r') {
            value.pop();
        }
    }
    value
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

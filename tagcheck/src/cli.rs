//! Command-line flags of the two binaries.
//!
//! Flag names keep the underscore spelling (`--username_file`) so that each
//! flag maps onto a `PLUGIN_<NAME>` environment variable.

use clap::{Args, Parser};
use std::path::PathBuf;

/// Flags shared by `image-exists` and `list-tags`
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Image reference, e.g. alpine:3.19 or registry.example.com/team/app:v1
    #[arg(long, default_value = "")]
    pub image: String,

    /// Registry username
    #[arg(long, default_value = "")]
    pub username: String,

    /// Read the username from this file (takes precedence over --username)
    #[arg(long = "username_file")]
    pub username_file: Option<PathBuf>,

    /// Registry password
    #[arg(long, default_value = "")]
    pub password: String,

    /// Read the password from this file (takes precedence over --password)
    #[arg(long = "password_file")]
    pub password_file: Option<PathBuf>,

    /// Configuration file (YAML) with mirrors, insecure registries and timeout
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, yaml
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Control colored output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,
}

/// Check whether an image tag exists in its registry
#[derive(Parser, Debug, Clone)]
#[command(name = "image-exists")]
#[command(version, about, long_about = None)]
pub struct ExistsArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Create this (empty) file when the image exists
    #[arg(long)]
    pub outfile: Option<PathBuf>,

    /// Exit code to use when the image does not exist
    #[arg(long = "exit_code", default_value_t = 0, allow_negative_numbers = true)]
    pub exit_code: i32,
}

/// List all tags of an image repository
#[derive(Parser, Debug, Clone)]
#[command(name = "list-tags")]
#[command(version, about, long_about = None)]
pub struct TagsArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

use super::{CommandError, FAILURE_EXIT_CODE, Outcome, block_on, finish, report_failures};
use crate::cli::ExistsArgs;
use crate::context::{AppContext, VerbosityLevel};
use crate::format::{self, Formattable};
use crate::settings::ExistsSettings;
use crate::version::get_version_string;
use humansize::{BINARY, format_size};
use libtagcheck::{Reference, Resolution, TagCheck, TagDescriptor};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Found tag, as printed on stdout
#[derive(Debug, Clone, Serialize)]
pub struct TagReport {
    pub image: String,
    pub tag: String,
    pub digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub endpoint: String,
}

impl TagReport {
    pub fn new(reference: &Reference, descriptor: TagDescriptor, endpoint: String) -> Self {
        Self {
            image: reference.to_string(),
            tag: descriptor.tag,
            digest: descriptor.digest,
            media_type: descriptor.media_type,
            size: descriptor.size,
            endpoint,
        }
    }
}

impl Formattable for TagReport {
    fn format_pretty(&self) -> String {
        let mut lines = vec![
            self.image.clone(),
            format!("  Digest:     {}", self.digest),
        ];
        if let Some(media_type) = &self.media_type {
            lines.push(format!("  Media type: {}", media_type));
        }
        if let Some(size) = self.size {
            lines.push(format!("  Size:       {}", format_size(size, BINARY)));
        }
        lines.push(format!("  Endpoint:   {}", self.endpoint));
        lines.join("\n")
    }
}

/// Entry point of the `image-exists` binary; returns the exit code.
pub fn execute<F>(args: ExistsArgs, lookup: F) -> i32
where
    F: Fn(&str) -> Option<String>,
{
    let settings = match ExistsSettings::from_args(args, lookup) {
        Ok(settings) => settings,
        Err(err) => {
            format::error(&AppContext::default(), &err.to_string());
            return FAILURE_EXIT_CODE;
        }
    };

    let ctx = settings.common.context();
    format::print(&ctx, VerbosityLevel::Trace, &get_version_string());
    let result = block_on(run(&ctx, &settings)).and_then(|result| result);
    finish(&ctx, result, settings.exit_code)
}

/// Checks whether the image's tag exists.
///
/// The reference is validated before anything else; no configuration or
/// credential file is read and no endpoint is contacted for an image
/// without a tag.
pub async fn run(ctx: &AppContext, settings: &ExistsSettings) -> Result<Outcome, CommandError> {
    let common = &settings.common;
    let reference: Reference = common.image.parse()?;
    reference.require_tag()?;

    let config = common.load_config()?;
    let checker = TagCheck::builder()
        .with_config(&config)
        .with_credentials(common.credentials()?)
        .build();

    format::print(
        ctx,
        VerbosityLevel::Verbose,
        &format!("Checking {}", reference),
    );
    if ctx.shows(VerbosityLevel::VeryVerbose) {
        for endpoint in checker.endpoints(&reference)? {
            format::print(
                ctx,
                VerbosityLevel::VeryVerbose,
                &format!("Endpoint: {}", endpoint),
            );
        }
    }

    let spinner = format::spinner(ctx, &format!("Checking {}...", reference));
    let resolution = checker.check_reference(&reference).await;
    spinner.finish_and_clear();

    match resolution? {
        Resolution::Found {
            endpoint,
            value,
            failures,
        } => {
            report_failures(ctx, &failures, VerbosityLevel::Verbose);

            let report = TagReport::new(&reference, value, endpoint);
            let output = format::format_output(&report, common.format)
                .map_err(CommandError::Input)?;
            println!("{}", output);

            if let Some(path) = &settings.outfile {
                write_marker(path)?;
                format::print(
                    ctx,
                    VerbosityLevel::Verbose,
                    &format!("Wrote {}", path.display()),
                );
            }
            format::success(ctx, "Image found");
            Ok(Outcome::Found)
        }
        Resolution::Absent {
            endpoint,
            error,
            failures,
        } => {
            report_failures(ctx, &failures, VerbosityLevel::Verbose);
            format::print(
                ctx,
                VerbosityLevel::Verbose,
                &format!("{}: {}", endpoint, error),
            );
            format::error(ctx, "Image not found");
            Ok(Outcome::Absent)
        }
        Resolution::Exhausted { failures } => {
            format::error(ctx, &format!("No reachable endpoint for {}", reference));
            report_failures(ctx, &failures, VerbosityLevel::Normal);
            Ok(Outcome::Exhausted)
        }
    }
}

/// Creates (or truncates) the empty marker file.
fn write_marker(path: &Path) -> Result<(), CommandError> {
    fs::write(path, b"")
        .map_err(|e| libtagcheck::TagCheckError::io(path.display().to_string(), e))?;
    Ok(())
}

#[cfg(test)]
#[path = "exists_tests.rs"]
mod tests;

use super::{
    CommandError, FAILURE_EXIT_CODE, LIST_ABSENT_EXIT_CODE, Outcome, block_on, finish,
    report_failures,
};
use crate::cli::TagsArgs;
use crate::context::{AppContext, VerbosityLevel};
use crate::format;
use crate::settings::Settings;
use crate::version::get_version_string;
use libtagcheck::{Reference, Resolution, TagCheck};

/// Entry point of the `list-tags` binary; returns the exit code.
pub fn execute<F>(args: TagsArgs, lookup: F) -> i32
where
    F: Fn(&str) -> Option<String>,
{
    let settings = match Settings::from_tags_args(args, lookup) {
        Ok(settings) => settings,
        Err(err) => {
            format::error(&AppContext::default(), &err.to_string());
            return FAILURE_EXIT_CODE;
        }
    };

    let ctx = settings.context();
    format::print(&ctx, VerbosityLevel::Trace, &get_version_string());
    let result = block_on(run(&ctx, &settings)).and_then(|result| result);
    finish(&ctx, result, LIST_ABSENT_EXIT_CODE)
}

/// Prints every tag of the image's repository, in registry order.
pub async fn run(ctx: &AppContext, settings: &Settings) -> Result<Outcome, CommandError> {
    let reference: Reference = settings.image.parse()?;

    let config = settings.load_config()?;
    let checker = TagCheck::builder()
        .with_config(&config)
        .with_credentials(settings.credentials()?)
        .build();

    format::print(
        ctx,
        VerbosityLevel::Verbose,
        &format!("Listing tags for {}/{}", reference.domain(), reference.repository()),
    );

    let spinner = format::spinner(ctx, "Fetching tags...");
    let resolution = checker.list_reference(&reference).await;
    spinner.finish_and_clear();

    match resolution? {
        Resolution::Found {
            endpoint,
            value: tags,
            failures,
        } => {
            report_failures(ctx, &failures, VerbosityLevel::Verbose);
            format::print(
                ctx,
                VerbosityLevel::Verbose,
                &format!("Found {} tags on {}", tags.len(), endpoint),
            );

            let output =
                format::format_output_vec(&tags, settings.format).map_err(CommandError::Input)?;
            if !output.is_empty() {
                println!("{}", output);
            }
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
            format::error(ctx, "Repository not found");
            Ok(Outcome::Absent)
        }
        Resolution::Exhausted { failures } => {
            format::error(
                ctx,
                &format!(
                    "No reachable endpoint for {}/{}",
                    reference.domain(),
                    reference.repository()
                ),
            );
            report_failures(ctx, &failures, VerbosityLevel::Normal);
            Ok(Outcome::Exhausted)
        }
    }
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tests;

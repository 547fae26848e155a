use crate::{
    config::{ConfigError, Settings},
    errors::{FileOperation, IoError},
    manifest::{Manifest, ManifestError},
    operator::{FailurePolicy, ImageOperator, Invocation, OperatorError, ToolOperator},
    plan::Plan,
    preview::{preview_as_tree, preview_commands},
    prompt::{self, PromptError},
};
use std::{
    io::{self, Write},
    path::Path,
};

const STDOUT: &str = "<stdout>";

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ImgfillError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Operator(#[from] OperatorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),
}

/// Counts from a finished run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub directories: usize,
    pub files: usize,
    pub listings: usize,
    /// Tool calls that exited unsuccessfully and were let through by the failure policy.
    pub failures: usize,
}

/// How a populate run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed(Summary),
    /// The user declined the preview, the image was not touched.
    Canceled,
}

fn tally(
    policy: FailurePolicy,
    invocation: &Invocation,
    summary: &mut Summary,
) -> Result<(), OperatorError> {
    policy.check(invocation)?;

    if !invocation.succeeded() {
        summary.failures += 1;
    }

    Ok(())
}

fn write_listing<W: Write>(out: &mut W, dir: &str, listing: &[u8]) -> io::Result<()> {
    writeln!(out, "{}", dir)?;
    out.write_all(listing)
}

/// Runs a plan against an image: creates every directory, then copies every file, then
/// lists every directory into `out`, each listing preceded by the directory path.
///
/// Each phase finishes before the next starts and every call blocks until the tool exits.
///
/// # Errors
///
/// Returns an [`ImgfillError`] if:
///
/// - The tool cannot be launched.
/// - A tool call fails and `policy` is [`FailurePolicy::Abort`].
/// - The listing cannot be written to `out`.
pub fn apply_plan<O, W>(
    plan: &Plan,
    operator: &mut O,
    policy: FailurePolicy,
    out: &mut W,
) -> Result<Summary, ImgfillError>
where
    O: ImageOperator + ?Sized,
    W: Write,
{
    let mut summary = Summary::default();

    log::info!("creating {} directories", plan.directories.len());
    for dir in &plan.directories {
        let invocation = operator.mkdir(dir)?;
        tally(policy, &invocation, &mut summary)?;
        summary.directories += 1;
    }

    log::info!("copying {} files", plan.entries.len());
    for entry in &plan.entries {
        let invocation = operator.copy(&entry.source, &entry.destination)?;
        tally(policy, &invocation, &mut summary)?;
        summary.files += 1;
    }

    log::info!("listing {} directories", plan.directories.len());
    for dir in &plan.directories {
        let invocation = operator.list(dir)?;
        tally(policy, &invocation, &mut summary)?;

        write_listing(out, dir, &invocation.stdout)
            .map_err(|error| IoError::new(FileOperation::WriteListing, STDOUT, error))?;
        summary.listings += 1;
    }

    out.flush()
        .map_err(|error| IoError::new(FileOperation::WriteListing, STDOUT, error))?;

    if summary.failures > 0 {
        log::warn!("{} tool calls failed and were ignored", summary.failures);
    }

    Ok(summary)
}

/// Populates the image named by `settings` from its manifest using the configured tool.
///
/// With `confirm`, the plan is previewed and the user asked before the image is touched.
///
/// # Errors
///
/// Returns an [`ImgfillError`] if:
///
/// - A required location is missing from `settings`.
/// - The manifest cannot be read.
/// - The user prompt fails.
/// - Running the plan fails, see [`apply_plan`].
pub fn populate(settings: Settings, confirm: bool) -> Result<Outcome, ImgfillError> {
    let config = settings.into_config()?;

    log::debug!("populating with config: {:?}", config);

    let manifest = Manifest::from_file(&config.manifest)?;

    let plan = Plan::build(manifest, config.ordering);

    if confirm {
        preview_as_tree(&plan, &config.image);

        if !prompt::confirm_populate(&config.image)? {
            log::info!("canceled, {} left untouched", config.image.display());
            return Ok(Outcome::Canceled);
        }
    }

    let mut operator = ToolOperator::new(&config.tool, &config.image, config.root_marker);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = apply_plan(&plan, &mut operator, config.failure_policy, &mut out)?;

    log::info!(
        "populated {}: {} directories, {} files",
        config.image.display(),
        summary.directories,
        summary.files
    );

    Ok(Outcome::Completed(summary))
}

/// Prints what [`populate`] would do without running the tool.
///
/// Only the manifest location is required. Missing image or tool locations are shown as
/// placeholders in the printed commands.
///
/// # Errors
///
/// Returns an [`ImgfillError`] if the manifest location is missing or unreadable.
pub fn plan(settings: Settings) -> Result<Plan, ImgfillError> {
    let manifest = Manifest::from_file(settings.manifest()?)?;

    let plan = Plan::build(manifest, settings.ordering());

    let image = settings.image.as_deref().unwrap_or(Path::new("<image>"));
    let tool = settings.tool.as_deref().unwrap_or(Path::new("<tool>"));

    preview_as_tree(&plan, image);

    preview_commands(&plan.commands(settings.root_marker()), tool, image);

    Ok(plan)
}

use inquire::Confirm;
use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PromptError {
    #[error("Error occurred trying to prompt user")]
    #[diagnostic(code(imgfill::prompt::inquire))]
    Inquire(#[from] inquire::InquireError),
}

/// Asks whether the previewed plan should be written into `image`. Defaults to no.
pub fn confirm_populate(image: &Path) -> Result<bool, PromptError> {
    let message = format!("Write these changes into {}?", image.display());

    let answer = Confirm::new(&message)
        .with_default(false)
        .with_help_message("Every tool call is final, nothing is rolled back")
        .prompt()?;

    Ok(answer)
}

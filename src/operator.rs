use miette::Diagnostic;
use std::{
    fmt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum OperatorError {
    #[error("unable to launch image tool '{}'", .program.display())]
    #[diagnostic(
        code(imgfill::operator::launch),
        help("Make sure the tool path is correct and the file is executable")
    )]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image tool exited with {status}: {command}")]
    #[diagnostic(
        code(imgfill::operator::failed),
        help("Drop --strict (or set on_failure = \"ignore\") to carry on past tool failures")
    )]
    Failed { command: String, status: String },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// What to do when the image tool runs but exits unsuccessfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log a warning and keep going.
    #[default]
    Ignore,
    /// Stop the run with [`OperatorError::Failed`].
    Abort,
}
impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Abort => "abort",
        }
    }

    pub fn check(&self, invocation: &Invocation) -> Result<(), OperatorError> {
        if invocation.succeeded() {
            return Ok(());
        }

        match self {
            Self::Ignore => {
                log::warn!(
                    "ignoring failure ({}): {}",
                    describe_exit(invocation.code),
                    invocation.command
                );
                Ok(())
            }
            Self::Abort => Err(OperatorError::Failed {
                command: invocation.command.clone(),
                status: describe_exit(invocation.code),
            }),
        }
    }
}
impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "abort" => Ok(Self::Abort),
            other => Err(other.to_string()),
        }
    }
}
impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    Mkdir,
    Copy,
    List,
}
impl Subcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mkdir => "mkdir",
            Self::Copy => "cp",
            Self::List => "ls",
        }
    }
}

/// One tool call, minus the tool and image which are fixed for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub subcommand: Subcommand,
    pub args: Vec<String>,
}
impl ToolCommand {
    /// `mkdir <marker><dir>`, `dir` being a normalized directory such as `/a/b`.
    pub fn mkdir(marker: &str, dir: &str) -> Self {
        Self {
            subcommand: Subcommand::Mkdir,
            args: vec![format!("{}{}", marker, dir)],
        }
    }

    /// `cp <source> <marker>/<destination>`.
    pub fn copy(marker: &str, source: &str, destination: &str) -> Self {
        Self {
            subcommand: Subcommand::Copy,
            args: vec![
                source.to_string(),
                format!("{}/{}", marker, destination.trim_start_matches('/')),
            ],
        }
    }

    /// `ls <marker><dir>`.
    pub fn list(marker: &str, dir: &str) -> Self {
        Self {
            subcommand: Subcommand::List,
            args: vec![format!("{}{}", marker, dir)],
        }
    }

    /// The full command line as it would be typed in a shell.
    pub fn render(&self, tool: &Path, image: &Path) -> String {
        let mut line = format!(
            "{} {} {}",
            tool.display(),
            image.display(),
            self.subcommand.as_str()
        );

        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }

        line
    }
}

/// Result of one finished tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Rendered command line, for logs and errors.
    pub command: String,
    /// Exit code, `None` if the tool was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
}
impl Invocation {
    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }
}

/// The three operations a run performs on an image.
///
/// Calls block until the underlying tool exits. An `Err` means the operation could not be
/// attempted at all; an unsuccessful exit is reported through [`Invocation::code`] and left
/// to the caller's [`FailurePolicy`].
pub trait ImageOperator {
    fn mkdir(&mut self, dir: &str) -> Result<Invocation, OperatorError>;
    fn copy(&mut self, source: &str, destination: &str) -> Result<Invocation, OperatorError>;
    fn list(&mut self, dir: &str) -> Result<Invocation, OperatorError>;
}

/// Runs `<tool> <image> <subcommand> <args...>` as a child process for every operation.
#[derive(Debug, Clone)]
pub struct ToolOperator {
    tool: PathBuf,
    image: PathBuf,
    marker: String,
}
impl ToolOperator {
    pub fn new(
        tool: impl Into<PathBuf>,
        image: impl Into<PathBuf>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            image: image.into(),
            marker: marker.into(),
        }
    }

    fn run(&self, command: ToolCommand) -> Result<Invocation, OperatorError> {
        let rendered = command.render(&self.tool, &self.image);

        log::debug!("running: {}", rendered);

        // stderr goes straight to the terminal, stdout is kept for the listing
        let output = Command::new(&self.tool)
            .arg(&self.image)
            .arg(command.subcommand.as_str())
            .args(&command.args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|error| OperatorError::Launch {
                program: self.tool.clone(),
                source: error,
            })?;

        Ok(Invocation {
            command: rendered,
            code: output.status.code(),
            stdout: output.stdout,
        })
    }
}
impl ImageOperator for ToolOperator {
    fn mkdir(&mut self, dir: &str) -> Result<Invocation, OperatorError> {
        self.run(ToolCommand::mkdir(&self.marker, dir))
    }

    fn copy(&mut self, source: &str, destination: &str) -> Result<Invocation, OperatorError> {
        self.run(ToolCommand::copy(&self.marker, source, destination))
    }

    fn list(&mut self, dir: &str) -> Result<Invocation, OperatorError> {
        self.run(ToolCommand::list(&self.marker, dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(code: Option<i32>) -> Invocation {
        Invocation {
            command: "minfs img mkdir ::/a".to_string(),
            code,
            stdout: Vec::new(),
        }
    }

    #[test]
    fn builds_marked_arguments() {
        assert_eq!(ToolCommand::mkdir("::", "/a/b").args, vec!["::/a/b"]);
        assert_eq!(ToolCommand::list("::", "/a").args, vec!["::/a"]);
        assert_eq!(
            ToolCommand::copy("::", "out/libc.so", "lib/libc.so").args,
            vec!["out/libc.so", "::/lib/libc.so"]
        );
        assert_eq!(
            ToolCommand::copy("::", "out/libc.so", "/lib/libc.so").args,
            vec!["out/libc.so", "::/lib/libc.so"]
        );
    }

    #[test]
    fn renders_full_command_line() {
        let line = ToolCommand::copy("::", "src.bin", "bin/app")
            .render(Path::new("tools/minfs"), Path::new("minfs.img"));

        assert_eq!(line, "tools/minfs minfs.img cp src.bin ::/bin/app");
    }

    #[test]
    fn ignore_policy_lets_failures_through() {
        assert!(FailurePolicy::Ignore.check(&invocation(Some(1))).is_ok());
        assert!(FailurePolicy::Ignore.check(&invocation(None)).is_ok());
    }

    #[test]
    fn abort_policy_stops_on_failure() {
        assert!(FailurePolicy::Abort.check(&invocation(Some(0))).is_ok());
        assert!(matches!(
            FailurePolicy::Abort.check(&invocation(Some(2))),
            Err(OperatorError::Failed { status, .. }) if status == "status 2"
        ));
    }

    #[test]
    fn failure_policy_from_str() {
        assert_eq!("ignore".parse::<FailurePolicy>(), Ok(FailurePolicy::Ignore));
        assert_eq!("ABORT".parse::<FailurePolicy>(), Ok(FailurePolicy::Abort));
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn missing_tool_fails_to_launch() {
        let dir = tempfile::tempdir().unwrap();
        let mut operator = ToolOperator::new(dir.path().join("no-such-tool"), "img", "::");

        assert!(matches!(
            operator.mkdir("/a"),
            Err(OperatorError::Launch { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn passes_image_subcommand_and_arguments_to_tool() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-tool");
        std::fs::write(&tool, "#!/bin/sh\necho \"$@\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut operator = ToolOperator::new(&tool, "minfs.img", "::");
        let result = operator.copy("out/sh", "bin/sh").unwrap();

        assert!(result.succeeded());
        assert_eq!(
            String::from_utf8_lossy(&result.stdout),
            "minfs.img cp out/sh ::/bin/sh\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn reports_exit_code_of_failing_tool() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("failing-tool");
        std::fs::write(&tool, "#!/bin/sh\nexit 3\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut operator = ToolOperator::new(&tool, "minfs.img", "::");
        let result = operator.mkdir("/a").unwrap();

        assert!(!result.succeeded());
        assert_eq!(result.code, Some(3));
    }
}

use crate::{
    errors::{FileOperation, IoError},
    operator::FailurePolicy,
};
use dirplan::{errors::ParseOrderingError, Ordering};
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Prefix the image tool uses for paths inside the image.
pub const DEFAULT_ROOT_MARKER: &str = "::";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(imgfill::config::io))]
    Io(#[from] IoError),

    #[error("Unable to parse toml file at '{}': {source}", .path.display())]
    #[diagnostic(code(imgfill::config::parse_toml), help("Review toml file"))]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required setting: {key}")]
    #[diagnostic(
        code(imgfill::config::missing),
        help("Pass it with --{key} or set `{key}` in the config file")
    )]
    Missing { key: &'static str },

    #[error("invalid ordering: {value}")]
    #[diagnostic(
        code(imgfill::config::invalid_ordering),
        help("Valid orderings are: ['length', 'depth']")
    )]
    InvalidOrdering {
        value: String,
        #[source]
        source: ParseOrderingError,
    },

    #[error("invalid failure policy: {value}")]
    #[diagnostic(
        code(imgfill::config::invalid_failure_policy),
        help("Valid policies are: ['ignore', 'abort']")
    )]
    InvalidFailurePolicy { value: String },
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    manifest: Option<PathBuf>,
    image: Option<PathBuf>,
    tool: Option<PathBuf>,
    root_marker: Option<String>,
    ordering: Option<String>,
    on_failure: Option<String>,
}

/// A partial set of settings from one source (config file or command line).
///
/// Sources are stacked with [`Settings::layer`] and turned into a [`Config`] once every
/// required location is known.
#[derive(Debug, Default, Clone)]
pub struct Settings {
    pub manifest: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub tool: Option<PathBuf>,
    pub root_marker: Option<String>,
    pub ordering: Option<Ordering>,
    pub failure_policy: Option<FailurePolicy>,
}
impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::ReadConfig, path, error))?;

        let parsed: ConfigFile =
            toml::from_str(&content).map_err(|err| ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })?;

        log::debug!("loaded config file: {}", path.display());

        Ok(Settings {
            manifest: parsed.manifest,
            image: parsed.image,
            tool: parsed.tool,
            root_marker: parsed.root_marker,
            ordering: parsed.ordering.as_deref().map(parse_ordering).transpose()?,
            failure_policy: parsed
                .on_failure
                .as_deref()
                .map(parse_failure_policy)
                .transpose()?,
        })
    }

    /// Stacks `over` on top of `self`: every setting present in `over` wins.
    pub fn layer(self, over: Settings) -> Settings {
        Settings {
            manifest: over.manifest.or(self.manifest),
            image: over.image.or(self.image),
            tool: over.tool.or(self.tool),
            root_marker: over.root_marker.or(self.root_marker),
            ordering: over.ordering.or(self.ordering),
            failure_policy: over.failure_policy.or(self.failure_policy),
        }
    }

    pub fn manifest(&self) -> Result<&Path, ConfigError> {
        self.manifest
            .as_deref()
            .ok_or(ConfigError::Missing { key: "manifest" })
    }

    pub fn root_marker(&self) -> &str {
        self.root_marker.as_deref().unwrap_or(DEFAULT_ROOT_MARKER)
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering.unwrap_or_default()
    }

    pub fn into_config(self) -> Result<Config, ConfigError> {
        let manifest = self.manifest()?.to_path_buf();
        let root_marker = self.root_marker().to_string();
        let ordering = self.ordering();

        Ok(Config {
            manifest,
            image: self.image.ok_or(ConfigError::Missing { key: "image" })?,
            tool: self.tool.ok_or(ConfigError::Missing { key: "tool" })?,
            root_marker,
            ordering,
            failure_policy: self.failure_policy.unwrap_or_default(),
        })
    }
}

/// Everything a populate run needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Manifest of `DEST=SRC` lines.
    pub manifest: PathBuf,
    /// Preformatted image file the tool writes into.
    pub image: PathBuf,
    /// The image tool binary.
    pub tool: PathBuf,
    pub root_marker: String,
    pub ordering: Ordering,
    pub failure_policy: FailurePolicy,
}

pub fn parse_ordering(value: &str) -> Result<Ordering, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::InvalidOrdering {
            value: value.to_string(),
            source,
        })
}

pub fn parse_failure_policy(value: &str) -> Result<FailurePolicy, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidFailurePolicy {
            value: value.to_string(),
        })
}

use crate::config::profiles;
use crate::config::schema::{RuleConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    UnknownProfile {
        name: String,
        suggestion: Option<&'static str>,
    },
    EmptyDirectory {
        path: PathBuf,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read rule config from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule config ({}): {}", path.display(), source),
                None => write!(f, "invalid rule config: {}", source),
            },
            ConfigError::UnknownProfile { name, suggestion } => {
                write!(f, "unknown profile '{name}'")?;
                match suggestion {
                    Some(s) => write!(f, " (did you mean '{s}'?)"),
                    None => write!(f, " (available: {})", profiles::names().join(", ")),
                }
            }
            ConfigError::EmptyDirectory { path } => {
                write!(f, "no .toml rule files found in {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RuleConfig, ConfigError> {
    let config: RuleConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

/// Load a rule file, or every `*.toml` in a directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleConfig, ConfigError> {
    let path = path.as_ref();
    if path.is_dir() {
        return load_from_dir(path);
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load every `*.toml` directly inside `dir` in file-name order.
///
/// Rule sets are concatenated; metadata comes from the first file. The merged
/// config is validated as a whole so rule names stay unique across files.
pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<RuleConfig, ConfigError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ConfigError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ConfigError::EmptyDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut merged: Option<RuleConfig> = None;
    for file in &files {
        let contents = fs::read_to_string(file).map_err(|source| ConfigError::Io {
            path: file.clone(),
            source,
        })?;
        let config: RuleConfig = toml_edit::de::from_str(&contents).map_err(|source| {
            ConfigError::Toml {
                path: Some(file.clone()),
                source,
            }
        })?;
        match merged.as_mut() {
            None => merged = Some(config),
            Some(acc) => acc.rule_sets.extend(config.rule_sets),
        }
    }

    let merged = merged.unwrap_or_default();
    merged
        .validate()
        .map_err(|source| ConfigError::Validation {
            path: Some(dir.to_path_buf()),
            source,
        })?;
    Ok(merged)
}

/// Load one of the embedded profiles by name.
pub fn load_profile(name: &str) -> Result<RuleConfig, ConfigError> {
    let Some(source) = profiles::source(name) else {
        return Err(ConfigError::UnknownProfile {
            name: name.to_string(),
            suggestion: profiles::closest(name),
        });
    };
    load_from_str(source)
}

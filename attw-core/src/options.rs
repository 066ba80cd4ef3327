//! Option normalization: CLI flags, config file, environment, and defaults.
//!
//! Precedence, highest first: CLI flags, the color-disable environment
//! signal, the config file, built-in defaults. Each source is expressed as
//! a [`PartialOptions`] layer and the stack is collapsed exactly once into
//! an immutable [`Options`] record.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classify::IgnoreSet;
use crate::error::{AttwError, Result};
use crate::fs::FileSystem;
use crate::problem::ProblemKind;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = ".attw.json";

/// One layer of options where every field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartialOptions {
    /// Exit non-zero when unignored problems exist.
    pub strict: Option<bool>,
    /// Suppress standard output.
    pub quiet: Option<bool>,
    /// Emit raw JSON.
    pub raw: Option<bool>,
    /// One block per entry point instead of a grid.
    pub vertical: Option<bool>,
    /// Swap table rows and columns.
    pub flipped: Option<bool>,
    /// Print the per-kind summary block.
    pub summary: Option<bool>,
    /// Use emoji glyphs.
    pub emoji: Option<bool>,
    /// Use ANSI colors.
    pub color: Option<bool>,
    /// Rule names to ignore.
    #[serde(alias = "ignore")]
    pub ignore_rules: Option<Vec<String>>,
}

impl PartialOptions {
    /// Fill every unset field of `self` from `lower`.
    pub fn layer_over(self, lower: PartialOptions) -> PartialOptions {
        PartialOptions {
            strict: self.strict.or(lower.strict),
            quiet: self.quiet.or(lower.quiet),
            raw: self.raw.or(lower.raw),
            vertical: self.vertical.or(lower.vertical),
            flipped: self.flipped.or(lower.flipped),
            summary: self.summary.or(lower.summary),
            emoji: self.emoji.or(lower.emoji),
            color: self.color.or(lower.color),
            ignore_rules: self.ignore_rules.or(lower.ignore_rules),
        }
    }

    /// Apply defaults and validate ignore rules.
    pub fn finish(self, config_path: Option<PathBuf>) -> Result<Options> {
        let ignore_rules = resolve_ignore_rules(self.ignore_rules.as_deref().unwrap_or_default())?;
        Ok(Options {
            strict: self.strict.unwrap_or(false),
            quiet: self.quiet.unwrap_or(false),
            raw: self.raw.unwrap_or(false),
            vertical: self.vertical.unwrap_or(false),
            flipped: self.flipped.unwrap_or(false),
            summary: self.summary.unwrap_or(true),
            emoji: self.emoji.unwrap_or(true),
            color: self.color.unwrap_or(true),
            ignore_rules,
            config_path,
        })
    }
}

/// Fully resolved options; read-only after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Exit non-zero when unignored problems exist.
    pub strict: bool,
    /// Suppress standard output.
    pub quiet: bool,
    /// Emit raw JSON.
    pub raw: bool,
    /// One block per entry point instead of a grid.
    pub vertical: bool,
    /// Swap table rows and columns.
    pub flipped: bool,
    /// Print the per-kind summary block.
    pub summary: bool,
    /// Use emoji glyphs.
    pub emoji: bool,
    /// Use ANSI colors.
    pub color: bool,
    /// Problem kinds excluded from strict-mode reporting.
    pub ignore_rules: IgnoreSet,
    /// Config file that contributed to these options, if any.
    pub config_path: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strict: false,
            quiet: false,
            raw: false,
            vertical: false,
            flipped: false,
            summary: true,
            emoji: true,
            color: true,
            ignore_rules: IgnoreSet::new(),
            config_path: None,
        }
    }
}

/// Color-related environment, captured once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorEnvironment {
    /// `NO_COLOR` is set to a non-empty value.
    pub no_color: bool,
    /// `FORCE_COLOR` is set to `0`.
    pub force_color_off: bool,
}

impl ColorEnvironment {
    /// Read `NO_COLOR` and `FORCE_COLOR` from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("NO_COLOR").ok().as_deref(),
            std::env::var("FORCE_COLOR").ok().as_deref(),
        )
    }

    /// Build from raw variable values.
    pub fn from_vars(no_color: Option<&str>, force_color: Option<&str>) -> Self {
        Self {
            no_color: no_color.is_some_and(|value| !value.is_empty()),
            force_color_off: force_color.is_some_and(|value| value.trim() == "0"),
        }
    }

    /// Whether the environment asks for colorless output.
    pub fn disables_color(&self) -> bool {
        self.no_color || self.force_color_off
    }

    /// Environment contribution as an options layer.
    pub fn layer(&self) -> PartialOptions {
        PartialOptions {
            color: self.disables_color().then_some(false),
            ..PartialOptions::default()
        }
    }
}

/// A config file that was found and parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    /// Path the config was read from.
    pub path: PathBuf,
    /// Parsed options layer.
    pub options: PartialOptions,
}

/// Loads persisted option defaults.
pub trait ConfigLoader {
    /// Load the explicit config path, or the default one when `None`.
    ///
    /// A missing explicit path is an error; a missing default path is not.
    fn load(&self, explicit: Option<&Path>) -> Result<Option<LoadedConfig>>;
}

/// Reads `.attw.json`-style JSON config files.
#[derive(Debug, Clone)]
pub struct JsonConfigLoader<F: FileSystem> {
    fs: F,
    default_path: PathBuf,
}

impl<F: FileSystem> JsonConfigLoader<F> {
    /// Create a loader that falls back to [`DEFAULT_CONFIG_PATH`].
    pub fn new(fs: F) -> Self {
        Self::with_default_path(fs, PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Create a loader with a custom fallback path.
    pub fn with_default_path(fs: F, default_path: PathBuf) -> Self {
        Self { fs, default_path }
    }

    fn parse(&self, path: &Path) -> Result<PartialOptions> {
        let contents = self.fs.read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|err| {
            AttwError::Usage(format!("invalid config file {}: {err}", path.display()))
        })
    }
}

impl<F: FileSystem> ConfigLoader for JsonConfigLoader<F> {
    fn load(&self, explicit: Option<&Path>) -> Result<Option<LoadedConfig>> {
        let path = match explicit {
            Some(path) => {
                if !self.fs.is_file(path) {
                    return Err(AttwError::Usage(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                path
            }
            None => {
                if !self.fs.is_file(&self.default_path) {
                    log::debug!("no config file at {}", self.default_path.display());
                    return Ok(None);
                }
                self.default_path.as_path()
            }
        };
        log::debug!("loading config from {}", path.display());
        let options = self.parse(path)?;
        Ok(Some(LoadedConfig {
            path: path.to_path_buf(),
            options,
        }))
    }
}

/// Merge all option sources into a validated [`Options`] record.
pub fn normalize_options<L: ConfigLoader + ?Sized>(
    cli: PartialOptions,
    config_path: Option<&Path>,
    env: &ColorEnvironment,
    loader: &L,
) -> Result<Options> {
    let loaded = loader.load(config_path)?;
    let (file_layer, path) = match loaded {
        Some(config) => (config.options, Some(config.path)),
        None => (PartialOptions::default(), None),
    };
    if let Some(names) = &file_layer.ignore_rules {
        resolve_ignore_rules(names).map_err(|err| match (err, &path) {
            (AttwError::Usage(message), Some(path)) => {
                AttwError::Usage(format!("{message} (in {})", path.display()))
            }
            (err, _) => err,
        })?;
    }
    let merged = cli.layer_over(env.layer()).layer_over(file_layer);
    let options = merged.finish(path)?;
    log::debug!("resolved options: {options:?}");
    Ok(options)
}

/// Resolve rule names to problem kinds, failing on the first unknown name.
pub fn resolve_ignore_rules(names: &[String]) -> Result<IgnoreSet> {
    let mut ignore = IgnoreSet::new();
    for name in names {
        match ProblemKind::from_rule_name(name) {
            Some(kind) => {
                ignore.insert(kind);
            }
            None => {
                let expected = ProblemKind::rule_names().collect::<Vec<_>>().join(", ");
                return Err(AttwError::Usage(format!(
                    "unknown ignore rule `{name}`; expected one of: {expected}"
                )));
            }
        }
    }
    Ok(ignore)
}

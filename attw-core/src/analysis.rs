//! Analysis data model produced by the analyzer.
//!
//! An [`Analysis`] is either typed or untyped; the JSON form carries the
//! `containsTypes` discriminant, which is mapped onto the enum tag at the
//! serde boundary so downstream code only ever matches on the variant.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::problem::{Problem, ProblemKind};

/// Module resolution mode an entry point is evaluated under.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResolutionKind {
    /// Legacy `node10` resolution.
    #[serde(rename = "node10")]
    Node10,
    /// `node16` resolution from a CommonJS importer.
    #[serde(rename = "node16-cjs")]
    Node16Cjs,
    /// `node16` resolution from an ESM importer.
    #[serde(rename = "node16-esm")]
    Node16Esm,
    /// Bundler resolution.
    #[serde(rename = "bundler")]
    Bundler,
}

impl ResolutionKind {
    /// Every resolution kind, in column order.
    pub const ALL: [ResolutionKind; 4] = [
        ResolutionKind::Node10,
        ResolutionKind::Node16Cjs,
        ResolutionKind::Node16Esm,
        ResolutionKind::Bundler,
    ];

    /// Label used in table headers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Node10 => "node10",
            Self::Node16Cjs => "node16 (from CJS)",
            Self::Node16Esm => "node16 (from ESM)",
            Self::Bundler => "bundler",
        }
    }
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Module format of a resolved implementation file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// CommonJS.
    Cjs,
    /// ECMAScript module.
    Esm,
    /// JSON module.
    Json,
}

impl ModuleKind {
    /// Short uppercase label, e.g. `ESM`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cjs => "CJS",
            Self::Esm => "ESM",
            Self::Json => "JSON",
        }
    }
}

/// Where a typed package's declarations come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypesSource {
    /// Declarations ship inside the package.
    #[serde(rename = "included")]
    Included,
    /// Declarations come from a DefinitelyTyped `@types` package.
    #[serde(rename = "@types", rename_all = "camelCase")]
    DefinitelyTyped {
        /// `@types` package name.
        package_name: String,
        /// `@types` package version.
        package_version: String,
    },
}

/// A file a resolution landed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFile {
    /// Path inside the package.
    pub file_name: String,
    /// Whether the file is TypeScript (including declarations).
    #[serde(default)]
    pub is_type_script: bool,
    /// Whether the file is JSON.
    #[serde(default)]
    pub is_json: bool,
}

/// Outcome of resolving one entry point under one resolution kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrypointResolution {
    /// Specifier that was resolved.
    pub name: String,
    /// Resolved types file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolvedFile>,
    /// Module format of the resolved implementation, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_kind: Option<ModuleKind>,
}

/// Per-entry-point slice of the analysis matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrypointInfo {
    /// Entry point subpath.
    pub subpath: String,
    /// Whether any resolution of this entry point found types.
    #[serde(default)]
    pub has_types: bool,
    /// Whether the entry point came from a wildcard export.
    #[serde(default)]
    pub is_wildcard: bool,
    /// Resolution outcomes keyed by resolution kind.
    #[serde(default)]
    pub resolutions: IndexMap<ResolutionKind, EntrypointResolution>,
}

/// Analysis of a package that carries type declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedAnalysis {
    /// Package name.
    pub package_name: String,
    /// Package version.
    pub package_version: String,
    /// Where the declarations come from.
    pub types: TypesSource,
    /// Entry point × resolution kind matrix, in analyzer order.
    pub entrypoints: IndexMap<String, EntrypointInfo>,
    /// Problems, in analyzer emission order.
    pub problems: Vec<Problem>,
}

/// Analysis of a package without type declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntypedAnalysis {
    /// Package name.
    pub package_name: String,
    /// Package version.
    pub package_version: String,
}

/// The analyzer's verdict for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnalysis", into = "RawAnalysis")]
pub enum Analysis {
    /// The package ships or references type declarations.
    Typed(TypedAnalysis),
    /// The package has no type declarations.
    Untyped(UntypedAnalysis),
}

impl Analysis {
    /// Whether the package carries types.
    pub fn contains_types(&self) -> bool {
        matches!(self, Self::Typed(_))
    }

    /// Package name.
    pub fn package_name(&self) -> &str {
        match self {
            Self::Typed(typed) => &typed.package_name,
            Self::Untyped(untyped) => &untyped.package_name,
        }
    }

    /// Package version.
    pub fn package_version(&self) -> &str {
        match self {
            Self::Typed(typed) => &typed.package_version,
            Self::Untyped(untyped) => &untyped.package_version,
        }
    }
}

/// Wire form of [`Analysis`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    package_name: String,
    package_version: String,
    contains_types: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    types: Option<TypesSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entrypoints: Option<IndexMap<String, EntrypointInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    problems: Option<Vec<Problem>>,
}

impl TryFrom<RawAnalysis> for Analysis {
    type Error = String;

    fn try_from(raw: RawAnalysis) -> Result<Self, Self::Error> {
        if !raw.contains_types {
            return Ok(Self::Untyped(UntypedAnalysis {
                package_name: raw.package_name,
                package_version: raw.package_version,
            }));
        }
        let types = raw
            .types
            .ok_or_else(|| "typed analysis is missing `types`".to_string())?;
        Ok(Self::Typed(TypedAnalysis {
            package_name: raw.package_name,
            package_version: raw.package_version,
            types,
            entrypoints: raw.entrypoints.unwrap_or_default(),
            problems: raw.problems.unwrap_or_default(),
        }))
    }
}

impl From<Analysis> for RawAnalysis {
    fn from(analysis: Analysis) -> Self {
        match analysis {
            Analysis::Typed(typed) => Self {
                package_name: typed.package_name,
                package_version: typed.package_version,
                contains_types: true,
                types: Some(typed.types),
                entrypoints: Some(typed.entrypoints),
                problems: Some(typed.problems),
            },
            Analysis::Untyped(untyped) => Self {
                package_name: untyped.package_name,
                package_version: untyped.package_version,
                contains_types: false,
                types: None,
                entrypoints: None,
                problems: None,
            },
        }
    }
}

/// Problems grouped by kind; keys and values keep emission order.
pub type GroupedProblems = IndexMap<ProblemKind, Vec<Problem>>;

/// Flat problem list of a typed analysis, in emission order.
pub fn get_problems(analysis: &TypedAnalysis) -> &[Problem] {
    &analysis.problems
}

/// Group problems by kind, preserving emission order within each group.
pub fn group_by_kind(problems: &[Problem]) -> GroupedProblems {
    let mut grouped = GroupedProblems::new();
    for problem in problems {
        grouped
            .entry(problem.kind)
            .or_default()
            .push(problem.clone());
    }
    grouped
}

//! Problem vocabulary: the closed set of problem kinds and their rule names.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::ResolutionKind;

const DOCS_BASE_URL: &str =
    "https://github.com/arethetypeswrong/arethetypeswrong.github.io/blob/main/docs/problems";

/// A kind of mismatch between declared types and runtime module resolution.
///
/// Serialized identifiers are stable; new kinds are only ever appended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemKind {
    /// Import failed to resolve at all.
    #[serde(alias = "NoResolution")]
    NoResolution,
    /// Import resolved to JavaScript without type declarations.
    #[serde(alias = "UntypedResolution")]
    UntypedResolution,
    /// Types are CJS but the JavaScript is ESM.
    #[serde(rename = "false-cjs", alias = "FalseCJS")]
    FalseCjs,
    /// Types are ESM but the JavaScript is CJS.
    #[serde(rename = "false-esm", alias = "FalseESM")]
    FalseEsm,
    /// A `require` resolved to an ESM file.
    #[serde(rename = "cjs-resolves-to-esm", alias = "CJSResolvesToESM")]
    CjsResolvesToEsm,
    /// Types resolved only through a fallback export condition.
    #[serde(alias = "FallbackCondition")]
    FallbackCondition,
    /// CJS module only simulates a default export.
    #[serde(rename = "cjs-only-exports-default", alias = "CJSOnlyExportsDefault")]
    CjsOnlyExportsDefault,
    /// Types declare `export default` for a `module.exports =` module.
    #[serde(alias = "FalseExportDefault")]
    FalseExportDefault,
    /// Types lack the `export =` the JavaScript provides.
    #[serde(alias = "MissingExportEquals")]
    MissingExportEquals,
    /// Module syntax disagrees with the detected module kind.
    #[serde(alias = "UnexpectedModuleSyntax")]
    UnexpectedModuleSyntax,
    /// An import inside a declaration file failed to resolve.
    #[serde(alias = "InternalResolutionError")]
    InternalResolutionError,
    /// Named imports of a CJS module will not exist at runtime.
    #[serde(alias = "NamedExports")]
    NamedExports,
}

/// Static presentation data for one problem kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    /// User-facing rule name accepted by `--ignore`.
    pub rule_name: &'static str,
    /// Name of the upstream documentation page.
    pub doc_page: &'static str,
    /// Glyph shown when emoji output is on.
    pub emoji: &'static str,
    /// Short label used in table cells.
    pub title: &'static str,
    /// One-line explanation used in the summary.
    pub description: &'static str,
}

impl ProblemKind {
    /// Every kind, in vocabulary order.
    pub const ALL: [ProblemKind; 12] = [
        ProblemKind::NoResolution,
        ProblemKind::UntypedResolution,
        ProblemKind::FalseCjs,
        ProblemKind::FalseEsm,
        ProblemKind::CjsResolvesToEsm,
        ProblemKind::FallbackCondition,
        ProblemKind::CjsOnlyExportsDefault,
        ProblemKind::FalseExportDefault,
        ProblemKind::MissingExportEquals,
        ProblemKind::UnexpectedModuleSyntax,
        ProblemKind::InternalResolutionError,
        ProblemKind::NamedExports,
    ];

    /// Presentation data for this kind.
    pub fn info(self) -> KindInfo {
        match self {
            Self::NoResolution => KindInfo {
                rule_name: "no-resolution",
                doc_page: "NoResolution",
                emoji: "💀",
                title: "Resolution failed",
                description: "Import failed to resolve to type declarations or JavaScript files.",
            },
            Self::UntypedResolution => KindInfo {
                rule_name: "untyped-resolution",
                doc_page: "UntypedResolution",
                emoji: "❌",
                title: "No types",
                description: "Import resolved to JavaScript files, but no type declarations were found.",
            },
            Self::FalseCjs => KindInfo {
                rule_name: "false-cjs",
                doc_page: "FalseCJS",
                emoji: "🎭",
                title: "Masquerading as CJS",
                description: "Import resolved to a CommonJS type declaration file, but an ESM JavaScript file.",
            },
            Self::FalseEsm => KindInfo {
                rule_name: "false-esm",
                doc_page: "FalseESM",
                emoji: "👺",
                title: "Masquerading as ESM",
                description: "Import resolved to an ESM type declaration file, but a CommonJS JavaScript file.",
            },
            Self::CjsResolvesToEsm => KindInfo {
                rule_name: "cjs-resolves-to-esm",
                doc_page: "CJSResolvesToESM",
                emoji: "⚠️",
                title: "ESM (dynamic import only)",
                description: "A require call resolved to an ESM JavaScript file, which is an error in Node and some bundlers. CommonJS consumers will need to use a dynamic import.",
            },
            Self::FallbackCondition => KindInfo {
                rule_name: "fallback-condition",
                doc_page: "FallbackCondition",
                emoji: "🐛",
                title: "Used fallback condition",
                description: "Import resolved to types through a conditional package.json export, but only after failing to resolve through an earlier condition.",
            },
            Self::CjsOnlyExportsDefault => KindInfo {
                rule_name: "cjs-only-exports-default",
                doc_page: "CJSOnlyExportsDefault",
                emoji: "🤨",
                title: "CJS default export",
                description: "CommonJS module simulates a default export with exports.default and exports.__esModule, but does not also set module.exports for compatibility with Node.",
            },
            Self::FalseExportDefault => KindInfo {
                rule_name: "false-export-default",
                doc_page: "FalseExportDefault",
                emoji: "❗️",
                title: "Incorrect default export",
                description: "The resolved types use export default where the JavaScript file appears to use module.exports =.",
            },
            Self::MissingExportEquals => KindInfo {
                rule_name: "missing-export-equals",
                doc_page: "MissingExportEquals",
                emoji: "❓",
                title: "Missing `export =`",
                description: "The JavaScript appears to set both module.exports and module.exports.default, but the types only reflect the latter.",
            },
            Self::UnexpectedModuleSyntax => KindInfo {
                rule_name: "unexpected-module-syntax",
                doc_page: "UnexpectedModuleSyntax",
                emoji: "🚭",
                title: "Unexpected module syntax",
                description: "Syntax detected in the module is incompatible with the module kind according to the package.json or file extension.",
            },
            Self::InternalResolutionError => KindInfo {
                rule_name: "internal-resolution-error",
                doc_page: "InternalResolutionError",
                emoji: "🥴",
                title: "Internal resolution error",
                description: "Import found in a type declarations file failed to resolve.",
            },
            Self::NamedExports => KindInfo {
                rule_name: "named-exports",
                doc_page: "NamedExports",
                emoji: "🕵️",
                title: "Named exports",
                description: "TypeScript allows ESM named imports of the properties of this CommonJS module, but they will crash at runtime.",
            },
        }
    }

    /// User-facing rule name accepted by `--ignore`.
    pub fn rule_name(self) -> &'static str {
        self.info().rule_name
    }

    /// Documentation link for this kind.
    pub fn doc_url(self) -> String {
        format!("{DOCS_BASE_URL}/{}.md", self.info().doc_page)
    }

    /// Resolve a user-facing rule name back to its kind.
    pub fn from_rule_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.rule_name().eq_ignore_ascii_case(name))
    }

    /// All rule names, in vocabulary order.
    pub fn rule_names() -> impl Iterator<Item = &'static str> {
        Self::ALL.into_iter().map(Self::rule_name)
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_name())
    }
}

/// A single mismatch detected for one entry point under one resolution kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    /// Kind of mismatch.
    pub kind: ProblemKind,
    /// Entry point subpath, e.g. `.` or `./sub`.
    pub entry_point: String,
    /// Resolution mode the problem was detected under.
    pub resolution_kind: ResolutionKind,
    /// Analyzer-specific details, preserved verbatim.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Problem {
    /// Create a problem without metadata.
    pub fn new(
        kind: ProblemKind,
        entry_point: impl Into<String>,
        resolution_kind: ResolutionKind,
    ) -> Self {
        Self {
            kind,
            entry_point: entry_point.into(),
            resolution_kind,
            metadata: Map::new(),
        }
    }
}

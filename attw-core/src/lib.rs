#![deny(missing_docs)]
//! attw core library.
//!
//! Turns a package analysis (does the package's type declarations agree with
//! how its entry points resolve at runtime?) into a report and a CI verdict.
//! The analysis itself comes from an external [`Analyzer`].

pub mod analysis;
pub mod classify;
pub mod driver;
pub mod error;
pub mod exit;
pub mod fs;
pub mod options;
pub mod pipeline;
pub mod problem;
pub mod report;

pub use analysis::{
    Analysis, EntrypointInfo, EntrypointResolution, GroupedProblems, ModuleKind, ResolutionKind,
    ResolvedFile, TypedAnalysis, TypesSource, UntypedAnalysis, get_problems, group_by_kind,
};
pub use classify::{Classification, IgnoreSet, classify};
pub use driver::{AnalysisRequest, Analyzer, AnalyzerError, AnalyzerFuture, analyze};
pub use error::{AnalysisFailure, AttwError, Result};
pub use exit::{Outcome, decide};
pub use fs::{FileSystem, StdFileSystem};
pub use options::{
    ColorEnvironment, ConfigLoader, DEFAULT_CONFIG_PATH, JsonConfigLoader, LoadedConfig, Options,
    PartialOptions, normalize_options, resolve_ignore_rules,
};
pub use pipeline::{check, report_analysis};
pub use problem::{KindInfo, Problem, ProblemKind};
pub use report::{RenderOptions, render_raw, render_typed, render_untyped};

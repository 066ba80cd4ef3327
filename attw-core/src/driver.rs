//! Analysis driver: selects the analyzer call and normalizes its failures.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::analysis::Analysis;
use crate::error::{AnalysisFailure, AttwError, Result};
use crate::fs::FileSystem;

/// Boxed future returned by [`Analyzer`] methods.
pub type AnalyzerFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Analysis, AnalyzerError>> + Send + 'a>>;

/// Failure reported by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// Fetching the package from the registry failed.
    Fetch {
        /// Failure description.
        message: String,
        /// Fetch error code, e.g. `E404` or `ETIMEDOUT`.
        code: String,
    },
    /// Any other analyzer failure.
    Failed(String),
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { message, code } => write!(f, "{message} ({code})"),
            Self::Failed(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for AnalyzerError {}

impl From<AnalyzerError> for AnalysisFailure {
    fn from(value: AnalyzerError) -> Self {
        match value {
            AnalyzerError::Fetch { message, code } => AnalysisFailure::new(message, code),
            AnalyzerError::Failed(message) => AnalysisFailure::unknown(message),
        }
    }
}

/// External collaborator that inspects a package and returns an [`Analysis`].
pub trait Analyzer {
    /// Analyze a registry package, optionally pinned to a version or tag.
    fn check_package<'a>(&'a self, name: &'a str, version: Option<&'a str>) -> AnalyzerFuture<'a>;

    /// Analyze a package tarball.
    fn check_tgz<'a>(&'a self, tarball: Vec<u8>) -> AnalyzerFuture<'a>;
}

/// What to analyze in this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    /// A package published to the registry.
    Registry {
        /// Package name.
        name: String,
        /// Version or dist-tag; `None` means latest.
        version: Option<String>,
    },
    /// A local package tarball.
    Archive(PathBuf),
}

impl fmt::Display for AnalysisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry {
                name,
                version: Some(version),
            } => write!(f, "{name}@{version}"),
            Self::Registry {
                name,
                version: None,
            } => write!(f, "{name}"),
            Self::Archive(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Run the single analyzer call for `request`.
///
/// Every failure, archive read errors included, surfaces as
/// [`AttwError::Analysis`]. No retries are attempted.
pub async fn analyze<A, F>(request: &AnalysisRequest, analyzer: &A, fs: &F) -> Result<Analysis>
where
    A: Analyzer + ?Sized,
    F: FileSystem + ?Sized,
{
    let outcome = match request {
        AnalysisRequest::Registry { name, version } => {
            log::debug!("analyzing registry package {request}");
            analyzer.check_package(name, version.as_deref()).await
        }
        AnalysisRequest::Archive(path) => {
            log::debug!("analyzing archive {}", path.display());
            let tarball = fs.read(path).map_err(|err| {
                AttwError::Analysis(AnalysisFailure::unknown(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            })?;
            analyzer.check_tgz(tarball).await
        }
    };
    let analysis = outcome.map_err(|err| AttwError::Analysis(err.into()))?;
    log::info!(
        "analyzed {}@{} (types: {})",
        analysis.package_name(),
        analysis.package_version(),
        analysis.contains_types()
    );
    Ok(analysis)
}

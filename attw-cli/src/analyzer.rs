//! External analyzer process wrapper.

use crate::registry::TarballFetcher;
use attw_core::{Analysis, Analyzer, AnalyzerError, AnalyzerFuture, AttwError};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Analyzer executable used when neither `--analyzer` nor `ATTW_ANALYZER` is set.
pub const DEFAULT_ANALYZER: &str = "attw-analyzer";

/// Runs an analyzer executable that reads a tarball on stdin and prints an
/// analysis as JSON on stdout. Registry packages are downloaded first.
pub struct ProcessAnalyzer<T: TarballFetcher> {
    program: String,
    args: Vec<String>,
    fetcher: T,
}

impl<T: TarballFetcher> ProcessAnalyzer<T> {
    /// Create an analyzer for an explicit program and argument list.
    pub fn new(program: impl Into<String>, args: Vec<String>, fetcher: T) -> Self {
        Self {
            program: program.into(),
            args,
            fetcher,
        }
    }

    /// Create an analyzer from a whitespace-separated command line.
    pub fn from_command_line(command_line: &str, fetcher: T) -> Result<Self, AttwError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            return Err(AttwError::Usage("analyzer command is required".to_string()));
        };
        Ok(Self::new(program, parts.collect(), fetcher))
    }

    async fn run(&self, tarball: Vec<u8>) -> Result<Analysis, AnalyzerError> {
        log::debug!(
            "spawning analyzer {} {:?} with {} byte tarball",
            self.program,
            self.args,
            tarball.len()
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                AnalyzerError::Failed(format!("failed to start analyzer {}: {err}", self.program))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnalyzerError::Failed("analyzer stdin unavailable".to_string()))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&tarball).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await.map_err(|err| {
            AnalyzerError::Failed(format!("analyzer {} did not finish: {err}", self.program))
        })?;
        match writer.await {
            Ok(Ok(())) => {}
            // The analyzer may exit without draining stdin; its status decides.
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(err)) => {
                return Err(AnalyzerError::Failed(format!(
                    "failed to send tarball to {}: {err}",
                    self.program
                )));
            }
            Err(err) => {
                return Err(AnalyzerError::Failed(format!(
                    "tarball writer for {} failed: {err}",
                    self.program
                )));
            }
        }
        parse_output(&self.program, &output)
    }
}

impl<T: TarballFetcher + Sync> Analyzer for ProcessAnalyzer<T> {
    fn check_package<'a>(&'a self, name: &'a str, version: Option<&'a str>) -> AnalyzerFuture<'a> {
        Box::pin(async move {
            let tarball = self.fetcher.fetch(name, version).await?;
            self.run(tarball).await
        })
    }

    fn check_tgz<'a>(&'a self, tarball: Vec<u8>) -> AnalyzerFuture<'a> {
        Box::pin(self.run(tarball))
    }
}

/// Interpret analyzer process output.
fn parse_output(program: &str, output: &Output) -> Result<Analysis, AnalyzerError> {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        let message = if stderr.is_empty() {
            format!("{program} failed with status {}", output.status)
        } else {
            format!("{program} failed: {stderr}")
        };
        return Err(AnalyzerError::Failed(message));
    }
    if !stderr.is_empty() {
        log::warn!("{program}: {stderr}");
    }
    serde_json::from_slice(&output.stdout)
        .map_err(|err| AnalyzerError::Failed(format!("invalid analysis from {program}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FetchFuture;
    use std::sync::Mutex;

    const UNTYPED_JSON: &str =
        r#"{"packageName":"foo","packageVersion":"1.0.0","containsTypes":false}"#;

    struct StaticFetcher {
        requests: Mutex<Vec<(String, Option<String>)>>,
        result: Result<Vec<u8>, AnalyzerError>,
    }

    impl StaticFetcher {
        fn new(result: Result<Vec<u8>, AnalyzerError>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                result,
            }
        }

        fn requests(&self) -> Vec<(String, Option<String>)> {
            self.requests.lock().expect("requests").clone()
        }
    }

    impl TarballFetcher for StaticFetcher {
        fn fetch<'a>(&'a self, name: &'a str, version: Option<&'a str>) -> FetchFuture<'a> {
            self.requests
                .lock()
                .expect("requests")
                .push((name.to_string(), version.map(str::to_string)));
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    fn shell(script: &str, fetcher: StaticFetcher) -> ProcessAnalyzer<StaticFetcher> {
        ProcessAnalyzer::new("sh", vec!["-c".to_string(), script.to_string()], fetcher)
    }

    #[test]
    fn from_command_line_splits_arguments() {
        let analyzer = ProcessAnalyzer::from_command_line(
            "node ./analyze.js --json",
            StaticFetcher::new(Ok(Vec::new())),
        )
        .expect("analyzer");
        assert_eq!(analyzer.program, "node");
        assert_eq!(analyzer.args, vec!["./analyze.js", "--json"]);
    }

    #[test]
    fn from_command_line_rejects_empty() {
        let result = ProcessAnalyzer::from_command_line("  ", StaticFetcher::new(Ok(Vec::new())));
        assert!(matches!(result, Err(AttwError::Usage(_))));
    }

    #[tokio::test]
    async fn check_tgz_pipes_tarball_to_analyzer() {
        let script = r#"n=$(wc -c); printf '{"packageName":"foo","packageVersion":"%s","containsTypes":false}' $n"#;
        let analyzer = shell(script, StaticFetcher::new(Ok(Vec::new())));
        let analysis = analyzer.check_tgz(vec![1, 2, 3, 4]).await.expect("analysis");
        assert_eq!(analysis.package_version(), "4");
        assert!(!analysis.contains_types());
    }

    #[tokio::test]
    async fn check_package_fetches_before_analyzing() {
        let fetcher = StaticFetcher::new(Ok(vec![0x1f, 0x8b]));
        let analyzer = shell(&format!("cat > /dev/null; printf '%s' '{UNTYPED_JSON}'"), fetcher);
        let analysis = analyzer
            .check_package("foo", Some("1.0.0"))
            .await
            .expect("analysis");
        assert_eq!(analysis.package_name(), "foo");
        assert_eq!(
            analyzer.fetcher.requests(),
            vec![("foo".to_string(), Some("1.0.0".to_string()))]
        );
    }

    #[tokio::test]
    async fn fetch_failures_pass_through_unchanged() {
        let failure = AnalyzerError::Fetch {
            message: "registry returned 404".to_string(),
            code: "E404".to_string(),
        };
        let analyzer = shell("exit 0", StaticFetcher::new(Err(failure.clone())));
        let err = analyzer.check_package("nope", None).await.expect_err("fetch");
        assert_eq!(err, failure);
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let analyzer = shell(
            "cat > /dev/null; echo 'tarball is corrupt' >&2; exit 3",
            StaticFetcher::new(Ok(Vec::new())),
        );
        let err = analyzer.check_tgz(vec![0]).await.expect_err("failure");
        match err {
            AnalyzerError::Failed(message) => assert!(message.contains("tarball is corrupt")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_a_failure() {
        let analyzer = shell(
            "cat > /dev/null; echo 'not json'",
            StaticFetcher::new(Ok(Vec::new())),
        );
        let err = analyzer.check_tgz(vec![0]).await.expect_err("failure");
        assert!(matches!(err, AnalyzerError::Failed(ref message) if message.contains("invalid analysis")));
    }

    #[tokio::test]
    async fn missing_program_is_a_failure() {
        let analyzer = ProcessAnalyzer::new(
            "attw-analyzer-that-does-not-exist",
            Vec::new(),
            StaticFetcher::new(Ok(Vec::new())),
        );
        let err = analyzer.check_tgz(vec![0]).await.expect_err("spawn failure");
        assert!(matches!(err, AnalyzerError::Failed(ref message) if message.contains("failed to start")));
    }
}

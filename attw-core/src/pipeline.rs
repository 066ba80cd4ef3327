//! End-to-end reporting pipeline: analysis, classification, rendering, verdict.

use std::io::{self, Write};

use crate::analysis::Analysis;
use crate::classify::classify;
use crate::driver::{AnalysisRequest, Analyzer, analyze};
use crate::error::Result;
use crate::exit::{Outcome, decide};
use crate::fs::FileSystem;
use crate::options::Options;
use crate::report::{RenderOptions, render_raw, render_typed, render_untyped};

/// Analyze `request` and report the result to `stdout`.
///
/// Nothing is written when the analysis fails. Quiet mode swaps `stdout`
/// for a discarding sink but leaves the outcome untouched.
pub async fn check<A, F>(
    request: &AnalysisRequest,
    options: &Options,
    analyzer: &A,
    fs: &F,
    stdout: &mut dyn Write,
) -> Result<Outcome>
where
    A: Analyzer + ?Sized,
    F: FileSystem + ?Sized,
{
    let analysis = analyze(request, analyzer, fs).await?;
    report_analysis(&analysis, options, stdout)
}

/// Render an analysis to `stdout` and decide the outcome.
///
/// A closed stdout ends the report early; the outcome still stands.
pub fn report_analysis(
    analysis: &Analysis,
    options: &Options,
    stdout: &mut dyn Write,
) -> Result<Outcome> {
    let mut discard = io::sink();
    let out: &mut dyn Write = if options.quiet { &mut discard } else { stdout };

    let (contents, outcome) = match analysis {
        Analysis::Untyped(untyped) => {
            let contents = if options.raw {
                render_raw(analysis, None)?
            } else {
                render_untyped(untyped)
            };
            (contents, Outcome::Clean)
        }
        Analysis::Typed(typed) => {
            let classification = classify(typed, &options.ignore_rules);
            let contents = if options.raw {
                render_raw(analysis, Some(&classification.grouped))?
            } else {
                render_typed(
                    typed,
                    &classification,
                    &options.ignore_rules,
                    &RenderOptions::from(options),
                )
            };
            (contents, decide(options.strict, Some(&classification)))
        }
    };
    write_report(out, &contents)?;
    Ok(outcome)
}

fn write_report(out: &mut dyn Write, contents: &str) -> io::Result<()> {
    match out.write_all(contents.as_bytes()).and_then(|()| out.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            log::debug!("stdout closed before the report was written");
            Ok(())
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ResolutionKind, TypedAnalysis, TypesSource, UntypedAnalysis};
    use crate::classify::IgnoreSet;
    use crate::driver::{AnalyzerError, AnalyzerFuture};
    use crate::error::AttwError;
    use crate::fs::StdFileSystem;
    use crate::problem::{Problem, ProblemKind};
    use indexmap::IndexMap;

    fn foo_analysis() -> Analysis {
        Analysis::Typed(TypedAnalysis {
            package_name: "foo".to_string(),
            package_version: "1.0.0".to_string(),
            types: TypesSource::Included,
            entrypoints: IndexMap::new(),
            problems: vec![Problem::new(
                ProblemKind::FalseEsm,
                ".",
                ResolutionKind::Node16Esm,
            )],
        })
    }

    fn untyped_analysis() -> Analysis {
        Analysis::Untyped(UntypedAnalysis {
            package_name: "bar".to_string(),
            package_version: "0.1.0".to_string(),
        })
    }

    fn options(strict: bool, raw: bool, quiet: bool, ignore: &[ProblemKind]) -> Options {
        Options {
            strict,
            raw,
            quiet,
            color: false,
            ignore_rules: ignore.iter().copied().collect::<IgnoreSet>(),
            ..Options::default()
        }
    }

    fn run(analysis: &Analysis, options: &Options) -> (Outcome, String) {
        let mut stdout = Vec::new();
        let outcome = report_analysis(analysis, options, &mut stdout).expect("report");
        (outcome, String::from_utf8(stdout).expect("utf8"))
    }

    #[test]
    fn strict_raw_reports_problem_and_fails() {
        let (outcome, output) = run(&foo_analysis(), &options(true, true, false, &[]));
        assert_eq!(outcome.exit_code(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(parsed["problems"]["false-esm"][0]["resolutionKind"], "node16-esm");
        assert_eq!(parsed["analysis"]["packageName"], "foo");
    }

    #[test]
    fn ignored_kind_passes_strict_but_stays_listed() {
        let (outcome, output) = run(
            &foo_analysis(),
            &options(true, true, false, &[ProblemKind::FalseEsm]),
        );
        assert_eq!(outcome, Outcome::Clean);
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(parsed["problems"]["false-esm"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn quiet_suppresses_output_but_not_outcome() {
        for raw in [true, false] {
            let (outcome, output) = run(&foo_analysis(), &options(true, raw, true, &[]));
            assert!(output.is_empty());
            assert_eq!(outcome, Outcome::ProblemsFound);
        }
        for raw in [true, false] {
            let (outcome, output) = run(&untyped_analysis(), &options(true, raw, true, &[]));
            assert!(output.is_empty());
            assert_eq!(outcome, Outcome::Clean);
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closed_stdout_keeps_strict_verdict() {
        let outcome = report_analysis(
            &foo_analysis(),
            &options(true, true, false, &[]),
            &mut ClosedPipe,
        )
        .expect("closed pipe is not fatal");
        assert_eq!(outcome, Outcome::ProblemsFound);
        let outcome = report_analysis(
            &untyped_analysis(),
            &options(true, false, false, &[]),
            &mut ClosedPipe,
        )
        .expect("closed pipe is not fatal");
        assert_eq!(outcome, Outcome::Clean);
    }

    #[test]
    fn other_write_failures_stay_fatal() {
        let err = report_analysis(
            &foo_analysis(),
            &options(false, true, false, &[]),
            &mut FullDisk,
        )
        .expect_err("write failure");
        assert!(matches!(err, AttwError::Io(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn untyped_never_fails_strict_mode() {
        let (outcome, output) = run(&untyped_analysis(), &options(true, false, false, &[]));
        assert_eq!(outcome, Outcome::Clean);
        assert!(output.starts_with("This package does not contain types."));
    }

    #[test]
    fn untyped_raw_omits_problems() {
        let (_, output) = run(&untyped_analysis(), &options(false, true, false, &[]));
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(parsed["analysis"]["containsTypes"], false);
        assert!(parsed.get("problems").is_none());
    }

    #[test]
    fn non_strict_tabular_passes_with_problems() {
        let (outcome, output) = run(&foo_analysis(), &options(false, false, false, &[]));
        assert_eq!(outcome, Outcome::Clean);
        assert!(output.contains("Masquerading as ESM"));
    }

    struct FailingAnalyzer;

    impl Analyzer for FailingAnalyzer {
        fn check_package<'a>(
            &'a self,
            _name: &'a str,
            _version: Option<&'a str>,
        ) -> AnalyzerFuture<'a> {
            Box::pin(async {
                Err(AnalyzerError::Fetch {
                    message: "getaddrinfo failed".to_string(),
                    code: "ECONNREFUSED".to_string(),
                })
            })
        }

        fn check_tgz<'a>(&'a self, _tarball: Vec<u8>) -> AnalyzerFuture<'a> {
            Box::pin(async { Err(AnalyzerError::Failed("bad tarball".to_string())) })
        }
    }

    #[tokio::test]
    async fn failed_analysis_writes_nothing() {
        let mut stdout = Vec::new();
        let request = AnalysisRequest::Registry {
            name: "foo".to_string(),
            version: None,
        };
        let err = check(
            &request,
            &Options::default(),
            &FailingAnalyzer,
            &StdFileSystem::new(),
            &mut stdout,
        )
        .await
        .expect_err("failure");
        assert!(matches!(err, AttwError::Analysis(ref failure) if failure.code == "ECONNREFUSED"));
        assert!(stdout.is_empty());
    }
}

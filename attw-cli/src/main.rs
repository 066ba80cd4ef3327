#![deny(missing_docs)]
//! attw command-line interface.
//!
//! Checks whether a package's type declarations agree with how its entry
//! points resolve at runtime, and reports the result for humans or CI.

mod analyzer;
mod registry;

use analyzer::{DEFAULT_ANALYZER, ProcessAnalyzer};
use attw_core::{
    AnalysisRequest, Analyzer, AttwError, ColorEnvironment, ConfigLoader, FileSystem, Outcome,
    PartialOptions, check, normalize_options,
};
use clap::Parser;
use registry::{DEFAULT_REGISTRY, RegistryFetcher};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "attw",
    version,
    about = "Check whether a package's types are wrong",
    long_about = "Analyze an npm package (or a local .tgz with --from-file) and report \
                  mismatches between its type declarations and its runtime module resolution.\n\n\
                  Configuration precedence: CLI flags > NO_COLOR/FORCE_COLOR > .attw.json > defaults."
)]
struct Cli {
    /// Package name, optionally `name@version`; a tarball path with --from-file.
    package: String,
    /// Treat the positional argument as a local package tarball.
    #[arg(short = 'f', long)]
    from_file: bool,
    /// Version or dist-tag to analyze.
    #[arg(short = 'v', long)]
    package_version: Option<String>,
    /// Exit with status 1 when unignored problems are found.
    #[arg(short, long)]
    strict: bool,
    /// Suppress all standard output.
    #[arg(short, long)]
    quiet: bool,
    /// Print the raw analysis as JSON.
    #[arg(short, long)]
    raw: bool,
    /// Print one block per entry point instead of a table.
    #[arg(short = 'E', long)]
    vertical: bool,
    /// Use resolution kinds as rows and entry points as columns.
    #[arg(short = 'F', long)]
    flipped: bool,
    /// Print the problem summary (default).
    #[arg(long, overrides_with = "no_summary")]
    summary: bool,
    /// Omit the problem summary.
    #[arg(long, overrides_with = "summary")]
    no_summary: bool,
    /// Use emoji glyphs (default).
    #[arg(long, overrides_with = "no_emoji")]
    emoji: bool,
    /// Use plain-text glyphs.
    #[arg(long, overrides_with = "emoji")]
    no_emoji: bool,
    /// Force colored output, even when NO_COLOR is set.
    #[arg(long, overrides_with = "no_color")]
    color: bool,
    /// Disable colored output.
    #[arg(long, overrides_with = "color")]
    no_color: bool,
    /// Config file to read instead of ./.attw.json.
    #[arg(long, value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Problem rules to ignore for --strict (repeatable or comma-separated).
    #[arg(short, long = "ignore", value_name = "RULE", num_args = 1.., value_delimiter = ',')]
    ignore: Option<Vec<String>>,
    /// Analyzer command; reads a tarball on stdin and prints analysis JSON.
    #[arg(long, env = "ATTW_ANALYZER", default_value = DEFAULT_ANALYZER)]
    analyzer: String,
    /// Package registry base URL.
    #[arg(long, env = "ATTW_REGISTRY", default_value = DEFAULT_REGISTRY)]
    registry: String,
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> std::process::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let env = ColorEnvironment::from_env();
    let fs = attw_core::StdFileSystem::new();
    let loader = attw_core::JsonConfigLoader::new(fs.clone());

    let result = match build_analyzer(&cli) {
        Ok(analyzer) => {
            let mut stdout = std::io::stdout().lock();
            run(&cli, &env, &loader, &analyzer, &fs, &mut stdout).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(outcome) => std::process::ExitCode::from(outcome.exit_code()),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::ExitCode::from(err.exit_code())
        }
    }
}

#[cfg(test)]
fn main() {}

/// Build the production analyzer from CLI settings.
#[cfg_attr(test, allow(dead_code))]
fn build_analyzer(cli: &Cli) -> attw_core::Result<ProcessAnalyzer<RegistryFetcher>> {
    let fetcher = RegistryFetcher::new(&cli.registry)?;
    ProcessAnalyzer::from_command_line(&cli.analyzer, fetcher)
}

/// Validate options and the target, then analyze and report.
///
/// Every usage error is raised before the analyzer is called.
async fn run<L, A, F>(
    cli: &Cli,
    env: &ColorEnvironment,
    loader: &L,
    analyzer: &A,
    fs: &F,
    stdout: &mut dyn Write,
) -> attw_core::Result<Outcome>
where
    L: ConfigLoader + ?Sized,
    A: Analyzer + ?Sized,
    F: FileSystem + ?Sized,
{
    let options = normalize_options(partial_options(cli), cli.config_path.as_deref(), env, loader)?;
    let request = analysis_request(cli)?;
    check(&request, &options, analyzer, fs, stdout).await
}

/// CLI flags as the highest-precedence options layer.
fn partial_options(cli: &Cli) -> PartialOptions {
    PartialOptions {
        strict: cli.strict.then_some(true),
        quiet: cli.quiet.then_some(true),
        raw: cli.raw.then_some(true),
        vertical: cli.vertical.then_some(true),
        flipped: cli.flipped.then_some(true),
        summary: tri_state(cli.summary, cli.no_summary),
        emoji: tri_state(cli.emoji, cli.no_emoji),
        color: tri_state(cli.color, cli.no_color),
        ignore_rules: cli.ignore.clone(),
    }
}

/// Collapse a `--flag` / `--no-flag` pair into an optional value.
fn tri_state(yes: bool, no: bool) -> Option<bool> {
    if yes {
        Some(true)
    } else if no {
        Some(false)
    } else {
        None
    }
}

/// Turn the positional argument into an analysis request.
fn analysis_request(cli: &Cli) -> attw_core::Result<AnalysisRequest> {
    if cli.from_file {
        if cli.package_version.is_some() {
            return Err(AttwError::Usage(
                "--package-version cannot be used with --from-file".to_string(),
            ));
        }
        let path = cli.package.trim();
        if path.is_empty() {
            return Err(AttwError::Usage("file path is required".to_string()));
        }
        return Ok(AnalysisRequest::Archive(PathBuf::from(path)));
    }

    let (name, spec_version) = parse_package_spec(&cli.package)?;
    let flag_version = cli
        .package_version
        .as_deref()
        .map(str::trim)
        .filter(|version| !version.is_empty());
    let version = match (spec_version, flag_version) {
        (Some(spec), Some(flag)) if spec != flag => {
            return Err(AttwError::Usage(format!(
                "conflicting versions: `{name}@{spec}` and --package-version {flag}"
            )));
        }
        (Some(spec), _) => Some(spec.to_string()),
        (None, flag) => flag.map(str::to_string),
    };
    Ok(AnalysisRequest::Registry {
        name: name.to_string(),
        version,
    })
}

/// Split `name[@version]`, honoring `@scope/name` package names.
fn parse_package_spec(spec: &str) -> attw_core::Result<(&str, Option<&str>)> {
    let spec = spec.trim();
    let separator = match spec.strip_prefix('@') {
        Some(rest) => rest.find('@').map(|index| index + 1),
        None => spec.find('@'),
    };
    let (name, version) = match separator {
        Some(index) => (&spec[..index], Some(&spec[index + 1..])),
        None => (spec, None),
    };
    if name.is_empty() {
        return Err(AttwError::Usage("package name is required".to_string()));
    }
    if name.starts_with('@') && !name.contains('/') {
        return Err(AttwError::Usage(format!(
            "invalid scoped package name `{name}`"
        )));
    }
    if version == Some("") {
        return Err(AttwError::Usage(format!("missing version after `{name}@`")));
    }
    Ok((name, version))
}

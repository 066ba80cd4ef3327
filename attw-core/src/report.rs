//! Report rendering: raw JSON envelope, typed table report, untyped notice.

use std::fmt::Write;

use owo_colors::OwoColorize;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::analysis::{
    Analysis, GroupedProblems, ResolutionKind, TypedAnalysis, TypesSource, UntypedAnalysis,
};
use crate::classify::{Classification, IgnoreSet};
use crate::options::Options;
use crate::problem::Problem;

const OK_EMOJI: &str = "🟢";
const OK_TEXT: &str = "OK";
const MISSING_CELL: &str = "-";

/// Rendering toggles taken from [`Options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// One block per entry point instead of a grid.
    pub vertical: bool,
    /// Resolution kinds as rows, entry points as columns.
    pub flipped: bool,
    /// Print the per-kind summary block.
    pub summary: bool,
    /// Use emoji glyphs.
    pub emoji: bool,
    /// Use ANSI colors.
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&Options::default())
    }
}

impl From<&Options> for RenderOptions {
    fn from(options: &Options) -> Self {
        Self {
            vertical: options.vertical,
            flipped: options.flipped,
            summary: options.summary,
            emoji: options.emoji,
            color: options.color,
        }
    }
}

#[derive(Serialize)]
struct RawReport<'a> {
    analysis: &'a Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    problems: Option<&'a GroupedProblems>,
}

/// Render the raw JSON envelope `{ analysis, problems? }`.
///
/// `problems` should be `Some` exactly when the analysis contains types.
pub fn render_raw(
    analysis: &Analysis,
    problems: Option<&GroupedProblems>,
) -> Result<String, serde_json::Error> {
    let mut output = serde_json::to_string_pretty(&RawReport { analysis, problems })?;
    output.push('\n');
    Ok(output)
}

/// Render the notice for a package without type declarations.
pub fn render_untyped(analysis: &UntypedAnalysis) -> String {
    format!(
        "This package does not contain types.\nDetails: {}@{}\n",
        analysis.package_name, analysis.package_version
    )
}

/// Render the typed-package report: header, optional summary, and table.
pub fn render_typed(
    analysis: &TypedAnalysis,
    classification: &Classification,
    ignore: &IgnoreSet,
    options: &RenderOptions,
) -> String {
    let mut output = String::new();
    let title = format!("{} v{}", analysis.package_name, analysis.package_version);
    let _ = writeln!(output, "{}", paint(&title, Tone::Heading, options.color));
    if let TypesSource::DefinitelyTyped {
        package_name,
        package_version,
    } = &analysis.types
    {
        let _ = writeln!(output, "Types from {package_name} v{package_version}");
    }
    let _ = writeln!(output);

    if options.summary {
        append_summary(&mut output, &classification.grouped, ignore, options);
    }

    let matrix = Matrix::build(analysis);
    if options.vertical {
        append_vertical(&mut output, &matrix, analysis, options);
    } else {
        append_grid(&mut output, &matrix, analysis, options);
    }
    output
}

fn append_summary(
    output: &mut String,
    grouped: &GroupedProblems,
    ignore: &IgnoreSet,
    options: &RenderOptions,
) {
    if grouped.is_empty() {
        let message = if options.emoji {
            "No problems found 🌟"
        } else {
            "No problems found"
        };
        let _ = writeln!(output, "{}\n", paint(message, Tone::Ok, options.color));
        return;
    }
    for (kind, problems) in grouped {
        let info = kind.info();
        let label = if options.emoji {
            format!("{} {}", info.emoji, info.title)
        } else {
            info.title.to_string()
        };
        let ignored = if ignore.contains(kind) { " (ignored)" } else { "" };
        let _ = writeln!(
            output,
            "{} [{}] x{}{}",
            paint(&label, Tone::Heading, options.color),
            info.rule_name,
            problems.len(),
            paint(ignored, Tone::Muted, options.color),
        );
        let _ = writeln!(output, "  {}", info.description);
        let _ = writeln!(
            output,
            "  {}",
            paint(&kind.doc_url(), Tone::Muted, options.color)
        );
    }
    let _ = writeln!(output);
}

/// Entry points × resolution kinds in display order.
struct Matrix {
    entrypoints: Vec<String>,
    kinds: Vec<ResolutionKind>,
}

impl Matrix {
    fn build(analysis: &TypedAnalysis) -> Self {
        let mut entrypoints: Vec<String> = analysis.entrypoints.keys().cloned().collect();
        for problem in &analysis.problems {
            if !entrypoints.contains(&problem.entry_point) {
                entrypoints.push(problem.entry_point.clone());
            }
        }
        let present = |kind: &ResolutionKind| {
            analysis
                .entrypoints
                .values()
                .any(|info| info.resolutions.contains_key(kind))
                || analysis
                    .problems
                    .iter()
                    .any(|problem| problem.resolution_kind == *kind)
        };
        let mut kinds: Vec<ResolutionKind> =
            ResolutionKind::ALL.into_iter().filter(present).collect();
        if kinds.is_empty() {
            kinds = ResolutionKind::ALL.to_vec();
        }
        Self { entrypoints, kinds }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Plain,
    Heading,
    Ok,
    Problem,
    Muted,
}

fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color || text.is_empty() {
        return text.to_string();
    }
    match tone {
        Tone::Plain => text.to_string(),
        Tone::Heading => text.bold().to_string(),
        Tone::Ok => text.green().to_string(),
        Tone::Problem => text.yellow().to_string(),
        Tone::Muted => text.dimmed().to_string(),
    }
}

type CellLines = Vec<(String, Tone)>;

fn entrypoint_label(package_name: &str, subpath: &str) -> String {
    match subpath {
        "." => format!("\"{package_name}\""),
        _ => match subpath.strip_prefix("./") {
            Some(rest) => format!("\"{package_name}/{rest}\""),
            None => format!("\"{subpath}\""),
        },
    }
}

fn problem_label(problem: &Problem, emoji: bool) -> String {
    let info = problem.kind.info();
    if emoji {
        format!("{} {}", info.emoji, info.title)
    } else {
        info.title.to_string()
    }
}

fn status_cell(
    analysis: &TypedAnalysis,
    entrypoint: &str,
    kind: ResolutionKind,
    emoji: bool,
) -> CellLines {
    let problems: Vec<&Problem> = analysis
        .problems
        .iter()
        .filter(|problem| problem.entry_point == entrypoint && problem.resolution_kind == kind)
        .collect();
    if !problems.is_empty() {
        return problems
            .into_iter()
            .map(|problem| (problem_label(problem, emoji), Tone::Problem))
            .collect();
    }
    let Some(resolution) = analysis
        .entrypoints
        .get(entrypoint)
        .and_then(|info| info.resolutions.get(&kind))
    else {
        return vec![(MISSING_CELL.to_string(), Tone::Muted)];
    };
    let glyph = if emoji { OK_EMOJI } else { OK_TEXT };
    let text = match resolution.module_kind {
        Some(module) => format!("{glyph} ({})", module.label()),
        None => glyph.to_string(),
    };
    vec![(text, Tone::Ok)]
}

fn append_vertical(
    output: &mut String,
    matrix: &Matrix,
    analysis: &TypedAnalysis,
    options: &RenderOptions,
) {
    for entrypoint in &matrix.entrypoints {
        let label = entrypoint_label(&analysis.package_name, entrypoint);
        let _ = writeln!(output, "{}", paint(&label, Tone::Heading, options.color));
        for kind in &matrix.kinds {
            let cell = status_cell(analysis, entrypoint, *kind, options.emoji);
            let rendered: Vec<String> = cell
                .iter()
                .map(|(text, tone)| paint(text, *tone, options.color))
                .collect();
            let _ = writeln!(output, "  {}: {}", kind.label(), rendered.join(", "));
        }
        let _ = writeln!(output);
    }
}

fn append_grid(
    output: &mut String,
    matrix: &Matrix,
    analysis: &TypedAnalysis,
    options: &RenderOptions,
) {
    let heading = |text: String| vec![(text, Tone::Heading)];
    let mut rows: Vec<Vec<CellLines>> = Vec::new();
    if options.flipped {
        let mut header = vec![heading(String::new())];
        header.extend(
            matrix
                .entrypoints
                .iter()
                .map(|entrypoint| heading(entrypoint_label(&analysis.package_name, entrypoint))),
        );
        rows.push(header);
        for kind in &matrix.kinds {
            let mut row = vec![heading(kind.label().to_string())];
            row.extend(
                matrix
                    .entrypoints
                    .iter()
                    .map(|entrypoint| status_cell(analysis, entrypoint, *kind, options.emoji)),
            );
            rows.push(row);
        }
    } else {
        let mut header = vec![heading(String::new())];
        header.extend(
            matrix
                .kinds
                .iter()
                .map(|kind| heading(kind.label().to_string())),
        );
        rows.push(header);
        for entrypoint in &matrix.entrypoints {
            let mut row = vec![heading(entrypoint_label(&analysis.package_name, entrypoint))];
            row.extend(
                matrix
                    .kinds
                    .iter()
                    .map(|kind| status_cell(analysis, entrypoint, *kind, options.emoji)),
            );
            rows.push(row);
        }
    }
    draw_table(output, &rows, options.color);
}

fn draw_table(output: &mut String, rows: &[Vec<CellLines>], color: bool) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            for (text, _) in cell {
                widths[index] = widths[index].max(text.width());
            }
        }
    }

    let _ = writeln!(output, "{}", border('┌', '┬', '┐', &widths));
    for (index, row) in rows.iter().enumerate() {
        if index > 0 {
            let _ = writeln!(output, "{}", border('├', '┼', '┤', &widths));
        }
        let height = row.iter().map(Vec::len).max().unwrap_or(1).max(1);
        for line in 0..height {
            let mut rendered = String::from("│");
            for (column, width) in widths.iter().enumerate() {
                let (text, tone) = row
                    .get(column)
                    .and_then(|cell| cell.get(line))
                    .map(|(text, tone)| (text.as_str(), *tone))
                    .unwrap_or(("", Tone::Plain));
                let padding = " ".repeat(width - text.width());
                let _ = write!(rendered, " {}{padding} │", paint(text, tone, color));
            }
            let _ = writeln!(output, "{rendered}");
        }
    }
    let _ = writeln!(output, "{}", border('└', '┴', '┘', &widths));
}

fn border(left: char, middle: char, right: char, widths: &[usize]) -> String {
    let segments: Vec<String> = widths.iter().map(|width| "─".repeat(width + 2)).collect();
    format!("{left}{}{right}", segments.join(&middle.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{EntrypointInfo, EntrypointResolution, ModuleKind};
    use crate::classify::classify;
    use crate::problem::ProblemKind;
    use indexmap::IndexMap;

    fn resolution(module_kind: Option<ModuleKind>) -> EntrypointResolution {
        EntrypointResolution {
            name: ".".to_string(),
            resolution: None,
            module_kind,
        }
    }

    fn sample_analysis() -> TypedAnalysis {
        let mut resolutions = IndexMap::new();
        resolutions.insert(ResolutionKind::Node10, resolution(Some(ModuleKind::Cjs)));
        resolutions.insert(ResolutionKind::Node16Esm, resolution(Some(ModuleKind::Cjs)));
        let mut entrypoints = IndexMap::new();
        entrypoints.insert(
            ".".to_string(),
            EntrypointInfo {
                subpath: ".".to_string(),
                has_types: true,
                is_wildcard: false,
                resolutions: resolutions.clone(),
            },
        );
        entrypoints.insert(
            "./sub".to_string(),
            EntrypointInfo {
                subpath: "./sub".to_string(),
                has_types: true,
                is_wildcard: false,
                resolutions: IndexMap::from([(ResolutionKind::Node10, resolution(None))]),
            },
        );
        TypedAnalysis {
            package_name: "foo".to_string(),
            package_version: "1.0.0".to_string(),
            types: TypesSource::Included,
            entrypoints,
            problems: vec![Problem::new(
                ProblemKind::FalseEsm,
                ".",
                ResolutionKind::Node16Esm,
            )],
        }
    }

    fn plain() -> RenderOptions {
        RenderOptions {
            color: false,
            ..RenderOptions::default()
        }
    }

    fn render(analysis: &TypedAnalysis, ignore: &IgnoreSet, options: &RenderOptions) -> String {
        let classification = classify(analysis, ignore);
        render_typed(analysis, &classification, ignore, options)
    }

    #[test]
    fn grid_has_entrypoint_rows_and_resolution_columns() {
        let output = render(&sample_analysis(), &IgnoreSet::new(), &plain());
        assert!(output.starts_with("foo v1.0.0\n"));
        let header = output
            .lines()
            .find(|line| line.contains("node10"))
            .expect("header row");
        assert!(header.contains("node16 (from ESM)"));
        assert!(!header.contains("node16 (from CJS)"));
        assert!(output.contains("\"foo\""));
        assert!(output.contains("\"foo/sub\""));
        assert!(output.contains("👺 Masquerading as ESM"));
        assert!(output.contains("🟢 (CJS)"));
        assert!(output.contains('┌') && output.contains('┘'));
    }

    #[test]
    fn grid_rows_are_aligned() {
        let output = render(&sample_analysis(), &IgnoreSet::new(), &plain());
        let widths: Vec<usize> = output
            .lines()
            .filter(|line| line.starts_with('│') || line.starts_with('┌'))
            .map(UnicodeWidthStr::width)
            .collect();
        assert!(widths.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn flipped_grid_swaps_axes() {
        let options = RenderOptions {
            flipped: true,
            ..plain()
        };
        let output = render(&sample_analysis(), &IgnoreSet::new(), &options);
        let header = output
            .lines()
            .find(|line| line.contains("\"foo\""))
            .expect("header row");
        assert!(header.contains("\"foo/sub\""));
        assert!(output.lines().any(|line| line.starts_with("│ node16 (from ESM)")));
    }

    #[test]
    fn missing_resolutions_render_as_dash() {
        let output = render(&sample_analysis(), &IgnoreSet::new(), &plain());
        let sub_row = output
            .lines()
            .find(|line| line.contains("\"foo/sub\""))
            .expect("sub row");
        assert!(sub_row.contains(" - "));
    }

    #[test]
    fn vertical_layout_lists_each_resolution() {
        let options = RenderOptions {
            vertical: true,
            ..plain()
        };
        let output = render(&sample_analysis(), &IgnoreSet::new(), &options);
        assert!(output.contains("\"foo\"\n  node10: 🟢 (CJS)\n  node16 (from ESM): 👺 Masquerading as ESM\n"));
        assert!(!output.contains('┌'));
    }

    #[test]
    fn vertical_layout_ignores_flipped() {
        let vertical = RenderOptions {
            vertical: true,
            ..plain()
        };
        let both = RenderOptions {
            flipped: true,
            ..vertical
        };
        let output = render(&sample_analysis(), &IgnoreSet::new(), &both);
        assert!(output.contains("\"foo\"\n  node10: 🟢 (CJS)\n"));
        assert!(output.contains("\"foo/sub\"\n  node10: 🟢\n"));
        assert!(!output.contains('┌'));
        assert_eq!(
            output,
            render(&sample_analysis(), &IgnoreSet::new(), &vertical)
        );
    }

    #[test]
    fn text_glyphs_replace_emoji() {
        let options = RenderOptions {
            emoji: false,
            ..plain()
        };
        let output = render(&sample_analysis(), &IgnoreSet::new(), &options);
        assert!(output.contains("OK (CJS)"));
        assert!(output.contains("Masquerading as ESM"));
        assert!(!output.contains("👺"));
        assert!(!output.contains("🟢"));
    }

    #[test]
    fn summary_lists_counts_by_rule_name() {
        let output = render(&sample_analysis(), &IgnoreSet::new(), &plain());
        assert!(output.contains("👺 Masquerading as ESM [false-esm] x1\n"));
        assert!(output.contains("FalseESM.md"));
    }

    #[test]
    fn summary_marks_ignored_kinds() {
        let ignore = IgnoreSet::from([ProblemKind::FalseEsm]);
        let output = render(&sample_analysis(), &ignore, &plain());
        assert!(output.contains("[false-esm] x1 (ignored)"));
    }

    #[test]
    fn summary_can_be_disabled() {
        let options = RenderOptions {
            summary: false,
            ..plain()
        };
        let output = render(&sample_analysis(), &IgnoreSet::new(), &options);
        assert!(!output.contains("[false-esm]"));
    }

    #[test]
    fn clean_package_reports_no_problems() {
        let mut analysis = sample_analysis();
        analysis.problems.clear();
        let output = render(&analysis, &IgnoreSet::new(), &plain());
        assert!(output.contains("No problems found 🌟"));
    }

    #[test]
    fn definitely_typed_source_is_named() {
        let mut analysis = sample_analysis();
        analysis.types = TypesSource::DefinitelyTyped {
            package_name: "@types/foo".to_string(),
            package_version: "1.0.3".to_string(),
        };
        let output = render(&analysis, &IgnoreSet::new(), &plain());
        assert!(output.contains("Types from @types/foo v1.0.3"));
    }

    #[test]
    fn color_adds_ansi_sequences_only_when_enabled() {
        let colored = render(&sample_analysis(), &IgnoreSet::new(), &RenderOptions::default());
        assert!(colored.contains("\u{1b}["));
        let output = render(&sample_analysis(), &IgnoreSet::new(), &plain());
        assert!(!output.contains("\u{1b}["));
    }

    #[test]
    fn raw_includes_problems_only_when_given() {
        let typed = sample_analysis();
        let grouped = classify(&typed, &IgnoreSet::new()).grouped;
        let analysis = Analysis::Typed(typed);
        let raw = render_raw(&analysis, Some(&grouped)).expect("raw");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed["analysis"]["containsTypes"], true);
        assert_eq!(parsed["problems"]["false-esm"][0]["entryPoint"], ".");

        let raw = render_raw(&analysis, None).expect("raw");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert!(parsed.get("problems").is_none());
    }

    #[test]
    fn untyped_notice_names_package() {
        let output = render_untyped(&UntypedAnalysis {
            package_name: "bar".to_string(),
            package_version: "2.0.0".to_string(),
        });
        assert_eq!(
            output,
            "This package does not contain types.\nDetails: bar@2.0.0\n"
        );
    }
}

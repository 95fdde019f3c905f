//! Command handler functions for the covtree CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::detect::Format;
use crate::ingest::Ingested;
use crate::metric::Metric;
use crate::tree::{CoverageTree, NodeId};
use crate::value::Value;

#[derive(Serialize)]
struct Summary<'a> {
    format: Format,
    name: &'a str,
    files: usize,
    values: Vec<Value>,
    errors: Vec<String>,
}

/// Aggregated values of the whole report, one line per metric.
pub fn cmd_summary(report: &Ingested, json: bool) -> Result<String> {
    let tree = &report.tree;
    let root = tree.root();
    let values = tree.aggregate_values(root);

    if json {
        let summary = Summary {
            format: report.format,
            name: tree.name(root),
            files: tree.all_files().len(),
            values,
            errors: report.log.error_messages(),
        };
        let mut out = serde_json::to_string_pretty(&summary)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    writeln!(out, "Report:     {}", tree.name(root))?;
    writeln!(out, "Format:     {}", report.format)?;
    writeln!(out, "Files:      {}", tree.all_files().len())?;
    for value in &values {
        writeln!(out, "{:<24} {}", format!("{}:", value.metric().display_name()), describe(value))?;
    }
    if report.log.has_errors() {
        write!(out, "{}", report.log)?;
    }
    Ok(out)
}

#[derive(Serialize)]
struct FileRow {
    path: String,
    lines: u64,
    covered: u64,
    rate: f64,
}

fn file_rows(tree: &CoverageTree) -> Vec<FileRow> {
    tree.all_files()
        .into_iter()
        .map(|file| {
            let value = tree.value(file, Metric::Line);
            let (covered, total) = match value.as_ref().and_then(Value::as_coverage) {
                Some(line) => (line.covered(), line.total()),
                None => (0, 0),
            };
            FileRow {
                path: tree.path(file),
                lines: total,
                covered,
                rate: if total == 0 { 0.0 } else { covered as f64 / total as f64 },
            }
        })
        .collect()
}

/// Per-file line coverage.
pub fn cmd_files(report: &Ingested, sort_by_coverage: bool, json: bool) -> Result<String> {
    let mut files = file_rows(&report.tree);
    if sort_by_coverage {
        files.sort_by(|a, b| a.rate.total_cmp(&b.rate));
    }
    if json {
        let mut out = serde_json::to_string_pretty(&files)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    writeln!(out, "{:<60} {:>8} {:>8} {:>8}", "FILE", "LINES", "COVERED", "RATE")?;
    writeln!(out, "{}", "-".repeat(88))?;
    for f in &files {
        writeln!(
            out,
            "{:<60} {:>8} {:>8} {:>7.1}%",
            f.path,
            f.lines,
            f.covered,
            f.rate * 100.0
        )?;
    }
    Ok(out)
}

fn find_source(tree: &CoverageTree, source_file: &str) -> Result<NodeId> {
    // Accept the relative path as stored or just the file name
    let found = tree.find_file(source_file).or_else(|| tree.find(Metric::File, source_file));
    match found {
        Some(file) => Ok(file),
        None => bail!("No coverage data for '{}'", source_file),
    }
}

/// Line-level counters for one source file. With `uncovered`, only the
/// missed lines, grouped into ranges.
pub fn cmd_lines(report: &Ingested, source_file: &str, uncovered: bool) -> Result<String> {
    let tree = &report.tree;
    let file = find_source(tree, source_file)?;
    let Some(data) = tree.file(file) else {
        bail!("'{}' is not a source file", source_file);
    };

    let mut out = String::new();
    if uncovered {
        let missed = data.missed_lines();
        if missed.is_empty() {
            return Ok(format!("All instrumentable lines are covered in '{}'\n", source_file));
        }
        writeln!(out, "Uncovered lines in '{}':", data.relative_path())?;
        writeln!(out, "  {}", format_line_ranges(&missed))?;
        writeln!(out, "  ({} lines)", missed.len())?;
        return Ok(out);
    }

    writeln!(out, "{:>6}  {:>8}  {:>8}", "LINE", "COVERED", "MISSED")?;
    writeln!(out, "{}", "-".repeat(28))?;
    for (line, covered, missed) in data.counters() {
        let marker = match (covered, missed) {
            (0, _) => "✗",
            (_, 0) => "✓",
            _ => "◐",
        };
        writeln!(out, "{:>6}  {:>8}  {:>8}  {}", line, covered, missed, marker)?;
    }
    Ok(out)
}

/// The node hierarchy, one node per line, with line (or mutation) coverage.
pub fn cmd_tree(report: &Ingested) -> Result<String> {
    let tree = &report.tree;
    let mut out = String::new();
    write_node(tree, tree.root(), 0, &mut out)?;
    Ok(out)
}

fn write_node(tree: &CoverageTree, id: NodeId, depth: usize, out: &mut String) -> Result<()> {
    let coverage = [Metric::Line, Metric::Mutation]
        .into_iter()
        .find_map(|metric| tree.value(id, metric))
        .map(|value| format!("  {}: {}", value.metric(), describe(&value)))
        .unwrap_or_default();
    writeln!(
        out,
        "{}{} {}{}",
        "  ".repeat(depth),
        tree.metric(id).key().to_lowercase(),
        tree.name(id),
        coverage
    )?;
    for child in tree.children(id) {
        write_node(tree, *child, depth + 1, out)?;
    }
    Ok(())
}

fn describe(value: &Value) -> String {
    match value {
        Value::Coverage(c) => format!("{}/{} ({})", c.covered(), c.total(), c.covered_percentage()),
        Value::Integer(i) => i.value().to_string(),
        Value::Fraction(f) => format!("{:.2}", f.fraction().to_f64()),
    }
}

/// Collapse sorted line numbers into ranges such as `3-5, 9`.
pub fn format_line_ranges(lines: &[u32]) -> String {
    let mut ranges: Vec<String> = Vec::new();
    let mut iter = lines.iter().copied();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let (mut start, mut end) = (first, first);
    for line in iter {
        if end.checked_add(1) == Some(line) {
            end = line;
            continue;
        }
        ranges.push(range(start, end));
        start = line;
        end = line;
    }
    ranges.push(range(start, end));
    ranges.join(", ")
}

fn range(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::FilteredLog;
    use crate::parsers::cobertura;

    const REPORT: &[u8] = br#"<coverage><packages>
      <package name="app">
        <classes>
          <class name="app.Main" filename="src/app/Main.java">
            <lines>
              <line number="1" hits="5"/>
              <line number="2" hits="3"/>
              <line number="3" hits="0"/>
              <line number="4" hits="0"/>
            </lines>
          </class>
          <class name="app.Util" filename="src/app/Util.java">
            <lines>
              <line number="1" hits="10"/>
              <line number="2" hits="2" branch="true" condition-coverage="50% (1/2)"/>
            </lines>
          </class>
        </classes>
      </package>
    </packages></coverage>"#;

    fn report() -> Ingested {
        Ingested {
            format: Format::Cobertura,
            tree: cobertura::parse(REPORT).unwrap(),
            log: FilteredLog::default(),
        }
    }

    #[test]
    fn test_cmd_summary() {
        let out = cmd_summary(&report(), false).unwrap();
        assert!(out.contains("Format:     cobertura"));
        assert!(out.contains("Files:      2"));
        assert!(out.contains("Line Coverage:"));
        assert!(out.contains("4/6 (66.67%)"));
    }

    #[test]
    fn test_cmd_summary_json() {
        let out = cmd_summary(&report(), true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["format"], "cobertura");
        assert_eq!(parsed["files"], 2);
        let line = parsed["values"]
            .as_array()
            .unwrap()
            .iter()
            .find(|v| v["metric"] == "LINE")
            .unwrap();
        assert_eq!(line["covered"], 4);
        assert_eq!(line["missed"], 2);
    }

    #[test]
    fn test_cmd_files_sorted_by_coverage() {
        let out = cmd_files(&report(), true, false).unwrap();
        let main_pos = out.find("src/app/Main.java").unwrap();
        let util_pos = out.find("src/app/Util.java").unwrap();
        assert!(main_pos < util_pos);
        assert!(out.contains("50.0%"));
        assert!(out.contains("100.0%"));
    }

    #[test]
    fn test_cmd_lines() {
        let out = cmd_lines(&report(), "Util.java", false).unwrap();
        assert!(out.contains("COVERED"));
        assert!(out.contains("✓"));
        assert!(out.contains("◐"));
        assert!(cmd_lines(&report(), "missing.java", false).is_err());
    }

    #[test]
    fn test_cmd_lines_uncovered() {
        let out = cmd_lines(&report(), "src/app/Main.java", true).unwrap();
        assert!(out.contains("Uncovered lines in 'src/app/Main.java':"));
        assert!(out.contains("3-4"));
        assert!(out.contains("(2 lines)"));

        let out = cmd_lines(&report(), "src/app/Util.java", true).unwrap();
        assert!(out.contains("All instrumentable lines are covered"));
    }

    #[test]
    fn test_cmd_tree() {
        let out = cmd_tree(&report()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "module -  LINE: 4/6 (66.67%)");
        assert_eq!(lines[1], "  package app  LINE: 4/6 (66.67%)");
        assert!(lines[2].starts_with("    file Main.java"));
    }

    #[test]
    fn test_format_line_ranges() {
        assert_eq!(format_line_ranges(&[1, 2, 3, 7, 9, 10]), "1-3, 7, 9-10");
        assert_eq!(format_line_ranges(&[4]), "4");
        assert_eq!(format_line_ranges(&[]), "");
        assert_eq!(format_line_ranges(&[u32::MAX - 1, u32::MAX]), "4294967294-4294967295");
        assert_eq!(format_line_ranges(&[1, u32::MAX]), "1, 4294967295");
    }
}

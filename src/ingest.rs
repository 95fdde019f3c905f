use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::detect::{detect_format, Format};
use crate::diagnostics::FilteredLog;
use crate::error::{CoverageError, Result};
use crate::interner::PathInterner;
use crate::parsers::{parser_for, ProcessingMode};
use crate::tree::CoverageTree;

/// How a report file is read and post-processed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub mode: ProcessingMode,
    /// Turn dotted package names into nested packages after parsing.
    pub split_packages: bool,
}

/// A parsed report together with what was learned while reading it.
#[derive(Debug)]
pub struct Ingested {
    pub format: Format,
    pub tree: CoverageTree,
    pub log: FilteredLog,
}

/// Read a report file, auto-detect its format (or use the override),
/// parse it, and run the requested post-processing.
pub fn parse_file(
    path: &Path,
    format_override: Option<Format>,
    options: &IngestOptions,
) -> Result<Ingested> {
    parse_file_with(path, format_override, options, &mut PathInterner::new())
}

/// Like [`parse_file`], but relative paths are interned in `interner`, so
/// several reports read one after another share their path strings.
pub fn parse_file_with(
    path: &Path,
    format_override: Option<Format>,
    options: &IngestOptions,
    interner: &mut PathInterner,
) -> Result<Ingested> {
    let mut reader = BufReader::new(File::open(path)?);

    // Determine format from the buffered head without consuming it
    let format = match format_override {
        Some(format) => format,
        None => detect_format(path, reader.fill_buf()?).ok_or(CoverageError::UnknownFormat)?,
    };
    log::debug!("reading {} as {format}", path.display());

    let mut log = FilteredLog::default();
    let mut tree = parser_for(format, options.mode).parse(&mut reader, interner, &mut log)?;
    log.log_info(format!("Parsed {} as {format}", path.display()));
    if options.split_packages {
        tree.split_all_packages()?;
        log.log_info("Split dotted package names into nested packages");
    }
    if log.has_errors() {
        log::warn!("{} problems while reading {}", log.error_count(), path.display());
    }
    Ok(Ingested { format, tree, log })
}

/// Auto-detection of report formats.
///
/// Strategy:
///   1. Peek at the first bytes of the report for the root element
///   2. Fall back to well-known file names
///   3. Fall back to CLI --format override (handled by caller)
use std::path::Path;

use serde::Serialize;

use crate::error::CoverageError;

/// Supported report dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Line/branch coverage with a flat package list.
    Cobertura,
    /// Instruction/branch coverage with nested groups and counters.
    Jacoco,
    /// PIT mutation testing results.
    Pit,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Cobertura => "cobertura",
            Format::Jacoco => "jacoco",
            Format::Pit => "pit",
        }
    }

    /// What the report describes, used in "no data" messages.
    pub fn content(&self) -> &'static str {
        match self {
            Format::Cobertura | Format::Jacoco => "coverage",
            Format::Pit => "mutation",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = CoverageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cobertura" => Ok(Format::Cobertura),
            "jacoco" => Ok(Format::Jacoco),
            "pit" | "pitest" => Ok(Format::Pit),
            _ => Err(CoverageError::InvalidValue(format!(
                "Unknown format: '{}'. Supported: cobertura, jacoco, pit",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the report format from the file name and the head of the content.
pub fn detect_format(path: &Path, head: &[u8]) -> Option<Format> {
    detect_by_content(head).or_else(|| detect_by_file_name(path))
}

fn detect_by_file_name(path: &Path) -> Option<Format> {
    let name = path.file_name()?.to_str()?.to_lowercase();
    if !name.ends_with(".xml") {
        return None;
    }
    if name.contains("mutations") || name.contains("pit") {
        Some(Format::Pit)
    } else if name.contains("jacoco") {
        Some(Format::Jacoco)
    } else if name.contains("cobertura") {
        Some(Format::Cobertura)
    } else {
        None
    }
}

fn detect_by_content(content: &[u8]) -> Option<Format> {
    // We only need to look at the first few KB
    let head_len = content.len().min(4096);
    let head = String::from_utf8_lossy(&content[..head_len]);

    if !(head.contains("<?xml") || head.trim_start().starts_with('<')) {
        return None;
    }
    if head.contains("<mutations") {
        return Some(Format::Pit);
    }
    if head.contains("<report") {
        return Some(Format::Jacoco);
    }
    // Clover also uses a <coverage> root but marks it with a clover attribute.
    if head.contains("<coverage") && !head.contains("clover=") {
        return Some(Format::Cobertura);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_cobertura_by_content() {
        let content = b"<?xml version=\"1.0\"?>\n<coverage line-rate=\"0.5\">";
        assert_eq!(detect_format(Path::new("coverage.xml"), content), Some(Format::Cobertura));
    }

    #[test]
    fn test_detect_jacoco_by_content() {
        let content = br#"<?xml version="1.0"?><!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd"><report name="app">"#;
        assert_eq!(detect_format(Path::new("report.xml"), content), Some(Format::Jacoco));
    }

    #[test]
    fn test_detect_pit_by_content() {
        let content = b"<?xml version=\"1.0\"?><mutations><mutation detected='true'";
        assert_eq!(detect_format(Path::new("out.xml"), content), Some(Format::Pit));
    }

    #[test]
    fn test_detect_by_file_name() {
        assert_eq!(detect_format(Path::new("target/pit/mutations.xml"), b""), Some(Format::Pit));
        assert_eq!(detect_format(Path::new("jacoco.xml"), b""), Some(Format::Jacoco));
        assert_eq!(detect_format(Path::new("cobertura.txt"), b""), None);
    }

    #[test]
    fn test_clover_is_not_cobertura() {
        let content = br#"<?xml version="1.0"?><coverage generated="123" clover="4.4.1">"#;
        assert_eq!(detect_format(Path::new("clover.xml"), content), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("PIT".parse::<Format>().unwrap(), Format::Pit);
        assert_eq!("jacoco".parse::<Format>().unwrap(), Format::Jacoco);
        assert!("lcov".parse::<Format>().is_err());
    }
}

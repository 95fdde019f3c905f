/// Parser for Cobertura XML coverage reports.
///
/// Cobertura XML structure:
///   <coverage>
///     <sources><source>...</source></sources>
///     <packages>
///       <package name="...">
///         <classes>
///           <class name="..." filename="..." complexity="...">
///             <methods>
///               <method name="..." signature="..." complexity="...">
///                 <lines><line number="..." hits="..." .../></lines>
///               </method>
///             </methods>
///             <lines>
///               <line number="..." hits="..." branch="true|false"
///                     condition-coverage="50% (1/2)" />
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
///
/// Lines listed below a `<method>` count towards the method only; the
/// class-level `<lines>` repeat them and are the ones recorded on the file.
use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;

use super::{CoverageParser, Element, ProcessingMode, XmlEvent, XmlStream};
use crate::detect::Format;
use crate::diagnostics::FilteredLog;
use crate::error::Result;
use crate::interner::{normalize_path, normalize_source_root, PathInterner};
use crate::metric::Metric;
use crate::tree::{CoverageTree, NodeId};
use crate::value::Value;

/// Pre-compiled regex for condition-coverage attributes like "75% (3/4)".
static BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)/(\d+)\)").expect("valid condition-coverage pattern"));

/// Cobertura XML format parser.
#[derive(Debug, Default)]
pub struct CoberturaParser {
    mode: ProcessingMode,
}

impl CoberturaParser {
    pub fn new(mode: ProcessingMode) -> Self {
        Self { mode }
    }
}

impl CoverageParser for CoberturaParser {
    fn format(&self) -> Format {
        Format::Cobertura
    }

    fn parse(
        &self,
        reader: &mut dyn BufRead,
        interner: &mut PathInterner,
        log: &mut FilteredLog,
    ) -> Result<CoverageTree> {
        let mut state = State {
            tree: CoverageTree::new_module("-"),
            interner,
            log,
        };
        let packages = state.read_document(&mut XmlStream::new(reader))?;
        log::debug!("read {packages} Cobertura packages");
        super::finish(state.tree, packages, Format::Cobertura, self.mode, state.log)
    }
}

/// Parse Cobertura XML from raw bytes with a private interner.
pub fn parse(input: &[u8]) -> Result<CoverageTree> {
    let mut log = FilteredLog::default();
    CoberturaParser::default().parse(&mut &*input, &mut PathInterner::new(), &mut log)
}

/// Running covered/missed totals of one class or method.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    covered: u64,
    missed: u64,
}

impl Tally {
    fn add(&mut self, covered: u64, missed: u64) {
        self.covered = self.covered.saturating_add(covered);
        self.missed = self.missed.saturating_add(missed);
    }

    fn store(self, tree: &mut CoverageTree, node: NodeId, metric: Metric) -> Result<()> {
        if self.covered > 0 || self.missed > 0 {
            tree.add_value(node, Value::coverage(metric, self.covered, self.missed))?;
        }
        Ok(())
    }
}

struct State<'a> {
    tree: CoverageTree,
    interner: &'a mut PathInterner,
    log: &'a mut FilteredLog,
}

impl State<'_> {
    /// Returns the number of `<package>` elements seen.
    fn read_document(&mut self, xml: &mut XmlStream) -> Result<usize> {
        let root = self.tree.root();
        let mut packages = 0;
        let mut current_package: Option<NodeId> = None;
        loop {
            match xml.next()? {
                XmlEvent::Eof => return Ok(packages),
                XmlEvent::Start(e) => match e.name() {
                    "source" => {
                        let source = xml.read_text("source")?;
                        if !source.is_empty() {
                            self.tree.add_source(root, normalize_source_root(&source));
                        }
                    }
                    "package" => {
                        let name = super::normalize_package_name(e.required("name")?);
                        current_package = Some(self.tree.find_or_create_package(root, &name));
                        packages += 1;
                    }
                    "class" => match current_package {
                        Some(package) => self.read_class(xml, &e, package)?,
                        None => {
                            self.log.log_error(format!(
                                "Skipping class '{}' outside of a package",
                                e.attr("name").unwrap_or_default()
                            ));
                            xml.skip("class")?;
                        }
                    },
                    _ => {}
                },
                XmlEvent::End(name) if name == "package" => current_package = None,
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
            }
        }
    }

    fn read_class(&mut self, xml: &mut XmlStream, class: &Element, package: NodeId) -> Result<()> {
        let class_name = class.required("name")?;
        let relative_path = normalize_path(class.required("filename")?);
        let file_name = relative_path.rsplit('/').next().unwrap_or(&relative_path).to_string();
        let path = self.interner.intern(&relative_path);
        let file = self.tree.find_or_create_file(package, &file_name, path);
        let node = self.tree.find_or_create_class(file, class_name);
        self.read_complexity(class, node)?;
        self.read_scope(xml, node, file, "class")?;
        Ok(())
    }

    /// Read the children of a class or method until its end tag. Returns the
    /// first line number seen.
    fn read_scope(
        &mut self,
        xml: &mut XmlStream,
        node: NodeId,
        file: NodeId,
        element: &str,
    ) -> Result<Option<u32>> {
        let is_class = element == "class";
        let mut lines = Tally::default();
        let mut branches = Tally::default();
        let mut first_line = None;
        loop {
            match xml.next()? {
                XmlEvent::Start(e) => match e.name() {
                    "method" => {
                        let name = e.required("name")?;
                        let signature = e.attr("signature").unwrap_or_default();
                        let method = self.tree.find_or_create_method(node, name, signature, 0);
                        self.read_complexity(&e, method)?;
                        if let Some(line) = self.read_scope(xml, method, file, "method")? {
                            self.tree.set_method_line(method, line);
                        }
                    }
                    "line" => {
                        let number: u32 = e.required_number("number", self.log)?;
                        let hits: u64 = e.required_number("hits", self.log)?;
                        first_line.get_or_insert(number);

                        let (line_covered, line_missed) = if hits > 0 { (1, 0) } else { (0, 1) };
                        lines.add(line_covered, line_missed);

                        let (covered, missed) = match read_condition_coverage(&e) {
                            Some((covered, missed)) => {
                                branches.add(covered, missed);
                                (covered, missed)
                            }
                            None => (line_covered, line_missed),
                        };
                        if is_class {
                            self.tree.add_counters(file, number, clamp(covered), clamp(missed));
                        }
                        xml.skip("line")?;
                    }
                    _ => {}
                },
                XmlEvent::End(name) if name == element => break,
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(super::unexpected_eof(element)),
            }
        }
        lines.store(&mut self.tree, node, Metric::Line)?;
        branches.store(&mut self.tree, node, Metric::Branch)?;
        Ok(first_line)
    }

    fn read_complexity(&mut self, element: &Element, node: NodeId) -> Result<()> {
        if element.attr("complexity").is_some() {
            // Cobertura writes complexity as a decimal, e.g. "2.0"
            let complexity: f64 = element.number("complexity", self.log);
            let complexity = if complexity.is_finite() && complexity > 0.0 {
                complexity.round() as u64
            } else {
                0
            };
            self.tree.add_value(node, Value::integer(Metric::Complexity, complexity))?;
        }
        Ok(())
    }
}

/// Covered and missed branches from `condition-coverage="50% (1/2)"`.
fn read_condition_coverage(line: &Element) -> Option<(u64, u64)> {
    let text = line.attr("condition-coverage")?;
    let caps = BRANCH_RE.captures(text)?;
    let covered: u64 = caps[1].parse().unwrap_or(0);
    let total: u64 = caps[2].parse().unwrap_or(0);
    Some((covered.min(total), total.saturating_sub(covered)))
}

fn clamp(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoverageError;

    const SAMPLE: &[u8] = br#"<?xml version="1.0"?>
<coverage line-rate="0.5" branch-rate="0.5" version="1.9" timestamp="1">
  <sources>
    <source>/home/user/project/src</source>
  </sources>
  <packages>
    <package name="pkg" complexity="3">
      <classes>
        <class name="pkg.C" filename="a/b/C.java" complexity="3.0">
          <methods>
            <method name="run" signature="()V" complexity="2">
              <lines>
                <line number="3" hits="4" branch="true" condition-coverage="50% (1/2)"/>
                <line number="4" hits="0"/>
              </lines>
            </method>
          </methods>
          <lines>
            <line number="1" hits="1"/>
            <line number="3" hits="4" branch="true" condition-coverage="50% (1/2)">
              <conditions><condition number="0" type="jump" coverage="50%"/></conditions>
            </line>
            <line number="4" hits="0"/>
          </lines>
        </class>
      </classes>
    </package>
  </packages>
</coverage>"#;

    #[test]
    fn test_parse_cobertura() {
        let tree = parse(SAMPLE).unwrap();
        let root = tree.root();
        assert_eq!(tree.sources(root), ["/home/user/project/src".to_string()]);

        let file = tree.find_file("a/b/C.java").unwrap();
        assert_eq!(tree.name(file), "C.java");
        let data = tree.file(file).unwrap();
        assert_eq!(data.lines(), &[1, 3, 4]);
        assert_eq!((data.covered(3), data.missed(3)), (1, 1));
        assert_eq!((data.covered(4), data.missed(4)), (0, 1));

        let class = tree.find(Metric::Class, "pkg.C").unwrap();
        assert_eq!(
            tree.node(class).stored_value(Metric::Line),
            Some(&Value::coverage(Metric::Line, 2, 1))
        );
        assert_eq!(
            tree.node(class).stored_value(Metric::Branch),
            Some(&Value::coverage(Metric::Branch, 1, 1))
        );
        assert_eq!(
            tree.node(class).stored_value(Metric::Complexity),
            Some(&Value::integer(Metric::Complexity, 3))
        );

        let method = tree.find(Metric::Method, "run").unwrap();
        assert_eq!(tree.node(method).signature(), Some("()V"));
        assert_eq!(tree.node(method).line_number(), 3);
        assert_eq!(
            tree.node(method).stored_value(Metric::Line),
            Some(&Value::coverage(Metric::Line, 1, 1))
        );

        assert_eq!(tree.value(root, Metric::Line), Some(Value::coverage(Metric::Line, 2, 1)));
    }

    #[test]
    fn test_missing_filename_fails() {
        let input = br#"<coverage><packages><package name="p"><classes>
            <class name="C"><lines/></class>
        </classes></package></packages></coverage>"#;
        let err = parse(input).unwrap_err();
        assert!(matches!(
            err,
            CoverageError::MissingAttribute { attribute, .. } if attribute == "filename"
        ));
    }

    #[test]
    fn test_truncated_class_fails() {
        let input = br#"<coverage><packages><package name="p"><classes>
            <class name="C" filename="C.java"><lines><line number="1" hits="1"/>"#;
        assert!(parse(input).is_err());
    }

    #[test]
    fn test_malformed_hits_default_to_zero() {
        let input = br#"<coverage><packages><package name="p"><classes>
            <class name="C" filename="C.java"><lines><line number="1" hits="lots"/></lines></class>
        </classes></package></packages></coverage>"#;
        let mut log = FilteredLog::default();
        let tree = CoberturaParser::default()
            .parse(&mut &input[..], &mut PathInterner::new(), &mut log)
            .unwrap();
        let file = tree.find_file("C.java").unwrap();
        assert_eq!(tree.file(file).unwrap().missed(1), 1);
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn test_condition_coverage_pattern() {
        let mut bytes = &br#"<line number="1" hits="1" condition-coverage="75% (3/4)"/>"#[..];
        let mut xml = XmlStream::new(&mut bytes);
        let XmlEvent::Start(line) = xml.next().unwrap() else {
            panic!("expected <line>");
        };
        assert_eq!(read_condition_coverage(&line), Some((3, 1)));
    }
}

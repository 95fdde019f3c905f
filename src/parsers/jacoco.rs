/// Parser for JaCoCo XML coverage reports.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo id="..." start="..." dump="..."/>
///     <group name="...">            (optional, nests arbitrarily)
///       <package name="com/example">
///         <class name="com/example/Foo" sourcefilename="Foo.java">
///           <method name="doStuff" desc="()V" line="10">
///             <counter type="INSTRUCTION" missed="0" covered="5"/>
///             <counter type="LINE" missed="0" covered="3"/>
///           </method>
///           <counter type="LINE" missed="1" covered="5"/>
///         </class>
///         <sourcefile name="Foo.java">
///           <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///           <counter type="LINE" missed="1" covered="5"/>
///         </sourcefile>
///         <counter type="LINE" missed="1" covered="5"/>
///       </package>
///     </group>
///     <counter type="LINE" missed="1" covered="5"/>
///   </report>
///
/// Every `<counter>` belongs to the element it appears in. Groups become
/// nested modules. Classes and source files of the same package meet on
/// one file node.
use std::io::BufRead;

use super::{CoverageParser, Element, ProcessingMode, XmlEvent, XmlStream};
use crate::detect::Format;
use crate::diagnostics::FilteredLog;
use crate::error::Result;
use crate::interner::{normalize_path, PathInterner};
use crate::metric::Metric;
use crate::tree::{CoverageTree, NodeId};
use crate::value::Value;

/// JaCoCo XML format parser.
#[derive(Debug, Default)]
pub struct JacocoParser {
    mode: ProcessingMode,
}

impl JacocoParser {
    pub fn new(mode: ProcessingMode) -> Self {
        Self { mode }
    }
}

impl CoverageParser for JacocoParser {
    fn format(&self) -> Format {
        Format::Jacoco
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
            packages: 0,
        };
        let mut xml = XmlStream::new(reader);
        loop {
            match xml.next()? {
                XmlEvent::Start(e) if e.name() == "report" => {
                    let root = state.tree.root();
                    state.tree.rename(root, e.required("name")?);
                    state.read_container(&mut xml, root, "report")?;
                }
                XmlEvent::Start(e) => xml.skip(e.name())?,
                XmlEvent::Eof => break,
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
            }
        }
        log::debug!("read {} JaCoCo packages", state.packages);
        super::finish(state.tree, state.packages, Format::Jacoco, self.mode, state.log)
    }
}

/// Parse JaCoCo XML from raw bytes with a private interner.
pub fn parse(input: &[u8]) -> Result<CoverageTree> {
    let mut log = FilteredLog::default();
    JacocoParser::default().parse(&mut &*input, &mut PathInterner::new(), &mut log)
}

struct State<'a> {
    tree: CoverageTree,
    interner: &'a mut PathInterner,
    log: &'a mut FilteredLog,
    packages: usize,
}

impl State<'_> {
    /// Children of `<report>` or `<group>`.
    fn read_container(
        &mut self,
        xml: &mut XmlStream,
        module: NodeId,
        element: &str,
    ) -> Result<()> {
        loop {
            match xml.next()? {
                XmlEvent::Start(e) => match e.name() {
                    "group" => {
                        let group = self.tree.find_or_create_module(module, e.required("name")?);
                        self.read_container(xml, group, "group")?;
                    }
                    "package" => self.read_package(xml, &e, module)?,
                    "counter" => {
                        self.read_counter(&e, module)?;
                        xml.skip("counter")?;
                    }
                    other => xml.skip(other)?,
                },
                XmlEvent::End(name) if name == element => return Ok(()),
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(super::unexpected_eof(element)),
            }
        }
    }

    fn read_package(
        &mut self,
        xml: &mut XmlStream,
        package: &Element,
        module: NodeId,
    ) -> Result<()> {
        // JaCoCo package names are paths ("com/example"), which also prefix
        // the relative file paths
        let raw_name = package.required("name")?.to_string();
        let node = self
            .tree
            .find_or_create_package(module, &super::normalize_package_name(&raw_name));
        self.packages += 1;
        loop {
            match xml.next()? {
                XmlEvent::Start(e) => match e.name() {
                    "class" => self.read_class(xml, &e, node, &raw_name)?,
                    "sourcefile" => self.read_sourcefile(xml, &e, node, &raw_name)?,
                    "counter" => {
                        self.read_counter(&e, node)?;
                        xml.skip("counter")?;
                    }
                    other => xml.skip(other)?,
                },
                XmlEvent::End(name) if name == "package" => return Ok(()),
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(super::unexpected_eof("package")),
            }
        }
    }

    fn file_node(&mut self, package: NodeId, package_path: &str, file_name: &str) -> NodeId {
        let relative_path = if package_path.is_empty() {
            normalize_path(file_name)
        } else {
            normalize_path(&format!("{package_path}/{file_name}"))
        };
        let path = self.interner.intern(&relative_path);
        self.tree.find_or_create_file(package, file_name, path)
    }

    fn read_class(
        &mut self,
        xml: &mut XmlStream,
        class: &Element,
        package: NodeId,
        package_path: &str,
    ) -> Result<()> {
        let raw_name = class.required("name")?;
        let file_name = match class.attr("sourcefilename") {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => source_file_of(raw_name),
        };
        let file = self.file_node(package, package_path, &file_name);
        let node = self.tree.find_or_create_class(file, &raw_name.replace('/', "."));
        loop {
            match xml.next()? {
                XmlEvent::Start(e) => match e.name() {
                    "method" => {
                        let name = e.required("name")?;
                        let desc = e.attr("desc").unwrap_or_default();
                        let line: u32 = e.number("line", self.log);
                        let method = self.tree.find_or_create_method(node, name, desc, line);
                        self.read_counters(xml, method, "method")?;
                    }
                    "counter" => {
                        self.read_counter(&e, node)?;
                        xml.skip("counter")?;
                    }
                    other => xml.skip(other)?,
                },
                XmlEvent::End(name) if name == "class" => return Ok(()),
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(super::unexpected_eof("class")),
            }
        }
    }

    fn read_counters(&mut self, xml: &mut XmlStream, node: NodeId, element: &str) -> Result<()> {
        loop {
            match xml.next()? {
                XmlEvent::Start(e) => {
                    if e.name() == "counter" {
                        self.read_counter(&e, node)?;
                    }
                    xml.skip(e.name())?;
                }
                XmlEvent::End(name) if name == element => return Ok(()),
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(super::unexpected_eof(element)),
            }
        }
    }

    fn read_sourcefile(
        &mut self,
        xml: &mut XmlStream,
        sourcefile: &Element,
        package: NodeId,
        package_path: &str,
    ) -> Result<()> {
        let file_name = sourcefile.required("name")?.trim().to_string();
        let file = self.file_node(package, package_path, &file_name);
        loop {
            match xml.next()? {
                XmlEvent::Start(e) => {
                    match e.name() {
                        "line" => self.read_line(&e, file)?,
                        "counter" => self.read_counter(&e, file)?,
                        _ => {}
                    }
                    xml.skip(e.name())?;
                }
                XmlEvent::End(name) if name == "sourcefile" => return Ok(()),
                XmlEvent::End(_) | XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(super::unexpected_eof("sourcefile")),
            }
        }
    }

    /// Branch counters decide when the line has branches; otherwise the
    /// line is covered when any instruction ran.
    fn read_line(&mut self, line: &Element, file: NodeId) -> Result<()> {
        let number: u32 = line.required_number("nr", self.log)?;
        let covered_instructions: u32 = line.number("ci", self.log);
        let missed_branches: u32 = line.number("mb", self.log);
        let covered_branches: u32 = line.number("cb", self.log);

        let (covered, missed) = if missed_branches > 0 || covered_branches > 0 {
            (covered_branches, missed_branches)
        } else if covered_instructions > 0 {
            (1, 0)
        } else {
            (0, 1)
        };
        self.tree.add_counters(file, number, covered, missed);
        Ok(())
    }

    fn read_counter(&mut self, counter: &Element, node: NodeId) -> Result<()> {
        let kind = counter.required("type")?;
        let missed: u64 = counter.required_number("missed", self.log)?;
        let covered: u64 = counter.required_number("covered", self.log)?;
        let value = match kind {
            "LINE" => Value::coverage(Metric::Line, covered, missed),
            "INSTRUCTION" => Value::coverage(Metric::Instruction, covered, missed),
            "BRANCH" => Value::coverage(Metric::Branch, covered, missed),
            "COMPLEXITY" => Value::integer(Metric::Complexity, covered.saturating_add(missed)),
            other => {
                log::trace!("ignoring JaCoCo counter {other}");
                return Ok(());
            }
        };
        self.tree.add_value(node, value)
    }
}

/// Source file name for a class without `sourcefilename`:
/// `com/example/Foo$Inner` lives in `Foo.java`.
fn source_file_of(class_name: &str) -> String {
    let simple = class_name.rsplit(['/', '.']).next().unwrap_or(class_name);
    let outer = simple.split('$').next().unwrap_or(simple);
    format!("{outer}.java")
}

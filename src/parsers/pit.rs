/// Parser for PIT mutation testing reports.
///
/// PIT XML structure:
///   <mutations>
///     <mutation detected="true" status="KILLED" numberOfTestsRun="3">
///       <sourceFile>Foo.java</sourceFile>
///       <mutatedClass>com.example.Foo</mutatedClass>
///       <mutatedMethod>doStuff</mutatedMethod>
///       <methodDescription>(I)V</methodDescription>
///       <lineNumber>12</lineNumber>
///       <mutator>org.pitest...ConditionalsBoundaryMutator</mutator>
///       <indexes><index>5</index></indexes>
///       <blocks><block>1</block></blocks>
///       <killingTest>com.example.FooTest.test(com.example.FooTest)</killingTest>
///       <description>changed conditional boundary</description>
///     </mutation>
///   </mutations>
///
/// Mutations hang off the file they mutated. Line counters are derived
/// afterwards from the mutation outcomes on each line.
use std::collections::BTreeMap;
use std::io::BufRead;

use super::{CoverageParser, Element, ProcessingMode, XmlEvent, XmlStream};
use crate::detect::Format;
use crate::diagnostics::FilteredLog;
use crate::error::Result;
use crate::interner::PathInterner;
use crate::metric::Metric;
use crate::mutation::{Mutation, MutationStatus};
use crate::tree::CoverageTree;
use crate::value::Value;

/// PIT XML format parser.
#[derive(Debug, Default)]
pub struct PitParser {
    mode: ProcessingMode,
}

impl PitParser {
    pub fn new(mode: ProcessingMode) -> Self {
        Self { mode }
    }
}

impl CoverageParser for PitParser {
    fn format(&self) -> Format {
        Format::Pit
    }

    fn parse(
        &self,
        reader: &mut dyn BufRead,
        interner: &mut PathInterner,
        log: &mut FilteredLog,
    ) -> Result<CoverageTree> {
        let mut tree = CoverageTree::new_module("-");
        let mut xml = XmlStream::new(reader);
        let mut mutations = 0;
        loop {
            match xml.next()? {
                XmlEvent::Start(e) if e.name() == "mutation" => {
                    let mutation = read_mutation(&mut xml, &e, log)?;
                    attach(&mut tree, interner, mutation)?;
                    mutations += 1;
                }
                XmlEvent::Start(_) | XmlEvent::End(_) | XmlEvent::Text(_) => {}
                XmlEvent::Eof => break,
            }
        }
        log::debug!("read {mutations} PIT mutations");
        derive_line_coverage(&mut tree)?;
        super::finish(tree, mutations, Format::Pit, self.mode, log)
    }
}

/// Parse PIT XML from raw bytes with a private interner.
pub fn parse(input: &[u8]) -> Result<CoverageTree> {
    let mut log = FilteredLog::default();
    PitParser::default().parse(&mut &*input, &mut PathInterner::new(), &mut log)
}

/// A `<mutation>` with its descriptive children, before it is placed in
/// the tree.
#[derive(Debug)]
struct RawMutation {
    mutation: Mutation,
    source_file: String,
}

fn read_mutation(
    xml: &mut XmlStream,
    element: &Element,
    log: &mut FilteredLog,
) -> Result<RawMutation> {
    let detected = element.required("detected")?.trim().eq_ignore_ascii_case("true");
    let status: MutationStatus = element.required("status")?.parse()?;
    let mut mutation = Mutation::new(detected, status, 0);
    let mut source_file = String::new();

    loop {
        match xml.next()? {
            XmlEvent::Start(child) => {
                let name = child.name();
                match name {
                    "sourceFile" => source_file = xml.read_text(name)?,
                    "mutatedClass" => mutation.mutated_class = xml.read_text(name)?,
                    "mutatedMethod" => mutation.mutated_method = xml.read_text(name)?,
                    "methodDescription" => mutation.method_signature = xml.read_text(name)?,
                    "mutator" => mutation.mutator = xml.read_text(name)?,
                    "description" => mutation.description = xml.read_text(name)?,
                    "killingTest" | "killingTests" => mutation.killing_test = xml.read_text(name)?,
                    "lineNumber" => {
                        let text = xml.read_text(name)?;
                        mutation.line = text.parse().unwrap_or_else(|_| {
                            log.log_error(format!(
                                "Invalid line number '{text}' in <mutation>, using 0"
                            ));
                            0
                        });
                    }
                    _ => xml.skip(name)?,
                }
            }
            XmlEvent::End(name) if name == "mutation" => break,
            XmlEvent::End(_) | XmlEvent::Text(_) => {}
            XmlEvent::Eof => return Err(super::unexpected_eof("mutation")),
        }
    }
    Ok(RawMutation { mutation, source_file })
}

/// Place a mutation below package, file, class and method nodes derived
/// from its class name.
fn attach(tree: &mut CoverageTree, interner: &mut PathInterner, raw: RawMutation) -> Result<()> {
    let RawMutation { mutation, source_file } = raw;
    let class_name = mutation.mutated_class.as_str();
    let package_name = match class_name.rsplit_once('.') {
        Some((package, _)) if !package.is_empty() => package,
        _ => "-",
    };
    let file_name = if source_file.is_empty() {
        format!("{}.java", simple_class_name(class_name))
    } else {
        source_file
    };
    let relative_path = if package_name == "-" {
        file_name.clone()
    } else {
        format!("{}/{}", package_name.replace('.', "/"), file_name)
    };

    let root = tree.root();
    let package = tree.find_or_create_package(root, package_name);
    let file = tree.find_or_create_file(package, &file_name, interner.intern(&relative_path));
    let class = tree.find_or_create_class(file, class_name);
    let method = tree.find_or_create_method(
        class,
        &mutation.mutated_method,
        &mutation.method_signature,
        mutation.line,
    );
    if mutation.is_valid() {
        let (covered, missed) = if mutation.is_detected() { (1, 0) } else { (0, 1) };
        tree.add_value(method, Value::coverage(Metric::Mutation, covered, missed))?;
    }
    if let Some(data) = tree.file_mut(file) {
        data.add_mutation(mutation);
    }
    Ok(())
}

/// `com.example.Foo$Inner` lives in `Foo`.
fn simple_class_name(class_name: &str) -> &str {
    let simple = class_name.rsplit('.').next().unwrap_or(class_name);
    simple.split('$').next().unwrap_or(simple)
}

/// Derive line counters and a `LINE` value for every file from its
/// mutations.
///
/// A line is covered when any valid mutation on it was detected and missed
/// when none was. Non-viable mutations and mutations without a line number
/// are ignored. Files that already carry a `LINE` value are left alone.
pub fn derive_line_coverage(tree: &mut CoverageTree) -> Result<()> {
    for file in tree.all_files() {
        if tree.node(file).stored_value(Metric::Line).is_some() {
            continue;
        }
        let mut lines: BTreeMap<u32, bool> = BTreeMap::new();
        if let Some(data) = tree.file(file) {
            for mutation in data.mutations().iter().filter(|m| m.is_valid() && m.line > 0) {
                *lines.entry(mutation.line).or_default() |= mutation.is_detected();
            }
        }
        if lines.is_empty() {
            continue;
        }
        let covered = lines.values().filter(|detected| **detected).count() as u64;
        let missed = lines.len() as u64 - covered;
        for (line, detected) in lines {
            let (covered, missed) = if detected { (1, 0) } else { (0, 1) };
            tree.add_counters(file, line, covered, missed);
        }
        tree.add_value(file, Value::coverage(Metric::Line, covered, missed))?;
    }
    Ok(())
}
